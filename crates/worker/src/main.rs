//! Queue worker: drains the email and push queues.
//!
//! `sitewire-worker` runs cycles on `DISPATCH_INTERVAL_SECS` until SIGINT or
//! SIGTERM. `sitewire-worker --once` runs a single cycle and exits, for use
//! under an external scheduler.
//!
//! A channel whose delivery settings are absent (`SMTP_HOST`,
//! `PUSH_GATEWAY_URL`) is paused; its entries stay pending.

use std::process::ExitCode;
use std::sync::Arc;

use sitewire_events::{
    EmailConfig, EmailSender, HttpPushSender, ProcessorConfig, PushGatewayConfig, PushSender,
    QueueProcessor, SmtpEmailSender,
};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> ExitCode {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "sitewire_worker=debug,sitewire_events=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let once = std::env::args().skip(1).any(|arg| arg == "--once");

    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");
    let pool = sitewire_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    sitewire_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database ready");

    let processor = QueueProcessor::new(
        pool,
        email_sender(),
        push_sender(),
        ProcessorConfig::from_env(),
    );

    if once {
        return match processor.run_cycle().await {
            Ok(report) => {
                tracing::info!(
                    claimed = report.claimed,
                    sent = report.sent,
                    retried = report.retried,
                    failed = report.failed,
                    "Single dispatch cycle finished"
                );
                ExitCode::SUCCESS
            }
            Err(e) => {
                tracing::error!(error = %e, "Dispatch cycle failed");
                ExitCode::FAILURE
            }
        };
    }

    let cancel = CancellationToken::new();
    let signal_cancel = cancel.clone();
    tokio::spawn(async move {
        shutdown_signal().await;
        signal_cancel.cancel();
    });

    processor.run(cancel).await;
    tracing::info!("Worker stopped");
    ExitCode::SUCCESS
}

fn email_sender() -> Option<Arc<dyn EmailSender>> {
    let Some(config) = EmailConfig::from_env() else {
        tracing::warn!("SMTP_HOST not set, email delivery paused");
        return None;
    };
    match SmtpEmailSender::new(config) {
        Ok(sender) => Some(Arc::new(sender)),
        Err(e) => {
            tracing::error!(error = %e, "Invalid SMTP configuration, email delivery paused");
            None
        }
    }
}

fn push_sender() -> Option<Arc<dyn PushSender>> {
    let Some(config) = PushGatewayConfig::from_env() else {
        tracing::warn!("PUSH_GATEWAY_URL not set, push delivery paused");
        return None;
    };
    match HttpPushSender::new(config) {
        Ok(sender) => Some(Arc::new(sender)),
        Err(e) => {
            tracing::error!(error = %e, "Invalid push gateway configuration, push delivery paused");
            None
        }
    }
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!(error = %e, "Failed to listen for Ctrl-C");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!(error = %e, "Failed to install SIGTERM handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => tracing::info!("Received SIGINT (Ctrl-C), stopping worker"),
        () = terminate => tracing::info!("Received SIGTERM, stopping worker"),
    }
}
