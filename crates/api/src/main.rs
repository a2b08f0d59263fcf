use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use sitewire_events::{Ledger, NotificationFeed, Translator, TranslatorConfig};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use sitewire_api::config::ServerConfig;
use sitewire_api::router::build_app_router;
use sitewire_api::state::AppState;
use sitewire_api::ws;

#[tokio::main]
async fn main() {
    dotenvy::dotenv().ok();

    // --- Tracing ---
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                "sitewire_api=debug,sitewire_events=debug,tower_http=debug".into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    // --- Configuration ---
    let config = ServerConfig::from_env();
    tracing::info!(host = %config.host, port = %config.port, "Loaded server configuration");

    // --- Database ---
    let database_url = std::env::var("DATABASE_URL").expect("DATABASE_URL must be set");

    let pool = sitewire_db::create_pool(&database_url)
        .await
        .expect("Failed to connect to database");
    tracing::info!("Database connection pool created");

    sitewire_db::health_check(&pool)
        .await
        .expect("Database health check failed");

    sitewire_db::run_migrations(&pool)
        .await
        .expect("Failed to run database migrations");
    tracing::info!("Database migrations applied");

    // --- Notification engine ---
    let feed = Arc::new(NotificationFeed::default());
    let ledger = Ledger::new(pool.clone(), Arc::clone(&feed));
    let translator = Translator::new(pool.clone(), ledger, TranslatorConfig::from_env());

    // --- WebSocket ---
    let background_cancel = CancellationToken::new();
    let ws_manager = Arc::new(ws::WsManager::new());
    let heartbeat_handle =
        ws::start_heartbeat(Arc::clone(&ws_manager), background_cancel.clone());
    let forwarder_handle =
        ws::forward_feed(&feed, Arc::clone(&ws_manager), background_cancel.clone());
    tracing::info!("Real-time services started (heartbeat, notification forwarder)");

    // --- App state ---
    let state = AppState {
        pool,
        config: Arc::new(config.clone()),
        ws_manager: Arc::clone(&ws_manager),
        translator,
        feed,
    };

    let app = build_app_router(state, &config);

    // --- Start server ---
    let addr = SocketAddr::new(
        config.host.parse().expect("Invalid HOST address"),
        config.port,
    );
    tracing::info!(%addr, "Starting server");

    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .expect("Failed to bind to address");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .expect("Server error");

    // --- Post-shutdown cleanup ---
    tracing::info!("Server stopped accepting connections, cleaning up");

    background_cancel.cancel();
    let grace = Duration::from_secs(config.shutdown_timeout_secs);
    let _ = tokio::time::timeout(grace, forwarder_handle).await;
    let _ = tokio::time::timeout(grace, heartbeat_handle).await;

    let ws_count = ws_manager.connection_count().await;
    tracing::info!(ws_count, "Closing remaining WebSocket connections");
    ws_manager.shutdown_all().await;

    tracing::info!("Graceful shutdown complete");
}

/// Wait for SIGINT or SIGTERM.
async fn shutdown_signal() {
    let ctrl_c = async {
        tokio::signal::ctrl_c()
            .await
            .expect("Failed to install Ctrl-C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate())
            .expect("Failed to install SIGTERM handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => {
            tracing::info!("Received SIGINT (Ctrl-C), starting graceful shutdown");
        }
        () = terminate => {
            tracing::info!("Received SIGTERM, starting graceful shutdown");
        }
    }
}
