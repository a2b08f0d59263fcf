//! Email delivery via SMTP.
//!
//! [`SmtpEmailSender`] wraps the `lettre` async SMTP transport. Configuration
//! is loaded from environment variables; if `SMTP_HOST` is not set,
//! [`EmailConfig::from_env`] returns `None` and the email channel stays
//! paused (entries remain `pending`).

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};

use super::{DeliveryError, EmailMessage, EmailSender};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

/// Error type for building the SMTP transport or a message.
#[derive(Debug, thiserror::Error)]
pub enum EmailError {
    /// SMTP transport-level failure (authentication, connection, etc.).
    #[error("SMTP transport error: {0}")]
    Transport(#[from] lettre::transport::smtp::Error),

    /// The recipient or sender address could not be parsed.
    #[error("Email address parse error: {0}")]
    Address(#[from] lettre::address::AddressError),

    /// The MIME message could not be assembled.
    #[error("Email build error: {0}")]
    Build(String),
}

impl From<EmailError> for DeliveryError {
    fn from(err: EmailError) -> Self {
        match err {
            EmailError::Transport(e) => classify_smtp_error(&e),
            EmailError::Address(e) => DeliveryError::Permanent(e.to_string()),
            EmailError::Build(msg) => DeliveryError::Permanent(msg),
        }
    }
}

/// Map an SMTP error onto the queue's failure taxonomy.
///
/// 5xx replies are permanent, 4xx replies and timeouts transient; anything
/// that never reached an SMTP reply (refused connection, TLS handshake)
/// means the relay is down.
fn classify_smtp_error(err: &lettre::transport::smtp::Error) -> DeliveryError {
    if err.is_permanent() {
        DeliveryError::Permanent(err.to_string())
    } else if err.is_transient() || err.is_timeout() {
        DeliveryError::Transient(err.to_string())
    } else {
        DeliveryError::Unavailable(err.to_string())
    }
}

// ---------------------------------------------------------------------------
// EmailConfig
// ---------------------------------------------------------------------------

/// Default SMTP port (STARTTLS).
const DEFAULT_SMTP_PORT: u16 = 587;

/// Default sender address when `SMTP_FROM` is not set.
const DEFAULT_FROM_ADDRESS: &str = "notifications@sitewire.local";

#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    /// RFC 5322 "From" address.
    pub from_address: String,
    pub smtp_user: Option<String>,
    pub smtp_password: Option<String>,
}

impl EmailConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable        | Required | Default                         |
    /// |-----------------|----------|---------------------------------|
    /// | `SMTP_HOST`     | yes      | (email disabled when unset)     |
    /// | `SMTP_PORT`     | no       | `587`                           |
    /// | `SMTP_FROM`     | no       | `notifications@sitewire.local`  |
    /// | `SMTP_USER`     | no       |                                 |
    /// | `SMTP_PASSWORD` | no       |                                 |
    pub fn from_env() -> Option<Self> {
        let smtp_host = std::env::var("SMTP_HOST").ok()?;
        Some(Self {
            smtp_host,
            smtp_port: std::env::var("SMTP_PORT")
                .ok()
                .and_then(|p| p.parse().ok())
                .unwrap_or(DEFAULT_SMTP_PORT),
            from_address: std::env::var("SMTP_FROM")
                .unwrap_or_else(|_| DEFAULT_FROM_ADDRESS.to_string()),
            smtp_user: std::env::var("SMTP_USER").ok(),
            smtp_password: std::env::var("SMTP_PASSWORD").ok(),
        })
    }
}

// ---------------------------------------------------------------------------
// SmtpEmailSender
// ---------------------------------------------------------------------------

/// Sends queued notification emails through one pooled SMTP transport.
pub struct SmtpEmailSender {
    from_address: String,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl SmtpEmailSender {
    pub fn new(config: EmailConfig) -> Result<Self, EmailError> {
        // Validate the sender once rather than on every message.
        let _: lettre::Address = config.from_address.parse()?;

        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)?
            .port(config.smtp_port);
        if let (Some(user), Some(pass)) = (config.smtp_user, config.smtp_password) {
            builder = builder.credentials(Credentials::new(user, pass));
        }

        Ok(Self {
            from_address: config.from_address,
            transport: builder.build(),
        })
    }

    fn build_message(&self, message: &EmailMessage) -> Result<Message, EmailError> {
        Message::builder()
            .from(self.from_address.parse()?)
            .to(message.to.parse()?)
            .subject(&message.subject)
            .header(ContentType::TEXT_PLAIN)
            .body(message.body.clone())
            .map_err(|e| EmailError::Build(e.to_string()))
    }
}

#[async_trait]
impl EmailSender for SmtpEmailSender {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        let email = self.build_message(message)?;
        self.transport
            .send(email)
            .await
            .map_err(|e| classify_smtp_error(&e))?;

        tracing::debug!(to = %message.to, "Notification email sent");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    fn config() -> EmailConfig {
        EmailConfig {
            smtp_host: "localhost".into(),
            smtp_port: 2525,
            from_address: "notifications@sitewire.local".into(),
            smtp_user: None,
            smtp_password: None,
        }
    }

    #[tokio::test]
    async fn invalid_recipient_is_permanent() {
        let sender = SmtpEmailSender::new(config()).unwrap();
        let result = sender
            .send(&EmailMessage {
                to: "not-an-email".into(),
                subject: "[Task] Frame level 2".into(),
                body: "hello".into(),
            })
            .await;
        assert!(matches!(result, Err(DeliveryError::Permanent(_))));
    }

    #[test]
    fn invalid_sender_is_rejected_at_construction() {
        let cfg = EmailConfig {
            from_address: "nope".into(),
            ..config()
        };
        assert!(matches!(
            SmtpEmailSender::new(cfg),
            Err(EmailError::Address(_))
        ));
    }

    #[test]
    fn email_error_display_build() {
        let err = EmailError::Build("missing body".to_string());
        assert_eq!(err.to_string(), "Email build error: missing body");
    }
}
