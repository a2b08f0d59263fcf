//! External delivery collaborators for queued notifications.
//!
//! The [`QueueProcessor`](crate::processor::QueueProcessor) only talks to the
//! [`EmailSender`] and [`PushSender`] traits; [`email`] and [`push`] hold the
//! production implementations (SMTP and an HTTP push gateway).

pub mod email;
pub mod push;

use async_trait::async_trait;
use sitewire_core::delivery::FailureKind;

/// Why a single delivery attempt did not succeed.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DeliveryError {
    /// Worth retrying later: timeouts, throttling, 5xx, 4xx SMTP replies.
    #[error("Transient delivery failure: {0}")]
    Transient(String),

    /// Will never succeed: malformed address, rejected payload.
    #[error("Permanent delivery failure: {0}")]
    Permanent(String),

    /// The push subscription no longer exists at the push service.
    #[error("Push subscription expired")]
    Expired,

    /// The provider could not be reached at all. The entry is released
    /// untouched and the channel is paused for the current cycle.
    #[error("Delivery provider unavailable: {0}")]
    Unavailable(String),
}

impl DeliveryError {
    /// How the retry policy should treat this failure. `None` for an
    /// outage, which does not count as an attempt.
    pub fn failure_kind(&self) -> Option<FailureKind> {
        match self {
            DeliveryError::Transient(_) => Some(FailureKind::Transient),
            DeliveryError::Permanent(_) | DeliveryError::Expired => Some(FailureKind::Permanent),
            DeliveryError::Unavailable(_) => None,
        }
    }
}

/// A rendered email ready to hand to the transport.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailMessage {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// The browser endpoint and keys a push message is encrypted for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushTarget {
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

#[async_trait]
pub trait EmailSender: Send + Sync {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError>;
}

#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(
        &self,
        target: &PushTarget,
        payload: &serde_json::Value,
    ) -> Result<(), DeliveryError>;
}
