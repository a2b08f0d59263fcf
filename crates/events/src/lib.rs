//! Sitewire notification fan-out and delivery.
//!
//! - [`NotificationFeed`]: in-process broadcast of newly created
//!   notifications, consumed by the WebSocket layer.
//! - [`Ledger`]: creates notifications and publishes them to the feed.
//! - [`Translator`]: turns domain events into notifications and queue entries.
//! - [`delivery`]: email and push collaborators behind async traits.
//! - [`QueueProcessor`]: claims due queue entries and records outcomes.

pub mod delivery;
pub mod feed;
pub mod ledger;
pub mod processor;
pub mod translator;

pub use delivery::email::{EmailConfig, SmtpEmailSender};
pub use delivery::push::{HttpPushSender, PushGatewayConfig};
pub use delivery::{DeliveryError, EmailMessage, EmailSender, PushSender, PushTarget};
pub use feed::{FeedMessage, NotificationCreated, NotificationFeed};
pub use ledger::{Ledger, LedgerError};
pub use processor::{CycleReport, ProcessorConfig, QueueProcessor};
pub use translator::{TranslationError, TranslationReport, Translator, TranslatorConfig};
