//! Repository layer.
//!
//! Each repository is a zero-sized struct providing async methods
//! that accept `&PgPool` as the first argument.

pub mod email_queue_repo;
pub mod notification_preference_repo;
pub mod notification_repo;
pub mod push_queue_repo;
pub mod push_subscription_repo;
mod queue_ops;
pub mod user_repo;

pub use email_queue_repo::EmailQueueRepo;
pub use notification_preference_repo::NotificationPreferenceRepo;
pub use notification_repo::{MarkReadOutcome, NotificationRepo};
pub use push_queue_repo::PushQueueRepo;
pub use push_subscription_repo::PushSubscriptionRepo;
pub use user_repo::UserRepo;
