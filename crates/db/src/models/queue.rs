//! Channel delivery queue entities and DTOs.

use serde::Serialize;
use sitewire_core::types::{DbId, StatusId, Timestamp};
use sqlx::FromRow;

use crate::models::status::QueueStatus;

/// A row from the `email_queue` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct EmailQueueEntry {
    pub id: DbId,
    pub notification_id: DbId,
    pub recipient_id: DbId,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub priority: i16,
    pub status_id: StatusId,
    pub retry_count: i32,
    pub scheduled_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A row from the `push_queue` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PushQueueEntry {
    pub id: DbId,
    pub notification_id: DbId,
    pub recipient_id: DbId,
    pub subscription_id: DbId,
    pub payload: serde_json::Value,
    pub priority: i16,
    pub status_id: StatusId,
    pub retry_count: i32,
    pub scheduled_at: Timestamp,
    pub claimed_at: Option<Timestamp>,
    pub sent_at: Option<Timestamp>,
    pub last_error: Option<String>,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// A claimed push entry joined with the subscription it targets.
#[derive(Debug, Clone, FromRow)]
pub struct PushDispatchItem {
    pub id: DbId,
    pub notification_id: DbId,
    pub recipient_id: DbId,
    pub subscription_id: DbId,
    pub payload: serde_json::Value,
    pub retry_count: i32,
    pub endpoint: String,
    pub p256dh: String,
    pub auth: String,
}

/// DTO for enqueuing an email.
#[derive(Debug, Clone)]
pub struct NewEmailEntry {
    pub notification_id: DbId,
    pub recipient_id: DbId,
    pub to_address: String,
    pub subject: String,
    pub body: String,
    pub priority: i16,
    /// `None` dispatches at the next cycle.
    pub scheduled_at: Option<Timestamp>,
}

/// DTO for enqueuing a push message to one subscription.
#[derive(Debug, Clone)]
pub struct NewPushEntry {
    pub notification_id: DbId,
    pub recipient_id: DbId,
    pub subscription_id: DbId,
    pub payload: serde_json::Value,
    pub priority: i16,
    pub scheduled_at: Option<Timestamp>,
}

/// Number of entries in one status, for the admin dashboard.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct QueueStatusCount {
    pub status_id: StatusId,
    pub count: i64,
}

impl QueueStatusCount {
    pub fn status_name(&self) -> &'static str {
        QueueStatus::from_id(self.status_id)
            .map(|s| s.name())
            .unwrap_or("unknown")
    }
}
