//! Notification ledger models and DTOs.

use serde::{Deserialize, Serialize};
use sitewire_core::event::EntityRef;
use sitewire_core::notification_type::{NotificationPriority, NotificationType};
use sitewire_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `notifications` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct Notification {
    pub id: DbId,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub priority: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub metadata: serde_json::Value,
    pub action_url: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
}

/// A notification as seen by one recipient, with that recipient's read state.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationListItem {
    pub id: DbId,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub priority: String,
    pub entity_type: Option<String>,
    pub entity_id: Option<DbId>,
    pub metadata: serde_json::Value,
    pub action_url: Option<String>,
    pub created_at: Timestamp,
    pub expires_at: Option<Timestamp>,
    pub read_at: Option<Timestamp>,
}

impl NotificationListItem {
    pub fn is_read(&self) -> bool {
        self.read_at.is_some()
    }
}

/// One targeted user of a new notification.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Recipient {
    pub user_id: DbId,
    /// Whether the notification shows in this user's inbox and live feed.
    pub in_app: bool,
}

impl Recipient {
    pub fn in_app(user_id: DbId) -> Self {
        Self {
            user_id,
            in_app: true,
        }
    }

    /// A recipient that only receives the notification on queued channels.
    pub fn queued_only(user_id: DbId) -> Self {
        Self {
            user_id,
            in_app: false,
        }
    }
}

/// DTO for creating a notification in the ledger.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub notification_type: NotificationType,
    pub title: String,
    pub message: String,
    pub priority: NotificationPriority,
    pub recipients: Vec<Recipient>,
    pub entity: Option<EntityRef>,
    pub metadata: serde_json::Value,
    pub action_url: Option<String>,
    pub expires_at: Option<Timestamp>,
}

/// Optional filters for listing a user's notifications.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct NotificationFilter {
    #[serde(default)]
    pub unread_only: bool,
    pub notification_type: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
}
