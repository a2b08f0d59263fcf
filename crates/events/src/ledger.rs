//! Notification ledger: durable creation plus live fan-out.

use std::sync::Arc;

use chrono::Utc;
use sitewire_core::types::DbId;
use sitewire_db::models::notification::NewNotification;
use sitewire_db::repositories::NotificationRepo;
use sitewire_db::DbPool;

use crate::feed::{FeedMessage, NotificationCreated, NotificationFeed};

#[derive(Debug, thiserror::Error)]
pub enum LedgerError {
    #[error("Notification has no recipients")]
    NoRecipients,

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Writes notifications and publishes them to the [`NotificationFeed`].
#[derive(Clone)]
pub struct Ledger {
    pool: DbPool,
    feed: Arc<NotificationFeed>,
}

impl Ledger {
    pub fn new(pool: DbPool, feed: Arc<NotificationFeed>) -> Self {
        Self { pool, feed }
    }

    pub fn feed(&self) -> &Arc<NotificationFeed> {
        &self.feed
    }

    /// Persist a notification and its recipients, then notify every in-app
    /// recipient on the feed. Publishing happens only after the commit.
    pub async fn create(&self, input: &NewNotification) -> Result<DbId, LedgerError> {
        if input.recipients.is_empty() {
            return Err(LedgerError::NoRecipients);
        }

        let id = NotificationRepo::create(&self.pool, input).await?;

        let summary = NotificationCreated {
            id,
            notification_type: input.notification_type.as_str().to_string(),
            title: input.title.clone(),
            message: input.message.clone(),
            priority: input.priority.as_str().to_string(),
            entity: input.entity.clone(),
            action_url: input.action_url.clone(),
            created_at: Utc::now(),
        };

        let mut in_app: Vec<DbId> = input
            .recipients
            .iter()
            .filter(|r| r.in_app)
            .map(|r| r.user_id)
            .collect();
        in_app.sort_unstable();
        in_app.dedup();

        for user_id in in_app {
            self.feed.publish(FeedMessage {
                user_id,
                notification: summary.clone(),
            });
        }

        tracing::debug!(
            notification_id = id,
            notification_type = %input.notification_type,
            recipients = input.recipients.len(),
            "Notification created"
        );
        Ok(id)
    }
}
