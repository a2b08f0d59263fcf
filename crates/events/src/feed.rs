//! In-process notification feed backed by a `tokio::sync::broadcast` channel.
//!
//! [`NotificationFeed`] carries one [`FeedMessage`] per (notification,
//! in-app recipient). It is shared via `Arc<NotificationFeed>` between the
//! [`Ledger`](crate::ledger::Ledger) and the WebSocket forwarder.

use serde::Serialize;
use sitewire_core::event::EntityRef;
use sitewire_core::types::{DbId, Timestamp};
use tokio::sync::broadcast;

// ---------------------------------------------------------------------------
// Messages
// ---------------------------------------------------------------------------

/// Client-facing summary of a freshly created notification.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct NotificationCreated {
    pub id: DbId,
    pub notification_type: String,
    pub title: String,
    pub message: String,
    pub priority: String,
    pub entity: Option<EntityRef>,
    pub action_url: Option<String>,
    pub created_at: Timestamp,
}

/// A notification addressed to one user.
#[derive(Debug, Clone, PartialEq)]
pub struct FeedMessage {
    pub user_id: DbId,
    pub notification: NotificationCreated,
}

// ---------------------------------------------------------------------------
// NotificationFeed
// ---------------------------------------------------------------------------

/// Default buffer capacity for the broadcast channel.
const DEFAULT_CAPACITY: usize = 1024;

/// Fire-and-forget fan-out of new notifications.
///
/// Publishing never fails: with no subscribers the message is dropped, and a
/// subscriber that falls behind observes `RecvError::Lagged` while the
/// publisher carries on.
pub struct NotificationFeed {
    sender: broadcast::Sender<FeedMessage>,
}

impl NotificationFeed {
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self { sender }
    }

    /// Publish a message, returning how many subscribers received it.
    pub fn publish(&self, message: FeedMessage) -> usize {
        self.sender.send(message).unwrap_or(0)
    }

    pub fn subscribe(&self) -> broadcast::Receiver<FeedMessage> {
        self.sender.subscribe()
    }
}

impl Default for NotificationFeed {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(user_id: DbId) -> FeedMessage {
        FeedMessage {
            user_id,
            notification: NotificationCreated {
                id: 1,
                notification_type: "task_assignment".into(),
                title: "Task assigned".into(),
                message: "Frame level 2".into(),
                priority: "high".into(),
                entity: Some(EntityRef::new("task", 5)),
                action_url: Some("/tasks/5".into()),
                created_at: chrono::Utc::now(),
            },
        }
    }

    #[tokio::test]
    async fn subscribers_receive_published_messages() {
        let feed = NotificationFeed::default();
        let mut rx1 = feed.subscribe();
        let mut rx2 = feed.subscribe();

        assert_eq!(feed.publish(message(7)), 2);

        assert_eq!(rx1.recv().await.unwrap().user_id, 7);
        assert_eq!(rx2.recv().await.unwrap().notification.title, "Task assigned");
    }

    #[test]
    fn publish_without_subscribers_is_a_no_op() {
        let feed = NotificationFeed::default();
        assert_eq!(feed.publish(message(1)), 0);
    }

    #[tokio::test]
    async fn slow_subscriber_lags_without_blocking_publisher() {
        let feed = NotificationFeed::new(2);
        let mut rx = feed.subscribe();
        for user_id in 0..5 {
            feed.publish(message(user_id));
        }
        assert!(matches!(
            rx.recv().await,
            Err(broadcast::error::RecvError::Lagged(3))
        ));
        assert_eq!(rx.recv().await.unwrap().user_id, 3);
    }
}
