use std::sync::Arc;

use axum::extract::ws::Message;
use sitewire_events::{FeedMessage, NotificationCreated, NotificationFeed};
use tokio::sync::broadcast::error::RecvError;
use tokio_util::sync::CancellationToken;

use crate::ws::manager::WsManager;

/// Text frame sent to clients for a new notification.
pub fn notification_frame(notification: &NotificationCreated) -> Message {
    let body = serde_json::json!({
        "type": "notification",
        "notification": notification,
    });
    Message::Text(body.to_string().into())
}

/// Forward feed messages to the recipients' WebSocket connections until
/// `cancel` fires or the feed closes.
///
/// A lagging receiver drops the skipped messages; clients recover them
/// from the list endpoint.
pub fn forward_feed(
    feed: &NotificationFeed,
    ws_manager: Arc<WsManager>,
    cancel: CancellationToken,
) -> tokio::task::JoinHandle<()> {
    let mut rx = feed.subscribe();
    tokio::spawn(async move {
        loop {
            let received = tokio::select! {
                _ = cancel.cancelled() => break,
                received = rx.recv() => received,
            };
            match received {
                Ok(FeedMessage {
                    user_id,
                    notification,
                }) => {
                    let delivered = ws_manager
                        .send_to_user(user_id, notification_frame(&notification))
                        .await;
                    tracing::trace!(
                        user_id,
                        notification_id = notification.id,
                        delivered,
                        "Notification forwarded"
                    );
                }
                Err(RecvError::Lagged(skipped)) => {
                    tracing::warn!(skipped, "Notification forwarder lagged");
                }
                Err(RecvError::Closed) => {
                    tracing::info!("Notification feed closed, forwarder stopping");
                    break;
                }
            }
        }
    })
}
