//! Tests for `WsManager` and the feed forwarder, without HTTP upgrades.

use std::sync::Arc;
use std::time::Duration;

use assert_matches::assert_matches;
use axum::extract::ws::Message;
use chrono::Utc;
use sitewire_api::ws::{forward_feed, WsManager};
use sitewire_events::{FeedMessage, NotificationCreated, NotificationFeed};
use tokio_util::sync::CancellationToken;

fn created(id: i64) -> NotificationCreated {
    NotificationCreated {
        id,
        notification_type: "task_assignment".into(),
        title: "New task assigned".into(),
        message: "Dana assigned you to \"Pour footing 3B\"".into(),
        priority: "high".into(),
        entity: None,
        action_url: Some("/tasks/42".into()),
        created_at: Utc::now(),
    }
}

#[tokio::test]
async fn add_and_remove_track_connection_count() {
    let manager = WsManager::new();
    assert_eq!(manager.connection_count().await, 0);

    let _rx = manager.add("conn-1".to_string(), 7).await;
    assert_eq!(manager.connection_count().await, 1);

    manager.remove("nonexistent").await;
    assert_eq!(manager.connection_count().await, 1);

    manager.remove("conn-1").await;
    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn send_to_user_reaches_every_connection_of_that_user() {
    let manager = WsManager::new();
    let mut tab_a = manager.add("a".to_string(), 7).await;
    let mut tab_b = manager.add("b".to_string(), 7).await;
    let mut other = manager.add("c".to_string(), 8).await;

    let sent = manager
        .send_to_user(7, Message::Text("hello".into()))
        .await;
    assert_eq!(sent, 2);
    assert_matches!(tab_a.recv().await, Some(Message::Text(_)));
    assert_matches!(tab_b.recv().await, Some(Message::Text(_)));
    assert!(other.try_recv().is_err());

    let mut ids = manager.get_by_user(7).await;
    ids.sort();
    assert_eq!(ids, vec!["a".to_string(), "b".to_string()]);
}

#[tokio::test]
async fn closed_receiver_is_not_counted() {
    let manager = WsManager::new();
    let rx = manager.add("a".to_string(), 7).await;
    drop(rx);

    assert_eq!(manager.send_to_user(7, Message::Text("x".into())).await, 0);
}

#[tokio::test]
async fn shutdown_all_sends_close_and_clears() {
    let manager = WsManager::new();
    let mut rx = manager.add("a".to_string(), 7).await;

    manager.shutdown_all().await;

    assert_matches!(rx.recv().await, Some(Message::Close(None)));
    assert_eq!(manager.connection_count().await, 0);
}

#[tokio::test]
async fn forwarder_delivers_feed_messages_as_notification_frames() {
    let feed = NotificationFeed::default();
    let manager = Arc::new(WsManager::new());
    let mut rx = manager.add("a".to_string(), 7).await;
    let cancel = CancellationToken::new();
    let handle = forward_feed(&feed, Arc::clone(&manager), cancel.clone());

    feed.publish(FeedMessage {
        user_id: 8,
        notification: created(1),
    });
    feed.publish(FeedMessage {
        user_id: 7,
        notification: created(2),
    });

    let frame = tokio::time::timeout(Duration::from_secs(2), rx.recv())
        .await
        .unwrap()
        .unwrap();
    let Message::Text(text) = frame else {
        panic!("expected a text frame");
    };
    let json: serde_json::Value = serde_json::from_str(text.as_str()).unwrap();
    assert_eq!(json["type"], "notification");
    assert_eq!(json["notification"]["id"], 2);
    assert_eq!(json["notification"]["action_url"], "/tasks/42");

    cancel.cancel();
    tokio::time::timeout(Duration::from_secs(2), handle)
        .await
        .unwrap()
        .unwrap();
}
