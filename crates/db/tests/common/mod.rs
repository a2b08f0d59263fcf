#![allow(dead_code)]

use sitewire_core::notification_type::{NotificationPriority, NotificationType};
use sitewire_core::types::{DbId, Timestamp};
use sitewire_db::models::notification::{NewNotification, Recipient};
use sitewire_db::models::push_subscription::{PushKeys, RegisterPushSubscription};
use sitewire_db::repositories::{NotificationRepo, PushSubscriptionRepo};
use sqlx::PgPool;

pub async fn seed_user(pool: &PgPool, email: &str) -> DbId {
    sqlx::query_scalar(
        "INSERT INTO users (email, display_name) VALUES ($1, $1) RETURNING id",
    )
    .bind(email)
    .fetch_one(pool)
    .await
    .unwrap()
}

pub fn new_notification(recipients: Vec<Recipient>) -> NewNotification {
    NewNotification {
        notification_type: NotificationType::TaskAssignment,
        title: "Task assigned".into(),
        message: "Pour footing 3B was assigned to you".into(),
        priority: NotificationPriority::Medium,
        recipients,
        entity: None,
        metadata: serde_json::json!({}),
        action_url: None,
        expires_at: None,
    }
}

pub async fn create_notification(pool: &PgPool, user_ids: &[DbId]) -> DbId {
    let recipients = user_ids.iter().copied().map(Recipient::in_app).collect();
    NotificationRepo::create(pool, &new_notification(recipients))
        .await
        .unwrap()
}

pub async fn create_expiring_notification(
    pool: &PgPool,
    user_ids: &[DbId],
    expires_at: Timestamp,
) -> DbId {
    let recipients = user_ids.iter().copied().map(Recipient::in_app).collect();
    let input = NewNotification {
        expires_at: Some(expires_at),
        ..new_notification(recipients)
    };
    NotificationRepo::create(pool, &input).await.unwrap()
}

pub async fn register_push(pool: &PgPool, user_id: DbId, endpoint: &str) -> DbId {
    let input = RegisterPushSubscription {
        endpoint: endpoint.to_string(),
        keys: PushKeys {
            p256dh: "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA".into(),
            auth: "tBHItJI5svbpez7KI4CCXg".into(),
        },
        user_agent: Some("Firefox/130".into()),
    };
    PushSubscriptionRepo::upsert(pool, user_id, &input)
        .await
        .unwrap()
        .id
}
