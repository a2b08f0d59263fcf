#![allow(dead_code)]

use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use sitewire_core::notification_type::{NotificationPriority, NotificationType};
use sitewire_core::types::{DbId, Timestamp};
use sitewire_db::models::notification::{NewNotification, Recipient};
use sitewire_db::models::push_subscription::{PushKeys, RegisterPushSubscription};
use sitewire_db::repositories::{NotificationRepo, PushSubscriptionRepo};
use sitewire_events::{
    DeliveryError, EmailMessage, EmailSender, Ledger, NotificationFeed, PushSender, PushTarget,
    Translator, TranslatorConfig,
};
use sqlx::PgPool;

pub async fn seed_user(pool: &PgPool, email: &str) -> DbId {
    sqlx::query_scalar("INSERT INTO users (email, display_name) VALUES ($1, $1) RETURNING id")
        .bind(email)
        .fetch_one(pool)
        .await
        .unwrap()
}

pub async fn register_push(pool: &PgPool, user_id: DbId, endpoint: &str) -> DbId {
    let input = RegisterPushSubscription {
        endpoint: endpoint.to_string(),
        keys: PushKeys {
            p256dh: "BNcRdreALRFXTkOOUHK1EtK2wtaz5Ry4YfYCA".into(),
            auth: "tBHItJI5svbpez7KI4CCXg".into(),
        },
        user_agent: None,
    };
    PushSubscriptionRepo::upsert(pool, user_id, &input)
        .await
        .unwrap()
        .id
}

pub fn translator(pool: &PgPool) -> (Translator, Arc<NotificationFeed>) {
    let feed = Arc::new(NotificationFeed::default());
    let ledger = Ledger::new(pool.clone(), Arc::clone(&feed));
    let translator = Translator::new(pool.clone(), ledger, TranslatorConfig::default());
    (translator, feed)
}

pub async fn create_notification(
    pool: &PgPool,
    user_id: DbId,
    expires_at: Option<Timestamp>,
) -> DbId {
    let input = NewNotification {
        notification_type: NotificationType::TaskAssignment,
        title: "New task assigned".into(),
        message: "Dana assigned you to \"Pour footing 3B\"".into(),
        priority: NotificationPriority::High,
        recipients: vec![Recipient::in_app(user_id)],
        entity: None,
        metadata: serde_json::json!({}),
        action_url: None,
        expires_at,
    };
    NotificationRepo::create(pool, &input).await.unwrap()
}

pub async fn count(pool: &PgPool, sql: &str) -> i64 {
    sqlx::query_scalar(sql).fetch_one(pool).await.unwrap()
}

// ---------------------------------------------------------------------------
// Mock senders
// ---------------------------------------------------------------------------

/// Replays scripted results, then succeeds. Records every call.
#[derive(Default)]
pub struct ScriptedEmail {
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
    pub sent: Mutex<Vec<EmailMessage>>,
    pub delay: Option<Duration>,
}

impl ScriptedEmail {
    pub fn new(script: Vec<Result<(), DeliveryError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.sent.lock().unwrap().len()
    }
}

#[async_trait]
impl EmailSender for ScriptedEmail {
    async fn send(&self, message: &EmailMessage) -> Result<(), DeliveryError> {
        self.sent.lock().unwrap().push(message.clone());
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }
}

#[derive(Default)]
pub struct ScriptedPush {
    script: Mutex<VecDeque<Result<(), DeliveryError>>>,
    pub targets: Mutex<Vec<PushTarget>>,
}

impl ScriptedPush {
    pub fn new(script: Vec<Result<(), DeliveryError>>) -> Self {
        Self {
            script: Mutex::new(script.into()),
            ..Default::default()
        }
    }

    pub fn calls(&self) -> usize {
        self.targets.lock().unwrap().len()
    }
}

#[async_trait]
impl PushSender for ScriptedPush {
    async fn send(
        &self,
        target: &PushTarget,
        _payload: &serde_json::Value,
    ) -> Result<(), DeliveryError> {
        self.targets.lock().unwrap().push(target.clone());
        let next = self.script.lock().unwrap().pop_front();
        next.unwrap_or(Ok(()))
    }
}
