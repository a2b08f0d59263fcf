//! Event-to-notification translator.
//!
//! [`Translator::handle`] is called after a business write has committed.
//! It decides who hears about the event, resolves each recipient's
//! preferences, writes the notification through the [`Ledger`] and appends
//! one queue entry per enabled external channel.
//!
//! Nothing in here may fail the caller: every error is logged and the
//! event is dropped. Enqueue failures are isolated per recipient and per
//! channel, so a notification that made it into the ledger stays visible
//! in-app even when its email or push entry could not be written.

mod payload;

use std::future::Future;
use std::time::Duration;

use chrono::Utc;
use serde::Serialize;
use sitewire_core::error::CoreError;
use sitewire_core::event::DomainEvent;
use sitewire_core::preferences::{DefaultPreferences, DeliveryPlan};
use sitewire_core::types::{DbId, Timestamp};
use sitewire_db::models::notification::{NewNotification, Recipient};
use sitewire_db::models::queue::{NewEmailEntry, NewPushEntry};
use sitewire_db::models::user::User;
use sitewire_db::repositories::{
    EmailQueueRepo, NotificationPreferenceRepo, PushQueueRepo, PushSubscriptionRepo, UserRepo,
};
use sitewire_db::DbPool;

use crate::ledger::{Ledger, LedgerError};
use payload::{recipient_set, Audience, Draft};

// ---------------------------------------------------------------------------
// Error
// ---------------------------------------------------------------------------

#[derive(Debug, thiserror::Error)]
pub enum TranslationError {
    #[error("Unknown event type '{0}'")]
    UnknownEvent(String),

    #[error("Invalid payload for {event_type}: {source}")]
    Payload {
        event_type: &'static str,
        #[source]
        source: serde_json::Error,
    },

    #[error("Invalid entity reference: {0}")]
    Entity(#[source] CoreError),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error(transparent)]
    Ledger(#[from] LedgerError),
}

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

/// Default bound on how long a business operation waits for translation.
const DEFAULT_NOTIFY_TIMEOUT_MS: u64 = 5_000;

#[derive(Debug, Clone)]
pub struct TranslatorConfig {
    /// Upper bound for [`Translator::notify_after_commit`].
    pub notify_timeout: Duration,
    /// Channel flags written for a (user, type) pair on first use.
    pub defaults: DefaultPreferences,
    /// Prefix turning action paths into absolute links in emails.
    pub app_base_url: Option<String>,
}

impl Default for TranslatorConfig {
    fn default() -> Self {
        Self {
            notify_timeout: Duration::from_millis(DEFAULT_NOTIFY_TIMEOUT_MS),
            defaults: DefaultPreferences::STANDARD,
            app_base_url: None,
        }
    }
}

impl TranslatorConfig {
    /// | Variable            | Default |
    /// |---------------------|---------|
    /// | `NOTIFY_TIMEOUT_MS` | `5000`  |
    /// | `APP_BASE_URL`      | unset   |
    pub fn from_env() -> Self {
        Self {
            notify_timeout: Duration::from_millis(
                std::env::var("NOTIFY_TIMEOUT_MS")
                    .ok()
                    .and_then(|v| v.parse().ok())
                    .unwrap_or(DEFAULT_NOTIFY_TIMEOUT_MS),
            ),
            defaults: DefaultPreferences::STANDARD,
            app_base_url: std::env::var("APP_BASE_URL")
                .ok()
                .map(|u| u.trim_end_matches('/').to_string()),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// What one event produced.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
pub struct TranslationReport {
    pub notification_id: Option<DbId>,
    pub recipients: usize,
    pub email_enqueued: usize,
    pub push_enqueued: usize,
    /// Push entries scheduled for the end of a quiet-hours window.
    pub push_deferred: usize,
    pub enqueue_failures: usize,
}

// ---------------------------------------------------------------------------
// Translator
// ---------------------------------------------------------------------------

#[derive(Clone)]
pub struct Translator {
    pool: DbPool,
    ledger: Ledger,
    config: TranslatorConfig,
}

impl Translator {
    pub fn new(pool: DbPool, ledger: Ledger, config: TranslatorConfig) -> Self {
        Self {
            pool,
            ledger,
            config,
        }
    }

    /// Translate an event, logging instead of returning any failure.
    pub async fn handle(&self, event: &DomainEvent) -> TranslationReport {
        match self.translate(event, Utc::now()).await {
            Ok(report) => report,
            Err(e) => {
                tracing::error!(
                    event_type = %event.event_type,
                    actor_id = ?event.actor_id,
                    error = %e,
                    "Failed to translate domain event"
                );
                TranslationReport::default()
            }
        }
    }

    /// Translate in the background, bounded by the configured timeout.
    pub fn spawn(&self, event: DomainEvent) -> tokio::task::JoinHandle<()> {
        let translator = self.clone();
        tokio::spawn(async move {
            translator.handle_bounded(&event).await;
        })
    }

    /// Run a business operation, then translate the event it describes.
    ///
    /// The operation's result is returned unchanged. Translation runs only
    /// when the operation succeeded and `to_event` yields an event; it is
    /// bounded by `notify_timeout` and can neither fail nor delay the
    /// caller beyond that bound.
    pub async fn notify_after_commit<T, E, Fut, F>(&self, operation: Fut, to_event: F) -> Result<T, E>
    where
        Fut: Future<Output = Result<T, E>>,
        F: FnOnce(&T) -> Option<DomainEvent>,
    {
        let value = operation.await?;
        if let Some(event) = to_event(&value) {
            self.handle_bounded(&event).await;
        }
        Ok(value)
    }

    async fn handle_bounded(&self, event: &DomainEvent) {
        if tokio::time::timeout(self.config.notify_timeout, self.handle(event))
            .await
            .is_err()
        {
            tracing::warn!(
                event_type = %event.event_type,
                timeout_ms = self.config.notify_timeout.as_millis() as u64,
                "Notification translation timed out"
            );
        }
    }

    /// Translate an event as of `now`, which drives quiet-hours decisions.
    pub async fn translate(
        &self,
        event: &DomainEvent,
        now: Timestamp,
    ) -> Result<TranslationReport, TranslationError> {
        let kind = event
            .kind()
            .map_err(|_| TranslationError::UnknownEvent(event.event_type.clone()))?;
        if let Some(target) = &event.target_entity {
            target.validate().map_err(TranslationError::Entity)?;
        }

        let Some(draft) = payload::draft(kind, event)? else {
            return Ok(TranslationReport::default());
        };

        let candidates = self.expand_audience(&draft.audience, event.actor_id).await?;
        let users = if candidates.is_empty() {
            Vec::new()
        } else {
            UserRepo::find_active(&self.pool, &candidates).await?
        };

        let mut planned: Vec<(User, DeliveryPlan)> = Vec::with_capacity(users.len());
        for user in users {
            let plan = self.plan_for(&user, &draft, now).await;
            if plan.is_empty() {
                tracing::debug!(user_id = user.id, event_type = %kind, "All channels disabled");
                continue;
            }
            planned.push((user, plan));
        }

        if planned.is_empty() {
            tracing::debug!(event_type = %kind, "Event has no deliverable recipients");
            return Ok(TranslationReport::default());
        }

        let template = draft.notification_type.template();
        let entity = event.target_entity.clone();
        let notification = NewNotification {
            notification_type: draft.notification_type,
            title: draft.title,
            message: draft.message,
            priority: draft.priority,
            recipients: planned
                .iter()
                .map(|(user, plan)| Recipient {
                    user_id: user.id,
                    in_app: plan.in_app,
                })
                .collect(),
            action_url: entity.as_ref().map(|e| e.action_path()),
            entity,
            metadata: serde_json::json!({
                "event_type": kind.as_str(),
                "actor_id": event.actor_id,
                "icon": template.icon,
            }),
            expires_at: template
                .ttl_days
                .map(|days| event.occurred_at + chrono::Duration::days(days)),
        };

        let notification_id = self.ledger.create(&notification).await?;

        let mut report = TranslationReport {
            notification_id: Some(notification_id),
            recipients: planned.len(),
            ..Default::default()
        };
        for (user, plan) in &planned {
            self.enqueue_for(notification_id, &notification, user, plan, &mut report)
                .await;
        }

        tracing::info!(
            notification_id,
            event_type = %kind,
            recipients = report.recipients,
            email_enqueued = report.email_enqueued,
            push_enqueued = report.push_enqueued,
            push_deferred = report.push_deferred,
            enqueue_failures = report.enqueue_failures,
            "Domain event translated"
        );
        Ok(report)
    }

    async fn expand_audience(
        &self,
        audience: &Audience,
        actor_id: Option<DbId>,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        Ok(match audience {
            Audience::Users { ids, exclude_actor } => {
                recipient_set(ids, actor_id.filter(|_| *exclude_actor))
            }
            Audience::Organization(org_id) => {
                let members = UserRepo::organization_member_ids(&self.pool, *org_id).await?;
                recipient_set(&members, actor_id)
            }
        })
    }

    /// Resolve one recipient's channels. A resolution failure falls back to
    /// in-app only, which never reaches outside the platform.
    async fn plan_for(&self, user: &User, draft: &Draft, now: Timestamp) -> DeliveryPlan {
        match NotificationPreferenceRepo::resolve(
            &self.pool,
            user.id,
            draft.notification_type,
            &self.config.defaults,
        )
        .await
        {
            Ok(resolved) => resolved.plan(now),
            Err(e) => {
                tracing::warn!(
                    user_id = user.id,
                    notification_type = %draft.notification_type,
                    error = %e,
                    "Preference resolution failed, delivering in-app only"
                );
                DeliveryPlan {
                    in_app: true,
                    ..DeliveryPlan::NONE
                }
            }
        }
    }

    async fn enqueue_for(
        &self,
        notification_id: DbId,
        notification: &NewNotification,
        user: &User,
        plan: &DeliveryPlan,
        report: &mut TranslationReport,
    ) {
        let priority = notification.priority.rank();

        if plan.email {
            let entry = NewEmailEntry {
                notification_id,
                recipient_id: user.id,
                to_address: user.email.clone(),
                subject: format!(
                    "{} {}",
                    notification.notification_type.template().email_subject_prefix,
                    notification.title
                ),
                body: self.email_body(notification),
                priority,
                scheduled_at: None,
            };
            match EmailQueueRepo::enqueue(&self.pool, &entry).await {
                Ok(Some(_)) => report.email_enqueued += 1,
                Ok(None) => {}
                Err(e) => {
                    report.enqueue_failures += 1;
                    tracing::error!(
                        notification_id,
                        user_id = user.id,
                        error = %e,
                        "Failed to enqueue email"
                    );
                }
            }
        }

        if plan.push {
            let subscriptions =
                match PushSubscriptionRepo::list_active_for_user(&self.pool, user.id).await {
                    Ok(subs) => subs,
                    Err(e) => {
                        report.enqueue_failures += 1;
                        tracing::error!(
                            notification_id,
                            user_id = user.id,
                            error = %e,
                            "Failed to load push subscriptions"
                        );
                        return;
                    }
                };

            let payload = push_payload(notification_id, notification);
            for sub in subscriptions {
                let entry = NewPushEntry {
                    notification_id,
                    recipient_id: user.id,
                    subscription_id: sub.id,
                    payload: payload.clone(),
                    priority,
                    scheduled_at: plan.push_not_before,
                };
                match PushQueueRepo::enqueue(&self.pool, &entry).await {
                    Ok(Some(_)) => {
                        report.push_enqueued += 1;
                        if plan.push_not_before.is_some() {
                            report.push_deferred += 1;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => {
                        report.enqueue_failures += 1;
                        tracing::error!(
                            notification_id,
                            user_id = user.id,
                            subscription_id = sub.id,
                            error = %e,
                            "Failed to enqueue push message"
                        );
                    }
                }
            }
        }
    }

    fn email_body(&self, notification: &NewNotification) -> String {
        let mut body = notification.message.clone();
        if let Some(path) = &notification.action_url {
            let link = match &self.config.app_base_url {
                Some(base) => format!("{base}{path}"),
                None => path.clone(),
            };
            body.push_str(&format!("\n\nOpen in Sitewire: {link}"));
        }
        body.push_str("\n\nYou can change which emails you receive in your notification settings.");
        body
    }
}

fn push_payload(notification_id: DbId, notification: &NewNotification) -> serde_json::Value {
    serde_json::json!({
        "notification_id": notification_id,
        "type": notification.notification_type.as_str(),
        "title": notification.title,
        "body": notification.message,
        "url": notification.action_url,
        "icon": notification.notification_type.template().icon,
        "priority": notification.priority.as_str(),
    })
}
