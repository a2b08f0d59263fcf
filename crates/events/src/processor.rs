//! Channel queue processor.
//!
//! [`QueueProcessor`] runs one dispatch cycle at a time, either driven by
//! its own interval loop ([`QueueProcessor::run`]) or triggered externally
//! ([`QueueProcessor::run_cycle`]). Each cycle:
//!
//! 1. cancels pending entries whose notification has expired,
//! 2. returns claims older than the lease to `pending`,
//! 3. per channel, claims a batch of due entries and dispatches them with
//!    bounded concurrency, recording the outcome of every attempt.
//!
//! Several processors may run against the same database; the claim in the
//! repository layer guarantees each entry has a single owner.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use futures::stream::{self, StreamExt};
use serde::Serialize;
use sitewire_core::channels::{CHANNEL_EMAIL, CHANNEL_PUSH};
use sitewire_core::delivery::{FailureKind, RetryDecision, RetryPolicy};
use sitewire_core::types::DbId;
use sitewire_db::models::queue::{EmailQueueEntry, PushDispatchItem};
use sitewire_db::repositories::{EmailQueueRepo, PushQueueRepo, PushSubscriptionRepo};
use sitewire_db::DbPool;
use tokio_util::sync::CancellationToken;

use crate::delivery::{DeliveryError, EmailMessage, EmailSender, PushSender, PushTarget};

// ---------------------------------------------------------------------------
// Config
// ---------------------------------------------------------------------------

const DEFAULT_BATCH_SIZE: i64 = 100;
const DEFAULT_CONCURRENCY: usize = 8;
const DEFAULT_DELIVERY_TIMEOUT_SECS: u64 = 30;
const DEFAULT_CLAIM_LEASE_SECS: i64 = 300;
const DEFAULT_INTERVAL_SECS: u64 = 15;

#[derive(Debug, Clone)]
pub struct ProcessorConfig {
    /// Maximum entries claimed per channel per cycle.
    pub batch_size: i64,
    /// Maximum in-flight deliveries per channel.
    pub concurrency: usize,
    /// Upper bound for a single collaborator call; exceeding it is a
    /// transient failure.
    pub delivery_timeout: Duration,
    /// How long a `sending` claim is honoured before recovery.
    pub claim_lease_secs: i64,
    /// Interval between cycles in [`QueueProcessor::run`].
    pub interval: Duration,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            batch_size: DEFAULT_BATCH_SIZE,
            concurrency: DEFAULT_CONCURRENCY,
            delivery_timeout: Duration::from_secs(DEFAULT_DELIVERY_TIMEOUT_SECS),
            claim_lease_secs: DEFAULT_CLAIM_LEASE_SECS,
            interval: Duration::from_secs(DEFAULT_INTERVAL_SECS),
        }
    }
}

impl ProcessorConfig {
    /// Load configuration from environment variables.
    ///
    /// | Variable                 | Default |
    /// |--------------------------|---------|
    /// | `DISPATCH_BATCH_SIZE`    | `100`   |
    /// | `DISPATCH_CONCURRENCY`   | `8`     |
    /// | `DELIVERY_TIMEOUT_SECS`  | `30`    |
    /// | `CLAIM_LEASE_SECS`       | `300`   |
    /// | `DISPATCH_INTERVAL_SECS` | `15`    |
    pub fn from_env() -> Self {
        fn var<T: std::str::FromStr>(name: &str, default: T) -> T {
            std::env::var(name)
                .ok()
                .and_then(|v| v.parse().ok())
                .unwrap_or(default)
        }

        Self {
            batch_size: var("DISPATCH_BATCH_SIZE", DEFAULT_BATCH_SIZE).max(1),
            concurrency: var("DISPATCH_CONCURRENCY", DEFAULT_CONCURRENCY).max(1),
            delivery_timeout: Duration::from_secs(var(
                "DELIVERY_TIMEOUT_SECS",
                DEFAULT_DELIVERY_TIMEOUT_SECS,
            )),
            claim_lease_secs: var("CLAIM_LEASE_SECS", DEFAULT_CLAIM_LEASE_SECS),
            interval: Duration::from_secs(var("DISPATCH_INTERVAL_SECS", DEFAULT_INTERVAL_SECS)),
        }
    }
}

// ---------------------------------------------------------------------------
// Report
// ---------------------------------------------------------------------------

/// Counters for one dispatch cycle, summed over both channels.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct CycleReport {
    /// Pending entries cancelled because their notification expired.
    pub cancelled: u64,
    /// Stale `sending` claims returned to `pending`.
    pub recovered: u64,
    pub claimed: usize,
    pub sent: usize,
    pub retried: usize,
    pub failed: usize,
    /// Claims handed back untouched during a provider outage.
    pub released: usize,
    /// Push subscriptions deactivated after the push service reported them gone.
    pub deactivated: usize,
}

impl CycleReport {
    fn record(&mut self, outcome: Outcome) {
        match outcome {
            Outcome::Sent => self.sent += 1,
            Outcome::Retried => self.retried += 1,
            Outcome::Failed => self.failed += 1,
            Outcome::Released => self.released += 1,
            Outcome::Expired => {
                self.failed += 1;
                self.deactivated += 1;
            }
            Outcome::Lost => {}
        }
    }

    pub fn is_idle(&self) -> bool {
        *self == Self::default()
    }
}

/// What happened to one claimed entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Outcome {
    Sent,
    Retried,
    Failed,
    Released,
    /// Failed and its push subscription deactivated.
    Expired,
    /// The outcome could not be recorded; lease recovery will pick it up.
    Lost,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Queue {
    Email,
    Push,
}

impl Queue {
    fn as_str(self) -> &'static str {
        match self {
            Queue::Email => CHANNEL_EMAIL,
            Queue::Push => CHANNEL_PUSH,
        }
    }
}

// ---------------------------------------------------------------------------
// QueueProcessor
// ---------------------------------------------------------------------------

pub struct QueueProcessor {
    pool: DbPool,
    email: Option<Arc<dyn EmailSender>>,
    push: Option<Arc<dyn PushSender>>,
    policy: RetryPolicy,
    config: ProcessorConfig,
}

impl QueueProcessor {
    /// A channel whose sender is `None` is paused: its entries stay pending.
    pub fn new(
        pool: DbPool,
        email: Option<Arc<dyn EmailSender>>,
        push: Option<Arc<dyn PushSender>>,
        config: ProcessorConfig,
    ) -> Self {
        Self {
            pool,
            email,
            push,
            policy: RetryPolicy::default(),
            config,
        }
    }

    pub fn with_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Run cycles on the configured interval until `cancel` fires.
    ///
    /// A cycle in progress when cancellation arrives runs to completion.
    pub async fn run(&self, cancel: CancellationToken) {
        let mut interval = tokio::time::interval(self.config.interval);
        interval.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

        tracing::info!(
            interval_secs = self.config.interval.as_secs(),
            email_enabled = self.email.is_some(),
            push_enabled = self.push.is_some(),
            "Queue processor started"
        );

        loop {
            tokio::select! {
                _ = cancel.cancelled() => {
                    tracing::info!("Queue processor cancelled");
                    break;
                }
                _ = interval.tick() => {
                    if let Err(e) = self.run_cycle().await {
                        tracing::error!(error = %e, "Dispatch cycle failed");
                    }
                }
            }
        }
    }

    /// Run a single dispatch cycle over both channels.
    pub async fn run_cycle(&self) -> Result<CycleReport, sqlx::Error> {
        let mut report = CycleReport {
            cancelled: EmailQueueRepo::cancel_expired(&self.pool).await?
                + PushQueueRepo::cancel_expired(&self.pool).await?,
            recovered: EmailQueueRepo::requeue_stale(&self.pool, self.config.claim_lease_secs)
                .await?
                + PushQueueRepo::requeue_stale(&self.pool, self.config.claim_lease_secs).await?,
            ..Default::default()
        };

        if let Some(sender) = &self.email {
            let entries = EmailQueueRepo::claim_due(&self.pool, self.config.batch_size).await?;
            report.claimed += entries.len();
            let outage = AtomicBool::new(false);
            let dispatches: Vec<_> = entries
                .into_iter()
                .map(|entry| self.dispatch_email(sender.as_ref(), entry, &outage))
                .collect();
            let outcomes: Vec<Outcome> = stream::iter(dispatches)
                .buffer_unordered(self.config.concurrency)
                .collect()
                .await;
            outcomes.into_iter().for_each(|o| report.record(o));
        }

        if let Some(sender) = &self.push {
            let items = PushQueueRepo::claim_due(&self.pool, self.config.batch_size).await?;
            report.claimed += items.len();
            let outage = AtomicBool::new(false);
            let dispatches: Vec<_> = items
                .into_iter()
                .map(|item| self.dispatch_push(sender.as_ref(), item, &outage))
                .collect();
            let outcomes: Vec<Outcome> = stream::iter(dispatches)
                .buffer_unordered(self.config.concurrency)
                .collect()
                .await;
            outcomes.into_iter().for_each(|o| report.record(o));
        }

        if report.is_idle() {
            tracing::trace!("Dispatch cycle idle");
        } else {
            tracing::info!(
                cancelled = report.cancelled,
                recovered = report.recovered,
                claimed = report.claimed,
                sent = report.sent,
                retried = report.retried,
                failed = report.failed,
                released = report.released,
                deactivated = report.deactivated,
                "Dispatch cycle complete"
            );
        }
        Ok(report)
    }

    async fn dispatch_email(
        &self,
        sender: &dyn EmailSender,
        entry: EmailQueueEntry,
        outage: &AtomicBool,
    ) -> Outcome {
        if outage.load(Ordering::Acquire) {
            return self.release(Queue::Email, entry.id).await;
        }

        let message = EmailMessage {
            to: entry.to_address,
            subject: entry.subject,
            body: entry.body,
        };
        let result = self.bounded(sender.send(&message)).await;
        self.settle(Queue::Email, entry.id, entry.retry_count, result, outage)
            .await
    }

    async fn dispatch_push(
        &self,
        sender: &dyn PushSender,
        item: PushDispatchItem,
        outage: &AtomicBool,
    ) -> Outcome {
        if outage.load(Ordering::Acquire) {
            return self.release(Queue::Push, item.id).await;
        }

        let target = PushTarget {
            endpoint: item.endpoint,
            p256dh: item.p256dh,
            auth: item.auth,
        };
        let result = self.bounded(sender.send(&target, &item.payload)).await;

        let expired = matches!(result, Err(DeliveryError::Expired));
        let outcome = self
            .settle(Queue::Push, item.id, item.retry_count, result, outage)
            .await;
        if expired && outcome == Outcome::Failed {
            self.deactivate_subscription(item.subscription_id).await;
            return Outcome::Expired;
        }
        outcome
    }

    /// Apply the collaborator timeout; elapsing counts as a transient failure.
    async fn bounded<F>(&self, fut: F) -> Result<(), DeliveryError>
    where
        F: std::future::Future<Output = Result<(), DeliveryError>>,
    {
        match tokio::time::timeout(self.config.delivery_timeout, fut).await {
            Ok(result) => result,
            Err(_) => Err(DeliveryError::Transient(format!(
                "delivery timed out after {}s",
                self.config.delivery_timeout.as_secs()
            ))),
        }
    }

    /// Record the outcome of one attempt.
    async fn settle(
        &self,
        queue: Queue,
        id: DbId,
        retry_count: i32,
        result: Result<(), DeliveryError>,
        outage: &AtomicBool,
    ) -> Outcome {
        let err = match result {
            Ok(()) => {
                return match self.mark_sent(queue, id).await {
                    Ok(true) => Outcome::Sent,
                    Ok(false) => Outcome::Lost,
                    Err(e) => self.lost(queue, id, e),
                };
            }
            Err(err) => err,
        };

        let Some(kind) = err.failure_kind() else {
            if !outage.swap(true, Ordering::AcqRel) {
                tracing::warn!(
                    queue = queue.as_str(),
                    error = %err,
                    "Delivery provider unavailable, pausing channel for this cycle"
                );
            }
            return self.release(queue, id).await;
        };

        let message = err.to_string();
        match self.policy.after_failure(retry_count, kind, Utc::now()) {
            RetryDecision::Retry {
                retry_count,
                scheduled_at,
            } => {
                tracing::warn!(
                    queue = queue.as_str(),
                    entry_id = id,
                    retry_count,
                    %scheduled_at,
                    error = %message,
                    "Delivery failed, retry scheduled"
                );
                let recorded = match queue {
                    Queue::Email => {
                        EmailQueueRepo::schedule_retry(&self.pool, id, retry_count, scheduled_at, &message)
                            .await
                    }
                    Queue::Push => {
                        PushQueueRepo::schedule_retry(&self.pool, id, retry_count, scheduled_at, &message)
                            .await
                    }
                };
                match recorded {
                    Ok(true) => Outcome::Retried,
                    Ok(false) => Outcome::Lost,
                    Err(e) => self.lost(queue, id, e),
                }
            }
            RetryDecision::GiveUp { retry_count } => {
                tracing::error!(
                    queue = queue.as_str(),
                    entry_id = id,
                    retry_count,
                    permanent = kind == FailureKind::Permanent,
                    error = %message,
                    "Delivery failed permanently"
                );
                let recorded = match queue {
                    Queue::Email => {
                        EmailQueueRepo::mark_failed(&self.pool, id, retry_count, &message).await
                    }
                    Queue::Push => PushQueueRepo::mark_failed(&self.pool, id, retry_count, &message).await,
                };
                match recorded {
                    Ok(true) => Outcome::Failed,
                    Ok(false) => Outcome::Lost,
                    Err(e) => self.lost(queue, id, e),
                }
            }
        }
    }

    async fn mark_sent(&self, queue: Queue, id: DbId) -> Result<bool, sqlx::Error> {
        match queue {
            Queue::Email => EmailQueueRepo::mark_sent(&self.pool, id).await,
            Queue::Push => PushQueueRepo::mark_sent(&self.pool, id).await,
        }
    }

    async fn release(&self, queue: Queue, id: DbId) -> Outcome {
        let released = match queue {
            Queue::Email => EmailQueueRepo::release(&self.pool, id).await,
            Queue::Push => PushQueueRepo::release(&self.pool, id).await,
        };
        match released {
            Ok(true) => Outcome::Released,
            Ok(false) => Outcome::Lost,
            Err(e) => self.lost(queue, id, e),
        }
    }

    async fn deactivate_subscription(&self, subscription_id: DbId) {
        match PushSubscriptionRepo::deactivate(&self.pool, subscription_id).await {
            Ok(_) => {
                tracing::info!(subscription_id, "Push subscription expired, deactivated");
                if let Err(e) =
                    PushQueueRepo::cancel_pending_for_subscription(&self.pool, subscription_id)
                        .await
                {
                    tracing::error!(
                        subscription_id,
                        error = %e,
                        "Failed to cancel pending entries of expired subscription"
                    );
                }
            }
            Err(e) => tracing::error!(
                subscription_id,
                error = %e,
                "Failed to deactivate expired push subscription"
            ),
        }
    }

    fn lost(&self, queue: Queue, id: DbId, err: sqlx::Error) -> Outcome {
        tracing::error!(
            queue = queue.as_str(),
            entry_id = id,
            error = %err,
            "Failed to record delivery outcome, entry left for lease recovery"
        );
        Outcome::Lost
    }
}
