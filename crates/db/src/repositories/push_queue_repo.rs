//! Repository for the `push_queue` table.

use sqlx::PgPool;
use sitewire_core::types::{DbId, StatusId, Timestamp};

use crate::models::queue::{NewPushEntry, PushDispatchItem, PushQueueEntry, QueueStatusCount};
use crate::models::status::QueueStatus;
use crate::repositories::queue_ops;

const TABLE: &str = "push_queue";

/// Column list for `push_queue` queries.
const COLUMNS: &str = "id, notification_id, recipient_id, subscription_id, payload, priority, \
    status_id, retry_count, scheduled_at, claimed_at, sent_at, last_error, created_at, updated_at";

pub struct PushQueueRepo;

impl PushQueueRepo {
    /// Append an entry. Returns `None` when one already exists for the
    /// (notification, subscription) pair.
    pub async fn enqueue(pool: &PgPool, input: &NewPushEntry) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO push_queue \
                (notification_id, recipient_id, subscription_id, payload, priority, scheduled_at) \
             VALUES ($1, $2, $3, $4, $5, COALESCE($6, NOW())) \
             ON CONFLICT (notification_id, subscription_id) DO NOTHING \
             RETURNING id",
        )
        .bind(input.notification_id)
        .bind(input.recipient_id)
        .bind(input.subscription_id)
        .bind(&input.payload)
        .bind(input.priority)
        .bind(input.scheduled_at)
        .fetch_optional(pool)
        .await
    }

    /// Atomically claim up to `limit` due entries whose subscription is still
    /// active and still owned by the entry's recipient, returning them joined
    /// with the endpoint and keys.
    pub async fn claim_due(pool: &PgPool, limit: i64) -> Result<Vec<PushDispatchItem>, sqlx::Error> {
        sqlx::query_as::<_, PushDispatchItem>(
            "WITH claimed AS ( \
                UPDATE push_queue q \
                SET status_id = $2, claimed_at = NOW(), updated_at = NOW() \
                WHERE q.id IN ( \
                    SELECT pq.id FROM push_queue pq \
                    JOIN push_subscriptions s ON s.id = pq.subscription_id \
                    WHERE pq.status_id = $3 AND pq.scheduled_at <= NOW() AND s.is_active \
                      AND s.user_id = pq.recipient_id \
                    ORDER BY pq.priority DESC, pq.scheduled_at ASC \
                    LIMIT $1 \
                    FOR UPDATE OF pq SKIP LOCKED) \
                  AND q.status_id = $3 \
                RETURNING q.id, q.notification_id, q.recipient_id, q.subscription_id, \
                          q.payload, q.retry_count, q.priority, q.scheduled_at) \
             SELECT c.id, c.notification_id, c.recipient_id, c.subscription_id, c.payload, \
                    c.retry_count, s.endpoint, s.p256dh, s.auth \
             FROM claimed c \
             JOIN push_subscriptions s ON s.id = c.subscription_id \
             ORDER BY c.priority DESC, c.scheduled_at ASC",
        )
        .bind(limit)
        .bind(QueueStatus::Sending.id())
        .bind(QueueStatus::Pending.id())
        .fetch_all(pool)
        .await
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PushQueueEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM push_queue WHERE id = $1");
        sqlx::query_as::<_, PushQueueEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_notification(
        pool: &PgPool,
        notification_id: DbId,
    ) -> Result<Vec<PushQueueEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM push_queue WHERE notification_id = $1 ORDER BY subscription_id"
        );
        sqlx::query_as::<_, PushQueueEntry>(&query)
            .bind(notification_id)
            .fetch_all(pool)
            .await
    }

    /// List entries, optionally filtered by status, most recently updated first.
    pub async fn list_by_status(
        pool: &PgPool,
        status_id: Option<StatusId>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<PushQueueEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM push_queue \
             WHERE ($1::SMALLINT IS NULL OR status_id = $1) \
             ORDER BY updated_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, PushQueueEntry>(&query)
            .bind(status_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    /// Cancel the pending entries of a subscription that was deactivated.
    ///
    /// Entries already `sending`, `sent` or `failed` are left untouched.
    pub async fn cancel_pending_for_subscription(
        pool: &PgPool,
        subscription_id: DbId,
    ) -> Result<u64, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE push_queue SET status_id = $2, last_error = 'subscription deactivated', \
                updated_at = NOW() \
             WHERE subscription_id = $1 AND status_id = $3",
        )
        .bind(subscription_id)
        .bind(QueueStatus::Cancelled.id())
        .bind(QueueStatus::Pending.id())
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    pub async fn mark_sent(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        queue_ops::mark_sent(pool, TABLE, id).await
    }

    pub async fn schedule_retry(
        pool: &PgPool,
        id: DbId,
        retry_count: i32,
        scheduled_at: Timestamp,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        queue_ops::schedule_retry(pool, TABLE, id, retry_count, scheduled_at, error).await
    }

    pub async fn mark_failed(
        pool: &PgPool,
        id: DbId,
        retry_count: i32,
        error: &str,
    ) -> Result<bool, sqlx::Error> {
        queue_ops::mark_failed(pool, TABLE, id, retry_count, error).await
    }

    pub async fn release(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        queue_ops::release(pool, TABLE, id).await
    }

    pub async fn cancel_expired(pool: &PgPool) -> Result<u64, sqlx::Error> {
        queue_ops::cancel_expired(pool, TABLE).await
    }

    pub async fn requeue_stale(pool: &PgPool, lease_secs: i64) -> Result<u64, sqlx::Error> {
        queue_ops::requeue_stale(pool, TABLE, lease_secs).await
    }

    pub async fn status_counts(pool: &PgPool) -> Result<Vec<QueueStatusCount>, sqlx::Error> {
        queue_ops::status_counts(pool, TABLE).await
    }

    pub async fn manual_retry(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        queue_ops::manual_retry(pool, TABLE, id).await
    }
}
