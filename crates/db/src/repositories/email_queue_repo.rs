//! Repository for the `email_queue` table.

use sqlx::PgPool;
use sitewire_core::types::{DbId, StatusId, Timestamp};

use crate::models::queue::{EmailQueueEntry, NewEmailEntry, QueueStatusCount};
use crate::models::status::QueueStatus;
use crate::repositories::queue_ops;

const TABLE: &str = "email_queue";

/// Column list for `email_queue` queries.
const COLUMNS: &str = "id, notification_id, recipient_id, to_address, subject, body, priority, \
    status_id, retry_count, scheduled_at, claimed_at, sent_at, last_error, created_at, updated_at";

pub struct EmailQueueRepo;

impl EmailQueueRepo {
    /// Append an entry. Returns `None` when one already exists for the
    /// (notification, recipient) pair.
    pub async fn enqueue(
        pool: &PgPool,
        input: &NewEmailEntry,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "INSERT INTO email_queue \
                (notification_id, recipient_id, to_address, subject, body, priority, scheduled_at) \
             VALUES ($1, $2, $3, $4, $5, $6, COALESCE($7, NOW())) \
             ON CONFLICT (notification_id, recipient_id) DO NOTHING \
             RETURNING id",
        )
        .bind(input.notification_id)
        .bind(input.recipient_id)
        .bind(&input.to_address)
        .bind(&input.subject)
        .bind(&input.body)
        .bind(input.priority)
        .bind(input.scheduled_at)
        .fetch_optional(pool)
        .await
    }

    /// Atomically move up to `limit` due entries from `pending` to `sending`.
    ///
    /// Rows locked by a concurrent claimer are skipped, so two processors
    /// never receive the same entry. The result is ordered by priority
    /// (highest first), then by schedule.
    pub async fn claim_due(pool: &PgPool, limit: i64) -> Result<Vec<EmailQueueEntry>, sqlx::Error> {
        let query = format!(
            "UPDATE email_queue SET status_id = $2, claimed_at = NOW(), updated_at = NOW() \
             WHERE id IN ( \
                SELECT id FROM email_queue \
                WHERE status_id = $3 AND scheduled_at <= NOW() \
                ORDER BY priority DESC, scheduled_at ASC \
                LIMIT $1 \
                FOR UPDATE SKIP LOCKED) \
               AND status_id = $3 \
             RETURNING {COLUMNS}"
        );
        let mut entries = sqlx::query_as::<_, EmailQueueEntry>(&query)
            .bind(limit)
            .bind(QueueStatus::Sending.id())
            .bind(QueueStatus::Pending.id())
            .fetch_all(pool)
            .await?;
        entries.sort_by(|a, b| {
            b.priority
                .cmp(&a.priority)
                .then(a.scheduled_at.cmp(&b.scheduled_at))
        });
        Ok(entries)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<EmailQueueEntry>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM email_queue WHERE id = $1");
        sqlx::query_as::<_, EmailQueueEntry>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    pub async fn list_for_notification(
        pool: &PgPool,
        notification_id: DbId,
    ) -> Result<Vec<EmailQueueEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_queue WHERE notification_id = $1 ORDER BY recipient_id"
        );
        sqlx::query_as::<_, EmailQueueEntry>(&query)
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
    ) -> Result<Vec<EmailQueueEntry>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM email_queue \
             WHERE ($1::SMALLINT IS NULL OR status_id = $1) \
             ORDER BY updated_at DESC, id DESC \
             LIMIT $2 OFFSET $3"
        );
        sqlx::query_as::<_, EmailQueueEntry>(&query)
            .bind(status_id)
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
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
