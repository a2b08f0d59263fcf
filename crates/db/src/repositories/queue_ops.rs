//! Status transitions shared by the email and push queue tables.
//!
//! Both tables carry the same lifecycle columns (`status_id`, `retry_count`,
//! `scheduled_at`, `claimed_at`, `sent_at`, `last_error`). Every transition
//! out of `sending` is conditional on the entry still being `sending`, so a
//! late worker whose claim was recovered cannot overwrite a newer outcome.

use sqlx::PgPool;
use sitewire_core::types::{DbId, Timestamp};

use crate::models::queue::QueueStatusCount;
use crate::models::status::QueueStatus;

pub(crate) async fn mark_sent(pool: &PgPool, table: &str, id: DbId) -> Result<bool, sqlx::Error> {
    let query = format!(
        "UPDATE {table} SET status_id = $2, sent_at = NOW(), last_error = NULL, updated_at = NOW() \
         WHERE id = $1 AND status_id = $3"
    );
    let result = sqlx::query(&query)
        .bind(id)
        .bind(QueueStatus::Sent.id())
        .bind(QueueStatus::Sending.id())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn schedule_retry(
    pool: &PgPool,
    table: &str,
    id: DbId,
    retry_count: i32,
    scheduled_at: Timestamp,
    error: &str,
) -> Result<bool, sqlx::Error> {
    let query = format!(
        "UPDATE {table} SET status_id = $2, retry_count = $3, scheduled_at = $4, \
            last_error = $5, claimed_at = NULL, updated_at = NOW() \
         WHERE id = $1 AND status_id = $6"
    );
    let result = sqlx::query(&query)
        .bind(id)
        .bind(QueueStatus::Pending.id())
        .bind(retry_count)
        .bind(scheduled_at)
        .bind(error)
        .bind(QueueStatus::Sending.id())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

pub(crate) async fn mark_failed(
    pool: &PgPool,
    table: &str,
    id: DbId,
    retry_count: i32,
    error: &str,
) -> Result<bool, sqlx::Error> {
    let query = format!(
        "UPDATE {table} SET status_id = $2, retry_count = $3, last_error = $4, \
            claimed_at = NULL, updated_at = NOW() \
         WHERE id = $1 AND status_id = $5"
    );
    let result = sqlx::query(&query)
        .bind(id)
        .bind(QueueStatus::Failed.id())
        .bind(retry_count)
        .bind(error)
        .bind(QueueStatus::Sending.id())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Return a claimed entry to `pending` without touching its retry state.
pub(crate) async fn release(pool: &PgPool, table: &str, id: DbId) -> Result<bool, sqlx::Error> {
    let query = format!(
        "UPDATE {table} SET status_id = $2, claimed_at = NULL, updated_at = NOW() \
         WHERE id = $1 AND status_id = $3"
    );
    let result = sqlx::query(&query)
        .bind(id)
        .bind(QueueStatus::Pending.id())
        .bind(QueueStatus::Sending.id())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}

/// Cancel pending entries whose notification has expired.
pub(crate) async fn cancel_expired(pool: &PgPool, table: &str) -> Result<u64, sqlx::Error> {
    let query = format!(
        "UPDATE {table} q SET status_id = $1, last_error = 'notification expired', \
            updated_at = NOW() \
         FROM notifications n \
         WHERE n.id = q.notification_id \
           AND q.status_id = $2 \
           AND n.expires_at IS NOT NULL AND n.expires_at <= NOW()"
    );
    let result = sqlx::query(&query)
        .bind(QueueStatus::Cancelled.id())
        .bind(QueueStatus::Pending.id())
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

/// Return entries stuck in `sending` for longer than `lease_secs` to `pending`.
pub(crate) async fn requeue_stale(
    pool: &PgPool,
    table: &str,
    lease_secs: i64,
) -> Result<u64, sqlx::Error> {
    let query = format!(
        "UPDATE {table} SET status_id = $1, claimed_at = NULL, updated_at = NOW() \
         WHERE status_id = $2 \
           AND claimed_at < NOW() - make_interval(secs => $3::DOUBLE PRECISION)"
    );
    let result = sqlx::query(&query)
        .bind(QueueStatus::Pending.id())
        .bind(QueueStatus::Sending.id())
        .bind(lease_secs as f64)
        .execute(pool)
        .await?;
    Ok(result.rows_affected())
}

pub(crate) async fn status_counts(
    pool: &PgPool,
    table: &str,
) -> Result<Vec<QueueStatusCount>, sqlx::Error> {
    let query = format!(
        "SELECT status_id, COUNT(*) AS count FROM {table} GROUP BY status_id ORDER BY status_id"
    );
    sqlx::query_as::<_, QueueStatusCount>(&query)
        .fetch_all(pool)
        .await
}

/// Reopen a `failed` or `cancelled` entry for immediate dispatch.
pub(crate) async fn manual_retry(pool: &PgPool, table: &str, id: DbId) -> Result<bool, sqlx::Error> {
    let query = format!(
        "UPDATE {table} SET status_id = $2, retry_count = 0, scheduled_at = NOW(), \
            last_error = NULL, claimed_at = NULL, updated_at = NOW() \
         WHERE id = $1 AND status_id IN ($3, $4)"
    );
    let result = sqlx::query(&query)
        .bind(id)
        .bind(QueueStatus::Pending.id())
        .bind(QueueStatus::Failed.id())
        .bind(QueueStatus::Cancelled.id())
        .execute(pool)
        .await?;
    Ok(result.rows_affected() > 0)
}
