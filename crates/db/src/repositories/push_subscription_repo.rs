//! Repository for the `push_subscriptions` table.

use sqlx::PgPool;
use sitewire_core::types::DbId;

use crate::models::push_subscription::{PushSubscription, RegisterPushSubscription};
use crate::models::status::QueueStatus;

/// Column list for `push_subscriptions` queries.
const COLUMNS: &str =
    "id, user_id, endpoint, p256dh, auth, user_agent, is_active, created_at, updated_at";

pub struct PushSubscriptionRepo;

impl PushSubscriptionRepo {
    /// Register an endpoint for `user_id`.
    ///
    /// An existing row with the same endpoint is moved to this user,
    /// its keys refreshed and reactivated. Pending push entries queued for
    /// a previous owner of the endpoint are cancelled in the same
    /// transaction.
    pub async fn upsert(
        pool: &PgPool,
        user_id: DbId,
        input: &RegisterPushSubscription,
    ) -> Result<PushSubscription, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let query = format!(
            "INSERT INTO push_subscriptions (user_id, endpoint, p256dh, auth, user_agent) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (endpoint) DO UPDATE SET \
                user_id = EXCLUDED.user_id, \
                p256dh = EXCLUDED.p256dh, \
                auth = EXCLUDED.auth, \
                user_agent = EXCLUDED.user_agent, \
                is_active = true, \
                updated_at = NOW() \
             RETURNING {COLUMNS}"
        );
        let sub = sqlx::query_as::<_, PushSubscription>(&query)
            .bind(user_id)
            .bind(&input.endpoint)
            .bind(&input.keys.p256dh)
            .bind(&input.keys.auth)
            .bind(&input.user_agent)
            .fetch_one(&mut *tx)
            .await?;

        let orphaned = sqlx::query(
            "UPDATE push_queue SET status_id = $3, \
                last_error = 'subscription re-registered by another user', updated_at = NOW() \
             WHERE subscription_id = $1 AND recipient_id <> $2 AND status_id = $4",
        )
        .bind(sub.id)
        .bind(user_id)
        .bind(QueueStatus::Cancelled.id())
        .bind(QueueStatus::Pending.id())
        .execute(&mut *tx)
        .await?
        .rows_affected();

        tx.commit().await?;

        if orphaned > 0 {
            tracing::info!(
                subscription_id = sub.id,
                user_id,
                cancelled = orphaned,
                "Push endpoint changed owner, cancelled entries of the previous owner"
            );
        }
        Ok(sub)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<PushSubscription>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM push_subscriptions WHERE id = $1");
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// All of a user's subscriptions, active ones first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PushSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM push_subscriptions \
             WHERE user_id = $1 ORDER BY is_active DESC, id"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    pub async fn list_active_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<PushSubscription>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM push_subscriptions \
             WHERE user_id = $1 AND is_active = true ORDER BY id"
        );
        sqlx::query_as::<_, PushSubscription>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Deactivate a user's subscription by endpoint, returning its id if
    /// it was active.
    pub async fn deactivate_for_user(
        pool: &PgPool,
        user_id: DbId,
        endpoint: &str,
    ) -> Result<Option<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "UPDATE push_subscriptions SET is_active = false, updated_at = NOW() \
             WHERE user_id = $1 AND endpoint = $2 AND is_active = true \
             RETURNING id",
        )
        .bind(user_id)
        .bind(endpoint)
        .fetch_optional(pool)
        .await
    }

    /// Deactivate a subscription the push service reported as gone.
    pub async fn deactivate(pool: &PgPool, id: DbId) -> Result<bool, sqlx::Error> {
        let result = sqlx::query(
            "UPDATE push_subscriptions SET is_active = false, updated_at = NOW() \
             WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .execute(pool)
        .await?;
        Ok(result.rows_affected() > 0)
    }
}
