//! Repository for the notification ledger: `notifications`,
//! `notification_recipients` and `notification_reads`.

use sqlx::PgPool;
use sitewire_core::types::DbId;

use crate::models::notification::{
    NewNotification, Notification, NotificationFilter, NotificationListItem,
};

/// Column list for `notifications` queries.
const COLUMNS: &str = "id, notification_type, title, message, priority, entity_type, \
    entity_id, metadata, action_url, created_at, expires_at";

/// Column list for inbox queries joined through `notification_recipients`.
const LIST_COLUMNS: &str = "n.id, n.notification_type, n.title, n.message, n.priority, \
    n.entity_type, n.entity_id, n.metadata, n.action_url, n.created_at, n.expires_at, \
    rd.read_at";

/// Join and predicate shared by every inbox query: the recipient row must be
/// visible in-app and the notification must not have expired.
const VISIBLE_FOR_USER: &str = "FROM notifications n \
    JOIN notification_recipients r ON r.notification_id = n.id AND r.user_id = $1 \
    LEFT JOIN notification_reads rd ON rd.notification_id = n.id AND rd.user_id = $1 \
    WHERE r.in_app = true \
      AND (n.expires_at IS NULL OR n.expires_at > NOW())";

/// Result of marking one notification read.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MarkReadOutcome {
    Marked,
    AlreadyRead,
    /// The user is not a visible recipient of this notification.
    NotRecipient,
}

pub struct NotificationRepo;

impl NotificationRepo {
    /// Insert a notification and its recipient rows in one transaction.
    ///
    /// Recipients are de-duplicated by user id; when the same user appears
    /// twice the in-app flags are OR-ed. An empty recipient list is rejected
    /// before touching the database.
    pub async fn create(pool: &PgPool, input: &NewNotification) -> Result<DbId, sqlx::Error> {
        let mut recipients = input.recipients.clone();
        recipients.sort_by_key(|r| r.user_id);
        recipients.dedup_by(|later, kept| {
            if later.user_id == kept.user_id {
                kept.in_app |= later.in_app;
                true
            } else {
                false
            }
        });
        if recipients.is_empty() {
            return Err(sqlx::Error::Protocol(
                "notification requires at least one recipient".into(),
            ));
        }

        let (entity_type, entity_id) = match &input.entity {
            Some(e) => (Some(e.entity_type.as_str()), Some(e.entity_id)),
            None => (None, None),
        };

        let mut tx = pool.begin().await?;

        let id: DbId = sqlx::query_scalar(
            "INSERT INTO notifications \
                (notification_type, title, message, priority, entity_type, entity_id, \
                 metadata, action_url, expires_at) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING id",
        )
        .bind(input.notification_type.as_str())
        .bind(&input.title)
        .bind(&input.message)
        .bind(input.priority.as_str())
        .bind(entity_type)
        .bind(entity_id)
        .bind(&input.metadata)
        .bind(&input.action_url)
        .bind(input.expires_at)
        .fetch_one(&mut *tx)
        .await?;

        let user_ids: Vec<DbId> = recipients.iter().map(|r| r.user_id).collect();
        let in_app: Vec<bool> = recipients.iter().map(|r| r.in_app).collect();
        sqlx::query(
            "INSERT INTO notification_recipients (notification_id, user_id, in_app) \
             SELECT $1, u, a FROM UNNEST($2::BIGINT[], $3::BOOLEAN[]) AS t(u, a)",
        )
        .bind(id)
        .bind(&user_ids)
        .bind(&in_app)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(id)
    }

    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<Notification>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM notifications WHERE id = $1");
        sqlx::query_as::<_, Notification>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// List a user's visible, unexpired notifications, newest first.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
        filter: &NotificationFilter,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<NotificationListItem>, sqlx::Error> {
        let unread = if filter.unread_only {
            "AND rd.read_at IS NULL"
        } else {
            ""
        };
        let query = format!(
            "SELECT {LIST_COLUMNS} {VISIBLE_FOR_USER} {unread} \
               AND ($2::TEXT IS NULL OR n.notification_type = $2) \
               AND ($3::TEXT IS NULL OR n.priority = $3) \
             ORDER BY n.created_at DESC, n.id DESC \
             LIMIT $4 OFFSET $5"
        );
        sqlx::query_as::<_, NotificationListItem>(&query)
            .bind(user_id)
            .bind(filter.notification_type.map(|t| t.as_str()))
            .bind(filter.priority.map(|p| p.as_str()))
            .bind(limit)
            .bind(offset)
            .fetch_all(pool)
            .await
    }

    pub async fn unread_count(pool: &PgPool, user_id: DbId) -> Result<i64, sqlx::Error> {
        let query = format!("SELECT COUNT(*) {VISIBLE_FOR_USER} AND rd.read_at IS NULL");
        let count: Option<i64> = sqlx::query_scalar(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await?;
        Ok(count.unwrap_or(0))
    }

    /// Whether `user_id` can see `notification_id` in their inbox.
    pub async fn is_recipient(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT EXISTS ( \
                SELECT 1 FROM notification_recipients \
                WHERE notification_id = $1 AND user_id = $2 AND in_app = true)",
        )
        .bind(notification_id)
        .bind(user_id)
        .fetch_one(pool)
        .await
    }

    /// Mark one notification read. Repeating the call is harmless.
    pub async fn mark_read(
        pool: &PgPool,
        notification_id: DbId,
        user_id: DbId,
    ) -> Result<MarkReadOutcome, sqlx::Error> {
        let result = sqlx::query(
            "INSERT INTO notification_reads (notification_id, user_id) \
             SELECT r.notification_id, r.user_id FROM notification_recipients r \
             WHERE r.notification_id = $1 AND r.user_id = $2 AND r.in_app = true \
             ON CONFLICT (notification_id, user_id) DO NOTHING",
        )
        .bind(notification_id)
        .bind(user_id)
        .execute(pool)
        .await?;

        if result.rows_affected() > 0 {
            return Ok(MarkReadOutcome::Marked);
        }
        if Self::is_recipient(pool, notification_id, user_id).await? {
            Ok(MarkReadOutcome::AlreadyRead)
        } else {
            Ok(MarkReadOutcome::NotRecipient)
        }
    }

    /// Mark every visible unread notification read in a single statement.
    ///
    /// Returns the number of read markers created; a repeated call returns 0.
    pub async fn mark_all_read(pool: &PgPool, user_id: DbId) -> Result<u64, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_reads (notification_id, user_id) \
             SELECT n.id, $1 {VISIBLE_FOR_USER} AND rd.read_at IS NULL \
             ON CONFLICT (notification_id, user_id) DO NOTHING"
        );
        let result = sqlx::query(&query).bind(user_id).execute(pool).await?;
        Ok(result.rows_affected())
    }
}
