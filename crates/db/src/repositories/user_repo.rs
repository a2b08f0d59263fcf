//! Read-only lookups against the `users` and `organization_members` tables.

use sqlx::PgPool;
use sitewire_core::types::DbId;

use crate::models::user::User;

/// Column list for `users` queries.
const COLUMNS: &str = "id, email, display_name, is_active, created_at";

pub struct UserRepo;

impl UserRepo {
    pub async fn find_by_id(pool: &PgPool, id: DbId) -> Result<Option<User>, sqlx::Error> {
        let query = format!("SELECT {COLUMNS} FROM users WHERE id = $1");
        sqlx::query_as::<_, User>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Active users among `ids`, in id order. Unknown and inactive ids are dropped.
    pub async fn find_active(pool: &PgPool, ids: &[DbId]) -> Result<Vec<User>, sqlx::Error> {
        let query = format!(
            "SELECT {COLUMNS} FROM users \
             WHERE id = ANY($1) AND is_active = true \
             ORDER BY id"
        );
        sqlx::query_as::<_, User>(&query)
            .bind(ids)
            .fetch_all(pool)
            .await
    }

    /// Email address of an active user, if any.
    pub async fn email_for(pool: &PgPool, id: DbId) -> Result<Option<String>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT email FROM users WHERE id = $1 AND is_active = true",
        )
        .bind(id)
        .fetch_optional(pool)
        .await
    }

    /// Ids of the active members of an organization.
    pub async fn organization_member_ids(
        pool: &PgPool,
        organization_id: DbId,
    ) -> Result<Vec<DbId>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT m.user_id FROM organization_members m \
             JOIN users u ON u.id = m.user_id \
             WHERE m.organization_id = $1 AND u.is_active = true \
             ORDER BY m.user_id",
        )
        .bind(organization_id)
        .fetch_all(pool)
        .await
    }
}
