//! Mirror of the application's user rows.

use serde::Serialize;
use sitewire_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `users` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct User {
    pub id: DbId,
    pub email: String,
    pub display_name: String,
    pub is_active: bool,
    pub created_at: Timestamp,
}
