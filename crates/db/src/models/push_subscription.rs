//! Registered push endpoints.

use serde::{Deserialize, Serialize};
use sitewire_core::error::CoreError;
use sitewire_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `push_subscriptions` table.
///
/// Key material is not serialized back to clients.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct PushSubscription {
    pub id: DbId,
    pub user_id: DbId,
    pub endpoint: String,
    #[serde(skip_serializing)]
    pub p256dh: String,
    #[serde(skip_serializing)]
    pub auth: String,
    pub user_agent: Option<String>,
    pub is_active: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

/// Browser-supplied encryption keys.
#[derive(Debug, Clone, Deserialize)]
pub struct PushKeys {
    pub p256dh: String,
    pub auth: String,
}

/// DTO matching the browser's `PushSubscription.toJSON()` shape.
#[derive(Debug, Clone, Deserialize)]
pub struct RegisterPushSubscription {
    pub endpoint: String,
    pub keys: PushKeys,
    pub user_agent: Option<String>,
}

impl RegisterPushSubscription {
    pub fn validate(&self) -> Result<(), CoreError> {
        if !self.endpoint.starts_with("https://") {
            return Err(CoreError::Validation(
                "Push endpoint must be an https URL".into(),
            ));
        }
        if self.keys.p256dh.trim().is_empty() || self.keys.auth.trim().is_empty() {
            return Err(CoreError::Validation(
                "Push subscription keys must not be empty".into(),
            ));
        }
        Ok(())
    }
}
