//! Handlers for `/notifications/preferences` and `/notifications/settings`.

use axum::extract::{Path, State};
use axum::Json;
use serde::Serialize;
use sitewire_core::notification_type::{NotificationPriority, NotificationType};
use sitewire_core::preferences::DefaultPreferences;
use sitewire_db::models::preference::{
    NotificationPreference, UpdateNotificationSettings, UpdatePreference,
    UserNotificationSettings,
};
use sitewire_db::repositories::NotificationPreferenceRepo;

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

/// One entry of the notification type catalogue.
#[derive(Debug, Serialize)]
pub struct TypeInfo {
    #[serde(rename = "type")]
    pub notification_type: NotificationType,
    pub label: &'static str,
    pub icon: &'static str,
    pub default_priority: NotificationPriority,
}

#[derive(Debug, Serialize)]
pub struct PreferenceOverview {
    /// Rows that exist; types without a row use `defaults`.
    pub preferences: Vec<NotificationPreference>,
    pub defaults: DefaultPreferences,
    pub types: Vec<TypeInfo>,
}

fn catalogue() -> Vec<TypeInfo> {
    NotificationType::ALL
        .into_iter()
        .map(|t| {
            let template = t.template();
            TypeInfo {
                notification_type: t,
                label: template.label,
                icon: template.icon,
                default_priority: template.default_priority,
            }
        })
        .collect()
}

/// GET /api/v1/notifications/preferences
///
/// The caller's stored preferences alongside the full type catalogue, so
/// the client can render toggles for types that have no row yet.
pub async fn get_preferences(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<PreferenceOverview>>> {
    let preferences = NotificationPreferenceRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse {
        data: PreferenceOverview {
            preferences,
            defaults: DefaultPreferences::STANDARD,
            types: catalogue(),
        },
    }))
}

/// PUT /api/v1/notifications/preferences/{type}
pub async fn update_preference(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_type): Path<String>,
    Json(input): Json<UpdatePreference>,
) -> AppResult<Json<DataResponse<NotificationPreference>>> {
    let notification_type: NotificationType = notification_type.parse()?;
    let pref = NotificationPreferenceRepo::update(
        &state.pool,
        auth.user_id,
        notification_type,
        &input,
        &DefaultPreferences::STANDARD,
    )
    .await?;

    tracing::info!(
        user_id = auth.user_id,
        notification_type = %notification_type,
        email_enabled = pref.email_enabled,
        push_enabled = pref.push_enabled,
        in_app_enabled = pref.in_app_enabled,
        "Notification preference updated"
    );
    Ok(Json(DataResponse { data: pref }))
}

/// GET /api/v1/notifications/settings
pub async fn get_settings(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UserNotificationSettings>>> {
    let settings =
        NotificationPreferenceRepo::get_or_create_settings(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: settings }))
}

/// PUT /api/v1/notifications/settings
///
/// Quiet-hours times must be `HH:MM` and the timezone a valid IANA name;
/// anything else is rejected with 400 before touching the database.
pub async fn update_settings(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UpdateNotificationSettings>,
) -> AppResult<Json<DataResponse<UserNotificationSettings>>> {
    let validated = input.validate()?;
    let settings =
        NotificationPreferenceRepo::update_settings(&state.pool, auth.user_id, &validated).await?;
    Ok(Json(DataResponse { data: settings }))
}
