//! Repository for the `notification_preferences` and `user_notification_settings` tables.
//!
//! Rows are created lazily. Every insert path uses `ON CONFLICT DO NOTHING`
//! (or `DO UPDATE` for explicit writes) so that concurrent first attempts for
//! the same user never race into a unique violation.

use sqlx::PgPool;
use sitewire_core::notification_type::NotificationType;
use sitewire_core::preferences::{DefaultPreferences, ResolvedPreference};
use sitewire_core::types::DbId;

use crate::models::preference::{
    NotificationPreference, UpdatePreference, UserNotificationSettings, ValidatedSettingsUpdate,
};

/// Column list for `notification_preferences` queries.
const PREF_COLUMNS: &str = "id, user_id, notification_type, email_enabled, push_enabled, \
    in_app_enabled, created_at, updated_at";

/// Column list for `user_notification_settings` queries.
const SETTINGS_COLUMNS: &str = "id, user_id, notifications_enabled, quiet_hours_enabled, \
    quiet_hours_start, quiet_hours_end, timezone, created_at, updated_at";

pub struct NotificationPreferenceRepo;

impl NotificationPreferenceRepo {
    /// List all stored per-type preferences for a user.
    pub async fn list_for_user(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<Vec<NotificationPreference>, sqlx::Error> {
        let query = format!(
            "SELECT {PREF_COLUMNS} FROM notification_preferences \
             WHERE user_id = $1 \
             ORDER BY notification_type"
        );
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .fetch_all(pool)
            .await
    }

    /// Return the (user, type) preference, inserting `defaults` if absent.
    pub async fn get_or_create(
        pool: &PgPool,
        user_id: DbId,
        notification_type: NotificationType,
        defaults: &DefaultPreferences,
    ) -> Result<NotificationPreference, sqlx::Error> {
        sqlx::query(
            "INSERT INTO notification_preferences \
                (user_id, notification_type, email_enabled, push_enabled, in_app_enabled) \
             VALUES ($1, $2, $3, $4, $5) \
             ON CONFLICT (user_id, notification_type) DO NOTHING",
        )
        .bind(user_id)
        .bind(notification_type.as_str())
        .bind(defaults.email_enabled)
        .bind(defaults.push_enabled)
        .bind(defaults.in_app_enabled)
        .execute(pool)
        .await?;

        let query = format!(
            "SELECT {PREF_COLUMNS} FROM notification_preferences \
             WHERE user_id = $1 AND notification_type = $2"
        );
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .bind(notification_type.as_str())
            .fetch_one(pool)
            .await
    }

    /// Partially update one type's channel flags.
    ///
    /// Fields left `None` keep their stored value, or the default when the
    /// row does not exist yet.
    pub async fn update(
        pool: &PgPool,
        user_id: DbId,
        notification_type: NotificationType,
        input: &UpdatePreference,
        defaults: &DefaultPreferences,
    ) -> Result<NotificationPreference, sqlx::Error> {
        let query = format!(
            "INSERT INTO notification_preferences \
                (user_id, notification_type, email_enabled, push_enabled, in_app_enabled) \
             VALUES ($1, $2, COALESCE($3, $6), COALESCE($4, $7), COALESCE($5, $8)) \
             ON CONFLICT (user_id, notification_type) DO UPDATE SET \
                email_enabled = COALESCE($3, notification_preferences.email_enabled), \
                push_enabled = COALESCE($4, notification_preferences.push_enabled), \
                in_app_enabled = COALESCE($5, notification_preferences.in_app_enabled), \
                updated_at = NOW() \
             RETURNING {PREF_COLUMNS}"
        );
        sqlx::query_as::<_, NotificationPreference>(&query)
            .bind(user_id)
            .bind(notification_type.as_str())
            .bind(input.email_enabled)
            .bind(input.push_enabled)
            .bind(input.in_app_enabled)
            .bind(defaults.email_enabled)
            .bind(defaults.push_enabled)
            .bind(defaults.in_app_enabled)
            .fetch_one(pool)
            .await
    }

    /// Return the user's global settings, inserting column defaults if absent.
    pub async fn get_or_create_settings(
        pool: &PgPool,
        user_id: DbId,
    ) -> Result<UserNotificationSettings, sqlx::Error> {
        sqlx::query(
            "INSERT INTO user_notification_settings (user_id) VALUES ($1) \
             ON CONFLICT (user_id) DO NOTHING",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        let query =
            format!("SELECT {SETTINGS_COLUMNS} FROM user_notification_settings WHERE user_id = $1");
        sqlx::query_as::<_, UserNotificationSettings>(&query)
            .bind(user_id)
            .fetch_one(pool)
            .await
    }

    /// Insert or update user notification settings.
    ///
    /// Uses `COALESCE` to only overwrite fields that are `Some` in the input.
    pub async fn update_settings(
        pool: &PgPool,
        user_id: DbId,
        settings: &ValidatedSettingsUpdate,
    ) -> Result<UserNotificationSettings, sqlx::Error> {
        let query = format!(
            "INSERT INTO user_notification_settings \
                (user_id, notifications_enabled, quiet_hours_enabled, \
                 quiet_hours_start, quiet_hours_end, timezone) \
             VALUES ($1, COALESCE($2, true), COALESCE($3, false), \
                     COALESCE($4, '22:00'::TIME), COALESCE($5, '07:00'::TIME), \
                     COALESCE($6, 'UTC')) \
             ON CONFLICT (user_id) DO UPDATE SET \
                notifications_enabled = COALESCE($2, user_notification_settings.notifications_enabled), \
                quiet_hours_enabled = COALESCE($3, user_notification_settings.quiet_hours_enabled), \
                quiet_hours_start = COALESCE($4, user_notification_settings.quiet_hours_start), \
                quiet_hours_end = COALESCE($5, user_notification_settings.quiet_hours_end), \
                timezone = COALESCE($6, user_notification_settings.timezone), \
                updated_at = NOW() \
             RETURNING {SETTINGS_COLUMNS}"
        );
        sqlx::query_as::<_, UserNotificationSettings>(&query)
            .bind(user_id)
            .bind(settings.notifications_enabled)
            .bind(settings.quiet_hours_enabled)
            .bind(settings.quiet_hours_start)
            .bind(settings.quiet_hours_end)
            .bind(&settings.timezone)
            .fetch_one(pool)
            .await
    }

    /// Effective preference for one (user, type), healing missing rows first.
    pub async fn resolve(
        pool: &PgPool,
        user_id: DbId,
        notification_type: NotificationType,
        defaults: &DefaultPreferences,
    ) -> Result<ResolvedPreference, sqlx::Error> {
        let pref = Self::get_or_create(pool, user_id, notification_type, defaults).await?;
        let settings = Self::get_or_create_settings(pool, user_id).await?;
        Ok(settings.resolve(&pref))
    }
}
