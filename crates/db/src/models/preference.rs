//! Notification preference entities and DTOs.

use chrono::NaiveTime;
use serde::{Deserialize, Serialize};
use sitewire_core::error::CoreError;
use sitewire_core::preferences::{ChannelFlags, QuietHours, ResolvedPreference};
use sitewire_core::types::{DbId, Timestamp};
use sqlx::FromRow;

/// A row from the `notification_preferences` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct NotificationPreference {
    pub id: DbId,
    pub user_id: DbId,
    pub notification_type: String,
    pub email_enabled: bool,
    pub push_enabled: bool,
    pub in_app_enabled: bool,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl NotificationPreference {
    pub fn channels(&self) -> ChannelFlags {
        ChannelFlags {
            email_enabled: self.email_enabled,
            push_enabled: self.push_enabled,
            in_app_enabled: self.in_app_enabled,
        }
    }
}

/// A row from the `user_notification_settings` table.
#[derive(Debug, Clone, FromRow, Serialize)]
pub struct UserNotificationSettings {
    pub id: DbId,
    pub user_id: DbId,
    pub notifications_enabled: bool,
    pub quiet_hours_enabled: bool,
    pub quiet_hours_start: NaiveTime,
    pub quiet_hours_end: NaiveTime,
    pub timezone: String,
    pub created_at: Timestamp,
    pub updated_at: Timestamp,
}

impl UserNotificationSettings {
    /// The active quiet-hours window, if enabled.
    ///
    /// A stored timezone that no longer parses falls back to UTC rather than
    /// disabling the window.
    pub fn quiet_hours(&self) -> Option<QuietHours> {
        if !self.quiet_hours_enabled {
            return None;
        }
        let window = QuietHours::new(
            self.quiet_hours_start,
            self.quiet_hours_end,
            &self.timezone,
        )
        .or_else(|e| {
            tracing::warn!(
                user_id = self.user_id,
                timezone = %self.timezone,
                error = %e,
                "Stored timezone is invalid, evaluating quiet hours in UTC"
            );
            QuietHours::new(self.quiet_hours_start, self.quiet_hours_end, "UTC")
        });
        window.ok()
    }

    /// Combine with a per-type row into the effective preference.
    pub fn resolve(&self, pref: &NotificationPreference) -> ResolvedPreference {
        ResolvedPreference {
            channels: pref.channels(),
            notifications_enabled: self.notifications_enabled,
            quiet_hours: self.quiet_hours(),
        }
    }
}

/// DTO for updating one type's channel flags. `None` keeps the stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdatePreference {
    pub email_enabled: Option<bool>,
    pub push_enabled: Option<bool>,
    pub in_app_enabled: Option<bool>,
}

/// DTO for updating global settings. `None` keeps the stored value.
#[derive(Debug, Default, Deserialize)]
pub struct UpdateNotificationSettings {
    pub notifications_enabled: Option<bool>,
    pub quiet_hours_enabled: Option<bool>,
    /// `HH:MM` local time.
    pub quiet_hours_start: Option<String>,
    /// `HH:MM` local time.
    pub quiet_hours_end: Option<String>,
    /// IANA timezone name.
    pub timezone: Option<String>,
}

/// [`UpdateNotificationSettings`] with its string fields validated.
#[derive(Debug, Default)]
pub struct ValidatedSettingsUpdate {
    pub notifications_enabled: Option<bool>,
    pub quiet_hours_enabled: Option<bool>,
    pub quiet_hours_start: Option<NaiveTime>,
    pub quiet_hours_end: Option<NaiveTime>,
    pub timezone: Option<String>,
}

impl UpdateNotificationSettings {
    pub fn validate(&self) -> Result<ValidatedSettingsUpdate, CoreError> {
        use sitewire_core::preferences::{parse_local_time, parse_timezone};

        let quiet_hours_start = self
            .quiet_hours_start
            .as_deref()
            .map(parse_local_time)
            .transpose()?;
        let quiet_hours_end = self
            .quiet_hours_end
            .as_deref()
            .map(parse_local_time)
            .transpose()?;
        if let Some(tz) = self.timezone.as_deref() {
            parse_timezone(tz)?;
        }

        Ok(ValidatedSettingsUpdate {
            notifications_enabled: self.notifications_enabled,
            quiet_hours_enabled: self.quiet_hours_enabled,
            quiet_hours_start,
            quiet_hours_end,
            timezone: self.timezone.clone(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings(enabled: bool, tz: &str) -> UserNotificationSettings {
        UserNotificationSettings {
            id: 1,
            user_id: 10,
            notifications_enabled: true,
            quiet_hours_enabled: enabled,
            quiet_hours_start: NaiveTime::from_hms_opt(22, 0, 0).unwrap(),
            quiet_hours_end: NaiveTime::from_hms_opt(7, 0, 0).unwrap(),
            timezone: tz.to_string(),
            created_at: chrono::Utc::now(),
            updated_at: chrono::Utc::now(),
        }
    }

    #[test]
    fn disabled_quiet_hours_yield_none() {
        assert!(settings(false, "UTC").quiet_hours().is_none());
    }

    #[test]
    fn invalid_stored_timezone_falls_back_to_utc() {
        let window = settings(true, "Not/AZone").quiet_hours().unwrap();
        assert_eq!(window.timezone, chrono_tz::UTC);
    }

    #[test]
    fn validate_rejects_bad_time_and_timezone() {
        let bad_time = UpdateNotificationSettings {
            quiet_hours_start: Some("7pm".into()),
            ..Default::default()
        };
        assert!(bad_time.validate().is_err());

        let bad_tz = UpdateNotificationSettings {
            timezone: Some("Europe/Atlantis".into()),
            ..Default::default()
        };
        assert!(bad_tz.validate().is_err());
    }

    #[test]
    fn validate_parses_times() {
        let update = UpdateNotificationSettings {
            quiet_hours_start: Some("21:30".into()),
            timezone: Some("Europe/Berlin".into()),
            ..Default::default()
        };
        let validated = update.validate().unwrap();
        assert_eq!(
            validated.quiet_hours_start,
            NaiveTime::from_hms_opt(21, 30, 0)
        );
        assert_eq!(validated.timezone.as_deref(), Some("Europe/Berlin"));
    }
}
