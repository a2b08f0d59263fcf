mod common;

use chrono::NaiveTime;
use common::seed_user;
use sitewire_core::notification_type::NotificationType;
use sitewire_core::preferences::DefaultPreferences;
use sitewire_db::models::preference::{UpdateNotificationSettings, UpdatePreference};
use sitewire_db::repositories::NotificationPreferenceRepo;
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_concurrent_first_resolve_creates_one_row(pool: PgPool) {
    let user = seed_user(&pool, "foreman@example.com").await;
    let defaults = DefaultPreferences::STANDARD;

    let attempts = (0..8).map(|_| {
        let pool = pool.clone();
        async move {
            NotificationPreferenceRepo::resolve(
                &pool,
                user,
                NotificationType::TaskAssignment,
                &defaults,
            )
            .await
        }
    });
    let results = futures::future::join_all(attempts).await;
    assert!(results.iter().all(|r| r.is_ok()));

    let prefs: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notification_preferences WHERE user_id = $1",
    )
    .bind(user)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(prefs, 1);

    let settings: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM user_notification_settings WHERE user_id = $1",
    )
    .bind(user)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(settings, 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_resolve_uses_defaults(pool: PgPool) {
    let user = seed_user(&pool, "new@example.com").await;
    let resolved = NotificationPreferenceRepo::resolve(
        &pool,
        user,
        NotificationType::CommentMention,
        &DefaultPreferences::STANDARD,
    )
    .await
    .unwrap();

    assert!(resolved.notifications_enabled);
    assert!(resolved.channels.email_enabled);
    assert!(!resolved.channels.push_enabled);
    assert!(resolved.channels.in_app_enabled);
    assert!(resolved.quiet_hours.is_none());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_partial_update_keeps_other_flags(pool: PgPool) {
    let user = seed_user(&pool, "sub@example.com").await;
    let defaults = DefaultPreferences::STANDARD;

    let pref = NotificationPreferenceRepo::update(
        &pool,
        user,
        NotificationType::TaskUpdate,
        &UpdatePreference {
            push_enabled: Some(true),
            ..Default::default()
        },
        &defaults,
    )
    .await
    .unwrap();
    assert!(pref.push_enabled);
    assert!(pref.email_enabled);

    let pref = NotificationPreferenceRepo::update(
        &pool,
        user,
        NotificationType::TaskUpdate,
        &UpdatePreference {
            email_enabled: Some(false),
            ..Default::default()
        },
        &defaults,
    )
    .await
    .unwrap();
    assert!(pref.push_enabled);
    assert!(!pref.email_enabled);
    assert!(pref.in_app_enabled);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_settings_update_enables_quiet_hours(pool: PgPool) {
    let user = seed_user(&pool, "night@example.com").await;
    let update = UpdateNotificationSettings {
        quiet_hours_enabled: Some(true),
        quiet_hours_start: Some("21:00".into()),
        timezone: Some("America/Chicago".into()),
        ..Default::default()
    }
    .validate()
    .unwrap();

    let settings = NotificationPreferenceRepo::update_settings(&pool, user, &update)
        .await
        .unwrap();
    assert!(settings.quiet_hours_enabled);
    assert_eq!(settings.quiet_hours_start, NaiveTime::from_hms_opt(21, 0, 0).unwrap());
    assert_eq!(settings.quiet_hours_end, NaiveTime::from_hms_opt(7, 0, 0).unwrap());
    assert_eq!(settings.timezone, "America/Chicago");

    let window = settings.quiet_hours().unwrap();
    assert_eq!(window.timezone, chrono_tz::America::Chicago);
}
