mod common;

use chrono::{DateTime, Utc};
use common::*;
use serde_json::json;
use sitewire_core::event::DomainEvent;
use sitewire_core::notification_type::NotificationType;
use sitewire_db::models::preference::{UpdateNotificationSettings, UpdatePreference};
use sitewire_db::models::status::QueueStatus;
use sitewire_db::repositories::{
    EmailQueueRepo, NotificationPreferenceRepo, NotificationRepo, PushQueueRepo,
};
use sqlx::PgPool;

fn assigned(actor: i64, assignees: &[i64]) -> DomainEvent {
    DomainEvent::new("task.assigned")
        .with_actor(actor)
        .with_target("task", 42)
        .with_payload(json!({
            "assignee_ids": assignees,
            "task_title": "Pour footing 3B",
            "actor_name": "Dana",
        }))
}

fn at(s: &str) -> DateTime<Utc> {
    s.parse().unwrap()
}

async fn enable_push_with_quiet_hours(pool: &PgPool, user: i64) {
    NotificationPreferenceRepo::update(
        pool,
        user,
        NotificationType::TaskAssignment,
        &UpdatePreference {
            push_enabled: Some(true),
            ..Default::default()
        },
        &Default::default(),
    )
    .await
    .unwrap();
    let settings = UpdateNotificationSettings {
        quiet_hours_enabled: Some(true),
        quiet_hours_start: Some("22:00".into()),
        quiet_hours_end: Some("07:00".into()),
        timezone: Some("UTC".into()),
        ..Default::default()
    }
    .validate()
    .unwrap();
    NotificationPreferenceRepo::update_settings(pool, user, &settings)
        .await
        .unwrap();
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_assignment_with_default_preferences(pool: PgPool) {
    let a = seed_user(&pool, "a@example.com").await;
    let b = seed_user(&pool, "b@example.com").await;
    register_push(&pool, b, "https://push.example.com/b").await;
    let (translator, _feed) = translator(&pool);

    let report = translator.handle(&assigned(a, &[b])).await;
    let id = report.notification_id.expect("notification created");
    assert_eq!(report.recipients, 1);
    assert_eq!(report.email_enqueued, 1);
    assert_eq!(report.push_enqueued, 0);

    let notification = NotificationRepo::find_by_id(&pool, id).await.unwrap().unwrap();
    assert_eq!(notification.notification_type, "task_assignment");
    assert_eq!(notification.action_url.as_deref(), Some("/tasks/42"));

    let emails = EmailQueueRepo::list_for_notification(&pool, id).await.unwrap();
    assert_eq!(emails.len(), 1);
    assert_eq!(emails[0].recipient_id, b);
    assert_eq!(emails[0].to_address, "b@example.com");
    assert_eq!(emails[0].status_id, QueueStatus::Pending.id());
    assert!(emails[0].subject.starts_with("[Task]"));
    assert!(PushQueueRepo::list_for_notification(&pool, id)
        .await
        .unwrap()
        .is_empty());

    // Defaults were written for the recipient only.
    let prefs = NotificationPreferenceRepo::list_for_user(&pool, b).await.unwrap();
    assert_eq!(prefs.len(), 1);
    assert!(NotificationPreferenceRepo::list_for_user(&pool, a)
        .await
        .unwrap()
        .is_empty());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_actor_is_never_notified(pool: PgPool) {
    let a = seed_user(&pool, "a@example.com").await;
    let (translator, _feed) = translator(&pool);

    let report = translator.handle(&assigned(a, &[a])).await;
    assert_eq!(report.notification_id, None);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM notifications").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_feed_receives_in_app_recipients(pool: PgPool) {
    let a = seed_user(&pool, "a@example.com").await;
    let b = seed_user(&pool, "b@example.com").await;
    let c = seed_user(&pool, "c@example.com").await;
    let (translator, feed) = translator(&pool);
    let mut rx = feed.subscribe();

    translator.handle(&assigned(a, &[c, b, c])).await;

    let first = rx.recv().await.unwrap();
    let second = rx.recv().await.unwrap();
    assert_eq!((first.user_id, second.user_id), (b, c));
    assert_eq!(first.notification.title, "New task assigned");
    assert!(rx.try_recv().is_err());
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_malformed_entity_reference_does_not_affect_business_write(pool: PgPool) {
    sqlx::query("CREATE TABLE comments (id BIGSERIAL PRIMARY KEY, body TEXT NOT NULL)")
        .execute(&pool)
        .await
        .unwrap();
    let author = seed_user(&pool, "author@example.com").await;
    let mentioned = seed_user(&pool, "mentioned@example.com").await;
    let (translator, _feed) = translator(&pool);

    let write = async {
        sqlx::query_scalar::<_, i64>("INSERT INTO comments (body) VALUES ($1) RETURNING id")
            .bind("@mentioned please check the rebar spacing")
            .fetch_one(&pool)
            .await
    };
    let result = translator
        .notify_after_commit(write, |_comment_id| {
            Some(
                DomainEvent::new("comment.posted")
                    .with_actor(author)
                    .with_target("comment", -1)
                    .with_payload(json!({"mentioned_user_ids": [mentioned]})),
            )
        })
        .await;

    let comment_id = result.expect("business write succeeds");
    assert!(comment_id > 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM comments").await, 1);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM notifications").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_failed_business_write_skips_translation(pool: PgPool) {
    let a = seed_user(&pool, "a@example.com").await;
    let b = seed_user(&pool, "b@example.com").await;
    let (translator, _feed) = translator(&pool);

    let result: Result<(), &str> = translator
        .notify_after_commit(async { Err("constraint violated") }, |_| Some(assigned(a, &[b])))
        .await;
    assert_eq!(result, Err("constraint violated"));
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM notifications").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_quiet_hours_defer_push_only(pool: PgPool) {
    let a = seed_user(&pool, "a@example.com").await;
    let b = seed_user(&pool, "b@example.com").await;
    register_push(&pool, b, "https://push.example.com/b").await;
    enable_push_with_quiet_hours(&pool, b).await;
    let (translator, _feed) = translator(&pool);

    // 23:30 UTC: inside the window.
    let night = translator
        .translate(&assigned(a, &[b]), at("2026-03-10T23:30:00Z"))
        .await
        .unwrap();
    assert_eq!(night.push_enqueued, 1);
    assert_eq!(night.push_deferred, 1);
    assert_eq!(night.email_enqueued, 1);
    let night_id = night.notification_id.unwrap();
    let push = PushQueueRepo::list_for_notification(&pool, night_id).await.unwrap();
    assert_eq!(push[0].scheduled_at, at("2026-03-11T07:00:00Z"));

    // 10:00 UTC: outside the window, dispatched immediately.
    let day = translator
        .translate(&assigned(a, &[b]), at("2026-03-11T10:00:00Z"))
        .await
        .unwrap();
    assert_eq!(day.push_enqueued, 1);
    assert_eq!(day.push_deferred, 0);
    let day_id = day.notification_id.unwrap();
    let push = PushQueueRepo::list_for_notification(&pool, day_id).await.unwrap();
    assert!(push[0].scheduled_at <= Utc::now());

    // Both are visible in-app.
    let inbox = NotificationRepo::list_for_user(&pool, b, &Default::default(), 50, 0)
        .await
        .unwrap();
    let ids: Vec<i64> = inbox.iter().map(|n| n.id).collect();
    assert!(ids.contains(&night_id));
    assert!(ids.contains(&day_id));
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_global_toggle_suppresses_everything(pool: PgPool) {
    let a = seed_user(&pool, "a@example.com").await;
    let b = seed_user(&pool, "b@example.com").await;
    let settings = UpdateNotificationSettings {
        notifications_enabled: Some(false),
        ..Default::default()
    }
    .validate()
    .unwrap();
    NotificationPreferenceRepo::update_settings(&pool, b, &settings)
        .await
        .unwrap();
    let (translator, _feed) = translator(&pool);

    let report = translator.handle(&assigned(a, &[b])).await;
    assert_eq!(report.notification_id, None);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM notifications").await, 0);
    assert_eq!(count(&pool, "SELECT COUNT(*) FROM email_queue").await, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_in_app_disabled_still_emails(pool: PgPool) {
    let a = seed_user(&pool, "a@example.com").await;
    let b = seed_user(&pool, "b@example.com").await;
    NotificationPreferenceRepo::update(
        &pool,
        b,
        NotificationType::TaskAssignment,
        &UpdatePreference {
            in_app_enabled: Some(false),
            ..Default::default()
        },
        &Default::default(),
    )
    .await
    .unwrap();
    let (translator, feed) = translator(&pool);
    let mut rx = feed.subscribe();

    let report = translator.handle(&assigned(a, &[b])).await;
    assert!(report.notification_id.is_some());
    assert_eq!(report.email_enqueued, 1);
    assert!(rx.try_recv().is_err());
    assert_eq!(NotificationRepo::unread_count(&pool, b).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_announcement_reaches_active_members(pool: PgPool) {
    let admin = seed_user(&pool, "admin@example.com").await;
    let crew = seed_user(&pool, "crew@example.com").await;
    let gone = seed_user(&pool, "gone@example.com").await;
    let outsider = seed_user(&pool, "outsider@example.com").await;
    sqlx::query("UPDATE users SET is_active = false WHERE id = $1")
        .bind(gone)
        .execute(&pool)
        .await
        .unwrap();
    for user in [admin, crew, gone] {
        sqlx::query("INSERT INTO organization_members (organization_id, user_id) VALUES (9, $1)")
            .bind(user)
            .execute(&pool)
            .await
            .unwrap();
    }
    let (translator, _feed) = translator(&pool);

    let event = DomainEvent::new("organization.announcement")
        .with_actor(admin)
        .with_target("organization", 9)
        .with_payload(json!({
            "organization_id": 9,
            "title": "Site closed Friday",
            "message": "High winds expected, crane work suspended.",
        }));
    let report = translator.handle(&event).await;
    assert_eq!(report.recipients, 1);

    assert_eq!(NotificationRepo::unread_count(&pool, crew).await.unwrap(), 1);
    for user in [admin, gone, outsider] {
        assert_eq!(NotificationRepo::unread_count(&pool, user).await.unwrap(), 0);
    }
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_unknown_and_malformed_events_are_dropped(pool: PgPool) {
    let a = seed_user(&pool, "a@example.com").await;
    let (translator, _feed) = translator(&pool);

    let unknown = DomainEvent::new("form.submitted").with_actor(a);
    assert_eq!(translator.handle(&unknown).await, Default::default());

    let malformed = DomainEvent::new("approval.requested").with_payload(json!({"subject": 5}));
    assert_eq!(translator.handle(&malformed).await, Default::default());

    assert_eq!(count(&pool, "SELECT COUNT(*) FROM notifications").await, 0);
}
