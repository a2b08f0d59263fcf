mod common;

use assert_matches::assert_matches;
use chrono::{Duration, Utc};
use common::*;
use sitewire_core::notification_type::{NotificationPriority, NotificationType};
use sitewire_db::models::notification::{NewNotification, NotificationFilter, Recipient};
use sitewire_db::repositories::{MarkReadOutcome, NotificationRepo};
use sqlx::PgPool;

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_dedupes_recipients(pool: PgPool) {
    let alice = seed_user(&pool, "alice@example.com").await;
    let bob = seed_user(&pool, "bob@example.com").await;

    let input = new_notification(vec![
        Recipient::in_app(bob),
        Recipient::in_app(alice),
        Recipient::queued_only(bob),
    ]);
    let id = NotificationRepo::create(&pool, &input).await.unwrap();

    let rows: Vec<(i64, bool)> = sqlx::query_as(
        "SELECT user_id, in_app FROM notification_recipients \
         WHERE notification_id = $1 ORDER BY user_id",
    )
    .bind(id)
    .fetch_all(&pool)
    .await
    .unwrap();
    assert_eq!(rows, vec![(alice, true), (bob, true)]);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_create_rejects_empty_recipients(pool: PgPool) {
    let result = NotificationRepo::create(&pool, &new_notification(vec![])).await;
    assert!(result.is_err());

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM notifications")
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mark_all_read_is_idempotent(pool: PgPool) {
    let user = seed_user(&pool, "crew@example.com").await;
    for _ in 0..3 {
        create_notification(&pool, &[user]).await;
    }
    assert_eq!(NotificationRepo::unread_count(&pool, user).await.unwrap(), 3);

    assert_eq!(NotificationRepo::mark_all_read(&pool, user).await.unwrap(), 3);

    let unread = NotificationFilter {
        unread_only: true,
        ..Default::default()
    };
    let items = NotificationRepo::list_for_user(&pool, user, &unread, 50, 0)
        .await
        .unwrap();
    assert!(items.is_empty());
    assert_eq!(NotificationRepo::mark_all_read(&pool, user).await.unwrap(), 0);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_mark_read_outcomes(pool: PgPool) {
    let owner = seed_user(&pool, "owner@example.com").await;
    let stranger = seed_user(&pool, "stranger@example.com").await;
    let id = create_notification(&pool, &[owner]).await;

    assert_matches!(
        NotificationRepo::mark_read(&pool, id, owner).await.unwrap(),
        MarkReadOutcome::Marked
    );
    assert_matches!(
        NotificationRepo::mark_read(&pool, id, owner).await.unwrap(),
        MarkReadOutcome::AlreadyRead
    );
    assert_matches!(
        NotificationRepo::mark_read(&pool, id, stranger).await.unwrap(),
        MarkReadOutcome::NotRecipient
    );
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_excludes_expired_and_hidden(pool: PgPool) {
    let user = seed_user(&pool, "pm@example.com").await;
    let visible = create_notification(&pool, &[user]).await;
    create_expiring_notification(&pool, &[user], Utc::now() - Duration::hours(1)).await;
    NotificationRepo::create(&pool, &new_notification(vec![Recipient::queued_only(user)]))
        .await
        .unwrap();

    let items = NotificationRepo::list_for_user(&pool, user, &Default::default(), 50, 0)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].id, visible);
    assert!(!items[0].is_read());
    assert_eq!(NotificationRepo::unread_count(&pool, user).await.unwrap(), 1);
}

#[sqlx::test(migrations = "../../db/migrations")]
async fn test_list_filters_by_type_and_priority(pool: PgPool) {
    let user = seed_user(&pool, "super@example.com").await;
    create_notification(&pool, &[user]).await;
    let urgent = NewNotification {
        notification_type: NotificationType::ApprovalRequest,
        priority: NotificationPriority::Urgent,
        ..new_notification(vec![Recipient::in_app(user)])
    };
    let urgent_id = NotificationRepo::create(&pool, &urgent).await.unwrap();

    let by_type = NotificationFilter {
        notification_type: Some(NotificationType::ApprovalRequest),
        ..Default::default()
    };
    let items = NotificationRepo::list_for_user(&pool, user, &by_type, 50, 0)
        .await
        .unwrap();
    assert_eq!(items.iter().map(|i| i.id).collect::<Vec<_>>(), vec![urgent_id]);

    let by_priority = NotificationFilter {
        priority: Some(NotificationPriority::Medium),
        ..Default::default()
    };
    let items = NotificationRepo::list_for_user(&pool, user, &by_priority, 50, 0)
        .await
        .unwrap();
    assert_eq!(items.len(), 1);
    assert_eq!(items[0].priority, "medium");
}
