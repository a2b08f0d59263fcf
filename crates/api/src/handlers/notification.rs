//! Handlers for the `/notifications` inbox.
//!
//! All endpoints operate on the authenticated user's own notifications.

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::{Deserialize, Serialize};
use sitewire_core::error::CoreError;
use sitewire_core::notification_type::{NotificationPriority, NotificationType};
use sitewire_core::types::DbId;
use sitewire_db::models::notification::{NotificationFilter, NotificationListItem};
use sitewire_db::repositories::{MarkReadOutcome, NotificationRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::auth::AuthUser;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

/// Query parameters for `GET /notifications`.
#[derive(Debug, Deserialize)]
pub struct NotificationQuery {
    #[serde(default)]
    pub unread_only: bool,
    #[serde(rename = "type")]
    pub notification_type: Option<NotificationType>,
    pub priority: Option<NotificationPriority>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
pub struct NotificationPage {
    pub items: Vec<NotificationListItem>,
    pub unread_count: i64,
    pub limit: i64,
    pub offset: i64,
}

#[derive(Debug, Serialize)]
pub struct UnreadCount {
    pub count: i64,
}

#[derive(Debug, Serialize)]
pub struct MarkedRead {
    pub marked_read: u64,
}

/// GET /api/v1/notifications
pub async fn list_notifications(
    auth: AuthUser,
    State(state): State<AppState>,
    Query(params): Query<NotificationQuery>,
) -> AppResult<Json<DataResponse<NotificationPage>>> {
    let page = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };
    let filter = NotificationFilter {
        unread_only: params.unread_only,
        notification_type: params.notification_type,
        priority: params.priority,
    };

    let items = NotificationRepo::list_for_user(
        &state.pool,
        auth.user_id,
        &filter,
        page.limit(),
        page.offset(),
    )
    .await?;
    let unread_count = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;

    Ok(Json(DataResponse {
        data: NotificationPage {
            items,
            unread_count,
            limit: page.limit(),
            offset: page.offset(),
        },
    }))
}

/// GET /api/v1/notifications/unread-count
pub async fn unread_count(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<UnreadCount>>> {
    let count = NotificationRepo::unread_count(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse {
        data: UnreadCount { count },
    }))
}

/// POST /api/v1/notifications/{id}/read
///
/// Idempotent: a notification that is already read also answers 204.
/// Answers 404 when the caller is not a visible recipient.
pub async fn mark_read(
    auth: AuthUser,
    State(state): State<AppState>,
    Path(notification_id): Path<DbId>,
) -> AppResult<impl IntoResponse> {
    match NotificationRepo::mark_read(&state.pool, notification_id, auth.user_id).await? {
        MarkReadOutcome::Marked | MarkReadOutcome::AlreadyRead => Ok(StatusCode::NO_CONTENT),
        MarkReadOutcome::NotRecipient => Err(AppError::Core(CoreError::NotFound {
            entity: "Notification",
            id: notification_id,
        })),
    }
}

/// POST /api/v1/notifications/read-all
pub async fn mark_all_read(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<MarkedRead>>> {
    let marked_read = NotificationRepo::mark_all_read(&state.pool, auth.user_id).await?;
    tracing::debug!(user_id = auth.user_id, marked_read, "Marked all notifications read");
    Ok(Json(DataResponse {
        data: MarkedRead { marked_read },
    }))
}
