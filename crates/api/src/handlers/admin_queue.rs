//! Admin handlers for inspecting the delivery queues and retrying entries.
//!
//! `{channel}` is `email` or `push`; `in_app` has no queue.

use axum::extract::{Path, Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use sitewire_core::channels::Channel;
use sitewire_core::delivery::state_machine;
use sitewire_core::error::CoreError;
use sitewire_core::types::{DbId, StatusId};
use sitewire_db::models::queue::{EmailQueueEntry, PushQueueEntry, QueueStatusCount};
use sitewire_db::models::status::QueueStatus;
use sitewire_db::repositories::{EmailQueueRepo, PushQueueRepo};

use crate::error::{AppError, AppResult};
use crate::middleware::rbac::RequireAdmin;
use crate::query::PaginationParams;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct QueueListQuery {
    /// Status name, e.g. `failed`.
    pub status: Option<String>,
    pub limit: Option<i64>,
    pub offset: Option<i64>,
}

#[derive(Debug, Serialize)]
#[serde(untagged)]
pub enum QueueEntries {
    Email(Vec<EmailQueueEntry>),
    Push(Vec<PushQueueEntry>),
}

#[derive(Debug, Serialize)]
pub struct StatusCount {
    pub status: &'static str,
    pub count: i64,
}

impl From<QueueStatusCount> for StatusCount {
    fn from(row: QueueStatusCount) -> Self {
        Self {
            status: row.status_name(),
            count: row.count,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct Retried {
    pub id: DbId,
    pub status: QueueStatus,
}

fn queued_channel(name: &str) -> Result<Channel, AppError> {
    let channel: Channel = name.parse()?;
    if !channel.is_queued() {
        return Err(AppError::BadRequest(format!(
            "Channel '{channel}' has no delivery queue"
        )));
    }
    Ok(channel)
}

/// GET /api/v1/admin/queues/{channel}
pub async fn list_entries(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(channel): Path<String>,
    Query(params): Query<QueueListQuery>,
) -> AppResult<Json<DataResponse<QueueEntries>>> {
    let channel = queued_channel(&channel)?;
    let status: Option<StatusId> = params
        .status
        .as_deref()
        .map(|s| s.parse::<QueueStatus>().map(QueueStatus::id))
        .transpose()?;
    let page = PaginationParams {
        limit: params.limit,
        offset: params.offset,
    };

    let data = match channel {
        Channel::Push => QueueEntries::Push(
            PushQueueRepo::list_by_status(&state.pool, status, page.limit(), page.offset())
                .await?,
        ),
        _ => QueueEntries::Email(
            EmailQueueRepo::list_by_status(&state.pool, status, page.limit(), page.offset())
                .await?,
        ),
    };
    Ok(Json(DataResponse { data }))
}

/// GET /api/v1/admin/queues/{channel}/stats
pub async fn queue_stats(
    RequireAdmin(_admin): RequireAdmin,
    State(state): State<AppState>,
    Path(channel): Path<String>,
) -> AppResult<Json<DataResponse<Vec<StatusCount>>>> {
    let rows = match queued_channel(&channel)? {
        Channel::Push => PushQueueRepo::status_counts(&state.pool).await?,
        _ => EmailQueueRepo::status_counts(&state.pool).await?,
    };
    Ok(Json(DataResponse {
        data: rows.into_iter().map(StatusCount::from).collect(),
    }))
}

/// POST /api/v1/admin/queues/{channel}/{id}/retry
///
/// Reopens a `failed` or `cancelled` entry with a fresh retry budget.
/// Any other status answers 409.
pub async fn retry_entry(
    RequireAdmin(admin): RequireAdmin,
    State(state): State<AppState>,
    Path((channel, id)): Path<(String, DbId)>,
) -> AppResult<Json<DataResponse<Retried>>> {
    let channel = queued_channel(&channel)?;
    let status_id = match channel {
        Channel::Push => PushQueueRepo::find_by_id(&state.pool, id)
            .await?
            .map(|e| e.status_id),
        _ => EmailQueueRepo::find_by_id(&state.pool, id)
            .await?
            .map(|e| e.status_id),
    }
    .ok_or(CoreError::NotFound {
        entity: "QueueEntry",
        id,
    })?;

    if !state_machine::can_manually_retry(status_id) {
        return Err(CoreError::InvalidTransition(format!(
            "Entry {id} is {} and cannot be retried",
            state_machine::status_name(status_id)
        ))
        .into());
    }

    let reopened = match channel {
        Channel::Push => PushQueueRepo::manual_retry(&state.pool, id).await?,
        _ => EmailQueueRepo::manual_retry(&state.pool, id).await?,
    };
    if !reopened {
        return Err(CoreError::InvalidTransition(format!(
            "Entry {id} changed status concurrently"
        ))
        .into());
    }

    tracing::info!(
        admin_id = admin.user_id,
        channel = %channel,
        entry_id = id,
        "Queue entry manually retried"
    );
    Ok(Json(DataResponse {
        data: Retried {
            id,
            status: QueueStatus::Pending,
        },
    }))
}
