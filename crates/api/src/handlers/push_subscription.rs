//! Handlers for `/push/subscriptions`.

use axum::extract::State;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use axum::Json;
use serde::Deserialize;
use sitewire_db::models::push_subscription::{PushSubscription, RegisterPushSubscription};
use sitewire_db::repositories::{PushQueueRepo, PushSubscriptionRepo};

use crate::error::AppResult;
use crate::middleware::auth::AuthUser;
use crate::response::DataResponse;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct UnregisterPushSubscription {
    pub endpoint: String,
}

/// GET /api/v1/push/subscriptions
pub async fn list_subscriptions(
    auth: AuthUser,
    State(state): State<AppState>,
) -> AppResult<Json<DataResponse<Vec<PushSubscription>>>> {
    let subs = PushSubscriptionRepo::list_for_user(&state.pool, auth.user_id).await?;
    Ok(Json(DataResponse { data: subs }))
}

/// POST /api/v1/push/subscriptions
///
/// Registering a known endpoint reactivates it and moves it to the caller.
pub async fn register_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<RegisterPushSubscription>,
) -> AppResult<impl IntoResponse> {
    input.validate()?;
    let sub = PushSubscriptionRepo::upsert(&state.pool, auth.user_id, &input).await?;
    tracing::info!(
        user_id = auth.user_id,
        subscription_id = sub.id,
        "Push subscription registered"
    );
    Ok((StatusCode::CREATED, Json(DataResponse { data: sub })))
}

/// DELETE /api/v1/push/subscriptions
///
/// Deactivates the caller's subscription for `endpoint` and cancels its
/// pending deliveries. Already-sent entries are kept. Unknown or already
/// inactive endpoints also answer 204.
pub async fn unregister_subscription(
    auth: AuthUser,
    State(state): State<AppState>,
    Json(input): Json<UnregisterPushSubscription>,
) -> AppResult<StatusCode> {
    let Some(subscription_id) =
        PushSubscriptionRepo::deactivate_for_user(&state.pool, auth.user_id, &input.endpoint)
            .await?
    else {
        tracing::debug!(user_id = auth.user_id, "No active push subscription to remove");
        return Ok(StatusCode::NO_CONTENT);
    };

    let cancelled =
        PushQueueRepo::cancel_pending_for_subscription(&state.pool, subscription_id).await?;
    tracing::info!(
        user_id = auth.user_id,
        subscription_id,
        cancelled,
        "Push subscription deactivated"
    );
    Ok(StatusCode::NO_CONTENT)
}
