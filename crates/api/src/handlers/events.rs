//! Inbound domain event hook.

use axum::extract::State;
use axum::http::StatusCode;
use axum::Json;
use sitewire_core::event::DomainEvent;

use crate::middleware::rbac::RequireService;
use crate::state::AppState;

/// POST /api/v1/events
///
/// Accepts a domain event from a business service and translates it in the
/// background. The answer is always 202 once the body parses: translation
/// problems are logged, never reported to the emitting service.
pub async fn post_event(
    RequireService(caller): RequireService,
    State(state): State<AppState>,
    Json(event): Json<DomainEvent>,
) -> StatusCode {
    tracing::debug!(
        caller_id = caller.user_id,
        event_type = %event.event_type,
        "Domain event received"
    );
    state.translator.spawn(event);
    StatusCode::ACCEPTED
}
