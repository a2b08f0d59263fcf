use axum::routing::{get, post};
use axum::Router;

use crate::handlers::admin_queue;
use crate::state::AppState;

/// Routes mounted at `/admin`. Every handler requires the admin role.
///
/// ```text
/// GET    /queues/{channel}              -> list_entries (?status=&limit=&offset=)
/// GET    /queues/{channel}/stats        -> queue_stats
/// POST   /queues/{channel}/{id}/retry   -> retry_entry
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/queues/{channel}", get(admin_queue::list_entries))
        .route("/queues/{channel}/stats", get(admin_queue::queue_stats))
        .route("/queues/{channel}/{id}/retry", post(admin_queue::retry_entry))
}
