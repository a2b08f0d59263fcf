//! Route definitions for the `/notifications` resource.
//!
//! All endpoints require authentication.

use axum::routing::{get, post, put};
use axum::Router;

use crate::handlers::{notification, preference};
use crate::state::AppState;

/// Routes mounted at `/notifications`.
///
/// ```text
/// GET    /                       -> list_notifications
/// GET    /unread-count           -> unread_count
/// POST   /read-all               -> mark_all_read
/// POST   /{id}/read              -> mark_read
///
/// GET    /preferences            -> get_preferences
/// PUT    /preferences/{type}     -> update_preference
///
/// GET    /settings               -> get_settings
/// PUT    /settings               -> update_settings
/// ```
pub fn router() -> Router<AppState> {
    Router::new()
        .route("/", get(notification::list_notifications))
        .route("/unread-count", get(notification::unread_count))
        .route("/read-all", post(notification::mark_all_read))
        .route("/{id}/read", post(notification::mark_read))
        .route("/preferences", get(preference::get_preferences))
        .route("/preferences/{type}", put(preference::update_preference))
        .route(
            "/settings",
            get(preference::get_settings).put(preference::update_settings),
        )
}
