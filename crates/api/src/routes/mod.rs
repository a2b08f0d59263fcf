pub mod admin;
pub mod events;
pub mod health;
pub mod notification;
pub mod push;

use axum::routing::get;
use axum::Router;

use crate::state::AppState;
use crate::ws;

/// Build the `/api/v1` route tree.
///
/// ```text
/// /ws                                      WebSocket (?token=<jwt>)
///
/// /events                                  inbound domain events (service)
///
/// /notifications                           list (filters, unread count)
/// /notifications/unread-count              unread count
/// /notifications/read-all                  mark all read (POST)
/// /notifications/{id}/read                 mark one read (POST)
/// /notifications/preferences               list preferences + catalogue
/// /notifications/preferences/{type}        update one type (PUT)
/// /notifications/settings                  get, update global settings
///
/// /push/subscriptions                      list, register, unregister
///
/// /admin/queues/{channel}                  list entries (admin)
/// /admin/queues/{channel}/stats            status counts (admin)
/// /admin/queues/{channel}/{id}/retry       manual retry (admin, POST)
/// ```
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/ws", get(ws::ws_handler))
        .nest("/events", events::router())
        .nest("/notifications", notification::router())
        .nest("/push", push::router())
        .nest("/admin", admin::router())
}
