use axum::routing::get;
use axum::Router;

use crate::handlers::push_subscription;
use crate::state::AppState;

/// Routes mounted at `/push`.
///
/// ```text
/// GET    /subscriptions   -> list_subscriptions
/// POST   /subscriptions   -> register_subscription
/// DELETE /subscriptions   -> unregister_subscription (body: {endpoint})
/// ```
pub fn router() -> Router<AppState> {
    Router::new().route(
        "/subscriptions",
        get(push_subscription::list_subscriptions)
            .post(push_subscription::register_subscription)
            .delete(push_subscription::unregister_subscription),
    )
}
