use std::sync::Arc;

use sitewire_events::{NotificationFeed, Translator};

use crate::config::ServerConfig;
use crate::ws::WsManager;

/// Shared application state available to all handlers via `State<AppState>`.
///
/// Cheaply cloneable: everything inside is behind `Arc` or is a pool handle.
#[derive(Clone)]
pub struct AppState {
    pub pool: sitewire_db::DbPool,
    pub config: Arc<ServerConfig>,
    /// WebSocket connections of browser clients.
    pub ws_manager: Arc<WsManager>,
    /// Turns posted domain events into notifications.
    pub translator: Translator,
    /// Live feed of created notifications, forwarded to WebSocket clients.
    pub feed: Arc<NotificationFeed>,
}
