//! WebSocket infrastructure for real-time notification delivery.
//!
//! Connection management, heartbeat, the HTTP upgrade handler and the task
//! that forwards the notification feed to connected users.

mod forwarder;
mod handler;
mod heartbeat;
pub mod manager;

pub use forwarder::{forward_feed, notification_frame};
pub use handler::ws_handler;
pub use heartbeat::start_heartbeat;
pub use manager::WsManager;
