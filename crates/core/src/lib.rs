//! Sitewire core domain types.
//!
//! This crate has zero internal dependencies so it can be shared by the
//! repository layer, the notification engine, the API server and the queue
//! worker.

pub mod channels;
pub mod delivery;
pub mod error;
pub mod event;
pub mod notification_type;
pub mod preferences;
pub mod roles;
pub mod types;
