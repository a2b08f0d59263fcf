pub mod admin_queue;
pub mod events;
pub mod notification;
pub mod preference;
pub mod push_subscription;
