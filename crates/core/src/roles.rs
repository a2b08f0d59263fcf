//! Well-known role name constants.
//!
//! These must match the `role` claim issued by the identity service.

pub const ROLE_ADMIN: &str = "admin";
pub const ROLE_MEMBER: &str = "member";

/// Internal services (task, approval and invitation backends) that post
/// domain events to the inbound hook.
pub const ROLE_SERVICE: &str = "service";
