//! Authentication and authorization extractors.
//!
//! - [`auth::AuthUser`] -- the caller from a JWT Bearer token.
//! - [`rbac::RequireAdmin`] -- requires the `admin` role.
//! - [`rbac::RequireService`] -- requires the `service` or `admin` role.

pub mod auth;
pub mod rbac;
