//! Authentication primitives.
//!
//! Users log in against the identity service; this server only validates
//! the access tokens it issues.

pub mod jwt;
