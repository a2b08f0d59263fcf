//! Role-based access control extractors.
//!
//! Each extractor wraps [`AuthUser`] and rejects callers whose role does not
//! meet the requirement with 403.

use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use sitewire_core::error::CoreError;
use sitewire_core::roles::{ROLE_ADMIN, ROLE_SERVICE};

use super::auth::AuthUser;
use crate::error::AppError;
use crate::state::AppState;

/// Requires the `admin` role.
pub struct RequireAdmin(pub AuthUser);

impl FromRequestParts<AppState> for RequireAdmin {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Admin role required".into(),
            )));
        }
        Ok(RequireAdmin(user))
    }
}

/// Requires the `service` or `admin` role. Guards the inbound event hook.
pub struct RequireService(pub AuthUser);

impl FromRequestParts<AppState> for RequireService {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let user = AuthUser::from_request_parts(parts, state).await?;
        if user.role != ROLE_SERVICE && user.role != ROLE_ADMIN {
            return Err(AppError::Core(CoreError::Forbidden(
                "Service or Admin role required".into(),
            )));
        }
        Ok(RequireService(user))
    }
}
