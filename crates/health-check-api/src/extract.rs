//! The request-pipeline's steps 1-2 (spec.md §4.6) packaged as an axum
//! extractor: resolves the security scheme and projects it into a
//! [`UserInfo`] before any handler body runs.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::request::Parts;
use health_check_core::UserInfo;

use crate::error::ApiError;
use crate::state::AppState;

/// `Some(userinfo)` once `get_fastapi_security`+`on_auth` resolved a tenant
/// identity, `None` for an anonymous request. Routes that require auth turn
/// `None` into `DomainError::Forbidden` themselves via [`Auth::require`].
pub struct Auth(pub Option<UserInfo>);

impl Auth {
    /// Unwraps an authenticated identity, or raises the 403 spec.md §4.6
    /// step 2 calls for when a route that requires auth sees no identity.
    pub fn require(self) -> Result<UserInfo, ApiError> {
        self.0.ok_or_else(|| {
            health_check_core::DomainError::Forbidden {
                title: "Authentication required".to_string(),
                detail: "this route requires an authenticated caller".to_string(),
            }
            .into()
        })
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Auth {
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let userinfo = state.hooks.authenticate(&parts.headers).await?;
        Ok(Auth(userinfo))
    }
}
