//! Verified-token context handed from the Request Gate to handlers.
//!
//! `middleware::auth::access` inserts an [`AuthCtx`] into the request extensions after
//! the bearer token passed every check; handlers receive it through [`AuthCtxExtractor`].

use std::sync::Arc;

use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::auth::TokenClaims;
use crate::state::AppState;

#[derive(Debug, Clone)]
pub struct AuthCtx {
    claims: Arc<TokenClaims>,
}

impl AuthCtx {
    pub fn new(claims: TokenClaims) -> Self {
        Self {
            claims: Arc::new(claims),
        }
    }

    pub fn claims(&self) -> &TokenClaims {
        &self.claims
    }

    /// `sub` claim, if the token carried one.
    pub fn subject(&self) -> Option<&str> {
        self.claims.subject()
    }
}

/// Rejects with 401 when the access middleware did not run for the route.
pub struct AuthCtxExtractor(pub AuthCtx);

impl FromRequestParts<AppState> for AuthCtxExtractor {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<AuthCtx>()
            .cloned()
            .map(AuthCtxExtractor)
            .ok_or_else(|| {
                tracing::error!(path = %parts.uri.path(), "route is not behind the access middleware");
                AppError::missing_token()
            })
    }
}
