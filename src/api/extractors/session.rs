use axum::extract::FromRequestParts;
use axum::http::request::Parts;

use crate::error::AppError;
use crate::services::session::SessionId;
use crate::state::AppState;

/// The browser session resolved by `middleware::session`.
///
/// A route without the session middleware is a wiring bug, reported as 500.
pub struct CurrentSession(pub SessionId);

impl FromRequestParts<AppState> for CurrentSession {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        _state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<SessionId>()
            .copied()
            .map(CurrentSession)
            .ok_or_else(|| {
                tracing::error!(path = %parts.uri.path(), "session middleware is not applied");
                AppError::Internal
            })
    }
}
