/*
 * Responsibility
 * - アプリ共通の AppError 定義
 * - IntoResponse 実装 (HTTP status / JSON error body / WWW-Authenticate)
 * - VerificationError / TransactionError を HTTP のエラーへ統一的に変換
 */
use axum::{
    Json,
    http::{HeaderValue, StatusCode, header},
    response::{IntoResponse, Response},
};
use serde::Serialize;
use thiserror::Error;

use crate::services::auth::{ScopeRequirement, VerificationError};
use crate::services::idp::TransactionError;

const REALM: &str = "OKTA";

#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    pub error: ErrorBody,
}

#[derive(Debug, Serialize)]
pub struct ErrorBody {
    pub code: &'static str,
    pub message: String,
}

#[derive(Debug, Error)]
pub enum AppError {
    #[error("{code}: {message}")]
    BadRequest { code: &'static str, message: String },
    #[error("unauthorized")]
    Unauthorized { challenge: String },
    #[error("forbidden")]
    Forbidden { challenge: String },
    #[error("{code}: {message}")]
    Conflict { code: &'static str, message: String },
    #[error("upstream identity provider failed")]
    BadGateway,
    #[error("{feature} is not configured")]
    ServiceUnavailable { feature: &'static str },
    #[error("internal server error")]
    Internal,
}

impl AppError {
    pub fn bad_request(code: &'static str, message: impl Into<String>) -> Self {
        Self::BadRequest {
            code,
            message: message.into(),
        }
    }

    pub fn conflict(code: &'static str, message: impl Into<String>) -> Self {
        Self::Conflict {
            code,
            message: message.into(),
        }
    }

    /// No credentials were presented at all (RFC 6750 §3.1: no error code).
    pub fn missing_token() -> Self {
        Self::Unauthorized {
            challenge: format!(r#"Bearer realm="{REALM}""#),
        }
    }

    /// Map a verification failure to 401/403. Only the category reaches the client.
    pub fn from_verification(err: VerificationError, required: &ScopeRequirement) -> Self {
        if err.is_authorization_failure() {
            Self::Forbidden {
                challenge: format!(
                    r#"Bearer realm="{REALM}", error="insufficient_scope", scope="{required}""#
                ),
            }
        } else {
            Self::Unauthorized {
                challenge: format!(r#"Bearer realm="{REALM}", error="invalid_token""#),
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let mut challenge = None;

        let (status, code, message) = match self {
            AppError::BadRequest { code, message } => (StatusCode::BAD_REQUEST, code, message),
            AppError::Unauthorized { challenge: c } => {
                challenge = Some(c);
                (
                    StatusCode::UNAUTHORIZED,
                    "UNAUTHORIZED",
                    "unauthorized".into(),
                )
            }
            AppError::Forbidden { challenge: c } => {
                challenge = Some(c);
                (StatusCode::FORBIDDEN, "FORBIDDEN", "forbidden".into())
            }
            AppError::Conflict { code, message } => (StatusCode::CONFLICT, code, message),
            AppError::BadGateway => (
                StatusCode::BAD_GATEWAY,
                "BAD_GATEWAY",
                "identity provider request failed".into(),
            ),
            AppError::ServiceUnavailable { feature } => (
                StatusCode::SERVICE_UNAVAILABLE,
                "SERVICE_UNAVAILABLE",
                format!("{feature} is not configured"),
            ),
            AppError::Internal => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "INTERNAL_SERVER_ERROR",
                "internal server error".into(),
            ),
        };

        let body = ErrorResponse {
            error: ErrorBody { code, message },
        };

        let mut response = (status, Json(body)).into_response();
        if let Some(value) = challenge.and_then(|c| HeaderValue::from_str(&c).ok()) {
            response
                .headers_mut()
                .insert(header::WWW_AUTHENTICATE, value);
        }
        response
    }
}

impl From<TransactionError> for AppError {
    fn from(e: TransactionError) -> Self {
        match e {
            TransactionError::MissingTransactionId => {
                AppError::bad_request("MISSING_TX_ID", "tx_id query parameter is required")
            }
            TransactionError::NoPendingTransaction => AppError::conflict(
                "NO_PENDING_TRANSACTION",
                "no registration is in progress for this session",
            ),
            // Details are logged where the remote call failed
            TransactionError::Remote(_) => AppError::BadGateway,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::idp::IdpError;

    fn challenge_of(response: &Response) -> &str {
        response
            .headers()
            .get(header::WWW_AUTHENTICATE)
            .and_then(|v| v.to_str().ok())
            .unwrap()
    }

    #[test]
    fn insufficient_scope_is_403_with_scope_challenge() {
        let required: ScopeRequirement = ["read", "write"].into_iter().collect();
        let response =
            AppError::from_verification(VerificationError::InsufficientScope, &required)
                .into_response();

        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            challenge_of(&response),
            r#"Bearer realm="OKTA", error="insufficient_scope", scope="read write""#
        );
    }

    #[test]
    fn other_verification_failures_share_one_generic_401() {
        for err in [
            VerificationError::Malformed,
            VerificationError::UnknownKey,
            VerificationError::BadSignature,
            VerificationError::Expired,
            VerificationError::IssuerMismatch,
        ] {
            let response = AppError::from_verification(err, &ScopeRequirement::none()).into_response();
            assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
            assert_eq!(
                challenge_of(&response),
                r#"Bearer realm="OKTA", error="invalid_token""#
            );
        }
    }

    #[test]
    fn transaction_errors_map_to_client_and_gateway_statuses() {
        let status = |e: TransactionError| AppError::from(e).into_response().status();

        assert_eq!(status(TransactionError::MissingTransactionId), StatusCode::BAD_REQUEST);
        assert_eq!(status(TransactionError::NoPendingTransaction), StatusCode::CONFLICT);
        assert_eq!(
            status(TransactionError::Remote(IdpError::HttpStatus(500))),
            StatusCode::BAD_GATEWAY
        );
    }
}
