/*
 * Responsibility
 * - GET /claims : 検証済み access token の payload をそのまま返す
 * - GET /protected : scope 必須の保護リソース (base64 の画像)
 */
use axum::{
    Json,
    extract::State,
    http::header,
    response::IntoResponse,
};

use crate::api::extractors::AuthCtxExtractor;
use crate::services::auth::TokenClaims;
use crate::state::AppState;

pub const PROTECTED_CONTENT_TYPE: &str = "application/x-octet-stream";

pub async fn claims(AuthCtxExtractor(ctx): AuthCtxExtractor) -> Json<TokenClaims> {
    Json(ctx.claims().clone())
}

pub async fn protected(
    State(state): State<AppState>,
    AuthCtxExtractor(ctx): AuthCtxExtractor,
) -> impl IntoResponse {
    tracing::info!(sub = ctx.subject().unwrap_or("-"), "accessing protected resource");

    (
        [(header::CONTENT_TYPE, PROTECTED_CONTENT_TYPE)],
        state.protected_resource.to_string(),
    )
}
