/*
 * Responsibility
 * - URL 構造を定義
 * - /claims, /protected は Request Gate (bearer 検証) を route_layer で適用
 * - /social/callback, /js/config.js, /welcome は sid cookie のセッションを適用
 * - /health は何も通さない
 */
use axum::{Router, routing::get};

use crate::api::handlers::{
    claims::{claims, protected},
    health::health,
    social::{begin_registration, submit_registration},
    widget::{config_js, welcome},
};
use crate::middleware::{auth::access, session};
use crate::services::auth::ScopeRequirement;
use crate::state::AppState;

pub fn routes(state: &AppState) -> Router<AppState> {
    let config = &state.config;

    let claims_routes = access::apply(
        Router::new().route("/claims", get(claims)),
        state.verifier.clone(),
        ScopeRequirement::none(),
    );

    let protected_routes = access::apply(
        Router::new().route("/protected", get(protected)),
        state.verifier.clone(),
        config.protected_scopes.iter().cloned().collect(),
    );

    let browser_routes = session::apply(
        Router::new()
            .route(
                "/social/callback",
                get(begin_registration).post(submit_registration),
            )
            .route("/js/config.js", get(config_js))
            .route("/welcome", get(welcome)),
        state.sessions.clone(),
        config.app_env.is_production(),
    );

    Router::new()
        .route("/health", get(health))
        .merge(claims_routes)
        .merge(protected_routes)
        .merge(browser_routes)
}
