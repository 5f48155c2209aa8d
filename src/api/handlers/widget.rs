/*
 * Responsibility
 * - GET /js/config.js : sign-in widget 用の設定 (application/javascript)
 * - GET /welcome : ランディングページ (この app の URL と admin console の URL)
 */
use axum::{
    extract::State,
    http::{HeaderMap, header},
    response::{Html, IntoResponse},
};

use crate::api::extractors::CurrentSession;
use crate::api::views::{self, WelcomePage};
use crate::state::AppState;

pub async fn config_js(
    State(state): State<AppState>,
    CurrentSession(_): CurrentSession,
) -> impl IntoResponse {
    (
        [(header::CONTENT_TYPE, "application/javascript")],
        views::render_config_js(&state.config),
    )
}

pub async fn welcome(
    State(state): State<AppState>,
    CurrentSession(_): CurrentSession,
    headers: HeaderMap,
) -> Html<String> {
    let app_url = this_app_url(&headers);
    let admin_url = admin_console_url(&state.config.issuer);

    Html(views::render_welcome_page(&WelcomePage {
        app_url: &app_url,
        admin_url: &admin_url,
        issuer: &state.config.issuer,
        audience: &state.config.audience,
    }))
}

// Behind a proxy the forwarded headers win.
fn this_app_url(headers: &HeaderMap) -> String {
    let first = |name: &str| {
        headers
            .get(name)
            .and_then(|v| v.to_str().ok())
            .and_then(|v| v.split(',').next())
            .map(str::trim)
            .filter(|v| !v.is_empty())
    };

    let scheme = first("x-forwarded-proto").unwrap_or("http");
    let host = first("x-forwarded-host")
        .or_else(|| first(header::HOST.as_str()))
        .unwrap_or("localhost");

    format!("{scheme}://{host}")
}

/// `https://example.okta.com` → `https://example-admin.okta.com`
fn admin_console_url(issuer: &str) -> String {
    issuer.replacen('.', "-admin.", 1)
}
