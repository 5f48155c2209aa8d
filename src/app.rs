/*
 * Responsibility
 * - Config読み込み → 依存生成 → Router 組み立て
 * - 起動は 2 phase: (1) signing key の取得 (失敗なら起動しない) (2) listen 開始
 * - Middleware の適用 (http / security headers / CORS)
 * - axum::serve() で起動, Ctrl-C で graceful shutdown
 */
use std::{panic, process, sync::Arc, time::Duration};

use anyhow::{Context, Result};
use axum::Router;
use base64::Engine;
use base64::engine::general_purpose::STANDARD;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use crate::config::Config;
use crate::services::auth::factory::build_token_verifier;
use crate::services::idp::{HttpIdpClient, IdpTransactionCoordinator};
use crate::services::session::SessionStore;
use crate::state::AppState;
use crate::{api, middleware};

fn init_tracing() {
    // Prefer RUST_LOG if set; otherwise use a sensible default.
    // Ex:
    // RUST_LOG=info,idp_resource_server=debug,tower_http=debug cargo run
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info,tower_http=info"));

    tracing_subscriber::registry()
        .with(filter)
        .with(tracing_subscriber::fmt::layer())
        .init();
}

fn init_panic_hook(abort_on_panic: bool) {
    let default_hook = panic::take_hook();

    panic::set_hook(Box::new(move |info| {
        // stderr can be hidden depending on how the process is launched.
        tracing::error!(?info, "panic");

        if abort_on_panic {
            process::abort();
        } else {
            default_hook(info);
        }
    }))
}

pub async fn run() -> Result<()> {
    init_tracing();
    let config = Config::from_env()?;
    init_panic_hook(!config.app_env.is_production());

    tracing::info!(
        port = config.addr.port(),
        env = ?config.app_env,
        issuer = %config.issuer,
        audience = %config.audience,
        metadata_url = %config.metadata_url,
        org_url = %config.org_url,
        "loaded configuration"
    );

    // Phase 1: no listener until the signing keys are in place.
    let state = build_state(config.clone()).await?;
    spawn_session_sweeper(&state, config.session_ttl);

    // Phase 2
    let app = build_router(state, &config);
    let listener = tokio::net::TcpListener::bind(config.addr)
        .await
        .with_context(|| format!("binding {}", config.addr))?;
    tracing::info!(addr = %config.addr, "listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    tracing::info!("server stopped");
    Ok(())
}

async fn build_state(config: Config) -> Result<AppState> {
    let http = reqwest::Client::builder()
        .timeout(config.remote_timeout)
        .user_agent(concat!(env!("CARGO_PKG_NAME"), "/", env!("CARGO_PKG_VERSION")))
        .build()
        .context("building HTTP client")?;

    let verifier = build_token_verifier(&config, http.clone())
        .await
        .context("unable to load signing keys from issuer metadata")?;

    let image = tokio::fs::read(&config.protected_resource_path)
        .await
        .with_context(|| {
            format!(
                "reading protected resource {}",
                config.protected_resource_path.display()
            )
        })?;

    let sessions = Arc::new(SessionStore::new(config.session_ttl));

    let idp = match &config.idp_api_token {
        Some(token) => {
            let client = HttpIdpClient::new(http, config.org_url.clone(), token.clone());
            Some(IdpTransactionCoordinator::new(
                Arc::new(client),
                sessions.clone(),
            ))
        }
        None => {
            tracing::warn!("IDP_API_TOKEN is not set; social registration is disabled");
            None
        }
    };

    Ok(AppState::new(
        Arc::new(config),
        verifier,
        sessions,
        idp,
        STANDARD.encode(image),
    ))
}

fn spawn_session_sweeper(state: &AppState, ttl: Duration) {
    let every = (ttl / 4).clamp(Duration::from_secs(1), Duration::from_secs(60));
    state.sessions.clone().spawn_sweeper(every);
}

/// Total time a request may take. A single request can make two remote calls
/// (discovery + key set on a key refresh), each bounded by the remote timeout.
fn request_timeout(config: &Config) -> Duration {
    (config.remote_timeout * 2 + Duration::from_secs(1)).max(Duration::from_secs(30))
}

fn build_router(state: AppState, config: &Config) -> Router {
    let router = api::routes(&state).with_state(state);

    let router = middleware::http::apply(router, request_timeout(config));
    let router = middleware::security_headers::apply(router, config);
    middleware::cors::apply(router, config)
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %err, "unable to listen for shutdown signal");
        // no signal handler: serve until killed
        std::future::pending::<()>().await;
    }
    tracing::info!("shutdown signal received");
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::services::auth::{KeyStore, TokenVerifier, VerifierPolicy};
    use crate::test_support;
    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use tower::ServiceExt;

    fn state(config: &Config) -> AppState {
        // Never loaded: /health does not touch the verifier.
        let keys = Arc::new(KeyStore::new(
            test_support::http_client(),
            config.metadata_url.clone(),
        ));
        let verifier = Arc::new(TokenVerifier::new(
            keys,
            VerifierPolicy {
                issuer: config.issuer.clone(),
                audience: config.audience.clone(),
                leeway_seconds: 0,
            },
        ));

        AppState::new(
            Arc::new(config.clone()),
            verifier,
            Arc::new(SessionStore::new(config.session_ttl)),
            None,
            "",
        )
    }

    #[tokio::test]
    async fn responses_carry_request_id_and_security_headers() {
        let config = test_support::config("https://example.okta.com");
        let app = build_router(state(&config), &config);

        let response = app
            .oneshot(Request::get("/health").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let headers = response.headers();
        assert!(headers.contains_key("x-request-id"));
        assert_eq!(headers["x-frame-options"], "DENY");
        assert_eq!(headers["x-content-type-options"], "nosniff");
        assert!(!headers.contains_key("strict-transport-security"));
    }

    #[tokio::test]
    async fn unknown_route_is_404_not_401() {
        let config = test_support::config("https://example.okta.com");
        let app = build_router(state(&config), &config);

        let response = app
            .oneshot(Request::get("/nope").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[test]
    fn request_timeout_covers_two_remote_calls() {
        let mut config = test_support::config("https://example.okta.com");
        assert_eq!(request_timeout(&config), Duration::from_secs(30));

        config.remote_timeout = Duration::from_secs(20);
        assert_eq!(request_timeout(&config), Duration::from_secs(41));
    }
}
