//! CORS for browser clients calling `/claims` and `/protected` from another origin.
//!
//! Bearer tokens travel in `Authorization`, so credentials mode is never enabled.
//! Development allows any origin; production only the `CORS_ALLOWED_ORIGINS` list
//! (an empty list means no CORS headers at all).

use std::time::Duration;

use axum::Router;
use axum::http::{HeaderName, HeaderValue, Method, header};
use tower_http::cors::{AllowOrigin, Any, CorsLayer};

use crate::config::Config;
use crate::middleware::http::REQUEST_ID_HEADER;

fn allow_origin(config: &Config) -> AllowOrigin {
    if !config.app_env.is_production() {
        return Any.into();
    }

    let allowed: Vec<HeaderValue> = config
        .cors_allowed_origins
        .iter()
        .filter_map(|origin| HeaderValue::from_str(origin).ok())
        .collect();

    AllowOrigin::predicate(move |origin: &HeaderValue, _req| allowed.contains(origin))
}

pub fn apply(router: Router, config: &Config) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(allow_origin(config))
        .allow_methods([Method::GET, Method::POST, Method::OPTIONS])
        .allow_headers([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
            HeaderName::from_static(REQUEST_ID_HEADER),
        ])
        // browsers may read the bearer challenge on 401/403
        .expose_headers([header::WWW_AUTHENTICATE])
        .max_age(Duration::from_secs(10 * 60));

    router.layer(cors)
}
