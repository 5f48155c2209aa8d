//! Bearer access token verification → AuthCtx を extensions に入れる
//!
//! - `Authorization: Bearer <jwt>` を取り出し、TokenVerifier で検証する
//! - 失敗時は handler を実行せずに 401 / 403 を返す (理由はログのみ)
//! - 成功時は検証済み claims を `AuthCtx` として request extensions に格納する

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::{HeaderMap, Request, header},
    middleware::{self, Next},
    response::Response,
};

use crate::api::extractors::AuthCtx;
use crate::error::AppError;
use crate::services::auth::{ScopeRequirement, TokenVerifier};
use crate::state::AppState;

#[derive(Clone)]
struct Gate {
    verifier: Arc<TokenVerifier>,
    required: Arc<ScopeRequirement>,
}

/// Protect every route of `router` with bearer verification demanding `required`.
///
/// 例：
/// ```ignore
/// let protected = Router::new().route("/protected", get(protected));
/// let protected = middleware::auth::access::apply(protected, verifier, scopes);
/// ```
pub fn apply(
    router: Router<AppState>,
    verifier: Arc<TokenVerifier>,
    required: ScopeRequirement,
) -> Router<AppState> {
    let gate = Gate {
        verifier,
        required: Arc::new(required),
    };
    // route_layer: 未定義のパスは 401 ではなく 404 のまま
    router.route_layer(middleware::from_fn_with_state(gate, access_middleware))
}

async fn access_middleware(
    State(gate): State<Gate>,
    mut req: Request<Body>,
    next: Next,
) -> Result<Response, AppError> {
    let token = bearer_token(req.headers()).ok_or_else(|| {
        tracing::debug!(path = %req.uri().path(), "request without bearer token");
        AppError::missing_token()
    })?;

    let claims = match gate.verifier.verify(token, &gate.required).await {
        Ok(claims) => claims,
        Err(err) => {
            tracing::warn!(
                error = ?err,
                path = %req.uri().path(),
                "access token verification failed"
            );
            return Err(AppError::from_verification(err, &gate.required));
        }
    };

    tracing::debug!(
        sub = ?claims.subject(),
        kid = claims.key_id(),
        scopes = ?claims.scopes(),
        exp = %claims.expires_at(),
        "access token verified"
    );

    // middleware → extractor への受け渡し
    req.extensions_mut().insert(AuthCtx::new(claims));

    Ok(next.run(req).await)
}

fn bearer_token(headers: &HeaderMap) -> Option<&str> {
    let value = headers.get(header::AUTHORIZATION)?.to_str().ok()?;
    let (scheme, token) = value.split_once(' ')?;
    let token = token.trim();

    (scheme.eq_ignore_ascii_case("bearer") && !token.is_empty()).then_some(token)
}
