//! Browser session cookie (`sid`).
//!
//! Resolves the presented cookie to a live `SessionId` (or starts a new session),
//! hands it to handlers through request extensions, and afterwards
//! - sets the cookie when the session is new
//! - removes the cookie when the handler destroyed the session

use std::sync::Arc;

use axum::{
    Router,
    body::Body,
    extract::State,
    http::Request,
    middleware::{self, Next},
    response::{IntoResponse, Response},
};
use axum_extra::extract::CookieJar;
use cookie::{Cookie, SameSite};

use crate::services::session::{SessionId, SessionStore};
use crate::state::AppState;

pub const SESSION_COOKIE: &str = "sid";

#[derive(Clone)]
struct SessionCtx {
    sessions: Arc<SessionStore>,
    secure: bool,
}

pub fn apply(
    router: Router<AppState>,
    sessions: Arc<SessionStore>,
    secure: bool,
) -> Router<AppState> {
    let ctx = SessionCtx { sessions, secure };
    router.route_layer(middleware::from_fn_with_state(ctx, session_middleware))
}

async fn session_middleware(
    State(ctx): State<SessionCtx>,
    jar: CookieJar,
    mut req: Request<Body>,
    next: Next,
) -> Response {
    let presented = jar
        .get(SESSION_COOKIE)
        .and_then(|c| c.value().parse::<SessionId>().ok());
    let (sid, created) = ctx.sessions.open(presented);

    req.extensions_mut().insert(sid);
    let response = next.run(req).await;

    let jar = if !ctx.sessions.contains(sid) {
        jar.remove(Cookie::build(SESSION_COOKIE).path("/"))
    } else if created {
        jar.add(session_cookie(sid, ctx.secure))
    } else {
        jar
    };

    (jar, response).into_response()
}

fn session_cookie(sid: SessionId, secure: bool) -> Cookie<'static> {
    Cookie::build((SESSION_COOKIE, sid.to_string()))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::Lax)
        .path("/")
        .build()
}
