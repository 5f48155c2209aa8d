/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - config, token verifier, session store, IdP coordinator, protected resource
 * - Clone 前提で持つ (内部は Arc/Clone cheap)
 */
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::TokenVerifier;
use crate::services::idp::IdpTransactionCoordinator;
use crate::services::session::SessionStore;

#[derive(Clone, Debug)]
pub struct AppState {
    pub config: Arc<Config>,
    pub verifier: Arc<TokenVerifier>,
    pub sessions: Arc<SessionStore>,
    // None when no IdP API token is configured
    pub idp: Option<IdpTransactionCoordinator>,
    /// Base64 body served by `/protected`.
    pub protected_resource: Arc<str>,
}

impl AppState {
    pub fn new(
        config: Arc<Config>,
        verifier: Arc<TokenVerifier>,
        sessions: Arc<SessionStore>,
        idp: Option<IdpTransactionCoordinator>,
        protected_resource: impl Into<Arc<str>>,
    ) -> Self {
        Self {
            config,
            verifier,
            sessions,
            idp,
            protected_resource: protected_resource.into(),
        }
    }
}
