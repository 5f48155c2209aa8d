/// Factory: build the `TokenVerifier` (and its `KeyStore`) from application `Config`.
use std::sync::Arc;

use crate::config::Config;
use crate::services::auth::{KeyFetchError, KeyStore, TokenVerifier, VerifierPolicy};

/// Phase 1 of startup: discover the key-set endpoint and load the signing keys.
///
/// Protected routes can never succeed without keys, so the caller treats an error as fatal.
pub async fn build_token_verifier(
    config: &Config,
    http: reqwest::Client,
) -> Result<Arc<TokenVerifier>, KeyFetchError> {
    let keys = Arc::new(KeyStore::new(http, config.metadata_url.clone()));

    tracing::info!(metadata_url = %config.metadata_url, "fetching issuer metadata");
    let loaded = keys.load().await?;
    tracing::info!(
        jwks_uri = %loaded.source,
        key_ids = ?loaded.key_ids,
        "signing keys loaded"
    );

    let policy = VerifierPolicy {
        issuer: config.issuer.clone(),
        audience: config.audience.clone(),
        leeway_seconds: config.access_token_leeway_seconds,
    };

    Ok(Arc::new(TokenVerifier::new(keys, policy)))
}
