//! Signing-key cache for the identity provider.
//!
//! Keys are resolved through the issuer's discovery document and kept for the
//! lifetime of the process. An unknown `kid` triggers a refresh; concurrent
//! misses share one outstanding fetch.
//!
//! Failure policy:
//! - a failed refresh keeps the previous key set (possibly empty)
//! - a key that is still absent after the refresh is reported as not found

use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use chrono::{DateTime, Utc};
use jsonwebtoken::jwk::{Jwk, JwkSet, KeyAlgorithm, PublicKeyUse};
use jsonwebtoken::{Algorithm, DecodingKey};
use thiserror::Error;
use tokio::sync::{Mutex, RwLock};
use tracing::{debug, info, warn};
use url::Url;

use crate::services::auth::discovery::{fetch_metadata, get_json};

/// Failure to obtain the key set. Cloneable so every coalesced waiter observes the same result.
#[derive(Debug, Clone, Error)]
pub enum KeyFetchError {
    #[error("network error: {0}")]
    Network(String),
    #[error("unexpected HTTP status {0}")]
    HttpStatus(u16),
    #[error("invalid document: {0}")]
    Parse(String),
    #[error("key set contains no usable signing keys")]
    NoSigningKeys,
}

/// A verification key resolved from the JWKS.
pub struct SigningKey {
    pub kid: String,
    pub decoding_key: DecodingKey,
    // `alg` declared on the JWK, if any.
    pub algorithm: Option<Algorithm>,
}

impl std::fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Do not print key material
        f.debug_struct("SigningKey")
            .field("kid", &self.kid)
            .field("algorithm", &self.algorithm)
            .finish()
    }
}

/// Key-id → key mapping plus where and when it was loaded.
#[derive(Debug)]
pub struct SigningKeySet {
    keys: HashMap<String, Arc<SigningKey>>,
    source: Url,
    refreshed_at: DateTime<Utc>,
}

impl SigningKeySet {
    fn from_jwks(jwks: &JwkSet, source: Url) -> Self {
        let keys = jwks
            .keys
            .iter()
            .filter_map(signing_key_from_jwk)
            .map(|key| (key.kid.clone(), Arc::new(key)))
            .collect();

        Self {
            keys,
            source,
            refreshed_at: Utc::now(),
        }
    }

    pub fn get(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.get(kid).cloned()
    }

    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }
}

/// Read-only view of the current key set, for logging and diagnostics.
#[derive(Debug, Clone)]
pub struct KeySetSnapshot {
    pub source: Url,
    pub key_ids: Vec<String>,
    pub refreshed_at: DateTime<Utc>,
}

pub struct KeyStore {
    http: reqwest::Client,
    metadata_url: Url,
    jwks_uri: RwLock<Option<Url>>,
    keys: RwLock<Option<SigningKeySet>>,

    // Bumped after every completed refresh; lets waiters detect a refresh they did not start.
    generation: AtomicU64,
    // Single-flight guard; holds the result of the most recent refresh.
    in_flight: Mutex<Option<Result<(), KeyFetchError>>>,
}

impl KeyStore {
    pub fn new(http: reqwest::Client, metadata_url: Url) -> Self {
        Self {
            http,
            metadata_url,
            jwks_uri: RwLock::new(None),
            keys: RwLock::new(None),
            generation: AtomicU64::new(0),
            in_flight: Mutex::new(None),
        }
    }

    /// Startup load. Fails unless at least one signing key is available afterwards.
    pub async fn load(&self) -> Result<KeySetSnapshot, KeyFetchError> {
        self.refresh().await?;

        self.snapshot()
            .await
            .filter(|s| !s.key_ids.is_empty())
            .ok_or(KeyFetchError::NoSigningKeys)
    }

    /// Look up a key, refreshing once on a miss.
    pub async fn get_key(&self, kid: &str) -> Option<Arc<SigningKey>> {
        // Read the generation before the lookup so a refresh finishing in between is not repeated.
        let observed = self.generation.load(Ordering::Acquire);

        if let Some(key) = self.cached(kid).await {
            return Some(key);
        }

        debug!(kid, "signing key cache miss");
        if let Err(err) = self.refresh_after(observed).await {
            warn!(kid, error = %err, "signing key refresh failed; keeping cached keys");
        }

        self.cached(kid).await
    }

    /// Refresh the key set, joining a refresh that is already in progress.
    pub async fn refresh(&self) -> Result<(), KeyFetchError> {
        let observed = self.generation.load(Ordering::Acquire);
        self.refresh_after(observed).await
    }

    pub async fn snapshot(&self) -> Option<KeySetSnapshot> {
        let keys = self.keys.read().await;
        keys.as_ref().map(|set| {
            let mut key_ids: Vec<String> = set.keys.keys().cloned().collect();
            key_ids.sort();
            KeySetSnapshot {
                source: set.source.clone(),
                key_ids,
                refreshed_at: set.refreshed_at,
            }
        })
    }

    async fn cached(&self, kid: &str) -> Option<Arc<SigningKey>> {
        self.keys.read().await.as_ref().and_then(|set| set.get(kid))
    }

    async fn refresh_after(&self, observed: u64) -> Result<(), KeyFetchError> {
        let mut last = self.in_flight.lock().await;

        // Someone else completed a refresh while we waited: share its outcome.
        if self.generation.load(Ordering::Acquire) != observed
            && let Some(result) = last.as_ref()
        {
            return result.clone();
        }

        let result = self.fetch_key_set().await;
        *last = Some(result.clone());
        self.generation.fetch_add(1, Ordering::AcqRel);

        result
    }

    async fn fetch_key_set(&self) -> Result<(), KeyFetchError> {
        let jwks_uri = self.resolve_jwks_uri().await?;

        let body = get_json(&self.http, &jwks_uri).await?;
        let jwks: JwkSet = serde_json::from_value(body).map_err(|e| {
            warn!(url = %jwks_uri, error = %e, "invalid JWKS document");
            KeyFetchError::Parse(e.to_string())
        })?;

        let set = SigningKeySet::from_jwks(&jwks, jwks_uri.clone());
        if set.is_empty() {
            warn!(url = %jwks_uri, "JWKS contains no usable signing keys");
            return Err(KeyFetchError::NoSigningKeys);
        }

        info!(url = %jwks_uri, keys = set.keys.len(), "trusting tokens signed with keys from JWKS");
        *self.keys.write().await = Some(set);

        Ok(())
    }

    async fn resolve_jwks_uri(&self) -> Result<Url, KeyFetchError> {
        if let Some(uri) = self.jwks_uri.read().await.clone() {
            return Ok(uri);
        }

        let metadata = fetch_metadata(&self.http, &self.metadata_url).await?;
        *self.jwks_uri.write().await = Some(metadata.jwks_uri.clone());

        Ok(metadata.jwks_uri)
    }
}

impl std::fmt::Debug for KeyStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("KeyStore")
            .field("metadata_url", &self.metadata_url.as_str())
            .field("generation", &self.generation.load(Ordering::Relaxed))
            .finish()
    }
}

fn signing_key_from_jwk(jwk: &Jwk) -> Option<SigningKey> {
    if matches!(jwk.common.public_key_use, Some(PublicKeyUse::Encryption)) {
        return None;
    }

    let Some(kid) = jwk.common.key_id.clone() else {
        debug!("skipping JWK without kid");
        return None;
    };

    match DecodingKey::from_jwk(jwk) {
        Ok(decoding_key) => Some(SigningKey {
            kid,
            decoding_key,
            algorithm: jwk_algorithm(jwk),
        }),
        Err(e) => {
            warn!(kid, error = %e, "skipping unusable JWK");
            None
        }
    }
}

fn jwk_algorithm(jwk: &Jwk) -> Option<Algorithm> {
    jwk.common.key_algorithm.as_ref().and_then(|alg| match alg {
        KeyAlgorithm::RS256 => Some(Algorithm::RS256),
        KeyAlgorithm::RS384 => Some(Algorithm::RS384),
        KeyAlgorithm::RS512 => Some(Algorithm::RS512),
        KeyAlgorithm::ES256 => Some(Algorithm::ES256),
        KeyAlgorithm::ES384 => Some(Algorithm::ES384),
        KeyAlgorithm::PS256 => Some(Algorithm::PS256),
        KeyAlgorithm::PS384 => Some(Algorithm::PS384),
        KeyAlgorithm::PS512 => Some(Algorithm::PS512),
        KeyAlgorithm::EdDSA => Some(Algorithm::EdDSA),
        _ => None,
    })
}
