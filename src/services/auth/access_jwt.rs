//! Bearer access-token verification against the issuer's published keys.
//!
//! Checks run in a fixed order and the first failure wins:
//! envelope → key id → signature → exp/nbf → iss → aud → scope.
//! Nothing from the payload is trusted before the signature step succeeds.

use std::collections::BTreeSet;
use std::sync::Arc;

use base64::Engine;
use base64::engine::general_purpose::URL_SAFE_NO_PAD;
use chrono::{DateTime, Utc};
use jsonwebtoken::{Algorithm, Header, Validation};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Map, Value};
use thiserror::Error;
use tracing::debug;

use crate::services::auth::claims::{ScopeRequirement, TokenClaims};
use crate::services::auth::key_store::{KeyStore, SigningKey};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum VerificationError {
    #[error("token is not a well-formed JWT")]
    Malformed,
    #[error("token was signed with an unknown key")]
    UnknownKey,
    #[error("token signature is invalid")]
    BadSignature,
    #[error("token has expired")]
    Expired,
    #[error("token is not valid yet")]
    NotYetValid,
    #[error("token issuer does not match")]
    IssuerMismatch,
    #[error("token audience does not match")]
    AudienceMismatch,
    #[error("token lacks a required scope")]
    InsufficientScope,
}

impl VerificationError {
    /// Whether the caller authenticated fine but lacks permission (403 rather than 401).
    pub fn is_authorization_failure(&self) -> bool {
        matches!(self, Self::InsufficientScope)
    }
}

/// What a token must match besides its signature.
#[derive(Debug, Clone)]
pub struct VerifierPolicy {
    pub issuer: String,
    pub audience: String,
    pub leeway_seconds: u64,
}

#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum AudienceClaim {
    One(String),
    Many(Vec<String>),
}

impl AudienceClaim {
    fn into_vec(self) -> Vec<String> {
        match self {
            Self::One(aud) => vec![aud],
            Self::Many(auds) => auds,
        }
    }
}

// The identity provider emits `scp` as an array; RFC 8693 style tokens use a `scope` string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum ScpClaim {
    List(Vec<String>),
    Joined(String),
}

/// Reads one claim of the verified payload.
/// `None`: absent. `Some(Err(_))`: present with an unexpected JSON type.
fn claim<T: DeserializeOwned>(
    payload: &Map<String, Value>,
    name: &str,
) -> Option<Result<T, serde_json::Error>> {
    payload.get(name).map(|value| T::deserialize(value))
}

/// NumericDate (RFC 7519 §2): integer or fractional seconds.
fn numeric_date(payload: &Map<String, Value>, name: &str) -> Option<Result<f64, serde_json::Error>> {
    claim::<f64>(payload, name)
}

fn to_datetime(seconds: f64) -> Option<DateTime<Utc>> {
    if !seconds.is_finite() {
        return None;
    }
    DateTime::from_timestamp_millis((seconds * 1000.0).floor() as i64)
}

/// Union of the space-delimited `scope` string and the `scp` claim.
/// Values of any other shape grant nothing.
fn granted_scopes(payload: &Map<String, Value>) -> BTreeSet<String> {
    let mut scopes = BTreeSet::new();

    if let Some(Ok(scope)) = claim::<String>(payload, "scope") {
        scopes.extend(scope.split_whitespace().map(str::to_string));
    }
    match claim::<ScpClaim>(payload, "scp") {
        Some(Ok(ScpClaim::List(list))) => scopes.extend(list),
        Some(Ok(ScpClaim::Joined(joined))) => {
            scopes.extend(joined.split_whitespace().map(str::to_string))
        }
        _ => {}
    }

    scopes
}

/// A token split into its three segments with header and payload decoded.
/// The payload stays an untyped object until the signature is checked.
struct Envelope {
    header: Header,
    payload: Map<String, Value>,
}

impl Envelope {
    fn parse(token: &str) -> Result<Self, VerificationError> {
        let mut segments = token.split('.');
        let (Some(header), Some(payload), Some(signature), None) = (
            segments.next(),
            segments.next(),
            segments.next(),
            segments.next(),
        ) else {
            return Err(VerificationError::Malformed);
        };

        if signature.is_empty()
            || !signature
                .bytes()
                .all(|b| b.is_ascii_alphanumeric() || b == b'-' || b == b'_')
        {
            return Err(VerificationError::Malformed);
        }

        Ok(Self {
            header: decode_segment(header)?,
            payload: decode_segment(payload)?,
        })
    }
}

fn decode_segment<T: DeserializeOwned>(segment: &str) -> Result<T, VerificationError> {
    let bytes = URL_SAFE_NO_PAD
        .decode(segment)
        .map_err(|_| VerificationError::Malformed)?;
    serde_json::from_slice(&bytes).map_err(|_| VerificationError::Malformed)
}

/// Verifies bearer tokens issued by the configured identity provider.
#[derive(Clone)]
pub struct TokenVerifier {
    keys: Arc<KeyStore>,
    policy: VerifierPolicy,
}

impl std::fmt::Debug for TokenVerifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenVerifier")
            .field("policy", &self.policy)
            .finish()
    }
}

impl TokenVerifier {
    pub fn new(keys: Arc<KeyStore>, policy: VerifierPolicy) -> Self {
        Self { keys, policy }
    }

    pub fn policy(&self) -> &VerifierPolicy {
        &self.policy
    }

    pub fn key_store(&self) -> &KeyStore {
        &self.keys
    }

    pub async fn verify(
        &self,
        token: &str,
        required: &ScopeRequirement,
    ) -> Result<TokenClaims, VerificationError> {
        self.verify_at(token, required, Utc::now().timestamp()).await
    }

    async fn verify_at(
        &self,
        token: &str,
        required: &ScopeRequirement,
        now: i64,
    ) -> Result<TokenClaims, VerificationError> {
        let envelope = Envelope::parse(token)?;

        let kid = envelope
            .header
            .kid
            .clone()
            .ok_or(VerificationError::UnknownKey)?;
        let key = self
            .keys
            .get_key(&kid)
            .await
            .ok_or(VerificationError::UnknownKey)?;

        check_signature(token, &envelope.header, &key)?;

        let Envelope { payload, .. } = envelope;
        let now = now as f64;
        let leeway = self.policy.leeway_seconds as f64;

        let exp = match numeric_date(&payload, "exp") {
            Some(Ok(exp)) => exp,
            _ => return Err(VerificationError::Expired),
        };
        if now >= exp + leeway {
            return Err(VerificationError::Expired);
        }
        match numeric_date(&payload, "nbf") {
            None => {}
            Some(Ok(nbf)) if now + leeway >= nbf => {}
            Some(_) => return Err(VerificationError::NotYetValid),
        }
        let expires_at = to_datetime(exp).ok_or(VerificationError::Expired)?;

        let issuer = match claim::<String>(&payload, "iss") {
            Some(Ok(iss)) if iss == self.policy.issuer => iss,
            _ => return Err(VerificationError::IssuerMismatch),
        };

        let audience = match claim::<AudienceClaim>(&payload, "aud") {
            Some(Ok(aud)) => aud.into_vec(),
            _ => return Err(VerificationError::AudienceMismatch),
        };
        if !audience.iter().any(|aud| aud == &self.policy.audience) {
            return Err(VerificationError::AudienceMismatch);
        }

        let scopes = granted_scopes(&payload);
        if !required.is_empty() && !required.is_satisfied_by(&scopes) {
            return Err(VerificationError::InsufficientScope);
        }

        let subject = claim::<String>(&payload, "sub").and_then(Result::ok);
        let issued_at = numeric_date(&payload, "iat")
            .and_then(Result::ok)
            .and_then(to_datetime);

        Ok(TokenClaims::new(
            subject, issuer, audience, scopes, expires_at, issued_at, kid, payload,
        ))
    }
}

fn check_signature(token: &str, header: &Header, key: &SigningKey) -> Result<(), VerificationError> {
    // Shared-secret algorithms never verify tokens from a public key set.
    if matches!(header.alg, Algorithm::HS256 | Algorithm::HS384 | Algorithm::HS512) {
        return Err(VerificationError::BadSignature);
    }
    if let Some(expected) = key.algorithm
        && expected != header.alg
    {
        return Err(VerificationError::BadSignature);
    }

    // Signature only; claims are checked afterwards in a fixed order.
    let mut validation = Validation::new(header.alg);
    validation.validate_exp = false;
    validation.validate_nbf = false;
    validation.validate_aud = false;
    validation.required_spec_claims.clear();

    jsonwebtoken::decode::<Value>(token, &key.decoding_key, &validation).map_err(|e| {
        debug!(kid = %key.kid, error = %e, "signature check failed");
        VerificationError::BadSignature
    })?;

    Ok(())
}
