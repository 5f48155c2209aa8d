use std::collections::BTreeSet;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Serialize, Serializer};
use serde_json::{Map, Value};

/// Claims of a bearer token that passed every verification step.
///
/// - Constructed only by `TokenVerifier::verify`; there are no setters.
/// - Serializes as the full validated payload (what `/claims` returns).
#[derive(Debug, Clone)]
pub struct TokenClaims {
    subject: Option<String>,
    issuer: String,
    audience: Vec<String>,
    scopes: BTreeSet<String>,
    expires_at: DateTime<Utc>,
    issued_at: Option<DateTime<Utc>>,
    key_id: String,
    payload: Map<String, Value>,
}

impl TokenClaims {
    #[allow(clippy::too_many_arguments)]
    pub(super) fn new(
        subject: Option<String>,
        issuer: String,
        audience: Vec<String>,
        scopes: BTreeSet<String>,
        expires_at: DateTime<Utc>,
        issued_at: Option<DateTime<Utc>>,
        key_id: String,
        payload: Map<String, Value>,
    ) -> Self {
        Self {
            subject,
            issuer,
            audience,
            scopes,
            expires_at,
            issued_at,
            key_id,
            payload,
        }
    }

    pub fn subject(&self) -> Option<&str> {
        self.subject.as_deref()
    }

    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    pub fn audience(&self) -> &[String] {
        &self.audience
    }

    pub fn scopes(&self) -> &BTreeSet<String> {
        &self.scopes
    }

    pub fn expires_at(&self) -> DateTime<Utc> {
        self.expires_at
    }

    pub fn issued_at(&self) -> Option<DateTime<Utc>> {
        self.issued_at
    }

    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    pub fn payload(&self) -> &Map<String, Value> {
        &self.payload
    }
}

impl Serialize for TokenClaims {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        self.payload.serialize(serializer)
    }
}

/// Scopes a route demands; fixed at startup.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ScopeRequirement(BTreeSet<String>);

impl ScopeRequirement {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn is_satisfied_by(&self, granted: &BTreeSet<String>) -> bool {
        self.0.is_subset(granted)
    }
}

impl<S: Into<String>> FromIterator<S> for ScopeRequirement {
    fn from_iter<I: IntoIterator<Item = S>>(iter: I) -> Self {
        Self(
            iter.into_iter()
                .map(Into::into)
                .filter(|s: &String| !s.is_empty())
                .collect(),
        )
    }
}

impl fmt::Display for ScopeRequirement {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined: Vec<&str> = self.0.iter().map(String::as_str).collect();
        f.write_str(&joined.join(" "))
    }
}
