use chrono::{DateTime, Utc};
use serde::Serialize;
use serde_json::{Map, Value};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum TransactionState {
    AwaitingProfile,
    Completed,
    Abandoned,
}

/// An in-progress IdP registration handshake, owned by exactly one session.
#[derive(Debug, Clone, Serialize)]
pub struct Transaction {
    id: String,
    profile: Map<String, Value>,
    state: TransactionState,
    created_at: DateTime<Utc>,
}

impl Transaction {
    pub(super) fn awaiting_profile(id: String, profile: Map<String, Value>) -> Self {
        Self {
            id,
            profile,
            state: TransactionState::AwaitingProfile,
            created_at: Utc::now(),
        }
    }

    pub(super) fn finish(mut self, state: TransactionState) -> Self {
        self.state = state;
        self
    }

    /// Opaque id issued by the identity provider.
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Partial profile returned by the identity provider.
    pub fn profile(&self) -> &Map<String, Value> {
        &self.profile
    }

    pub fn state(&self) -> TransactionState {
        self.state
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn is_pending(&self) -> bool {
        self.state == TransactionState::AwaitingProfile
    }
}
