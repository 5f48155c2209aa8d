//! Three-step social-registration handshake:
//!
//! 1. fetch the IdP transaction named by the callback (`tx_id`) and remember it in the session
//! 2. collect the supplemental profile from the browser
//! 3. provision the account; on `SUCCESS` the session is destroyed and the browser is sent
//!    to the finish URL with the one-time session token
//!
//! A failed step leaves the session's transaction exactly as it was. Nothing is retried.

use std::sync::Arc;

use serde_json::Value;
use thiserror::Error;
use tracing::{info, warn};
use url::Url;

use crate::services::idp::client::{IdpError, IdpManagementApi};
use crate::services::idp::types::ProvisionProfile;
use crate::services::session::{SessionId, SessionStore, Transaction};

#[derive(Debug, Error)]
pub enum TransactionError {
    #[error("callback is missing tx_id")]
    MissingTransactionId,
    #[error("no pending IdP transaction for this session")]
    NoPendingTransaction,
    #[error(transparent)]
    Remote(#[from] IdpError),
}

#[derive(Debug)]
pub enum SubmitOutcome {
    /// Account provisioned; the session is gone.
    Completed {
        finish_url: Url,
        session_token: Option<String>,
    },
    /// Any other status (e.g. MFA enrollment). Carries the provider's response body verbatim.
    Pending(Value),
}

#[derive(Clone)]
pub struct IdpTransactionCoordinator {
    api: Arc<dyn IdpManagementApi>,
    sessions: Arc<SessionStore>,
}

impl std::fmt::Debug for IdpTransactionCoordinator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("IdpTransactionCoordinator").finish_non_exhaustive()
    }
}

impl IdpTransactionCoordinator {
    pub fn new(api: Arc<dyn IdpManagementApi>, sessions: Arc<SessionStore>) -> Self {
        Self { api, sessions }
    }

    /// Fetch step. Stores the transaction in the session only after the remote call succeeds.
    pub async fn begin(
        &self,
        session: SessionId,
        tx_id: Option<&str>,
    ) -> Result<Transaction, TransactionError> {
        let tx_id = tx_id
            .map(str::trim)
            .filter(|id| !id.is_empty())
            .ok_or(TransactionError::MissingTransactionId)?;

        info!(tx_id, "fetching IdP transaction");
        let detail = self.api.fetch_transaction(tx_id).await.map_err(|e| {
            warn!(tx_id, error = %e, "unable to fetch IdP transaction");
            e
        })?;

        Ok(self.sessions.create(session, tx_id, detail.profile))
    }

    /// Submit step. Requires a transaction previously stored by `begin` for the same session.
    pub async fn submit(
        &self,
        session: SessionId,
        profile: ProvisionProfile,
    ) -> Result<SubmitOutcome, TransactionError> {
        let tx = self
            .sessions
            .get(session)
            .ok_or(TransactionError::NoPendingTransaction)?;
        let tx_id = tx.id();

        info!(tx_id, ?profile, "registering additional profile for IdP transaction");
        let response = self.api.provision(tx_id, &profile).await.map_err(|e| {
            warn!(tx_id, error = %e, "unable to provision IdP transaction");
            e
        })?;

        if !response.is_success() {
            info!(tx_id, status = ?response.status, "IdP transaction needs further steps");
            return Ok(SubmitOutcome::Pending(response.body));
        }

        let finish_url = self.api.finish_url(tx_id)?;
        self.sessions.complete(session);
        self.sessions.destroy(session);

        Ok(SubmitOutcome::Completed {
            finish_url,
            session_token: response.session_token,
        })
    }
}
