//! Browser sessions and the IdP transaction each one may hold.
//!
//! Each session record owns at most one pending `Transaction`; nothing is shared
//! between sessions. Records live in a sharded map so unrelated sessions do not
//! contend. Within one session, concurrent writers are last-writer-wins.

use std::fmt;
use std::str::FromStr;
use std::sync::Arc;
use std::time::{Duration, Instant};

use dashmap::DashMap;
use serde_json::{Map, Value};
use tokio::task::JoinHandle;
use tracing::{debug, info};
use uuid::Uuid;

use crate::services::session::transaction::{Transaction, TransactionState};

/// Opaque browser-session identity (the `sid` cookie value).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct SessionId(Uuid);

impl SessionId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }
}

impl fmt::Display for SessionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        self.0.fmt(f)
    }
}

impl FromStr for SessionId {
    type Err = uuid::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Uuid::parse_str(s).map(Self)
    }
}

#[derive(Debug)]
struct Session {
    last_seen: Instant,
    transaction: Option<Transaction>,
}

impl Session {
    fn new() -> Self {
        Self {
            last_seen: Instant::now(),
            transaction: None,
        }
    }
}

#[derive(Debug)]
pub struct SessionStore {
    sessions: DashMap<SessionId, Session>,
    ttl: Duration,
}

impl SessionStore {
    pub fn new(ttl: Duration) -> Self {
        Self {
            sessions: DashMap::new(),
            ttl,
        }
    }

    /// Resume the presented session if it is still live, otherwise start a new one.
    ///
    /// Returns the session id and whether it was newly created.
    pub fn open(&self, presented: Option<SessionId>) -> (SessionId, bool) {
        if let Some(id) = presented {
            if let Some(mut session) = self.sessions.get_mut(&id)
                && session.last_seen.elapsed() < self.ttl
            {
                session.last_seen = Instant::now();
                return (id, false);
            }
            // expired or unknown
            self.destroy(id);
        }

        let id = SessionId::generate();
        self.sessions.insert(id, Session::new());
        debug!(session = %id, "session started");
        (id, true)
    }

    pub fn contains(&self, id: SessionId) -> bool {
        self.sessions.contains_key(&id)
    }

    /// Destroy a session; a pending transaction it held is abandoned.
    pub fn destroy(&self, id: SessionId) -> Option<Transaction> {
        let (_, session) = self.sessions.remove(&id)?;
        Self::retire(id, session)
    }

    fn retire(id: SessionId, session: Session) -> Option<Transaction> {
        debug!(session = %id, "session destroyed");

        session.transaction.filter(Transaction::is_pending).map(|tx| {
            info!(session = %id, tx_id = tx.id(), "IdP transaction abandoned");
            tx.finish(TransactionState::Abandoned)
        })
    }

    /// Start a transaction for the session, replacing any pending one.
    pub fn create(&self, id: SessionId, tx_id: &str, profile: Map<String, Value>) -> Transaction {
        let tx = Transaction::awaiting_profile(tx_id.to_string(), profile);

        let mut session = self.sessions.entry(id).or_insert_with(Session::new);
        if let Some(prior) = session.transaction.replace(tx.clone()) {
            debug!(session = %id, tx_id = prior.id(), "replacing pending IdP transaction");
        }
        session.last_seen = Instant::now();

        tx
    }

    /// The session's pending transaction, if any.
    pub fn get(&self, id: SessionId) -> Option<Transaction> {
        self.sessions
            .get(&id)
            .and_then(|session| session.transaction.clone())
            .filter(Transaction::is_pending)
    }

    pub fn complete(&self, id: SessionId) {
        if let Some(tx) = self.take(id) {
            let tx = tx.finish(TransactionState::Completed);
            info!(session = %id, tx_id = tx.id(), "IdP transaction completed");
        }
    }

    pub fn abandon(&self, id: SessionId) {
        if let Some(tx) = self.take(id) {
            let tx = tx.finish(TransactionState::Abandoned);
            info!(session = %id, tx_id = tx.id(), "IdP transaction abandoned");
        }
    }

    /// Drop sessions idle for longer than the TTL. Returns how many were removed.
    pub fn purge_expired(&self) -> usize {
        let candidates: Vec<SessionId> = self
            .sessions
            .iter()
            .filter(|entry| entry.last_seen.elapsed() >= self.ttl)
            .map(|entry| *entry.key())
            .collect();

        let purged = candidates
            .into_iter()
            .filter(|id| self.evict_if_idle(*id))
            .count();

        if purged > 0 {
            debug!(count = purged, "purged expired sessions");
        }
        purged
    }

    /// Remove the session only if it is still idle past the TTL at removal time.
    fn evict_if_idle(&self, id: SessionId) -> bool {
        match self
            .sessions
            .remove_if(&id, |_, session| session.last_seen.elapsed() >= self.ttl)
        {
            Some((id, session)) => {
                Self::retire(id, session);
                true
            }
            None => false,
        }
    }

    /// Periodically purge expired sessions for the lifetime of the process.
    pub fn spawn_sweeper(self: Arc<Self>, every: Duration) -> JoinHandle<()> {
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(every);
            loop {
                ticker.tick().await;
                self.purge_expired();
            }
        })
    }

    pub fn len(&self) -> usize {
        self.sessions.len()
    }

    fn take(&self, id: SessionId) -> Option<Transaction> {
        self.sessions
            .get_mut(&id)
            .and_then(|mut session| session.transaction.take())
            .filter(Transaction::is_pending)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn store() -> SessionStore {
        SessionStore::new(Duration::from_secs(600))
    }

    fn profile(email: &str) -> Map<String, Value> {
        json!({ "email": email }).as_object().cloned().unwrap()
    }

    #[test]
    fn create_then_get_is_awaiting_profile() {
        let store = store();
        let (sid, _) = store.open(None);

        store.create(sid, "tx1", profile("a@b.com"));
        let tx = store.get(sid).unwrap();

        assert_eq!(tx.id(), "tx1");
        assert_eq!(tx.state(), TransactionState::AwaitingProfile);
        assert_eq!(tx.profile()["email"], json!("a@b.com"));
    }

    #[test]
    fn complete_then_get_is_none() {
        let store = store();
        let (sid, _) = store.open(None);

        store.create(sid, "tx1", profile("a@b.com"));
        store.complete(sid);

        assert!(store.get(sid).is_none());
        assert!(store.contains(sid));
    }

    #[test]
    fn abandon_then_get_is_none() {
        let store = store();
        let (sid, _) = store.open(None);

        store.create(sid, "tx1", Map::new());
        store.abandon(sid);

        assert!(store.get(sid).is_none());
    }

    #[test]
    fn create_overwrites_prior_pending_transaction() {
        let store = store();
        let (sid, _) = store.open(None);

        store.create(sid, "tx1", Map::new());
        store.create(sid, "tx2", Map::new());

        assert_eq!(store.get(sid).unwrap().id(), "tx2");
    }

    #[test]
    fn transactions_are_not_visible_across_sessions() {
        let store = store();
        let (a, _) = store.open(None);
        let (b, _) = store.open(None);

        store.create(a, "tx-a", Map::new());

        assert!(store.get(b).is_none());
        store.complete(b);
        assert_eq!(store.get(a).unwrap().id(), "tx-a");
    }

    #[test]
    fn open_resumes_live_session_and_replaces_unknown_one() {
        let store = store();
        let (sid, created) = store.open(None);
        assert!(created);

        assert_eq!(store.open(Some(sid)), (sid, false));

        let stranger = SessionId::generate();
        let (fresh, created) = store.open(Some(stranger));
        assert!(created);
        assert_ne!(fresh, stranger);
    }

    #[test]
    fn destroy_abandons_pending_transaction() {
        let store = store();
        let (sid, _) = store.open(None);
        store.create(sid, "tx1", Map::new());

        let abandoned = store.destroy(sid).unwrap();

        assert_eq!(abandoned.state(), TransactionState::Abandoned);
        assert!(!store.contains(sid));
        assert!(store.get(sid).is_none());
    }

    #[test]
    fn expired_sessions_are_purged() {
        let store = SessionStore::new(Duration::ZERO);
        let (sid, _) = store.open(None);
        store.create(sid, "tx1", Map::new());

        assert_eq!(store.purge_expired(), 1);
        assert_eq!(store.len(), 0);
        assert!(store.get(sid).is_none());
    }

    #[test]
    fn session_refreshed_after_sweep_snapshot_survives() {
        let store = SessionStore::new(Duration::from_secs(60));
        let (idle, _) = store.open(None);
        let (refreshed, _) = store.open(None);
        for sid in [idle, refreshed] {
            store.sessions.get_mut(&sid).unwrap().last_seen =
                Instant::now().checked_sub(Duration::from_secs(120)).unwrap();
        }

        // activity lands between the idle scan and the removal
        store.create(refreshed, "tx1", Map::new());

        assert!(store.evict_if_idle(idle));
        assert!(!store.evict_if_idle(refreshed));
        assert!(store.get(refreshed).is_some());
        assert_eq!(store.purge_expired(), 0);
        assert_eq!(store.len(), 1);
    }

    #[test]
    fn expired_session_is_not_resumed() {
        let store = SessionStore::new(Duration::ZERO);
        let (sid, _) = store.open(None);

        let (next, created) = store.open(Some(sid));

        assert!(created);
        assert_ne!(next, sid);
        assert!(!store.contains(sid));
    }

    #[test]
    fn session_id_round_trips_through_cookie_value() {
        let sid = SessionId::generate();
        assert_eq!(sid.to_string().parse::<SessionId>().unwrap(), sid);
        assert!("not-a-uuid".parse::<SessionId>().is_err());
    }
}
