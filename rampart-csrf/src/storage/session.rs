//! Session-backed token store
//!
//! Tokens are kept in the request's session under the guard prefix, as an
//! ordered list of `{name, value}` records. Each operation takes the session
//! lock for its own read-modify-write, so removals and evictions stay atomic
//! even when two requests of one session run guards at the same time.
//!
//! Tokens of an expired session are discarded on the next `ensure`.

use super::{OrderedTokenStore, TokenStore};
use rampart_session::{Session, SessionHandle};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TokenRecord {
    name: String,
    value: String,
}

/// Token store living inside a [`SessionHandle`]
#[derive(Debug, Clone)]
pub struct SessionTokenStore {
    session: SessionHandle,
    key: String,
}

impl SessionTokenStore {
    /// Store tokens in `session` under `namespace`.
    pub fn new(session: SessionHandle, namespace: impl Into<String>) -> Self {
        Self {
            session,
            key: namespace.into(),
        }
    }

    /// Session key of the token region
    pub fn key(&self) -> &str {
        &self.key
    }

    pub fn session(&self) -> &SessionHandle {
        &self.session
    }

    fn read(&self, session: &Session) -> Vec<TokenRecord> {
        // A corrupt region reads as empty; `ensure` replaces it.
        session.get(&self.key).ok().flatten().unwrap_or_default()
    }

    fn write(&self, session: &mut Session, records: Vec<TokenRecord>) {
        if let Err(e) = session.set(&self.key, records) {
            error!(key = %self.key, error = %e, "Failed to write CSRF tokens to session");
        }
    }
}

impl TokenStore for SessionTokenStore {
    fn ensure(&mut self, namespace: &str) {
        if self.key != namespace {
            self.key = namespace.to_string();
        }

        let mut session = self.session.lock();
        match session.get::<Vec<TokenRecord>>(&self.key) {
            Ok(Some(records)) if session.is_expired() => {
                debug!(
                    session_id = %session.id,
                    key = %self.key,
                    discarded = records.len(),
                    "Discarding CSRF tokens of expired session"
                );
                self.write(&mut session, Vec::new());
            }
            Ok(Some(_)) => {}
            Ok(None) => {
                debug!(session_id = %session.id, key = %self.key, "Creating CSRF token region");
                self.write(&mut session, Vec::new());
            }
            Err(e) => {
                warn!(
                    session_id = %session.id,
                    key = %self.key,
                    error = %e,
                    "Replacing unreadable CSRF token region"
                );
                self.write(&mut session, Vec::new());
            }
        }
    }

    fn get(&self, name: &str) -> Option<String> {
        let session = self.session.lock();
        self.read(&session)
            .into_iter()
            .find(|r| r.name == name)
            .map(|r| r.value)
    }

    fn insert(&mut self, name: String, value: String) {
        let mut session = self.session.lock();
        let mut records = self.read(&session);

        match records.iter_mut().find(|r| r.name == name) {
            Some(record) => record.value = value,
            None => records.push(TokenRecord { name, value }),
        }

        self.write(&mut session, records);
    }

    fn remove(&mut self, name: &str) -> Option<String> {
        let mut session = self.session.lock();
        let mut records = self.read(&session);

        let index = records.iter().position(|r| r.name == name)?;
        let removed = records.remove(index);
        self.write(&mut session, records);

        Some(removed.value)
    }

    fn len(&self) -> usize {
        let session = self.session.lock();
        self.read(&session).len()
    }

    fn ordered(&self) -> Option<&dyn OrderedTokenStore> {
        Some(self)
    }

    fn evict_oldest(&mut self, limit: usize) -> Option<Vec<String>> {
        let mut session = self.session.lock();
        let mut records = self.read(&session);
        if records.len() <= limit {
            return Some(Vec::new());
        }

        let excess = records.len() - limit;
        let evicted: Vec<String> = records.drain(..excess).map(|r| r.name).collect();
        self.write(&mut session, records);

        Some(evicted)
    }
}

impl OrderedTokenStore for SessionTokenStore {
    fn entries(&self) -> Box<dyn Iterator<Item = (String, String)> + '_> {
        let records = {
            let session = self.session.lock();
            self.read(&session)
        };
        Box::new(records.into_iter().map(|r| (r.name, r.value)))
    }
}
