//! Session data and the shared handle guards attach to.

use crate::error::{SessionError, SessionResult};
use chrono::{DateTime, Utc};
use parking_lot::{Mutex, MutexGuard};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tracing::debug;

/// Per-user state carried between requests.
///
/// Values are stored as JSON so each component can keep its own typed
/// region under a key of its choosing.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    /// Issued by the host's session layer
    pub id: String,
    pub data: HashMap<String, serde_json::Value>,
    pub created_at: DateTime<Utc>,
    pub last_accessed_at: DateTime<Utc>,
    /// Past this instant the session's state must not be trusted
    pub expires_at: DateTime<Utc>,
}

impl Session {
    pub fn new(id: impl Into<String>, ttl: Duration) -> Self {
        let now = Utc::now();
        Self {
            id: id.into(),
            data: HashMap::new(),
            created_at: now,
            last_accessed_at: now,
            expires_at: now + chrono::Duration::from_std(ttl).unwrap_or_default(),
        }
    }

    pub fn is_expired(&self) -> bool {
        Utc::now() > self.expires_at
    }

    /// Typed read of one region.
    ///
    /// `Ok(None)` if the key is absent; an error if the stored value does not
    /// have the requested shape.
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> SessionResult<Option<T>> {
        self.data
            .get(key)
            .map(|v| {
                serde_json::from_value(v.clone())
                    .map_err(|e| SessionError::Deserialization(format!("{}: {}", key, e)))
            })
            .transpose()
    }

    /// Replace one region with `value`.
    pub fn set<T: Serialize>(&mut self, key: &str, value: T) -> SessionResult<()> {
        let json_value =
            serde_json::to_value(value).map_err(|e| SessionError::Serialization(e.to_string()))?;
        self.data.insert(key.to_string(), json_value);
        Ok(())
    }

    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
}

/// Cloneable handle to one session shared by every component of a request.
///
/// Concurrent requests of the same user should be given clones of the same
/// handle; [`SessionHandle::lock`] serialises their read-modify-write passes.
#[derive(Debug, Clone)]
pub struct SessionHandle {
    inner: Arc<Mutex<Session>>,
}

impl SessionHandle {
    pub fn new(session: Session) -> Self {
        Self {
            inner: Arc::new(Mutex::new(session)),
        }
    }

    /// Exclusive access to the session until the guard is dropped.
    pub fn lock(&self) -> MutexGuard<'_, Session> {
        self.inner.lock()
    }

    /// Session identifier.
    pub fn id(&self) -> String {
        self.inner.lock().id.clone()
    }

    /// Drop all session data, as a session layer does after login or logout.
    pub fn regenerate(&self) {
        let mut session = self.inner.lock();
        debug!(session_id = %session.id, "Regenerating session data");
        session.data.clear();
        session.last_accessed_at = Utc::now();
    }

    /// Whether two handles refer to the same session.
    pub fn ptr_eq(&self, other: &SessionHandle) -> bool {
        Arc::ptr_eq(&self.inner, &other.inner)
    }
}

impl From<Session> for SessionHandle {
    fn from(session: Session) -> Self {
        Self::new(session)
    }
}
