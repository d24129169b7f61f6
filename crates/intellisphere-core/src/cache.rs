//! Per-domain session metadata kept in local storage.

use crate::storage::{KeyValueStore, StorageError};
use chrono::Utc;
use intellisphere_protocol::{Domain, SessionId};
use log::{debug, warn};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::Arc;

/// Key under which the logged-in user's email is kept.
pub const USER_KEY: &str = "user";

/// Local metadata for one session.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionMeta {
    /// Creation time in epoch milliseconds.
    #[serde(rename = "createdAt")]
    pub created_at: i64,
}

impl SessionMeta {
    pub fn new(created_at: i64) -> Self {
        Self { created_at }
    }

    pub fn now() -> Self {
        Self::new(Utc::now().timestamp_millis())
    }
}

/// Session id -> metadata for a single domain.
pub type SessionMap = BTreeMap<SessionId, SessionMeta>;

/// Most recently created session; ties go to the larger id.
pub fn newest(sessions: &SessionMap) -> Option<&SessionId> {
    sessions
        .iter()
        .max_by(|(a_id, a), (b_id, b)| a.created_at.cmp(&b.created_at).then(a_id.cmp(b_id)))
        .map(|(id, _)| id)
}

/// Local mirror of the sessions a domain knows about, plus its pointer.
///
/// The mirror is not authoritative: an id listed here may already be gone on
/// the backend.
#[derive(Clone)]
pub struct LocalSessionCache {
    store: Arc<dyn KeyValueStore>,
    domain: Domain,
}

impl LocalSessionCache {
    pub fn new(store: Arc<dyn KeyValueStore>, domain: Domain) -> Self {
        Self { store, domain }
    }

    pub fn domain(&self) -> Domain {
        self.domain
    }

    /// Storage key of the session map.
    pub fn sessions_key(&self) -> String {
        format!("chatSessions_{}", self.domain)
    }

    /// Storage key of the current session pointer.
    pub fn pointer_key(&self) -> String {
        format!("currentSessionId_{}", self.domain)
    }

    /// Read the session map; a missing or unreadable entry is an empty map.
    pub fn load(&self) -> Result<SessionMap, StorageError> {
        let Some(raw) = self.store.get(&self.sessions_key())? else {
            return Ok(SessionMap::new());
        };
        match serde_json::from_str(&raw) {
            Ok(sessions) => Ok(sessions),
            Err(err) => {
                warn!(
                    "discarding unreadable session map (domain={}, error={err})",
                    self.domain
                );
                Ok(SessionMap::new())
            }
        }
    }

    fn save(&self, sessions: &SessionMap) -> Result<(), StorageError> {
        let serialized = serde_json::to_string(sessions)?;
        self.store.set(&self.sessions_key(), &serialized)
    }

    /// Record a session, replacing existing metadata.
    pub fn insert(&self, id: &SessionId, meta: SessionMeta) -> Result<(), StorageError> {
        let mut sessions = self.load()?;
        sessions.insert(id.clone(), meta);
        debug!(
            "cached session (domain={}, session_id={id}, created_at={})",
            self.domain, meta.created_at
        );
        self.save(&sessions)
    }

    /// Record a session only if it is not cached yet.
    ///
    /// Returns `true` when a new entry was written.
    pub fn insert_if_missing(&self, id: &SessionId) -> Result<bool, StorageError> {
        let mut sessions = self.load()?;
        if sessions.contains_key(id) {
            return Ok(false);
        }
        sessions.insert(id.clone(), SessionMeta::now());
        self.save(&sessions)?;
        Ok(true)
    }

    /// Forget a session. Returns whether it was cached.
    pub fn remove(&self, id: &SessionId) -> Result<bool, StorageError> {
        let mut sessions = self.load()?;
        if sessions.remove(id).is_none() {
            return Ok(false);
        }
        self.save(&sessions)?;
        Ok(true)
    }

    /// Persisted current session pointer, if any.
    pub fn pointer(&self) -> Result<Option<SessionId>, StorageError> {
        Ok(self
            .store
            .get(&self.pointer_key())?
            .filter(|raw| !raw.is_empty())
            .map(SessionId::new))
    }

    pub fn set_pointer(&self, id: &SessionId) -> Result<(), StorageError> {
        self.store.set(&self.pointer_key(), id.as_str())
    }
}
