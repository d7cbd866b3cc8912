//! In-memory session storage
//!
//! This implementation uses a thread-safe HashMap with RwLock.
//! Suitable for development, tests and single-server deployments where
//! losing sessions on restart is acceptable.

use super::error::StoreError;
use super::store::{Session, SessionStore};
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

/// In-memory session store
///
/// Sessions are stored in memory and will be lost on server restart.
///
/// # Example
///
/// ```
/// use cachet_core::session::MemorySessionStore;
///
/// let store = MemorySessionStore::new();
/// ```
#[derive(Clone, Default)]
pub struct MemorySessionStore {
    sessions: Arc<RwLock<HashMap<String, Session>>>,
}

impl MemorySessionStore {
    /// Create a new in-memory session store
    pub fn new() -> Self {
        Self::default()
    }

    /// Get the number of sessions currently stored
    pub fn count(&self) -> Result<usize, StoreError> {
        Ok(self.read()?.len())
    }

    /// Check if a session is stored
    pub fn contains(&self, id: &str) -> Result<bool, StoreError> {
        Ok(self.read()?.contains_key(id))
    }

    fn read(&self) -> Result<RwLockReadGuard<'_, HashMap<String, Session>>, StoreError> {
        self.sessions.read().map_err(|_| StoreError::backend("session store lock poisoned"))
    }

    fn write(&self) -> Result<RwLockWriteGuard<'_, HashMap<String, Session>>, StoreError> {
        self.sessions.write().map_err(|_| StoreError::backend("session store lock poisoned"))
    }
}

#[async_trait::async_trait]
impl SessionStore for MemorySessionStore {
    async fn insert(&self, session: Session) -> Result<(), StoreError> {
        let mut sessions = self.write()?;
        if sessions.contains_key(&session.id) {
            return Err(StoreError::DuplicateId(session.id));
        }
        sessions.insert(session.id.clone(), session);
        Ok(())
    }

    async fn get(&self, id: &str) -> Result<Session, StoreError> {
        self.read()?.get(id).cloned().ok_or_else(|| StoreError::NotFound(id.to_string()))
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        self.write()?.remove(id);
        Ok(())
    }

    async fn cleanup_expired(&self) -> Result<usize, StoreError> {
        let now = Utc::now();
        let mut sessions = self.write()?;
        let initial_count = sessions.len();

        sessions.retain(|_, session| !session.is_expired_at(now));

        Ok(initial_count - sessions.len())
    }
}
