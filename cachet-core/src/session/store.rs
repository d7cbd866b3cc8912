//! Session record and storage port

use super::error::StoreError;
use chrono::{DateTime, Duration, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Session data - flexible key-value store
pub type SessionData = HashMap<String, serde_json::Value>;

/// User session
///
/// The identifier is assigned once at creation and never changes. The cookie
/// only carries `id`; everything else lives in the cache and the store.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Session {
    /// Unique session ID
    pub id: String,

    /// Authenticated principal that owns the session
    pub username: String,

    /// Session creation time
    pub created_at: DateTime<Utc>,

    /// Absolute expiration time, never before `created_at`
    pub expires_at: DateTime<Utc>,

    /// Auxiliary data (flexible key-value store)
    #[serde(default)]
    pub data: SessionData,
}

impl Session {
    /// Create a session that starts now and lives for `lifetime`
    ///
    /// A negative lifetime is clamped to zero so that the session is born
    /// expired rather than breaking the timestamp ordering.
    pub fn new(id: impl Into<String>, username: impl Into<String>, lifetime: Duration) -> Self {
        let now = Utc::now();
        let lifetime = lifetime.max(Duration::zero());
        Self {
            id: id.into(),
            username: username.into(),
            created_at: now,
            expires_at: now.checked_add_signed(lifetime).unwrap_or(DateTime::<Utc>::MAX_UTC),
            data: HashMap::new(),
        }
    }

    /// Check if the session is expired
    pub fn is_expired(&self) -> bool {
        self.is_expired_at(Utc::now())
    }

    /// Check expiry against an explicit clock reading
    pub fn is_expired_at(&self, now: DateTime<Utc>) -> bool {
        now >= self.expires_at
    }

    /// Time left before expiry, zero once expired
    pub fn remaining(&self) -> Duration {
        (self.expires_at - Utc::now()).max(Duration::zero())
    }

    /// Structural check used when a session comes back from an untyped source
    pub fn is_well_formed(&self) -> bool {
        !self.id.is_empty() && self.expires_at >= self.created_at
    }

    /// Get a value from session data
    pub fn get<T: for<'de> Deserialize<'de>>(&self, key: &str) -> Option<T> {
        self.data.get(key).and_then(|v| serde_json::from_value(v.clone()).ok())
    }

    /// Set a value in session data
    pub fn set<T: Serialize>(&mut self, key: impl Into<String>, value: T) -> anyhow::Result<()> {
        let json_value = serde_json::to_value(value)?;
        self.data.insert(key.into(), json_value);
        Ok(())
    }

    /// Remove a value from session data
    pub fn remove(&mut self, key: &str) -> Option<serde_json::Value> {
        self.data.remove(key)
    }

    /// Check if a key exists
    pub fn contains(&self, key: &str) -> bool {
        self.data.contains_key(key)
    }
}

/// Durable session storage port
///
/// Implement this trait to plug in a backend (SQL, key-value, files...).
/// Implementations carry no caching, retry or locking policy of their own
/// beyond what they need to be safe under concurrent calls; the
/// [`SessionManager`](super::SessionManager) composes them with the cache.
#[async_trait::async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a new session. Fails with [`StoreError::DuplicateId`] if the id
    /// is already taken.
    async fn insert(&self, session: Session) -> Result<(), StoreError>;

    /// Fetch a session by ID. Fails with [`StoreError::NotFound`] if absent
    /// and [`StoreError::Corrupt`] if the stored record cannot be decoded.
    async fn get(&self, id: &str) -> Result<Session, StoreError>;

    /// Delete a session by ID. Deleting an unknown id succeeds.
    async fn delete(&self, id: &str) -> Result<(), StoreError>;

    /// Remove every expired session and return how many were removed
    ///
    /// Backends that expire records on their own (TTL keys, scheduled jobs)
    /// can keep the default, which removes nothing.
    async fn cleanup_expired(&self) -> Result<usize, StoreError> {
        Ok(0)
    }
}

// Implement SessionStore for Arc<S> to allow using Arc directly
#[async_trait::async_trait]
impl<S: SessionStore + ?Sized> SessionStore for std::sync::Arc<S> {
    async fn insert(&self, session: Session) -> Result<(), StoreError> {
        (**self).insert(session).await
    }

    async fn get(&self, id: &str) -> Result<Session, StoreError> {
        (**self).get(id).await
    }

    async fn delete(&self, id: &str) -> Result<(), StoreError> {
        (**self).delete(id).await
    }

    async fn cleanup_expired(&self) -> Result<usize, StoreError> {
        (**self).cleanup_expired().await
    }
}
