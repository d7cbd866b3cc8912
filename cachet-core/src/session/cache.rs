//! Concurrent in-process session cache
//!
//! Lock-free map (SCC) from session id to session. The cache is an
//! accelerator in front of a [`SessionStore`](super::SessionStore): a hit is
//! authoritative, a miss tells the caller to consult the store.
//!
//! Most entries are typed [`Session`] values. Entries handed over in encoded
//! form (snapshots, payloads from another process) are only decoded on load;
//! one that fails to decode into a well-formed session for its key is
//! evicted on the spot.

use super::store::Session;
use chrono::{DateTime, Utc};
use scc::HashMap as SccHashMap;

/// Outcome of a cache lookup
#[derive(Debug, Clone, PartialEq)]
pub enum CacheLookup {
    /// Entry present and verified
    Hit(Session),
    /// No entry for this id
    Miss,
    /// Entry present but not a valid session; it has been evicted
    Corrupt(String),
}

#[derive(Debug, Clone)]
enum CacheSlot {
    Typed(Session),
    Encoded(serde_json::Value),
}

impl CacheSlot {
    fn verify(self, id: &str) -> Result<Session, String> {
        let session = match self {
            CacheSlot::Typed(session) => session,
            CacheSlot::Encoded(value) => serde_json::from_value::<Session>(value)
                .map_err(|e| format!("entry does not decode as a session: {}", e))?,
        };

        if session.id != id {
            return Err(format!("entry belongs to session {:?}", session.id));
        }
        if !session.is_well_formed() {
            return Err("entry has inconsistent timestamps or empty id".to_string());
        }
        Ok(session)
    }
}

/// Concurrent session cache
///
/// Safe to share between tasks behind an `Arc`; no external locking needed.
pub struct SessionCache {
    entries: SccHashMap<String, CacheSlot>,
}

impl SessionCache {
    /// Create an empty cache
    pub fn new() -> Self {
        Self { entries: SccHashMap::new() }
    }

    /// Look up and verify the entry for `id`
    pub async fn load(&self, id: &str) -> CacheLookup {
        let slot = match self.entries.read_async(id, |_, slot| slot.clone()).await {
            Some(slot) => slot,
            None => return CacheLookup::Miss,
        };

        match slot.verify(id) {
            Ok(session) => CacheLookup::Hit(session),
            Err(reason) => {
                self.entries.remove_async(id).await;
                log::warn!("Evicted corrupt session cache entry {}: {}", id, reason);
                CacheLookup::Corrupt(reason)
            }
        }
    }

    /// Insert or overwrite the entry for `id`
    pub async fn store(&self, id: &str, session: Session) {
        self.put(id, CacheSlot::Typed(session)).await;
    }

    /// Insert or overwrite the entry for `id` with an encoded session
    ///
    /// The payload is checked lazily by [`load`](Self::load).
    pub async fn store_encoded(&self, id: &str, value: serde_json::Value) {
        self.put(id, CacheSlot::Encoded(value)).await;
    }

    async fn put(&self, id: &str, slot: CacheSlot) {
        match self.entries.entry_async(id.to_string()).await {
            scc::hash_map::Entry::Occupied(mut o) => {
                *o.get_mut() = slot;
            }
            scc::hash_map::Entry::Vacant(v) => {
                v.insert_entry(slot);
            }
        }
    }

    /// Remove the entry for `id`; no-op when absent
    pub async fn delete(&self, id: &str) {
        self.entries.remove_async(id).await;
    }

    /// Drop every typed entry that has expired at `now`
    ///
    /// Returns the number of entries removed.
    pub async fn purge_expired(&self, now: DateTime<Utc>) -> usize {
        let mut removed = 0;
        self.entries
            .retain_async(|_, slot| {
                let keep = match slot {
                    CacheSlot::Typed(session) => !session.is_expired_at(now),
                    CacheSlot::Encoded(_) => true,
                };
                if !keep {
                    removed += 1;
                }
                keep
            })
            .await;
        removed
    }

    /// Number of cached entries
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Drop all entries
    pub async fn clear(&self) {
        self.entries.clear_async().await;
    }
}

impl Default for SessionCache {
    fn default() -> Self {
        Self::new()
    }
}
