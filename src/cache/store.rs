//! Store capability and the default in-process backend

use async_trait::async_trait;
use std::collections::HashMap;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::{debug, info};

use crate::cache::entry::CacheEntry;
use crate::cache::types::EntityId;
use crate::config::DEFAULT_CLEANUP_INTERVAL;
use crate::error::Result;

/// Key-value contract the entity cache persists through
///
/// Backends may or may not expire entries on their own; `ttl_support`
/// tells the cache which. The cache checks the insertion time of every
/// entry it reads either way, so a backend that never evicts only costs
/// memory, never freshness.
#[async_trait]
pub trait EntityStore: Send + Sync {
    /// Load an entry, `None` when absent
    async fn get(&self, id: &EntityId) -> Result<Option<CacheEntry>>;

    /// Store an entry; `ttl` is passed to backends that expire natively
    async fn set(&self, id: EntityId, entry: CacheEntry, ttl: Option<Duration>) -> Result<()>;

    /// Whether the backend expires entries on its own
    fn ttl_support(&self) -> bool {
        false
    }

    /// Drop expired entries, returning how many were removed
    ///
    /// Called by the cache's periodic cleanup task.
    async fn purge_expired(&self) -> Result<usize> {
        Ok(0)
    }
}

struct Entries {
    map: HashMap<EntityId, CacheEntry>,
    next_sweep: Instant,
}

impl Entries {
    fn sweep(&mut self) -> Vec<EntityId> {
        let expired: Vec<EntityId> = self
            .map
            .iter()
            .filter(|(_, entry)| entry.is_expired())
            .map(|(id, _)| id.clone())
            .collect();

        for id in &expired {
            self.map.remove(id);
        }
        expired
    }
}

/// In-process TTL-aware store
///
/// Expired entries are dropped when read, swept on writes at most once per
/// sweep interval, and removed by `cleanup_expired`.
pub struct MemoryStore {
    entries: RwLock<Entries>,
    sweep_interval: Duration,
}

impl Default for MemoryStore {
    fn default() -> Self {
        Self::with_sweep_interval(DEFAULT_CLEANUP_INTERVAL)
    }
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Store whose writes sweep expired entries at most once per `interval`
    pub fn with_sweep_interval(interval: Duration) -> Self {
        Self {
            entries: RwLock::new(Entries {
                map: HashMap::new(),
                next_sweep: Instant::now() + interval,
            }),
            sweep_interval: interval,
        }
    }

    /// Remove all expired entries, returning their identifiers
    pub async fn cleanup_expired(&self) -> Vec<EntityId> {
        let mut entries = self.entries.write().await;
        let expired = entries.sweep();
        entries.next_sweep = Instant::now() + self.sweep_interval;

        if !expired.is_empty() {
            debug!("Cleaned up {} expired entries", expired.len());
        }

        expired
    }

    /// Get number of entries in the store, expired ones included
    pub async fn len(&self) -> usize {
        self.entries.read().await.map.len()
    }

    /// Check if the store is empty
    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.map.is_empty()
    }

    /// Remove all entries
    pub async fn clear(&self) {
        let mut entries = self.entries.write().await;
        let count = entries.map.len();
        entries.map.clear();
        info!("Cleared {} entries from memory store", count);
    }
}

#[async_trait]
impl EntityStore for MemoryStore {
    async fn get(&self, id: &EntityId) -> Result<Option<CacheEntry>> {
        {
            let entries = self.entries.read().await;
            match entries.map.get(id) {
                Some(entry) if !entry.is_expired() => return Ok(Some(entry.clone())),
                Some(_) => {}
                None => return Ok(None),
            }
        }

        // Re-check under the write lock, a fresh entry may have landed meanwhile
        let mut entries = self.entries.write().await;
        if entries.map.get(id).is_some_and(|entry| entry.is_expired()) {
            debug!("Dropping expired entry: {}", id);
            entries.map.remove(id);
            return Ok(None);
        }
        Ok(entries.map.get(id).cloned())
    }

    async fn set(&self, id: EntityId, mut entry: CacheEntry, ttl: Option<Duration>) -> Result<()> {
        if let Some(ttl) = ttl {
            entry.ttl = ttl;
        }

        let mut entries = self.entries.write().await;
        let now = Instant::now();
        if now >= entries.next_sweep {
            let swept = entries.sweep();
            entries.next_sweep = now + self.sweep_interval;
            if !swept.is_empty() {
                debug!("Swept {} expired entries on write", swept.len());
            }
        }

        entries.map.insert(id, entry);
        Ok(())
    }

    fn ttl_support(&self) -> bool {
        true
    }

    async fn purge_expired(&self) -> Result<usize> {
        Ok(self.cleanup_expired().await.len())
    }
}
