//! Entity cache with bulk-fetch coalescing and TTL expiry

use futures::future::{try_join_all, FutureExt};
use std::any::Any;
use std::collections::{BTreeSet, HashMap};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::cache::entry::CacheEntry;
use crate::cache::inflight::{FetchOutcome, FetchedBatch, InFlightRegistry, SharedFetch};
use crate::cache::store::{EntityStore, MemoryStore};
use crate::cache::types::{CacheStats, Entity, EntityId};
use crate::config::WikibaseConfig;
use crate::error::{Result, WikibaseError};
use crate::fetch::{EntityFetcher, FetchOptions};

/// Resolves identifiers to entities
///
/// This implementation provides:
/// - At most one pending bulk fetch per identifier (concurrent lookups join it)
/// - One fetcher call for all misses of a lookup
/// - TTL expiry checked on every read, whatever the store backend does
/// - No negative caching: failures and omitted identifiers are retried next time
///
/// Cloning is cheap and clones share state.
#[derive(Clone)]
pub struct EntityCache {
    inner: Arc<CacheInner>,
}

struct CacheInner {
    config: WikibaseConfig,
    store: Arc<dyn EntityStore>,
    fetcher: Arc<dyn EntityFetcher>,
    in_flight: InFlightRegistry,
    stats: RwLock<CacheStats>,
}

impl EntityCache {
    /// Create a cache backed by an in-process [`MemoryStore`]
    pub fn new(fetcher: Arc<dyn EntityFetcher>, config: WikibaseConfig) -> Self {
        let store = Arc::new(MemoryStore::with_sweep_interval(config.cleanup_interval));
        Self::with_store(fetcher, store, config)
    }

    /// Create a cache persisting through a custom store
    pub fn with_store(
        fetcher: Arc<dyn EntityFetcher>,
        store: Arc<dyn EntityStore>,
        config: WikibaseConfig,
    ) -> Self {
        info!("Initializing entity cache (ttl: {:?})", config.ttl);

        if !store.ttl_support() {
            warn!("Entity store does not expire entries itself; stale entries stay in it until overwritten");
        }

        Self {
            inner: Arc::new(CacheInner {
                config,
                store,
                fetcher,
                in_flight: InFlightRegistry::new(),
                stats: RwLock::new(CacheStats::default()),
            }),
        }
    }

    pub fn config(&self) -> &WikibaseConfig {
        &self.inner.config
    }

    /// Resolve a single identifier
    ///
    /// Returns `Ok(None)` when the fetcher does not know the identifier.
    pub async fn get(&self, id: &EntityId) -> Result<Option<Arc<Entity>>> {
        let mut resolved = self.get_many([id.clone()], false).await?;
        Ok(resolved.remove(id))
    }

    /// Resolve a set of identifiers
    ///
    /// Duplicates collapse. Identifiers the fetcher did not return are
    /// omitted from the result. With `force_refresh` every identifier is
    /// fetched again, unless a fetch for it is already in flight.
    pub async fn get_many(
        &self,
        ids: impl IntoIterator<Item = EntityId>,
        force_refresh: bool,
    ) -> Result<HashMap<EntityId, Arc<Entity>>> {
        let unique: BTreeSet<EntityId> = ids.into_iter().collect();
        let mut resolved = HashMap::with_capacity(unique.len());

        if unique.is_empty() {
            return Ok(resolved);
        }

        let mut needs_fetch = Vec::new();
        if force_refresh {
            needs_fetch.extend(unique.iter().cloned());
        } else {
            for id in &unique {
                match self.inner.load_fresh(id).await? {
                    Some(entity) => {
                        resolved.insert(id.clone(), entity);
                    }
                    None => needs_fetch.push(id.clone()),
                }
            }
        }

        let requested = needs_fetch.len();
        let (waits, recovered) = if needs_fetch.is_empty() {
            (Vec::new(), HashMap::new())
        } else {
            self.dispatch(needs_fetch, force_refresh).await?
        };

        {
            let mut stats = self.inner.stats.write().await;
            stats.hits += (resolved.len() + recovered.len()) as u64;
            stats.misses += (requested - recovered.len()) as u64;
        }
        resolved.extend(recovered);

        if waits.is_empty() {
            return Ok(resolved);
        }

        for batch in try_join_all(waits).await? {
            for id in &unique {
                if resolved.contains_key(id) {
                    continue;
                }
                if let Some(entity) = batch.get(id) {
                    resolved.insert(id.clone(), entity.clone());
                }
            }
        }

        Ok(resolved)
    }

    /// Make sure the identifiers are cached and fresh
    pub async fn preload(&self, ids: impl IntoIterator<Item = EntityId>) -> Result<()> {
        self.get_many(ids, false).await.map(|_| ())
    }

    /// Fetch the identifiers again regardless of their cache state
    pub async fn refresh(
        &self,
        ids: impl IntoIterator<Item = EntityId>,
    ) -> Result<HashMap<EntityId, Arc<Entity>>> {
        self.get_many(ids, true).await
    }

    /// Get cache statistics
    pub async fn stats(&self) -> CacheStats {
        self.inner.stats.read().await.clone()
    }

    /// Identifiers with a pending fetch
    pub async fn in_flight(&self) -> Vec<EntityId> {
        self.inner.in_flight.in_flight().await
    }

    /// Sweep expired entries out of the store every `cleanup_interval`
    ///
    /// The task stops once the last clone of the cache is dropped.
    pub fn start_auto_cleanup(&self) -> JoinHandle<()> {
        let interval = self.inner.config.cleanup_interval;
        let weak = Arc::downgrade(&self.inner);

        info!("Starting auto-cleanup task (interval: {:?})", interval);

        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(interval);
            // First tick completes immediately
            ticker.tick().await;

            loop {
                ticker.tick().await;

                let Some(inner) = weak.upgrade() else {
                    debug!("Entity cache dropped, stopping auto-cleanup");
                    break;
                };

                match inner.store.purge_expired().await {
                    Ok(0) => {}
                    Ok(count) => debug!("Auto-cleanup removed {} expired entries", count),
                    Err(e) => warn!("Auto-cleanup failed: {}", e),
                }
            }
        })
    }

    /// Join pending batches and start one new batch for everything else
    ///
    /// Also returns entities another batch stored after the caller's own
    /// store check; those need no fetch.
    async fn dispatch(
        &self,
        needs_fetch: Vec<EntityId>,
        force_refresh: bool,
    ) -> Result<(Vec<SharedFetch>, HashMap<EntityId, Arc<Entity>>)> {
        let (waits, joined, recovered) = {
            let mut guard = self.inner.in_flight.lock().await;
            let claim = guard.claim(needs_fetch);
            let mut waits = claim.joined;
            let joined = waits.len();

            // Batches write the store before releasing their markers, so
            // under the registry lock a finished batch is visible here.
            let mut recovered = HashMap::new();
            let mut unclaimed = Vec::with_capacity(claim.unclaimed.len());
            if force_refresh {
                unclaimed = claim.unclaimed;
            } else {
                for id in claim.unclaimed {
                    match self.inner.peek_fresh(&id).await? {
                        Some(entity) => {
                            recovered.insert(id, entity);
                        }
                        None => unclaimed.push(id),
                    }
                }
            }

            if !unclaimed.is_empty() {
                let batch = guard.next_batch();
                let ids = unclaimed;
                let inner = Arc::clone(&self.inner);
                let task_ids = ids.clone();

                // Spawned so the fetch completes even if every waiter goes away.
                // Its release waits for the registry lock, held here until the
                // markers are in place. A panicking fetcher still releases.
                let handle = tokio::spawn(async move {
                    let outcome = AssertUnwindSafe(inner.fetch_and_store(&task_ids))
                        .catch_unwind()
                        .await
                        .unwrap_or_else(|panic| {
                            Err(WikibaseError::Fetch(format!(
                                "fetcher panicked: {}",
                                panic_message(&*panic)
                            )))
                        });
                    inner.in_flight.release(batch, &task_ids).await;
                    outcome
                });

                // A task cancelled before its release leaves the markers to the waiters
                let inner = Arc::clone(&self.inner);
                let waiter_ids = ids.clone();
                waits.push(guard.mark(batch, &ids, async move {
                    match handle.await {
                        Ok(outcome) => outcome,
                        Err(e) => {
                            inner.in_flight.release(batch, &waiter_ids).await;
                            Err(WikibaseError::Fetch(format!("fetch task failed: {}", e)))
                        }
                    }
                }));
            }

            (waits, joined, recovered)
        };

        if !recovered.is_empty() {
            debug!("{} entities stored by a concurrent batch", recovered.len());
        }

        if joined > 0 {
            debug!("Joining {} in-flight batches", joined);
            self.inner.stats.write().await.coalesced += joined as u64;
        }

        Ok((waits, recovered))
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    payload
        .downcast_ref::<&str>()
        .copied()
        .or_else(|| payload.downcast_ref::<String>().map(String::as_str))
        .unwrap_or("unknown panic")
}

/// Store failures surface as [`WikibaseError::Store`]
fn store_error(e: WikibaseError) -> WikibaseError {
    match e {
        WikibaseError::Store(_) => e,
        other => WikibaseError::Store(other.to_string()),
    }
}

impl CacheInner {
    /// Read an entry and treat it as absent once its TTL has passed
    async fn load_fresh(&self, id: &EntityId) -> Result<Option<Arc<Entity>>> {
        match self.store.get(id).await.map_err(store_error)? {
            Some(entry) if entry.is_expired() => {
                debug!("Cache entry expired: {}", id);
                self.stats.write().await.expired += 1;
                Ok(None)
            }
            Some(entry) => {
                debug!("Cache hit: {}", id);
                Ok(Some(entry.entity))
            }
            None => {
                debug!("Cache miss: {}", id);
                Ok(None)
            }
        }
    }

    /// Fresh entity without touching the stats
    async fn peek_fresh(&self, id: &EntityId) -> Result<Option<Arc<Entity>>> {
        Ok(self
            .store
            .get(id)
            .await
            .map_err(store_error)?
            .filter(|entry| !entry.is_expired())
            .map(|entry| entry.entity))
    }

    /// One fetcher call for the batch; everything returned is written through
    async fn fetch_and_store(&self, ids: &[EntityId]) -> FetchOutcome {
        if self.config.log_queried_entity_ids {
            info!("Fetching {} entities: {:?}", ids.len(), ids);
        } else {
            debug!("Fetching {} entities", ids.len());
        }

        let options = FetchOptions {
            user_agent: self.config.user_agent.clone(),
        };

        self.stats.write().await.fetches += 1;

        let fetched = self
            .fetcher
            .fetch_entities(ids, &options)
            .await
            .map_err(|e| match e {
                WikibaseError::Fetch(_) => e,
                other => WikibaseError::Fetch(other.to_string()),
            })?;

        if fetched.len() < ids.len() {
            debug!(
                "Fetcher returned {} of {} requested entities",
                fetched.len(),
                ids.len()
            );
        }

        let mut batch = HashMap::with_capacity(fetched.len());
        for (id, entity) in fetched {
            let entity = Arc::new(entity);
            let ttl = self.config.ttl_with_jitter();
            let entry = CacheEntry::new(Arc::clone(&entity), ttl);
            let native_ttl = self.store.ttl_support().then_some(ttl);

            self.store
                .set(id.clone(), entry, native_ttl)
                .await
                .map_err(store_error)?;
            batch.insert(id, entity);
        }

        self.stats.write().await.fetched_entities += batch.len() as u64;

        let batch: FetchedBatch = Arc::new(batch);
        Ok(batch)
    }
}
