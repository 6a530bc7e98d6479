//! In-flight fetch registry
//!
//! Maps every identifier with a pending bulk fetch to a shared handle on
//! that fetch's outcome. Lookups that need an identifier already in the
//! registry await the existing handle instead of fetching again.

use futures::future::{BoxFuture, FutureExt, Shared};
use std::collections::HashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::sync::{Mutex, MutexGuard};
use tracing::debug;

use crate::cache::types::{Entity, EntityId};
use crate::error::WikibaseError;

/// Entities returned by one bulk fetch, keyed by identifier
pub type FetchedBatch = Arc<HashMap<EntityId, Arc<Entity>>>;

/// Outcome every waiter of a batch observes
pub type FetchOutcome = std::result::Result<FetchedBatch, WikibaseError>;

/// Cloneable handle on a pending batch
pub type SharedFetch = Shared<BoxFuture<'static, FetchOutcome>>;

#[derive(Clone)]
struct Pending {
    batch: u64,
    fetch: SharedFetch,
}

/// Per-cache registry of pending bulk fetches
#[derive(Default)]
pub struct InFlightRegistry {
    pending: Mutex<HashMap<EntityId, Pending>>,
    next_batch: AtomicU64,
}

/// Plan produced under the registry lock
pub struct Claim {
    /// Batches already covering some of the requested identifiers
    pub joined: Vec<SharedFetch>,

    /// Identifiers the caller must fetch itself
    pub unclaimed: Vec<EntityId>,
}

impl InFlightRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Lock the registry for a check-and-mark sequence
    ///
    /// Checking and marking happen under one guard so two lookups can never
    /// both decide to fetch the same identifier.
    pub async fn lock(&self) -> RegistryGuard<'_> {
        RegistryGuard {
            registry: self,
            pending: self.pending.lock().await,
        }
    }

    /// Drop the markers a finished batch still owns
    pub async fn release(&self, batch: u64, ids: &[EntityId]) {
        let mut pending = self.pending.lock().await;
        for id in ids {
            if pending.get(id).is_some_and(|p| p.batch == batch) {
                pending.remove(id);
            }
        }
        debug!("Released {} in-flight markers of batch {}", ids.len(), batch);
    }

    /// Identifiers with a pending fetch
    pub async fn in_flight(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.pending.lock().await.keys().cloned().collect();
        ids.sort();
        ids
    }
}

/// Registry held locked for one check-and-mark sequence
pub struct RegistryGuard<'a> {
    registry: &'a InFlightRegistry,
    pending: MutexGuard<'a, HashMap<EntityId, Pending>>,
}

impl RegistryGuard<'_> {
    /// Split identifiers into those joining a pending batch and those nobody fetches yet
    pub fn claim(&self, ids: Vec<EntityId>) -> Claim {
        let mut joined: Vec<Pending> = Vec::new();
        let mut unclaimed = Vec::new();

        for id in ids {
            match self.pending.get(&id) {
                Some(p) => {
                    if !joined.iter().any(|j| j.batch == p.batch) {
                        joined.push(p.clone());
                    }
                }
                None => unclaimed.push(id),
            }
        }

        Claim {
            joined: joined.into_iter().map(|p| p.fetch).collect(),
            unclaimed,
        }
    }

    /// Reserve a batch number for a new fetch
    pub fn next_batch(&self) -> u64 {
        self.registry.next_batch.fetch_add(1, Ordering::Relaxed)
    }

    /// Mark identifiers as covered by a pending batch
    pub fn mark<F>(&mut self, batch: u64, ids: &[EntityId], fetch: F) -> SharedFetch
    where
        F: std::future::Future<Output = FetchOutcome> + Send + 'static,
    {
        let fetch = fetch.boxed().shared();
        for id in ids {
            self.pending.insert(
                id.clone(),
                Pending {
                    batch,
                    fetch: fetch.clone(),
                },
            );
        }
        fetch
    }
}
