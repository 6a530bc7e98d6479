//! # Entity Cache
//!
//! Turns sets of requested identifiers into entities while keeping calls to
//! the knowledge base to a minimum.
//!
//! ## Features
//!
//! - **Bulk Fetching**: All misses of one lookup go out in a single fetcher call
//! - **Coalescing**: Concurrent lookups for the same identifier share one pending fetch
//! - **TTL-Based Expiration**: Entries older than the TTL are treated as absent
//! - **Pluggable Storage**: Any [`EntityStore`] backend, in-memory by default
//!
//! ## Example
//!
//! ```rust
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use std::time::Duration;
//! use async_trait::async_trait;
//! use wikibase_context::cache::{Entity, EntityCache, EntityId};
//! use wikibase_context::fetch::{EntityFetcher, FetchOptions};
//! use wikibase_context::{Result, WikibaseConfig};
//!
//! struct Offline;
//!
//! #[async_trait]
//! impl EntityFetcher for Offline {
//!     async fn fetch_entities(
//!         &self,
//!         ids: &[EntityId],
//!         _options: &FetchOptions,
//!     ) -> Result<HashMap<EntityId, Entity>> {
//!         Ok(ids.iter().map(|id| (id.clone(), Entity::item(id.clone()))).collect())
//!     }
//! }
//!
//! # async fn example() -> anyhow::Result<()> {
//! let config = WikibaseConfig::builder()
//!     .ttl(Duration::from_secs(3600))
//!     .build();
//!
//! let cache = EntityCache::new(Arc::new(Offline), config);
//!
//! let human = EntityId::new("Q5")?;
//! if let Some(entity) = cache.get(&human).await? {
//!     println!("Fetched: {}", entity.id);
//! }
//!
//! # Ok(())
//! # }
//! ```

pub mod engine;
pub mod entry;
pub mod inflight;
pub mod store;
pub mod types;

pub use engine::EntityCache;
pub use entry::CacheEntry;
pub use inflight::InFlightRegistry;
pub use store::{EntityStore, MemoryStore};
pub use types::{CacheStats, Entity, EntityId};
