//! # Wikibase Context (wikibase-context)
//!
//! Localized knowledge-base lookups for chat bots, attached to every
//! incoming update.
//!
//! ## Features
//!
//! - Entity cache with TTL expiry and pluggable storage
//! - Bulk fetching: all misses of a lookup resolved in one call
//! - Concurrent lookups for the same entity share one pending fetch
//! - Resource keys: human-readable aliases for entity identifiers
//! - Locale progress: which languages are translated well enough to offer
//! - Periodic refresh keeping resource-key entities warm
//!
//! ## Usage
//!
//! The knowledge base is reached through an [`EntityFetcher`] supplied by
//! the application. The chat framework is reached through [`UpdateContext`].
//!
//! ```no_run
//! use std::collections::HashMap;
//! use std::sync::Arc;
//! use async_trait::async_trait;
//! use wikibase_context::{
//!     Entity, EntityFetcher, EntityId, FetchOptions, Result, Wikibase, WikibaseConfig,
//! };
//!
//! struct Upstream;
//!
//! #[async_trait]
//! impl EntityFetcher for Upstream {
//!     async fn fetch_entities(
//!         &self,
//!         ids: &[EntityId],
//!         options: &FetchOptions,
//!     ) -> Result<HashMap<EntityId, Entity>> {
//!         // Call the knowledge base API with `options.user_agent` here
//!         Ok(HashMap::new())
//!     }
//! }
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let wikibase = Arc::new(Wikibase::new(Arc::new(Upstream), WikibaseConfig::default())?);
//!     wikibase
//!         .add_resource_keys([("human", "Q5"), ("earth", "Q2")])
//!         .await?;
//!
//!     let _refresh = wikibase.start_refresh(|e| eprintln!("{}", e));
//!     let _cleanup = wikibase.start_cleanup();
//!
//!     let reader = wikibase.reader("earth", "de").await?;
//!     println!("{}", reader.label());
//!
//!     println!("{:?}", wikibase.available_locales(None).await?);
//!     Ok(())
//! }
//! ```

pub mod cache;
pub mod config;
pub mod context;
pub mod error;
pub mod fetch;
pub mod locale;
pub mod reader;
pub mod resource_keys;

// Re-export main types for convenience
pub use cache::{CacheEntry, CacheStats, Entity, EntityCache, EntityId, EntityStore, MemoryStore};
pub use config::{WikibaseConfig, WikibaseConfigBuilder};
pub use context::{Session, SharedSession, UpdateContext, Wikibase, WikibaseContext};
pub use error::{Result, WikibaseError};
pub use fetch::{EntityFetcher, FetchOptions, FnFetcher};
pub use locale::LocaleProgress;
pub use reader::EntityReader;
pub use resource_keys::{resource_keys_from_pairs, ResourceKeyRegistry};
