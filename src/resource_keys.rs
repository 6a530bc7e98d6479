//! Resource keys: human-readable aliases for entity identifiers
//!
//! Bots refer to entities by names like `human` or `menu.settings` instead
//! of raw identifiers. Keys are registered once at startup and never removed.

use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use tracing::debug;

use crate::cache::types::EntityId;
use crate::error::{Result, WikibaseError};

/// Registry of resource key -> entity identifier
#[derive(Debug, Default)]
pub struct ResourceKeyRegistry {
    keys: RwLock<BTreeMap<String, EntityId>>,
}

impl ResourceKeyRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register key/identifier pairs
    ///
    /// Re-registering a key with the same identifier is a no-op; with a
    /// different identifier it fails with [`WikibaseError::Conflict`]. The
    /// whole mapping is validated before anything is inserted.
    pub async fn add_resource_keys<I, K, V>(&self, mapping: I) -> Result<()>
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: AsRef<str>,
    {
        let mut parsed: Vec<(String, EntityId)> = Vec::new();
        for (key, id) in mapping {
            parsed.push((key.into(), EntityId::new(id.as_ref())?));
        }

        let mut keys = self.keys.write().await;

        let mut staged: HashMap<&str, &EntityId> = HashMap::new();
        for (key, id) in &parsed {
            let existing = keys.get(key).or_else(|| staged.get(key.as_str()).copied());
            if let Some(existing) = existing {
                if existing != id {
                    return Err(WikibaseError::Conflict {
                        key: key.clone(),
                        existing: existing.to_string(),
                        requested: id.to_string(),
                    });
                }
            }
            staged.insert(key.as_str(), id);
        }

        let count = parsed.len();
        for (key, id) in parsed {
            keys.entry(key).or_insert(id);
        }

        debug!("Registered {} resource keys ({} total)", count, keys.len());
        Ok(())
    }

    /// Translate a resource key or raw identifier to an identifier
    pub async fn entity_id_from_key(&self, key_or_id: &str) -> Result<EntityId> {
        if let Some(id) = self.keys.read().await.get(key_or_id) {
            return Ok(id.clone());
        }

        EntityId::new(key_or_id).map_err(|_| WikibaseError::InvalidKey(key_or_id.to_string()))
    }

    /// All registered identifiers, deduplicated and sorted
    pub async fn entity_ids(&self) -> Vec<EntityId> {
        let mut ids: Vec<EntityId> = self.keys.read().await.values().cloned().collect();
        ids.sort();
        ids.dedup();
        ids
    }

    /// All registered keys, sorted
    pub async fn keys(&self) -> Vec<String> {
        self.keys.read().await.keys().cloned().collect()
    }

    pub async fn len(&self) -> usize {
        self.keys.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.keys.read().await.is_empty()
    }
}

/// Build a key map from key/value pairs; later pairs win
pub fn resource_keys_from_pairs<I, K, V>(entries: I) -> BTreeMap<String, String>
where
    I: IntoIterator<Item = (K, V)>,
    K: Into<String>,
    V: Into<String>,
{
    entries
        .into_iter()
        .map(|(key, value)| (key.into(), value.into()))
        .collect()
}
