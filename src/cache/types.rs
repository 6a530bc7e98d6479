//! Core type definitions for the entity cache

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;

use crate::error::{Result, WikibaseError};

/// Items, properties, lexemes, media infos, and lexeme forms/senses
static ENTITY_ID_PATTERN: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"^(?:[QPLM][1-9][0-9]*|L[1-9][0-9]*-[FS][1-9][0-9]*)$")
        .expect("entity id pattern is valid")
});

/// Validated Wikibase entity identifier (e.g. `Q42`)
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct EntityId(String);

impl EntityId {
    /// Parse and validate an identifier
    pub fn new(id: impl Into<String>) -> Result<Self> {
        let id = id.into();
        if Self::is_valid(&id) {
            Ok(Self(id))
        } else {
            Err(WikibaseError::InvalidKey(id))
        }
    }

    /// Check whether a string is a well-formed identifier
    pub fn is_valid(id: &str) -> bool {
        ENTITY_ID_PATTERN.is_match(id)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl FromStr for EntityId {
    type Err = WikibaseError;

    fn from_str(s: &str) -> Result<Self> {
        Self::new(s)
    }
}

impl TryFrom<String> for EntityId {
    type Error = WikibaseError;

    fn try_from(value: String) -> Result<Self> {
        Self::new(value)
    }
}

impl From<EntityId> for String {
    fn from(id: EntityId) -> Self {
        id.0
    }
}

impl AsRef<str> for EntityId {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

/// Simplified Wikibase entity
///
/// Entities are never mutated once fetched; a refresh replaces the whole record.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Entity {
    /// Entity type (`item`, `property`, `lexeme`, ...)
    #[serde(rename = "type")]
    pub entity_type: String,

    pub id: EntityId,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub modified: Option<String>,

    /// Language code -> label
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub labels: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub descriptions: Option<BTreeMap<String, String>>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub aliases: Option<BTreeMap<String, Vec<String>>>,

    /// Claims are opaque to the cache
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub claims: Option<serde_json::Value>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sitelinks: Option<BTreeMap<String, String>>,
}

impl Entity {
    /// Create an item without any labels
    pub fn item(id: EntityId) -> Self {
        Self {
            entity_type: "item".to_string(),
            id,
            modified: None,
            labels: None,
            descriptions: None,
            aliases: None,
            claims: None,
            sitelinks: None,
        }
    }

    /// Add a label (builder style, used when assembling fixtures)
    pub fn with_label(mut self, language: impl Into<String>, label: impl Into<String>) -> Self {
        self.labels
            .get_or_insert_with(BTreeMap::new)
            .insert(language.into(), label.into());
        self
    }

    /// Add a description
    pub fn with_description(
        mut self,
        language: impl Into<String>,
        description: impl Into<String>,
    ) -> Self {
        self.descriptions
            .get_or_insert_with(BTreeMap::new)
            .insert(language.into(), description.into());
        self
    }

    /// Label in the given language, if any
    pub fn label(&self, language: &str) -> Option<&str> {
        self.labels
            .as_ref()
            .and_then(|labels| labels.get(language))
            .map(String::as_str)
    }

    /// Languages this entity carries a label in
    pub fn label_languages(&self) -> impl Iterator<Item = &str> {
        self.labels
            .iter()
            .flat_map(|labels| labels.keys())
            .map(String::as_str)
    }
}

/// Statistics for cache performance monitoring
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct CacheStats {
    /// Lookups answered from the store
    pub hits: u64,

    /// Lookups that needed a fetch
    pub misses: u64,

    /// Reads that found an entry past its TTL
    pub expired: u64,

    /// Calls made to the bulk fetcher
    pub fetches: u64,

    /// Entities returned by the bulk fetcher
    pub fetched_entities: u64,

    /// Lookups that joined a fetch already in flight
    pub coalesced: u64,
}

impl CacheStats {
    /// Calculate cache hit rate as a percentage
    pub fn hit_rate(&self) -> f64 {
        let total = self.hits + self.misses;
        if total == 0 {
            0.0
        } else {
            (self.hits as f64 / total as f64) * 100.0
        }
    }
}

impl fmt::Display for CacheStats {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "CacheStats {{ hits: {}, misses: {}, hit_rate: {:.2}%, expired: {}, fetches: {}, coalesced: {} }}",
            self.hits,
            self.misses,
            self.hit_rate(),
            self.expired,
            self.fetches,
            self.coalesced
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_entity_id_validation() {
        for valid in ["Q5", "Q42", "P31", "L7", "M100", "L7-F1", "L7-S2"] {
            assert!(EntityId::is_valid(valid), "{valid} should be valid");
        }

        for invalid in ["", "Q", "Q0", "Q05", "q5", "human", "Q5 ", "X5", "L7-X1", "Q5-F1"] {
            assert!(!EntityId::is_valid(invalid), "{invalid:?} should be invalid");
        }
    }

    #[test]
    fn test_entity_id_parse_error() {
        let err = EntityId::new("human").unwrap_err();
        assert_eq!(err, WikibaseError::InvalidKey("human".to_string()));

        let id: EntityId = "Q2".parse().unwrap();
        assert_eq!(id.as_str(), "Q2");
        assert_eq!(id.to_string(), "Q2");
    }

    #[test]
    fn test_entity_deserialization() {
        let json = r#"{
            "type": "item",
            "id": "Q2",
            "labels": {"de": "Erde", "en": "earth"},
            "claims": {"P31": ["Q3504248"]}
        }"#;

        let entity: Entity = serde_json::from_str(json).unwrap();
        assert_eq!(entity.id.as_str(), "Q2");
        assert_eq!(entity.label("de"), Some("Erde"));
        assert_eq!(entity.label("fr"), None);
        assert_eq!(entity.label_languages().collect::<Vec<_>>(), vec!["de", "en"]);
        assert!(entity.claims.is_some());
    }

    #[test]
    fn test_entity_rejects_invalid_id() {
        let json = r#"{"type": "item", "id": "not-an-id"}"#;
        assert!(serde_json::from_str::<Entity>(json).is_err());
    }

    #[test]
    fn test_entity_without_labels() {
        let entity = Entity::item(EntityId::new("Q5").unwrap());
        assert_eq!(entity.label_languages().count(), 0);
        assert_eq!(entity.label("en"), None);
    }

    #[test]
    fn test_cache_stats_hit_rate() {
        let stats = CacheStats {
            hits: 80,
            misses: 20,
            ..Default::default()
        };
        assert_eq!(stats.hit_rate(), 80.0);
        assert_eq!(CacheStats::default().hit_rate(), 0.0);

        let display = format!("{}", stats);
        assert!(display.contains("hits: 80"));
        assert!(display.contains("misses: 20"));
    }
}
