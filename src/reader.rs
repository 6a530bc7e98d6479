//! Language-bound read access to one entity

use std::sync::Arc;

use crate::cache::types::{Entity, EntityId};
use crate::locale::base_language;

/// Reads an entity in a default language
///
/// Built for identifiers the knowledge base may not know (yet): without an
/// entity every lookup falls back to the identifier or nothing.
#[derive(Debug, Clone)]
pub struct EntityReader {
    id: EntityId,
    entity: Option<Arc<Entity>>,
    language_code: String,
}

impl EntityReader {
    pub fn new(id: EntityId, entity: Option<Arc<Entity>>, language_code: impl Into<String>) -> Self {
        Self {
            id,
            entity,
            language_code: language_code.into(),
        }
    }

    pub fn id(&self) -> &EntityId {
        &self.id
    }

    pub fn entity(&self) -> Option<&Entity> {
        self.entity.as_deref()
    }

    pub fn language_code(&self) -> &str {
        &self.language_code
    }

    /// Label in the reader's language, the identifier when there is none
    pub fn label(&self) -> String {
        self.label_in(&self.language_code)
    }

    /// Label in the given language, then its base language, then the identifier
    pub fn label_in(&self, language_code: &str) -> String {
        self.entity
            .as_deref()
            .and_then(|entity| {
                entity
                    .label(language_code)
                    .or_else(|| entity.label(base_language(language_code)))
            })
            .map(str::to_string)
            .unwrap_or_else(|| self.id.to_string())
    }

    /// Description in the reader's language
    pub fn description(&self) -> Option<&str> {
        let descriptions = self.entity.as_deref()?.descriptions.as_ref()?;
        descriptions
            .get(&self.language_code)
            .or_else(|| descriptions.get(base_language(&self.language_code)))
            .map(String::as_str)
    }

    /// Aliases in the reader's language
    pub fn aliases(&self) -> &[String] {
        self.entity
            .as_deref()
            .and_then(|entity| entity.aliases.as_ref())
            .and_then(|aliases| aliases.get(&self.language_code))
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::BTreeMap;

    fn earth() -> Arc<Entity> {
        let mut entity = Entity::item(EntityId::new("Q2").unwrap())
            .with_label("de", "Erde")
            .with_label("en", "earth")
            .with_description("en", "third planet from the Sun");
        entity.aliases = Some(BTreeMap::from([(
            "en".to_string(),
            vec!["Blue Planet".to_string(), "Terra".to_string()],
        )]));
        Arc::new(entity)
    }

    #[test]
    fn test_label_in_reader_language() {
        let reader = EntityReader::new(EntityId::new("Q2").unwrap(), Some(earth()), "de");
        assert_eq!(reader.label(), "Erde");
        assert_eq!(reader.label_in("en"), "earth");
        assert_eq!(reader.language_code(), "de");
    }

    #[test]
    fn test_label_falls_back_to_base_language_then_id() {
        let reader = EntityReader::new(EntityId::new("Q2").unwrap(), Some(earth()), "de-ch");
        assert_eq!(reader.label(), "Erde");
        assert_eq!(reader.label_in("am"), "Q2");
    }

    #[test]
    fn test_entity_without_labels() {
        let human = Arc::new(Entity::item(EntityId::new("Q5").unwrap()));
        let reader = EntityReader::new(EntityId::new("Q5").unwrap(), Some(human), "en");
        assert_eq!(reader.label(), "Q5");
        assert_eq!(reader.description(), None);
        assert!(reader.aliases().is_empty());
    }

    #[test]
    fn test_missing_entity() {
        let reader = EntityReader::new(EntityId::new("Q404").unwrap(), None, "en");
        assert_eq!(reader.label(), "Q404");
        assert!(reader.entity().is_none());
    }

    #[test]
    fn test_description_and_aliases() {
        let reader = EntityReader::new(EntityId::new("Q2").unwrap(), Some(earth()), "en");
        assert_eq!(reader.description(), Some("third planet from the Sun"));
        assert_eq!(reader.aliases(), ["Blue Planet", "Terra"]);
    }
}
