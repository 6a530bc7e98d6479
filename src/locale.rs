//! Locale progress: how much of the tracked entities is translated
//!
//! A language's progress is the fraction of tracked entities carrying a
//! label in it. Entities without any labels still count towards the total.

use std::collections::BTreeMap;

use crate::cache::types::Entity;

/// Language code -> fraction of entities labelled in it
pub type LocaleProgress = BTreeMap<String, f64>;

/// Compute the label coverage of every language used by any entity
pub fn all_locale_progress<'a, I>(entities: I) -> LocaleProgress
where
    I: IntoIterator<Item = &'a Entity>,
{
    let mut counts: BTreeMap<String, usize> = BTreeMap::new();
    let mut total = 0usize;

    for entity in entities {
        total += 1;
        for language in entity.label_languages() {
            *counts.entry(language.to_string()).or_default() += 1;
        }
    }

    counts
        .into_iter()
        .map(|(language, count)| (language, count as f64 / total as f64))
        .collect()
}

/// Primary language subtag (`de-ch` -> `de`)
pub fn base_language(code: &str) -> &str {
    code.split(['-', '_']).next().unwrap_or(code)
}

/// Progress of one language, 0 when no entity is labelled in it
pub fn locale_progress(progress: &LocaleProgress, code: &str, use_base: bool) -> f64 {
    let code = if use_base { base_language(code) } else { code };
    progress.get(code).copied().unwrap_or(0.0)
}

/// Languages whose progress strictly exceeds `threshold`, sorted
pub fn available_locales(progress: &LocaleProgress, threshold: f64) -> Vec<String> {
    // BTreeMap iteration is already lexicographic
    progress
        .iter()
        .filter(|(_, fraction)| **fraction > threshold)
        .map(|(language, _)| language.clone())
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cache::types::EntityId;

    fn fixtures() -> Vec<Entity> {
        vec![
            Entity::item(EntityId::new("Q5").unwrap()),
            Entity::item(EntityId::new("Q2").unwrap())
                .with_label("de", "Erde")
                .with_label("de-ch", "Erde")
                .with_label("en", "earth"),
            Entity::item(EntityId::new("Q146").unwrap())
                .with_label("de", "Hauskatze")
                .with_label("en", "house cat"),
        ]
    }

    #[test]
    fn test_all_locale_progress() {
        let progress = all_locale_progress(&fixtures());

        let expected: LocaleProgress = [
            ("de".to_string(), 2.0 / 3.0),
            ("de-ch".to_string(), 1.0 / 3.0),
            ("en".to_string(), 2.0 / 3.0),
        ]
        .into_iter()
        .collect();
        assert_eq!(progress, expected);
    }

    #[test]
    fn test_no_entities() {
        assert!(all_locale_progress(&Vec::<Entity>::new()).is_empty());
    }

    #[test]
    fn test_base_language() {
        assert_eq!(base_language("de-ch"), "de");
        assert_eq!(base_language("pt_BR"), "pt");
        assert_eq!(base_language("en"), "en");
        assert_eq!(base_language(""), "");
    }

    #[test]
    fn test_locale_progress_collapses_to_base() {
        let progress = all_locale_progress(&fixtures());

        assert_eq!(locale_progress(&progress, "de", true), 2.0 / 3.0);
        assert_eq!(locale_progress(&progress, "de-ch", true), 2.0 / 3.0);
        assert_eq!(locale_progress(&progress, "de-ch", false), 1.0 / 3.0);
        assert_eq!(locale_progress(&progress, "am", true), 0.0);
    }

    #[test]
    fn test_available_locales() {
        let progress = all_locale_progress(&fixtures());

        assert_eq!(available_locales(&progress, 0.5), vec!["de", "en"]);
        assert_eq!(available_locales(&progress, 0.1), vec!["de", "de-ch", "en"]);
        assert!(available_locales(&progress, 1.0).is_empty());
    }
}
