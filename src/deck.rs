use anyhow::{Context, Result, bail};
use rust_embed::Embed;

use crate::store::schema::DeckData;

#[derive(Embed)]
#[folder = "assets/decks/"]
struct DeckAssets;

pub const DEFAULT_DECK: &str = "demo";

/// Parse one of the decks bundled with the binary.
pub fn bundled(name: &str) -> Result<DeckData> {
    let filename = format!("{name}.json");
    let Some(file) = DeckAssets::get(&filename) else {
        bail!(
            "no bundled deck named {name:?} (available: {})",
            available().join(", ")
        );
    };
    let content = std::str::from_utf8(file.data.as_ref())
        .with_context(|| format!("bundled deck {name} is not UTF-8"))?;
    let deck: DeckData =
        serde_json::from_str(content).with_context(|| format!("parsing bundled deck {name}"))?;
    Ok(deck)
}

/// Names of the bundled decks, sorted.
pub fn available() -> Vec<String> {
    let mut names: Vec<String> = DeckAssets::iter()
        .filter_map(|f| f.strip_suffix(".json").map(|n| n.to_string()))
        .collect();
    names.sort();
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::srs_registry::SrsRegistry;
    use crate::session::state::SessionType;
    use chrono::Utc;

    #[test]
    fn test_demo_deck_parses() {
        let deck = bundled(DEFAULT_DECK).unwrap();
        assert!(!deck.needs_reset());
        assert!(deck.subjects.iter().any(|s| s.is_radical()));
        assert!(deck.subjects.iter().any(|s| s.is_kanji()));
        assert!(deck.subjects.iter().any(|s| s.is_vocabulary()));
        assert!(available().contains(&DEFAULT_DECK.to_string()));
    }

    #[test]
    fn test_demo_deck_has_lessons_and_reviews() {
        let deck = bundled(DEFAULT_DECK).unwrap();
        let now = Utc::now();
        let lessons = deck
            .subjects
            .iter()
            .filter(|s| SessionType::Lesson.is_eligible(s, now))
            .count();
        let reviews = deck
            .subjects
            .iter()
            .filter(|s| SessionType::Review.is_eligible(s, now))
            .count();
        assert!(lessons > 0);
        assert!(reviews > 0);

        let srs = SrsRegistry::with_definitions(&deck.srs_systems);
        for subject in &deck.subjects {
            assert_eq!(srs.system(subject.srs_system_id).id, subject.srs_system_id);
        }
    }

    #[test]
    fn test_unknown_deck_names_the_available_ones() {
        let err = bundled("nonexistent").unwrap_err().to_string();
        assert!(err.contains("nonexistent"));
        assert!(err.contains(DEFAULT_DECK));
    }

    #[test]
    fn test_every_listed_deck_loads() {
        let names = available();
        assert!(!names.is_empty());
        for name in &names {
            assert!(bundled(name).is_ok(), "bundled deck {name} fails to parse");
        }
    }
}
