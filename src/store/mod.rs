pub mod json_store;
pub mod memory;
pub mod schema;

use std::collections::{HashMap, HashSet};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::engine::question_type::QuestionType;
use crate::engine::subject::{Subject, SubjectId, SubjectType};
use crate::session::item::SessionItem;
use crate::session::report::ReportSink;
use crate::session::state::SessionType;

/// Scalars saved alongside the item rows.
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct SessionProperties {
    #[serde(default)]
    pub session_type: SessionType,
    #[serde(default)]
    pub onkun: bool,
    #[serde(default)]
    pub current_item_id: Option<SubjectId>,
    #[serde(default)]
    pub current_question_type: Option<QuestionType>,
}

/// Persistent session rows, keyed by subject id.
pub trait SessionStore {
    fn load_items(&self) -> Result<Vec<SessionItem>>;

    /// Drop every row and write `items` in their place.
    fn replace_items(&mut self, items: &[SessionItem]) -> Result<()>;

    /// Upsert one row.
    fn save_item(&mut self, item: &SessionItem) -> Result<()>;

    fn delete_items(&mut self) -> Result<()>;

    fn properties(&self) -> Result<SessionProperties>;

    fn save_properties(&mut self, properties: &SessionProperties) -> Result<()>;

    fn set_session_type(&mut self, session_type: SessionType, onkun: bool) -> Result<()> {
        let mut properties = self.properties()?;
        properties.session_type = session_type;
        properties.onkun = onkun;
        self.save_properties(&properties)
    }

    fn set_current(&mut self, item_id: Option<SubjectId>, kind: Option<QuestionType>) -> Result<()> {
        let mut properties = self.properties()?;
        properties.current_item_id = item_id;
        properties.current_question_type = kind;
        self.save_properties(&properties)
    }
}

/// Read access to the subject database and the user's account level.
pub trait SubjectProvider {
    fn all_subjects(&self) -> Result<Vec<Subject>>;

    fn user_level(&self) -> u32;

    fn max_level_granted(&self) -> u32;

    fn session_subjects(&self, ids: &[SubjectId]) -> Result<HashMap<SubjectId, Subject>> {
        let wanted: HashSet<SubjectId> = ids.iter().copied().collect();
        Ok(self
            .all_subjects()?
            .into_iter()
            .filter(|s| wanted.contains(&s.id))
            .map(|s| (s.id, s))
            .collect())
    }

    /// The kanji written with exactly these characters, used to spot a
    /// kanji reading typed for a single-character vocabulary word.
    fn matching_kanji(&self, characters: &str) -> Result<Option<Subject>> {
        if characters.is_empty() {
            return Ok(None);
        }
        Ok(self
            .all_subjects()?
            .into_iter()
            .find(|s| s.is_kanji() && s.characters == characters))
    }

    /// Unpassed current-level kanji plus their components. Empty once the
    /// user has reached the highest level the subscription grants.
    fn level_up_ids(&self) -> Result<HashSet<SubjectId>> {
        let user_level = self.user_level();
        if user_level >= self.max_level_granted() {
            return Ok(HashSet::new());
        }
        let subjects = self.all_subjects()?;
        let mut ids = HashSet::new();
        for subject in subjects
            .iter()
            .filter(|s| s.subject_type == SubjectType::Kanji && s.level == user_level && !s.is_passed())
        {
            ids.insert(subject.id);
            ids.extend(subject.component_ids.iter().copied());
        }
        Ok(ids)
    }
}

/// Everything a session talks to.
pub trait Backend: SessionStore + SubjectProvider + ReportSink {}

impl<T: SessionStore + SubjectProvider + ReportSink> Backend for T {}

#[cfg(test)]
mod tests {
    use super::memory::MemoryStore;
    use super::*;

    fn subject(id: SubjectId, t: SubjectType, level: u32) -> Subject {
        Subject::new(id, t, level)
    }

    #[test]
    fn test_level_up_ids_include_components() {
        let mut kanji = subject(10, SubjectType::Kanji, 3);
        kanji.component_ids = vec![1, 2];
        let mut passed = subject(11, SubjectType::Kanji, 3);
        passed.passed_at = Some(chrono::Utc::now());
        passed.component_ids = vec![5];
        let other_level = subject(12, SubjectType::Kanji, 2);
        let store = MemoryStore::new(vec![kanji, passed, other_level], 3, 60);

        let ids = store.level_up_ids().unwrap();
        assert_eq!(ids, HashSet::from([10, 1, 2]));
    }

    #[test]
    fn test_level_up_ids_empty_at_max_level() {
        let store = MemoryStore::new(vec![subject(10, SubjectType::Kanji, 3)], 3, 3);
        assert!(store.level_up_ids().unwrap().is_empty());
    }

    #[test]
    fn test_matching_kanji_by_characters() {
        let mut kanji = subject(10, SubjectType::Kanji, 1);
        kanji.characters = "人".into();
        let mut vocab = subject(20, SubjectType::Vocabulary, 1);
        vocab.characters = "人".into();
        let store = MemoryStore::new(vec![vocab, kanji], 1, 60);
        assert_eq!(store.matching_kanji("人").unwrap().map(|s| s.id), Some(10));
        assert!(store.matching_kanji("").unwrap().is_none());
    }

    #[test]
    fn test_property_setters() {
        let mut store = MemoryStore::new(Vec::new(), 1, 60);
        store.set_session_type(SessionType::Review, true).unwrap();
        store.set_current(Some(4), Some(QuestionType::KanjiMeaning)).unwrap();
        let props = store.properties().unwrap();
        assert_eq!(props.session_type, SessionType::Review);
        assert!(props.onkun);
        assert_eq!(props.current_item_id, Some(4));
        assert_eq!(props.current_question_type, Some(QuestionType::KanjiMeaning));
    }
}
