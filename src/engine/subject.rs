use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::question_type::QuestionType;
use super::srs_system::{SrsSystemId, Stage, StageId};

pub type SubjectId = u64;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SubjectType {
    Radical,
    Kanji,
    Vocabulary,
}

impl SubjectType {
    /// Sort position when ordering by type.
    pub fn order(self) -> u32 {
        match self {
            SubjectType::Radical => 10,
            SubjectType::Kanji => 20,
            SubjectType::Vocabulary => 30,
        }
    }

    pub fn question_types(self, onkun: bool) -> &'static [QuestionType] {
        match self {
            SubjectType::Radical => &[QuestionType::RadicalName],
            SubjectType::Kanji if onkun => &[
                QuestionType::KanjiMeaning,
                QuestionType::KanjiOnyomi,
                QuestionType::KanjiKunyomi,
            ],
            SubjectType::Kanji => &[QuestionType::KanjiMeaning, QuestionType::KanjiReading],
            SubjectType::Vocabulary => &[QuestionType::VocabMeaning, QuestionType::VocabReading],
        }
    }

    pub fn supports_slot(self, slot: usize, onkun: bool) -> bool {
        match (self, slot) {
            (_, 1) => true,
            (SubjectType::Kanji, 2) => !onkun,
            (SubjectType::Kanji, 3 | 4) => onkun,
            (SubjectType::Vocabulary, 2) => true,
            _ => false,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadingKind {
    Onyomi,
    Kunyomi,
    Nanori,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AuxiliaryKind {
    Whitelist,
    Blacklist,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum KanjiAcceptedReadingType {
    #[default]
    Neither,
    Onyomi,
    Kunyomi,
    Both,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Meaning {
    pub meaning: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default = "default_true")]
    pub accepted: bool,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AuxiliaryMeaning {
    pub meaning: String,
    pub kind: AuxiliaryKind,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Reading {
    pub reading: String,
    #[serde(default)]
    pub primary: bool,
    #[serde(default = "default_true")]
    pub accepted: bool,
    #[serde(default)]
    pub kind: Option<ReadingKind>,
}

fn default_true() -> bool {
    true
}

impl Reading {
    pub fn is_onyomi(&self) -> bool {
        self.kind == Some(ReadingKind::Onyomi)
    }

    pub fn is_kunyomi(&self) -> bool {
        self.kind == Some(ReadingKind::Kunyomi)
    }

    /// On'yomi may be typed in katakana; with `require_on_in_katakana` they must be.
    pub fn matches(&self, answer: &str, require_on_in_katakana: bool) -> bool {
        if self.is_onyomi() {
            let katakana = super::kana::to_katakana(&self.reading);
            if require_on_in_katakana {
                answer == katakana
            } else {
                answer == self.reading || answer == katakana
            }
        } else {
            answer == self.reading
        }
    }
}

/// A study item with its assignment state. Owned by the subject provider;
/// sessions only read it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Subject {
    pub id: SubjectId,
    #[serde(default)]
    pub assignment_id: u64,
    #[serde(rename = "type")]
    pub subject_type: SubjectType,
    pub level: u32,
    #[serde(default)]
    pub characters: String,
    #[serde(default)]
    pub meanings: Vec<Meaning>,
    #[serde(default)]
    pub auxiliary_meanings: Vec<AuxiliaryMeaning>,
    #[serde(default)]
    pub readings: Vec<Reading>,
    #[serde(default)]
    pub meaning_synonyms: Vec<String>,
    #[serde(default)]
    pub component_ids: Vec<SubjectId>,
    #[serde(default = "default_srs_system")]
    pub srs_system_id: SrsSystemId,
    #[serde(default)]
    pub srs_stage_id: StageId,
    #[serde(default)]
    pub unlocked_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub started_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub available_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub passed_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub burned_at: Option<DateTime<Utc>>,
    #[serde(default)]
    pub resurrected_at: Option<DateTime<Utc>>,
    /// Set while a local assignment change has not yet been confirmed by sync.
    #[serde(default)]
    pub assignment_patched: bool,
}

fn default_srs_system() -> SrsSystemId {
    super::srs_registry::DEFAULT_SYSTEM_ID
}

impl Subject {
    pub fn new(id: SubjectId, subject_type: SubjectType, level: u32) -> Self {
        Self {
            id,
            assignment_id: 0,
            subject_type,
            level,
            characters: String::new(),
            meanings: Vec::new(),
            auxiliary_meanings: Vec::new(),
            readings: Vec::new(),
            meaning_synonyms: Vec::new(),
            component_ids: Vec::new(),
            srs_system_id: default_srs_system(),
            srs_stage_id: 0,
            unlocked_at: None,
            started_at: None,
            available_at: None,
            passed_at: None,
            burned_at: None,
            resurrected_at: None,
            assignment_patched: false,
        }
    }

    pub fn is_radical(&self) -> bool {
        self.subject_type == SubjectType::Radical
    }

    pub fn is_kanji(&self) -> bool {
        self.subject_type == SubjectType::Kanji
    }

    pub fn is_vocabulary(&self) -> bool {
        self.subject_type == SubjectType::Vocabulary
    }

    pub fn is_passed(&self) -> bool {
        self.passed_at.is_some()
    }

    pub fn primary_meaning(&self) -> Option<&str> {
        self.meanings
            .iter()
            .find(|m| m.primary)
            .or_else(|| self.meanings.first())
            .map(|m| m.meaning.as_str())
    }

    pub fn has_accepted_meanings(&self) -> bool {
        self.meanings.iter().any(|m| m.accepted)
    }

    pub fn has_accepted_readings(&self) -> bool {
        self.readings.iter().any(|r| r.accepted)
    }

    pub fn has_onyomi(&self) -> bool {
        self.readings.iter().any(|r| r.is_onyomi())
    }

    pub fn has_kunyomi(&self) -> bool {
        self.readings.iter().any(|r| r.is_kunyomi())
    }

    pub fn has_accepted_onyomi(&self) -> bool {
        self.readings.iter().any(|r| r.accepted && r.is_onyomi())
    }

    pub fn has_accepted_kunyomi(&self) -> bool {
        self.readings.iter().any(|r| r.accepted && r.is_kunyomi())
    }

    pub fn kanji_accepted_reading_type(&self) -> KanjiAcceptedReadingType {
        if !self.is_kanji() {
            return KanjiAcceptedReadingType::Neither;
        }
        match (self.has_accepted_onyomi(), self.has_accepted_kunyomi()) {
            (true, true) => KanjiAcceptedReadingType::Both,
            (true, false) => KanjiAcceptedReadingType::Onyomi,
            (false, true) => KanjiAcceptedReadingType::Kunyomi,
            (false, false) => KanjiAcceptedReadingType::Neither,
        }
    }

    /// Whether question slot 1–4 has to be answered for this subject.
    pub fn needs_slot(&self, slot: usize, onkun: bool) -> bool {
        if !self.subject_type.supports_slot(slot, onkun) {
            return false;
        }
        match slot {
            1 => self.has_accepted_meanings(),
            2 => self.has_accepted_readings(),
            3 => self.has_onyomi(),
            4 => self.has_kunyomi(),
            _ => false,
        }
    }

    /// An available review is overdue once the time since it became available
    /// reaches `threshold` times the stage interval.
    pub fn is_overdue(&self, stage: &Stage, now: DateTime<Utc>, threshold: f64) -> bool {
        let Some(available_at) = self.available_at else {
            return false;
        };
        if stage.is_locked() {
            return false;
        }
        if stage.is_initial() {
            return true;
        }
        if stage.is_completed() || stage.interval_ms == 0 {
            return false;
        }
        let since = (now - available_at).num_milliseconds();
        if since <= 0 {
            return false;
        }
        since as f64 / stage.interval_ms as f64 >= threshold
    }

    pub fn is_eligible_for_lesson(&self) -> bool {
        self.unlocked_at.is_some()
            && self.started_at.is_none()
            && (self.resurrected_at.is_some() || self.burned_at.is_none())
    }

    pub fn is_eligible_for_review(&self, now: DateTime<Utc>) -> bool {
        self.available_at.is_some_and(|at| at <= now)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::srs_registry::SrsRegistry;
    use chrono::Duration;

    fn kanji() -> Subject {
        let mut s = Subject::new(1, SubjectType::Kanji, 3);
        s.meanings.push(Meaning { meaning: "Tree".into(), primary: true, accepted: true });
        s.readings.push(Reading {
            reading: "もく".into(),
            primary: true,
            accepted: true,
            kind: Some(ReadingKind::Onyomi),
        });
        s.readings.push(Reading {
            reading: "き".into(),
            primary: false,
            accepted: false,
            kind: Some(ReadingKind::Kunyomi),
        });
        s
    }

    #[test]
    fn test_slots_by_type() {
        let s = kanji();
        assert!(s.needs_slot(1, false));
        assert!(s.needs_slot(2, false));
        assert!(!s.needs_slot(3, false));
        assert!(s.needs_slot(3, true));
        assert!(s.needs_slot(4, true));
        assert!(!s.needs_slot(2, true));

        let radical = Subject::new(2, SubjectType::Radical, 1);
        assert!(!radical.needs_slot(1, false));
        assert!(!radical.needs_slot(2, false));
        assert_eq!(SubjectType::Vocabulary.question_types(true).len(), 2);
    }

    #[test]
    fn test_onyomi_matching() {
        let s = kanji();
        let on = &s.readings[0];
        assert!(on.matches("もく", false));
        assert!(on.matches("モク", false));
        assert!(!on.matches("もく", true));
        assert!(on.matches("モク", true));
        assert!(!s.readings[1].matches("キ", false));
        assert_eq!(s.kanji_accepted_reading_type(), KanjiAcceptedReadingType::Onyomi);
    }

    #[test]
    fn test_overdue() {
        let registry = SrsRegistry::default();
        let now = Utc::now();
        let mut s = kanji();
        let stage = registry.stage(1, 1);
        assert!(!s.is_overdue(stage, now, 0.2));
        // 4 hour interval, 20% is 48 minutes
        s.available_at = Some(now - Duration::minutes(50));
        assert!(s.is_overdue(stage, now, 0.2));
        s.available_at = Some(now - Duration::minutes(40));
        assert!(!s.is_overdue(stage, now, 0.2));
        assert!(s.is_overdue(registry.stage(1, 0), now, 0.2));
        assert!(!s.is_overdue(registry.stage(1, 9), now, 0.2));
    }

    #[test]
    fn test_eligibility() {
        let now = Utc::now();
        let mut s = kanji();
        assert!(!s.is_eligible_for_lesson());
        s.unlocked_at = Some(now);
        assert!(s.is_eligible_for_lesson());
        s.burned_at = Some(now);
        assert!(!s.is_eligible_for_lesson());
        s.resurrected_at = Some(now);
        assert!(s.is_eligible_for_lesson());

        assert!(!s.is_eligible_for_review(now));
        s.available_at = Some(now + Duration::hours(1));
        assert!(!s.is_eligible_for_review(now));
        s.available_at = Some(now - Duration::hours(1));
        assert!(s.is_eligible_for_review(now));
    }

    #[test]
    fn test_deserialize_minimal() {
        let json = r#"{"id":7,"type":"vocabulary","level":2,
            "meanings":[{"meaning":"one thing"}],"readings":[{"reading":"ひとつ"}]}"#;
        let s: Subject = serde_json::from_str(json).unwrap();
        assert!(s.is_vocabulary());
        assert!(s.meanings[0].accepted);
        assert_eq!(s.srs_system_id, 1);
        assert!(s.needs_slot(2, false));
    }
}
