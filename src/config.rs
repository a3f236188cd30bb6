use std::fs;
use std::path::{Path, PathBuf};

use anyhow::Result;
use serde::{Deserialize, Serialize};

use crate::engine::ordering::{LessonOrder, ReviewOrder, SessionPriority, SortKey};
use crate::engine::selection::SelectionQuotas;
use crate::engine::verdict::CloseEnoughAction;
use crate::session::state::SessionType;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Config {
    /// Ask on'yomi and kun'yomi as separate kanji questions.
    #[serde(default)]
    pub onkun: bool,
    #[serde(default)]
    pub delay_result_upload: bool,
    #[serde(default)]
    pub close_enough_action: CloseEnoughAction,
    #[serde(default)]
    pub require_onyomi_in_katakana: bool,
    #[serde(default = "default_overdue_threshold")]
    pub overdue_threshold: f64,
    #[serde(default)]
    pub lesson: LessonConfig,
    #[serde(default)]
    pub review: ReviewConfig,
    #[serde(default = "default_self_study")]
    pub self_study: ReviewConfig,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct LessonConfig {
    #[serde(default)]
    pub order: LessonOrder,
    #[serde(default)]
    pub reversed: bool,
    #[serde(default)]
    pub priority: SessionPriority,
    #[serde(default)]
    pub back_to_back: bool,
    #[serde(default)]
    pub reading_first: bool,
    #[serde(default)]
    pub meaning_first: bool,
    #[serde(default = "default_lesson_max_size")]
    pub max_size: usize,
    #[serde(default)]
    pub shuffle_after_selection: bool,
    #[serde(default)]
    pub selection: SelectionQuotas,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReviewConfig {
    #[serde(default)]
    pub order: ReviewOrder,
    #[serde(default)]
    pub reversed: bool,
    #[serde(default)]
    pub overdue_first: bool,
    #[serde(default)]
    pub priority: SessionPriority,
    #[serde(default)]
    pub back_to_back: bool,
    #[serde(default)]
    pub reading_first: bool,
    #[serde(default)]
    pub meaning_first: bool,
    #[serde(default = "default_review_max_size")]
    pub max_size: usize,
    #[serde(default)]
    pub shuffle_after_selection: bool,
    #[serde(default)]
    pub selection: SelectionQuotas,
}

fn default_overdue_threshold() -> f64 {
    0.20
}
fn default_lesson_max_size() -> usize {
    5
}
fn default_review_max_size() -> usize {
    100
}
fn default_self_study() -> ReviewConfig {
    ReviewConfig::default()
}

impl Default for LessonConfig {
    fn default() -> Self {
        Self {
            order: LessonOrder::default(),
            reversed: false,
            priority: SessionPriority::default(),
            back_to_back: false,
            reading_first: false,
            meaning_first: false,
            max_size: default_lesson_max_size(),
            shuffle_after_selection: false,
            selection: SelectionQuotas::default(),
        }
    }
}

impl Default for ReviewConfig {
    fn default() -> Self {
        Self {
            order: ReviewOrder::default(),
            reversed: false,
            overdue_first: false,
            priority: SessionPriority::default(),
            back_to_back: false,
            reading_first: false,
            meaning_first: false,
            max_size: default_review_max_size(),
            shuffle_after_selection: false,
            selection: SelectionQuotas::default(),
        }
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            onkun: false,
            delay_result_upload: false,
            close_enough_action: CloseEnoughAction::default(),
            require_onyomi_in_katakana: false,
            overdue_threshold: default_overdue_threshold(),
            lesson: LessonConfig::default(),
            review: ReviewConfig::default(),
            self_study: default_self_study(),
        }
    }
}

/// The settings one session type runs with, flattened out of [`Config`].
#[derive(Clone, Debug, PartialEq)]
pub struct SessionSettings {
    pub base_keys: &'static [SortKey],
    pub reversed: bool,
    pub overdue_first: bool,
    pub priority: SessionPriority,
    pub back_to_back: bool,
    pub reading_first: bool,
    pub meaning_first: bool,
    pub max_size: usize,
    /// Shuffle candidates before sorting.
    pub shuffle: bool,
    pub shuffle_after_selection: bool,
    pub selection: SelectionQuotas,
}

impl SessionSettings {
    fn from_review(review: &ReviewConfig) -> Self {
        Self {
            base_keys: review.order.keys(),
            reversed: review.reversed,
            overdue_first: review.overdue_first,
            priority: review.priority,
            back_to_back: review.back_to_back,
            reading_first: review.reading_first,
            meaning_first: review.meaning_first,
            max_size: review.max_size,
            shuffle: true,
            shuffle_after_selection: review.shuffle_after_selection,
            selection: review.selection,
        }
    }
}

impl Config {
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if path.exists() {
            let content = fs::read_to_string(path)?;
            let mut config: Config = toml::from_str(&content)?;
            config.validate();
            Ok(config)
        } else {
            Ok(Config::default())
        }
    }

    fn config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kanjiq")
            .join("config.toml")
    }

    /// Clamp values a hand-edited file may have put out of range.
    pub fn validate(&mut self) {
        if !self.overdue_threshold.is_finite() || self.overdue_threshold < 0.0 {
            self.overdue_threshold = default_overdue_threshold();
        }
        self.lesson.max_size = self.lesson.max_size.max(1);
        self.review.max_size = self.review.max_size.max(1);
        self.self_study.max_size = self.self_study.max_size.max(1);
    }

    pub fn session_settings(&self, session_type: SessionType) -> SessionSettings {
        match session_type {
            SessionType::Lesson => SessionSettings {
                base_keys: self.lesson.order.keys(),
                reversed: self.lesson.reversed,
                overdue_first: false,
                priority: self.lesson.priority,
                back_to_back: self.lesson.back_to_back,
                reading_first: self.lesson.reading_first,
                meaning_first: self.lesson.meaning_first,
                max_size: self.lesson.max_size,
                shuffle: self.lesson.order.is_shuffle(),
                shuffle_after_selection: self.lesson.shuffle_after_selection,
                selection: self.lesson.selection,
            },
            SessionType::Review | SessionType::None => SessionSettings::from_review(&self.review),
            SessionType::SelfStudy => SessionSettings::from_review(&self.self_study),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_serde_defaults_from_empty() {
        let config: Config = toml::from_str("").unwrap();
        assert!(!config.onkun);
        assert!(!config.delay_result_upload);
        assert_eq!(config.close_enough_action, CloseEnoughAction::SilentlyAccept);
        assert!((config.overdue_threshold - 0.20).abs() < f64::EPSILON);
        assert_eq!(config.lesson.max_size, 5);
        assert_eq!(config.review.max_size, 100);
        assert_eq!(config.self_study.max_size, 100);
        assert_eq!(config.lesson.order, LessonOrder::LevelThenType);
        assert_eq!(config.review.order, ReviewOrder::Shuffle);
    }

    #[test]
    fn test_config_partial_tables() {
        let toml_str = r#"
onkun = true
delay_result_upload = true

[lesson]
order = "type_then_level"
max_size = 10

[lesson.selection]
current_level_min = 2
radical_min = 3

[review]
order = "srs_then_level"
overdue_first = true
priority = "level_up_first"
reading_first = true
"#;
        let config: Config = toml::from_str(toml_str).unwrap();
        assert!(config.onkun);
        assert!(config.delay_result_upload);
        assert_eq!(config.lesson.order, LessonOrder::TypeThenLevel);
        assert_eq!(config.lesson.max_size, 10);
        assert_eq!(config.lesson.selection.current_level_min, Some(2));
        assert_eq!(config.lesson.selection.radical_min, Some(3));
        assert_eq!(config.review.order, ReviewOrder::SrsThenLevel);
        assert!(config.review.overdue_first);
        assert_eq!(config.review.priority, SessionPriority::LevelUpFirst);
        assert!(config.review.reading_first);
        // untouched table keeps its defaults
        assert_eq!(config.self_study.order, ReviewOrder::Shuffle);
    }

    #[test]
    fn test_config_serde_roundtrip() {
        let mut config = Config::default();
        config.review.order = ReviewOrder::LevelThenTypeThenSrs;
        config.lesson.selection.vocabulary_max = Some(1);
        let serialized = toml::to_string_pretty(&config).unwrap();
        let deserialized: Config = toml::from_str(&serialized).unwrap();
        assert_eq!(deserialized.review.order, ReviewOrder::LevelThenTypeThenSrs);
        assert_eq!(deserialized.lesson.selection.vocabulary_max, Some(1));
        assert_eq!(deserialized.lesson.max_size, config.lesson.max_size);
    }

    #[test]
    fn test_validate_clamps_values() {
        let mut config = Config::default();
        config.overdue_threshold = -1.0;
        config.lesson.max_size = 0;
        config.self_study.max_size = 0;
        config.validate();
        assert!((config.overdue_threshold - 0.20).abs() < f64::EPSILON);
        assert_eq!(config.lesson.max_size, 1);
        assert_eq!(config.self_study.max_size, 1);
    }

    #[test]
    fn test_session_settings_per_type() {
        let mut config = Config::default();
        config.lesson.order = LessonOrder::LevelThenShuffle;
        config.review.overdue_first = true;
        config.self_study.max_size = 7;

        let lesson = config.session_settings(SessionType::Lesson);
        assert!(lesson.shuffle);
        assert!(!lesson.overdue_first);
        assert_eq!(lesson.base_keys, &[SortKey::Level]);

        let review = config.session_settings(SessionType::Review);
        assert!(review.shuffle);
        assert!(review.overdue_first);
        assert!(review.base_keys.is_empty());

        let self_study = config.session_settings(SessionType::SelfStudy);
        assert_eq!(self_study.max_size, 7);
        assert!(!self_study.overdue_first);
    }

    #[test]
    fn test_load_from_reads_the_given_file() {
        let dir = tempfile::TempDir::new().unwrap();
        let path = dir.path().join("custom.toml");
        fs::write(&path, "onkun = true\n\n[review]\nmax_size = 0\n").unwrap();
        let config = Config::load_from(&path).unwrap();
        assert!(config.onkun);
        // validated on load
        assert_eq!(config.review.max_size, 1);
    }

    #[test]
    fn test_load_from_missing_file_gives_defaults() {
        let dir = tempfile::TempDir::new().unwrap();
        let config = Config::load_from(&dir.path().join("absent.toml")).unwrap();
        assert_eq!(config.lesson.max_size, 5);
    }
}
