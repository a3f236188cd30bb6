use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::srs_registry::SrsSystemDefinition;
use crate::engine::subject::Subject;
use crate::session::item::SessionItem;
use crate::session::report::ItemReport;

use super::SessionProperties;

const SCHEMA_VERSION: u32 = 1;

fn schema_version() -> u32 {
    SCHEMA_VERSION
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionItemsData {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub items: Vec<SessionItem>,
}

impl Default for SessionItemsData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            items: Vec::new(),
        }
    }
}

impl SessionItemsData {
    /// Check if loaded data has a stale schema version and needs reset.
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct SessionPropertiesData {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    #[serde(flatten)]
    pub properties: SessionProperties,
}

impl Default for SessionPropertiesData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            properties: SessionProperties::default(),
        }
    }
}

impl SessionPropertiesData {
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }
}

/// Finished items waiting to be uploaded.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ReportQueueData {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    #[serde(default)]
    pub reports: Vec<ItemReport>,
}

impl Default for ReportQueueData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            reports: Vec::new(),
        }
    }
}

impl ReportQueueData {
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }
}

/// A subject database with the account facts ordering needs.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct DeckData {
    #[serde(default = "schema_version")]
    pub schema_version: u32,
    #[serde(default = "default_level")]
    pub user_level: u32,
    #[serde(default = "default_max_level")]
    pub max_level_granted: u32,
    #[serde(default)]
    pub updated_at: Option<DateTime<Utc>>,
    /// Extra SRS systems; the built-in ones are always available.
    #[serde(default)]
    pub srs_systems: Vec<SrsSystemDefinition>,
    #[serde(default)]
    pub subjects: Vec<Subject>,
}

fn default_level() -> u32 {
    1
}
fn default_max_level() -> u32 {
    60
}

impl Default for DeckData {
    fn default() -> Self {
        Self {
            schema_version: SCHEMA_VERSION,
            user_level: default_level(),
            max_level_granted: default_max_level(),
            updated_at: None,
            srs_systems: Vec::new(),
            subjects: Vec::new(),
        }
    }
}

impl DeckData {
    pub fn needs_reset(&self) -> bool {
        self.schema_version != SCHEMA_VERSION
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deck_defaults_from_minimal_json() {
        let deck: DeckData =
            serde_json::from_str(r#"{"subjects":[{"id":1,"type":"radical","level":1}]}"#).unwrap();
        assert!(!deck.needs_reset());
        assert_eq!(deck.user_level, 1);
        assert_eq!(deck.max_level_granted, 60);
        assert_eq!(deck.subjects.len(), 1);
        assert_eq!(deck.subjects[0].srs_system_id, 1);
    }

    #[test]
    fn test_stale_version_needs_reset() {
        let data: SessionItemsData =
            serde_json::from_str(r#"{"schema_version":0,"items":[]}"#).unwrap();
        assert!(data.needs_reset());
    }

    #[test]
    fn test_properties_are_flattened() {
        let data: SessionPropertiesData = serde_json::from_str(
            r#"{"schema_version":1,"session_type":"review","onkun":true,"current_item_id":4}"#,
        )
        .unwrap();
        assert_eq!(data.properties.current_item_id, Some(4));
        assert!(data.properties.onkun);
        assert!(data.properties.current_question_type.is_none());
    }
}
