use serde::{Deserialize, Serialize};

use super::srs_system::{SrsSystem, SrsSystemId, Stage, StageId};

pub const DEFAULT_SYSTEM_ID: SrsSystemId = 1;

const CLASSIC_INTERVALS: [u64; 10] = [
    0,
    14_400_000,
    28_800_000,
    82_800_000,
    169_200_000,
    601_200_000,
    1_206_000_000,
    2_588_400_000,
    10_364_400_000,
    0,
];

const ACCELERATED_INTERVALS: [u64; 10] = [
    0,
    7_200_000,
    14_400_000,
    28_800_000,
    82_800_000,
    601_200_000,
    1_206_000_000,
    2_588_400_000,
    10_364_400_000,
    0,
];

/// Serialized form of an SRS system, as shipped in deck files.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SrsSystemDefinition {
    pub id: SrsSystemId,
    pub name: String,
    pub initial_stage: StageId,
    pub starting_stage: StageId,
    pub passing_stage: StageId,
    pub burning_stage: StageId,
    pub stages: Vec<StageDefinition>,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct StageDefinition {
    pub position: StageId,
    #[serde(default)]
    pub interval_ms: u64,
}

impl SrsSystemDefinition {
    pub fn build(&self) -> SrsSystem {
        let mut system = SrsSystem::new(
            self.id,
            &self.name,
            self.initial_stage,
            self.starting_stage,
            self.passing_stage,
            self.burning_stage,
        );
        for stage in &self.stages {
            system.add_stage(stage.position, stage.interval_ms);
        }
        system.finish();
        system
    }
}

fn classic_system(id: SrsSystemId, name: &str, intervals: &[u64; 10]) -> SrsSystem {
    let mut system = SrsSystem::new(id, name, 0, 1, 5, 9);
    for (position, &interval) in intervals.iter().enumerate() {
        system.add_stage(position as StageId, interval);
    }
    system.finish();
    system
}

/// Lookup of SRS systems by id. Unknown ids resolve to the default system.
#[derive(Clone, Debug)]
pub struct SrsRegistry {
    systems: Vec<SrsSystem>,
}

impl Default for SrsRegistry {
    fn default() -> Self {
        Self {
            systems: vec![
                classic_system(DEFAULT_SYSTEM_ID, "Classic", &CLASSIC_INTERVALS),
                classic_system(2, "Classic accelerated", &ACCELERATED_INTERVALS),
            ],
        }
    }
}

impl SrsRegistry {
    /// Built-in systems plus the given definitions. A definition replaces a
    /// built-in with the same id.
    pub fn with_definitions(definitions: &[SrsSystemDefinition]) -> Self {
        let mut registry = Self::default();
        for def in definitions {
            let system = def.build();
            match registry.systems.iter_mut().find(|s| s.id == def.id) {
                Some(slot) => *slot = system,
                None => registry.systems.push(system),
            }
        }
        registry
    }

    pub fn systems(&self) -> &[SrsSystem] {
        &self.systems
    }

    pub fn system(&self, id: SrsSystemId) -> &SrsSystem {
        self.systems
            .iter()
            .find(|s| s.id == id)
            .unwrap_or(&self.systems[0])
    }

    pub fn stage(&self, system_id: SrsSystemId, stage_id: StageId) -> &Stage {
        self.system(system_id).stage(stage_id)
    }

    pub fn new_stage(&self, system_id: SrsSystemId, stage_id: StageId, num_incorrect: u32) -> &Stage {
        self.system(system_id).new_stage(stage_id, num_incorrect)
    }

    pub fn max_apprentice_stages(&self) -> u32 {
        self.systems.iter().map(|s| s.num_pre_passed()).max().unwrap_or(0)
    }

    /// Passed stages that are neither master nor enlightened.
    pub fn max_guru_stages(&self) -> u32 {
        self.systems
            .iter()
            .map(|s| s.num_passed().saturating_sub(2))
            .max()
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_systems() {
        let registry = SrsRegistry::default();
        assert_eq!(registry.systems().len(), 2);
        assert_eq!(registry.system(1).name, "Classic");
        assert_eq!(registry.system(2).stage(1).interval_ms, 7_200_000);
        assert_eq!(registry.stage(1, 1).interval_ms, 14_400_000);
    }

    #[test]
    fn test_unknown_system_falls_back() {
        let registry = SrsRegistry::default();
        assert_eq!(registry.system(77).id, DEFAULT_SYSTEM_ID);
        assert!(registry.stage(77, 123).is_locked());
    }

    #[test]
    fn test_max_stage_counts() {
        let registry = SrsRegistry::default();
        assert_eq!(registry.max_apprentice_stages(), 4);
        assert_eq!(registry.max_guru_stages(), 2);
    }

    #[test]
    fn test_definitions_replace_and_extend() {
        let def = SrsSystemDefinition {
            id: 5,
            name: "Short".to_string(),
            initial_stage: 0,
            starting_stage: 1,
            passing_stage: 3,
            burning_stage: 5,
            stages: (0..=5)
                .map(|position| StageDefinition { position, interval_ms: 60_000 })
                .collect(),
        };
        let registry = SrsRegistry::with_definitions(&[def]);
        assert_eq!(registry.systems().len(), 3);
        let short = registry.system(5);
        assert_eq!(short.stage(3).name, "Master");
        assert_eq!(short.stage(4).name, "Enlightened");
        assert_eq!(short.stage(2).name, "Apprentice II");
    }

    #[test]
    fn test_definition_json() {
        let json = r#"{"id":9,"name":"X","initial_stage":0,"starting_stage":1,
            "passing_stage":2,"burning_stage":3,
            "stages":[{"position":0},{"position":1,"interval_ms":10},{"position":2},{"position":3}]}"#;
        let def: SrsSystemDefinition = serde_json::from_str(json).unwrap();
        assert_eq!(def.stages[1].interval_ms, 10);
        assert_eq!(def.build().stage(2).name, "Enlightened");
    }
}
