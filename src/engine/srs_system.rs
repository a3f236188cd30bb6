use std::cmp::Ordering;

pub type StageId = i32;
pub type SrsSystemId = u32;

/// Every system has a locked stage with this id, sorting before all others.
pub const LOCKED_STAGE_ID: StageId = -999;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StageCategory {
    Locked,
    Initial,
    Apprentice,
    Guru,
    Master,
    Enlightened,
    Burned,
}

/// Comparable progress of a stage: category first, then the index within it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct StageRank(u8, u32);

#[derive(Clone, Debug, PartialEq)]
pub struct Stage {
    pub system_id: SrsSystemId,
    pub id: StageId,
    pub interval_ms: u64,
    pub name: String,
    pub short_name: String,
    pub letter: char,
    pub search_tag: String,
    pub category: StageCategory,
    /// True for every stage at or beyond the passing threshold, burned included.
    pub passed: bool,
    pub passed_index: Option<u32>,
    pub pre_passed_index: Option<u32>,
    pub(crate) num_pre_passed: u32,
}

impl Stage {
    fn unclassified(system_id: SrsSystemId, id: StageId, interval_ms: u64) -> Self {
        Self {
            system_id,
            id,
            interval_ms,
            name: String::new(),
            short_name: String::new(),
            letter: '?',
            search_tag: String::new(),
            category: StageCategory::Locked,
            passed: false,
            passed_index: None,
            pre_passed_index: None,
            num_pre_passed: 0,
        }
    }

    fn locked(system_id: SrsSystemId) -> Self {
        let mut stage = Self::unclassified(system_id, LOCKED_STAGE_ID, 0);
        stage.classify_fixed(StageCategory::Locked, "Locked", 'L', "locked");
        stage
    }

    fn classify_fixed(&mut self, category: StageCategory, name: &str, letter: char, tag: &str) {
        self.category = category;
        self.name = name.to_string();
        self.short_name = name.to_string();
        self.letter = letter;
        self.search_tag = tag.to_string();
    }

    pub fn is_locked(&self) -> bool {
        self.category == StageCategory::Locked
    }

    pub fn is_initial(&self) -> bool {
        self.category == StageCategory::Initial
    }

    pub fn is_completed(&self) -> bool {
        self.category == StageCategory::Burned
    }

    pub fn is_passed(&self) -> bool {
        self.passed
    }

    pub fn is_enlightened(&self) -> bool {
        self.category == StageCategory::Enlightened
    }

    pub fn is_master(&self) -> bool {
        self.category == StageCategory::Master
    }

    pub fn rank(&self) -> StageRank {
        match self.category {
            StageCategory::Locked => StageRank(0, 0),
            StageCategory::Initial => StageRank(1, 0),
            StageCategory::Apprentice => StageRank(2, self.pre_passed_index.unwrap_or(0)),
            StageCategory::Guru => StageRank(3, self.passed_index.unwrap_or(0)),
            StageCategory::Master => StageRank(4, 0),
            StageCategory::Enlightened => StageRank(5, 0),
            StageCategory::Burned => StageRank(6, 0),
        }
    }

    /// Progress order: locked < initial < apprentice < guru < master < enlightened < burned.
    pub fn compare_progress(&self, other: &Stage) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

/// One SRS ladder. Build with `new` + `add_stage`, then call `finish` once.
#[derive(Clone, Debug)]
pub struct SrsSystem {
    pub id: SrsSystemId,
    pub name: String,
    initial_stage_id: StageId,
    starting_stage_id: StageId,
    passed_stage_id: StageId,
    completed_stage_id: StageId,
    stages: Vec<Stage>,
    fallback: Stage,
    num_pre_passed: u32,
    num_passed: u32,
}

impl SrsSystem {
    pub fn new(
        id: SrsSystemId,
        name: &str,
        initial_stage_id: StageId,
        starting_stage_id: StageId,
        passed_stage_id: StageId,
        completed_stage_id: StageId,
    ) -> Self {
        let mut fallback = Stage::unclassified(id, 0, 0);
        fallback.classify_fixed(StageCategory::Locked, "Locked", 'L', "locked");
        Self {
            id,
            name: name.to_string(),
            initial_stage_id,
            starting_stage_id,
            passed_stage_id,
            completed_stage_id,
            stages: vec![Stage::locked(id)],
            fallback,
            num_pre_passed: 0,
            num_passed: 0,
        }
    }

    pub fn add_stage(&mut self, id: StageId, interval_ms: u64) {
        self.stages.push(Stage::unclassified(self.id, id, interval_ms));
    }

    /// Sort the stages and derive names, letters, search tags and indices.
    pub fn finish(&mut self) {
        self.stages.sort_by_key(|s| s.id);

        let mut passed_count = 0u32;
        let mut pre_passed_count = 0u32;
        for stage in &mut self.stages {
            stage.passed = stage.id != LOCKED_STAGE_ID && stage.id >= self.passed_stage_id;
            if stage.id == LOCKED_STAGE_ID {
                stage.classify_fixed(StageCategory::Locked, "Locked", 'L', "locked");
            } else if stage.id == self.initial_stage_id {
                stage.classify_fixed(StageCategory::Initial, "Initiate", 'I', "initial");
            } else if stage.id == self.completed_stage_id {
                stage.classify_fixed(StageCategory::Burned, "Burned", 'B', "burned");
            } else if stage.passed {
                let roman = roman_numeral(passed_count + 1);
                stage.category = StageCategory::Guru;
                stage.name = format!("Guru {roman}");
                stage.short_name = stage.name.clone();
                stage.letter = 'G';
                stage.search_tag = format!("pass:{passed_count}");
                stage.passed_index = Some(passed_count);
                passed_count += 1;
            } else {
                let roman = roman_numeral(pre_passed_count + 1);
                stage.category = StageCategory::Apprentice;
                stage.name = format!("Apprentice {roman}");
                stage.short_name = format!("Appr {roman}");
                stage.letter = 'A';
                stage.search_tag = format!("prepass:{pre_passed_count}");
                stage.pre_passed_index = Some(pre_passed_count);
                pre_passed_count += 1;
            }
        }

        let mut relabeled = 0;
        for stage in self.stages.iter_mut().rev() {
            if stage.category != StageCategory::Guru {
                continue;
            }
            match relabeled {
                0 => {
                    stage.category = StageCategory::Enlightened;
                    stage.name = "Enlightened".to_string();
                    stage.short_name = "Enl".to_string();
                    stage.letter = 'E';
                    stage.search_tag = "enlightened".to_string();
                }
                1 => {
                    stage.category = StageCategory::Master;
                    stage.name = "Master".to_string();
                    stage.short_name = "Master".to_string();
                    stage.letter = 'M';
                    stage.search_tag = "master".to_string();
                }
                _ => break,
            }
            relabeled += 1;
        }

        self.num_pre_passed = pre_passed_count;
        self.num_passed = passed_count;
        for stage in &mut self.stages {
            stage.num_pre_passed = pre_passed_count;
        }
    }

    pub fn stages(&self) -> &[Stage] {
        &self.stages
    }

    /// Matching stage, else the locked stage. Unknown ids never fail.
    pub fn stage(&self, id: StageId) -> &Stage {
        self.stages
            .iter()
            .find(|s| s.id == id)
            .or_else(|| self.stages.first())
            .unwrap_or(&self.fallback)
    }

    pub fn locked_stage(&self) -> &Stage {
        self.stage(LOCKED_STAGE_ID)
    }

    pub fn initial_stage(&self) -> &Stage {
        self.stage(self.initial_stage_id)
    }

    pub fn first_started_stage(&self) -> &Stage {
        self.stage(self.starting_stage_id)
    }

    pub fn completed_stage(&self) -> &Stage {
        self.stage(self.completed_stage_id)
    }

    pub fn num_pre_passed(&self) -> u32 {
        self.num_pre_passed
    }

    pub fn num_passed(&self) -> u32 {
        self.num_passed
    }

    fn index_of(&self, id: StageId) -> usize {
        self.stages.iter().position(|s| s.id == id).unwrap_or(0)
    }

    /// Stage after a completed review with `num_incorrect` misses.
    ///
    /// No misses advance one step. Otherwise the stage drops by
    /// `ceil(num_incorrect / 2)` steps, doubled for passed stages. The
    /// result stays between the first started stage and the completed stage.
    pub fn new_stage(&self, from: StageId, num_incorrect: u32) -> &Stage {
        if self.stages.is_empty() {
            return &self.fallback;
        }
        let current = self.stage(from);
        let mut idx = self.index_of(current.id) as i64;
        if num_incorrect == 0 {
            idx += 1;
        } else {
            let step = num_incorrect.div_ceil(2) as i64;
            idx -= step;
            if current.is_passed() {
                idx -= step;
            }
        }
        let low = self.index_of(self.starting_stage_id) as i64;
        let high = self.index_of(self.completed_stage_id) as i64;
        let idx = idx.max(low).min(high.max(low));
        &self.stages[idx as usize]
    }
}

fn roman_numeral(n: u32) -> String {
    const TABLE: [(u32, &str); 9] = [
        (100, "C"),
        (90, "XC"),
        (50, "L"),
        (40, "XL"),
        (10, "X"),
        (9, "IX"),
        (5, "V"),
        (4, "IV"),
        (1, "I"),
    ];
    let mut rest = n;
    let mut out = String::new();
    for (value, digits) in TABLE {
        while rest >= value {
            out.push_str(digits);
            rest -= value;
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn classic() -> SrsSystem {
        let mut system = SrsSystem::new(1, "Classic", 0, 1, 5, 9);
        for id in 0..=9 {
            system.add_stage(id, id as u64 * 1000);
        }
        system.finish();
        system
    }

    #[test]
    fn test_finish_names_stages() {
        let system = classic();
        let names: Vec<&str> = system.stages().iter().map(|s| s.name.as_str()).collect();
        assert_eq!(
            names,
            vec![
                "Locked",
                "Initiate",
                "Apprentice I",
                "Apprentice II",
                "Apprentice III",
                "Apprentice IV",
                "Guru I",
                "Guru II",
                "Master",
                "Enlightened",
                "Burned",
            ]
        );
        assert_eq!(system.stage(2).short_name, "Appr II");
        assert_eq!(system.stage(3).search_tag, "prepass:2");
        assert_eq!(system.stage(6).search_tag, "pass:1");
        assert_eq!(system.stage(8).letter, 'E');
        assert_eq!(system.num_pre_passed(), 4);
        assert_eq!(system.num_passed(), 4);
    }

    #[test]
    fn test_unknown_stage_falls_back_to_locked() {
        let system = classic();
        assert!(system.stage(42).is_locked());
        assert!(system.stage(-1).is_locked());
    }

    #[test]
    fn test_new_stage_advances_and_regresses() {
        let system = classic();
        assert_eq!(system.new_stage(1, 0).id, 2);
        assert_eq!(system.new_stage(4, 1).id, 3);
        assert_eq!(system.new_stage(4, 3).id, 2);
        // passed stages drop twice as far
        assert_eq!(system.new_stage(7, 1).id, 5);
        assert_eq!(system.new_stage(7, 2).id, 5);
        assert_eq!(system.new_stage(7, 3).id, 3);
    }

    #[test]
    fn test_new_stage_clamped() {
        let system = classic();
        assert_eq!(system.new_stage(2, 20).id, 1);
        assert_eq!(system.new_stage(9, 0).id, 9);
        assert_eq!(system.new_stage(0, 0).id, 1);
        assert_eq!(system.new_stage(LOCKED_STAGE_ID, 0).id, 1);
    }

    #[test]
    fn test_new_stage_monotonic() {
        let system = classic();
        for stage in system.stages() {
            if stage.is_locked() || stage.is_initial() || stage.is_completed() {
                continue;
            }
            let up = system.new_stage(stage.id, 0);
            assert_eq!(up.compare_progress(stage), Ordering::Greater, "{}", stage.name);
            let mut previous = stage.clone();
            for k in 1..10 {
                let down = system.new_stage(stage.id, k);
                assert_ne!(down.compare_progress(stage), Ordering::Greater);
                assert_ne!(down.compare_progress(&previous), Ordering::Greater);
                assert_ne!(down.compare_progress(system.first_started_stage()), Ordering::Less);
                previous = down.clone();
            }
        }
    }

    #[test]
    fn test_progress_order_is_total_and_matches_categories() {
        let system = classic();
        let stages = system.stages();
        for (i, a) in stages.iter().enumerate() {
            for (j, b) in stages.iter().enumerate() {
                assert_eq!(a.compare_progress(b), i.cmp(&j), "{} vs {}", a.name, b.name);
            }
        }
    }

    #[test]
    fn test_roman_numeral() {
        assert_eq!(roman_numeral(1), "I");
        assert_eq!(roman_numeral(4), "IV");
        assert_eq!(roman_numeral(9), "IX");
        assert_eq!(roman_numeral(14), "XIV");
    }
}
