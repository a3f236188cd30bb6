use super::srs_system::{Stage, StageCategory};

const LEVEL_PROGRESS_TABLES: [&[i32]; 7] = [
    &[1],
    &[1],
    &[7, 1],
    &[7, 4, 1],
    &[7, 5, 3, 1],
    &[7, 5, 3, 2, 1],
    &[7, 5, 4, 3, 2, 1],
];
const LEVEL_PROGRESS_WIDE: &[i32] = &[7, 6, 5, 4, 3, 2, 1];

/// Classification buckets used by progress reporting. Each is a pure function
/// of the stage category and index.
impl Stage {
    pub fn level_progress_bucket(&self) -> i32 {
        match self.category {
            StageCategory::Locked => 9,
            StageCategory::Initial => 8,
            _ if self.passed => 0,
            _ => {
                let table = LEVEL_PROGRESS_TABLES
                    .get(self.num_pre_passed as usize)
                    .copied()
                    .unwrap_or(LEVEL_PROGRESS_WIDE);
                let idx = (self.pre_passed_index.unwrap_or(0) as usize).min(table.len() - 1);
                table[idx]
            }
        }
    }

    pub fn post60_deep_bucket(&self) -> i32 {
        match self.category {
            StageCategory::Locked => 0,
            StageCategory::Initial => 1,
            StageCategory::Burned => 10,
            StageCategory::Enlightened => 9,
            StageCategory::Master => 8,
            StageCategory::Guru => self.passed_index.unwrap_or(0).min(1) as i32 + 6,
            StageCategory::Apprentice => self.pre_passed_index.unwrap_or(0).min(3) as i32 + 2,
        }
    }

    fn by_category(&self, values: [i32; 7]) -> i32 {
        let idx = match self.category {
            StageCategory::Locked => 0,
            StageCategory::Initial => 1,
            StageCategory::Burned => 2,
            StageCategory::Enlightened => 3,
            StageCategory::Master => 4,
            StageCategory::Guru => 5,
            StageCategory::Apprentice => 6,
        };
        values[idx]
    }

    pub fn general_bucket(&self) -> i32 {
        self.by_category([0, 1, 6, 5, 4, 3, 2])
    }

    pub fn post60_shallow_bucket(&self) -> i32 {
        self.general_bucket()
    }

    pub fn srs_breakdown_bucket(&self) -> i32 {
        self.by_category([-1, 0, 4, 3, 2, 1, 0])
    }

    pub fn timeline_bucket(&self) -> i32 {
        self.by_category([0, 0, 4, 3, 2, 1, 0])
    }
}
