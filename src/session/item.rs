use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::srs_registry::SrsRegistry;
use crate::engine::srs_system::{SrsSystemId, Stage, StageId};
use crate::engine::subject::{KanjiAcceptedReadingType, Subject, SubjectId, SubjectType};

pub const NUM_SLOTS: usize = 4;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionItemState {
    #[default]
    Active,
    /// Finished, waiting for the delayed upload.
    Pending,
    Reported,
    Abandoned,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotProgress {
    pub done: bool,
    pub incorrect: u32,
}

/// Progress of one subject within a session. Persisted as a row keyed by subject id.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct SessionItem {
    pub id: SubjectId,
    pub assignment_id: u64,
    pub subject_type: SubjectType,
    pub state: SessionItemState,
    pub srs_system_id: SrsSystemId,
    pub srs_stage_id: StageId,
    pub level: u32,
    pub bucket: u32,
    pub order: u32,
    pub slots: [SlotProgress; NUM_SLOTS],
    pub num_answers: u32,
    pub last_answer: Option<DateTime<Utc>>,
    pub kanji_accepted_reading_type: KanjiAcceptedReadingType,
    /// Selections to wait before this item is offered again.
    #[serde(skip)]
    pub choice_delay: u32,
}

impl SessionItem {
    /// A fresh item; slots the subject has nothing to ask for start out done.
    pub fn new(subject: &Subject, onkun: bool, bucket: u32, order: u32) -> Self {
        let mut slots = [SlotProgress::default(); NUM_SLOTS];
        for (i, slot) in slots.iter_mut().enumerate() {
            slot.done = !subject.needs_slot(i + 1, onkun);
        }
        Self {
            id: subject.id,
            assignment_id: subject.assignment_id,
            subject_type: subject.subject_type,
            state: SessionItemState::Active,
            srs_system_id: subject.srs_system_id,
            srs_stage_id: subject.srs_stage_id,
            level: subject.level,
            bucket,
            order,
            slots,
            num_answers: 0,
            last_answer: None,
            kanji_accepted_reading_type: subject.kanji_accepted_reading_type(),
            choice_delay: 0,
        }
    }

    pub fn slot(&self, slot: usize) -> &SlotProgress {
        &self.slots[slot.clamp(1, NUM_SLOTS) - 1]
    }

    pub fn slot_mut(&mut self, slot: usize) -> &mut SlotProgress {
        &mut self.slots[slot.clamp(1, NUM_SLOTS) - 1]
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionItemState::Active
    }

    pub fn is_pending(&self) -> bool {
        self.state == SessionItemState::Pending
    }

    pub fn is_reported(&self) -> bool {
        self.state == SessionItemState::Reported
    }

    pub fn is_abandoned(&self) -> bool {
        self.state == SessionItemState::Abandoned
    }

    /// Still part of the session's outcome.
    pub fn is_alive(&self) -> bool {
        self.is_active() || self.is_pending()
    }

    pub fn is_started(&self) -> bool {
        self.is_active() && self.num_answers > 0
    }

    pub fn is_finished(&self) -> bool {
        !self.is_active() || self.slots.iter().all(|s| s.done)
    }

    /// Meaning is still open and so is at least one reading slot.
    pub fn has_pending_reading_and_meaning(&self) -> bool {
        !self.slots[0].done && !self.slots[1..].iter().all(|s| s.done)
    }

    pub fn meaning_incorrect(&self) -> u32 {
        self.slots[0].incorrect
    }

    pub fn reading_incorrect(&self) -> u32 {
        self.slots[1..].iter().map(|s| s.incorrect).sum()
    }

    pub fn total_incorrect(&self) -> u32 {
        self.slots.iter().map(|s| s.incorrect).sum()
    }

    pub fn srs_stage<'a>(&self, srs: &'a SrsRegistry) -> &'a Stage {
        srs.stage(self.srs_system_id, self.srs_stage_id)
    }

    /// Stage the item lands on if it finished now.
    pub fn new_srs_stage<'a>(&self, srs: &'a SrsRegistry) -> &'a Stage {
        srs.new_stage(self.srs_system_id, self.srs_stage_id, self.total_incorrect())
    }
}
