use anyhow::Result;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::srs_system::StageId;
use crate::engine::subject::SubjectId;

use super::state::SessionType;

/// Outcome of one finished item, queued for upload to the remote service.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ItemReport {
    pub subject_id: SubjectId,
    pub assignment_id: u64,
    pub session_type: SessionType,
    pub meaning_incorrect: u32,
    pub reading_incorrect: u32,
    pub new_stage_id: StageId,
    pub answered_at: DateTime<Utc>,
}

/// Receives finished items. Delivery is fire-and-forget from the session's side.
pub trait ReportSink {
    fn report(&mut self, report: ItemReport) -> Result<()>;
}

/// Stage movement of the item finished by the last answer.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct StageChange {
    pub subject_id: SubjectId,
    pub old_stage: String,
    pub new_stage: String,
    pub promoted: bool,
}
