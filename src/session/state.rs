use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::engine::subject::Subject;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    #[default]
    None,
    Lesson,
    Review,
    SelfStudy,
}

impl SessionType {
    /// Results of this session move SRS stages.
    pub fn is_srs_relevant(self) -> bool {
        self == SessionType::Review
    }

    /// Finished items are reported to the remote service.
    pub fn is_reporting_task_needed(self) -> bool {
        matches!(self, SessionType::Lesson | SessionType::Review)
    }

    pub fn is_eligible(self, subject: &Subject, now: DateTime<Utc>) -> bool {
        match self {
            SessionType::Lesson => subject.is_eligible_for_lesson(),
            SessionType::Review => subject.is_eligible_for_review(now),
            SessionType::None | SessionType::SelfStudy => true,
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SessionType::None => "none",
            SessionType::Lesson => "lesson",
            SessionType::Review => "review",
            SessionType::SelfStudy => "self-study",
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum SessionState {
    #[default]
    Inactive,
    InLessonPresentation,
    Active,
    Finishing,
}

/// Why the current question pointer last changed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum QuestionChoiceReason {
    StartingReviewSession,
    StartingLessonSession,
    StartingSelfStudySession,
    StartingQuiz,
    MoveToNextLessonItem,
    MoveToPreviousLessonItem,
    #[default]
    NextNatural,
    NextForced,
    UndoAndRetry,
    UndoAndPutBack,
    Skip,
    Cleanup,
    Load,
    FinishingSession,
    Finished,
    Wrapup,
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::subject::SubjectType;

    #[test]
    fn test_session_type_flags() {
        assert!(SessionType::Review.is_srs_relevant());
        assert!(!SessionType::Lesson.is_srs_relevant());
        assert!(SessionType::Lesson.is_reporting_task_needed());
        assert!(!SessionType::SelfStudy.is_reporting_task_needed());
        assert!(!SessionType::None.is_reporting_task_needed());
    }

    #[test]
    fn test_eligibility_by_type() {
        let now = Utc::now();
        let subject = Subject::new(1, SubjectType::Kanji, 1);
        assert!(!SessionType::Lesson.is_eligible(&subject, now));
        assert!(!SessionType::Review.is_eligible(&subject, now));
        assert!(SessionType::SelfStudy.is_eligible(&subject, now));
    }
}
