use chrono::{DateTime, Utc};

use crate::engine::question_type::QuestionType;

use super::item::{SessionItem, SessionItemState};

/// One answerable slot of a session item. `item` indexes the session's item list.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Question {
    pub item: usize,
    pub kind: QuestionType,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum AnswerOutcome {
    Correct,
    Incorrect,
}

/// A question together with the mark it received, kept for undo.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct AnsweredQuestion {
    pub question: Question,
    pub outcome: AnswerOutcome,
}

impl Question {
    pub fn new(item: usize, kind: QuestionType) -> Self {
        Self { item, kind }
    }

    pub fn is_finished(&self, item: &SessionItem) -> bool {
        !item.is_active() || item.slot(self.kind.slot()).done
    }

    pub fn can_undo(&self, item: &SessionItem) -> bool {
        !item.is_reported() && !item.is_abandoned()
    }

    /// Marks the slot done. Returns true when this completed the item.
    pub fn mark_correct(&self, item: &mut SessionItem, now: DateTime<Utc>) -> bool {
        item.slot_mut(self.kind.slot()).done = true;
        item.num_answers += 1;
        item.last_answer = Some(now);
        item.is_finished()
    }

    pub fn mark_incorrect(&self, item: &mut SessionItem, now: DateTime<Utc>) {
        item.slot_mut(self.kind.slot()).incorrect += 1;
        item.num_answers += 1;
        item.last_answer = Some(now);
    }

    /// Reverse exactly the mark recorded in `outcome`. Returns false if the
    /// item is already reported or abandoned.
    pub fn undo(&self, item: &mut SessionItem, outcome: AnswerOutcome) -> bool {
        if !self.can_undo(item) {
            return false;
        }
        let slot = item.slot_mut(self.kind.slot());
        match outcome {
            AnswerOutcome::Correct => slot.done = false,
            AnswerOutcome::Incorrect => slot.incorrect = slot.incorrect.saturating_sub(1),
        }
        item.num_answers = item.num_answers.saturating_sub(1);
        if item.state == SessionItemState::Pending {
            item.state = SessionItemState::Active;
        }
        true
    }
}

impl AnswerOutcome {
    pub fn from_correct(correct: bool) -> Self {
        if correct {
            AnswerOutcome::Correct
        } else {
            AnswerOutcome::Incorrect
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::subject::{Meaning, Reading, Subject, SubjectType};

    fn item() -> SessionItem {
        let mut s = Subject::new(3, SubjectType::Kanji, 1);
        s.meanings.push(Meaning { meaning: "Big".into(), primary: true, accepted: true });
        s.readings.push(Reading { reading: "だい".into(), primary: true, accepted: true, kind: None });
        SessionItem::new(&s, false, 0, 0)
    }

    #[test]
    fn test_undo_after_correct_restores_slot() {
        let mut item = item();
        item.slot_mut(1).incorrect = 1;
        let before = item.clone();
        let q = Question::new(0, QuestionType::KanjiMeaning);
        assert!(!q.mark_correct(&mut item, Utc::now()));
        assert!(q.is_finished(&item));
        assert!(q.undo(&mut item, AnswerOutcome::Correct));
        assert_eq!(item.slots, before.slots);
        assert_eq!(item.num_answers, before.num_answers);
    }

    #[test]
    fn test_undo_after_incorrect_restores_slot() {
        let mut item = item();
        let before = item.clone();
        let q = Question::new(0, QuestionType::KanjiReading);
        q.mark_incorrect(&mut item, Utc::now());
        assert_eq!(item.slot(2).incorrect, 1);
        q.undo(&mut item, AnswerOutcome::Incorrect);
        assert_eq!(item.slots, before.slots);
        assert_eq!(item.num_answers, 0);
    }

    #[test]
    fn test_undo_reopens_pending_item() {
        let mut item = item();
        let meaning = Question::new(0, QuestionType::KanjiMeaning);
        let reading = Question::new(0, QuestionType::KanjiReading);
        meaning.mark_correct(&mut item, Utc::now());
        assert!(reading.mark_correct(&mut item, Utc::now()));
        item.state = SessionItemState::Pending;
        assert!(reading.undo(&mut item, AnswerOutcome::Correct));
        assert!(item.is_active());
        assert!(!reading.is_finished(&item));
    }

    #[test]
    fn test_reported_item_cannot_undo() {
        let mut item = item();
        let q = Question::new(0, QuestionType::KanjiMeaning);
        q.mark_correct(&mut item, Utc::now());
        item.state = SessionItemState::Reported;
        assert!(!q.can_undo(&item));
        assert!(!q.undo(&mut item, AnswerOutcome::Correct));
        assert!(item.slot(1).done);
    }
}
