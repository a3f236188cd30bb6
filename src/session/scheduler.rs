use std::cmp::Ordering;

use rand::Rng;
use rand::seq::SliceRandom;
use tracing::{debug, info, warn};

use crate::engine::ordering::SubjectOrdering;
use crate::engine::selection::{SubjectSelectionRules, trim_selection};
use crate::engine::subject::{Subject, SubjectId};

use super::item::SessionItem;
use super::question::{AnswerOutcome, AnsweredQuestion, Question};
use super::state::{QuestionChoiceReason, SessionState};
use super::{CHOICE_DELAY, HISTORY_LIMIT, Session, WARMUP_LIMIT};

/// Keep only the questions matching `keep`, unless none do.
fn narrow(candidates: &mut Vec<Question>, keep: impl Fn(&Question) -> bool) {
    let filtered: Vec<Question> = candidates.iter().copied().filter(|q| keep(q)).collect();
    if !filtered.is_empty() {
        *candidates = filtered;
    }
}

impl Session {
    /// Sort, trim and bucket the candidates, then persist them as the session's rows.
    pub(crate) fn populate_items(&mut self, mut subjects: Vec<Subject>, max_size: usize, shuffle: bool) {
        if shuffle {
            subjects.shuffle(&mut self.rng);
        }
        let settings = self.config.session_settings(self.session_type);
        {
            let srs = &self.srs;
            let ordering = &self.ordering;
            subjects.sort_by(|a, b| ordering.compare(a, b, srs));
            if subjects.len() > max_size {
                let mut rules = SubjectSelectionRules::new(&settings.selection, self.backend.user_level());
                subjects = trim_selection(subjects, max_size, &mut rules, |a, b| ordering.compare(a, b, srs));
            }
        }
        let ids: Vec<SubjectId> = subjects.iter().map(|s| s.id).collect();
        info!(?ids, "subjects selected for session");

        if settings.shuffle_after_selection {
            self.ordering = SubjectOrdering::shuffled();
        }

        let mut items = Vec::with_capacity(subjects.len());
        let mut bucket = 0;
        for (index, subject) in subjects.iter().enumerate() {
            if index > 0 && self.ordering.compare(&subjects[index - 1], subject, &self.srs) != Ordering::Equal {
                bucket += 1;
            }
            items.push(SessionItem::new(subject, self.flags.onkun, bucket, index as u32));
        }
        if let Err(e) = self.backend.replace_items(&items) {
            warn!("failed to persist session items: {e:#}");
        }
        self.items = items;
        self.subjects = subjects.into_iter().map(|s| (s.id, s)).collect();
    }

    /// One question per slot the item's type can ask. Slots already done are
    /// dropped again by the next `check_questions`.
    pub(crate) fn create_questions(&mut self) {
        let onkun = self.flags.onkun;
        self.questions = self
            .items
            .iter()
            .enumerate()
            .flat_map(|(index, item)| {
                item.subject_type
                    .question_types(onkun)
                    .iter()
                    .map(move |&kind| Question::new(index, kind))
            })
            .collect();
        debug!(questions = self.questions.len(), "questions created");
    }

    /// Drop finished questions and abandoned history, and notice an exhausted pool.
    pub(crate) fn check_questions(&mut self) {
        if let Some(q) = self.current
            && q.is_finished(&self.items[q.item])
        {
            self.set_current(None, None, QuestionChoiceReason::Cleanup);
        }
        let items = &self.items;
        self.questions.retain(|q| !q.is_finished(&items[q.item]));
        self.history.retain(|h| !items[h.question.item].is_abandoned());
        if self.state == SessionState::Active && self.questions.is_empty() {
            self.state = SessionState::Finishing;
        }
        debug!(questions = self.questions.len(), "questions checked");
    }

    /// First question of the given lesson item, or the pool head if it has none left.
    pub(crate) fn lesson_question(&self, index: usize) -> Option<Question> {
        self.questions
            .iter()
            .copied()
            .find(|q| q.item == index)
            .or_else(|| self.questions.first().copied())
    }

    /// Pick the next question if none is current.
    pub fn choose_question(&mut self) {
        if self.current.is_some() || self.is_finishing() || self.is_inactive() {
            return;
        }
        if self.is_in_lesson_presentation() {
            if self.current_item.is_some() {
                return;
            }
            self.answered = false;
            let question = self.lesson_question(0);
            self.set_current(question, Some(0), QuestionChoiceReason::StartingLessonSession);
            self.persist_current();
            debug!("lesson presentation starts at the first item");
            return;
        }

        self.answered = false;
        if self.questions.is_empty() {
            self.set_current(None, None, QuestionChoiceReason::FinishingSession);
            if self.state == SessionState::Active {
                self.state = SessionState::Finishing;
            }
            info!("no questions left, session finishing");
            return;
        }

        let started = self.num_started_items();
        let items = &self.items;
        let mut candidates = self.questions.clone();
        if self.flags.back_to_back {
            narrow(&mut candidates, |q| items[q.item].is_started());
        }
        if self.flags.reading_first {
            narrow(&mut candidates, |q| {
                !items[q.item].has_pending_reading_and_meaning() || q.kind.is_reading()
            });
        }
        if self.flags.meaning_first {
            narrow(&mut candidates, |q| {
                !items[q.item].has_pending_reading_and_meaning() || q.kind.is_meaning()
            });
        }
        if started >= WARMUP_LIMIT {
            narrow(&mut candidates, |q| items[q.item].is_started());
        }

        let bucket = items[candidates[0].item].bucket;
        let in_bucket = || items.iter().filter(|item| item.bucket == bucket);
        let has_delayed = in_bucket().any(|item| item.choice_delay > 0);
        let has_undelayed = in_bucket().any(|item| item.choice_delay == 0);
        if has_delayed && has_undelayed {
            narrow(&mut candidates, |q| items[q.item].choice_delay == 0);
        }

        let bucket = items[candidates[0].item].bucket;
        let run = candidates
            .iter()
            .take_while(|q| items[q.item].bucket == bucket)
            .count();
        let chosen = candidates[self.rng.gen_range(0..run)];

        self.set_current(Some(chosen), Some(chosen.item), self.choice_reason);
        for item in &mut self.items {
            item.choice_delay = item.choice_delay.saturating_sub(1);
        }
        self.persist_current();
        debug!(subject_id = self.items[chosen.item].id, kind = ?chosen.kind, "question chosen");
    }

    pub fn move_to_next_lesson_item(&mut self) {
        self.answered = false;
        if !self.is_in_lesson_presentation() {
            debug!("move to next lesson item: not in lesson presentation");
            return;
        }
        let Some(index) = self.current_item.map(|i| i + 1) else {
            return;
        };
        if index >= self.items.len() {
            debug!("move to next lesson item: already on the last item");
            return;
        }
        let question = self.lesson_question(index);
        self.set_current(question, Some(index), QuestionChoiceReason::MoveToNextLessonItem);
        self.persist_current();
    }

    pub fn move_to_previous_lesson_item(&mut self) {
        self.answered = false;
        if !self.is_in_lesson_presentation() {
            debug!("move to previous lesson item: not in lesson presentation");
            return;
        }
        let Some(index) = self.current_item.and_then(|i| i.checked_sub(1)) else {
            return;
        };
        let question = self.lesson_question(index);
        self.set_current(question, Some(index), QuestionChoiceReason::MoveToPreviousLessonItem);
        self.persist_current();
    }

    /// Leave lesson presentation and begin quizzing.
    pub fn start_quiz(&mut self) {
        info!("starting quiz");
        self.state = SessionState::Active;
        self.set_current(None, None, QuestionChoiceReason::StartingQuiz);
        self.last_finished_subject_id = None;
    }

    /// Move past an answered question, recording it for undo.
    pub fn advance(&mut self) {
        if !self.answered {
            debug!("advance: current question not answered yet");
            return;
        }
        if let Some(id) = self.current_item().filter(|i| i.is_finished()).map(|i| i.id) {
            self.last_finished_subject_id = Some(id);
        }
        if let Some(q) = self.current {
            if !self.correct {
                self.items[q.item].choice_delay = CHOICE_DELAY;
            }
            self.push_history(AnsweredQuestion {
                question: q,
                outcome: AnswerOutcome::from_correct(self.correct),
            });
            if q.is_finished(&self.items[q.item]) {
                self.questions.retain(|p| *p != q);
                if self.questions.is_empty() {
                    self.state = SessionState::Finishing;
                }
            }
        }
        self.answered = false;
        self.stage_change = None;
        self.set_current(None, None, QuestionChoiceReason::NextNatural);
    }

    /// Clear an answered question without adding it to the history.
    pub fn advance_quietly(&mut self) {
        if !self.answered {
            debug!("advance quietly: current question not answered yet");
            return;
        }
        self.answered = false;
        self.stage_change = None;
        self.set_current(None, None, QuestionChoiceReason::NextForced);
    }

    /// Put the unanswered current question aside for a few selections.
    pub fn skip(&mut self) {
        if self.answered {
            debug!("skip: already answered");
            return;
        }
        if let Some(index) = self.current_item {
            self.items[index].choice_delay = CHOICE_DELAY;
        }
        self.set_current(None, None, QuestionChoiceReason::Skip);
    }

    /// Return a question to the pool in front of the first later bucket.
    pub(crate) fn put_back(&mut self, question: Question) {
        if self.questions.contains(&question) {
            return;
        }
        let bucket = self.items[question.item].bucket;
        let index = self
            .questions
            .iter()
            .position(|q| self.items[q.item].bucket > bucket)
            .unwrap_or(self.questions.len());
        self.questions.insert(index, question);
        self.items[question.item].choice_delay = CHOICE_DELAY;
    }

    pub(crate) fn push_history(&mut self, answered: AnsweredQuestion) {
        self.history.push_back(answered);
        if self.history.len() > HISTORY_LIMIT {
            self.history.pop_front();
        }
    }
}
