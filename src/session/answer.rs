use std::cmp::Ordering;

use tracing::{debug, info, warn};

use crate::engine::kana::is_kana;
use crate::engine::question_type::QuestionType;
use crate::engine::verdict::AnswerVerdict;

use super::item::SessionItemState;
use super::question::{AnswerOutcome, AnsweredQuestion, Question};
use super::report::StageChange;
use super::state::{QuestionChoiceReason, SessionState};
use super::Session;

impl Session {
    /// Judge a typed answer for the current question. Does not move on;
    /// call [`Session::advance`] once the verdict has been shown.
    pub fn submit(&mut self, answer: &str) -> AnswerVerdict {
        let Some(q) = self.current else {
            debug!("submit: no current question");
            return AnswerVerdict::NOK_WITHOUT_RETRY;
        };
        let Some(subject) = self.subjects.get(&self.items[q.item].id) else {
            warn!(subject_id = self.items[q.item].id, "submit: subject missing");
            return AnswerVerdict::NOK_WITHOUT_RETRY;
        };
        if self.answered {
            return AnswerVerdict {
                ok: self.correct,
                retry: false,
                near_match: false,
                given_answer: None,
                matched_answer: None,
                digraph: None,
            };
        }

        let mut answer = answer.trim().to_string();
        if answer.is_empty() {
            return AnswerVerdict::NOK_WITH_RETRY;
        }
        if q.kind.is_kana() {
            if answer.ends_with('n') {
                answer.pop();
                answer.push('ん');
            }
            if !answer.chars().all(is_kana) {
                debug!(%answer, "submit: non-kana characters in reading");
                return AnswerVerdict::NOK_WITH_RETRY;
            }
        }

        let matching_kanji = if q.kind == QuestionType::VocabReading {
            self.backend
                .matching_kanji(&subject.characters)
                .unwrap_or_else(|e| {
                    warn!("failed to look up matching kanji: {e:#}");
                    None
                })
        } else {
            None
        };
        let verdict = q.kind.check_answer(
            subject,
            matching_kanji.as_ref(),
            &answer,
            self.config.require_onyomi_in_katakana,
            self.config.close_enough_action,
        );

        if verdict.ok {
            self.mark_correct(q);
            self.answered = true;
            self.correct = true;
        } else if !verdict.retry {
            self.mark_incorrect(q);
            self.answered = true;
            self.correct = false;
        }
        info!(subject_id = self.items[q.item].id, kind = ?q.kind, %verdict, "answer judged");
        verdict
    }

    /// Self-graded pass.
    pub fn submit_anki_correct(&mut self) {
        let Some(q) = self.current.filter(|_| !self.answered) else {
            debug!("anki correct: already answered or no current question");
            return;
        };
        self.mark_correct(q);
        self.answered = true;
        self.correct = true;
    }

    /// Self-graded miss.
    pub fn submit_anki_incorrect(&mut self) {
        let Some(q) = self.current.filter(|_| !self.answered) else {
            debug!("anki incorrect: already answered or no current question");
            return;
        };
        self.mark_incorrect(q);
        self.answered = true;
        self.correct = false;
    }

    pub fn submit_dont_know(&mut self) {
        let Some(q) = self.current.filter(|_| !self.answered) else {
            debug!("don't know: already answered or no current question");
            return;
        };
        self.mark_incorrect(q);
        self.answered = true;
        self.correct = false;
    }

    pub fn can_undo(&self) -> bool {
        if self.undoable_current().is_some() {
            return true;
        }
        match self.history.back() {
            Some(last) => self.flags.delayed || last.question.can_undo(&self.items[last.question.item]),
            None => false,
        }
    }

    /// Reverse the last answer and ask the same question again.
    pub fn undo_and_retry(&mut self) {
        if !self.can_undo() {
            debug!("undo and retry: nothing to undo");
            return;
        }
        if let Some(q) = self.undoable_current() {
            self.undo_question(q, AnswerOutcome::from_correct(self.correct));
            self.choice_reason = QuestionChoiceReason::UndoAndRetry;
        } else if let Some(last) = self.history.pop_back() {
            let q = last.question;
            self.undo_question(q, last.outcome);
            self.set_current(Some(q), Some(q.item), QuestionChoiceReason::UndoAndRetry);
            self.persist_current();
            self.put_back(q);
        }
        self.answered = false;
        self.correct = false;
        self.stage_change = None;
        self.reopen();
    }

    /// Reverse the last answer and return its question to the pool.
    pub fn undo_and_put_back(&mut self) {
        if !self.can_undo() {
            debug!("undo and put back: nothing to undo");
            return;
        }
        let question = if let Some(q) = self.undoable_current() {
            self.undo_question(q, AnswerOutcome::from_correct(self.correct));
            q
        } else if let Some(last) = self.history.pop_back() {
            self.undo_question(last.question, last.outcome);
            last.question
        } else {
            return;
        };
        self.put_back(question);
        self.answered = false;
        self.correct = false;
        self.stage_change = None;
        self.set_current(None, None, QuestionChoiceReason::UndoAndPutBack);
        self.reopen();
    }

    /// Treat the last answer as correct, whatever it was.
    pub fn ignore(&mut self) {
        if !self.can_undo() {
            debug!("ignore: nothing to undo");
            return;
        }
        if let Some(q) = self.undoable_current() {
            self.undo_question(q, AnswerOutcome::from_correct(self.correct));
            self.mark_correct(q);
            self.correct = true;
        } else if let Some(last) = self.history.pop_back() {
            let q = last.question;
            self.undo_question(q, last.outcome);
            self.mark_correct(q);
            self.push_history(AnsweredQuestion {
                question: q,
                outcome: AnswerOutcome::Correct,
            });
            if q.is_finished(&self.items[q.item]) {
                self.questions.retain(|p| *p != q);
                if self.questions.is_empty() && self.state == SessionState::Active {
                    self.state = SessionState::Finishing;
                }
            }
        }
    }

    /// The current question, if it has been answered and may still be undone.
    fn undoable_current(&self) -> Option<Question> {
        self.current
            .filter(|q| self.answered && q.can_undo(&self.items[q.item]))
    }

    fn reopen(&mut self) {
        if self.state == SessionState::Finishing {
            self.state = SessionState::Active;
        }
    }

    fn mark_correct(&mut self, q: Question) {
        let now = self.now();
        let finished = q.mark_correct(&mut self.items[q.item], now);
        if !finished {
            self.save_item(q.item);
            return;
        }
        if self.session_type.is_srs_relevant() {
            self.stage_change = Some(self.stage_change_for(q.item));
        }
        if self.flags.delayed {
            self.items[q.item].state = SessionItemState::Pending;
            self.save_item(q.item);
        } else {
            self.report_item(q.item);
        }
    }

    fn mark_incorrect(&mut self, q: Question) {
        let now = self.now();
        q.mark_incorrect(&mut self.items[q.item], now);
        self.save_item(q.item);
    }

    fn undo_question(&mut self, q: Question, outcome: AnswerOutcome) {
        if q.undo(&mut self.items[q.item], outcome) {
            self.save_item(q.item);
        }
    }

    fn stage_change_for(&self, index: usize) -> StageChange {
        let item = &self.items[index];
        let old = item.srs_stage(&self.srs);
        let new = item.new_srs_stage(&self.srs);
        StageChange {
            subject_id: item.id,
            old_stage: old.name.clone(),
            new_stage: new.name.clone(),
            promoted: new.compare_progress(old) == Ordering::Greater,
        }
    }
}
