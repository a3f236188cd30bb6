pub mod answer;
pub mod item;
pub mod question;
pub mod report;
pub mod scheduler;
pub mod state;

use std::collections::{HashMap, VecDeque};

use chrono::{DateTime, Utc};
use rand::SeedableRng;
use rand::rngs::SmallRng;
use tracing::{debug, info, warn};

use crate::config::Config;
use crate::engine::ordering::{OrderingContext, SessionPriority, SubjectOrdering};
use crate::engine::question_type::QuestionType;
use crate::engine::srs_registry::SrsRegistry;
use crate::engine::subject::{Subject, SubjectId};
use crate::error::{SessionError, SessionResult};
use crate::store::Backend;

use item::{SessionItem, SessionItemState};
use question::{AnsweredQuestion, Question};
use report::{ItemReport, StageChange};
use state::{QuestionChoiceReason, SessionState, SessionType};

/// Answered questions kept for undo.
pub const HISTORY_LIMIT: usize = 100;

/// Selections a missed or skipped item sits out before it is offered again.
pub const CHOICE_DELAY: u32 = 3;

/// Started items after which new items are held back.
pub const WARMUP_LIMIT: usize = 10;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct SessionFlags {
    pub onkun: bool,
    pub back_to_back: bool,
    pub reading_first: bool,
    pub meaning_first: bool,
    /// Finished items wait as pending until an explicit flush.
    pub delayed: bool,
}

/// The study session. One per process; all mutation goes through `&mut self`.
pub struct Session {
    config: Config,
    srs: SrsRegistry,
    backend: Box<dyn Backend>,
    rng: SmallRng,
    loaded: bool,
    session_type: SessionType,
    state: SessionState,
    flags: SessionFlags,
    ordering: SubjectOrdering,
    items: Vec<SessionItem>,
    subjects: HashMap<SubjectId, Subject>,
    questions: Vec<Question>,
    history: VecDeque<AnsweredQuestion>,
    current: Option<Question>,
    current_item: Option<usize>,
    choice_reason: QuestionChoiceReason,
    answered: bool,
    correct: bool,
    last_finished_subject_id: Option<SubjectId>,
    stage_change: Option<StageChange>,
}

impl Session {
    pub fn new(config: Config, srs: SrsRegistry, backend: Box<dyn Backend>) -> Self {
        Self {
            config,
            srs,
            backend,
            rng: SmallRng::from_entropy(),
            loaded: false,
            session_type: SessionType::None,
            state: SessionState::Inactive,
            flags: SessionFlags::default(),
            ordering: SubjectOrdering::shuffled(),
            items: Vec::new(),
            subjects: HashMap::new(),
            questions: Vec::new(),
            history: VecDeque::new(),
            current: None,
            current_item: None,
            choice_reason: QuestionChoiceReason::default(),
            answered: false,
            correct: false,
            last_finished_subject_id: None,
            stage_change: None,
        }
    }

    /// Deterministic question choice and shuffling.
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.rng = SmallRng::seed_from_u64(seed);
        self
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    pub fn srs(&self) -> &SrsRegistry {
        &self.srs
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn state(&self) -> SessionState {
        self.state
    }

    pub fn flags(&self) -> SessionFlags {
        self.flags
    }

    pub fn is_loaded(&self) -> bool {
        self.loaded
    }

    pub fn is_inactive(&self) -> bool {
        self.state == SessionState::Inactive
    }

    pub fn is_active(&self) -> bool {
        self.state == SessionState::Active
    }

    pub fn is_finishing(&self) -> bool {
        self.state == SessionState::Finishing
    }

    pub fn is_in_lesson_presentation(&self) -> bool {
        self.state == SessionState::InLessonPresentation
    }

    pub fn is_answered(&self) -> bool {
        self.answered
    }

    pub fn is_correct(&self) -> bool {
        self.correct
    }

    pub fn items(&self) -> &[SessionItem] {
        &self.items
    }

    pub fn questions(&self) -> &[Question] {
        &self.questions
    }

    pub fn history_len(&self) -> usize {
        self.history.len()
    }

    pub fn subject(&self, id: SubjectId) -> Option<&Subject> {
        self.subjects.get(&id)
    }

    pub fn find_item(&self, id: SubjectId) -> Option<&SessionItem> {
        self.items.iter().find(|item| item.id == id)
    }

    pub fn current_question(&self) -> Option<Question> {
        self.current
    }

    pub fn current_question_type(&self) -> Option<QuestionType> {
        self.current.map(|q| q.kind)
    }

    pub fn current_item(&self) -> Option<&SessionItem> {
        self.current_item.and_then(|i| self.items.get(i))
    }

    pub fn current_subject(&self) -> Option<&Subject> {
        self.current_item().and_then(|item| self.subjects.get(&item.id))
    }

    pub fn choice_reason(&self) -> QuestionChoiceReason {
        self.choice_reason
    }

    pub fn last_finished_subject_id(&self) -> Option<SubjectId> {
        self.last_finished_subject_id
    }

    /// Stage movement of the item the last correct answer finished, if any.
    pub fn stage_change(&self) -> Option<&StageChange> {
        self.stage_change.as_ref()
    }

    pub fn num_active_items(&self) -> usize {
        self.items.iter().filter(|i| i.is_active()).count()
    }

    pub fn num_pending_items(&self) -> usize {
        self.items.iter().filter(|i| i.is_pending()).count()
    }

    pub fn num_finished_items(&self) -> usize {
        self.items
            .iter()
            .filter(|i| i.is_pending() || i.is_reported())
            .count()
    }

    pub fn num_live_items(&self) -> usize {
        self.items.iter().filter(|i| !i.is_abandoned()).count()
    }

    pub fn num_started_items(&self) -> usize {
        self.items.iter().filter(|i| i.is_started()).count()
    }

    pub fn num_reported_items(&self) -> usize {
        self.items.iter().filter(|i| i.is_reported()).count()
    }

    pub fn can_be_abandoned(&self) -> bool {
        self.state != SessionState::Inactive
    }

    pub fn can_be_wrapped_up(&self) -> bool {
        self.state == SessionState::Active && self.num_started_items() < self.num_active_items()
    }

    pub fn is_on_first_lesson_item(&self) -> bool {
        self.current_item == Some(0)
    }

    pub fn is_on_last_lesson_item(&self) -> bool {
        self.current_item
            .is_some_and(|i| i + 1 == self.items.len())
    }

    /// "3/5" while browsing lessons, otherwise finished over live items,
    /// prefixed once every remaining item has been started.
    pub fn progress_text(&self) -> String {
        if self.is_in_lesson_presentation() {
            let position = self.current_item.map_or(0, |i| i + 1);
            return format!("{}/{}", position, self.items.len());
        }
        let wrapping_up = self.is_active() && self.num_started_items() >= self.num_active_items();
        let prefix = if wrapping_up { "Wrapup: " } else { "" };
        format!(
            "{}{}/{}",
            prefix,
            self.num_finished_items(),
            self.num_live_items()
        )
    }

    fn now(&self) -> DateTime<Utc> {
        Utc::now()
    }

    pub fn start_lesson(&mut self, subjects: Vec<Subject>) -> SessionResult<()> {
        self.start(SessionType::Lesson, subjects)
    }

    pub fn start_review(&mut self, subjects: Vec<Subject>) -> SessionResult<()> {
        self.start(SessionType::Review, subjects)
    }

    pub fn start_self_study(&mut self, subjects: Vec<Subject>) -> SessionResult<()> {
        self.start(SessionType::SelfStudy, subjects)
    }

    fn start(&mut self, session_type: SessionType, subjects: Vec<Subject>) -> SessionResult<()> {
        if subjects.is_empty() {
            return Err(SessionError::NoSubjects { session_type });
        }
        info!(session_type = session_type.label(), candidates = subjects.len(), "starting session");

        self.session_type = session_type;
        self.configure(self.config.onkun);
        if let Err(e) = self.backend.set_session_type(session_type, self.flags.onkun) {
            warn!("failed to persist session type: {e:#}");
        }

        let settings = self.config.session_settings(session_type);
        self.populate_items(subjects, settings.max_size, settings.shuffle);
        self.create_questions();
        self.history.clear();
        self.answered = false;
        self.correct = false;
        self.stage_change = None;
        self.last_finished_subject_id = None;
        self.state = if session_type == SessionType::Lesson {
            SessionState::InLessonPresentation
        } else {
            SessionState::Active
        };
        self.set_current(
            None,
            None,
            match session_type {
                SessionType::Lesson => QuestionChoiceReason::StartingLessonSession,
                SessionType::SelfStudy => QuestionChoiceReason::StartingSelfStudySession,
                _ => QuestionChoiceReason::StartingReviewSession,
            },
        );
        self.check_questions();
        self.loaded = true;
        Ok(())
    }

    /// Resolve per-type flags and the ordering for the current session type.
    fn configure(&mut self, onkun: bool) {
        let settings = self.config.session_settings(self.session_type);
        self.flags = SessionFlags {
            onkun,
            back_to_back: settings.back_to_back,
            reading_first: settings.reading_first,
            meaning_first: settings.meaning_first,
            delayed: self.config.delay_result_upload,
        };

        let user_level = self.backend.user_level();
        let max_level = self.backend.max_level_granted();
        let level_up_ids = if settings.priority == SessionPriority::LevelUpFirst {
            self.backend.level_up_ids().unwrap_or_else(|e| {
                warn!("failed to collect level-up subjects: {e:#}");
                Default::default()
            })
        } else {
            Default::default()
        };
        let context = OrderingContext {
            now: self.now(),
            user_level,
            overdue_threshold: self.config.overdue_threshold,
            level_up_ids,
        };
        self.ordering = SubjectOrdering::compose(
            settings.base_keys,
            settings.reversed,
            settings.overdue_first,
            settings.priority.key(user_level, max_level),
            context,
        );
    }

    /// Rebuild the session from persisted rows. Runs at most once per process.
    pub fn load(&mut self) {
        if self.loaded {
            return;
        }
        self.loaded = true;

        let properties = match self.backend.properties() {
            Ok(p) => p,
            Err(e) => {
                warn!("failed to read session properties: {e:#}");
                return;
            }
        };
        self.session_type = properties.session_type;
        if self.session_type == SessionType::None {
            return;
        }
        self.configure(properties.onkun);

        let mut rows = self.backend.load_items().unwrap_or_else(|e| {
            warn!("failed to read session items: {e:#}");
            Vec::new()
        });
        rows.sort_by_key(|row| row.order);
        let ids: Vec<SubjectId> = rows.iter().map(|row| row.id).collect();
        let mut subjects = self.backend.session_subjects(&ids).unwrap_or_else(|e| {
            warn!("failed to read session subjects: {e:#}");
            HashMap::new()
        });

        let now = self.now();
        self.items.clear();
        self.history.clear();
        for row in rows {
            match subjects.get(&row.id) {
                Some(subject) if self.session_type.is_eligible(subject, now) => self.items.push(row),
                _ => {}
            }
        }
        subjects.retain(|id, _| self.items.iter().any(|item| item.id == *id));
        self.subjects = subjects;
        info!(session_type = self.session_type.label(), items = self.items.len(), "loaded session");
        if self.items.is_empty() {
            return;
        }

        self.create_questions();
        self.state = if self.session_type == SessionType::Lesson && self.num_started_items() == 0 {
            SessionState::InLessonPresentation
        } else {
            SessionState::Active
        };
        self.check_questions();
        self.last_finished_subject_id = None;

        let Some(current_id) = properties.current_item_id else {
            return;
        };
        if self.is_in_lesson_presentation() {
            if let Some(index) = self
                .items
                .iter()
                .position(|item| item.is_active() && item.id == current_id)
            {
                let question = self.lesson_question(index);
                self.set_current(question, Some(index), QuestionChoiceReason::Load);
            }
        } else {
            let restored = self.questions.iter().copied().find(|q| {
                let item = &self.items[q.item];
                item.is_active()
                    && !q.is_finished(item)
                    && item.id == current_id
                    && Some(q.kind) == properties.current_question_type
            });
            if let Some(q) = restored {
                self.set_current(Some(q), Some(q.item), QuestionChoiceReason::Load);
            }
        }
    }

    /// Flush pending results and clear everything back to inactive.
    pub fn finish(&mut self) {
        info!(session_type = self.session_type.label(), "finishing session");
        self.flush_pending();
        self.reset();
        self.choice_reason = QuestionChoiceReason::Finished;
        self.session_type = SessionType::None;
        if let Err(e) = self.backend.delete_items() {
            warn!("failed to delete session items: {e:#}");
        }
        if let Err(e) = self.backend.set_session_type(SessionType::None, false) {
            warn!("failed to clear session type: {e:#}");
        }
        if let Err(e) = self.backend.set_current(None, None) {
            warn!("failed to clear current item: {e:#}");
        }
    }

    /// Drop in-memory state without touching the store.
    pub fn reset(&mut self) {
        self.items.clear();
        self.subjects.clear();
        self.questions.clear();
        self.history.clear();
        self.current = None;
        self.current_item = None;
        self.answered = false;
        self.correct = false;
        self.stage_change = None;
        self.state = SessionState::Inactive;
    }

    /// Report every pending item. Returns how many were reported.
    pub fn flush_pending(&mut self) -> usize {
        let pending: Vec<usize> = (0..self.items.len())
            .filter(|&i| self.items[i].is_pending())
            .collect();
        for &index in &pending {
            self.report_item(index);
        }
        if !pending.is_empty() {
            info!(count = pending.len(), "flushed pending items");
        }
        pending.len()
    }

    /// Abandon unstarted items so the session ends once the started ones are done.
    pub fn wrapup(&mut self) {
        info!("wrapping up session");
        if self.is_in_lesson_presentation() {
            self.finish();
            return;
        }
        for index in 0..self.items.len() {
            let item = &mut self.items[index];
            if item.is_active() && !item.is_started() {
                item.state = SessionItemState::Abandoned;
                self.save_item(index);
            }
        }
        if self
            .current_item()
            .is_some_and(|item| item.is_abandoned())
        {
            self.set_current(None, None, QuestionChoiceReason::Wrapup);
        }
        self.check_questions();
    }

    /// A subject changed outside the session, usually through a sync.
    pub fn on_subject_change(&mut self, subject: Subject) {
        let Some(index) = self.items.iter().position(|item| item.id == subject.id) else {
            return;
        };
        let eligible = self.session_type.is_eligible(&subject, self.now());
        let patched = subject.assignment_patched;
        self.subjects.insert(subject.id, subject);
        if !self.items[index].is_alive() || self.is_inactive() || patched || eligible {
            return;
        }
        debug!(subject_id = self.items[index].id, "subject no longer eligible, abandoning");
        self.items[index].state = SessionItemState::Abandoned;
        self.save_item(index);
        self.check_questions();
    }

    /// Whether a subject is part of this session.
    pub fn is_interested_in_subject(&self, id: SubjectId) -> bool {
        self.items.iter().any(|item| item.id == id)
    }

    pub(crate) fn set_current(
        &mut self,
        question: Option<Question>,
        item: Option<usize>,
        reason: QuestionChoiceReason,
    ) {
        self.current = question;
        self.current_item = item;
        self.choice_reason = reason;
    }

    /// Remember the current pointer so a restart can resume on it.
    pub(crate) fn persist_current(&mut self) {
        let id = self.current_item.map(|i| self.items[i].id);
        let kind = self.current.map(|q| q.kind);
        if let Err(e) = self.backend.set_current(id, kind) {
            warn!("failed to persist current item: {e:#}");
        }
    }

    pub(crate) fn save_item(&mut self, index: usize) {
        if let Err(e) = self.backend.save_item(&self.items[index]) {
            warn!(subject_id = self.items[index].id, "failed to save session item: {e:#}");
        }
    }

    pub(crate) fn build_report(&self, index: usize) -> ItemReport {
        let item = &self.items[index];
        let new_stage = if self.session_type == SessionType::Lesson {
            self.srs.system(item.srs_system_id).first_started_stage()
        } else {
            item.new_srs_stage(&self.srs)
        };
        ItemReport {
            subject_id: item.id,
            assignment_id: item.assignment_id,
            session_type: self.session_type,
            meaning_incorrect: item.meaning_incorrect(),
            reading_incorrect: item.reading_incorrect(),
            new_stage_id: new_stage.id,
            answered_at: item.last_answer.unwrap_or_else(Utc::now),
        }
    }

    /// Hand a finished item to the report sink and mark it reported.
    pub(crate) fn report_item(&mut self, index: usize) {
        if self.session_type.is_reporting_task_needed() {
            let report = self.build_report(index);
            if let Err(e) = self.backend.report(report) {
                warn!(subject_id = self.items[index].id, "failed to queue report: {e:#}");
            }
        }
        debug!(subject_id = self.items[index].id, "item reported");
        self.items[index].state = SessionItemState::Reported;
        self.save_item(index);
    }
}


#[cfg(test)]
mod tests {
    use super::test_support::*;
    use super::*;
    use crate::store::SessionStore;

    #[test]
    fn test_start_with_no_subjects_is_an_error() {
        let (mut session, _) = session_with(Config::default(), Vec::new());
        let err = session.start_review(Vec::new()).unwrap_err();
        assert!(matches!(err, SessionError::NoSubjects { session_type: SessionType::Review }));
        assert!(session.is_inactive());
    }

    #[test]
    fn test_start_review_persists_rows_and_type() {
        let (mut session, store) = session_with(Config::default(), deck());
        session.start_review(deck()).unwrap();
        assert!(session.is_active());
        assert_eq!(session.items().len(), 3);
        // radical 1 question, kanji 2, vocab 2
        assert_eq!(session.questions().len(), 5);
        assert_eq!(store.items().len(), 3);
        let props = store.properties().unwrap();
        assert_eq!(props.session_type, SessionType::Review);
        assert_eq!(session.progress_text(), "0/3");
    }

    #[test]
    fn test_start_lesson_enters_presentation() {
        let (mut session, _) = session_with(Config::default(), deck());
        session.start_lesson(deck()).unwrap();
        assert!(session.is_in_lesson_presentation());
        assert!(session.current_question().is_none());
        session.choose_question();
        assert!(session.is_on_first_lesson_item());
        assert_eq!(session.progress_text(), "1/3");
    }

    #[test]
    fn test_max_size_trims_selection() {
        let mut config = Config::default();
        config.review.max_size = 2;
        let (mut session, _) = session_with(config, deck());
        session.start_review(deck()).unwrap();
        assert_eq!(session.items().len(), 2);
    }

    #[test]
    fn test_finish_clears_everything() {
        let mut config = Config::default();
        config.delay_result_upload = true;
        let (mut session, store) = session_with(config, deck());
        session.start_review(vec![radical(1, 1, "Ground")]).unwrap();
        session.choose_question();
        assert!(session.submit("ground").ok);
        assert_eq!(session.num_pending_items(), 1);
        assert!(store.reports().is_empty());

        session.finish();
        assert!(session.is_inactive());
        assert_eq!(session.session_type(), SessionType::None);
        assert!(session.items().is_empty());
        assert!(store.items().is_empty());
        assert_eq!(store.reports().len(), 1);
        assert_eq!(store.properties().unwrap().session_type, SessionType::None);
    }

    #[test]
    fn test_self_study_does_not_report() {
        let (mut session, store) = session_with(Config::default(), deck());
        session.start_self_study(vec![radical(1, 1, "Ground")]).unwrap();
        session.choose_question();
        assert!(session.submit("ground").ok);
        assert_eq!(session.num_reported_items(), 1);
        assert!(store.reports().is_empty());
    }

    #[test]
    fn test_review_report_carries_counts_and_stage() {
        let (mut session, store) = session_with(Config::default(), deck());
        session.start_review(vec![kanji(2, 1, "Big", "だい")]).unwrap();
        loop {
            session.choose_question();
            let Some(q) = session.current_question() else { break };
            if q.kind.is_meaning() && session.items()[0].meaning_incorrect() == 0 {
                session.submit_dont_know();
            } else {
                let answer = answer_for(&session, q);
                assert!(session.submit(&answer).ok);
            }
            session.advance();
        }
        assert!(session.is_finishing());
        let reports = store.reports();
        assert_eq!(reports.len(), 1);
        assert_eq!(reports[0].subject_id, 2);
        assert_eq!(reports[0].meaning_incorrect, 1);
        assert_eq!(reports[0].reading_incorrect, 0);
        // Apprentice II with one miss drops to Apprentice I
        assert_eq!(reports[0].new_stage_id, 1);
        assert_eq!(reports[0].session_type, SessionType::Review);
    }

    #[test]
    fn test_lesson_report_uses_first_started_stage() {
        let mut lesson = radical(1, 1, "Ground");
        lesson.srs_stage_id = 0;
        let (mut session, store) = session_with(Config::default(), vec![lesson.clone()]);
        session.start_lesson(vec![lesson]).unwrap();
        session.start_quiz();
        session.choose_question();
        assert!(session.submit("ground").ok);
        assert_eq!(store.reports()[0].new_stage_id, 1);
    }

    #[test]
    fn test_wrapup_abandons_unstarted_items() {
        let (mut session, store) = session_with(Config::default(), deck());
        session.start_review(deck()).unwrap();
        session.choose_question();
        let q = session.current_question().unwrap();
        session.submit_dont_know();
        session.advance();
        assert!(session.can_be_wrapped_up());

        session.wrapup();
        assert_eq!(session.num_live_items(), 1);
        assert!(!session.can_be_wrapped_up());
        assert!(session.progress_text().starts_with("Wrapup: "));
        assert!(session.questions().iter().all(|pq| pq.item == q.item));
        let abandoned = store.items().iter().filter(|i| i.is_abandoned()).count();
        assert_eq!(abandoned, 2);
    }

    #[test]
    fn test_wrapup_in_presentation_finishes() {
        let (mut session, _) = session_with(Config::default(), deck());
        session.start_lesson(deck()).unwrap();
        session.wrapup();
        assert!(session.is_inactive());
    }

    #[test]
    fn test_on_subject_change_abandons_ineligible_item() {
        let (mut session, store) = session_with(Config::default(), deck());
        session.start_review(deck()).unwrap();

        let mut patched = kanji(2, 1, "Big", "だい");
        patched.available_at = None;
        patched.assignment_patched = true;
        session.on_subject_change(patched.clone());
        assert!(session.find_item(2).unwrap().is_active());

        patched.assignment_patched = false;
        session.on_subject_change(patched);
        assert!(session.find_item(2).unwrap().is_abandoned());
        assert!(session.questions().iter().all(|q| session.items()[q.item].id != 2));
        assert!(store.items().iter().any(|i| i.id == 2 && i.is_abandoned()));
        assert_eq!(session.num_live_items(), 2);
    }

    #[test]
    fn test_load_is_guarded() {
        let (mut session, store) = session_with(Config::default(), deck());
        session.start_review(deck()).unwrap();

        let mut restarted =
            Session::new(Config::default(), SrsRegistry::default(), Box::new(store.clone())).with_seed(1);
        restarted.load();
        assert!(restarted.is_loaded());
        assert!(restarted.is_active());
        assert_eq!(restarted.items().len(), 3);
        restarted.finish();
        restarted.load();
        assert!(restarted.is_inactive());
    }

    #[test]
    fn test_load_without_session_stays_inactive() {
        let (mut session, _) = session_with(Config::default(), deck());
        session.load();
        assert!(session.is_loaded());
        assert!(session.is_inactive());
        assert_eq!(session.session_type(), SessionType::None);
    }
}
