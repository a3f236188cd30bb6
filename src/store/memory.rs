use std::cell::RefCell;
use std::rc::Rc;

use anyhow::Result;

use crate::engine::subject::{Subject, SubjectId};
use crate::session::item::SessionItem;
use crate::session::report::{ItemReport, ReportSink};

use super::{SessionProperties, SessionStore, SubjectProvider};

#[derive(Debug, Default)]
struct MemoryState {
    subjects: Vec<Subject>,
    user_level: u32,
    max_level_granted: u32,
    items: Vec<SessionItem>,
    properties: SessionProperties,
    reports: Vec<ItemReport>,
}

/// In-process backend. Clones share state, so a test can hand one clone to
/// a session and keep another to inspect rows or rebuild a session from them.
#[derive(Clone, Debug, Default)]
pub struct MemoryStore {
    state: Rc<RefCell<MemoryState>>,
}

impl MemoryStore {
    pub fn new(subjects: Vec<Subject>, user_level: u32, max_level_granted: u32) -> Self {
        Self {
            state: Rc::new(RefCell::new(MemoryState {
                subjects,
                user_level,
                max_level_granted,
                ..MemoryState::default()
            })),
        }
    }

    pub fn reports(&self) -> Vec<ItemReport> {
        self.state.borrow().reports.clone()
    }

    pub fn items(&self) -> Vec<SessionItem> {
        self.state.borrow().items.clone()
    }

    /// Replace a subject, as a sync would.
    pub fn update_subject(&self, subject: Subject) {
        let mut state = self.state.borrow_mut();
        match state.subjects.iter_mut().find(|s| s.id == subject.id) {
            Some(existing) => *existing = subject,
            None => state.subjects.push(subject),
        }
    }

    pub fn subject(&self, id: SubjectId) -> Option<Subject> {
        self.state.borrow().subjects.iter().find(|s| s.id == id).cloned()
    }
}

impl SessionStore for MemoryStore {
    fn load_items(&self) -> Result<Vec<SessionItem>> {
        Ok(self.state.borrow().items.clone())
    }

    fn replace_items(&mut self, items: &[SessionItem]) -> Result<()> {
        self.state.borrow_mut().items = items.to_vec();
        Ok(())
    }

    fn save_item(&mut self, item: &SessionItem) -> Result<()> {
        let mut state = self.state.borrow_mut();
        match state.items.iter_mut().find(|i| i.id == item.id) {
            Some(row) => *row = item.clone(),
            None => state.items.push(item.clone()),
        }
        Ok(())
    }

    fn delete_items(&mut self) -> Result<()> {
        self.state.borrow_mut().items.clear();
        Ok(())
    }

    fn properties(&self) -> Result<SessionProperties> {
        Ok(self.state.borrow().properties.clone())
    }

    fn save_properties(&mut self, properties: &SessionProperties) -> Result<()> {
        self.state.borrow_mut().properties = properties.clone();
        Ok(())
    }
}

impl SubjectProvider for MemoryStore {
    fn all_subjects(&self) -> Result<Vec<Subject>> {
        Ok(self.state.borrow().subjects.clone())
    }

    fn user_level(&self) -> u32 {
        self.state.borrow().user_level
    }

    fn max_level_granted(&self) -> u32 {
        self.state.borrow().max_level_granted
    }
}

impl ReportSink for MemoryStore {
    fn report(&mut self, report: ItemReport) -> Result<()> {
        self.state.borrow_mut().reports.push(report);
        Ok(())
    }
}
