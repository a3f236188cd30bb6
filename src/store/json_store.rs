use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, bail};
use chrono::{DateTime, Duration, DurationRound, Utc};
use serde::{Serialize, de::DeserializeOwned};
use tracing::{debug, warn};

use crate::engine::srs_registry::SrsRegistry;
use crate::engine::subject::Subject;
use crate::session::item::SessionItem;
use crate::session::report::{ItemReport, ReportSink};
use crate::session::state::SessionType;
use crate::store::schema::{DeckData, ReportQueueData, SessionItemsData, SessionPropertiesData};

use super::{SessionProperties, SessionStore, SubjectProvider};

const ITEMS_FILE: &str = "session_items.json";
const PROPERTIES_FILE: &str = "session_properties.json";
const REPORTS_FILE: &str = "pending_reports.json";
const DECK_FILE: &str = "subjects.json";

/// File-backed store. The deck is read once and kept in memory; session rows
/// and reports are read and written through on every call.
pub struct JsonStore {
    base_dir: PathBuf,
    deck: DeckData,
}

impl JsonStore {
    pub fn new() -> Result<Self> {
        let base_dir = dirs::data_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("kanjiq");
        Self::with_base_dir(base_dir)
    }

    pub fn with_base_dir(base_dir: PathBuf) -> Result<Self> {
        fs::create_dir_all(&base_dir)
            .with_context(|| format!("creating data directory {}", base_dir.display()))?;
        let mut store = Self {
            base_dir,
            deck: DeckData::default(),
        };
        store.deck = store.load(DECK_FILE);
        if store.deck.needs_reset() {
            warn!("stored deck has an old schema version, starting empty");
            store.deck = DeckData::default();
        }
        Ok(store)
    }

    pub fn base_dir(&self) -> &Path {
        &self.base_dir
    }

    fn file_path(&self, name: &str) -> PathBuf {
        self.base_dir.join(name)
    }

    fn load<T: DeserializeOwned + Default>(&self, name: &str) -> T {
        let path = self.file_path(name);
        if path.exists() {
            match fs::read_to_string(&path) {
                Ok(content) => serde_json::from_str(&content).unwrap_or_else(|e| {
                    warn!(file = name, "unreadable store file, using defaults: {e}");
                    T::default()
                }),
                Err(_) => T::default(),
            }
        } else {
            T::default()
        }
    }

    fn save<T: Serialize>(&self, name: &str, data: &T) -> Result<()> {
        let path = self.file_path(name);
        let tmp_path = path.with_extension("tmp");

        let json = serde_json::to_string_pretty(data)?;
        let mut file = fs::File::create(&tmp_path)?;
        file.write_all(json.as_bytes())?;
        file.sync_all()?;

        fs::rename(&tmp_path, &path)?;
        Ok(())
    }

    fn items_data(&self) -> SessionItemsData {
        let data: SessionItemsData = self.load(ITEMS_FILE);
        if data.needs_reset() {
            warn!("session items have an old schema version, discarding");
            return SessionItemsData::default();
        }
        data
    }

    pub fn deck(&self) -> &DeckData {
        &self.deck
    }

    pub fn save_deck(&mut self, deck: DeckData) -> Result<()> {
        self.save(DECK_FILE, &deck)?;
        self.deck = deck;
        Ok(())
    }

    /// Read a deck file from anywhere and make it the stored deck.
    pub fn import_deck(&mut self, path: &Path) -> Result<usize> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading deck {}", path.display()))?;
        let deck: DeckData = serde_json::from_str(&content)
            .with_context(|| format!("parsing deck {}", path.display()))?;
        if deck.needs_reset() {
            bail!(
                "Unsupported deck schema version: {} in {}",
                deck.schema_version,
                path.display()
            );
        }
        let count = deck.subjects.len();
        self.save_deck(deck)?;
        Ok(count)
    }

    pub fn pending_reports(&self) -> Vec<ItemReport> {
        let data: ReportQueueData = self.load(REPORTS_FILE);
        if data.needs_reset() {
            return Vec::new();
        }
        data.reports
    }

    /// Apply every queued report to the stored deck, as the remote service
    /// would, and empty the queue. Returns how many were applied.
    pub fn sync_reports(&mut self, srs: &SrsRegistry) -> Result<usize> {
        let reports = self.pending_reports();
        if reports.is_empty() {
            return Ok(0);
        }
        let mut deck = self.deck.clone();
        for report in &reports {
            match deck.subjects.iter_mut().find(|s| s.id == report.subject_id) {
                Some(subject) => apply_report(subject, report, srs),
                None => warn!(subject_id = report.subject_id, "report for unknown subject"),
            }
        }
        deck.updated_at = Some(Utc::now());
        self.save_deck(deck)?;
        self.save(REPORTS_FILE, &ReportQueueData::default())?;
        Ok(reports.len())
    }
}

/// Move a subject's assignment the way a finished lesson or review does.
pub fn apply_report(subject: &mut Subject, report: &ItemReport, srs: &SrsRegistry) {
    let ts = report.answered_at;
    let system = srs.system(subject.srs_system_id);
    let new_stage = match report.session_type {
        SessionType::Lesson => {
            subject.started_at = Some(ts);
            system.first_started_stage()
        }
        _ => system.stage(report.new_stage_id),
    };
    subject.srs_stage_id = new_stage.id;
    if new_stage.is_completed() {
        subject.burned_at.get_or_insert(ts);
        subject.available_at = None;
    } else {
        subject.available_at = Some(next_available(ts, new_stage.interval_ms));
    }
    if new_stage.is_passed() && subject.passed_at.is_none() {
        subject.passed_at = Some(ts);
    }
    subject.assignment_patched = true;
}

/// Reviews come due at the top of the hour after the interval has elapsed.
fn next_available(ts: DateTime<Utc>, interval_ms: u64) -> DateTime<Utc> {
    let available = ts + Duration::milliseconds(interval_ms as i64) + Duration::seconds(30);
    available
        .duration_trunc(Duration::hours(1))
        .unwrap_or(available)
}

impl SessionStore for JsonStore {
    fn load_items(&self) -> Result<Vec<SessionItem>> {
        Ok(self.items_data().items)
    }

    fn replace_items(&mut self, items: &[SessionItem]) -> Result<()> {
        let data = SessionItemsData {
            items: items.to_vec(),
            ..SessionItemsData::default()
        };
        self.save(ITEMS_FILE, &data)
    }

    fn save_item(&mut self, item: &SessionItem) -> Result<()> {
        let mut data = self.items_data();
        match data.items.iter_mut().find(|row| row.id == item.id) {
            Some(row) => *row = item.clone(),
            None => data.items.push(item.clone()),
        }
        self.save(ITEMS_FILE, &data)
    }

    fn delete_items(&mut self) -> Result<()> {
        self.save(ITEMS_FILE, &SessionItemsData::default())
    }

    fn properties(&self) -> Result<SessionProperties> {
        let data: SessionPropertiesData = self.load(PROPERTIES_FILE);
        if data.needs_reset() {
            return Ok(SessionProperties::default());
        }
        Ok(data.properties)
    }

    fn save_properties(&mut self, properties: &SessionProperties) -> Result<()> {
        let data = SessionPropertiesData {
            properties: properties.clone(),
            ..SessionPropertiesData::default()
        };
        self.save(PROPERTIES_FILE, &data)
    }
}

impl SubjectProvider for JsonStore {
    fn all_subjects(&self) -> Result<Vec<Subject>> {
        Ok(self.deck.subjects.clone())
    }

    fn user_level(&self) -> u32 {
        self.deck.user_level
    }

    fn max_level_granted(&self) -> u32 {
        self.deck.max_level_granted
    }

    fn matching_kanji(&self, characters: &str) -> Result<Option<Subject>> {
        if characters.is_empty() {
            return Ok(None);
        }
        Ok(self
            .deck
            .subjects
            .iter()
            .find(|s| s.is_kanji() && s.characters == characters)
            .cloned())
    }
}

impl ReportSink for JsonStore {
    fn report(&mut self, report: ItemReport) -> Result<()> {
        debug!(subject_id = report.subject_id, "queueing report");
        let mut data: ReportQueueData = self.load(REPORTS_FILE);
        if data.needs_reset() {
            data = ReportQueueData::default();
        }
        data.reports.push(report);
        self.save(REPORTS_FILE, &data)
    }
}
