use std::cmp::Ordering;
use std::collections::HashSet;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::srs_registry::SrsRegistry;
use super::subject::{Subject, SubjectId};

/// One comparison criterion over subjects. Flag keys sort matching subjects first.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SortKey {
    Level,
    Type,
    SrsStage,
    RadicalsFirst,
    OverdueFirst,
    LevelUpFirst,
    CurrentLevelRadicalKanjiFirst,
    CurrentLevelFirst,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct OrderKey {
    pub key: SortKey,
    pub descending: bool,
}

impl OrderKey {
    pub fn asc(key: SortKey) -> Self {
        Self { key, descending: false }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReviewOrder {
    #[default]
    Shuffle,
    Level,
    Type,
    Srs,
    LevelThenType,
    LevelThenSrs,
    TypeThenLevel,
    TypeThenSrs,
    SrsThenType,
    SrsThenLevel,
    LevelThenTypeThenSrs,
    LevelThenSrsThenType,
    TypeThenLevelThenSrs,
    TypeThenSrsThenLevel,
    SrsThenTypeThenLevel,
    SrsThenLevelThenType,
}

impl ReviewOrder {
    pub fn keys(self) -> &'static [SortKey] {
        use SortKey::{Level as L, SrsStage as S, Type as T};
        match self {
            ReviewOrder::Shuffle => &[],
            ReviewOrder::Level => &[L],
            ReviewOrder::Type => &[T],
            ReviewOrder::Srs => &[S],
            ReviewOrder::LevelThenType => &[L, T],
            ReviewOrder::LevelThenSrs => &[L, S],
            ReviewOrder::TypeThenLevel => &[T, L],
            ReviewOrder::TypeThenSrs => &[T, S],
            ReviewOrder::SrsThenType => &[S, T],
            ReviewOrder::SrsThenLevel => &[S, L],
            ReviewOrder::LevelThenTypeThenSrs => &[L, T, S],
            ReviewOrder::LevelThenSrsThenType => &[L, S, T],
            ReviewOrder::TypeThenLevelThenSrs => &[T, L, S],
            ReviewOrder::TypeThenSrsThenLevel => &[T, S, L],
            ReviewOrder::SrsThenTypeThenLevel => &[S, T, L],
            ReviewOrder::SrsThenLevelThenType => &[S, L, T],
        }
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LessonOrder {
    Shuffle,
    #[default]
    LevelThenType,
    RadicalsThenLevelThenType,
    TypeThenLevel,
    LevelThenShuffle,
    TypeThenShuffle,
}

impl LessonOrder {
    pub fn keys(self) -> &'static [SortKey] {
        match self {
            LessonOrder::Shuffle => &[],
            LessonOrder::LevelThenType => &[SortKey::Level, SortKey::Type],
            LessonOrder::RadicalsThenLevelThenType => {
                &[SortKey::RadicalsFirst, SortKey::Level, SortKey::Type]
            }
            LessonOrder::TypeThenLevel => &[SortKey::Type, SortKey::Level],
            LessonOrder::LevelThenShuffle => &[SortKey::Level],
            LessonOrder::TypeThenShuffle => &[SortKey::Type],
        }
    }

    /// Shuffle candidates before the stable sort so ties come out random.
    pub fn is_shuffle(self) -> bool {
        matches!(
            self,
            LessonOrder::Shuffle | LessonOrder::LevelThenShuffle | LessonOrder::TypeThenShuffle
        )
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionPriority {
    #[default]
    None,
    RadicalsFirst,
    LevelUpFirst,
    CurrentLevelRadicalKanjiFirst,
    CurrentLevelFirst,
}

impl SessionPriority {
    /// Key placed in front of the base ordering, if any. Level-up priority
    /// only applies below the maximum level.
    pub fn key(self, user_level: u32, max_level: u32) -> Option<SortKey> {
        match self {
            SessionPriority::None => None,
            SessionPriority::RadicalsFirst => Some(SortKey::RadicalsFirst),
            SessionPriority::LevelUpFirst if user_level >= max_level => None,
            SessionPriority::LevelUpFirst => Some(SortKey::LevelUpFirst),
            SessionPriority::CurrentLevelRadicalKanjiFirst => {
                Some(SortKey::CurrentLevelRadicalKanjiFirst)
            }
            SessionPriority::CurrentLevelFirst => Some(SortKey::CurrentLevelFirst),
        }
    }
}

/// Facts the context-dependent keys read.
#[derive(Clone, Debug)]
pub struct OrderingContext {
    pub now: DateTime<Utc>,
    pub user_level: u32,
    pub overdue_threshold: f64,
    pub level_up_ids: HashSet<SubjectId>,
}

impl Default for OrderingContext {
    fn default() -> Self {
        Self {
            now: Utc::now(),
            user_level: 1,
            overdue_threshold: 0.2,
            level_up_ids: HashSet::new(),
        }
    }
}

/// A comparator built from a key list; the first key that differs decides.
#[derive(Clone, Debug, Default)]
pub struct SubjectOrdering {
    keys: Vec<OrderKey>,
    context: OrderingContext,
}

impl SubjectOrdering {
    /// Compose priority overlay, overdue-first and the (optionally reversed) base keys.
    pub fn compose(
        base: &[SortKey],
        reversed: bool,
        overdue_first: bool,
        priority: Option<SortKey>,
        context: OrderingContext,
    ) -> Self {
        let mut keys = Vec::with_capacity(base.len() + 2);
        if let Some(key) = priority {
            keys.push(OrderKey::asc(key));
        }
        if overdue_first {
            keys.push(OrderKey::asc(SortKey::OverdueFirst));
        }
        keys.extend(base.iter().map(|&key| OrderKey { key, descending: reversed }));
        Self { keys, context }
    }

    pub fn new(keys: Vec<OrderKey>, context: OrderingContext) -> Self {
        Self { keys, context }
    }

    /// Everything compares equal.
    pub fn shuffled() -> Self {
        Self::default()
    }

    pub fn keys(&self) -> &[OrderKey] {
        &self.keys
    }

    pub fn compare(&self, a: &Subject, b: &Subject, srs: &SrsRegistry) -> Ordering {
        for order_key in &self.keys {
            let ord = self.compare_key(order_key.key, a, b, srs);
            let ord = if order_key.descending { ord.reverse() } else { ord };
            if ord != Ordering::Equal {
                return ord;
            }
        }
        Ordering::Equal
    }

    fn compare_key(&self, key: SortKey, a: &Subject, b: &Subject, srs: &SrsRegistry) -> Ordering {
        let ctx = &self.context;
        match key {
            SortKey::Level => a.level.cmp(&b.level),
            SortKey::Type => a.subject_type.order().cmp(&b.subject_type.order()),
            SortKey::SrsStage => {
                let sa = srs.stage(a.srs_system_id, a.srs_stage_id);
                let sb = srs.stage(b.srs_system_id, b.srs_stage_id);
                sa.compare_progress(sb)
            }
            SortKey::RadicalsFirst => flag_first(a, b, Subject::is_radical),
            SortKey::OverdueFirst => flag_first(a, b, |s| {
                let stage = srs.stage(s.srs_system_id, s.srs_stage_id);
                s.is_overdue(stage, ctx.now, ctx.overdue_threshold)
            }),
            SortKey::LevelUpFirst => {
                flag_first(a, b, |s| !s.is_passed() && ctx.level_up_ids.contains(&s.id))
            }
            SortKey::CurrentLevelRadicalKanjiFirst => flag_first(a, b, |s| {
                s.level == ctx.user_level && !s.is_vocabulary()
            }),
            SortKey::CurrentLevelFirst => flag_first(a, b, |s| s.level == ctx.user_level),
        }
    }
}

fn flag_first(a: &Subject, b: &Subject, flag: impl Fn(&Subject) -> bool) -> Ordering {
    flag(b).cmp(&flag(a))
}
