use std::cmp::Ordering;

use serde::{Deserialize, Serialize};

use super::subject::{Subject, SubjectType};

/// Per-session minimum and maximum counts. `None` places no restriction.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectionQuotas {
    #[serde(default)]
    pub current_level_min: Option<u32>,
    #[serde(default)]
    pub current_level_max: Option<u32>,
    #[serde(default)]
    pub earlier_level_min: Option<u32>,
    #[serde(default)]
    pub earlier_level_max: Option<u32>,
    #[serde(default)]
    pub radical_min: Option<u32>,
    #[serde(default)]
    pub radical_max: Option<u32>,
    #[serde(default)]
    pub kanji_min: Option<u32>,
    #[serde(default)]
    pub kanji_max: Option<u32>,
    #[serde(default)]
    pub vocabulary_min: Option<u32>,
    #[serde(default)]
    pub vocabulary_max: Option<u32>,
}

impl SelectionQuotas {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

#[derive(Clone, Copy, Debug, Default)]
struct Quota {
    min: u32,
    max: u32,
    done: u32,
}

impl Quota {
    fn new(min: Option<u32>, max: Option<u32>) -> Self {
        Self {
            min: min.unwrap_or(0),
            max: max.unwrap_or(u32::MAX),
            done: 0,
        }
    }

    fn wants_more(&self) -> bool {
        self.done < self.min
    }

    fn is_full(&self) -> bool {
        self.done >= self.max
    }
}

/// Quota bookkeeping while a session is being filled.
#[derive(Clone, Debug)]
pub struct SubjectSelectionRules {
    user_level: u32,
    current: Quota,
    earlier: Quota,
    radical: Quota,
    kanji: Quota,
    vocabulary: Quota,
    empty: bool,
}

/// Number of relaxation passes `trim_selection` makes.
pub const SELECTION_STAGES: u32 = 5;

impl SubjectSelectionRules {
    pub fn new(quotas: &SelectionQuotas, user_level: u32) -> Self {
        Self {
            user_level,
            current: Quota::new(quotas.current_level_min, quotas.current_level_max),
            earlier: Quota::new(quotas.earlier_level_min, quotas.earlier_level_max),
            radical: Quota::new(quotas.radical_min, quotas.radical_max),
            kanji: Quota::new(quotas.kanji_min, quotas.kanji_max),
            vocabulary: Quota::new(quotas.vocabulary_min, quotas.vocabulary_max),
            empty: quotas.is_empty(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.empty
    }

    fn age_quota(&self, subject: &Subject) -> Option<&Quota> {
        match subject.level.cmp(&self.user_level) {
            Ordering::Equal => Some(&self.current),
            Ordering::Less => Some(&self.earlier),
            Ordering::Greater => None,
        }
    }

    fn type_quota(&self, subject: &Subject) -> &Quota {
        match subject.subject_type {
            SubjectType::Radical => &self.radical,
            SubjectType::Kanji => &self.kanji,
            SubjectType::Vocabulary => &self.vocabulary,
        }
    }

    /// Whether `subject` qualifies in relaxation pass `stage`:
    /// 0 fills an age minimum and a type minimum, 1 fills a minimum without
    /// hitting a maximum, 2 fills a minimum, 3 hits no maximum, 4 anything.
    pub fn is_wanted_for_stage(&self, subject: &Subject, stage: u32) -> bool {
        let age = self.age_quota(subject);
        let kind = self.type_quota(subject);
        let age_min = age.is_some_and(Quota::wants_more);
        let age_max = age.is_some_and(Quota::is_full);
        let type_min = kind.wants_more();
        let type_max = kind.is_full();
        match stage {
            0 => age_min && type_min,
            1 => (age_min || type_min) && !age_max && !type_max,
            2 => age_min || type_min,
            3 => !age_max && !type_max,
            4 => true,
            _ => false,
        }
    }

    pub fn notify_selected(&mut self, subject: &Subject) {
        match subject.level.cmp(&self.user_level) {
            Ordering::Equal => self.current.done += 1,
            Ordering::Less => self.earlier.done += 1,
            Ordering::Greater => {}
        }
        match subject.subject_type {
            SubjectType::Radical => self.radical.done += 1,
            SubjectType::Kanji => self.kanji.done += 1,
            SubjectType::Vocabulary => self.vocabulary.done += 1,
        }
    }
}

/// Pick up to `max_size` subjects from `sorted` honouring the quotas, then
/// restore comparator order within the picked set.
pub fn trim_selection<F>(
    sorted: Vec<Subject>,
    max_size: usize,
    rules: &mut SubjectSelectionRules,
    mut compare: F,
) -> Vec<Subject>
where
    F: FnMut(&Subject, &Subject) -> Ordering,
{
    let mut remaining = sorted;
    let mut selected = Vec::with_capacity(max_size.min(remaining.len()));
    for stage in 0..SELECTION_STAGES {
        let mut i = 0;
        while i < remaining.len() && selected.len() < max_size {
            if rules.is_wanted_for_stage(&remaining[i], stage) {
                let subject = remaining.remove(i);
                rules.notify_selected(&subject);
                selected.push(subject);
            } else {
                i += 1;
            }
        }
    }
    selected.sort_by(|a, b| compare(a, b));
    selected
}

#[cfg(test)]
mod tests {
    use super::*;

    fn subjects(layout: &[(SubjectType, u32)]) -> Vec<Subject> {
        layout.iter()
            .enumerate()
            .map(|(i, &(t, level))| Subject::new(i as u64 + 1, t, level))
            .collect()
    }

    fn by_id(a: &Subject, b: &Subject) -> Ordering {
        a.id.cmp(&b.id)
    }

    #[test]
    fn test_quota_minimums_satisfied() {
        use SubjectType::*;
        let pool = subjects(&[
            (Vocabulary, 3),
            (Vocabulary, 3),
            (Kanji, 3),
            (Kanji, 4),
            (Radical, 2),
            (Vocabulary, 5),
            (Radical, 3),
            (Radical, 1),
            (Kanji, 5),
            (Vocabulary, 5),
        ]);
        let quotas = SelectionQuotas {
            current_level_min: Some(2),
            radical_min: Some(3),
            ..SelectionQuotas::default()
        };
        let mut rules = SubjectSelectionRules::new(&quotas, 5);
        let picked = trim_selection(pool, 5, &mut rules, by_id);
        assert_eq!(picked.len(), 5);
        assert!(picked.iter().filter(|s| s.level == 5).count() >= 2);
        assert!(picked.iter().filter(|s| s.is_radical()).count() >= 3);
        let ids: Vec<u64> = picked.iter().map(|s| s.id).collect();
        let mut sorted_ids = ids.clone();
        sorted_ids.sort();
        assert_eq!(ids, sorted_ids);
    }

    #[test]
    fn test_maximum_respected_until_last_stage() {
        use SubjectType::*;
        let pool = subjects(&[(Vocabulary, 1), (Vocabulary, 1), (Kanji, 1), (Vocabulary, 1)]);
        let quotas = SelectionQuotas {
            vocabulary_max: Some(1),
            ..SelectionQuotas::default()
        };
        let mut rules = SubjectSelectionRules::new(&quotas, 1);
        let picked = trim_selection(pool.clone(), 2, &mut rules, by_id);
        let ids: Vec<u64> = picked.iter().map(|s| s.id).collect();
        assert_eq!(ids, vec![1, 3]);

        // the fill stage ignores the maximum once nothing else is left
        let mut rules = SubjectSelectionRules::new(&quotas, 1);
        let picked = trim_selection(pool, 3, &mut rules, by_id);
        assert_eq!(picked.iter().filter(|s| s.is_vocabulary()).count(), 2);
    }

    #[test]
    fn test_stage_predicates() {
        let quotas = SelectionQuotas {
            current_level_min: Some(1),
            kanji_min: Some(1),
            kanji_max: Some(1),
            ..SelectionQuotas::default()
        };
        let mut rules = SubjectSelectionRules::new(&quotas, 3);
        let kanji = Subject::new(1, SubjectType::Kanji, 3);
        let radical = Subject::new(2, SubjectType::Radical, 3);
        assert!(rules.is_wanted_for_stage(&kanji, 0));
        assert!(!rules.is_wanted_for_stage(&radical, 0));
        assert!(rules.is_wanted_for_stage(&radical, 1));
        rules.notify_selected(&kanji);
        let kanji2 = Subject::new(3, SubjectType::Kanji, 2);
        assert!(!rules.is_wanted_for_stage(&kanji2, 1));
        assert!(!rules.is_wanted_for_stage(&kanji2, 3));
        assert!(rules.is_wanted_for_stage(&kanji2, 4));
        assert!(!rules.is_empty());
        assert!(SubjectSelectionRules::new(&SelectionQuotas::default(), 1).is_empty());
    }
}
