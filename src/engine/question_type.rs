use serde::{Deserialize, Serialize};

use super::fuzzy::fuzzy_matches;
use super::kana::{digraph_match, romaji_to_kana, to_katakana};
use super::subject::{AuxiliaryKind, KanjiAcceptedReadingType, Reading, Subject};
use super::verdict::{AnswerVerdict, CloseEnoughAction, DigraphMatch};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QuestionType {
    RadicalName,
    KanjiMeaning,
    VocabMeaning,
    KanjiReading,
    VocabReading,
    KanjiOnyomi,
    KanjiKunyomi,
}

impl QuestionType {
    pub fn is_meaning(self) -> bool {
        matches!(
            self,
            QuestionType::RadicalName | QuestionType::KanjiMeaning | QuestionType::VocabMeaning
        )
    }

    pub fn is_reading(self) -> bool {
        !self.is_meaning()
    }

    /// Answers must be typed in kana.
    pub fn is_kana(self) -> bool {
        self.is_reading()
    }

    /// Progress slot on the session item, 1 to 4.
    pub fn slot(self) -> usize {
        match self {
            QuestionType::RadicalName | QuestionType::KanjiMeaning | QuestionType::VocabMeaning => 1,
            QuestionType::KanjiReading | QuestionType::VocabReading => 2,
            QuestionType::KanjiOnyomi => 3,
            QuestionType::KanjiKunyomi => 4,
        }
    }

    pub fn short_title(self) -> &'static str {
        match self {
            QuestionType::RadicalName => "Name",
            QuestionType::KanjiMeaning | QuestionType::VocabMeaning => "Meaning",
            QuestionType::KanjiReading | QuestionType::VocabReading => "Reading",
            QuestionType::KanjiOnyomi => "On'yomi",
            QuestionType::KanjiKunyomi => "Kun'yomi",
        }
    }

    pub fn title(self, indicate_accepted_type: bool, accepted: KanjiAcceptedReadingType) -> &'static str {
        match self {
            QuestionType::RadicalName => "Radical Name",
            QuestionType::KanjiMeaning => "Kanji Meaning",
            QuestionType::VocabMeaning => "Vocabulary Meaning",
            QuestionType::KanjiReading if indicate_accepted_type => match accepted {
                KanjiAcceptedReadingType::Onyomi => "Kanji On'yomi",
                KanjiAcceptedReadingType::Kunyomi => "Kanji Kun'yomi",
                _ => "Kanji Reading",
            },
            QuestionType::KanjiReading => "Kanji Reading",
            QuestionType::VocabReading => "Vocabulary Reading",
            QuestionType::KanjiOnyomi => "Kanji On'yomi",
            QuestionType::KanjiKunyomi => "Kanji Kun'yomi",
        }
    }

    /// Judge a non-empty answer for this question type.
    pub fn check_answer(
        self,
        subject: &Subject,
        matching_kanji: Option<&Subject>,
        answer: &str,
        require_on_in_katakana: bool,
        close_enough: CloseEnoughAction,
    ) -> AnswerVerdict {
        match self {
            QuestionType::RadicalName | QuestionType::KanjiMeaning | QuestionType::VocabMeaning => {
                check_meaning(subject, answer, close_enough)
            }
            QuestionType::KanjiReading => check_reading(subject, None, answer, require_on_in_katakana, true),
            QuestionType::VocabReading => {
                check_reading(subject, matching_kanji, answer, require_on_in_katakana, false)
            }
            QuestionType::KanjiOnyomi => check_split_reading(
                subject,
                answer,
                require_on_in_katakana,
                Reading::is_onyomi,
                false,
            ),
            QuestionType::KanjiKunyomi => check_split_reading(
                subject,
                answer,
                require_on_in_katakana,
                Reading::is_kunyomi,
                true,
            ),
        }
    }
}

fn push_unique<'a>(list: &mut Vec<&'a str>, value: &'a str) {
    if !list.contains(&value) {
        list.push(value);
    }
}

fn check_meaning(subject: &Subject, answer: &str, close_enough: CloseEnoughAction) -> AnswerVerdict {
    let mut accepted = Vec::new();
    let mut rejected = Vec::new();
    for m in &subject.meanings {
        push_unique(if m.accepted { &mut accepted } else { &mut rejected }, &m.meaning);
    }
    for m in &subject.auxiliary_meanings {
        match m.kind {
            AuxiliaryKind::Whitelist => push_unique(&mut accepted, &m.meaning),
            AuxiliaryKind::Blacklist => push_unique(&mut rejected, &m.meaning),
        }
    }
    for synonym in &subject.meaning_synonyms {
        push_unique(&mut accepted, synonym);
    }

    let verdict = fuzzy_matches(answer, accepted, rejected, close_enough);
    if verdict.is_hard_miss() {
        // typed the reading instead of the meaning
        let kana = romaji_to_kana(answer);
        if subject.readings.iter().any(|r| r.matches(&kana, false)) {
            return AnswerVerdict::NOK_WITH_RETRY;
        }
    }
    verdict
}

fn reading_digraph(reading: &Reading, answer: &str) -> Option<DigraphMatch> {
    digraph_match(answer, &reading.reading).or_else(|| {
        if reading.is_onyomi() {
            digraph_match(answer, &to_katakana(&reading.reading))
        } else {
            None
        }
    })
}

fn find_digraph<'a>(
    readings: impl IntoIterator<Item = &'a Reading>,
    answer: &str,
) -> Option<AnswerVerdict> {
    readings.into_iter().find_map(|r| {
        reading_digraph(r, answer).map(|m| AnswerVerdict::digraph(answer, &r.reading, m))
    })
}

/// Combined reading question for kanji and vocabulary.
///
/// A valid but non-accepted reading is a plain miss here, unlike the split
/// on'yomi/kun'yomi questions.
fn check_reading(
    subject: &Subject,
    matching_kanji: Option<&Subject>,
    answer: &str,
    require_on_in_katakana: bool,
    digraph_accepted_only: bool,
) -> AnswerVerdict {
    if let Some(r) = subject
        .readings
        .iter()
        .find(|r| r.accepted && r.matches(answer, require_on_in_katakana))
    {
        return AnswerVerdict::correct(answer, &r.reading, false);
    }
    if let Some(r) = subject
        .readings
        .iter()
        .find(|r| !r.accepted && r.matches(answer, require_on_in_katakana))
    {
        return AnswerVerdict::wrong(answer, &r.reading, false);
    }
    if let Some(kanji) = matching_kanji {
        if kanji.readings.iter().any(|r| r.matches(answer, require_on_in_katakana)) {
            return AnswerVerdict::NOK_WITH_RETRY;
        }
    }
    let digraph = if digraph_accepted_only {
        find_digraph(subject.readings.iter().filter(|r| r.accepted), answer)
    } else {
        find_digraph(&subject.readings, answer)
    };
    digraph.unwrap_or(AnswerVerdict::NOK_WITHOUT_RETRY)
}

/// On'yomi or kun'yomi question in onkun mode. When the subject has no
/// accepted reading of the asked kind, any reading of that kind counts.
fn check_split_reading(
    subject: &Subject,
    answer: &str,
    require_on_in_katakana: bool,
    of_kind: fn(&Reading) -> bool,
    digraph_accepted_only: bool,
) -> AnswerVerdict {
    let mut of_kind_readings = subject.readings.iter().filter(|r| of_kind(r));
    if let Some(r) = of_kind_readings
        .clone()
        .find(|r| r.accepted && r.matches(answer, require_on_in_katakana))
    {
        return AnswerVerdict::correct(answer, &r.reading, false);
    }
    if !of_kind_readings.clone().any(|r| r.accepted) {
        if let Some(r) = of_kind_readings.find(|r| r.matches(answer, require_on_in_katakana)) {
            return AnswerVerdict::correct(answer, &r.reading, false);
        }
    }
    if subject.readings.iter().any(|r| r.matches(answer, require_on_in_katakana)) {
        return AnswerVerdict::NOK_WITH_RETRY;
    }
    let digraph = if digraph_accepted_only {
        find_digraph(subject.readings.iter().filter(|r| r.accepted), answer)
    } else {
        find_digraph(&subject.readings, answer)
    };
    digraph.unwrap_or(AnswerVerdict::NOK_WITHOUT_RETRY)
}
