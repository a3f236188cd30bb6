use icu_normalizer::ComposingNormalizerBorrowed;

use super::verdict::{AnswerVerdict, CloseEnoughAction};

/// The zero of every decimal digit block that should read as ASCII digits.
const DIGIT_ZEROS: &[u32] = &[
    0x0660, 0x06F0, 0x07C0, 0x0966, 0x09E6, 0x0A66, 0x0AE6, 0x0B66, 0x0BE6, 0x0C66, 0x0CE6,
    0x0D66, 0x0E50, 0x0ED0, 0x0F20, 0x1040, 0x1090, 0x17E0, 0x1810, 0x1946, 0x19D0, 0x1A80,
    0x1A90, 0x1B50, 0x1BB0, 0x1C40, 0x1C50, 0xA620, 0xA8D0, 0xA900, 0xA9D0, 0xAA50, 0xABF0,
    0xFF10, 0x104A0, 0x11066, 0x110F0, 0x11136, 0x111D0, 0x116C0, 0x1D7CE, 0x1D7D8, 0x1D7E2,
    0x1D7EC, 0x1D7F6,
];

const DASHES: &[char] = &[
    '\u{058A}', '\u{05BE}', '\u{1400}', '\u{2010}', '\u{2011}', '\u{2012}', '\u{2013}',
    '\u{2014}', '\u{2015}', '\u{2043}', '\u{2E3A}', '\u{2E3B}', '\u{30FC}', '\u{FE58}',
    '\u{FE63}', '\u{FF0D}',
];

#[rustfmt::skip]
const PUNCTUATION: &[(char, char)] = &[
    ('\u{00B4}', '\''), ('\u{02DD}', '"'), ('\u{02F4}', '\''), ('\u{02F5}', '"'), ('\u{02F6}', '"'),
    ('\u{055A}', '\''), ('\u{055B}', '\''), ('\u{05F3}', '\''), ('\u{05F4}', '"'), ('\u{066B}', '.'),
    ('\u{066C}', ','), ('\u{2018}', '\''), ('\u{2019}', '\''), ('\u{201A}', '\''), ('\u{201B}', '\''),
    ('\u{201C}', '"'), ('\u{201D}', '"'), ('\u{201E}', '"'), ('\u{201F}', '"'), ('\u{2032}', '\''),
    ('\u{2033}', '"'), ('\u{2035}', '\''), ('\u{2036}', '"'), ('\u{301D}', '"'), ('\u{301E}', '"'),
    ('\u{301F}', '"'), ('\u{3001}', ','), ('\u{3002}', '.'), ('\u{FF40}', '\''), ('\u{FF61}', '.'),
    ('\u{FF64}', ','), ('\u{FF65}', '.'),
];

fn clean_char(c: char) -> char {
    if c.is_ascii() {
        return c;
    }
    let cp = c as u32;
    if let Some(zero) = DIGIT_ZEROS.iter().find(|&&zero| (zero..zero + 10).contains(&cp)) {
        return char::from_digit(cp - zero, 10).unwrap_or(c);
    }
    if DASHES.contains(&c) {
        return '-';
    }
    PUNCTUATION
        .iter()
        .find(|(from, _)| *from == c)
        .map_or(c, |&(_, to)| to)
}

fn is_blank(c: char) -> bool {
    c.is_whitespace()
        || c.is_control()
        || matches!(c, '\u{200B}'..='\u{200F}' | '\u{2060}' | '\u{FEFF}' | '\u{E000}'..='\u{F8FF}')
}

/// Fold an answer or reference to the form used for comparison.
pub fn clean_string(s: &str) -> String {
    let folded = ComposingNormalizerBorrowed::new_nfkc().normalize(s);
    let mut out = String::with_capacity(folded.len());
    for c in folded.chars() {
        let c = if is_blank(c) { ' ' } else { clean_char(c) };
        if c == ' ' && (out.is_empty() || out.ends_with(' ')) {
            continue;
        }
        out.push(c);
    }
    if out.ends_with(' ') {
        out.pop();
    }
    out.to_lowercase()
}

/// Optimal string alignment distance: edits plus adjacent transpositions,
/// no substring edited twice.
pub fn osa_distance(a: &str, b: &str) -> usize {
    let a: Vec<char> = a.chars().collect();
    let b: Vec<char> = b.chars().collect();
    let width = b.len() + 1;
    let mut d = vec![0usize; (a.len() + 1) * width];
    for i in 0..=a.len() {
        d[i * width] = i;
    }
    for (j, cell) in d.iter_mut().enumerate().take(width) {
        *cell = j;
    }
    for i in 1..=a.len() {
        for j in 1..=b.len() {
            let cost = usize::from(a[i - 1] != b[j - 1]);
            let mut best = (d[(i - 1) * width + j] + 1)
                .min(d[i * width + j - 1] + 1)
                .min(d[(i - 1) * width + j - 1] + cost);
            if i > 1 && j > 1 && a[i - 1] == b[j - 2] && a[i - 2] == b[j - 1] {
                best = best.min(d[(i - 2) * width + j - 2] + 1);
            }
            d[i * width + j] = best;
        }
    }
    d[a.len() * width + b.len()]
}

/// Typos tolerated for a reference of `len` characters.
pub fn typo_threshold(len: usize) -> usize {
    match len {
        0..=3 => 0,
        4 | 5 => 1,
        6 | 7 => 2,
        _ => len / 7 + 2,
    }
}

/// Distance between cleaned strings, or `None` if beyond tolerance.
fn match_score(answer: &str, reference: &str) -> Option<usize> {
    let score = osa_distance(answer, reference);
    (score <= typo_threshold(reference.chars().count())).then_some(score)
}

/// Judge `answer` against accepted and rejected references. An accepted
/// reference wins when it scores at least as well as every rejected one.
pub fn fuzzy_matches<'a, A, R>(
    answer: &str,
    accepted: A,
    rejected: R,
    action: CloseEnoughAction,
) -> AnswerVerdict
where
    A: IntoIterator<Item = &'a str>,
    R: IntoIterator<Item = &'a str>,
{
    let clean_answer = clean_string(answer);

    let best_rejected = rejected
        .into_iter()
        .filter_map(|r| match_score(&clean_answer, &clean_string(r)))
        .min();

    let mut best_accepted: Option<(usize, &str)> = None;
    for reference in accepted {
        if let Some(score) = match_score(&clean_answer, &clean_string(reference)) {
            if best_accepted.is_none_or(|(best, _)| score < best) {
                best_accepted = Some((score, reference));
            }
        }
    }

    let Some((score, matched)) = best_accepted else {
        return AnswerVerdict::NOK_WITHOUT_RETRY;
    };
    if best_rejected.is_some_and(|rejected| rejected < score) {
        return AnswerVerdict::NOK_WITHOUT_RETRY;
    }
    if score == 0 {
        return AnswerVerdict::correct(answer, matched, false);
    }
    match action {
        CloseEnoughAction::ShakeAndRetry => AnswerVerdict::NOK_WITH_RETRY,
        CloseEnoughAction::Reject => AnswerVerdict::NOK_WITHOUT_RETRY,
        CloseEnoughAction::SilentlyAccept
        | CloseEnoughAction::AcceptWithToast
        | CloseEnoughAction::AcceptWithToastNoLightning => {
            AnswerVerdict::correct(answer, matched, true)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clean_string() {
        assert_eq!(clean_string("  Big   Tree "), "big tree");
        assert_eq!(clean_string("ＴＲＥＥ"), "tree");
        assert_eq!(clean_string("one\u{2013}two"), "one-two");
        assert_eq!(clean_string("\u{0663}\u{FF14}"), "34");
        assert_eq!(clean_string("it\u{2019}s"), "it's");
        assert_eq!(clean_string("a\tb\nc"), "a b c");
    }

    #[test]
    fn test_osa_distance() {
        assert_eq!(osa_distance("tree", "tree"), 0);
        assert_eq!(osa_distance("tere", "tree"), 1);
        assert_eq!(osa_distance("tre", "tree"), 1);
        assert_eq!(osa_distance("wood", "tree"), 4);
        assert_eq!(osa_distance("ca", "abc"), 3);
        assert_eq!(osa_distance("", "abc"), 3);
    }

    #[test]
    fn test_threshold() {
        assert_eq!(typo_threshold(3), 0);
        assert_eq!(typo_threshold(5), 1);
        assert_eq!(typo_threshold(7), 2);
        assert_eq!(typo_threshold(14), 4);
    }

    #[test]
    fn test_exact_and_near() {
        let v = fuzzy_matches("tree", ["Tree"], [], CloseEnoughAction::SilentlyAccept);
        assert!(v.ok && !v.near_match);
        assert_eq!(v.matched_answer.as_deref(), Some("Tree"));

        let v = fuzzy_matches("tere", ["Tree"], [], CloseEnoughAction::SilentlyAccept);
        assert!(v.ok && v.near_match);
        let v = fuzzy_matches("tere", ["Tree"], [], CloseEnoughAction::ShakeAndRetry);
        assert_eq!(v, AnswerVerdict::NOK_WITH_RETRY);
        let v = fuzzy_matches("tere", ["Tree"], [], CloseEnoughAction::Reject);
        assert_eq!(v, AnswerVerdict::NOK_WITHOUT_RETRY);
    }

    #[test]
    fn test_short_references_need_exact() {
        let v = fuzzy_matches("bog", ["Big"], [], CloseEnoughAction::SilentlyAccept);
        assert_eq!(v, AnswerVerdict::NOK_WITHOUT_RETRY);
    }

    #[test]
    fn test_rejected_beats_worse_accepted() {
        let v = fuzzy_matches("wood", ["Tree"], ["Wood"], CloseEnoughAction::SilentlyAccept);
        assert_eq!(v, AnswerVerdict::NOK_WITHOUT_RETRY);
        let v = fuzzy_matches("rain", ["Ruin"], ["Rain"], CloseEnoughAction::SilentlyAccept);
        assert_eq!(v, AnswerVerdict::NOK_WITHOUT_RETRY);
    }

    #[test]
    fn test_accepted_wins_ties() {
        let v = fuzzy_matches("wood", ["Wood"], ["Wood"], CloseEnoughAction::SilentlyAccept);
        assert!(v.ok);
        assert_eq!(v.matched_answer.as_deref(), Some("Wood"));
    }
}
