use std::fmt;

use serde::{Deserialize, Serialize};

/// A regular kana typed where the small form was expected, or the reverse.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct DigraphMatch {
    pub regular_kana: char,
    pub small_kana: char,
}

/// What to do with an answer that is within typo tolerance but not exact.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CloseEnoughAction {
    #[default]
    SilentlyAccept,
    AcceptWithToast,
    /// Accept with a notice, without the fast-advance shortcut.
    AcceptWithToastNoLightning,
    ShakeAndRetry,
    Reject,
}

impl CloseEnoughAction {
    pub fn show_toast(self) -> bool {
        matches!(
            self,
            CloseEnoughAction::AcceptWithToast | CloseEnoughAction::AcceptWithToastNoLightning
        )
    }
}

/// Result of judging one answer.
#[derive(Clone, Debug, PartialEq)]
pub struct AnswerVerdict {
    pub ok: bool,
    /// Wrong, but the user may answer again without it counting.
    pub retry: bool,
    pub near_match: bool,
    pub given_answer: Option<String>,
    pub matched_answer: Option<String>,
    pub digraph: Option<DigraphMatch>,
}

impl AnswerVerdict {
    pub const NOK_WITH_RETRY: AnswerVerdict = AnswerVerdict::rejected(true);
    pub const NOK_WITHOUT_RETRY: AnswerVerdict = AnswerVerdict::rejected(false);

    const fn rejected(retry: bool) -> Self {
        Self {
            ok: false,
            retry,
            near_match: false,
            given_answer: None,
            matched_answer: None,
            digraph: None,
        }
    }

    pub fn correct(given: &str, matched: &str, near_match: bool) -> Self {
        Self {
            ok: true,
            retry: false,
            near_match,
            given_answer: Some(given.to_string()),
            matched_answer: Some(matched.to_string()),
            digraph: None,
        }
    }

    /// Wrong, naming the answer it was mistaken for.
    pub fn wrong(given: &str, matched: &str, retry: bool) -> Self {
        Self {
            ok: false,
            retry,
            near_match: false,
            given_answer: Some(given.to_string()),
            matched_answer: Some(matched.to_string()),
            digraph: None,
        }
    }

    pub fn digraph(given: &str, matched: &str, digraph: DigraphMatch) -> Self {
        Self {
            digraph: Some(digraph),
            ..Self::wrong(given, matched, false)
        }
    }

    /// The answer is wrong and counts as a miss.
    pub fn is_hard_miss(&self) -> bool {
        !self.ok && !self.retry
    }
}

impl fmt::Display for AnswerVerdict {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "Verdict:{},{},{},{},{}",
            self.ok,
            self.retry,
            self.near_match,
            self.given_answer.as_deref().unwrap_or("null"),
            self.matched_answer.as_deref().unwrap_or("null"),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_constants() {
        assert!(AnswerVerdict::NOK_WITH_RETRY.retry);
        assert!(!AnswerVerdict::NOK_WITH_RETRY.is_hard_miss());
        assert!(AnswerVerdict::NOK_WITHOUT_RETRY.is_hard_miss());
    }

    #[test]
    fn test_display() {
        let v = AnswerVerdict::correct("tree", "Tree", false);
        assert_eq!(v.to_string(), "Verdict:true,false,false,tree,Tree");
        assert_eq!(
            AnswerVerdict::NOK_WITH_RETRY.to_string(),
            "Verdict:false,true,false,null,null"
        );
    }

    #[test]
    fn test_close_enough_toast() {
        assert!(CloseEnoughAction::AcceptWithToast.show_toast());
        assert!(!CloseEnoughAction::SilentlyAccept.show_toast());
        assert!(!CloseEnoughAction::Reject.show_toast());
    }
}
