//! User intent categories and their example phrases.

use std::fmt;

use once_cell::sync::Lazy;
use regex::Regex;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Intent {
    /// "yes", "correct"
    Affirmative,
    /// "no", "none", "nope"
    Negative,
    /// "yes but sometimes"
    QualifiedYes,
    /// "no except on weekends"
    QualifiedNo,
    /// "maybe", "not sure"
    Uncertain,
    /// Providing information. The fallback.
    Informative,
    Question,
    Clarification,
    Greeting,
    Farewell,
}

impl fmt::Display for Intent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Affirmative => "affirmative",
            Self::Negative => "negative",
            Self::QualifiedYes => "qualified_yes",
            Self::QualifiedNo => "qualified_no",
            Self::Uncertain => "uncertain",
            Self::Informative => "informative",
            Self::Question => "question",
            Self::Clarification => "clarification",
            Self::Greeting => "greeting",
            Self::Farewell => "farewell",
        };
        write!(f, "{s}")
    }
}

/// Example phrases per intent, checked in this order.
pub static INTENT_EXAMPLES: &[(Intent, &[&str])] = &[
    (
        Intent::Affirmative,
        &[
            "yes", "yeah", "yep", "yup", "correct", "right", "exactly", "that's right", "indeed",
            "absolutely", "definitely", "sure", "of course", "certainly", "i do", "i have", "i am",
            "true",
        ],
    ),
    (
        Intent::Negative,
        &[
            "no",
            "nope",
            "nah",
            "none",
            "nothing",
            "not really",
            "i don't",
            "i dont",
            "don't have",
            "dont have",
            "never",
            "none that i know",
            "not that i know of",
            "i don't think so",
            "not at all",
            "negative",
            "false",
            "neither",
            "nor",
            "i'm fine",
            "i'm good",
            "i'm healthy",
            "all good",
            "no issues",
            "no problems",
            "nothing wrong",
        ],
    ),
    (
        Intent::Uncertain,
        &[
            "maybe",
            "perhaps",
            "possibly",
            "not sure",
            "i think",
            "i guess",
            "probably",
            "might",
            "could be",
            "sometimes",
            "kind of",
            "sort of",
            "i believe",
            "supposedly",
        ],
    ),
];

/// "yes, but ..." style answers. Checked before the example phrases.
pub static QUALIFIED_PATTERNS: Lazy<Vec<(Intent, Regex)>> = Lazy::new(|| {
    [
        (
            Intent::QualifiedYes,
            r"\b(yes|yeah|yep)\b.*\b(but|except|however|although|though|sometimes)\b",
        ),
        (Intent::QualifiedYes, r"\b(mostly|usually|generally)\b.*\b(yes|yeah)\b"),
        (
            Intent::QualifiedNo,
            r"\b(no|nope|nah)\b.*\b(but|except|however|although|well|sometimes)\b",
        ),
        (Intent::QualifiedNo, r"\b(not really|not much)\b.*\b(but|except)\b"),
    ]
    .into_iter()
    .map(|(intent, pattern)| (intent, Regex::new(pattern).expect("valid qualified pattern")))
    .collect()
});

/// Confidence assigned to a qualified-pattern hit.
pub const QUALIFIED_CONFIDENCE: f32 = 0.85;
