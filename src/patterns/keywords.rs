//! Keyword buckets for barrier, habit, status and stress detection.
//!
//! Keywords match case-insensitively at the start of a word, so "walk"
//! also covers "walking" and "walks".

use std::collections::HashMap;

use once_cell::sync::Lazy;
use regex::Regex;

use super::types::{BarrierKind, Habit};

fn compile(words: &[&str]) -> Regex {
    let alternation = words
        .iter()
        .map(|w| regex::escape(w))
        .collect::<Vec<_>>()
        .join("|");
    Regex::new(&format!(r"(?i)\b(?:{alternation})")).expect("valid keyword pattern")
}

static BARRIERS: Lazy<HashMap<BarrierKind, Regex>> = Lazy::new(|| {
    BarrierKind::ALL
        .into_iter()
        .map(|kind| {
            let words: &[&str] = match kind {
                BarrierKind::Time => &["busy", "no time", "work", "schedule", "hours", "late"],
                BarrierKind::Weather => &["rain", "cold", "hot", "weather", "season", "flood"],
                BarrierKind::Health => &["sick", "injury", "pain", "tired", "fatigue", "unwell"],
                BarrierKind::Motivation => &[
                    "lazy",
                    "don't feel",
                    "can't be bothered",
                    "forgot",
                    "skipped",
                ],
                BarrierKind::Access => &["expensive", "afford", "no access", "far", "unavailable"],
                BarrierKind::Social => &["family", "kids", "caring for", "responsibilities"],
            };
            (kind, compile(words))
        })
        .collect()
});

static HABITS: Lazy<HashMap<Habit, Regex>> = Lazy::new(|| {
    Habit::ALL
        .into_iter()
        .map(|habit| {
            let words: &[&str] = match habit {
                Habit::Walking => &["walk", "steps", "stroll"],
                Habit::Exercise => &["exercise", "gym", "workout", "run", "jog", "swim"],
                Habit::Diet => &["eat", "food", "diet", "salt", "sugar", "vegetable", "fruit"],
                Habit::Water => &["water", "hydrat", "drink", "fluid"],
                Habit::Sleep => &["sleep", "rest", "bed", "insomnia"],
                Habit::Medication => &["medicine", "medication", "pill", "tablet", "drug"],
                Habit::Monitoring => &[
                    "measure",
                    "check",
                    "monitor",
                    "reading",
                    "bp",
                    "blood pressure",
                    "weight",
                ],
            };
            (habit, compile(words))
        })
        .collect()
});

static POSITIVE: Lazy<Regex> = Lazy::new(|| {
    compile(&[
        "doing", "following", "keeping", "maintained", "success", "good", "well", "daily",
        "regularly",
    ])
});

static NEGATIVE: Lazy<Regex> = Lazy::new(|| {
    compile(&[
        "stopped", "quit", "can't", "haven't", "struggle", "difficult", "hard", "failed",
        "missed", "skipped",
    ])
});

static STRESS: Lazy<Regex> = Lazy::new(|| {
    compile(&[
        "stress", "anxious", "anxiety", "overwhelmed", "pressure", "worried", "tension",
    ])
});

pub fn mentions_barrier(kind: BarrierKind, text: &str) -> bool {
    BARRIERS.get(&kind).is_some_and(|re| re.is_match(text))
}

pub fn mentions_habit(habit: Habit, text: &str) -> bool {
    HABITS.get(&habit).is_some_and(|re| re.is_match(text))
}

pub fn is_positive(text: &str) -> bool {
    POSITIVE.is_match(text)
}

pub fn is_negative(text: &str) -> bool {
    NEGATIVE.is_match(text)
}

pub fn mentions_stress(text: &str) -> bool {
    STRESS.is_match(text)
}

/// Habits mentioned anywhere in the text, in bucket order.
pub fn habits_in(text: &str) -> Vec<Habit> {
    Habit::ALL
        .into_iter()
        .filter(|h| mentions_habit(*h, text))
        .collect()
}

/// Barrier kinds mentioned anywhere in the text, in bucket order.
pub fn barriers_in(text: &str) -> Vec<BarrierKind> {
    BarrierKind::ALL
        .into_iter()
        .filter(|b| mentions_barrier(*b, text))
        .collect()
}
