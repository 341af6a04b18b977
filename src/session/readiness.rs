//! Readiness and pipeline gates.
//!
//! Two separate questions: is the conversation ready to hand off, and is
//! it worth running the (expensive) decision pipeline on what was handed off.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Serialize;

use crate::config::SessionConfig;
use crate::conversation::{ConversationState, SessionType, field_spec};

static GENERAL_QUESTION: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r"(?i)\?|\b(?:how|what|why|when|can|should|is it)\b")
        .expect("valid question pattern")
});

static GENERAL_TOPIC: Lazy<Regex> = Lazy::new(|| {
    Regex::new(
        r"(?i)\b(?:diet|exercise|blood\s*pressure|diabetes|hypertension|heart|weight|habit|health|symptom)\w*\b",
    )
    .expect("valid topic pattern")
});

/// Why a session became ready.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ReadyReason {
    /// Critical fields present and the weighted score met the minimum.
    Threshold,
    /// Turn limit reached.
    TurnLimit,
    /// General session with an answerable message.
    Content,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Readiness {
    NotReady,
    Ready(ReadyReason),
}

impl Readiness {
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready(_))
    }
}

/// Decide whether the conversation has enough to hand off.
pub fn assess(state: &ConversationState, config: &SessionConfig) -> Readiness {
    let turn = state.turn_count();
    let thresholds = config.thresholds(state.session_type());

    if state.session_type() == SessionType::General {
        let combined = state.combined_input();
        let answerable = GENERAL_QUESTION.is_match(&combined)
            || GENERAL_TOPIC.is_match(&combined)
            || combined.trim().chars().count() >= config.general_min_length;
        return if answerable {
            Readiness::Ready(ReadyReason::Content)
        } else if turn >= thresholds.max_turns {
            Readiness::Ready(ReadyReason::TurnLimit)
        } else {
            Readiness::NotReady
        };
    }

    if state.has_critical_fields() && state.weighted_score() >= thresholds.min_score {
        Readiness::Ready(ReadyReason::Threshold)
    } else if turn >= thresholds.max_turns {
        Readiness::Ready(ReadyReason::TurnLimit)
    } else {
        Readiness::NotReady
    }
}

/// Why the decision pipeline was not run.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "reason", rename_all = "snake_case")]
pub enum SkipReason {
    InsufficientData { collected: usize, required: usize },
    MissingCritical { fields: Vec<String> },
    SparseInput { messages: usize, words: usize },
    Unchanged,
}

impl SkipReason {
    /// Reply shown instead of a pipeline result. `next_question` is appended
    /// when more data is needed.
    pub fn quick_response(&self, next_question: Option<&str>) -> String {
        match self {
            Self::InsufficientData { .. } => {
                let mut text = "I need a bit more information before I can provide personalized recommendations.".to_string();
                if let Some(q) = next_question {
                    text.push(' ');
                    text.push_str(q);
                }
                text
            }
            Self::MissingCritical { fields } => {
                let labels: Vec<&str> = fields
                    .iter()
                    .map(|f| field_spec(f).map_or(f.as_str(), |s| s.label))
                    .collect();
                let list = match labels.as_slice() {
                    [] => "a few basics".to_string(),
                    [only] => only.to_string(),
                    [init @ .., last] => format!("{} and {last}", init.join(", ")),
                };
                format!(
                    "To give you accurate health guidance, I'll need to know your {list}. Could you share those?"
                )
            }
            Self::SparseInput { .. } => "Could you tell me a bit more about how things have been going? \
                 For example, what habits have you been working on, and how are they going?"
                .to_string(),
            Self::Unchanged => "Based on what you've shared, my previous recommendations still apply. \
                 Is there anything specific you'd like me to address or clarify?"
                .to_string(),
        }
    }
}

/// Outcome of the pipeline gate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PipelineGate {
    Run,
    Skip(SkipReason),
}

/// Minimum collected fields before the pipeline is worth running.
pub fn min_pipeline_fields(session_type: SessionType) -> usize {
    match session_type {
        SessionType::Intake => 4,
        SessionType::FollowUp => 1,
        SessionType::General => 0,
    }
}

/// Follow-up input below either bound is too thin to analyze.
const FOLLOW_UP_MIN_MESSAGES: usize = 2;
const FOLLOW_UP_MIN_WORDS: usize = 10;

/// Pure gate check. The caller records the fingerprint when this returns `Run`.
pub fn pipeline_gate(state: &ConversationState, last_fingerprint: Option<u64>) -> PipelineGate {
    let session_type = state.session_type();
    let collected = state.fields().len();
    let required = min_pipeline_fields(session_type);

    if collected < required {
        return PipelineGate::Skip(SkipReason::InsufficientData {
            collected,
            required,
        });
    }

    if session_type == SessionType::Intake {
        let missing: Vec<String> = session_type
            .critical_fields()
            .iter()
            .filter(|name| !state.has_field(name))
            .map(|name| name.to_string())
            .collect();
        if !missing.is_empty() {
            return PipelineGate::Skip(SkipReason::MissingCritical { fields: missing });
        }
    }

    if session_type == SessionType::FollowUp {
        let messages = state.user_messages();
        let words: usize = messages.iter().map(|m| m.split_whitespace().count()).sum();
        if messages.len() < FOLLOW_UP_MIN_MESSAGES || words < FOLLOW_UP_MIN_WORDS {
            return PipelineGate::Skip(SkipReason::SparseInput {
                messages: messages.len(),
                words,
            });
        }
    }

    if last_fingerprint == Some(state.content_fingerprint()) {
        return PipelineGate::Skip(SkipReason::Unchanged);
    }
    PipelineGate::Run
}
