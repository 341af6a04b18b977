//! Slot values, confidence tags, and session types.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

/// Canonical slot names.
pub mod names {
    pub const AGE: &str = "age";
    pub const SEX: &str = "sex";
    pub const CONDITIONS: &str = "conditions";
    pub const FAMILY_HISTORY: &str = "family_history";
    pub const SMOKING: &str = "smoking";
    pub const ALCOHOL: &str = "alcohol";
    pub const DIET: &str = "diet";
    pub const ACTIVITY: &str = "activity";
    pub const CONSTRAINTS: &str = "constraints";
    pub const WEIGHT: &str = "weight";

    pub const HABITS_FOLLOWED: &str = "habits_followed";
    pub const HABITS_STRUGGLED: &str = "habits_struggled";
    pub const HEALTH_READINGS: &str = "health_readings";
    pub const BARRIERS: &str = "barriers";
    pub const FEELINGS: &str = "feelings";
}

/// A slot value. Untagged so LLM JSON maps onto it directly.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum FieldValue {
    Bool(bool),
    Number(f64),
    Text(String),
    List(Vec<String>),
}

impl FieldValue {
    pub fn text(value: impl Into<String>) -> Self {
        Self::Text(value.into())
    }

    /// Numeric view. Text that parses as a number counts.
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Self::Number(n) => Some(*n),
            Self::Text(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Text(s) => Some(s),
            _ => None,
        }
    }
}

impl From<&str> for FieldValue {
    fn from(value: &str) -> Self {
        Self::Text(value.to_string())
    }
}

impl From<u32> for FieldValue {
    fn from(value: u32) -> Self {
        Self::Number(f64::from(value))
    }
}

impl fmt::Display for FieldValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Bool(b) => write!(f, "{}", if *b { "yes" } else { "no" }),
            Self::Number(n) if n.fract() == 0.0 => write!(f, "{}", *n as i64),
            Self::Number(n) => write!(f, "{n}"),
            Self::Text(s) => write!(f, "{s}"),
            Self::List(items) => write!(f, "{}", items.join(", ")),
        }
    }
}

/// Qualitative certainty attached to a slot value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum FieldConfidence {
    /// Explicitly stated ("I am 45 years old").
    High,
    /// Clearly implied ("mid-40s").
    Medium,
    /// Inferred, or force-resolved after repeated clarification.
    Low,
    NeedsClarification,
}

impl FieldConfidence {
    /// Map a numeric extraction score onto a tag.
    pub fn from_score(score: f32) -> Self {
        if score >= 0.8 {
            Self::High
        } else if score >= 0.5 {
            Self::Medium
        } else {
            Self::Low
        }
    }

    /// Contribution to the readiness score.
    pub fn weight(&self) -> f32 {
        match self {
            Self::High | Self::Medium => 1.0,
            Self::Low => 0.75,
            Self::NeedsClarification => 0.5,
        }
    }
}

impl fmt::Display for FieldConfidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::High => "high",
            Self::Medium => "medium",
            Self::Low => "low",
            Self::NeedsClarification => "needs_clarification",
        };
        write!(f, "{s}")
    }
}

/// A slot value plus where it came from.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExtractedField {
    pub name: String,
    pub value: FieldValue,
    pub confidence: FieldConfidence,
    pub source_message: String,
    pub turn_number: u32,
    pub clarifying_question: Option<String>,
}

/// What a session is for. Determines required slots and readiness rules.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SessionType {
    Intake,
    FollowUp,
    General,
}

impl SessionType {
    /// Slots that must all be present before the session can be ready on score.
    pub fn critical_fields(&self) -> &'static [&'static str] {
        match self {
            Self::Intake => &[names::AGE, names::SEX, names::CONDITIONS],
            Self::FollowUp => &[names::HABITS_FOLLOWED],
            Self::General => &[],
        }
    }
}

impl fmt::Display for SessionType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Intake => "intake",
            Self::FollowUp => "follow_up",
            Self::General => "general",
        };
        write!(f, "{s}")
    }
}

impl FromStr for SessionType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().replace('-', "_").as_str() {
            "intake" => Ok(Self::Intake),
            "follow_up" | "followup" => Ok(Self::FollowUp),
            "general" => Ok(Self::General),
            other => Err(format!("unknown session type: {other}")),
        }
    }
}
