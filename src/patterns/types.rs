//! Pattern data model: pattern kinds, severities, keyword buckets and habit status.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of behavioral pattern.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PatternType {
    HabitDecline,
    HabitImprovement,
    RecurringBarrier,
    SeasonalPattern,
    StressCorrelation,
    TimeConstraint,
    HealthTrend,
}

impl fmt::Display for PatternType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::HabitDecline => "habit_decline",
            Self::HabitImprovement => "habit_improvement",
            Self::RecurringBarrier => "recurring_barrier",
            Self::SeasonalPattern => "seasonal_pattern",
            Self::StressCorrelation => "stress_correlation",
            Self::TimeConstraint => "time_constraint",
            Self::HealthTrend => "health_trend",
        };
        f.write_str(s)
    }
}

/// How pressing a pattern is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Severity {
    Low,
    Medium,
    High,
    Critical,
}

impl Severity {
    pub fn is_high(self) -> bool {
        self >= Self::High
    }
}

impl fmt::Display for Severity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Self::Low => "low",
            Self::Medium => "medium",
            Self::High => "high",
            Self::Critical => "critical",
        };
        f.write_str(s)
    }
}

/// Category of obstacle a user reports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BarrierKind {
    Time,
    Weather,
    Health,
    Motivation,
    Access,
    Social,
}

impl BarrierKind {
    pub const ALL: [BarrierKind; 6] = [
        Self::Time,
        Self::Weather,
        Self::Health,
        Self::Motivation,
        Self::Access,
        Self::Social,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Time => "time",
            Self::Weather => "weather",
            Self::Health => "health",
            Self::Motivation => "motivation",
            Self::Access => "access",
            Self::Social => "social",
        }
    }

    /// Standing advice attached to a barrier pattern.
    pub fn recommendation(self) -> &'static str {
        match self {
            Self::Time => {
                "Consider shorter habit sessions (10 min instead of 30) or habit stacking with existing routines"
            }
            Self::Weather => {
                "Suggest indoor alternatives: home exercises, indoor walking, mall walking"
            }
            Self::Health => {
                "Modify habits to accommodate current health status, consult healthcare provider"
            }
            Self::Motivation => {
                "Break habits into smaller steps, use habit tracking, find an accountability partner"
            }
            Self::Access => {
                "Find free or low-cost alternatives, community resources, home-based options"
            }
            Self::Social => {
                "Involve family in habits, find time-efficient options, adjust expectations temporarily"
            }
        }
    }
}

impl fmt::Display for BarrierKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Habit bucket tracked across sessions.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Habit {
    Walking,
    Exercise,
    Diet,
    Water,
    Sleep,
    Medication,
    Monitoring,
}

impl Habit {
    pub const ALL: [Habit; 7] = [
        Self::Walking,
        Self::Exercise,
        Self::Diet,
        Self::Water,
        Self::Sleep,
        Self::Medication,
        Self::Monitoring,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            Self::Walking => "walking",
            Self::Exercise => "exercise",
            Self::Diet => "diet",
            Self::Water => "water",
            Self::Sleep => "sleep",
            Self::Medication => "medication",
            Self::Monitoring => "monitoring",
        }
    }
}

impl FromStr for Habit {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::ALL
            .into_iter()
            .find(|h| h.as_str().eq_ignore_ascii_case(s.trim()))
            .ok_or_else(|| format!("unknown habit: {s}"))
    }
}

impl fmt::Display for Habit {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Direction of a health-reading trend.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TrendDirection {
    Improving,
    Worsening,
}

/// A pattern found in one or more user messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DetectedPattern {
    pub pattern_type: PatternType,
    pub description: String,
    pub severity: Severity,
    /// Messages or data points supporting the pattern.
    pub evidence: Vec<String>,
    #[serde(default)]
    pub affected_habits: Vec<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub recommendation: Option<String>,
    pub confidence: f32,
    /// Set on recurring-barrier patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub barrier: Option<BarrierKind>,
    /// Set on health-trend patterns.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub trend: Option<TrendDirection>,
    pub detected_at: DateTime<Utc>,
}

impl DetectedPattern {
    pub fn new(
        pattern_type: PatternType,
        description: impl Into<String>,
        severity: Severity,
        evidence: Vec<String>,
        confidence: f32,
    ) -> Self {
        Self {
            pattern_type,
            description: description.into(),
            severity,
            evidence,
            affected_habits: Vec::new(),
            recommendation: None,
            confidence,
            barrier: None,
            trend: None,
            detected_at: Utc::now(),
        }
    }

    pub fn with_recommendation(mut self, rec: impl Into<String>) -> Self {
        self.recommendation = Some(rec.into());
        self
    }

    pub fn with_habits<I, S>(mut self, habits: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.affected_habits = habits.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_barrier(mut self, barrier: BarrierKind) -> Self {
        self.barrier = Some(barrier);
        self
    }

    pub fn with_trend(mut self, trend: TrendDirection) -> Self {
        self.trend = Some(trend);
        self
    }
}

/// Classification of a single habit mention.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MentionStatus {
    Positive,
    Negative,
    Neutral,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitMention {
    pub message: String,
    pub status: MentionStatus,
    pub timestamp: DateTime<Utc>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum HabitCurrentStatus {
    Active,
    Struggling,
    Stopped,
    Unknown,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdherenceTrend {
    Improving,
    Stable,
    Declining,
    Unknown,
}

/// Summary of one habit across a set of messages.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HabitStatus {
    pub habit: Habit,
    pub mentions: Vec<HabitMention>,
    pub current_status: HabitCurrentStatus,
    pub adherence_trend: AdherenceTrend,
    /// Barrier kinds mentioned alongside the habit, deduplicated.
    pub barriers: Vec<BarrierKind>,
    pub last_updated: DateTime<Utc>,
}

impl HabitStatus {
    pub fn is_struggling(&self) -> bool {
        self.current_status == HabitCurrentStatus::Struggling
    }
}
