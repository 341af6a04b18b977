//! Behavioral pattern detection.
//!
//! Pure functions of message history. `PatternDetector::analyze_session`
//! looks at the current session (plus patterns saved from earlier sessions
//! for recurrence), `analyze_history` at messages from earlier sessions.

pub mod detector;
pub mod keywords;
pub mod types;

pub use detector::{DetectorConfig, PatternDetector, RECURRENCE_MARKER};
pub use types::{
    AdherenceTrend, BarrierKind, DetectedPattern, Habit, HabitCurrentStatus, HabitMention,
    HabitStatus, MentionStatus, PatternType, Severity, TrendDirection,
};
