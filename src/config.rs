//! Configuration types.

use std::fmt::Display;
use std::str::FromStr;
use std::time::Duration;

use rust_decimal::Decimal;
use rust_decimal_macros::dec;

use crate::conversation::SessionType;
use crate::error::ConfigError;

/// Prefix shared by every environment override.
const ENV_PREFIX: &str = "HEALTH_INTAKE_";

/// Readiness thresholds for one session type.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Thresholds {
    /// Weighted field score required (together with the critical fields).
    pub min_score: f32,
    /// Turn count at which the session is handed off regardless of score.
    pub max_turns: u32,
}

/// Session-level limits.
#[derive(Debug, Clone)]
pub struct SessionConfig {
    pub intake: Thresholds,
    pub follow_up: Thresholds,
    /// Minimum combined length for a general question to be considered answerable.
    pub general_min_length: usize,
    /// General sessions hand off after this many turns.
    pub general_max_turns: u32,
    /// Ring buffer capacity for the message log.
    pub message_capacity: usize,
    /// Clarification attempts before a field is force-resolved at low confidence.
    pub max_clarification_attempts: u32,
    /// How many recent user messages are passed to the extractor as context.
    pub recent_context: usize,
    /// Upper bound on one external decision pipeline run.
    pub pipeline_timeout: Duration,
    /// Earlier session summaries loaded for recurrence and trend analysis.
    pub history_sessions: usize,
}

impl SessionConfig {
    /// Thresholds for a session type. General sessions use a content heuristic
    /// instead of a score, so only `max_turns` is meaningful for them.
    pub fn thresholds(&self, session_type: SessionType) -> Thresholds {
        match session_type {
            SessionType::Intake => self.intake,
            SessionType::FollowUp => self.follow_up,
            SessionType::General => Thresholds {
                min_score: 0.0,
                max_turns: self.general_max_turns,
            },
        }
    }
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            intake: Thresholds {
                min_score: 6.0,
                max_turns: 12,
            },
            follow_up: Thresholds {
                min_score: 3.0,
                max_turns: 7,
            },
            general_min_length: 15,
            general_max_turns: 2,
            message_capacity: 20,
            max_clarification_attempts: 3,
            recent_context: 5,
            pipeline_timeout: Duration::from_secs(120),
            history_sessions: 5,
        }
    }
}

/// Field extractor configuration.
#[derive(Debug, Clone)]
pub struct ExtractorConfig {
    /// Whether the LLM layer may be used at all.
    pub use_llm: bool,
    /// Upper bound on a single LLM extraction call.
    pub llm_timeout: Duration,
    /// Max tokens for the extraction call (kept tight, it runs per message).
    pub max_tokens: u32,
    pub temperature: f32,
    /// Semantic results at or above this confidence skip the LLM.
    pub confident_threshold: f32,
    /// Extraction calls estimated above this cost are logged at warn level.
    pub cost_warn_threshold: Decimal,
}

impl Default for ExtractorConfig {
    fn default() -> Self {
        Self {
            use_llm: true,
            llm_timeout: Duration::from_secs(8),
            max_tokens: 300,
            temperature: 0.0,
            confident_threshold: 0.7,
            cost_warn_threshold: dec!(0.01),
        }
    }
}

/// Full engine configuration.
#[derive(Debug, Clone, Default)]
pub struct EngineConfig {
    pub session: SessionConfig,
    pub extractor: ExtractorConfig,
}

impl EngineConfig {
    /// Build from `HEALTH_INTAKE_*` environment variables, falling back to defaults.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from an arbitrary key lookup. Keys are passed with the prefix applied.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();
        let s = &mut config.session;
        let x = &mut config.extractor;

        if let Some(v) = parse(&lookup, "INTAKE_MIN_FIELDS")? {
            s.intake.min_score = v;
        }
        if let Some(v) = parse(&lookup, "INTAKE_MAX_TURNS")? {
            s.intake.max_turns = v;
        }
        if let Some(v) = parse(&lookup, "FOLLOW_UP_MIN_FIELDS")? {
            s.follow_up.min_score = v;
        }
        if let Some(v) = parse(&lookup, "FOLLOW_UP_MAX_TURNS")? {
            s.follow_up.max_turns = v;
        }
        if let Some(v) = parse(&lookup, "GENERAL_MIN_LENGTH")? {
            s.general_min_length = v;
        }
        if let Some(v) = parse(&lookup, "MESSAGE_CAPACITY")? {
            s.message_capacity = v;
        }
        if let Some(secs) = parse::<u64, _>(&lookup, "PIPELINE_TIMEOUT_SECS")? {
            s.pipeline_timeout = Duration::from_secs(secs);
        }
        if let Some(v) = parse(&lookup, "HISTORY_SESSIONS")? {
            s.history_sessions = v;
        }
        if let Some(v) = parse(&lookup, "USE_LLM")? {
            x.use_llm = v;
        }
        if let Some(ms) = parse::<u64, _>(&lookup, "LLM_TIMEOUT_MS")? {
            x.llm_timeout = Duration::from_millis(ms);
        }
        if let Some(v) = parse(&lookup, "LLM_MAX_TOKENS")? {
            x.max_tokens = v;
        }

        if s.message_capacity == 0 {
            return Err(ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}MESSAGE_CAPACITY"),
                message: "must be at least 1".into(),
            });
        }
        if s.intake.max_turns == 0 || s.follow_up.max_turns == 0 {
            return Err(ConfigError::InvalidValue {
                key: format!("{ENV_PREFIX}*_MAX_TURNS"),
                message: "must be at least 1".into(),
            });
        }

        Ok(config)
    }
}

fn parse<T, F>(lookup: &F, name: &str) -> Result<Option<T>, ConfigError>
where
    T: FromStr,
    T::Err: Display,
    F: Fn(&str) -> Option<String>,
{
    let key = format!("{ENV_PREFIX}{name}");
    match lookup(&key) {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .map(Some)
            .map_err(|e| ConfigError::InvalidValue {
                key,
                message: e.to_string(),
            }),
        None => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use std::collections::HashMap;

    use super::*;

    fn lookup_from(pairs: &[(&str, &str)]) -> impl Fn(&str) -> Option<String> {
        let map: HashMap<String, String> = pairs
            .iter()
            .map(|(k, v)| (format!("{ENV_PREFIX}{k}"), v.to_string()))
            .collect();
        move |key| map.get(key).cloned()
    }

    #[test]
    fn defaults_match_session_limits() {
        let config = EngineConfig::default();
        assert_eq!(config.session.intake.min_score, 6.0);
        assert_eq!(config.session.intake.max_turns, 12);
        assert_eq!(config.session.follow_up.max_turns, 7);
        assert_eq!(config.session.message_capacity, 20);
        assert_eq!(config.session.max_clarification_attempts, 3);
        assert_eq!(config.extractor.llm_timeout, Duration::from_secs(8));
    }

    #[test]
    fn overrides_are_applied() {
        let config = EngineConfig::from_lookup(lookup_from(&[
            ("INTAKE_MIN_FIELDS", "4"),
            ("LLM_TIMEOUT_MS", "250"),
            ("USE_LLM", "false"),
            ("PIPELINE_TIMEOUT_SECS", "30"),
        ]))
        .unwrap();
        assert_eq!(config.session.pipeline_timeout, Duration::from_secs(30));
        assert_eq!(config.session.intake.min_score, 4.0);
        assert_eq!(config.extractor.llm_timeout, Duration::from_millis(250));
        assert!(!config.extractor.use_llm);
    }

    #[test]
    fn bad_value_is_rejected() {
        let err = EngineConfig::from_lookup(lookup_from(&[("INTAKE_MAX_TURNS", "lots")]))
            .unwrap_err();
        assert!(err.to_string().contains("HEALTH_INTAKE_INTAKE_MAX_TURNS"));
    }

    #[test]
    fn zero_capacity_is_rejected() {
        assert!(EngineConfig::from_lookup(lookup_from(&[("MESSAGE_CAPACITY", "0")])).is_err());
    }

    #[test]
    fn general_thresholds_use_turn_heuristic() {
        let config = SessionConfig::default();
        assert_eq!(config.thresholds(SessionType::General).max_turns, 2);
        assert_eq!(config.thresholds(SessionType::Intake).max_turns, 12);
    }
}
