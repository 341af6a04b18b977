//! Pattern detection over user messages.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use chrono::Utc;
use once_cell::sync::Lazy;
use regex::Regex;
use tracing::debug;

use super::keywords;
use super::types::{
    AdherenceTrend, BarrierKind, DetectedPattern, Habit, HabitCurrentStatus, HabitMention,
    HabitStatus, MentionStatus, PatternType, Severity, TrendDirection,
};
use crate::semantic::knowledge::STOP_WORDS;
use crate::semantic::similarity::tokenize;

/// Evidence line appended to an escalated recurring barrier.
pub const RECURRENCE_MARKER: &str = "Mentioned again in current session";

static BP_READING: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"(\d{2,3})\s*/\s*(\d{2,3})").expect("valid BP pattern"));

/// Tunables for the detector.
#[derive(Debug, Clone)]
pub struct DetectorConfig {
    /// Evidence messages kept per pattern.
    pub evidence_limit: usize,
    /// Systolic change (mmHg) between first and last reading that counts as a trend.
    pub trend_delta: u32,
    /// Leading significant words of old evidence compared against new messages.
    pub recurrence_words: usize,
    /// Characters of each message kept in a habit summary.
    pub summary_chars: usize,
}

impl Default for DetectorConfig {
    fn default() -> Self {
        Self {
            evidence_limit: 3,
            trend_delta: 10,
            recurrence_words: 5,
            summary_chars: 100,
        }
    }
}

fn classify(message: &str) -> MentionStatus {
    if keywords::is_positive(message) {
        MentionStatus::Positive
    } else if keywords::is_negative(message) {
        MentionStatus::Negative
    } else {
        MentionStatus::Neutral
    }
}

/// Stateless analyzer; all inputs are passed per call.
#[derive(Debug, Clone, Default)]
pub struct PatternDetector {
    config: DetectorConfig,
}

impl PatternDetector {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DetectorConfig) -> Self {
        Self { config }
    }

    /// Patterns in the current session, escalating any prior barrier that recurs.
    pub fn analyze_session(
        &self,
        messages: &[String],
        prior: &[DetectedPattern],
    ) -> Vec<DetectedPattern> {
        let mut patterns = self.detect_barriers(messages);
        patterns.extend(self.detect_habit_changes(messages));
        if !prior.is_empty() {
            patterns.extend(self.detect_recurring(messages, prior));
        }
        patterns.extend(self.detect_stress(messages));

        debug!(
            messages = messages.len(),
            prior = prior.len(),
            found = patterns.len(),
            "Session pattern analysis complete"
        );
        patterns
    }

    /// Long-range patterns across earlier sessions' messages.
    pub fn analyze_history(&self, texts: &[String]) -> Vec<DetectedPattern> {
        if texts.is_empty() {
            return Vec::new();
        }
        let mut patterns = self.habit_trajectory(texts);
        patterns.extend(self.health_trends(texts));
        debug!(texts = texts.len(), found = patterns.len(), "History analysis complete");
        patterns
    }

    fn detect_barriers(&self, messages: &[String]) -> Vec<DetectedPattern> {
        let combined = messages.join(" ");
        let affected: Vec<&str> = keywords::habits_in(&combined)
            .into_iter()
            .map(Habit::as_str)
            .collect();

        BarrierKind::ALL
            .into_iter()
            .filter_map(|kind| {
                let mentions: Vec<&String> = messages
                    .iter()
                    .filter(|m| keywords::mentions_barrier(kind, m))
                    .collect();
                if mentions.is_empty() {
                    return None;
                }
                let severity = if mentions.len() >= 2 {
                    Severity::Medium
                } else {
                    Severity::Low
                };
                let confidence = 0.7 + 0.1 * mentions.len().min(3) as f32;
                let evidence = mentions
                    .iter()
                    .take(self.config.evidence_limit)
                    .map(|m| m.to_string())
                    .collect();

                Some(
                    DetectedPattern::new(
                        PatternType::RecurringBarrier,
                        format!("User mentions {kind}-related barriers"),
                        severity,
                        evidence,
                        confidence,
                    )
                    .with_recommendation(kind.recommendation())
                    .with_habits(affected.iter().copied())
                    .with_barrier(kind),
                )
            })
            .collect()
    }

    fn detect_habit_changes(&self, messages: &[String]) -> Vec<DetectedPattern> {
        let mut patterns = Vec::new();

        for habit in Habit::ALL {
            let mentions: Vec<(&String, MentionStatus)> = messages
                .iter()
                .filter(|m| keywords::mentions_habit(habit, m))
                .map(|m| (m, classify(m)))
                .collect();
            if mentions.is_empty() {
                continue;
            }

            let count = |status: MentionStatus| {
                mentions.iter().filter(|(_, s)| *s == status).count()
            };
            let negative = count(MentionStatus::Negative);
            let positive = count(MentionStatus::Positive);
            let evidence_for = |status: MentionStatus| {
                mentions
                    .iter()
                    .filter(|(_, s)| *s == status)
                    .take(self.config.evidence_limit)
                    .map(|(m, _)| m.to_string())
                    .collect::<Vec<_>>()
            };

            if negative > positive {
                let severity = if negative >= 2 {
                    Severity::Medium
                } else {
                    Severity::Low
                };
                patterns.push(
                    DetectedPattern::new(
                        PatternType::HabitDecline,
                        format!("User reports struggling with {habit} habit"),
                        severity,
                        evidence_for(MentionStatus::Negative),
                        0.6 + 0.1 * negative as f32,
                    )
                    .with_recommendation(format!(
                        "Consider modifying {habit} habit or addressing barriers"
                    ))
                    .with_habits([habit.as_str()]),
                );
            } else if positive > negative {
                patterns.push(
                    DetectedPattern::new(
                        PatternType::HabitImprovement,
                        format!("User reports success with {habit} habit"),
                        Severity::Low,
                        evidence_for(MentionStatus::Positive),
                        0.6 + 0.1 * positive as f32,
                    )
                    .with_recommendation(format!("Reinforce and potentially build on {habit} success"))
                    .with_habits([habit.as_str()]),
                );
            }
        }
        patterns
    }

    /// Significant leading words of a piece of evidence.
    fn leading_words(&self, evidence: &str) -> Vec<String> {
        tokenize(evidence)
            .into_iter()
            .filter(|w| !STOP_WORDS.contains(w.as_str()))
            .take(self.config.recurrence_words)
            .collect()
    }

    fn detect_recurring(
        &self,
        messages: &[String],
        prior: &[DetectedPattern],
    ) -> Vec<DetectedPattern> {
        let current: HashSet<String> = messages.iter().flat_map(|m| tokenize(m)).collect();
        let mut seen = HashSet::new();
        let mut escalated = Vec::new();

        for p in prior
            .iter()
            .filter(|p| p.pattern_type == PatternType::RecurringBarrier)
        {
            let evidence: Vec<String> = p
                .evidence
                .iter()
                .filter(|e| e.as_str() != RECURRENCE_MARKER)
                .cloned()
                .collect();
            let recurs = evidence
                .iter()
                .any(|e| self.leading_words(e).iter().any(|w| current.contains(w)));
            if !recurs {
                continue;
            }

            let description = p
                .description
                .strip_prefix("Recurring issue: ")
                .unwrap_or(&p.description);
            if !seen.insert(description.to_string()) {
                continue;
            }
            let base = p
                .recommendation
                .as_deref()
                .map(|r| {
                    r.rsplit_once("consider more significant intervention: ")
                        .map_or(r, |(_, tail)| tail)
                })
                .unwrap_or("address this barrier");

            let mut evidence = evidence;
            evidence.push(RECURRENCE_MARKER.to_string());
            let mut pattern = DetectedPattern::new(
                PatternType::RecurringBarrier,
                format!("Recurring issue: {description}"),
                Severity::High,
                evidence,
                0.85,
            )
            .with_recommendation(format!(
                "This barrier persists - consider more significant intervention: {base}"
            ))
            .with_habits(p.affected_habits.iter().cloned());
            pattern.barrier = p.barrier;
            escalated.push(pattern);
        }
        escalated
    }

    fn detect_stress(&self, messages: &[String]) -> Vec<DetectedPattern> {
        let combined = messages.join(" ");
        if !keywords::mentions_stress(&combined) {
            return Vec::new();
        }

        let any_negative = keywords::is_negative(&combined);
        let mut struggling: Vec<Habit> = if any_negative {
            keywords::habits_in(&combined)
        } else {
            Vec::new()
        };
        for msg in messages.iter().filter(|m| keywords::mentions_stress(m)) {
            for habit in keywords::habits_in(msg) {
                if !struggling.contains(&habit) {
                    struggling.push(habit);
                }
            }
        }
        if struggling.is_empty() {
            return Vec::new();
        }

        let evidence = messages
            .iter()
            .filter(|m| keywords::mentions_stress(m))
            .take(2)
            .cloned()
            .collect();

        vec![
            DetectedPattern::new(
                PatternType::StressCorrelation,
                "Stress appears linked to difficulty with habits",
                Severity::Medium,
                evidence,
                0.65,
            )
            .with_recommendation(
                "Address stress management first - consider relaxation techniques, reduce habit expectations temporarily",
            )
            .with_habits(struggling.into_iter().map(Habit::as_str)),
        ]
    }

    fn habit_trajectory(&self, texts: &[String]) -> Vec<DetectedPattern> {
        Habit::ALL
            .into_iter()
            .filter_map(|habit| {
                let mentioning = texts.iter().filter(|t| keywords::mentions_habit(habit, t));
                let (positive, negative) = mentioning.fold((0usize, 0usize), |(p, n), t| {
                    (
                        p + usize::from(keywords::is_positive(t)),
                        n + usize::from(keywords::is_negative(t)),
                    )
                });
                if positive + negative < 2 || negative <= positive * 2 {
                    return None;
                }
                Some(
                    DetectedPattern::new(
                        PatternType::HabitDecline,
                        format!("Historical pattern: {habit} habit shows declining adherence"),
                        Severity::High,
                        vec![format!("{negative} negative mentions vs {positive} positive")],
                        0.75,
                    )
                    .with_recommendation(format!(
                        "Significant intervention needed for {habit} - consider complete habit redesign"
                    ))
                    .with_habits([habit.as_str()]),
                )
            })
            .collect()
    }

    /// Blood-pressure trend between the first and last reading in `texts`.
    pub fn health_trends(&self, texts: &[String]) -> Vec<DetectedPattern> {
        let readings: Vec<(u32, u32)> = texts
            .iter()
            .flat_map(|t| BP_READING.captures_iter(t))
            .filter_map(|caps| {
                let systolic: u32 = caps[1].parse().ok()?;
                let diastolic: u32 = caps[2].parse().ok()?;
                ((70..=250).contains(&systolic) && (40..=150).contains(&diastolic))
                    .then_some((systolic, diastolic))
            })
            .collect();

        let (Some(first), Some(last)) = (readings.first(), readings.last()) else {
            return Vec::new();
        };
        if readings.len() < 2 {
            return Vec::new();
        }

        let delta = self.config.trend_delta;
        let listed = readings
            .iter()
            .map(|(s, d)| format!("{s}/{d}"))
            .collect::<Vec<_>>()
            .join(", ");
        let evidence = vec![format!("BP readings: {listed}")];

        let pattern = if last.0 >= first.0 + delta {
            DetectedPattern::new(
                PatternType::HealthTrend,
                "Blood pressure appears to be trending upward",
                Severity::High,
                evidence,
                0.7,
            )
            .with_recommendation(
                "Monitor closely, consider medication review, reinforce lifestyle modifications",
            )
            .with_trend(TrendDirection::Worsening)
        } else if last.0 + delta <= first.0 {
            DetectedPattern::new(
                PatternType::HealthTrend,
                "Blood pressure shows improvement",
                Severity::Low,
                evidence,
                0.7,
            )
            .with_recommendation("Continue current approach, maintain lifestyle modifications")
            .with_trend(TrendDirection::Improving)
        } else {
            return Vec::new();
        };
        vec![pattern]
    }

    /// Per-habit status across the given messages. Habits never mentioned are absent.
    pub fn habit_summary(&self, messages: &[String]) -> BTreeMap<Habit, HabitStatus> {
        let now = Utc::now();
        let mut summary = BTreeMap::new();

        for habit in Habit::ALL {
            let mut mentions = Vec::new();
            let mut barriers = BTreeSet::new();

            for msg in messages.iter().filter(|m| keywords::mentions_habit(habit, m)) {
                mentions.push(HabitMention {
                    message: msg.chars().take(self.config.summary_chars).collect(),
                    status: classify(msg),
                    timestamp: now,
                });
                barriers.extend(keywords::barriers_in(msg));
            }
            if mentions.is_empty() {
                continue;
            }

            let positive = mentions
                .iter()
                .filter(|m| m.status == MentionStatus::Positive)
                .count();
            let negative = mentions
                .iter()
                .filter(|m| m.status == MentionStatus::Negative)
                .count();
            let (current_status, adherence_trend) = match negative.cmp(&positive) {
                std::cmp::Ordering::Greater => {
                    (HabitCurrentStatus::Struggling, AdherenceTrend::Declining)
                }
                std::cmp::Ordering::Less => (HabitCurrentStatus::Active, AdherenceTrend::Improving),
                std::cmp::Ordering::Equal => (HabitCurrentStatus::Unknown, AdherenceTrend::Stable),
            };

            summary.insert(
                habit,
                HabitStatus {
                    habit,
                    mentions,
                    current_status,
                    adherence_trend,
                    barriers: barriers.into_iter().collect(),
                    last_updated: now,
                },
            );
        }
        summary
    }
}
