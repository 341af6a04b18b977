//! Turns detected patterns into prioritized interventions.

use std::collections::{BTreeMap, HashSet};

use tracing::debug;

use super::model::{Intervention, InterventionType};
use crate::patterns::{
    BarrierKind, DetectedPattern, Habit, HabitStatus, PatternType, Severity, TrendDirection,
};

/// Most interventions returned by `generate`.
const MAX_INTERVENTIONS: usize = 5;
/// Interventions rendered by `format_message`.
const MAX_SHOWN: usize = 3;
/// Actions rendered per intervention.
const MAX_ACTIONS_SHOWN: usize = 3;
/// Struggling habits that trigger the "focus on one habit" advice.
const SIMPLIFY_THRESHOLD: usize = 3;

const MESSAGE_HEADER: &str = "📋 **Personalized Recommendations Based on Your Progress:**";

/// Alternatives for a habit blocked by a barrier. Empty when none are known.
pub fn alternatives(habit: Habit, barrier: BarrierKind) -> &'static [&'static str] {
    use BarrierKind as B;
    use Habit as H;

    match (habit, barrier) {
        (H::Walking, B::Weather) => &[
            "indoor walking (mall, home)",
            "stair climbing",
            "marching in place",
        ],
        (H::Walking, B::Time) => &[
            "10-minute walks 2x daily",
            "walking during phone calls",
            "parking farther away",
        ],
        (H::Walking, B::Health) => &[
            "gentle stretching",
            "chair exercises",
            "slow-paced walking",
        ],
        (H::Walking, B::Motivation) => &[
            "walking with music/podcasts",
            "step counting challenge",
            "walking buddy",
        ],
        (H::Exercise, B::Weather) => &[
            "home workout videos",
            "yoga",
            "resistance bands at home",
        ],
        (H::Exercise, B::Time) => &[
            "7-minute HIIT",
            "exercise during TV commercials",
            "morning micro-workouts",
        ],
        (H::Exercise, B::Health) => &[
            "chair exercises",
            "water aerobics",
            "physical therapy exercises",
        ],
        (H::Exercise, B::Access) => &[
            "bodyweight exercises",
            "free YouTube workouts",
            "community center programs",
        ],
        (H::Diet, B::Time) => &[
            "meal prep on weekends",
            "healthy snack pre-packing",
            "simple one-pot meals",
        ],
        (H::Diet, B::Access) => &[
            "affordable healthy staples list",
            "seasonal produce focus",
            "community gardens",
        ],
        (H::Diet, B::Motivation) => &[
            "one healthy swap per week",
            "photo food diary",
            "cooking with family",
        ],
        (H::Water, B::Motivation) => &[
            "water bottle with time markers",
            "phone reminders",
            "habit stacking with meals",
        ],
        (H::Water, B::Time) => &[
            "keep water at desk/bedside",
            "infused water for taste",
            "water before each meal",
        ],
        (H::Medication, B::Motivation) => &[
            "pill organizer",
            "phone alarms",
            "habit stack with meals",
        ],
        (H::Medication, B::Time) => &[
            "same time every day routine",
            "keep medications visible",
            "weekly pill prep",
        ],
        (H::Monitoring, B::Time) => &[
            "same time each day",
            "after morning routine",
            "before bed routine",
        ],
        (H::Monitoring, B::Motivation) => &[
            "tracking app",
            "share with family",
            "health diary",
        ],
        _ => &[],
    }
}

/// Barrier kind of a pattern, falling back to its description for
/// patterns stored without the typed field.
fn barrier_of(pattern: &DetectedPattern) -> Option<BarrierKind> {
    pattern.barrier.or_else(|| {
        let description = pattern.description.to_lowercase();
        BarrierKind::ALL
            .into_iter()
            .find(|k| description.contains(k.as_str()))
    })
}

fn is_worsening(pattern: &DetectedPattern) -> bool {
    match pattern.trend {
        Some(trend) => trend == TrendDirection::Worsening,
        None => {
            let description = pattern.description.to_lowercase();
            description.contains("upward") || description.contains("trending up")
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct InterventionEngine;

impl InterventionEngine {
    pub fn new() -> Self {
        Self
    }

    /// Interventions for the given patterns, most urgent first, unique by
    /// title, at most five.
    pub fn generate(
        &self,
        patterns: &[DetectedPattern],
        habit_summary: &BTreeMap<Habit, HabitStatus>,
    ) -> Vec<Intervention> {
        let mut all: Vec<Intervention> = patterns.iter().flat_map(|p| self.for_pattern(p)).collect();
        all.extend(self.from_summary(habit_summary));

        // Stable, so equal priorities keep pattern order.
        all.sort_by_key(|i| i.priority);

        let mut seen = HashSet::new();
        let generated: Vec<Intervention> = all
            .into_iter()
            .filter(|i| seen.insert(i.title.clone()))
            .take(MAX_INTERVENTIONS)
            .collect();

        debug!(
            patterns = patterns.len(),
            interventions = generated.len(),
            "Generated interventions"
        );
        generated
    }

    fn for_pattern(&self, pattern: &DetectedPattern) -> Vec<Intervention> {
        match pattern.pattern_type {
            PatternType::RecurringBarrier => self.for_barrier(pattern),
            PatternType::HabitDecline => self.for_decline(pattern),
            PatternType::HabitImprovement => self.for_improvement(pattern),
            PatternType::StressCorrelation => self.for_stress(pattern),
            PatternType::HealthTrend => vec![self.for_health_trend(pattern)],
            PatternType::SeasonalPattern | PatternType::TimeConstraint => Vec::new(),
        }
    }

    fn for_barrier(&self, pattern: &DetectedPattern) -> Vec<Intervention> {
        let Some(barrier) = barrier_of(pattern) else {
            return Vec::new();
        };
        let priority = if pattern.severity == Severity::High { 2 } else { 3 };

        pattern
            .affected_habits
            .iter()
            .filter_map(|name| {
                let habit: Habit = name.parse().ok()?;
                let options = alternatives(habit, barrier);
                if options.is_empty() {
                    return None;
                }
                Some(
                    Intervention::new(
                        InterventionType::HabitModification,
                        format!("Modify {habit} habit for {barrier} constraints"),
                        format!(
                            "Your {barrier} constraints are affecting {habit}. Here are alternatives that work around this barrier."
                        ),
                        priority,
                    )
                    .for_habit(habit.as_str())
                    .with_actions(options.iter().take(3).copied())
                    .with_outcome(format!(
                        "Maintain {habit} benefits despite {barrier} limitations"
                    )),
                )
            })
            .collect()
    }

    fn for_decline(&self, pattern: &DetectedPattern) -> Vec<Intervention> {
        pattern
            .affected_habits
            .iter()
            .map(|habit| {
                if pattern.severity.is_high() {
                    Intervention::new(
                        InterventionType::GoalAdjustment,
                        format!("Reset {habit} habit with easier goal"),
                        format!(
                            "The {habit} habit has been declining. Let's reset with a more achievable starting point."
                        ),
                        1,
                    )
                    .for_habit(habit.as_str())
                    .with_actions([
                        format!("Reduce {habit} goal by 50% for 2 weeks"),
                        "Focus on consistency over intensity".to_string(),
                        "Track completion, not perfection".to_string(),
                        "Celebrate small wins".to_string(),
                    ])
                    .with_outcome("Rebuild habit momentum with achievable goals")
                } else {
                    Intervention::new(
                        InterventionType::MotivationBoost,
                        format!("Reinvigorate {habit} habit"),
                        format!("Let's find ways to make {habit} more engaging and sustainable."),
                        3,
                    )
                    .for_habit(habit.as_str())
                    .with_actions([
                        "Identify what made it work initially",
                        "Add variety or social element",
                        "Connect habit to meaningful personal goal",
                    ])
                    .with_outcome("Renewed engagement with habit")
                }
            })
            .collect()
    }

    fn for_improvement(&self, pattern: &DetectedPattern) -> Vec<Intervention> {
        pattern
            .affected_habits
            .iter()
            .map(|habit| {
                Intervention::new(
                    InterventionType::GoalAdjustment,
                    format!("Build on {habit} success"),
                    format!("Great progress with {habit}! Let's consider leveling up."),
                    4,
                )
                .for_habit(habit.as_str())
                .with_actions([
                    format!("Consider increasing {habit} duration or frequency by 10-20%"),
                    "Add a complementary habit".to_string(),
                    "Share success strategy with others".to_string(),
                ])
                .with_outcome("Sustained and enhanced habit performance")
                .without_follow_up()
            })
            .collect()
    }

    fn for_stress(&self, pattern: &DetectedPattern) -> Vec<Intervention> {
        let support = Intervention::new(
            InterventionType::SupportRecommendation,
            "Address stress to support habit adherence",
            "Stress appears to be affecting your habits. Managing stress may help with overall health goals.",
            2,
        )
        .with_actions([
            "Consider 5-minute daily breathing exercises",
            "Identify top stress triggers",
            "Temporarily simplify health goals",
            "Consider speaking with a counselor if stress persists",
        ])
        .with_outcome("Reduced stress impact on habit adherence");

        std::iter::once(support)
            .chain(pattern.affected_habits.iter().map(|habit| {
                Intervention::new(
                    InterventionType::GoalAdjustment,
                    format!("Temporarily adjust {habit} expectations"),
                    format!(
                        "During high stress, maintain {habit} at a reduced level rather than stopping completely."
                    ),
                    3,
                )
                .for_habit(habit.as_str())
                .with_actions([
                    format!("Reduce {habit} goal to minimum viable version"),
                    "Focus on not breaking the chain".to_string(),
                    "Any amount counts during stressful periods".to_string(),
                ])
                .with_outcome("Habit maintained at reduced level until stress decreases")
            }))
            .collect()
    }

    fn for_health_trend(&self, pattern: &DetectedPattern) -> Intervention {
        if is_worsening(pattern) {
            Intervention::new(
                InterventionType::MedicalReferral,
                "Health metrics require attention",
                pattern.description.as_str(),
                1,
            )
            .with_actions([
                "Schedule follow-up with healthcare provider",
                "Review current medications with doctor",
                "Increase monitoring frequency",
                "Double down on lifestyle modifications",
            ])
            .with_outcome("Professional guidance on managing health trend")
        } else {
            Intervention::new(
                InterventionType::MotivationBoost,
                "Health metrics improving - keep going!",
                pattern.description.as_str(),
                5,
            )
            .with_actions([
                "Continue current approach",
                "Document what's working",
                "Share progress with healthcare provider",
            ])
            .with_outcome("Sustained health improvement")
            .without_follow_up()
        }
    }

    fn from_summary(&self, summary: &BTreeMap<Habit, HabitStatus>) -> Option<Intervention> {
        let struggling = summary.values().filter(|s| s.is_struggling()).count();
        if struggling < SIMPLIFY_THRESHOLD {
            return None;
        }
        Some(
            Intervention::new(
                InterventionType::GoalAdjustment,
                "Simplify - Focus on one habit at a time",
                "Multiple habits are struggling. Research shows focusing on one habit leads to better success.",
                1,
            )
            .with_actions([
                "Choose the easiest habit to restart",
                "Put other habits on 'maintenance mode'",
                "Rebuild one habit fully before adding another",
                "Aim for 2 weeks of consistency before expanding",
            ])
            .with_outcome("Successful habit building through focused effort"),
        )
    }

    /// Markdown block for the top three interventions. Empty when there are none.
    pub fn format_message(&self, interventions: &[Intervention]) -> String {
        if interventions.is_empty() {
            return String::new();
        }

        let mut lines = vec![MESSAGE_HEADER.to_string(), String::new()];
        for (i, intervention) in interventions.iter().take(MAX_SHOWN).enumerate() {
            lines.push(format!(
                "{} **{}. {}**",
                intervention.priority_marker(),
                i + 1,
                intervention.title
            ));
            lines.push(format!("   {}", intervention.description));
            lines.push("   *Suggested actions:*".to_string());
            for action in intervention.actions.iter().take(MAX_ACTIONS_SHOWN) {
                lines.push(format!("   • {action}"));
            }
            lines.push(String::new());
        }
        lines.join("\n")
    }
}
