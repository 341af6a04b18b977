//! Intervention data model.

use serde::{Deserialize, Serialize};

/// Kind of recommendation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InterventionType {
    HabitModification,
    HabitReplacement,
    BarrierRemoval,
    MotivationBoost,
    MedicalReferral,
    GoalAdjustment,
    SupportRecommendation,
}

/// A single recommendation shown to the user.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Intervention {
    pub intervention_type: InterventionType,
    pub title: String,
    pub description: String,
    /// 1 is the most urgent.
    pub priority: u8,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub target_habit: Option<String>,
    pub actions: Vec<String>,
    pub expected_outcome: String,
    pub requires_follow_up: bool,
}

impl Intervention {
    pub fn new(
        intervention_type: InterventionType,
        title: impl Into<String>,
        description: impl Into<String>,
        priority: u8,
    ) -> Self {
        Self {
            intervention_type,
            title: title.into(),
            description: description.into(),
            priority,
            target_habit: None,
            actions: Vec::new(),
            expected_outcome: String::new(),
            requires_follow_up: true,
        }
    }

    pub fn for_habit(mut self, habit: impl Into<String>) -> Self {
        self.target_habit = Some(habit.into());
        self
    }

    pub fn with_actions<I, S>(mut self, actions: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.actions = actions.into_iter().map(Into::into).collect();
        self
    }

    pub fn with_outcome(mut self, outcome: impl Into<String>) -> Self {
        self.expected_outcome = outcome.into();
        self
    }

    pub fn without_follow_up(mut self) -> Self {
        self.requires_follow_up = false;
        self
    }

    /// Marker shown before the title in the user-facing message.
    pub fn priority_marker(&self) -> &'static str {
        match self.priority {
            0 | 1 => "🔴",
            2 | 3 => "🟡",
            _ => "🟢",
        }
    }
}
