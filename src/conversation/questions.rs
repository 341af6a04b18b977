//! Next-question selection.
//!
//! Stateless: everything it needs (collected slots, turn number, pending
//! clarifications, urgent flags) is read from `ConversationState`, so the
//! same state always yields the same question.

use serde::Serialize;

use crate::conversation::field::{SessionType, names};
use crate::conversation::state::ConversationState;

/// Static description of one askable slot.
#[derive(Debug, Clone, Copy)]
pub struct FieldSpec {
    pub name: &'static str,
    /// How the slot is named in acknowledgements.
    pub label: &'static str,
    pub question: &'static str,
    /// 1 = highest.
    pub priority: u8,
    pub order: u8,
    /// Skip the slot when the known age is above this.
    pub skip_if_age_over: Option<f64>,
}

pub static INTAKE_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: names::AGE,
        label: "age",
        question: "How old are you?",
        priority: 1,
        order: 1,
        skip_if_age_over: None,
    },
    FieldSpec {
        name: names::SEX,
        label: "sex",
        question: "Are you male or female?",
        priority: 1,
        order: 2,
        skip_if_age_over: None,
    },
    FieldSpec {
        name: names::CONDITIONS,
        label: "conditions",
        question: "Do you have any existing health conditions like hypertension, diabetes, or heart disease? (You can say \"none\" if not)",
        priority: 1,
        order: 3,
        skip_if_age_over: None,
    },
    FieldSpec {
        name: names::FAMILY_HISTORY,
        label: "family history",
        question: "Does anyone in your family have hypertension, diabetes, or heart disease?",
        priority: 2,
        order: 4,
        skip_if_age_over: None,
    },
    FieldSpec {
        name: names::SMOKING,
        label: "smoking",
        question: "Do you smoke? (yes / no / quit)",
        priority: 2,
        order: 5,
        skip_if_age_over: Some(75.0),
    },
    FieldSpec {
        name: names::ALCOHOL,
        label: "alcohol",
        question: "Do you drink alcohol? (no / occasionally / regularly)",
        priority: 2,
        order: 6,
        skip_if_age_over: None,
    },
    FieldSpec {
        name: names::DIET,
        label: "diet",
        question: "What does your typical diet look like? (e.g., \"mostly rice and vegetables\")",
        priority: 2,
        order: 7,
        skip_if_age_over: None,
    },
    FieldSpec {
        name: names::ACTIVITY,
        label: "activity",
        question: "How physically active are you? (e.g., \"sedentary\", \"walk daily\", \"exercise 3x/week\")",
        priority: 2,
        order: 8,
        skip_if_age_over: None,
    },
    FieldSpec {
        name: names::CONSTRAINTS,
        label: "constraints",
        question: "Are there any constraints that might affect your health habits? (e.g., \"long work hours\", \"limited food access\") Or say \"none\"",
        priority: 3,
        order: 9,
        skip_if_age_over: None,
    },
];

pub static FOLLOW_UP_FIELDS: &[FieldSpec] = &[
    FieldSpec {
        name: names::HABITS_FOLLOWED,
        label: "progress",
        question: "Which habits from your plan have you been able to follow?",
        priority: 1,
        order: 1,
        skip_if_age_over: None,
    },
    FieldSpec {
        name: names::HABITS_STRUGGLED,
        label: "struggles",
        question: "Have you stopped or struggled with any habits? Which ones and why?",
        priority: 1,
        order: 2,
        skip_if_age_over: None,
    },
    FieldSpec {
        name: names::HEALTH_READINGS,
        label: "health readings",
        question: "Have you had any recent health readings like blood pressure or weight?",
        priority: 1,
        order: 3,
        skip_if_age_over: None,
    },
    FieldSpec {
        name: names::BARRIERS,
        label: "barriers",
        question: "Are you facing any challenges or barriers to following your plan?",
        priority: 1,
        order: 4,
        skip_if_age_over: None,
    },
    FieldSpec {
        name: names::FEELINGS,
        label: "feelings",
        question: "How are you feeling overall? Any symptoms or concerns?",
        priority: 1,
        order: 5,
        skip_if_age_over: None,
    },
];

/// Generic acknowledgements, rotated by turn number.
pub const ACKNOWLEDGMENTS: &[&str] = &[
    "Thanks for sharing that!",
    "Got it, thank you.",
    "I've noted that.",
    "Thanks! That helps.",
    "Understood.",
    "Great, thanks.",
];

/// Fixed safety message returned on every turn while an urgent flag is set.
pub const URGENT_RESPONSE: &str = "⚠️ **IMPORTANT**: You mentioned symptoms that could be signs of a serious condition.

**Please seek immediate medical attention:**
- Go to your nearest emergency room, OR
- Call emergency services (911 / your local emergency number)

Do not wait to see if symptoms improve. Your health is the priority.

Once you've received medical care, we can continue with your health plan.";

const CLARIFICATION_PREFIX: &str = "I need a bit more detail:";
const IMPLIED_ACK: &str = "Got it, thanks for that context.";

/// A question plus the slot it asks about (none for the urgent message).
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct NextQuestion {
    pub text: String,
    pub field: Option<String>,
}

impl NextQuestion {
    fn new(text: impl Into<String>, field: Option<&str>) -> Self {
        Self {
            text: text.into(),
            field: field.map(str::to_string),
        }
    }
}

/// Slot specs asked in a session type. General sessions ask nothing.
pub fn field_specs(session_type: SessionType) -> &'static [FieldSpec] {
    match session_type {
        SessionType::Intake => INTAKE_FIELDS,
        SessionType::FollowUp => FOLLOW_UP_FIELDS,
        SessionType::General => &[],
    }
}

/// Look up a slot spec by name across all session types.
pub fn field_spec(name: &str) -> Option<&'static FieldSpec> {
    INTAKE_FIELDS
        .iter()
        .chain(FOLLOW_UP_FIELDS.iter())
        .find(|s| s.name == name)
}

/// Chooses what to ask next.
#[derive(Debug, Clone, Default)]
pub struct QuestionGenerator;

impl QuestionGenerator {
    pub fn new() -> Self {
        Self
    }

    /// Next question for the state's session, or `None` when nothing is left.
    pub fn next_question(&self, state: &ConversationState) -> Option<NextQuestion> {
        if state.has_urgent_symptoms() {
            return Some(NextQuestion::new(URGENT_RESPONSE, None));
        }

        if let Some(field) = state
            .fields_needing_clarification()
            .into_iter()
            .find(|f| f.clarifying_question.is_some())
            && let Some(q) = &field.clarifying_question
        {
            return Some(NextQuestion::new(
                format!("{CLARIFICATION_PREFIX} {q}"),
                Some(&field.name),
            ));
        }

        let spec = self.missing_fields(state).into_iter().next()?;
        let text = if state.turn_count() > 0 {
            format!("{}\n\n{}", self.acknowledgement(state), spec.question)
        } else {
            spec.question.to_string()
        };
        Some(NextQuestion::new(text, Some(spec.name)))
    }

    /// Unanswered slots for the session type, by (priority, order).
    pub fn missing_fields(&self, state: &ConversationState) -> Vec<&'static FieldSpec> {
        let age = state.field_value(names::AGE).and_then(|v| v.as_f64());

        let mut missing: Vec<&'static FieldSpec> = field_specs(state.session_type())
            .iter()
            .filter(|spec| !state.has_field(spec.name))
            .filter(|spec| match (spec.skip_if_age_over, age) {
                (Some(limit), Some(age)) => age <= limit,
                _ => true,
            })
            .collect();
        missing.sort_by_key(|spec| (spec.priority, spec.order));
        missing
    }

    /// Acknowledge what the previous user turn contributed.
    pub fn acknowledgement(&self, state: &ConversationState) -> String {
        let mut recent = state.fields_from_turn(state.turn_count());
        recent.sort_by_key(|f| field_spec(&f.name).map_or(u8::MAX, |s| s.order));
        let labels: Vec<String> = recent
            .iter()
            .map(|f| match field_spec(&f.name) {
                Some(spec) => spec.label.to_string(),
                None => f.name.replace('_', " "),
            })
            .collect();

        match labels.as_slice() {
            [] if state.implied_on_turn(state.turn_count()) => IMPLIED_ACK.to_string(),
            [] => {
                let idx = state.turn_count() as usize % ACKNOWLEDGMENTS.len();
                ACKNOWLEDGMENTS[idx].to_string()
            }
            [only] => format!("Thanks! I've noted your {only}."),
            [init @ .., last] => format!("Thanks! I've noted your {} and {last}.", init.join(", ")),
        }
    }

    /// Opening message and the slot it asks about.
    pub fn welcome(&self, session_type: SessionType, habits: &[String]) -> NextQuestion {
        match session_type {
            SessionType::Intake => NextQuestion::new(
                format!(
                    "Welcome! I'm here to help assess your health profile and create a personalized wellness plan.\n\nLet's start: {}",
                    INTAKE_FIELDS[0].question
                ),
                Some(names::AGE),
            ),
            SessionType::FollowUp if !habits.is_empty() => {
                let list: Vec<String> = habits.iter().take(4).map(|h| format!("  • {h}")).collect();
                NextQuestion::new(
                    format!(
                        "Welcome back! Last time we set up these habits for you:\n{}\n\nHow have things been going? Which habits have you been able to follow?",
                        list.join("\n")
                    ),
                    Some(names::HABITS_FOLLOWED),
                )
            }
            SessionType::FollowUp => NextQuestion::new(
                "Welcome back! Let's check in on your progress.\n\nWhich habits from your plan have you been able to follow?",
                Some(names::HABITS_FOLLOWED),
            ),
            SessionType::General => NextQuestion::new(
                "Hi! I can help answer health questions about diet, exercise, blood pressure, diabetes, and healthy habits.\n\nWhat would you like to know?",
                None,
            ),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::conversation::field::{FieldConfidence, FieldValue};

    fn set(state: &mut ConversationState, name: &str, value: FieldValue) {
        state.set_field(name, value, FieldConfidence::High, "", None);
    }

    #[test]
    fn first_question_is_age_without_ack() {
        let state = ConversationState::new("u", SessionType::Intake);
        let q = QuestionGenerator::new().next_question(&state).unwrap();
        assert_eq!(q.field.as_deref(), Some(names::AGE));
        assert_eq!(q.text, "How old are you?");
    }

    #[test]
    fn ack_names_fields_from_previous_turn() {
        let mut state = ConversationState::new("u", SessionType::Intake);
        state.add_user_message("I'm a 45 year old man");
        set(&mut state, names::AGE, 45u32.into());
        set(&mut state, names::SEX, "male".into());

        let q = QuestionGenerator::new().next_question(&state).unwrap();
        assert_eq!(q.field.as_deref(), Some(names::CONDITIONS));
        assert!(q.text.starts_with("Thanks! I've noted your age and sex."));
    }

    #[test]
    fn ack_lists_three_fields() {
        let mut state = ConversationState::new("u", SessionType::Intake);
        state.add_user_message("45, male, no conditions");
        set(&mut state, names::CONDITIONS, "none".into());
        set(&mut state, names::AGE, 45u32.into());
        set(&mut state, names::SEX, "male".into());
        let ack = QuestionGenerator::new().acknowledgement(&state);
        assert_eq!(ack, "Thanks! I've noted your age, sex and conditions.");
    }

    #[test]
    fn generic_ack_rotates_by_turn() {
        let mut state = ConversationState::new("u", SessionType::Intake);
        state.add_user_message("hmm");
        let first = QuestionGenerator::new().acknowledgement(&state);
        state.add_user_message("hmm");
        let second = QuestionGenerator::new().acknowledgement(&state);
        assert_eq!(first, ACKNOWLEDGMENTS[1]);
        assert_eq!(second, ACKNOWLEDGMENTS[2]);
    }

    #[test]
    fn implied_facts_get_context_ack() {
        let mut state = ConversationState::new("u", SessionType::Intake);
        state.add_user_message("I work night shifts");
        state.set_implied("sleep_pattern", "irregular (works nights)", "context");
        let ack = QuestionGenerator::new().acknowledgement(&state);
        assert_eq!(ack, "Got it, thanks for that context.");

        // The next turn captured nothing, so it gets a generic acknowledgement.
        state.add_user_message("hmm");
        let ack = QuestionGenerator::new().acknowledgement(&state);
        assert_eq!(ack, ACKNOWLEDGMENTS[2]);
    }

    #[test]
    fn clarification_is_asked_first() {
        let mut state = ConversationState::new("u", SessionType::Intake);
        state.add_user_message("sort of");
        state.set_field(
            names::SMOKING,
            "occasionally".into(),
            FieldConfidence::Medium,
            "sort of",
            None,
        );
        state.mark_ambiguous(names::SMOKING, "Do you smoke cigarettes?");
        let q = QuestionGenerator::new().next_question(&state).unwrap();
        assert_eq!(q.field.as_deref(), Some(names::SMOKING));
        assert_eq!(q.text, "I need a bit more detail: Do you smoke cigarettes?");
    }

    #[test]
    fn urgent_overrides_everything() {
        let mut state = ConversationState::new("u", SessionType::Intake);
        state.add_urgent_flag("chest pain");
        let q = QuestionGenerator::new().next_question(&state).unwrap();
        assert_eq!(q.text, URGENT_RESPONSE);
        assert!(q.field.is_none());
    }

    #[test]
    fn smoking_skipped_for_elderly() {
        let mut state = ConversationState::new("u", SessionType::Intake);
        for (name, value) in [
            (names::AGE, FieldValue::from(80u32)),
            (names::SEX, "female".into()),
            (names::CONDITIONS, "none".into()),
            (names::FAMILY_HISTORY, "none".into()),
        ] {
            set(&mut state, name, value);
        }
        let q = QuestionGenerator::new().next_question(&state).unwrap();
        assert_eq!(q.field.as_deref(), Some(names::ALCOHOL));
    }

    #[test]
    fn done_when_all_fields_collected() {
        let mut state = ConversationState::new("u", SessionType::Intake);
        for spec in INTAKE_FIELDS {
            set(&mut state, spec.name, "x".into());
        }
        assert!(QuestionGenerator::new().next_question(&state).is_none());
    }

    #[test]
    fn follow_up_walks_its_own_fields() {
        let mut state = ConversationState::new("u", SessionType::FollowUp);
        state.add_user_message("I kept walking");
        set(&mut state, names::HABITS_FOLLOWED, "I kept walking".into());
        let q = QuestionGenerator::new().next_question(&state).unwrap();
        assert_eq!(q.field.as_deref(), Some(names::HABITS_STRUGGLED));
        assert!(q.text.starts_with("Thanks! I've noted your progress."));
    }

    #[test]
    fn general_sessions_ask_nothing() {
        let state = ConversationState::new("u", SessionType::General);
        assert!(QuestionGenerator::new().next_question(&state).is_none());
    }

    #[test]
    fn welcome_messages() {
        let generator = QuestionGenerator::new();
        let intake = generator.welcome(SessionType::Intake, &[]);
        assert_eq!(intake.field.as_deref(), Some(names::AGE));
        assert!(intake.text.ends_with("How old are you?"));

        let habits: Vec<String> = ["walk 20 min", "less salt", "drink water", "sleep by 11", "extra"]
            .iter()
            .map(|s| s.to_string())
            .collect();
        let follow = generator.welcome(SessionType::FollowUp, &habits);
        assert!(follow.text.contains("  • sleep by 11"));
        assert!(!follow.text.contains("extra"));
        assert_eq!(follow.field.as_deref(), Some(names::HABITS_FOLLOWED));

        assert!(generator.welcome(SessionType::General, &[]).field.is_none());
    }
}
