//! Pipeline output → user-facing markdown.
//!
//! Handles three shapes: plain prose (passed through), a structured
//! document (habit plan, risk assessment, safety review), and prose that
//! wraps a JSON safety review.

use once_cell::sync::Lazy;
use regex::Regex;
use serde::Deserialize;
use serde_json::Value;
use tracing::debug;

use super::types::PipelineOutput;

static REVISED_RESPONSE: Lazy<Regex> = Lazy::new(|| {
    Regex::new(r#"(?s)"revised_response"\s*:\s*"(.*?)"\s*[,}]"#)
        .expect("valid revised_response pattern")
});

static COMMA_BREAK: Lazy<Regex> = Lazy::new(|| Regex::new(r",\s*").expect("valid comma pattern"));
static COLON_SPACE: Lazy<Regex> = Lazy::new(|| Regex::new(r":\s*").expect("valid colon pattern"));

fn default_weeks() -> u32 {
    4
}

fn default_action() -> String {
    "Habit".to_string()
}

fn unknown() -> String {
    "unknown".to_string()
}

#[derive(Debug, Deserialize)]
struct HabitPlan {
    #[serde(default = "default_weeks")]
    duration_weeks: u32,
    #[serde(default)]
    focus_areas: Vec<String>,
    #[serde(default)]
    habits: Vec<PlannedHabit>,
    #[serde(default)]
    motivational_message: String,
}

#[derive(Debug, Deserialize)]
struct PlannedHabit {
    #[serde(default = "default_action")]
    action: String,
    #[serde(default)]
    frequency: String,
    #[serde(default)]
    trigger: String,
    #[serde(default)]
    rationale: String,
}

#[derive(Debug, Deserialize)]
struct RiskAssessment {
    #[serde(default = "unknown")]
    hypertension_risk: String,
    #[serde(default = "unknown")]
    diabetes_risk: String,
    #[serde(default)]
    key_drivers: Vec<String>,
    #[serde(default)]
    explanation: String,
}

#[derive(Debug, Deserialize)]
struct SafetyReview {
    #[serde(default)]
    is_safe: bool,
    #[serde(default)]
    revised_response: Option<Value>,
    #[serde(default)]
    flagged_issues: Vec<String>,
}

/// Render a pipeline result for the user.
pub fn format_output(output: &PipelineOutput) -> String {
    match output {
        PipelineOutput::Json(value) => format_json(value),
        PipelineOutput::Text(raw) => format_text(raw),
    }
}

fn format_text(raw: &str) -> String {
    if let Ok(value) = serde_json::from_str::<Value>(raw)
        && value.is_object()
    {
        return format_json(&value);
    }

    if let Some(caps) = REVISED_RESPONSE.captures(raw) {
        let inner = caps[1].replace("\\\"", "\"").replace("\\n", "\n");
        debug!("Unwrapped revised_response from pipeline text");
        return match serde_json::from_str::<Value>(&inner) {
            Ok(value) if value.is_object() => format_json(&value),
            _ => inner,
        };
    }

    if raw.trim_start().starts_with('{') {
        return clean_json_to_text(raw);
    }
    raw.to_string()
}

fn format_json(value: &Value) -> String {
    let Some(obj) = value.as_object() else {
        return match value {
            Value::String(s) => format_text(s),
            other => clean_json_to_text(&other.to_string()),
        };
    };

    if obj.contains_key("habits")
        && let Ok(plan) = serde_json::from_value::<HabitPlan>(value.clone())
    {
        return format_habit_plan(&plan);
    }
    if obj.contains_key("hypertension_risk")
        && let Ok(risk) = serde_json::from_value::<RiskAssessment>(value.clone())
    {
        return format_risk(&risk);
    }
    if (obj.contains_key("revised_response") || obj.contains_key("is_safe"))
        && let Ok(review) = serde_json::from_value::<SafetyReview>(value.clone())
    {
        return format_safety_review(&review);
    }

    clean_json_to_text(&value.to_string())
}

fn format_safety_review(review: &SafetyReview) -> String {
    match &review.revised_response {
        Some(Value::String(s)) if !s.trim().is_empty() => format_text(s),
        Some(v @ Value::Object(_)) => format_json(v),
        _ if review.is_safe => "Your plan has been reviewed and is safe to follow. \
             Please check your habit plan above for details."
            .to_string(),
        _ => {
            let issues = review
                .flagged_issues
                .iter()
                .map(|i| format!("- {i}"))
                .collect::<Vec<_>>()
                .join("\n");
            format!(
                "Some safety concerns were found:\n{issues}\nPlease consult a healthcare provider."
            )
        }
    }
}

fn format_habit_plan(plan: &HabitPlan) -> String {
    let mut lines = vec![format!("## Your {}-Week Health Plan\n", plan.duration_weeks)];

    if !plan.focus_areas.is_empty() {
        lines.push(format!("**Focus areas:** {}\n", plan.focus_areas.join(", ")));
    }

    for (i, habit) in plan.habits.iter().enumerate() {
        lines.push(format!("### Habit {}: {}", i + 1, habit.action));
        if !habit.frequency.is_empty() {
            lines.push(format!("**Frequency:** {}", habit.frequency));
        }
        if !habit.trigger.is_empty() {
            lines.push(format!("**When:** {}", habit.trigger));
        }
        if !habit.rationale.is_empty() {
            lines.push(format!("**Why:** {}", habit.rationale));
        }
        lines.push(String::new());
    }

    if !plan.motivational_message.is_empty() {
        lines.push(format!("---\n*{}*", plan.motivational_message));
    }
    lines.join("\n")
}

fn capitalize(s: &str) -> String {
    let mut chars = s.chars();
    match chars.next() {
        Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
        None => String::new(),
    }
}

fn format_risk(risk: &RiskAssessment) -> String {
    let mut lines = vec![
        "## Your Risk Profile\n".to_string(),
        format!("- **Hypertension risk:** {}", capitalize(&risk.hypertension_risk)),
        format!("- **Type 2 diabetes risk:** {}\n", capitalize(&risk.diabetes_risk)),
    ];

    if !risk.key_drivers.is_empty() {
        lines.push("**Key factors:**".to_string());
        lines.extend(risk.key_drivers.iter().map(|d| format!("  - {d}")));
    }
    if !risk.explanation.is_empty() {
        lines.push(format!("\n{}", risk.explanation));
    }
    lines.join("\n")
}

/// Last resort: strip JSON punctuation so the text is at least readable.
fn clean_json_to_text(raw: &str) -> String {
    let stripped: String = raw.chars().filter(|c| !matches!(c, '{' | '}' | '"')).collect();
    let broken = COMMA_BREAK.replace_all(&stripped, "\n");
    COLON_SPACE.replace_all(&broken, ": ").trim().to_string()
}
