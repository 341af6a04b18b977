//! LLM extraction prompt and response parsing.

use std::collections::BTreeMap;

use serde::Deserialize;

use crate::conversation::FieldValue;

/// How many recent messages are quoted in the prompt.
const PROMPT_CONTEXT_MESSAGES: usize = 3;

const DEFAULT_LLM_CONFIDENCE: f32 = 0.8;

/// Build the single-turn extraction prompt.
pub fn build_extraction_prompt(message: &str, context: &[String], last_field: Option<&str>) -> String {
    let mut prompt = String::new();

    if !context.is_empty() {
        let skip = context.len().saturating_sub(PROMPT_CONTEXT_MESSAGES);
        prompt.push_str("Recent messages:\n");
        for m in context.iter().skip(skip) {
            prompt.push_str(&format!("- {m}\n"));
        }
        prompt.push('\n');
    }

    if let Some(field) = last_field {
        prompt.push_str(&format!(
            "We just asked about '{field}', so this likely answers that.\n\n"
        ));
    }

    prompt.push_str(&format!(
        r#"User said: "{message}"

Extract health information. Return JSON only:
{{
  "fields": {{
    "field_name": {{"value": "...", "confidence": 0.9}}
  }},
  "implied": {{}}
}}

Fields: age (number), sex (male/female), conditions (list or "none"), family_history, smoking (yes/no/former), alcohol (no/occasionally/regularly), diet, activity, constraints"#
    ));
    prompt
}

fn default_confidence() -> f32 {
    DEFAULT_LLM_CONFIDENCE
}

/// One field as returned by the model.
#[derive(Debug, Clone, Deserialize)]
pub struct LlmField {
    #[serde(default)]
    pub value: Option<FieldValue>,
    #[serde(default = "default_confidence")]
    pub confidence: f32,
}

/// The model's JSON object.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct LlmFields {
    #[serde(default)]
    pub fields: BTreeMap<String, LlmField>,
    #[serde(default)]
    pub implied: BTreeMap<String, FieldValue>,
}

impl LlmFields {
    /// Fields that carry a value, with confidence clamped to 0..=1.
    pub fn valued(&self) -> impl Iterator<Item = (&str, &FieldValue, f32)> {
        self.fields.iter().filter_map(|(name, f)| {
            f.value
                .as_ref()
                .map(|v| (name.as_str(), v, f.confidence.clamp(0.0, 1.0)))
        })
    }

    pub fn implied_strings(&self) -> BTreeMap<String, String> {
        self.implied
            .iter()
            .map(|(k, v)| (k.clone(), v.to_string()))
            .collect()
    }
}

/// Parsed model output, or the raw text when it was not usable JSON.
#[derive(Debug, Clone)]
pub enum LlmExtraction {
    Parsed(LlmFields),
    Malformed { raw: String, reason: String },
}

/// Parse a completion into `LlmExtraction`. Never fails.
pub fn parse_extraction_response(raw: &str) -> LlmExtraction {
    let json = extract_json_object(raw);
    match serde_json::from_str::<LlmFields>(&json) {
        Ok(fields) => LlmExtraction::Parsed(fields),
        Err(e) => LlmExtraction::Malformed {
            raw: raw.to_string(),
            reason: format!("JSON parse error: {e}"),
        },
    }
}

/// Extract a JSON object from LLM output (handles markdown wrapping).
pub fn extract_json_object(text: &str) -> String {
    let trimmed = text.trim();

    if trimmed.starts_with('{') {
        return trimmed.to_string();
    }

    if let Some(start) = trimmed.find("```json") {
        let after = &trimmed[start + 7..];
        if let Some(end) = after.find("```") {
            return after[..end].trim().to_string();
        }
    }

    if let Some(start) = trimmed.find("```") {
        let after = &trimmed[start + 3..];
        if let Some(end) = after.find("```") {
            let inner = after[..end].trim();
            if inner.starts_with('{') {
                return inner.to_string();
            }
        }
    }

    if let (Some(start), Some(end)) = (trimmed.find('{'), trimmed.rfind('}'))
        && end > start
    {
        return trimmed[start..=end].to_string();
    }

    trimmed.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Prompt construction tests ───────────────────────────────────

    #[test]
    fn prompt_quotes_last_three_messages() {
        let context: Vec<String> = ["one", "two", "three", "four"].iter().map(|s| s.to_string()).collect();
        let prompt = build_extraction_prompt("I'm 45", &context, Some("age"));
        assert!(prompt.starts_with("Recent messages:\n- two\n- three\n- four\n\n"));
        assert!(prompt.contains("We just asked about 'age'"));
        assert!(prompt.contains("User said: \"I'm 45\""));
        assert!(prompt.contains("\"implied\": {}"));
    }

    #[test]
    fn prompt_without_context() {
        let prompt = build_extraction_prompt("hello", &[], None);
        assert!(prompt.starts_with("User said:"));
    }

    // ── Response parsing tests ──────────────────────────────────────

    #[test]
    fn parses_fenced_json() {
        let raw = "```json\n{\"fields\": {\"age\": {\"value\": 45, \"confidence\": 0.95}, \"sex\": {\"value\": null}}, \"implied\": {\"stress\": \"high\"}}\n```";
        let LlmExtraction::Parsed(parsed) = parse_extraction_response(raw) else {
            panic!("expected parsed output");
        };
        let valued: Vec<_> = parsed.valued().collect();
        assert_eq!(valued.len(), 1);
        assert_eq!(valued[0].0, "age");
        assert_eq!(valued[0].1, &FieldValue::Number(45.0));
        assert_eq!(parsed.implied_strings()["stress"], "high");
    }

    #[test]
    fn confidence_defaults_and_clamps() {
        let raw = r#"Sure! {"fields": {"smoking": {"value": "no"}, "alcohol": {"value": "no", "confidence": 3}}}"#;
        let LlmExtraction::Parsed(parsed) = parse_extraction_response(raw) else {
            panic!("expected parsed output");
        };
        let valued: BTreeMap<&str, f32> = parsed.valued().map(|(n, _, c)| (n, c)).collect();
        assert_eq!(valued["smoking"], 0.8);
        assert_eq!(valued["alcohol"], 1.0);
    }

    #[test]
    fn garbage_is_malformed() {
        match parse_extraction_response("I could not find anything.") {
            LlmExtraction::Malformed { raw, reason } => {
                assert_eq!(raw, "I could not find anything.");
                assert!(reason.starts_with("JSON parse error"));
            }
            LlmExtraction::Parsed(_) => panic!("expected malformed"),
        }
    }
}
