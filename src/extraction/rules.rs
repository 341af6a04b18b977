//! Static regex rules: complexity routing, implied facts, and the last-resort
//! field extractor.

use std::collections::BTreeMap;

use once_cell::sync::Lazy;
use regex::{Captures, Regex};
use tracing::debug;

use crate::conversation::{FieldValue, names};
use crate::extraction::types::{ExtractionSource, FieldExtraction};

fn compile(patterns: &[&str]) -> Vec<Regex> {
    patterns
        .iter()
        .map(|p| Regex::new(p).expect("valid extraction rule"))
        .collect()
}

/// Canonical short answers that never need the LLM.
static SIMPLE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^(yes|no|yeah|yep|nope|nah|none|male|female|m|f)$",
        r"^\d{1,3}$",
        r"^i'?m\s+\d{1,3}$",
        r"^(i\s+)?(don'?t|never|no)\s+(smoke|drink)\s*\w*$",
        r"^(i\s+)?(have\s+)?(never)\s+(smoked|drank|touched)",
        r"^(i\s+)?(smoke|drink)\s*(occasionally|sometimes|daily|regularly)?$",
        r"^(sedentary|active|moderate|light)$",
        r"^no\s*(one|body|history|issues?|problems?|conditions?)$",
        r"^(former|ex|quit|stopped)\s",
        r"^(healthy|fine|good|okay|ok)$",
        r"^not?\s*(really|much|often|at all)$",
    ])
});

/// Whether a message is short or canonical enough to skip the LLM layer.
pub fn is_simple_input(message: &str) -> bool {
    let msg = message.trim().to_lowercase();
    let word_count = msg.split_whitespace().count();

    if word_count <= 3 {
        return true;
    }
    if SIMPLE_PATTERNS.iter().any(|re| re.is_match(&msg)) {
        return true;
    }
    word_count <= 6 && !msg.contains(',') && !msg.contains(" and ")
}

/// Phrases that imply a fact we never ask about directly.
static IMPLIED_RULES: Lazy<Vec<(Regex, &'static str, &'static str)>> = Lazy::new(|| {
    [
        (
            r"\b(night\s*shift|overnight|graveyard)\b",
            "sleep_pattern",
            "irregular (works nights)",
        ),
        (
            r"\b(desk\s*job|office|sit\s*all\s*day)\b",
            "activity_hint",
            "likely sedentary",
        ),
        (r"\b(stress|stressed|anxious)\b", "stress", "mentioned stress"),
    ]
    .into_iter()
    .map(|(p, name, value)| (Regex::new(p).expect("valid implied rule"), name, value))
    .collect()
});

/// Implied facts in a message, name → value.
pub fn implied_facts(message: &str) -> BTreeMap<String, String> {
    let lower = message.to_lowercase();
    IMPLIED_RULES
        .iter()
        .filter(|(re, _, _)| re.is_match(&lower))
        .map(|(_, name, value)| (name.to_string(), value.to_string()))
        .collect()
}

type AgeExtractor = fn(&Captures) -> Option<u32>;

fn group(caps: &Captures, i: usize) -> Option<u32> {
    caps.get(i)?.as_str().parse().ok()
}

static AGE_RULES: Lazy<Vec<(Regex, AgeExtractor)>> = Lazy::new(|| {
    let table: [(&str, AgeExtractor); 7] = [
        (r"(?i)\b(\d{1,3})\s*(years?\s*old|y/?o|yrs?)\b", |c| group(c, 1)),
        (r"(?i)\b(?:i'?m|i am)\s*(\d{2,3})\b", |c| group(c, 1)),
        (r"(?i)\bmid[- ]?(\d)0'?s?\b", |c| group(c, 1).map(|d| d * 10 + 5)),
        (r"(?i)\bin\s*my\s*(\d)0'?s?\b", |c| group(c, 1).map(|d| d * 10 + 5)),
        (r"(?i)\b(?:turned|just turned|turning)\s*(\d{2,3})\b", |c| group(c, 1)),
        (r"(?i)\baround\s*(\d{2,3})\b", |c| group(c, 1)),
        (r"^(\d{2,3})$", |c| group(c, 1)),
    ];
    table
        .into_iter()
        .map(|(p, f)| (Regex::new(p).expect("valid age rule"), f))
        .collect()
});

static MALE: Lazy<Regex> = Lazy::new(|| Regex::new(r"\b(male|man|boy|guy)\b").expect("valid sex rule"));
static FEMALE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"\b(female|woman|girl|lady)\b").expect("valid sex rule"));

/// "none" / "no" style answers.
static NONE_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(|| {
    compile(&[
        r"^\s*(no|none|nope|nah)\s*$",
        r"\b(none|no|not)\s*(that)?\s*(i|we)?\s*(know|aware|have|think)\b",
        r"\b(don'?t|do\s*not)\s*(have|think)\b",
        r"\b(i'?m|i\s*am)\s*(healthy|fine|good|okay)\b",
        r"\bno\s*(health)?\s*(issues?|problems?|conditions?)\b",
        r"\bnot\s*really\b",
    ])
});

static CONDITION_RULES: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\b(hypertension|high\s*blood\s*pressure|high\s*bp|hbp)\b", "hypertension"),
        (r"\b(diabetes|diabetic|blood\s*sugar|sugar)\b", "diabetes"),
        (r"\b(heart\s*(disease|problem|attack|condition)|cardiac)\b", "heart disease"),
        (r"\b(cholesterol|high\s*cholesterol|lipid)\b", "high cholesterol"),
        (r"\b(stroke|mini\s*stroke|tia)\b", "stroke"),
        (r"\b(kidney|renal|ckd)\b", "kidney disease"),
        (
            r"\b(asthma|breathing\s*problems?|copd|respiratory)\b",
            "respiratory condition",
        ),
    ]
    .into_iter()
    .map(|(p, name)| (Regex::new(p).expect("valid condition rule"), name))
    .collect()
});

/// (pattern, value, confidence), first hit wins.
type Ladder = Vec<(Regex, &'static str, f32)>;

fn ladder(rules: [(&str, &'static str, f32); 3]) -> Ladder {
    rules
        .into_iter()
        .map(|(p, v, c)| (Regex::new(p).expect("valid habit rule"), v, c))
        .collect()
}

static SMOKING_RULES: Lazy<Ladder> = Lazy::new(|| {
    ladder([
        (r"\b(don'?t|never|no)\s*smok", "no", 0.85),
        (r"\b(quit|stopped|former)\b", "former", 0.8),
        (r"\bsmok", "yes", 0.7),
    ])
});

static ALCOHOL_RULES: Lazy<Ladder> = Lazy::new(|| {
    ladder([
        (r"\b(don'?t|never|no)\s*drink", "no", 0.85),
        (r"\b(occasional|sometimes|social|rarely)\b", "occasionally", 0.8),
        (r"\b(regular|daily|often)\b", "regularly", 0.8),
    ])
});

const AGE_CONFIDENCE: f32 = 0.9;
const SEX_CONFIDENCE: f32 = 0.9;
const NONE_CONFIDENCE: f32 = 0.85;
const CONDITIONS_CONFIDENCE: f32 = 0.8;

/// Last-resort extraction with fixed keyword rules.
pub fn regex_extract(message: &str, last_field: Option<&str>) -> BTreeMap<String, FieldExtraction> {
    let mut fields = BTreeMap::new();
    let lower = message.trim().to_lowercase();
    let mut put = |name: &str, value: FieldValue, confidence: f32| {
        fields.insert(
            name.to_string(),
            FieldExtraction::new(name, value, confidence, ExtractionSource::Regex),
        );
    };

    let trimmed = message.trim();
    if let Some(age) = AGE_RULES.iter().find_map(|(re, extract)| {
        re.captures(trimmed)
            .and_then(|c| extract(&c))
            .filter(|age| (1..=120).contains(age))
    }) {
        put(names::AGE, FieldValue::from(age), AGE_CONFIDENCE);
    }

    if MALE.is_match(&lower) {
        put(names::SEX, "male".into(), SEX_CONFIDENCE);
    } else if FEMALE.is_match(&lower) {
        put(names::SEX, "female".into(), SEX_CONFIDENCE);
    } else if last_field == Some(names::SEX) && (lower == "m" || lower == "f") {
        let sex = if lower == "m" { "male" } else { "female" };
        put(names::SEX, sex.into(), SEX_CONFIDENCE);
    }

    if NONE_PATTERNS.iter().any(|re| re.is_match(&lower)) {
        match last_field {
            Some(f @ (names::CONDITIONS | names::FAMILY_HISTORY | names::CONSTRAINTS)) => {
                put(f, "none".into(), NONE_CONFIDENCE);
            }
            Some(f @ (names::SMOKING | names::ALCOHOL)) => {
                put(f, "no".into(), NONE_CONFIDENCE);
            }
            _ => {}
        }
    }

    let conditions: Vec<String> = CONDITION_RULES
        .iter()
        .filter(|(re, _)| re.is_match(&lower))
        .map(|(_, name)| name.to_string())
        .collect();
    if !conditions.is_empty() {
        put(names::CONDITIONS, FieldValue::List(conditions), CONDITIONS_CONFIDENCE);
    }

    for (field, rules) in [(names::SMOKING, &*SMOKING_RULES), (names::ALCOHOL, &*ALCOHOL_RULES)] {
        if let Some((_, value, confidence)) = rules.iter().find(|(re, _, _)| re.is_match(&lower)) {
            put(field, FieldValue::text(*value), *confidence);
        }
    }

    debug!(count = fields.len(), "Regex extraction finished");
    fields
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── Routing tests ───────────────────────────────────────────────

    #[test]
    fn short_and_canonical_inputs_are_simple() {
        for text in [
            "yes",
            "I'm 45",
            "no conditions",
            "I don't smoke cigarettes",
            "I have never smoked in my life ever",
            "I walk every single day",
        ] {
            assert!(is_simple_input(text), "{text}");
        }
    }

    #[test]
    fn lists_and_long_messages_are_complex() {
        for text in ["mostly rice and vegetables", "rice, beans, fish, greens"] {
            assert!(!is_simple_input(text), "{text}");
        }
        assert!(!is_simple_input("I'm 45, male, and I have diabetes"));
        assert!(!is_simple_input(
            "well my doctor once told me something about my blood pressure being a bit high"
        ));
    }

    // ── Implied fact tests ──────────────────────────────────────────

    #[test]
    fn implied_facts_from_context() {
        let implied = implied_facts("I work the night shift at an office and I'm stressed");
        assert_eq!(implied["sleep_pattern"], "irregular (works nights)");
        assert_eq!(implied["activity_hint"], "likely sedentary");
        assert_eq!(implied["stress"], "mentioned stress");
        assert!(implied_facts("I like tea").is_empty());
    }

    // ── Field rule tests ────────────────────────────────────────────

    #[test]
    fn age_rules() {
        for (text, age) in [
            ("I just turned 50", 50.0),
            ("in my 30s", 35.0),
            ("around 60 I think", 60.0),
            ("I am 38", 38.0),
        ] {
            let fields = regex_extract(text, None);
            assert_eq!(fields[names::AGE].value.as_f64(), Some(age), "{text}");
        }
        assert!(!regex_extract("I am 150 years old", None).contains_key(names::AGE));
    }

    #[test]
    fn sex_rules() {
        assert_eq!(
            regex_extract("I'm a woman", None)[names::SEX].value,
            FieldValue::text("female")
        );
        assert_eq!(
            regex_extract("m", Some(names::SEX))[names::SEX].value,
            FieldValue::text("male")
        );
        assert!(!regex_extract("m", None).contains_key(names::SEX));
    }

    #[test]
    fn none_answers_follow_last_question() {
        let fields = regex_extract("not that I know of", Some(names::CONDITIONS));
        assert_eq!(fields[names::CONDITIONS].value, FieldValue::text("none"));
        assert_eq!(fields[names::CONDITIONS].confidence, 0.85);

        let fields = regex_extract("nah", Some(names::ALCOHOL));
        assert_eq!(fields[names::ALCOHOL].value, FieldValue::text("no"));

        assert!(regex_extract("nah", None).is_empty());
    }

    #[test]
    fn condition_list() {
        let fields = regex_extract("high blood pressure and sugar problems", None);
        assert_eq!(
            fields[names::CONDITIONS].value,
            FieldValue::List(vec!["hypertension".into(), "diabetes".into()])
        );
    }

    #[test]
    fn habit_ladders() {
        let fields = regex_extract("I quit smoking, sometimes I drink", None);
        assert_eq!(fields[names::SMOKING].value, FieldValue::text("former"));
        assert_eq!(fields[names::ALCOHOL].value, FieldValue::text("occasionally"));

        let fields = regex_extract("never smoked, I don't drink", None);
        assert_eq!(fields[names::SMOKING].value, FieldValue::text("no"));
        assert_eq!(fields[names::ALCOHOL].value, FieldValue::text("no"));
    }
}
