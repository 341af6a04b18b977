//! Red-flag symptom detection.
//!
//! Runs on every message before any extraction layer, so a failing or
//! slow layer can never hide an emergency.

use once_cell::sync::Lazy;
use regex::Regex;
use tracing::warn;

static URGENT_PATTERNS: Lazy<Vec<(Regex, &'static str)>> = Lazy::new(|| {
    [
        (r"\b(chest\s*pain|chest\s*pressure)", "chest pain"),
        (r"\b(can'?t\s*breathe|difficulty\s*breathing)", "breathing difficulty"),
        (r"\b(severe\s*headache)", "severe headache"),
        (r"\b(blurred?\s*vision)", "vision problems"),
        (r"\b(faint|passed?\s*out)", "fainting"),
        (r"\b(numb|weak).{0,20}(arm|leg|face)", "numbness/weakness"),
        (r"\b(slurred?\s*speech)", "speech problems"),
    ]
    .into_iter()
    .map(|(p, symptom)| (Regex::new(p).expect("valid urgent pattern"), symptom))
    .collect()
});

/// Canonical names of every red-flag symptom mentioned in the message.
pub fn detect_urgent_symptoms(message: &str) -> Vec<String> {
    let lower = message.to_lowercase();
    let found: Vec<String> = URGENT_PATTERNS
        .iter()
        .filter(|(re, _)| re.is_match(&lower))
        .map(|(_, symptom)| symptom.to_string())
        .collect();

    if !found.is_empty() {
        warn!(symptoms = ?found, "Urgent symptoms detected");
    }
    found
}
