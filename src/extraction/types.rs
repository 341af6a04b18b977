//! Extraction results.

use std::collections::BTreeMap;
use std::fmt;

use serde::Serialize;

use crate::conversation::{FieldConfidence, FieldValue};
use crate::semantic::MatchMethod;

/// Which layer produced a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case", tag = "layer", content = "method")]
pub enum ExtractionSource {
    Llm,
    Semantic(MatchMethod),
    Regex,
    /// The raw reply, recorded for an open-text question.
    OpenAnswer,
}

impl fmt::Display for ExtractionSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Llm => write!(f, "llm"),
            Self::Semantic(method) => write!(f, "semantic_{}", method.label()),
            Self::Regex => write!(f, "regex"),
            Self::OpenAnswer => write!(f, "open_answer"),
        }
    }
}

/// One extracted field with a numeric confidence.
#[derive(Debug, Clone, Serialize)]
pub struct FieldExtraction {
    pub name: String,
    pub value: FieldValue,
    pub confidence: f32,
    pub needs_clarification: bool,
    pub source: ExtractionSource,
}

impl FieldExtraction {
    pub fn new(
        name: impl Into<String>,
        value: FieldValue,
        confidence: f32,
        source: ExtractionSource,
    ) -> Self {
        Self {
            name: name.into(),
            value,
            confidence,
            needs_clarification: false,
            source,
        }
    }

    pub fn needing_clarification(mut self, flag: bool) -> Self {
        self.needs_clarification = flag;
        self
    }

    /// Qualitative tag. An explicit clarification flag wins over the score.
    pub fn tag(&self) -> FieldConfidence {
        if self.needs_clarification {
            FieldConfidence::NeedsClarification
        } else {
            FieldConfidence::from_score(self.confidence)
        }
    }
}

/// Layer whose output was used for a message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ExtractionLayer {
    Semantic,
    Llm,
    Regex,
}

/// Everything extracted from one message.
#[derive(Debug, Clone, Serialize)]
pub struct ExtractionOutcome {
    pub fields: BTreeMap<String, FieldExtraction>,
    /// Non-slot facts, name → value.
    pub implied: BTreeMap<String, String>,
    pub urgent_symptoms: Vec<String>,
    pub layer: ExtractionLayer,
}

impl ExtractionOutcome {
    pub fn max_confidence(&self) -> f32 {
        self.fields
            .values()
            .map(|f| f.confidence)
            .fold(0.0, f32::max)
    }

    pub fn is_empty(&self) -> bool {
        self.fields.is_empty() && self.implied.is_empty() && self.urgent_symptoms.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clarification_flag_overrides_score() {
        let f = FieldExtraction::new("smoking", "yes".into(), 0.95, ExtractionSource::Llm);
        assert_eq!(f.tag(), FieldConfidence::High);
        let f = f.needing_clarification(true);
        assert_eq!(f.tag(), FieldConfidence::NeedsClarification);
    }

    #[test]
    fn source_labels() {
        assert_eq!(ExtractionSource::Regex.to_string(), "regex");
        assert_eq!(
            ExtractionSource::Semantic(MatchMethod::Exact).to_string(),
            "semantic_exact"
        );
    }
}
