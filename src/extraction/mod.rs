//! Per-message field extraction.
//!
//! `FieldExtractor` cascades through the semantic matcher, an optional LLM,
//! and fixed regex rules, and always reports red-flag symptoms.

pub mod extractor;
pub mod llm;
pub mod rules;
pub mod types;
pub mod urgent;

pub use extractor::{FieldExtractor, is_open_text_field};
pub use llm::{LlmExtraction, LlmFields};
pub use types::{ExtractionLayer, ExtractionOutcome, ExtractionSource, FieldExtraction};
pub use urgent::detect_urgent_symptoms;
