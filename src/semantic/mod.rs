//! Semantic understanding without an LLM.
//!
//! Classifies reply intent (yes / no / unsure / qualified) and maps free text
//! onto the closed vocabularies of the intake fields. An optional `Embedder`
//! adds a paraphrase tier; everything else is table lookups and string
//! similarity.

pub mod embedding;
pub mod intent;
pub mod knowledge;
pub mod matcher;
pub mod similarity;

pub use embedding::Embedder;
pub use intent::Intent;
pub use matcher::{MatchMethod, SemanticMatch, SemanticMatcher, extract_age};
