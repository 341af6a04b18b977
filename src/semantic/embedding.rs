//! Sentence embedding backend contract.

use crate::error::EmbeddingError;

/// Produces a dense vector for a piece of text.
///
/// Synchronous: the matcher calls it inline for every message, and hosts
/// typically back it with a local model.
pub trait Embedder: Send + Sync {
    /// Model identifier, for logs.
    fn model_name(&self) -> &str;

    fn embed(&self, text: &str) -> Result<Vec<f32>, EmbeddingError>;
}
