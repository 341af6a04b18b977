//! Error types for the health intake engine.

use std::time::Duration;

use uuid::Uuid;

/// Top-level error type.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("LLM error: {0}")]
    Llm(#[from] LlmError),

    #[error("Embedding error: {0}")]
    Embedding(#[from] EmbeddingError),

    #[error("Pipeline error: {0}")]
    Pipeline(#[from] PipelineError),

    #[error("Store error: {0}")]
    Store(#[from] StoreError),

    #[error("Session error: {0}")]
    Session(#[from] SessionError),
}

/// Configuration-related errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Invalid configuration value for {key}: {message}")]
    InvalidValue { key: String, message: String },
}

/// LLM provider errors.
#[derive(Debug, thiserror::Error)]
pub enum LlmError {
    #[error("Provider {provider} request failed: {reason}")]
    RequestFailed { provider: String, reason: String },

    #[error("Provider {provider} timed out after {timeout:?}")]
    Timeout { provider: String, timeout: Duration },
}

/// Embedding backend errors.
#[derive(Debug, thiserror::Error)]
pub enum EmbeddingError {
    #[error("Embedding model {model} unavailable: {reason}")]
    Unavailable { model: String, reason: String },

    #[error("Embedding failed for input of {len} chars: {reason}")]
    Failed { len: usize, reason: String },
}

/// Errors from the external decision pipeline.
#[derive(Debug, thiserror::Error)]
pub enum PipelineError {
    #[error("Pipeline run failed: {0}")]
    RunFailed(String),

    #[error("Pipeline timed out after {0:?}")]
    Timeout(Duration),

    #[error("Pipeline returned an unusable result: {0}")]
    InvalidOutput(String),
}

/// Persistence errors.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("Write failed for user {user_id}: {reason}")]
    WriteFailed { user_id: String, reason: String },

    #[error("Read failed for user {user_id}: {reason}")]
    ReadFailed { user_id: String, reason: String },

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Session lifecycle errors.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    #[error("Session {id} not found")]
    NotFound { id: Uuid },

    #[error("Session {id} is already completed")]
    Completed { id: Uuid },

    #[error("Session {id} is not ready for handoff (phase {phase})")]
    NotReady { id: Uuid, phase: String },

    #[error("Session {id} in phase {state}, cannot transition to {target}")]
    InvalidTransition {
        id: Uuid,
        state: String,
        target: String,
    },
}

/// Result type alias for the engine.
pub type Result<T> = std::result::Result<T, Error>;
