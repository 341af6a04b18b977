//! Shared types for the external decision pipeline.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::{FieldValue, SessionType};
use crate::error::PipelineError;
use crate::interventions::Intervention;
use crate::patterns::DetectedPattern;

// ── Handoff payload ─────────────────────────────────────────────────

/// Everything a ready session hands to the decision pipeline.
///
/// Built by the session manager once the readiness gate passes and
/// rebuilt on each later turn, so it always reflects the latest state.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HandoffPayload {
    pub session_id: Uuid,
    pub user_id: String,
    pub session_type: SessionType,
    /// All user messages joined with spaces.
    pub combined_input: String,
    /// Current value of every extracted field.
    pub fields: BTreeMap<String, FieldValue>,
    /// Facts inferred outside the fixed fields.
    #[serde(default)]
    pub implied: BTreeMap<String, String>,
    /// Follow-up sessions only.
    #[serde(default)]
    pub patterns: Vec<DetectedPattern>,
    /// Follow-up sessions only.
    #[serde(default)]
    pub interventions: Vec<Intervention>,
    pub created_at: DateTime<Utc>,
}

impl HandoffPayload {
    pub fn field(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name)
    }
}

// ── Pipeline output ─────────────────────────────────────────────────

/// Raw result returned by the decision pipeline.
///
/// The pipeline may answer with prose, a JSON document, or prose that
/// happens to contain JSON; `formatter::format_output` normalizes all three.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum PipelineOutput {
    Text(String),
    Json(serde_json::Value),
}

impl From<String> for PipelineOutput {
    fn from(s: String) -> Self {
        Self::Text(s)
    }
}

impl From<&str> for PipelineOutput {
    fn from(s: &str) -> Self {
        Self::Text(s.to_string())
    }
}

impl From<serde_json::Value> for PipelineOutput {
    fn from(v: serde_json::Value) -> Self {
        Self::Json(v)
    }
}

// ── Pipeline trait ──────────────────────────────────────────────────

/// The downstream process that turns a handoff into advice.
///
/// Supplied by the host. Failures are surfaced to the caller rather
/// than swallowed, since there is no sensible local fallback.
#[async_trait]
pub trait DecisionPipeline: Send + Sync {
    /// Pipeline name for logging.
    fn name(&self) -> &str;

    async fn run(&self, payload: &HandoffPayload) -> Result<PipelineOutput, PipelineError>;
}
