//! Async persistence contract for completed sessions.

use std::collections::BTreeMap;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::conversation::{FieldValue, SessionType};
use crate::error::StoreError;
use crate::interventions::Intervention;
use crate::patterns::DetectedPattern;

/// What is kept about a session once it completes.
///
/// Later sessions for the same user read these back to look for
/// recurring barriers and long-range trends.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSummary {
    pub session_id: Uuid,
    pub user_id: String,
    pub session_type: SessionType,
    pub fields: BTreeMap<String, FieldValue>,
    #[serde(default)]
    pub implied: BTreeMap<String, String>,
    /// User messages in the order they were sent.
    pub user_messages: Vec<String>,
    #[serde(default)]
    pub patterns: Vec<DetectedPattern>,
    #[serde(default)]
    pub interventions: Vec<Intervention>,
    /// The final text shown to the user.
    pub final_response: String,
    pub turn_count: u32,
    pub completed_at: DateTime<Utc>,
}

/// Backend-agnostic session persistence.
///
/// Callers treat failures as non-fatal: a session completes even when its
/// summary could not be written.
#[async_trait]
pub trait SessionStore: Send + Sync {
    /// Persist a completed session.
    async fn save(&self, summary: &SessionSummary) -> Result<(), StoreError>;

    /// Up to `limit` most recent summaries for a user, oldest first.
    async fn load_recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, StoreError>;
}
