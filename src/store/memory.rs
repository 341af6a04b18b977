//! In-memory `SessionStore`, used by the demo binary and tests.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;
use tracing::debug;

use super::traits::{SessionStore, SessionSummary};
use crate::error::StoreError;

/// Session summaries held in a map keyed by user id.
#[derive(Default)]
pub struct InMemorySessionStore {
    sessions: RwLock<HashMap<String, Vec<SessionSummary>>>,
}

impl InMemorySessionStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of summaries stored for a user.
    pub async fn count(&self, user_id: &str) -> usize {
        self.sessions
            .read()
            .await
            .get(user_id)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl SessionStore for InMemorySessionStore {
    async fn save(&self, summary: &SessionSummary) -> Result<(), StoreError> {
        let mut sessions = self.sessions.write().await;
        let history = sessions.entry(summary.user_id.clone()).or_default();
        history.push(summary.clone());
        history.sort_by_key(|s| s.completed_at);
        debug!(
            user = %summary.user_id,
            session = %summary.session_id,
            stored = history.len(),
            "Saved session summary"
        );
        Ok(())
    }

    async fn load_recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        let sessions = self.sessions.read().await;
        let Some(history) = sessions.get(user_id) else {
            return Ok(Vec::new());
        };
        let skip = history.len().saturating_sub(limit);
        Ok(history[skip..].to_vec())
    }
}
