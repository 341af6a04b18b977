//! Registry of live sessions keyed by id.

use std::collections::HashMap;
use std::sync::Arc;

use tokio::sync::{Mutex, RwLock};
use tracing::{info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::conversation::SessionType;
use crate::error::{PipelineError, Result, SessionError};
use crate::extraction::FieldExtractor;
use crate::pipeline::{DecisionPipeline, PipelineOutput};
use crate::session::manager::{SessionManager, TurnOutcome};
use crate::session::phase::SessionPhase;
use crate::session::readiness::{PipelineGate, SkipReason};
use crate::store::SessionStore;

/// Result of `SessionRegistry::run_pipeline`.
#[derive(Debug, Clone)]
pub enum PipelineRun {
    /// The gate declined; the session stays open.
    Skipped { reason: SkipReason, response: String },
    /// The pipeline ran and the session was completed and removed.
    Completed {
        response: String,
        output: PipelineOutput,
    },
}

/// Holds every live session.
///
/// The map lock is only held for lookup and insert. Each session sits behind
/// its own mutex, so turns for one session are serialized while different
/// sessions proceed independently.
pub struct SessionRegistry {
    sessions: RwLock<HashMap<Uuid, Arc<Mutex<SessionManager>>>>,
    extractor: Arc<FieldExtractor>,
    store: Option<Arc<dyn SessionStore>>,
    config: SessionConfig,
}

impl SessionRegistry {
    pub fn new(extractor: Arc<FieldExtractor>, config: SessionConfig) -> Self {
        Self {
            sessions: RwLock::new(HashMap::new()),
            extractor,
            store: None,
            config,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Open a session and return its id with the welcome message.
    pub async fn start(
        &self,
        user_id: impl Into<String>,
        session_type: SessionType,
        habits: Vec<String>,
    ) -> (Uuid, String) {
        let mut manager = SessionManager::new(
            user_id,
            session_type,
            Arc::clone(&self.extractor),
            self.config.clone(),
        )
        .with_habits(habits);
        if let Some(store) = &self.store {
            manager = manager.with_store(Arc::clone(store));
            manager.load_history().await;
        }

        let welcome = manager.welcome();
        let id = manager.id();
        info!(
            session = %id,
            user = %manager.state().user_id(),
            session_type = %session_type,
            "Session started"
        );
        self.sessions
            .write()
            .await
            .insert(id, Arc::new(Mutex::new(manager)));
        (id, welcome)
    }

    pub async fn get(
        &self,
        id: Uuid,
    ) -> std::result::Result<Arc<Mutex<SessionManager>>, SessionError> {
        self.sessions
            .read()
            .await
            .get(&id)
            .cloned()
            .ok_or(SessionError::NotFound { id })
    }

    /// Feed one user message to a session.
    pub async fn process(
        &self,
        id: Uuid,
        text: &str,
    ) -> std::result::Result<TurnOutcome, SessionError> {
        let session = self.get(id).await?;
        let mut session = session.lock().await;
        session.process_message(text).await
    }

    /// Complete a session with an externally produced result and drop it.
    pub async fn complete(
        &self,
        id: Uuid,
        output: &PipelineOutput,
    ) -> std::result::Result<String, SessionError> {
        let session = self.get(id).await?;
        let response = session.lock().await.complete_session(output).await?;
        self.remove(id).await;
        Ok(response)
    }

    /// Gate, run and complete in one step.
    ///
    /// Pipeline failures and timeouts are returned as `Error::Pipeline` and
    /// leave the session open for another attempt.
    pub async fn run_pipeline(
        &self,
        id: Uuid,
        pipeline: &dyn DecisionPipeline,
    ) -> Result<PipelineRun> {
        let session = self.get(id).await?;
        let mut session = session.lock().await;

        let payload = match (session.phase(), session.handoff()) {
            (SessionPhase::ReadyForHandoff, Some(payload)) => payload.clone(),
            (phase, _) => {
                return Err(SessionError::NotReady {
                    id,
                    phase: phase.to_string(),
                }
                .into());
            }
        };

        if let PipelineGate::Skip(reason) = session.pipeline_gate() {
            let response = session.quick_response(&reason);
            info!(session = %id, ?reason, "Decision pipeline skipped");
            return Ok(PipelineRun::Skipped { reason, response });
        }

        let limit = self.config.pipeline_timeout;
        let output = match tokio::time::timeout(limit, pipeline.run(&payload)).await {
            Ok(Ok(output)) => output,
            Ok(Err(e)) => {
                warn!(session = %id, pipeline = pipeline.name(), error = %e, "Decision pipeline failed");
                return Err(e.into());
            }
            Err(_) => {
                warn!(session = %id, pipeline = pipeline.name(), ?limit, "Decision pipeline timed out");
                return Err(PipelineError::Timeout(limit).into());
            }
        };
        session.mark_pipeline_run();

        let response = session.complete_session(&output).await?;
        drop(session);
        self.remove(id).await;

        Ok(PipelineRun::Completed { response, output })
    }

    /// Drop a session. Returns whether it existed.
    pub async fn remove(&self, id: Uuid) -> bool {
        self.sessions.write().await.remove(&id).is_some()
    }

    pub async fn len(&self) -> usize {
        self.sessions.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.sessions.read().await.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    use async_trait::async_trait;

    use super::*;
    use crate::config::ExtractorConfig;
    use crate::error::Error;
    use crate::pipeline::HandoffPayload;
    use crate::semantic::SemanticMatcher;
    use crate::store::InMemorySessionStore;

    struct MockPipeline {
        reply: PipelineOutput,
        delay: Duration,
        fail: bool,
        calls: AtomicUsize,
    }

    impl MockPipeline {
        fn replying(reply: impl Into<PipelineOutput>) -> Self {
            Self {
                reply: reply.into(),
                delay: Duration::ZERO,
                fail: false,
                calls: AtomicUsize::new(0),
            }
        }
    }

    #[async_trait]
    impl DecisionPipeline for MockPipeline {
        fn name(&self) -> &str {
            "mock"
        }

        async fn run(
            &self,
            _payload: &HandoffPayload,
        ) -> std::result::Result<PipelineOutput, PipelineError> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            if !self.delay.is_zero() {
                tokio::time::sleep(self.delay).await;
            }
            if self.fail {
                return Err(PipelineError::RunFailed("upstream crashed".into()));
            }
            Ok(self.reply.clone())
        }
    }

    fn registry(config: SessionConfig) -> SessionRegistry {
        let extractor = Arc::new(FieldExtractor::new(
            Arc::new(SemanticMatcher::new()),
            ExtractorConfig::default(),
        ));
        SessionRegistry::new(extractor, config)
    }

    // ── Registry tests ──────────────────────────────────────────────

    #[tokio::test]
    async fn unknown_session_is_not_found() {
        let registry = registry(SessionConfig::default());
        let id = Uuid::new_v4();
        let err = registry.process(id, "hello").await.unwrap_err();
        assert!(matches!(err, SessionError::NotFound { id: missing } if missing == id));
    }

    #[tokio::test]
    async fn run_pipeline_completes_and_removes() {
        let store = Arc::new(InMemorySessionStore::new());
        let registry = registry(SessionConfig::default()).with_store(store.clone());
        let (id, welcome) = registry.start("u1", SessionType::General, Vec::new()).await;
        assert!(!welcome.is_empty());

        let outcome = registry
            .process(id, "What foods help lower blood pressure?")
            .await
            .unwrap();
        assert!(outcome.ready);

        let pipeline = MockPipeline::replying("Eat more leafy greens.");
        let run = registry.run_pipeline(id, &pipeline).await.unwrap();
        match run {
            PipelineRun::Completed { response, .. } => {
                assert_eq!(response, "Eat more leafy greens.")
            }
            other => panic!("expected completion, got {other:?}"),
        }
        assert!(registry.is_empty().await);
        assert_eq!(store.count("u1").await, 1);
    }

    #[tokio::test]
    async fn run_pipeline_before_ready_is_rejected() {
        let registry = registry(SessionConfig::default());
        let (id, _) = registry.start("u1", SessionType::Intake, Vec::new()).await;

        let pipeline = MockPipeline::replying("plan");
        let err = registry.run_pipeline(id, &pipeline).await.unwrap_err();
        assert!(matches!(err, Error::Session(SessionError::NotReady { .. })));
        assert_eq!(pipeline.calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn pipeline_timeout_keeps_session() {
        let config = SessionConfig {
            pipeline_timeout: Duration::from_millis(20),
            ..SessionConfig::default()
        };
        let registry = registry(config);
        let (id, _) = registry.start("u1", SessionType::General, Vec::new()).await;
        registry.process(id, "Is running bad for my knees?").await.unwrap();

        let slow = MockPipeline {
            delay: Duration::from_secs(5),
            ..MockPipeline::replying("late")
        };
        let err = registry.run_pipeline(id, &slow).await.unwrap_err();
        assert!(matches!(err, Error::Pipeline(PipelineError::Timeout(_))));
        assert_eq!(registry.len().await, 1);

        // Nothing was recorded, so a retry is not considered a repeat.
        let fast = MockPipeline::replying("Not usually.");
        let run = registry.run_pipeline(id, &fast).await.unwrap();
        assert!(matches!(run, PipelineRun::Completed { .. }));
    }

    #[tokio::test]
    async fn pipeline_failure_is_surfaced() {
        let registry = registry(SessionConfig::default());
        let (id, _) = registry.start("u1", SessionType::General, Vec::new()).await;
        registry.process(id, "Can I eat eggs every day?").await.unwrap();

        let failing = MockPipeline {
            fail: true,
            ..MockPipeline::replying("")
        };
        let err = registry.run_pipeline(id, &failing).await.unwrap_err();
        assert!(matches!(err, Error::Pipeline(PipelineError::RunFailed(_))));
        assert_eq!(registry.len().await, 1);
    }

    #[tokio::test]
    async fn sparse_follow_up_is_skipped() {
        let registry = registry(SessionConfig::default());
        let (id, _) = registry
            .start("u1", SessionType::FollowUp, vec!["Walk daily".into()])
            .await;
        for _ in 0..7 {
            registry.process(id, "ok").await.unwrap();
        }

        let pipeline = MockPipeline::replying("plan");
        let run = registry.run_pipeline(id, &pipeline).await.unwrap();
        assert!(matches!(run, PipelineRun::Skipped { .. }));
        assert_eq!(pipeline.calls.load(Ordering::SeqCst), 0);
        assert_eq!(registry.len().await, 1);
    }
}
