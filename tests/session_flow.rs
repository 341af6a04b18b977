//! End-to-end conversation flows through the public API.

use std::collections::BTreeMap;
use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;
use proptest::prelude::*;
use tokio::sync::Mutex;
use uuid::Uuid;

use health_intake::config::{ExtractorConfig, SessionConfig};
use health_intake::conversation::{ConversationState, FieldValue, SessionType, URGENT_RESPONSE, names};
use health_intake::error::{PipelineError, StoreError};
use health_intake::extraction::FieldExtractor;
use health_intake::interventions::{InterventionEngine, InterventionType, alternatives};
use health_intake::patterns::{BarrierKind, Habit, PatternDetector, PatternType};
use health_intake::pipeline::{DecisionPipeline, HandoffPayload, PipelineOutput};
use health_intake::semantic::SemanticMatcher;
use health_intake::session::{PipelineRun, SessionManager, SessionPhase, SessionRegistry};
use health_intake::store::{SessionStore, SessionSummary};

// ── Mocks ───────────────────────────────────────────────────────────

/// Store that records every save.
#[derive(Default)]
struct RecordingStore {
    saved: Mutex<Vec<SessionSummary>>,
}

#[async_trait]
impl SessionStore for RecordingStore {
    async fn save(&self, summary: &SessionSummary) -> Result<(), StoreError> {
        self.saved.lock().await.push(summary.clone());
        Ok(())
    }

    async fn load_recent(
        &self,
        user_id: &str,
        limit: usize,
    ) -> Result<Vec<SessionSummary>, StoreError> {
        let saved = self.saved.lock().await;
        let mine: Vec<SessionSummary> = saved
            .iter()
            .filter(|s| s.user_id == user_id)
            .cloned()
            .collect();
        let skip = mine.len().saturating_sub(limit);
        Ok(mine.into_iter().skip(skip).collect())
    }
}

/// Pipeline that captures the payload it was given.
#[derive(Default)]
struct CapturingPipeline {
    seen: Mutex<Option<HandoffPayload>>,
}

#[async_trait]
impl DecisionPipeline for CapturingPipeline {
    fn name(&self) -> &str {
        "capturing"
    }

    async fn run(&self, payload: &HandoffPayload) -> Result<PipelineOutput, PipelineError> {
        *self.seen.lock().await = Some(payload.clone());
        Ok(PipelineOutput::Json(serde_json::json!({
            "hypertension_risk": "moderate",
            "diabetes_risk": "low",
            "key_drivers": ["age"],
            "explanation": "Mostly age related."
        })))
    }
}

fn extractor() -> Arc<FieldExtractor> {
    Arc::new(FieldExtractor::new(
        Arc::new(SemanticMatcher::new()),
        ExtractorConfig::default(),
    ))
}

const INTAKE_SCRIPT: &[&str] = &[
    "I'm 45",
    "male",
    "no conditions",
    "no family history",
    "I don't smoke",
    "I drink occasionally",
    "mostly rice and vegetables",
    "I walk daily",
];

// ── Intake ──────────────────────────────────────────────────────────

#[tokio::test]
async fn intake_script_reaches_handoff() {
    let mut session = SessionManager::new(
        "user-1",
        SessionType::Intake,
        extractor(),
        SessionConfig::default(),
    );
    session.welcome();

    let mut last = None;
    for message in INTAKE_SCRIPT {
        last = Some(session.process_message(message).await.unwrap());
    }
    let outcome = last.unwrap();
    assert!(outcome.ready);
    assert_eq!(outcome.phase, SessionPhase::ReadyForHandoff);

    let handoff = outcome.handoff.unwrap();
    assert_eq!(
        handoff.field(names::AGE).and_then(FieldValue::as_f64),
        Some(45.0)
    );
    assert_eq!(handoff.field(names::SEX), Some(&FieldValue::text("male")));
    assert_eq!(handoff.field(names::SMOKING), Some(&FieldValue::text("no")));
    assert_eq!(
        handoff.field(names::ALCOHOL),
        Some(&FieldValue::text("occasionally"))
    );
    assert!(handoff.combined_input.starts_with("I'm 45 male"));
}

#[tokio::test]
async fn intake_through_registry_runs_pipeline_and_persists() {
    let store = Arc::new(RecordingStore::default());
    let registry =
        SessionRegistry::new(extractor(), SessionConfig::default()).with_store(store.clone());
    let (id, _) = registry.start("user-2", SessionType::Intake, Vec::new()).await;

    for message in INTAKE_SCRIPT {
        registry.process(id, message).await.unwrap();
    }

    let pipeline = CapturingPipeline::default();
    let run = registry.run_pipeline(id, &pipeline).await.unwrap();
    let PipelineRun::Completed { response, .. } = run else {
        panic!("intake with all critical fields should run the pipeline");
    };
    assert!(response.contains("Moderate"));

    let seen = pipeline.seen.lock().await.clone().unwrap();
    assert_eq!(seen.session_id, id);
    assert_eq!(seen.user_id, "user-2");

    let saved = store.saved.lock().await;
    assert_eq!(saved.len(), 1);
    assert_eq!(saved[0].final_response, response);
    assert_eq!(saved[0].user_messages.len(), INTAKE_SCRIPT.len());
    drop(saved);

    assert!(registry.is_empty().await);
    assert!(registry.process(id, "hello?").await.is_err());
}

#[tokio::test]
async fn chest_pain_short_circuits() {
    let registry = SessionRegistry::new(extractor(), SessionConfig::default());
    let (id, _) = registry.start("user-3", SessionType::Intake, Vec::new()).await;

    let outcome = registry
        .process(id, "I've had chest pain since this morning")
        .await
        .unwrap();
    assert_eq!(outcome.response, URGENT_RESPONSE);
    assert!(!outcome.ready);
    assert!(outcome.urgent_symptoms.contains(&"chest pain".to_string()));
    assert!(outcome.handoff.is_none());
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(24))]

    #[test]
    fn unrecognizable_intake_terminates(message in "[bcdgjkqvxz ]{0,30}") {
        let rt = tokio::runtime::Builder::new_current_thread()
            .enable_all()
            .build()
            .unwrap();
        let ready_turn = rt.block_on(async {
            let mut session = SessionManager::new(
                "user-p",
                SessionType::Intake,
                extractor(),
                SessionConfig::default(),
            );
            session.welcome();
            for turn in 1..=12u32 {
                let outcome = session.process_message(&message).await.unwrap();
                if outcome.ready {
                    return Some(turn);
                }
            }
            None
        });
        prop_assert!(ready_turn.is_some());
    }
}

// ── Follow-up ───────────────────────────────────────────────────────

const RAIN_MESSAGES: [&str; 2] = [
    "I haven't been able to walk because of the rain",
    "I missed my walk again due to rain",
];

#[test]
fn rain_messages_yield_walking_alternatives() {
    let messages: Vec<String> = RAIN_MESSAGES.iter().map(|m| m.to_string()).collect();
    let detector = PatternDetector::new();
    let patterns = detector.analyze_session(&messages, &[]);

    let barrier = patterns
        .iter()
        .find(|p| p.pattern_type == PatternType::RecurringBarrier)
        .expect("weather barrier detected");
    assert_eq!(barrier.barrier, Some(BarrierKind::Weather));
    assert!(barrier.affected_habits.contains(&"walking".to_string()));

    let summary = detector.habit_summary(&messages);
    let interventions = InterventionEngine::new().generate(&patterns, &summary);
    let modification = interventions
        .iter()
        .find(|i| i.intervention_type == InterventionType::HabitModification)
        .expect("habit modification generated");

    let expected: Vec<String> = alternatives(Habit::Walking, BarrierKind::Weather)
        .iter()
        .take(3)
        .map(|a| a.to_string())
        .collect();
    assert_eq!(modification.actions, expected);
}

#[tokio::test]
async fn follow_up_recurrence_across_sessions() {
    let store = Arc::new(RecordingStore::default());
    let registry =
        SessionRegistry::new(extractor(), SessionConfig::default()).with_store(store.clone());

    // First session: rain keeps the user from walking.
    let (first, welcome) = registry
        .start("user-4", SessionType::FollowUp, vec!["Walk 30 minutes".into()])
        .await;
    assert!(welcome.contains("Walk 30 minutes"));
    let mut outcome = registry.process(first, RAIN_MESSAGES[0]).await.unwrap();
    if !outcome.ready {
        outcome = registry.process(first, RAIN_MESSAGES[1]).await.unwrap();
    }
    while !outcome.ready {
        outcome = registry.process(first, "nothing else to add").await.unwrap();
    }
    registry
        .complete(first, &PipelineOutput::from("Try indoor walking."))
        .await
        .unwrap();

    // Second session sees the earlier barrier again.
    let (second, _) = registry
        .start("user-4", SessionType::FollowUp, Vec::new())
        .await;
    let session = registry.get(second).await.unwrap();
    assert!(!session.lock().await.prior_patterns().is_empty());

    let mut outcome = registry
        .process(second, "The rain stopped my walking again this week")
        .await
        .unwrap();
    while !outcome.ready {
        outcome = registry.process(second, "that is all").await.unwrap();
    }
    let handoff = outcome.handoff.unwrap();
    assert!(
        handoff
            .patterns
            .iter()
            .any(|p| p.pattern_type == PatternType::RecurringBarrier && p.severity.is_high())
    );
}

// ── State ───────────────────────────────────────────────────────────

#[test]
fn message_log_is_a_ring_buffer() {
    let mut state = ConversationState::new("user-5", SessionType::Intake);
    for i in 0..25 {
        state.add_user_message(format!("message {i}"));
    }
    let messages = state.user_messages();
    assert_eq!(messages.len(), 20);
    assert_eq!(messages.first().map(String::as_str), Some("message 5"));
    assert_eq!(messages.last().map(String::as_str), Some("message 24"));
    assert_eq!(state.turn_count(), 25);
}

#[tokio::test]
async fn summaries_round_trip_through_store() {
    let store = RecordingStore::default();
    let summary = SessionSummary {
        session_id: Uuid::new_v4(),
        user_id: "user-6".into(),
        session_type: SessionType::General,
        fields: BTreeMap::new(),
        implied: BTreeMap::new(),
        user_messages: vec!["Is salt bad?".into()],
        patterns: Vec::new(),
        interventions: Vec::new(),
        final_response: "In moderation it is fine.".into(),
        turn_count: 1,
        completed_at: Utc::now(),
    };
    store.save(&summary).await.unwrap();

    let json = serde_json::to_string(&store.load_recent("user-6", 5).await.unwrap()).unwrap();
    let back: Vec<SessionSummary> = serde_json::from_str(&json).unwrap();
    assert_eq!(back.len(), 1);
    assert_eq!(back[0].final_response, "In moderation it is fine.");
}
