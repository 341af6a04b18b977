//! Per-session orchestration.
//!
//! `SessionManager` owns one `ConversationState` and drives every turn:
//! extraction, state merge, urgent short-circuit, readiness, and either the
//! next question or a handoff payload.

use std::collections::BTreeMap;
use std::sync::Arc;

use chrono::Utc;
use serde::Serialize;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::config::SessionConfig;
use crate::conversation::{
    ConversationState, FieldValue, QuestionGenerator, SessionType, URGENT_RESPONSE,
};
use crate::error::SessionError;
use crate::extraction::{ExtractionOutcome, FieldExtractor};
use crate::interventions::{Intervention, InterventionEngine};
use crate::patterns::{DetectedPattern, PatternDetector};
use crate::pipeline::{HandoffPayload, PipelineOutput, format_output};
use crate::session::phase::SessionPhase;
use crate::session::readiness::{self, PipelineGate, Readiness, SkipReason};
use crate::store::{SessionStore, SessionSummary};

/// Reason recorded next to facts implied by the user's wording.
const IMPLIED_REASON: &str = "context";

/// Result of one user turn.
#[derive(Debug, Clone, Serialize)]
pub struct TurnOutcome {
    /// Text to show the user.
    pub response: String,
    /// Whether a handoff payload is available.
    pub ready: bool,
    pub phase: SessionPhase,
    pub turn: u32,
    /// Every urgent symptom flagged so far.
    pub urgent_symptoms: Vec<String>,
    pub handoff: Option<HandoffPayload>,
}

/// Snapshot handed to whatever builds the pipeline prompt.
#[derive(Debug, Clone, Serialize)]
pub struct SessionContext {
    pub user_id: String,
    pub session_type: SessionType,
    pub combined_input: String,
    pub fields: BTreeMap<String, FieldValue>,
    pub implied: BTreeMap<String, String>,
    pub patterns_summary: String,
    pub previous_habits: Vec<String>,
    pub turn_count: u32,
}

/// Drives one conversation from welcome to completion.
pub struct SessionManager {
    id: Uuid,
    state: ConversationState,
    phase: SessionPhase,
    config: SessionConfig,
    extractor: Arc<FieldExtractor>,
    questions: QuestionGenerator,
    detector: PatternDetector,
    engine: InterventionEngine,
    store: Option<Arc<dyn SessionStore>>,
    user_habits: Vec<String>,
    /// Patterns saved by earlier sessions, used for recurrence checks.
    prior_patterns: Vec<DetectedPattern>,
    /// User messages from earlier sessions, oldest first.
    history_messages: Vec<String>,
    patterns: Vec<DetectedPattern>,
    interventions: Vec<Intervention>,
    handoff: Option<HandoffPayload>,
    last_pipeline_fingerprint: Option<u64>,
}

impl SessionManager {
    pub fn new(
        user_id: impl Into<String>,
        session_type: SessionType,
        extractor: Arc<FieldExtractor>,
        config: SessionConfig,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            state: ConversationState::with_config(user_id, session_type, &config),
            phase: SessionPhase::Collecting,
            config,
            extractor,
            questions: QuestionGenerator::new(),
            detector: PatternDetector::new(),
            engine: InterventionEngine::new(),
            store: None,
            user_habits: Vec::new(),
            prior_patterns: Vec::new(),
            history_messages: Vec::new(),
            patterns: Vec::new(),
            interventions: Vec::new(),
            handoff: None,
            last_pipeline_fingerprint: None,
        }
    }

    pub fn with_store(mut self, store: Arc<dyn SessionStore>) -> Self {
        self.store = Some(store);
        self
    }

    /// Habits from the user's current plan, listed in the follow-up welcome.
    pub fn with_habits(mut self, habits: Vec<String>) -> Self {
        self.user_habits = habits;
        self
    }

    pub fn id(&self) -> Uuid {
        self.id
    }

    pub fn phase(&self) -> SessionPhase {
        self.phase
    }

    pub fn state(&self) -> &ConversationState {
        &self.state
    }

    pub fn session_type(&self) -> SessionType {
        self.state.session_type()
    }

    pub fn patterns(&self) -> &[DetectedPattern] {
        &self.patterns
    }

    pub fn interventions(&self) -> &[Intervention] {
        &self.interventions
    }

    pub fn handoff(&self) -> Option<&HandoffPayload> {
        self.handoff.as_ref()
    }

    pub fn prior_patterns(&self) -> &[DetectedPattern] {
        &self.prior_patterns
    }

    /// Opening message. Also primes the slot the first reply answers.
    pub fn welcome(&mut self) -> String {
        let question = self
            .questions
            .welcome(self.state.session_type(), &self.user_habits);
        self.state
            .add_agent_message(question.text.clone(), question.field.as_deref());
        question.text
    }

    /// Pull earlier sessions for this user from the store. Returns how many
    /// were loaded; store failures are logged and treated as no history.
    pub async fn load_history(&mut self) -> usize {
        let Some(store) = &self.store else {
            return 0;
        };

        let summaries = match store
            .load_recent(self.state.user_id(), self.config.history_sessions)
            .await
        {
            Ok(summaries) => summaries,
            Err(e) => {
                warn!(session = %self.id, error = %e, "Failed to load session history");
                return 0;
            }
        };

        self.prior_patterns = summaries
            .iter()
            .flat_map(|s| s.patterns.iter().cloned())
            .collect();
        self.history_messages = summaries
            .iter()
            .flat_map(|s| s.user_messages.iter().cloned())
            .collect();

        debug!(
            session = %self.id,
            sessions = summaries.len(),
            patterns = self.prior_patterns.len(),
            "Loaded session history"
        );
        summaries.len()
    }

    /// Handle one user message.
    pub async fn process_message(&mut self, text: &str) -> Result<TurnOutcome, SessionError> {
        if self.phase.is_terminal() {
            return Err(SessionError::Completed { id: self.id });
        }

        // A reply to a clarification that yields nothing for that slot still
        // spends an attempt.
        let pending_clarification = self
            .state
            .last_question_field()
            .filter(|field| self.state.is_ambiguous(field))
            .map(str::to_string);

        let context = self.state.recent_user_messages(self.config.recent_context);
        let last_field = self.state.last_question_field().map(str::to_string);
        let turn = self.state.add_user_message(text);

        let outcome = self
            .extractor
            .extract_all(text, &context, last_field.as_deref())
            .await;
        debug!(
            session = %self.id,
            turn,
            layer = ?outcome.layer,
            fields = outcome.fields.len(),
            "Extracted message"
        );
        self.apply_extraction(&outcome, text);

        if let Some(field) = pending_clarification
            && !outcome.fields.contains_key(&field)
        {
            let attempt = self.state.clarification_attempts(&field) + 1;
            let question = self.extractor.clarification(text, &field, attempt);
            self.state.mark_ambiguous(&field, question);
        }

        if self.state.has_urgent_symptoms() {
            self.transition(SessionPhase::Urgent)?;
            self.state.add_agent_message(URGENT_RESPONSE, None);
            return Ok(self.outcome(URGENT_RESPONSE.to_string()));
        }

        let sticky = self.phase == SessionPhase::ReadyForHandoff;
        let readiness = readiness::assess(&self.state, &self.config);
        if sticky || readiness.is_ready() {
            if let Readiness::Ready(reason) = readiness
                && !sticky
            {
                info!(session = %self.id, turn, ?reason, "Session ready for handoff");
            }
            self.transition(SessionPhase::ReadyForHandoff)?;
            self.prepare_handoff();

            let response = self.handoff_message().to_string();
            self.state.add_agent_message(response.clone(), None);
            return Ok(self.outcome(response));
        }

        let (response, field) = match self.questions.next_question(&self.state) {
            Some(question) => (question.text, question.field),
            None => (self.fallback_prompt().to_string(), None),
        };
        self.state
            .add_agent_message(response.clone(), field.as_deref());
        Ok(self.outcome(response))
    }

    /// Merge the pipeline result into the final reply, persist a summary,
    /// and close the session.
    pub async fn complete_session(
        &mut self,
        output: &PipelineOutput,
    ) -> Result<String, SessionError> {
        match self.phase {
            SessionPhase::ReadyForHandoff => {}
            SessionPhase::Completed => return Err(SessionError::Completed { id: self.id }),
            phase => {
                return Err(SessionError::NotReady {
                    id: self.id,
                    phase: phase.to_string(),
                });
            }
        }

        let mut parts = vec![format_output(output)];
        if self.state.session_type() == SessionType::FollowUp && !self.interventions.is_empty() {
            let message = self.engine.format_message(&self.interventions);
            if !message.is_empty() {
                parts.push(format!("\n{message}"));
            }
        }
        let response = parts.join("\n");

        self.state.complete_session();
        self.transition(SessionPhase::Completed)?;
        self.save_summary(&response).await;

        info!(
            session = %self.id,
            user = %self.state.user_id(),
            turns = self.state.turn_count(),
            patterns = self.patterns.len(),
            "Session completed"
        );
        Ok(response)
    }

    /// Pipeline gate without side effects.
    pub fn pipeline_gate(&self) -> PipelineGate {
        readiness::pipeline_gate(&self.state, self.last_pipeline_fingerprint)
    }

    /// Remember the content a pipeline run was based on, so an unchanged
    /// conversation is not sent again.
    pub fn mark_pipeline_run(&mut self) {
        self.last_pipeline_fingerprint = Some(self.state.content_fingerprint());
    }

    /// Gate check that records the fingerprint when the pipeline should run.
    pub fn should_run_full_pipeline(&mut self) -> PipelineGate {
        let gate = self.pipeline_gate();
        match &gate {
            PipelineGate::Run => self.mark_pipeline_run(),
            PipelineGate::Skip(reason) => {
                debug!(session = %self.id, ?reason, "Skipping decision pipeline");
            }
        }
        gate
    }

    /// Reply used when the pipeline is skipped.
    pub fn quick_response(&self, reason: &SkipReason) -> String {
        let next = self.questions.next_question(&self.state).map(|q| q.text);
        reason.quick_response(next.as_deref())
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext {
            user_id: self.state.user_id().to_string(),
            session_type: self.state.session_type(),
            combined_input: self.state.combined_input(),
            fields: self.state.collected_values(),
            implied: self.state.implied_fields().clone(),
            patterns_summary: self.patterns_summary(),
            previous_habits: self.user_habits.clone(),
            turn_count: self.state.turn_count(),
        }
    }

    /// Start over with the same user and session type. History loaded from
    /// the store is kept.
    pub fn reset(&mut self) {
        self.state.reset();
        self.phase = SessionPhase::Collecting;
        self.patterns.clear();
        self.interventions.clear();
        self.handoff = None;
        self.last_pipeline_fingerprint = None;
    }

    fn apply_extraction(&mut self, outcome: &ExtractionOutcome, text: &str) {
        for (name, extraction) in &outcome.fields {
            self.state
                .set_field(name, extraction.value.clone(), extraction.tag(), text, None);
            if extraction.needs_clarification {
                let attempt = self.state.clarification_attempts(name) + 1;
                let question = self.extractor.clarification(text, name, attempt);
                self.state.mark_ambiguous(name, question);
            }
        }
        for (name, value) in &outcome.implied {
            self.state.set_implied(name, value, IMPLIED_REASON);
        }
        for symptom in &outcome.urgent_symptoms {
            self.state.add_urgent_flag(symptom);
        }
    }

    fn transition(&mut self, target: SessionPhase) -> Result<(), SessionError> {
        if !self.phase.can_transition_to(target) {
            return Err(SessionError::InvalidTransition {
                id: self.id,
                state: self.phase.to_string(),
                target: target.to_string(),
            });
        }
        if self.phase != target {
            debug!(session = %self.id, from = %self.phase, to = %target, "Phase change");
        }
        self.phase = target;
        Ok(())
    }

    fn prepare_handoff(&mut self) {
        self.state.set_last_question_field(None);

        if self.state.session_type() == SessionType::FollowUp {
            let messages = self.state.user_messages();
            let mut patterns = self
                .detector
                .analyze_session(&messages, &self.prior_patterns);
            if self.history_messages.is_empty() {
                patterns.extend(self.detector.health_trends(&messages));
            } else {
                let mut all = self.history_messages.clone();
                all.extend(messages.iter().cloned());
                patterns.extend(self.detector.analyze_history(&all));
            }
            let summary = self.detector.habit_summary(&messages);
            self.interventions = self.engine.generate(&patterns, &summary);
            self.patterns = patterns;
        }

        self.handoff = Some(HandoffPayload {
            session_id: self.id,
            user_id: self.state.user_id().to_string(),
            session_type: self.state.session_type(),
            combined_input: self.state.combined_input(),
            fields: self.state.collected_values(),
            implied: self.state.implied_fields().clone(),
            patterns: self.patterns.clone(),
            interventions: self.interventions.clone(),
            created_at: Utc::now(),
        });
    }

    fn handoff_message(&self) -> &'static str {
        match self.state.session_type() {
            SessionType::Intake => {
                "Thank you for sharing that information! I'm now analyzing your health profile and creating personalized recommendations..."
            }
            SessionType::FollowUp => {
                "Thanks for the update! I'm reviewing your progress and preparing personalized feedback..."
            }
            SessionType::General => "Let me look into that for you...",
        }
    }

    fn fallback_prompt(&self) -> &'static str {
        match self.state.session_type() {
            SessionType::General => "Could you tell me a bit more about your question?",
            _ => "Is there anything else you'd like to share?",
        }
    }

    fn patterns_summary(&self) -> String {
        if self.patterns.is_empty() {
            return String::new();
        }
        let mut lines = vec!["Detected patterns from this session:".to_string()];
        lines.extend(
            self.patterns
                .iter()
                .take(3)
                .map(|p| format!("- {} (severity: {})", p.description, p.severity)),
        );
        lines.join("\n")
    }

    fn outcome(&self, response: String) -> TurnOutcome {
        let ready = self.phase == SessionPhase::ReadyForHandoff;
        TurnOutcome {
            response,
            ready,
            phase: self.phase,
            turn: self.state.turn_count(),
            urgent_symptoms: self.state.urgent_flags().iter().cloned().collect(),
            handoff: if ready { self.handoff.clone() } else { None },
        }
    }

    async fn save_summary(&self, final_response: &str) {
        let Some(store) = &self.store else {
            return;
        };
        let summary = SessionSummary {
            session_id: self.id,
            user_id: self.state.user_id().to_string(),
            session_type: self.state.session_type(),
            fields: self.state.collected_values(),
            implied: self.state.implied_fields().clone(),
            user_messages: self.state.user_messages(),
            patterns: self.patterns.clone(),
            interventions: self.interventions.clone(),
            final_response: final_response.to_string(),
            turn_count: self.state.turn_count(),
            completed_at: Utc::now(),
        };
        if let Err(e) = store.save(&summary).await {
            warn!(session = %self.id, error = %e, "Failed to persist session summary");
        }
    }
}
