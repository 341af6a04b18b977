//! Per-session conversation state.

use std::collections::hash_map::DefaultHasher;
use std::collections::{BTreeMap, BTreeSet, VecDeque};
use std::hash::{Hash, Hasher};

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::config::SessionConfig;
use crate::conversation::field::{ExtractedField, FieldConfidence, FieldValue, SessionType};

/// Who wrote a logged message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MessageRole {
    User,
    Agent,
    System,
}

/// One entry in the message log.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggedMessage {
    pub role: MessageRole,
    pub content: String,
    pub turn: u32,
    pub timestamp: DateTime<Utc>,
}

/// Serializable counters for logs and host dashboards.
#[derive(Debug, Clone, Serialize)]
pub struct StateSnapshot {
    pub session_type: SessionType,
    pub user_id: String,
    pub turn_count: u32,
    pub sessions_completed: u32,
    pub fields: BTreeMap<String, FieldConfidence>,
    pub implied_fields: BTreeMap<String, String>,
    pub ambiguous_fields: Vec<String>,
    pub urgent_flags: Vec<String>,
    pub message_count: usize,
    pub weighted_score: f32,
}

/// Slots, message log, and flags for one session.
///
/// Only the mutators below change slot state. The message log is a ring
/// buffer: once `capacity` entries exist the oldest is evicted first.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConversationState {
    user_id: String,
    session_type: SessionType,
    messages: VecDeque<LoggedMessage>,
    capacity: usize,
    fields: BTreeMap<String, ExtractedField>,
    implied_fields: BTreeMap<String, String>,
    /// Turn on which an implied fact was last recorded.
    #[serde(default)]
    last_implied_turn: Option<u32>,
    ambiguous_fields: BTreeSet<String>,
    clarification_attempts: BTreeMap<String, u32>,
    max_clarification_attempts: u32,
    urgent_flags: BTreeSet<String>,
    turn_count: u32,
    sessions_completed: u32,
    last_question_field: Option<String>,
    started_at: DateTime<Utc>,
    last_activity: DateTime<Utc>,
}

impl ConversationState {
    /// New state with default limits.
    pub fn new(user_id: impl Into<String>, session_type: SessionType) -> Self {
        Self::with_config(user_id, session_type, &SessionConfig::default())
    }

    pub fn with_config(
        user_id: impl Into<String>,
        session_type: SessionType,
        config: &SessionConfig,
    ) -> Self {
        let now = Utc::now();
        Self {
            user_id: user_id.into(),
            session_type,
            messages: VecDeque::with_capacity(config.message_capacity),
            capacity: config.message_capacity.max(1),
            fields: BTreeMap::new(),
            implied_fields: BTreeMap::new(),
            last_implied_turn: None,
            ambiguous_fields: BTreeSet::new(),
            clarification_attempts: BTreeMap::new(),
            max_clarification_attempts: config.max_clarification_attempts,
            urgent_flags: BTreeSet::new(),
            turn_count: 0,
            sessions_completed: 0,
            last_question_field: None,
            started_at: now,
            last_activity: now,
        }
    }

    // ── Accessors ───────────────────────────────────────────────────

    pub fn user_id(&self) -> &str {
        &self.user_id
    }

    pub fn session_type(&self) -> SessionType {
        self.session_type
    }

    pub fn turn_count(&self) -> u32 {
        self.turn_count
    }

    pub fn sessions_completed(&self) -> u32 {
        self.sessions_completed
    }

    pub fn started_at(&self) -> DateTime<Utc> {
        self.started_at
    }

    pub fn last_activity(&self) -> DateTime<Utc> {
        self.last_activity
    }

    pub fn messages(&self) -> &VecDeque<LoggedMessage> {
        &self.messages
    }

    pub fn fields(&self) -> &BTreeMap<String, ExtractedField> {
        &self.fields
    }

    pub fn field(&self, name: &str) -> Option<&ExtractedField> {
        self.fields.get(name)
    }

    pub fn field_value(&self, name: &str) -> Option<&FieldValue> {
        self.fields.get(name).map(|f| &f.value)
    }

    pub fn has_field(&self, name: &str) -> bool {
        self.fields.contains_key(name)
    }

    pub fn implied_fields(&self) -> &BTreeMap<String, String> {
        &self.implied_fields
    }

    pub fn implied_on_turn(&self, turn: u32) -> bool {
        self.last_implied_turn == Some(turn)
    }

    pub fn ambiguous_fields(&self) -> &BTreeSet<String> {
        &self.ambiguous_fields
    }

    pub fn is_ambiguous(&self, name: &str) -> bool {
        self.ambiguous_fields.contains(name)
    }

    pub fn clarification_attempts(&self, name: &str) -> u32 {
        self.clarification_attempts.get(name).copied().unwrap_or(0)
    }

    pub fn urgent_flags(&self) -> &BTreeSet<String> {
        &self.urgent_flags
    }

    pub fn has_urgent_symptoms(&self) -> bool {
        !self.urgent_flags.is_empty()
    }

    pub fn last_question_field(&self) -> Option<&str> {
        self.last_question_field.as_deref()
    }

    // ── Mutators ────────────────────────────────────────────────────

    /// Log a user message and advance the turn counter. Returns the new turn.
    pub fn add_user_message(&mut self, content: impl Into<String>) -> u32 {
        self.turn_count += 1;
        self.push_message(MessageRole::User, content.into());
        self.turn_count
    }

    /// Log an agent message and remember which slot it asked about.
    pub fn add_agent_message(&mut self, content: impl Into<String>, question_field: Option<&str>) {
        self.push_message(MessageRole::Agent, content.into());
        self.last_question_field = question_field.map(str::to_string);
    }

    /// Record which slot the next user reply is expected to answer.
    pub fn set_last_question_field(&mut self, field: Option<&str>) {
        self.last_question_field = field.map(str::to_string);
    }

    /// Set a slot. Overwrites any previous value and clears its ambiguity.
    pub fn set_field(
        &mut self,
        name: &str,
        value: FieldValue,
        confidence: FieldConfidence,
        source_message: &str,
        clarifying_question: Option<String>,
    ) {
        self.fields.insert(
            name.to_string(),
            ExtractedField {
                name: name.to_string(),
                value,
                confidence,
                source_message: source_message.to_string(),
                turn_number: self.turn_count,
                clarifying_question,
            },
        );
        self.ambiguous_fields.remove(name);
    }

    /// Record an implied (non-slot) fact along with why it was inferred.
    pub fn set_implied(&mut self, name: &str, value: &str, reason: &str) {
        self.implied_fields
            .insert(name.to_string(), format!("{value} (inferred: {reason})"));
        self.last_implied_turn = Some(self.turn_count);
    }

    /// Flag a slot as needing clarification.
    ///
    /// Each call counts as one attempt. Once the attempt budget is spent the
    /// slot is force-resolved at `Low` and leaves the ambiguous set, so a slot
    /// can never be clarified forever.
    pub fn mark_ambiguous(&mut self, name: &str, clarifying_question: impl Into<String>) {
        let attempts = {
            let count = self.clarification_attempts.entry(name.to_string()).or_insert(0);
            *count += 1;
            *count
        };

        if attempts >= self.max_clarification_attempts {
            self.ambiguous_fields.remove(name);
            if let Some(field) = self.fields.get_mut(name) {
                field.confidence = FieldConfidence::Low;
                field.clarifying_question = None;
            }
            return;
        }

        self.ambiguous_fields.insert(name.to_string());
        if let Some(field) = self.fields.get_mut(name) {
            field.confidence = FieldConfidence::NeedsClarification;
            field.clarifying_question = Some(clarifying_question.into());
        }
    }

    /// Add an urgent symptom flag. Flags are never cleared except by `reset`.
    pub fn add_urgent_flag(&mut self, symptom: &str) {
        self.urgent_flags.insert(symptom.to_string());
    }

    /// Close out the session: bump the counter and log a system marker.
    pub fn complete_session(&mut self) {
        self.sessions_completed += 1;
        let marker = format!("[SESSION {} COMPLETE]", self.sessions_completed);
        self.push_message(MessageRole::System, marker);
    }

    /// Clear everything except the user id, session type, limits and
    /// completed-session counter.
    pub fn reset(&mut self) {
        let now = Utc::now();
        self.messages.clear();
        self.fields.clear();
        self.implied_fields.clear();
        self.last_implied_turn = None;
        self.ambiguous_fields.clear();
        self.clarification_attempts.clear();
        self.urgent_flags.clear();
        self.turn_count = 0;
        self.last_question_field = None;
        self.started_at = now;
        self.last_activity = now;
    }

    fn push_message(&mut self, role: MessageRole, content: String) {
        let now = Utc::now();
        if self.messages.len() == self.capacity {
            self.messages.pop_front();
        }
        self.messages.push_back(LoggedMessage {
            role,
            content,
            turn: self.turn_count,
            timestamp: now,
        });
        self.last_activity = now;
    }

    // ── Derived views ───────────────────────────────────────────────

    /// Retained user messages, oldest first.
    pub fn user_messages(&self) -> Vec<String> {
        self.messages
            .iter()
            .filter(|m| m.role == MessageRole::User)
            .map(|m| m.content.clone())
            .collect()
    }

    pub fn combined_input(&self) -> String {
        self.user_messages().join(" ")
    }

    pub fn recent_user_messages(&self, max: usize) -> Vec<String> {
        let all = self.user_messages();
        let skip = all.len().saturating_sub(max);
        all.into_iter().skip(skip).collect()
    }

    /// Slots currently waiting on a clarification answer, ordered by name.
    pub fn fields_needing_clarification(&self) -> Vec<&ExtractedField> {
        self.fields
            .values()
            .filter(|f| f.confidence == FieldConfidence::NeedsClarification)
            .collect()
    }

    /// Slot names captured on the given turn.
    pub fn fields_from_turn(&self, turn: u32) -> Vec<&ExtractedField> {
        self.fields.values().filter(|f| f.turn_number == turn).collect()
    }

    /// Plain name → value map for handoff.
    pub fn collected_values(&self) -> BTreeMap<String, FieldValue> {
        self.fields
            .iter()
            .map(|(k, v)| (k.clone(), v.value.clone()))
            .collect()
    }

    /// Confidence-weighted readiness score.
    pub fn weighted_score(&self) -> f32 {
        self.fields.values().map(|f| f.confidence.weight()).sum()
    }

    /// Count of slots with High or Medium confidence.
    pub fn reliable_field_count(&self) -> usize {
        self.fields
            .values()
            .filter(|f| {
                matches!(
                    f.confidence,
                    FieldConfidence::High | FieldConfidence::Medium
                )
            })
            .count()
    }

    /// Whether every slot required for this session type is present.
    pub fn has_critical_fields(&self) -> bool {
        self.session_type
            .critical_fields()
            .iter()
            .all(|name| self.fields.contains_key(*name))
    }

    /// Stable fingerprint of the collected slot contents.
    pub fn content_fingerprint(&self) -> u64 {
        let mut hasher = DefaultHasher::new();
        for (name, field) in &self.fields {
            name.hash(&mut hasher);
            field.value.to_string().hash(&mut hasher);
        }
        hasher.finish()
    }

    pub fn snapshot(&self) -> StateSnapshot {
        StateSnapshot {
            session_type: self.session_type,
            user_id: self.user_id.clone(),
            turn_count: self.turn_count,
            sessions_completed: self.sessions_completed,
            fields: self
                .fields
                .iter()
                .map(|(k, v)| (k.clone(), v.confidence))
                .collect(),
            implied_fields: self.implied_fields.clone(),
            ambiguous_fields: self.ambiguous_fields.iter().cloned().collect(),
            urgent_flags: self.urgent_flags.iter().cloned().collect(),
            message_count: self.messages.len(),
            weighted_score: self.weighted_score(),
        }
    }
}
