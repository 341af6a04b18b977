//! Conversation state and question flow.
//!
//! `ConversationState` owns the slots and message log for one session;
//! `QuestionGenerator` reads it to pick what to ask next.

pub mod field;
pub mod questions;
pub mod state;

pub use field::{ExtractedField, FieldConfidence, FieldValue, SessionType, names};
pub use questions::{
    ACKNOWLEDGMENTS, FieldSpec, NextQuestion, QuestionGenerator, URGENT_RESPONSE, field_spec,
    field_specs,
};
pub use state::{ConversationState, LoggedMessage, MessageRole, StateSnapshot};
