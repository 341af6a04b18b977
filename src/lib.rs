//! Health Intake: conversational slot-filling core.

pub mod config;
pub mod conversation;
pub mod error;
pub mod extraction;
pub mod interventions;
pub mod llm;
pub mod patterns;
pub mod pipeline;
pub mod semantic;
pub mod session;
pub mod store;
