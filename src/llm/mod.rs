//! LLM integration.
//!
//! Only the provider contract lives here. The extractor talks to any backend
//! through `LlmProvider`; the host wires in a concrete vendor adapter.

pub mod provider;

pub use provider::*;
