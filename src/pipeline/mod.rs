//! External decision pipeline contract.
//!
//! A session that passes the readiness gate produces a `HandoffPayload`.
//! The host's `DecisionPipeline` turns it into advice, and
//! `formatter::format_output` renders whatever shape comes back as
//! user-facing markdown.

pub mod formatter;
pub mod types;

pub use formatter::format_output;
pub use types::{DecisionPipeline, HandoffPayload, PipelineOutput};
