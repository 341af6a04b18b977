//! Session lifecycle.
//!
//! `SessionManager` runs one conversation through its phases, the readiness
//! module decides when it can hand off and whether the decision pipeline is
//! worth running, and `SessionRegistry` keeps live sessions for the host.

pub mod manager;
pub mod phase;
pub mod readiness;
pub mod registry;

pub use manager::{SessionContext, SessionManager, TurnOutcome};
pub use phase::SessionPhase;
pub use readiness::{PipelineGate, Readiness, ReadyReason, SkipReason};
pub use registry::{PipelineRun, SessionRegistry};
