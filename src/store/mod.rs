//! Persistence contract for completed sessions.

pub mod memory;
pub mod traits;

pub use memory::InMemorySessionStore;
pub use traits::{SessionStore, SessionSummary};
