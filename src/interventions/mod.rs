//! Recommendations generated from detected patterns.

pub mod engine;
pub mod model;

pub use engine::{InterventionEngine, alternatives};
pub use model::{Intervention, InterventionType};
