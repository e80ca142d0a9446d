//! Planner stage (§4.5): phase library, contextual bandit, incident mode,
//! coordination offsets.

pub mod bandit;
pub mod context;
pub mod error;
pub mod incident;
pub mod offsets;
pub mod phase_library;
pub mod planner;
pub mod types;

pub use error::PlannerError;
pub use planner::Planner;
pub use types::{Adaptation, ContextVector, PlannerOutput};
