//! Knowledge Base crate: the single gateway to persistent state (§4.2).

pub mod error;
pub mod kb;
pub mod models;
pub mod schema;

pub use error::KbError;
pub use kb::KnowledgeBase;
pub use models::{AppliedConfiguration, BanditArm, EdgeRow, LastKnownGood, PerformanceMetrics, PhaseLibraryEntry};
