//! Monitor stage (§4.3).

pub mod error;
pub mod monitor;
pub mod types;

pub use error::MonitorError;
pub use monitor::Monitor;
pub use types::{Aggregates, Anomalies, MonitorOutput, SmoothedEdge};
