//! Executor output types (§4.6).

use serde::{Deserialize, Serialize};

use traffic_kb::PerformanceMetrics;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedResult {
    pub intersection_id: String,
    pub plan_id: String,
    pub phase_id: i64,
    pub offset: f64,
    pub cycle_length: f64,
    pub success: bool,
}

/// `{cycle, applied, rolled_back, metrics}` (§4.6).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ExecutorOutput {
    pub cycle: i64,
    pub applied: Vec<AppliedResult>,
    pub rolled_back: bool,
    pub metrics: PerformanceMetrics,
}
