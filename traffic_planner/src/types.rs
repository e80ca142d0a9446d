//! Planner output types (§4.5).

use serde::{Deserialize, Serialize};

/// Per-intersection feature vector, aggregated over outgoing edges.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize)]
pub struct ContextVector {
    pub avg_queue: f64,
    pub max_queue: f64,
    pub avg_delay: f64,
    pub max_delay: f64,
    pub avg_edge_cost: f64,
    pub max_edge_cost: f64,
    pub has_hotspot: bool,
    pub has_incident: bool,
    pub num_bypasses: usize,
    pub avg_cost: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Adaptation {
    pub intersection_id: String,
    pub plan_id: String,
    pub phase_id: i64,
    pub offset: f64,
    pub cycle_length: f64,
    pub is_incident_mode: bool,
}

/// `{cycle, adaptations, is_incident_mode, num_intersections}` (§4.5).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PlannerOutput {
    pub cycle: i64,
    pub adaptations: Vec<Adaptation>,
    pub is_incident_mode: bool,
    pub num_intersections: usize,
}
