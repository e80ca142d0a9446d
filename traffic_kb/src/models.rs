//! Row/record types exchanged with the Knowledge Base.

use serde::{Deserialize, Serialize};

/// A persisted row from `graph_state` (§6.3). Static fields are preserved
/// across `upsert_edge` when the row already exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EdgeRow {
    pub edge_id: String,
    pub from: String,
    pub to: String,
    pub capacity: f64,
    pub free_flow_time: f64,
    pub length: f64,
    pub lane_count: i64,
    pub current_queue: f64,
    pub current_delay: f64,
    pub current_flow: f64,
    pub spillback_active: bool,
    pub incident_active: bool,
    pub edge_cost: f64,
    pub last_updated_cycle: i64,
}

/// The most recent applied configuration that survived the degradation
/// check for one intersection (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LastKnownGood {
    pub cycle: i64,
    pub intersection_id: String,
    pub plan_id: String,
    pub phase_id: i64,
    pub offset: f64,
    pub cycle_length: f64,
}

/// A single applied adaptation, as recorded into `signal_configurations`
/// and optionally promoted to LKG.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AppliedConfiguration {
    pub intersection_id: String,
    pub plan_id: String,
    pub phase_id: i64,
    pub offset: f64,
    pub cycle_length: f64,
    pub is_incident_mode: bool,
    pub rolled_back: bool,
}

/// Bandit arm statistics, keyed by `(intersection_id, plan_id)` (§3).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BanditArm {
    pub times_selected: u64,
    pub total_reward: f64,
    pub avg_reward: f64,
    pub confidence: f64,
}

impl BanditArm {
    pub fn unseen() -> Self {
        Self {
            times_selected: 0,
            total_reward: 0.0,
            avg_reward: 0.0,
            confidence: 1.0,
        }
    }
}

/// A pre-validated plan entry from `phase_libraries` (§3).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PhaseLibraryEntry {
    pub plan_id: String,
    pub intersection_id: String,
    pub plan_name: String,
    pub tags: Vec<String>,
    pub cycle_length: f64,
    pub phase_id: Option<i64>,
    pub timing: serde_json::Value,
}

/// Per-cycle rollups persisted to `performance_metrics` (§4.6).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct PerformanceMetrics {
    pub avg_delay: f64,
    pub avg_queue: f64,
    pub network_cost: f64,
    pub total_spillbacks: i64,
    pub avg_trip_time: Option<f64>,
    pub utility_score: f64,
}
