//! Monitor output types (§4.3).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use traffic_common::graph::EdgeKey;

/// Window-smoothed view of one edge, computed as the last-W mean (never
/// exponential — that belongs to the Analyzer's trend estimation).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SmoothedEdge {
    pub avg_queue: f64,
    pub avg_delay: f64,
    pub raw_queue: f64,
    pub raw_delay: f64,
    pub window_len: usize,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Aggregates {
    pub avg_queue: f64,
    pub avg_delay: f64,
    pub max_queue: f64,
    pub max_delay: f64,
    pub total_edges: usize,
    pub smoothed_edges: HashMap<String, SmoothedEdge>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpillbackAnomaly {
    pub from: String,
    pub to: String,
    pub queue: f64,
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct IncidentAnomaly {
    pub from: String,
    pub to: String,
    pub queue: f64,
    pub delay: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HighCongestionAnomaly {
    pub from: String,
    pub to: String,
    pub queue: f64,
    pub capacity: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Anomalies {
    pub spillbacks: Vec<SpillbackAnomaly>,
    pub incidents: Vec<IncidentAnomaly>,
    pub high_congestion: Vec<HighCongestionAnomaly>,
}

/// `{snapshot, edges_updated, aggregates, anomalies}` (§4.3).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct MonitorOutput {
    pub cycle: i64,
    pub timestamp: f64,
    pub edges_updated: usize,
    pub aggregates: Aggregates,
    pub anomalies: Anomalies,
    /// `true` when the simulator could not be reached this cycle — the
    /// graph was left untouched and every other field is empty.
    pub collection_failed: bool,
}

pub(crate) fn edge_key_str(key: &EdgeKey) -> String {
    format!("{}->{}", key.from, key.to)
}
