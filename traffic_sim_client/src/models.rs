//! Wire types for the simulator's HTTP surface (§6.1) and the aggregated
//! per-edge observation the rest of the core actually consumes.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use traffic_common::topology::lane_id_to_edge_id;

/// Raw `GET /snapshots/latest` response. Field names match the simulator's
/// JSON exactly; `current_time` is accepted under either key the simulator
/// has been observed to use.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct RawSnapshot {
    #[serde(default)]
    pub lane_vehicle_count: HashMap<String, f64>,
    #[serde(default)]
    pub lane_waiting_vehicle_count: HashMap<String, f64>,
    #[serde(default)]
    pub current_phase: HashMap<String, i64>,
    #[serde(default, alias = "current_time")]
    pub time: f64,
    #[serde(default)]
    pub average_travel_time: Option<f64>,
}

/// One edge's aggregated observation for a cycle, after lane-to-edge
/// rollup (§6.1, grounded on `_aggregate_lane_data_to_edges`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct EdgeObservation {
    pub total_vehicles: f64,
    pub total_waiting: f64,
    pub lane_count: u32,
}

impl EdgeObservation {
    /// Delay estimate: ~2s per waiting vehicle per lane, averaged across
    /// the edge's lanes (grounded 1:1 on the original's `estimated_delay`).
    pub fn estimated_delay(&self) -> f64 {
        let avg_waiting = self.total_waiting / self.lane_count.max(1) as f64;
        avg_waiting * 2.0
    }

    pub fn estimated_queue(&self) -> f64 {
        self.total_vehicles
    }
}

/// The simulator snapshot after lane aggregation: per-edge observations,
/// per-intersection current phase, simulated time, and derived cycle
/// number.
#[derive(Debug, Clone, Default)]
pub struct Snapshot {
    pub cycle_number: i64,
    pub timestamp: f64,
    pub edges: HashMap<String, EdgeObservation>,
    pub current_phase: HashMap<String, i64>,
    pub average_travel_time: Option<f64>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PlanRequest {
    pub phase_id: i64,
}

#[derive(Debug, Clone, Deserialize)]
pub struct PlanResponse {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
}

pub fn aggregate_lane_data(raw: &RawSnapshot) -> HashMap<String, EdgeObservation> {
    let mut aggregates: HashMap<String, EdgeObservation> = HashMap::new();
    for (lane_id, &vehicle_count) in &raw.lane_vehicle_count {
        let edge_id = lane_id_to_edge_id(lane_id).to_string();
        let waiting = raw.lane_waiting_vehicle_count.get(lane_id).copied().unwrap_or(0.0);
        let entry = aggregates.entry(edge_id).or_insert(EdgeObservation {
            total_vehicles: 0.0,
            total_waiting: 0.0,
            lane_count: 0,
        });
        entry.total_vehicles += vehicle_count;
        entry.total_waiting += waiting;
        entry.lane_count += 1;
    }
    aggregates
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lane_id_trims_trailing_numeric_index() {
        assert_eq!(lane_id_to_edge_id("AB_0"), "AB");
        assert_eq!(lane_id_to_edge_id("AB_12"), "AB");
        assert_eq!(lane_id_to_edge_id("AB"), "AB");
    }

    #[test]
    fn aggregate_sums_vehicles_and_waiting_per_edge() {
        let mut raw = RawSnapshot::default();
        raw.lane_vehicle_count.insert("AB_0".into(), 4.0);
        raw.lane_vehicle_count.insert("AB_1".into(), 2.0);
        raw.lane_waiting_vehicle_count.insert("AB_0".into(), 2.0);
        raw.lane_waiting_vehicle_count.insert("AB_1".into(), 0.0);

        let aggregates = aggregate_lane_data(&raw);
        let ab = aggregates.get("AB").unwrap();
        assert_eq!(ab.total_vehicles, 6.0);
        assert_eq!(ab.total_waiting, 2.0);
        assert_eq!(ab.lane_count, 2);
        assert_eq!(ab.estimated_queue(), 6.0);
        assert_eq!(ab.estimated_delay(), 2.0);
    }
}
