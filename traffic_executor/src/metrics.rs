//! Per-cycle metrics (§4.6): computed over the current Runtime Graph after
//! applying this cycle's adaptations.

use traffic_common::graph::GraphSnapshot;
use traffic_kb::PerformanceMetrics;

pub fn compute_metrics(snapshot: &GraphSnapshot, avg_trip_time: Option<f64>) -> PerformanceMetrics {
    let edges: Vec<_> = snapshot.edges.values().collect();
    if edges.is_empty() {
        return PerformanceMetrics { avg_trip_time, ..Default::default() };
    }

    let avg_delay = edges.iter().map(|e| e.current_delay).sum::<f64>() / edges.len() as f64;
    let avg_queue = edges.iter().map(|e| e.current_queue).sum::<f64>() / edges.len() as f64;
    let network_cost: f64 = edges.iter().map(|e| e.edge_cost).sum();
    let total_spillbacks = edges.iter().filter(|e| e.spillback_active).count() as i64;

    PerformanceMetrics {
        avg_delay,
        avg_queue,
        network_cost,
        total_spillbacks,
        avg_trip_time,
        utility_score: -network_cost,
    }
}
