//! Edge cost function and hotspot identification (§4.4).

use std::collections::HashMap;

use traffic_common::config::CostCoefficients;
use traffic_common::graph::{EdgeKey, GraphSnapshot};

use crate::types::CostBreakdown;

pub fn edge_key_str(key: &EdgeKey) -> String {
    format!("{}->{}", key.from, key.to)
}

/// `cost(e) = a·delay + b·queue + c·S·𝟙[spillback] + d·I·𝟙[incident]` (§4.4).
pub fn edge_cost(delay: f64, queue: f64, spillback: bool, incident: bool, coeffs: &CostCoefficients) -> f64 {
    coeffs.a * delay
        + coeffs.b * queue
        + coeffs.c * if spillback { coeffs.spillback_magnitude } else { 0.0 }
        + coeffs.d * if incident { coeffs.incident_magnitude } else { 0.0 }
}

/// Compute and return every edge's cost, keyed by `EdgeKey`, in stable
/// insertion order.
pub fn compute_edge_costs(snapshot: &GraphSnapshot, coeffs: &CostCoefficients) -> Vec<(EdgeKey, f64)> {
    snapshot
        .get_edge_ids()
        .into_iter()
        .map(|key| {
            let edge = snapshot.edges.get(&key).expect("key came from this snapshot");
            let cost = edge_cost(edge.current_delay, edge.current_queue, edge.spillback_active, edge.incident_active, coeffs);
            (key, cost)
        })
        .collect()
}

/// `τ`-th percentile using linear interpolation between closest ranks
/// (matches `numpy.percentile`'s default `linear` method).
pub fn percentile(sorted_values: &[f64], p: f64) -> f64 {
    if sorted_values.is_empty() {
        return 0.0;
    }
    if sorted_values.len() == 1 {
        return sorted_values[0];
    }
    let rank = (p / 100.0) * (sorted_values.len() - 1) as f64;
    let lower = rank.floor() as usize;
    let upper = rank.ceil() as usize;
    if lower == upper {
        return sorted_values[lower];
    }
    let frac = rank - lower as f64;
    sorted_values[lower] + frac * (sorted_values[upper] - sorted_values[lower])
}

/// A hotspot is any edge whose cost is at or above the configured
/// percentile threshold. Fewer than two costed edges yields no hotspots,
/// and so does a network with no cost variation at all (every edge at or
/// below zero) — otherwise a uniform threshold of zero would flag the
/// entire network as congested in steady state (§8 boundary behaviour).
/// Tie-break: insertion order (the order `costs` is given in).
pub fn identify_hotspots(costs: &[(EdgeKey, f64)], hotspot_threshold: f64) -> Vec<EdgeKey> {
    if costs.len() < 2 {
        return Vec::new();
    }
    let mut sorted: Vec<f64> = costs.iter().map(|(_, c)| *c).collect();
    sorted.sort_by(|a, b| a.partial_cmp(b).unwrap());
    let threshold_value = percentile(&sorted, hotspot_threshold * 100.0);
    if threshold_value <= 0.0 {
        return Vec::new();
    }

    costs
        .iter()
        .filter(|(_, cost)| *cost >= threshold_value)
        .map(|(key, _)| key.clone())
        .collect()
}

pub fn cost_breakdown(snapshot: &GraphSnapshot, key: &EdgeKey, coeffs: &CostCoefficients) -> Option<CostBreakdown> {
    let edge = snapshot.edges.get(key)?;
    Some(CostBreakdown {
        total_cost: edge.edge_cost,
        delay_component: coeffs.a * edge.current_delay,
        queue_component: coeffs.b * edge.current_queue,
        spillback_component: coeffs.c * if edge.spillback_active { coeffs.spillback_magnitude } else { 0.0 },
        incident_component: coeffs.d * if edge.incident_active { coeffs.incident_magnitude } else { 0.0 },
        delay: edge.current_delay,
        queue: edge.current_queue,
        spillback: edge.spillback_active,
        incident: edge.incident_active,
    })
}

pub fn avg_and_max(costs: &[(EdgeKey, f64)]) -> (f64, f64) {
    if costs.is_empty() {
        return (0.0, 0.0);
    }
    let sum: f64 = costs.iter().map(|(_, c)| c).sum();
    let max = costs.iter().map(|(_, c)| *c).fold(f64::MIN, f64::max);
    (sum / costs.len() as f64, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_common::graph::NodeId;

    fn key(from: &str, to: &str) -> EdgeKey {
        EdgeKey::new(NodeId::new(from), NodeId::new(to))
    }

    #[test]
    fn edge_cost_matches_canonical_formula() {
        let coeffs = CostCoefficients::default();
        let cost = edge_cost(25.0, 80.0, false, false, &coeffs);
        assert_eq!(cost, 1.0 * 25.0 + 0.5 * 80.0);
    }

    #[test]
    fn edge_cost_applies_spillback_and_incident_penalties() {
        let coeffs = CostCoefficients::default();
        assert_eq!(edge_cost(30.0, 95.0, true, false, &coeffs), 1.0 * 30.0 + 0.5 * 95.0 + 10.0 * 10.0);
        assert_eq!(edge_cost(35.0, 70.0, false, true, &coeffs), 1.0 * 35.0 + 0.5 * 70.0 + 20.0 * 20.0);
    }

    #[test]
    fn percentile_interpolates_linearly() {
        let sorted = vec![10.0, 20.0, 30.0, 40.0];
        assert_eq!(percentile(&sorted, 0.0), 10.0);
        assert_eq!(percentile(&sorted, 100.0), 40.0);
        assert_eq!(percentile(&sorted, 50.0), 25.0);
    }

    #[test]
    fn hotspots_empty_below_two_edges() {
        let costs = vec![(key("A", "B"), 100.0)];
        assert!(identify_hotspots(&costs, 0.7).is_empty());
    }

    #[test]
    fn hotspots_empty_when_all_edges_cost_zero() {
        let costs = vec![
            (key("A", "B"), 0.0),
            (key("B", "C"), 0.0),
            (key("C", "D"), 0.0),
        ];
        assert!(identify_hotspots(&costs, 0.7).is_empty());
    }

    #[test]
    fn hotspots_selects_top_percentile() {
        let costs = vec![
            (key("A", "B"), 65.0),
            (key("B", "C"), 1.0),
            (key("C", "D"), 2.0),
            (key("D", "E"), 3.0),
        ];
        let hotspots = identify_hotspots(&costs, 0.7);
        assert!(hotspots.contains(&key("A", "B")));
    }
}
