//! Throttle/favor target derivation (§4.4): `edges_to_throttle` is the
//! union of hotspots and incident edges; `edges_to_favor` is every edge on
//! a bypass path that is not itself a hotspot.

use std::collections::{HashMap, HashSet};

use traffic_common::graph::EdgeKey;

use crate::types::{Bypass, Incident, TargetEdge, Targets};

pub fn compute_targets(
    hotspots: &[(EdgeKey, f64)],
    incidents: &[Incident],
    bypasses: &[Bypass],
) -> Targets {
    let hotspot_keys: HashSet<(String, String)> = hotspots
        .iter()
        .map(|(k, _)| (k.from.to_string(), k.to.to_string()))
        .collect();

    let mut throttle: Vec<TargetEdge> = Vec::new();
    let mut seen_throttle: HashSet<(String, String)> = HashSet::new();

    for (key, cost) in hotspots {
        let pair = (key.from.to_string(), key.to.to_string());
        if seen_throttle.insert(pair.clone()) {
            throttle.push(TargetEdge {
                from: pair.0,
                to: pair.1,
                reason: "hotspot".to_string(),
                cost: *cost,
            });
        }
    }
    for incident in incidents {
        let pair = (incident.from.clone(), incident.to.clone());
        if seen_throttle.insert(pair.clone()) {
            throttle.push(TargetEdge {
                from: pair.0,
                to: pair.1,
                reason: "incident".to_string(),
                cost: 0.0,
            });
        }
    }

    let mut favor: Vec<TargetEdge> = Vec::new();
    let mut seen_favor: HashSet<(String, String)> = HashSet::new();
    let mut bypass_costs: HashMap<(String, String), f64> = HashMap::new();
    for bypass in bypasses {
        let per_edge_cost = if bypass.path.is_empty() {
            0.0
        } else {
            bypass.total_cost / bypass.path.len() as f64
        };
        for (from, to) in &bypass.path {
            bypass_costs.insert((from.clone(), to.clone()), per_edge_cost);
        }
    }
    for bypass in bypasses {
        for (from, to) in &bypass.path {
            let pair = (from.clone(), to.clone());
            if hotspot_keys.contains(&pair) {
                continue;
            }
            if seen_favor.insert(pair.clone()) {
                favor.push(TargetEdge {
                    from: pair.0.clone(),
                    to: pair.1.clone(),
                    reason: "bypass".to_string(),
                    cost: *bypass_costs.get(&pair).unwrap_or(&0.0),
                });
            }
        }
    }

    let mut affected: Vec<String> = Vec::new();
    let mut seen_affected: HashSet<String> = HashSet::new();
    for edge in throttle.iter().chain(favor.iter()) {
        if seen_affected.insert(edge.from.clone()) {
            affected.push(edge.from.clone());
        }
    }

    let adaptation_needed = !throttle.is_empty() || !favor.is_empty();

    Targets {
        edges_to_throttle: throttle,
        edges_to_favor: favor,
        affected_intersections: affected,
        adaptation_needed,
    }
}
