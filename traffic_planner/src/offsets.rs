//! Coordination offset computation (§4.5), grounded on
//! `original_source/aegislights-controller/adaptation_manager/coordination.py::_calculate_offsets`.

use std::collections::HashMap;

use traffic_analyzer::CoordinationGroup;
use traffic_common::graph::{GraphSnapshot, NodeId};

const MIN_OFFSET: f64 = 0.0;
const MAX_OFFSET: f64 = 300.0;
const DEFAULT_HOP_OFFSET: f64 = 20.0;
const DELAY_SLACK_FRACTION: f64 = 0.3;

/// Walk each coordination group in member order; the first member gets
/// offset 0, each subsequent member accumulates the free-flow time of the
/// edge to it plus 30% of that edge's current delay as slack (20 s default
/// when no edge exists). Clamped to `[0, 300]`. Only intersections present
/// in `planned` receive an offset.
pub fn compute_offsets(
    groups: &[CoordinationGroup],
    snapshot: &GraphSnapshot,
    planned: &std::collections::HashSet<String>,
) -> HashMap<String, f64> {
    let mut offsets = HashMap::new();
    for group in groups {
        let mut cumulative = 0.0;
        let mut previous: Option<&String> = None;
        for member in &group.intersections {
            if !planned.contains(member) {
                continue;
            }
            match previous {
                None => {
                    cumulative = 0.0;
                }
                Some(prev) => {
                    let increment = hop_offset(snapshot, prev, member);
                    cumulative = (cumulative + increment).clamp(MIN_OFFSET, MAX_OFFSET);
                }
            }
            offsets.insert(member.clone(), cumulative);
            previous = Some(member);
        }
    }
    offsets
}

fn hop_offset(snapshot: &GraphSnapshot, from: &str, to: &str) -> f64 {
    match snapshot.get_edge(&NodeId::new(from), &NodeId::new(to)) {
        Some(edge) => {
            let slack = if edge.current_delay > 0.0 { edge.current_delay * DELAY_SLACK_FRACTION } else { 0.0 };
            edge.free_flow_time + slack
        }
        None => DEFAULT_HOP_OFFSET,
    }
}
