//! Per-intersection context vector (§4.5), aggregated over an
//! intersection's outgoing edges, grounded on
//! `original_source/aegislights-controller/adaptation_manager/plan.py::_build_context`.

use traffic_common::graph::{GraphSnapshot, NodeId};
use traffic_analyzer::AnalyzerOutput;

use crate::types::ContextVector;

pub fn build_context(intersection: &str, snapshot: &GraphSnapshot, analyzer_output: &AnalyzerOutput) -> ContextVector {
    let Some(node) = snapshot.get_node(&NodeId::new(intersection)) else {
        return ContextVector {
            avg_cost: analyzer_output.avg_cost,
            ..Default::default()
        };
    };

    let edges: Vec<_> = node
        .outgoing
        .iter()
        .filter_map(|key| snapshot.edges.get(key))
        .collect();

    let (avg_queue, max_queue) = mean_and_max(edges.iter().map(|e| e.current_queue));
    let (avg_delay, max_delay) = mean_and_max(edges.iter().map(|e| e.current_delay));
    let (avg_edge_cost, max_edge_cost) = mean_and_max(edges.iter().map(|e| e.edge_cost));

    let has_hotspot = node
        .outgoing
        .iter()
        .any(|key| analyzer_output.hotspots.iter().any(|(f, t)| *f == key.from.to_string() && *t == key.to.to_string()));
    let has_incident = analyzer_output.incidents.iter().any(|i| i.from == intersection);
    let num_bypasses = analyzer_output
        .bypasses
        .iter()
        .filter(|b| b.source == intersection || b.path.iter().any(|(from, _)| from == intersection))
        .count();

    ContextVector {
        avg_queue,
        max_queue,
        avg_delay,
        max_delay,
        avg_edge_cost,
        max_edge_cost,
        has_hotspot,
        has_incident,
        num_bypasses,
        avg_cost: analyzer_output.avg_cost,
    }
}

fn mean_and_max(values: impl Iterator<Item = f64> + Clone) -> (f64, f64) {
    let count = values.clone().count();
    if count == 0 {
        return (0.0, 0.0);
    }
    let sum: f64 = values.clone().sum();
    let max = values.fold(f64::MIN, f64::max);
    (sum / count as f64, max)
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_common::graph::RuntimeGraph;

    #[test]
    fn aggregates_outgoing_edges_only() {
        let g = RuntimeGraph::new();
        g.add_edge(NodeId::new("A"), NodeId::new("B"), "AB".into(), 100.0, 20.0, 400.0, 2);
        g.add_edge(NodeId::new("C"), NodeId::new("A"), "CA".into(), 100.0, 20.0, 400.0, 2);
        g.update_edge_dynamic(&NodeId::new("A"), &NodeId::new("B"), 10.0, 5.0, 0.0, false, false).unwrap();
        g.update_edge_dynamic(&NodeId::new("C"), &NodeId::new("A"), 999.0, 999.0, 0.0, false, false).unwrap();
        let snapshot = g.snapshot();
        let output = AnalyzerOutput::default();

        let ctx = build_context("A", &snapshot, &output);
        assert_eq!(ctx.avg_queue, 10.0);
        assert_eq!(ctx.avg_delay, 5.0);
    }

    #[test]
    fn missing_node_yields_default_context_with_network_cost() {
        let g = RuntimeGraph::new();
        let snapshot = g.snapshot();
        let mut output = AnalyzerOutput::default();
        output.avg_cost = 42.0;
        let ctx = build_context("ghost", &snapshot, &output);
        assert_eq!(ctx.avg_queue, 0.0);
        assert_eq!(ctx.avg_cost, 42.0);
    }
}
