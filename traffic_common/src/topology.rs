//! Reference network fixture (§6.2): five signalised intersections
//! (`A..E`), eight virtual endpoints (`1..8`), 28 directed edges.
//!
//! Not loaded by production code paths — the controller loads topology
//! from configuration/the Knowledge Base at startup in general. This
//! fixture exists for tests and examples, grounded on
//! `graph_manager/graph_utils.py::CITYFLOW_EDGES`.

use crate::graph::{NodeId, NodeKind, RuntimeGraph};

pub const SIGNALISED_INTERSECTIONS: [&str; 5] = ["A", "B", "C", "D", "E"];
pub const VIRTUAL_NODES: [&str; 8] = ["1", "2", "3", "4", "5", "6", "7", "8"];

/// `(edge_id, from, to)` triples for all 28 reference edges.
pub const REFERENCE_EDGES: [(&str, &str, &str); 28] = [
    ("AB", "A", "B"),
    ("BA", "B", "A"),
    ("AC", "A", "C"),
    ("CA", "C", "A"),
    ("BC", "B", "C"),
    ("CB", "C", "B"),
    ("BD", "B", "D"),
    ("DB", "D", "B"),
    ("CE", "C", "E"),
    ("EC", "E", "C"),
    ("DE", "D", "E"),
    ("ED", "E", "D"),
    ("A1", "A", "1"),
    ("1A", "1", "A"),
    ("A2", "A", "2"),
    ("2A", "2", "A"),
    ("B3", "B", "3"),
    ("3B", "3", "B"),
    ("B4", "B", "4"),
    ("4B", "4", "B"),
    ("C5", "C", "5"),
    ("5C", "5", "C"),
    ("C6", "C", "6"),
    ("6C", "6", "C"),
    ("D7", "D", "7"),
    ("7D", "7", "D"),
    ("E8", "E", "8"),
    ("8E", "8", "E"),
];

/// Default free-flow time [s] for every reference edge, used only by the
/// fixture (production topology comes from config/KB).
const DEFAULT_FREE_FLOW_TIME: f64 = 20.0;
const DEFAULT_CAPACITY: f64 = 1800.0;
const DEFAULT_LENGTH: f64 = 400.0;
const DEFAULT_LANES: u32 = 2;

/// Build the reference network into a fresh [`RuntimeGraph`].
pub fn reference_network() -> RuntimeGraph {
    let graph = RuntimeGraph::new();
    for id in SIGNALISED_INTERSECTIONS {
        graph.add_node(NodeId::new(id), NodeKind::Signalised);
    }
    for id in VIRTUAL_NODES {
        graph.add_node(NodeId::new(id), NodeKind::Virtual);
    }
    for (edge_id, from, to) in REFERENCE_EDGES {
        graph.add_edge(
            NodeId::new(from),
            NodeId::new(to),
            edge_id.to_string(),
            DEFAULT_CAPACITY,
            DEFAULT_FREE_FLOW_TIME,
            DEFAULT_LENGTH,
            DEFAULT_LANES,
        );
    }
    graph
}

/// Trim a CityFlow lane id (`"AB_0"`) down to its edge id (`"AB"`), per §6.2.
pub fn lane_id_to_edge_id(lane_id: &str) -> &str {
    match lane_id.rsplit_once('_') {
        Some((edge_id, suffix)) if suffix.chars().all(|c| c.is_ascii_digit()) => edge_id,
        _ => lane_id,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reference_network_has_five_signalised_and_eight_virtual_nodes() {
        let g = reference_network();
        let snap = g.snapshot();
        let signalised = snap.signalised_node_ids();
        assert_eq!(signalised.len(), 5);
        assert_eq!(snap.nodes.len(), 13);
        assert_eq!(snap.edges.len(), 28);
    }

    #[test]
    fn lane_id_trims_trailing_index() {
        assert_eq!(lane_id_to_edge_id("AB_0"), "AB");
        assert_eq!(lane_id_to_edge_id("AB_12"), "AB");
        assert_eq!(lane_id_to_edge_id("AB"), "AB");
    }
}
