use serde::{Deserialize, Serialize};

use super::node::NodeId;

/// Primary key for an edge: its ordered endpoint pair.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct EdgeKey {
    pub from: NodeId,
    pub to: NodeId,
}

impl EdgeKey {
    pub fn new(from: impl Into<NodeId>, to: impl Into<NodeId>) -> Self {
        Self {
            from: from.into(),
            to: to.into(),
        }
    }
}

/// A directed road between two intersections.
///
/// Static attributes are set at creation and preserved across re-upserts
/// (§3 invariant: `upsert_edge` preserves static fields). Dynamic
/// attributes are updated once per cycle by the Monitor; `edge_cost` is
/// written by the Analyzer every cycle before any consumer reads it.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Edge {
    pub from: NodeId,
    pub to: NodeId,
    /// Secondary string id for wire/DB compatibility (e.g. `"AB"`).
    pub edge_id: String,

    // Static attributes.
    pub capacity: f64,
    pub free_flow_time: f64,
    pub length: f64,
    pub lane_count: u32,

    // Dynamic attributes, updated each cycle.
    pub current_queue: f64,
    pub current_delay: f64,
    pub current_flow: f64,
    pub spillback_active: bool,
    pub incident_active: bool,
    pub edge_cost: f64,

    /// Monotonic insertion sequence number, used by `get_edge_ids()` to
    /// give algorithms a stable, deterministic iteration order.
    pub insertion_seq: u64,
}

impl Edge {
    /// Create an edge with zero dynamic state (`ensure_edge` default).
    pub fn new_default(from: NodeId, to: NodeId, edge_id: String, insertion_seq: u64) -> Self {
        Self {
            from,
            to,
            edge_id,
            capacity: 0.0,
            free_flow_time: 0.0,
            length: 0.0,
            lane_count: 0,
            current_queue: 0.0,
            current_delay: 0.0,
            current_flow: 0.0,
            spillback_active: false,
            incident_active: false,
            edge_cost: 0.0,
            insertion_seq,
        }
    }

    pub fn key(&self) -> EdgeKey {
        EdgeKey::new(self.from.clone(), self.to.clone())
    }
}
