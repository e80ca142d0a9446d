//! The Runtime Graph: one instance per process, shared by every MAPE stage.
//!
//! Mutations are serialised by a single exclusive lock (`parking_lot::RwLock`);
//! concurrent readers are permitted between writes. Long algorithms (e.g.
//! k-shortest-path search) must operate on a [`GraphSnapshot`] rather than
//! hold the lock, so they never block the control task across simulator I/O
//! (§5).

use parking_lot::RwLock;
use std::collections::HashMap;
use thiserror::Error;

use super::edge::{Edge, EdgeKey};
use super::node::{Node, NodeId, NodeKind};

#[derive(Debug, Error)]
pub enum GraphError {
    #[error("node not found: {0}")]
    NodeNotFound(NodeId),
    #[error("edge not found: {from} -> {to}", from = .0.from, to = .0.to)]
    EdgeNotFound(EdgeKey),
    #[error("dynamic attribute must be non-negative: {field} = {value}")]
    NegativeAttribute { field: &'static str, value: f64 },
    #[error("only signalised intersections may be actuated: {0}")]
    NotSignalised(NodeId),
}

struct GraphInner {
    nodes: HashMap<NodeId, Node>,
    edges: HashMap<EdgeKey, Edge>,
    next_seq: u64,
}

impl GraphInner {
    fn new() -> Self {
        Self {
            nodes: HashMap::new(),
            edges: HashMap::new(),
            next_seq: 0,
        }
    }
}

/// A point-in-time, lock-free copy of the graph, suitable for
/// serialisation and for algorithms that must not hold the write lock.
#[derive(Debug, Clone)]
pub struct GraphSnapshot {
    pub nodes: HashMap<NodeId, Node>,
    pub edges: HashMap<EdgeKey, Edge>,
}

impl GraphSnapshot {
    pub fn get_edge(&self, from: &NodeId, to: &NodeId) -> Option<&Edge> {
        self.edges.get(&EdgeKey::new(from.clone(), to.clone()))
    }

    pub fn get_node(&self, id: &NodeId) -> Option<&Node> {
        self.nodes.get(id)
    }

    /// Stable edge ordering: by insertion sequence, for deterministic
    /// algorithms (k-shortest-path, hotspot tie-breaking).
    pub fn get_edge_ids(&self) -> Vec<EdgeKey> {
        let mut ids: Vec<&Edge> = self.edges.values().collect();
        ids.sort_by_key(|e| e.insertion_seq);
        ids.into_iter().map(|e| e.key()).collect()
    }

    pub fn signalised_node_ids(&self) -> Vec<NodeId> {
        let mut ids: Vec<NodeId> = self
            .nodes
            .values()
            .filter(|n| n.kind.is_signalised())
            .map(|n| n.id.clone())
            .collect();
        ids.sort();
        ids
    }
}

/// The one process-wide Runtime Graph instance.
///
/// Dependency-injected into every stage (§9) rather than a global; tests
/// construct their own instance.
pub struct RuntimeGraph {
    inner: RwLock<GraphInner>,
}

impl RuntimeGraph {
    pub fn new() -> Self {
        Self {
            inner: RwLock::new(GraphInner::new()),
        }
    }

    pub fn add_node(&self, id: NodeId, kind: NodeKind) {
        let mut g = self.inner.write();
        g.nodes.entry(id.clone()).or_insert_with(|| Node::new(id, kind));
    }

    pub fn get_node(&self, id: &NodeId) -> Option<Node> {
        self.inner.read().nodes.get(id).cloned()
    }

    /// Add an edge with explicit static attributes. Idempotent: re-adding
    /// an existing edge updates its static attributes in place.
    pub fn add_edge(
        &self,
        from: NodeId,
        to: NodeId,
        edge_id: String,
        capacity: f64,
        free_flow_time: f64,
        length: f64,
        lane_count: u32,
    ) {
        let mut g = self.inner.write();
        let key = EdgeKey::new(from.clone(), to.clone());
        if !g.edges.contains_key(&key) {
            let seq = g.next_seq;
            g.next_seq += 1;
            g.edges.insert(
                key.clone(),
                Edge::new_default(from.clone(), to.clone(), edge_id.clone(), seq),
            );
        }
        let entry = g.edges.get_mut(&key).expect("just ensured");
        entry.edge_id = edge_id;
        entry.capacity = capacity;
        entry.free_flow_time = free_flow_time;
        entry.length = length;
        entry.lane_count = lane_count;

        link_endpoints(&mut g.nodes, &key);
    }

    /// Idempotent creation with zero defaults (Monitor's lazy-create path).
    pub fn ensure_edge(&self, from: NodeId, to: NodeId) -> EdgeKey {
        let mut g = self.inner.write();
        let key = EdgeKey::new(from.clone(), to.clone());
        if !g.edges.contains_key(&key) {
            let seq = g.next_seq;
            g.next_seq += 1;
            let edge_id = format!("{}{}", from.as_str(), to.as_str());
            g.edges
                .insert(key.clone(), Edge::new_default(from, to, edge_id, seq));
        }
        link_endpoints(&mut g.nodes, &key);
        key
    }

    pub fn get_edge(&self, from: &NodeId, to: &NodeId) -> Option<Edge> {
        self.inner
            .read()
            .edges
            .get(&EdgeKey::new(from.clone(), to.clone()))
            .cloned()
    }

    pub fn get_neighbors(&self, id: &NodeId) -> Vec<NodeId> {
        let g = self.inner.read();
        match g.nodes.get(id) {
            Some(n) => n.outgoing.iter().map(|k| k.to.clone()).collect(),
            None => Vec::new(),
        }
    }

    /// Update dynamic attributes for an edge, ensuring the edge exists.
    /// Rejects negative values (§3 invariant).
    pub fn update_edge_dynamic(
        &self,
        from: &NodeId,
        to: &NodeId,
        queue: f64,
        delay: f64,
        flow: f64,
        spillback: bool,
        incident: bool,
    ) -> Result<(), GraphError> {
        if queue < 0.0 {
            return Err(GraphError::NegativeAttribute {
                field: "queue",
                value: queue,
            });
        }
        if delay < 0.0 {
            return Err(GraphError::NegativeAttribute {
                field: "delay",
                value: delay,
            });
        }
        if flow < 0.0 {
            return Err(GraphError::NegativeAttribute {
                field: "flow",
                value: flow,
            });
        }

        let mut g = self.inner.write();
        let key = EdgeKey::new(from.clone(), to.clone());
        let seq = g.next_seq;
        if !g.edges.contains_key(&key) {
            g.next_seq += 1;
            let edge_id = format!("{}{}", from.as_str(), to.as_str());
            g.edges.insert(
                key.clone(),
                Edge::new_default(from.clone(), to.clone(), edge_id, seq),
            );
        }
        link_endpoints(&mut g.nodes, &key);

        let edge = g.edges.get_mut(&key).expect("just ensured");
        edge.current_queue = queue;
        edge.current_delay = delay;
        edge.current_flow = flow;
        edge.spillback_active = spillback;
        edge.incident_active = incident;
        Ok(())
    }

    /// Write the Analyzer's computed cost back onto the edge.
    pub fn set_edge_cost(&self, from: &NodeId, to: &NodeId, cost: f64) -> Result<(), GraphError> {
        let mut g = self.inner.write();
        let key = EdgeKey::new(from.clone(), to.clone());
        let edge = g
            .edges
            .get_mut(&key)
            .ok_or_else(|| GraphError::EdgeNotFound(key.clone()))?;
        edge.edge_cost = cost;
        Ok(())
    }

    /// Apply an Executor decision: current plan/offset/cycle-length.
    /// Only signalised intersections may be actuated (§3 invariant).
    pub fn apply_plan(
        &self,
        id: &NodeId,
        plan_id: String,
        offset: f64,
        cycle_length: f64,
    ) -> Result<(), GraphError> {
        let mut g = self.inner.write();
        let node = g
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        if !node.kind.is_signalised() {
            return Err(GraphError::NotSignalised(id.clone()));
        }
        node.current_plan_id = Some(plan_id);
        node.current_offset = offset;
        node.current_cycle_length = cycle_length;
        Ok(())
    }

    pub fn set_congestion_flags(
        &self,
        id: &NodeId,
        is_congested: bool,
        has_spillback: bool,
    ) -> Result<(), GraphError> {
        let mut g = self.inner.write();
        let node = g
            .nodes
            .get_mut(id)
            .ok_or_else(|| GraphError::NodeNotFound(id.clone()))?;
        node.is_congested = is_congested;
        node.has_spillback = has_spillback;
        Ok(())
    }

    /// Return a point-in-time, lock-free copy of the graph.
    pub fn snapshot(&self) -> GraphSnapshot {
        let g = self.inner.read();
        GraphSnapshot {
            nodes: g.nodes.clone(),
            edges: g.edges.clone(),
        }
    }

    pub fn get_edge_ids(&self) -> Vec<EdgeKey> {
        self.snapshot().get_edge_ids()
    }
}

impl Default for RuntimeGraph {
    fn default() -> Self {
        Self::new()
    }
}

fn link_endpoints(nodes: &mut HashMap<NodeId, Node>, key: &EdgeKey) {
    nodes
        .entry(key.from.clone())
        .or_insert_with(|| Node::new(key.from.clone(), NodeKind::Virtual))
        .outgoing
        .insert(key.clone());
    nodes
        .entry(key.to.clone())
        .or_insert_with(|| Node::new(key.to.clone(), NodeKind::Virtual))
        .incoming
        .insert(key.clone());
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn ensure_edge_is_idempotent_with_zero_defaults() {
        let g = RuntimeGraph::new();
        let a = NodeId::new("A");
        let b = NodeId::new("B");
        g.ensure_edge(a.clone(), b.clone());
        g.ensure_edge(a.clone(), b.clone());
        let snap = g.snapshot();
        assert_eq!(snap.edges.len(), 1);
        let edge = snap.get_edge(&a, &b).unwrap();
        assert_eq!(edge.current_queue, 0.0);
    }

    #[test]
    fn update_edge_dynamic_rejects_negative_values() {
        let g = RuntimeGraph::new();
        let a = NodeId::new("A");
        let b = NodeId::new("B");
        let err = g
            .update_edge_dynamic(&a, &b, -1.0, 0.0, 0.0, false, false)
            .unwrap_err();
        assert!(matches!(err, GraphError::NegativeAttribute { .. }));
    }

    #[test]
    fn apply_plan_rejects_virtual_nodes() {
        let g = RuntimeGraph::new();
        let v = NodeId::new("1");
        g.add_node(v.clone(), NodeKind::Virtual);
        let err = g
            .apply_plan(&v, "plan_a".to_string(), 0.0, 60.0)
            .unwrap_err();
        assert!(matches!(err, GraphError::NotSignalised(_)));
    }

    #[test]
    fn get_edge_ids_is_stable_insertion_order() {
        let g = RuntimeGraph::new();
        g.ensure_edge(NodeId::new("A"), NodeId::new("B"));
        g.ensure_edge(NodeId::new("B"), NodeId::new("C"));
        g.ensure_edge(NodeId::new("A"), NodeId::new("C"));
        let ids = g.get_edge_ids();
        assert_eq!(
            ids,
            vec![
                EdgeKey::new(NodeId::new("A"), NodeId::new("B")),
                EdgeKey::new(NodeId::new("B"), NodeId::new("C")),
                EdgeKey::new(NodeId::new("A"), NodeId::new("C")),
            ]
        );
    }

    #[test]
    fn upsert_preserves_static_fields_on_re_add() {
        let g = RuntimeGraph::new();
        let a = NodeId::new("A");
        let b = NodeId::new("B");
        g.add_edge(a.clone(), b.clone(), "AB".into(), 100.0, 20.0, 500.0, 2);
        g.update_edge_dynamic(&a, &b, 5.0, 1.0, 2.0, false, false)
            .unwrap();
        g.add_edge(a.clone(), b.clone(), "AB".into(), 100.0, 20.0, 500.0, 2);
        let edge = g.get_edge(&a, &b).unwrap();
        assert_eq!(edge.current_queue, 5.0);
        assert_eq!(edge.capacity, 100.0);
    }

    #[test]
    fn snapshot_is_a_consistent_point_in_time_copy() {
        let g = RuntimeGraph::new();
        g.ensure_edge(NodeId::new("A"), NodeId::new("B"));
        let snap = g.snapshot();
        g.update_edge_dynamic(&NodeId::new("A"), &NodeId::new("B"), 9.0, 1.0, 1.0, false, false)
            .unwrap();
        assert_eq!(snap.get_edge(&NodeId::new("A"), &NodeId::new("B")).unwrap().current_queue, 0.0);
    }
}
