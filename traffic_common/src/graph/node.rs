use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use super::edge::EdgeKey;

/// Opaque intersection identifier (`"A"`, `"1"`, ...).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct NodeId(pub String);

impl NodeId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for NodeId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<&str> for NodeId {
    fn from(s: &str) -> Self {
        Self(s.to_string())
    }
}

impl From<String> for NodeId {
    fn from(s: String) -> Self {
        Self(s)
    }
}

/// An intersection's kind. Tagged at creation, never changes (§4.1).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum NodeKind {
    /// Receives plan decisions from the Planner/Executor.
    Signalised,
    /// Traffic origin/sink; never actuated.
    Virtual,
}

impl NodeKind {
    pub fn is_signalised(self) -> bool {
        matches!(self, NodeKind::Signalised)
    }
}

/// An intersection node.
///
/// Mutated only by the Monitor (congestion/spillback flags) and the
/// Executor (current plan/offset/cycle length).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Node {
    pub id: NodeId,
    pub kind: NodeKind,
    pub current_plan_id: Option<String>,
    pub current_offset: f64,
    pub current_cycle_length: f64,
    pub incoming: HashSet<EdgeKey>,
    pub outgoing: HashSet<EdgeKey>,
    pub is_congested: bool,
    pub has_spillback: bool,
}

impl Node {
    pub fn new(id: NodeId, kind: NodeKind) -> Self {
        Self {
            id,
            kind,
            current_plan_id: None,
            current_offset: 0.0,
            current_cycle_length: 0.0,
            incoming: HashSet::new(),
            outgoing: HashSet::new(),
            is_congested: false,
            has_spillback: false,
        }
    }
}
