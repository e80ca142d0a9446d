//! The Runtime Graph: a concurrent directed graph of intersections and roads.

mod edge;
mod node;
mod runtime;

pub use edge::{Edge, EdgeKey};
pub use node::{Node, NodeId, NodeKind};
pub use runtime::{GraphError, GraphSnapshot, RuntimeGraph};
