//! Convenient re-exports of the most commonly used types.
//!
//! ```
//! use traffic_common::prelude::*;
//! ```

pub use crate::config::{BanditAlgorithm, ConfigError, ControllerConfig, CostCoefficients, UtilityWeights};
pub use crate::graph::{Edge, EdgeKey, GraphError, GraphSnapshot, Node, NodeId, NodeKind, RuntimeGraph};
