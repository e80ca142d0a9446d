use thiserror::Error;

#[derive(Debug, Error)]
pub enum ExecutorError {
    #[error("adaptation batch rejected: {0}")]
    ValidationFailed(String),
    #[error("rollback requested but no last-known-good configuration exists for {0}")]
    NoLastKnownGood(String),
    #[error("graph update failed: {0}")]
    Graph(#[from] traffic_common::graph::GraphError),
}
