use thiserror::Error;

#[derive(Debug, Error)]
pub enum AnalyzerError {
    #[error("graph update failed: {0}")]
    Graph(#[from] traffic_common::graph::GraphError),
}
