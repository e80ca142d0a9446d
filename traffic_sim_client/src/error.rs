use thiserror::Error;

#[derive(Debug, Error)]
pub enum SimClientError {
    #[error("simulator request failed after retries: {0}")]
    Request(#[from] reqwest::Error),
    #[error("simulator returned malformed payload: {0}")]
    Decode(String),
    #[error("simulator reported an unsuccessful plan application for intersection {0}")]
    PlanRejected(String),
}
