use thiserror::Error;

#[derive(Debug, Error)]
pub enum PlannerError {
    #[error("no phase library entries for intersection {0}")]
    EmptyLibrary(String),
}
