use thiserror::Error;

/// Initialisation failures are the only errors fatal to the process
/// (§6.5 exit code 1 — database invalid, config unreadable).
#[derive(Debug, Error)]
pub enum ControllerError {
    #[error("configuration error: {0}")]
    Config(#[from] traffic_common::config::ConfigError),
    #[error("knowledge base error: {0}")]
    Kb(#[from] traffic_kb::KbError),
}
