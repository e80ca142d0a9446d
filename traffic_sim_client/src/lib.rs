//! HTTP client for the simulator adapter (§6.1).

pub mod client;
pub mod error;
pub mod models;

pub use client::SimClient;
pub use error::SimClientError;
pub use models::{EdgeObservation, PlanRequest, PlanResponse, RawSnapshot, Snapshot};
