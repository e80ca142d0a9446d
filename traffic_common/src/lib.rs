//! Shared runtime types for the self-adaptive traffic-signal controller.
//!
//! This crate provides the Runtime Graph model, the configuration record
//! every MAPE-K stage is constructed with, and the reference network
//! fixture used by tests and the supervisor binary.
//!
//! # Module Structure
//!
//! - [`graph`] - Runtime Graph: nodes, edges, concurrency-safe storage
//! - [`config`] - `ControllerConfig` and loading
//! - [`topology`] - Reference network fixture (5 signalised + 8 virtual)
//! - [`prelude`] - Common re-exports for convenience

pub mod config;
pub mod graph;
pub mod prelude;
pub mod topology;
