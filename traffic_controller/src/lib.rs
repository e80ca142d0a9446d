//! Loop Controller crate (§4.7): cycle cadence, stage sequencing, reward
//! feedback, and the binary entry point that wires every MAPE-K stage to
//! one shared Runtime Graph and Knowledge Base.

pub mod cli;
pub mod error;
pub mod loop_controller;
pub mod seed;

pub use error::ControllerError;
pub use loop_controller::LoopController;
