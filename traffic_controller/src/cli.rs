use std::path::PathBuf;

use clap::Parser;

/// Self-adaptive traffic-signal MAPE-K controller.
#[derive(Parser, Debug)]
#[command(name = "traffic_controller")]
#[command(author = "RTS007")]
#[command(version)]
#[command(about = "Monitor-Analyze-Plan-Execute loop over a simulated road network")]
#[command(long_about = None)]
pub struct Args {
    /// Path to a TOML configuration file. Missing options fall back to
    /// the documented defaults (§6).
    #[arg(short, long)]
    pub config: Option<PathBuf>,

    /// Stop after this many seconds, regardless of cycle boundary.
    #[arg(long)]
    pub max_duration_secs: Option<u64>,

    /// Stop after this many completed cycles.
    #[arg(long)]
    pub max_cycles: Option<u64>,

    /// Enable verbose (DEBUG) logging.
    #[arg(short, long)]
    pub verbose: bool,

    /// Output logs in JSON format.
    #[arg(long)]
    pub json: bool,

    /// Seed the Planner's bandit exploration RNG deterministically
    /// (useful for reproducing a run); a time-derived seed is used when
    /// omitted.
    #[arg(long)]
    pub seed: Option<u64>,
}
