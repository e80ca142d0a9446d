//! Supervisor binary: wires one Runtime Graph, one Knowledge Base, the
//! simulator HTTP client, and the four MAPE stages into a single Loop
//! Controller, then runs it to completion or interrupt (§4.7, §6.5).

use std::time::{Duration, SystemTime, UNIX_EPOCH};

use clap::Parser;
use tracing_subscriber::EnvFilter;

use traffic_common::config::ControllerConfig;
use traffic_common::topology::reference_network;
use traffic_controller::cli::Args;
use traffic_controller::error::ControllerError;
use traffic_controller::loop_controller::LoopController;
use traffic_controller::seed::seed_phase_libraries;
use traffic_kb::KnowledgeBase;
use traffic_sim_client::SimClient;

#[tokio::main]
async fn main() {
    let args = Args::parse();
    init_tracing(args.verbose, args.json);

    match run(args).await {
        Ok(()) => std::process::exit(0),
        Err(e) => {
            tracing::error!("initialisation failed: {e}");
            std::process::exit(1);
        }
    }
}

/// §6.5: exit code 1 is reserved for initialisation failure (database
/// invalid, config unreadable) — everything past this point degrades
/// gracefully instead of crashing the process (§7).
async fn run(args: Args) -> Result<(), ControllerError> {
    let config = match &args.config {
        Some(path) => ControllerConfig::load(path)?,
        None => ControllerConfig::default(),
    };

    let graph = reference_network();
    let kb = KnowledgeBase::connect(&config.database_url, config.cost_coefficients).await?;
    seed_phase_libraries(&graph, &kb).await;
    let sim = SimClient::new(config.simulator_base_url.clone());

    let seed = args.seed.unwrap_or_else(time_derived_seed);
    let max_duration = args.max_duration_secs.map(Duration::from_secs);

    let mut controller = LoopController::new(config, graph, kb, sim, seed);
    controller.run(args.max_cycles, max_duration).await;
    Ok(())
}

fn time_derived_seed() -> u64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_nanos() as u64)
        .unwrap_or(42)
}

fn init_tracing(verbose: bool, json: bool) {
    let level = if verbose { "debug" } else { "info" };
    let filter = || EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    if json {
        tracing_subscriber::fmt().with_env_filter(filter()).json().init();
    } else {
        tracing_subscriber::fmt().with_env_filter(filter()).init();
    }
}
