//! The MAPE-K cycle driver (§4.7): `MONITOR -> ANALYZE -> PLAN -> EXECUTE
//! -> METRICS -> REWARD_UPDATE -> SLEEP`, repeated until a stop condition
//! fires. The control task is logically single-threaded: every stage
//! within a cycle runs to completion before the next starts, so no
//! cross-stage race can occur on the shared Runtime Graph (§5).

use std::time::{Duration, Instant};

use tokio::sync::watch;
use tracing::{info, warn};

use traffic_analyzer::Analyzer;
use traffic_common::config::ControllerConfig;
use traffic_common::graph::RuntimeGraph;
use traffic_executor::Executor;
use traffic_kb::{BanditArm, KnowledgeBase, PerformanceMetrics};
use traffic_monitor::Monitor;
use traffic_planner::{bandit, Adaptation, Planner};
use traffic_sim_client::SimClient;

/// Reward-feedback spillback penalty (§4.5): distinct from the richer
/// `UtilityWeights` the Executor's rollback manager uses (§9 Open
/// Question a) — the bandit reward stays the plain `-cost - 10*spillbacks`
/// formula the spec gives verbatim.
const REWARD_SPILLBACK_PENALTY: f64 = 10.0;

/// Drives the closed MAPE-K loop over one Runtime Graph / Knowledge Base
/// pair. Constructed once per process; stages are owned, not global, so
/// tests can build independent controllers (§9).
pub struct LoopController {
    config: ControllerConfig,
    graph: RuntimeGraph,
    kb: KnowledgeBase,
    sim: SimClient,
    monitor: Monitor,
    analyzer: Analyzer,
    planner: Planner,
    executor: Executor,
    cycle: i64,
    /// Arms pulled by the previous cycle's Planner in normal (non-incident)
    /// mode; updated with this cycle's reward at the REWARD_UPDATE step.
    pending_pulls: Vec<Adaptation>,
    stop_tx: watch::Sender<bool>,
    stop_rx: watch::Receiver<bool>,
}

impl LoopController {
    pub fn new(config: ControllerConfig, graph: RuntimeGraph, kb: KnowledgeBase, sim: SimClient, bandit_seed: u64) -> Self {
        let monitor = Monitor::new(config.rolling_window_size, config.high_congestion_threshold);
        let analyzer = Analyzer::new();
        let planner = Planner::new(bandit_seed);
        let executor = Executor::new(config.rollback_window_size);
        let (stop_tx, stop_rx) = watch::channel(false);
        Self {
            config,
            graph,
            kb,
            sim,
            monitor,
            analyzer,
            planner,
            executor,
            cycle: 0,
            pending_pulls: Vec::new(),
            stop_tx,
            stop_rx,
        }
    }

    pub fn cycle(&self) -> i64 {
        self.cycle
    }

    /// A handle other tasks can use to request a graceful stop — the
    /// "explicit stop signal" distinct from a user interrupt (§6.5).
    pub fn stop_handle(&self) -> watch::Sender<bool> {
        self.stop_tx.clone()
    }

    fn stop_requested(&self) -> bool {
        *self.stop_rx.borrow()
    }

    /// Run cycles until a stop signal, `max_cycles`, or `max_duration` is
    /// reached. `max_duration` bounds wall time regardless of cycle
    /// boundary; `max_cycles` counts completed cycles (§6.5).
    pub async fn run(&mut self, max_cycles: Option<u64>, max_duration: Option<Duration>) {
        let stop_tx = self.stop_tx.clone();
        tokio::spawn(async move {
            if tokio::signal::ctrl_c().await.is_ok() {
                info!("[loop] user interrupt received");
                let _ = stop_tx.send(true);
            }
        });

        let started = Instant::now();
        let mut completed: u64 = 0;

        loop {
            if self.stop_requested() {
                info!("[loop] stop signal observed, shutting down");
                break;
            }
            if let Some(max) = max_cycles {
                if completed >= max {
                    info!("[loop] reached max_cycles={max}, shutting down");
                    break;
                }
            }
            if let Some(max) = max_duration {
                if started.elapsed() >= max {
                    info!("[loop] reached max_duration={max:?}, shutting down");
                    break;
                }
            }

            self.run_cycle().await;
            completed += 1;
        }

        self.shutdown().await;
    }

    /// One `MONITOR -> ANALYZE -> PLAN -> EXECUTE -> METRICS ->
    /// REWARD_UPDATE -> SLEEP` pass. The cancellation signal is observed
    /// at the start of each stage (§5); a signal raised mid-stage is
    /// honoured at the next boundary rather than aborting an in-flight
    /// apply.
    async fn run_cycle(&mut self) {
        let cycle_start = Instant::now();
        self.cycle += 1;
        let cycle = self.cycle;

        if self.stop_requested() {
            return;
        }
        let monitor_output = self.monitor.execute(cycle, &self.graph, &self.kb, &self.sim).await;

        if self.stop_requested() {
            return;
        }
        let analyzer_output = self
            .analyzer
            .execute(cycle, &monitor_output, &self.graph, &self.kb, &self.config)
            .await;

        if self.stop_requested() {
            return;
        }
        let planner_output = self
            .planner
            .execute(cycle, &analyzer_output, &self.graph, &self.kb, &self.config)
            .await;

        if self.stop_requested() {
            return;
        }
        let executor_output = self
            .executor
            .execute(
                cycle,
                monitor_output.timestamp,
                &planner_output,
                &self.graph,
                &self.kb,
                &self.sim,
                &self.config,
            )
            .await;

        // REWARD_UPDATE: the previous cycle's bandit pulls are scored
        // against this cycle's observed metrics, since their consequence
        // only shows up one cycle later (§4.5).
        self.apply_reward_feedback(&executor_output.metrics).await;
        self.pending_pulls = planner_output
            .adaptations
            .iter()
            .filter(|a| !a.is_incident_mode)
            .cloned()
            .collect();

        let elapsed = cycle_start.elapsed();
        let period = Duration::from_secs(self.config.cycle_period_seconds);
        if elapsed > period {
            let overrun = elapsed - period;
            warn!("[loop] cycle {cycle} overran its {period:?} period by {overrun:?}");
            self.kb
                .log_cycle_event(
                    cycle,
                    "loop",
                    &serde_json::json!({ "event": "overrun", "elapsed_ms": elapsed.as_millis(), "overrun_ms": overrun.as_millis() }),
                )
                .await;
        } else {
            tokio::time::sleep(period - elapsed).await;
        }
    }

    /// `reward = -network_cost - 10 * spillback_count`, applied to every
    /// `(intersection, plan)` arm the previous cycle's Planner pulled in
    /// normal mode (§4.5, §8 property 2).
    async fn apply_reward_feedback(&self, metrics: &PerformanceMetrics) {
        if self.pending_pulls.is_empty() {
            return;
        }
        let reward = -metrics.network_cost - REWARD_SPILLBACK_PENALTY * metrics.total_spillbacks as f64;
        for adaptation in &self.pending_pulls {
            let arm = self
                .kb
                .get_bandit_stats(&adaptation.intersection_id, &adaptation.plan_id)
                .await
                .unwrap_or_else(BanditArm::unseen);
            let updated = bandit::update_arm(arm, reward);
            self.kb
                .update_bandit_stats(&adaptation.intersection_id, &adaptation.plan_id, updated)
                .await;
        }
    }

    async fn shutdown(&self) {
        self.kb
            .log_cycle_event(self.cycle, "loop", &serde_json::json!({ "event": "shutdown" }))
            .await;
        info!("[loop] shutdown complete after {} cycles", self.cycle);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_common::config::CostCoefficients;
    use traffic_common::topology::reference_network;

    async fn test_controller(max_cycles_config: &ControllerConfig) -> LoopController {
        let graph = reference_network();
        let kb = KnowledgeBase::connect_in_memory(CostCoefficients::default()).await.unwrap();
        for id in ["A", "B", "C", "D", "E"] {
            for plan in traffic_planner::phase_library::default_plans(id) {
                kb.seed_phase_library_entry(&plan).await.unwrap();
            }
        }
        let sim = SimClient::new("http://127.0.0.1:0".to_string());
        LoopController::new(max_cycles_config.clone(), graph, kb, sim, 7)
    }

    #[tokio::test]
    async fn stops_after_max_cycles_even_with_unreachable_simulator() {
        let mut config = ControllerConfig::default();
        config.cycle_period_seconds = 1;
        let mut controller = test_controller(&config).await;
        controller.run(Some(2), None).await;
        assert_eq!(controller.cycle(), 2);
    }

    #[tokio::test]
    async fn stops_after_max_duration() {
        let mut config = ControllerConfig::default();
        config.cycle_period_seconds = 1;
        let mut controller = test_controller(&config).await;
        controller.run(None, Some(Duration::from_millis(10))).await;
        assert!(controller.cycle() >= 1);
    }

    #[tokio::test]
    async fn stop_handle_halts_the_loop() {
        let mut config = ControllerConfig::default();
        config.cycle_period_seconds = 1;
        let mut controller = test_controller(&config).await;
        let stop_tx = controller.stop_handle();
        let _ = stop_tx.send(true);
        controller.run(Some(100), None).await;
        assert_eq!(controller.cycle(), 0);
    }

    #[tokio::test]
    async fn a_failed_collection_never_panics_the_cycle() {
        let mut config = ControllerConfig::default();
        config.cycle_period_seconds = 1;
        let mut controller = test_controller(&config).await;
        controller.run(Some(1), None).await;
        assert_eq!(controller.cycle(), 1);
    }
}
