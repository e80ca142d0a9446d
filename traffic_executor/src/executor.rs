//! Executor stage orchestrator (§4.6): validate -> apply -> metrics ->
//! degradation check -> optional rollback.

use std::collections::HashMap;

use tracing::{info, warn};

use traffic_common::config::ControllerConfig;
use traffic_common::graph::RuntimeGraph;
use traffic_kb::KnowledgeBase;
use traffic_planner::PlannerOutput;
use traffic_sim_client::SimClient;

use crate::apply::apply_adaptations;
use crate::metrics::compute_metrics;
use crate::rollback::{rollback_to_last_known_good, utility, RollbackTracker};
use crate::types::ExecutorOutput;
use crate::validation::validate_batch;

pub struct Executor {
    rollback: RollbackTracker,
}

impl Executor {
    pub fn new(rollback_window_size: usize) -> Self {
        Self {
            rollback: RollbackTracker::new(rollback_window_size),
        }
    }

    pub async fn execute(
        &mut self,
        cycle: i64,
        timestamp: f64,
        planner_output: &PlannerOutput,
        graph: &RuntimeGraph,
        kb: &KnowledgeBase,
        sim: &SimClient,
        config: &ControllerConfig,
    ) -> ExecutorOutput {
        let snapshot = graph.snapshot();

        let mut libraries = HashMap::new();
        for adaptation in &planner_output.adaptations {
            if !libraries.contains_key(&adaptation.intersection_id) {
                let entries = kb.get_phase_library(&adaptation.intersection_id).await;
                libraries.insert(adaptation.intersection_id.clone(), entries);
            }
        }

        if let Err(e) = validate_batch(&planner_output.adaptations, &snapshot, &libraries) {
            warn!("adaptation batch rejected at cycle {cycle}: {e}");
            kb.log_decision(
                cycle,
                "execute",
                "batch_rejected",
                &serde_json::json!({ "reason": e.to_string() }),
                &serde_json::json!({ "num_adaptations": planner_output.adaptations.len() }),
            )
            .await;
            let metrics = compute_metrics(&snapshot, None);
            return ExecutorOutput {
                cycle,
                applied: Vec::new(),
                rolled_back: false,
                metrics,
            };
        }

        let (results, applied_configurations) =
            apply_adaptations(&planner_output.adaptations, graph, sim).await;

        kb.update_last_known_good(cycle, &applied_configurations).await;

        let post_apply_snapshot = graph.snapshot();
        let metrics = compute_metrics(&post_apply_snapshot, None);
        kb.insert_performance_metrics(cycle, timestamp, &metrics).await;

        let mut rolled_back = false;
        if config.enable_rollback {
            let u = utility(&metrics, &config.utility_weights);
            if self
                .rollback
                .record_and_check(u, config.performance_degradation_threshold)
            {
                warn!("performance degradation detected at cycle {cycle}, rolling back to last-known-good");
                let signalised: Vec<String> = post_apply_snapshot
                    .signalised_node_ids()
                    .into_iter()
                    .map(|id| id.as_str().to_string())
                    .collect();
                let (rolled_configs, errors) =
                    rollback_to_last_known_good(&signalised, graph, kb, sim).await;
                for e in &errors {
                    warn!("rollback skipped an intersection: {e}");
                }
                if !rolled_configs.is_empty() {
                    kb.update_last_known_good(cycle, &rolled_configs).await;
                    rolled_back = true;
                }
                kb.log_cycle_event(
                    cycle,
                    "rollback",
                    &serde_json::json!({
                        "utility": u,
                        "rolled_back_count": rolled_configs.len(),
                        "errors": errors.iter().map(|e| e.to_string()).collect::<Vec<_>>(),
                    }),
                )
                .await;
            }
        }

        info!(
            "[executor] cycle {cycle}: applied {}/{} adaptations, rolled_back={rolled_back}",
            results.iter().filter(|r| r.success).count(),
            results.len()
        );

        ExecutorOutput {
            cycle,
            applied: results,
            rolled_back,
            metrics,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_common::config::{ControllerConfig, CostCoefficients};
    use traffic_common::graph::{NodeId, NodeKind};
    use traffic_kb::PhaseLibraryEntry;
    use traffic_planner::Adaptation;

    async fn test_kb() -> KnowledgeBase {
        KnowledgeBase::connect_in_memory(CostCoefficients::default())
            .await
            .unwrap()
    }

    fn graph_with_one_signalised() -> RuntimeGraph {
        let g = RuntimeGraph::new();
        g.add_node(NodeId::new("A"), NodeKind::Signalised);
        g
    }

    #[tokio::test]
    async fn rejects_batch_when_plan_unknown_and_applies_nothing() {
        let graph = graph_with_one_signalised();
        let kb = test_kb().await;
        let sim = SimClient::new("http://127.0.0.1:0".to_string());
        let mut executor = Executor::new(5);
        let output = PlannerOutput {
            cycle: 1,
            adaptations: vec![Adaptation {
                intersection_id: "A".to_string(),
                plan_id: "missing_plan".to_string(),
                phase_id: 0,
                offset: 0.0,
                cycle_length: 60.0,
                is_incident_mode: false,
            }],
            is_incident_mode: false,
            num_intersections: 1,
        };
        let config = ControllerConfig::default();
        let result = executor
            .execute(1, 0.0, &output, &graph, &kb, &sim, &config)
            .await;
        assert!(result.applied.is_empty());
        assert!(!result.rolled_back);
    }

    #[test]
    fn phase_library_entries_are_unused_placeholder_for_empty_adaptations() {
        // Sanity: an empty adaptation set trivially validates.
        let libraries: HashMap<String, Vec<PhaseLibraryEntry>> = HashMap::new();
        let snapshot = RuntimeGraph::new().snapshot();
        assert!(validate_batch(&[], &snapshot, &libraries).is_ok());
    }
}
