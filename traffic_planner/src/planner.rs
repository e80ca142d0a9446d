//! Planner stage (§4.5): selection set, context vectors, plan selection
//! (bandit / incident mode), phase id extraction, coordination offsets.

use std::collections::HashSet;

use rand::rngs::SmallRng;
use rand::SeedableRng;
use tracing::{info, warn};

use traffic_analyzer::AnalyzerOutput;
use traffic_common::config::{BanditAlgorithm, ControllerConfig};
use traffic_common::graph::RuntimeGraph;
use traffic_kb::{BanditArm, KnowledgeBase};

use crate::bandit::{select_thompson, select_ucb, Candidate};
use crate::context::build_context;
use crate::incident::select_incident_plan;
use crate::offsets::compute_offsets;
use crate::phase_library::phase_id_for_plan;
use crate::types::{Adaptation, PlannerOutput};

pub struct Planner {
    rng: SmallRng,
}

impl Planner {
    pub fn new(seed: u64) -> Self {
        Self {
            rng: SmallRng::seed_from_u64(seed),
        }
    }

    pub async fn execute(
        &mut self,
        cycle: i64,
        analyzer_output: &AnalyzerOutput,
        graph: &RuntimeGraph,
        kb: &KnowledgeBase,
        config: &ControllerConfig,
    ) -> PlannerOutput {
        let snapshot = graph.snapshot();
        let is_incident_mode = config.incident_mode_enabled && !analyzer_output.incidents.is_empty();

        let selection = selection_set(&snapshot, analyzer_output);

        let mut adaptations: Vec<Adaptation> = Vec::new();
        for intersection in &selection {
            let library = kb.get_phase_library(intersection).await;
            if library.is_empty() {
                warn!("[planner] no phase library for {intersection}; skipping");
                continue;
            }

            let _context = build_context(intersection, &snapshot, analyzer_output);

            let chosen = if is_incident_mode {
                select_incident_plan(intersection, &library, &analyzer_output.bypasses, &analyzer_output.incidents)
            } else {
                let mut arms = Vec::with_capacity(library.len());
                for entry in &library {
                    let arm = kb.get_bandit_stats(intersection, &entry.plan_id).await.unwrap_or_else(BanditArm::unseen);
                    arms.push((entry, arm));
                }
                let candidates: Vec<Candidate> = arms
                    .iter()
                    .map(|(entry, arm)| Candidate { plan_id: entry.plan_id.as_str(), arm: *arm })
                    .collect();
                let plan_id = match config.bandit_algorithm {
                    BanditAlgorithm::Ucb => select_ucb(&candidates, config.exploration_factor),
                    BanditAlgorithm::ThompsonSampling => select_thompson(&candidates, &mut self.rng),
                };
                plan_id.and_then(|id| library.iter().find(|e| e.plan_id == id))
            };

            let Some(plan) = chosen else { continue };
            let phase_id = plan.phase_id.unwrap_or_else(|| phase_id_for_plan(&plan.plan_name));

            adaptations.push(Adaptation {
                intersection_id: intersection.clone(),
                plan_id: plan.plan_id.clone(),
                phase_id,
                offset: 0.0,
                cycle_length: plan.cycle_length,
                is_incident_mode,
            });
        }

        if config.coordination_enabled && adaptations.len() >= 2 {
            let planned: HashSet<String> = adaptations.iter().map(|a| a.intersection_id.clone()).collect();
            let offsets = compute_offsets(&analyzer_output.coordination_groups, &snapshot, &planned);
            for adaptation in &mut adaptations {
                if let Some(offset) = offsets.get(&adaptation.intersection_id) {
                    adaptation.offset = *offset;
                }
            }
        }

        let output = PlannerOutput {
            cycle,
            num_intersections: adaptations.len(),
            adaptations,
            is_incident_mode,
        };

        self.log_decision(cycle, kb, &output).await;

        info!(
            "[planner] cycle {cycle}: {} adaptations, incident_mode={}",
            output.num_intersections, output.is_incident_mode
        );

        output
    }

    async fn log_decision(&self, cycle: i64, kb: &KnowledgeBase, output: &PlannerOutput) {
        let reasoning = serde_json::json!({
            "is_incident_mode": output.is_incident_mode,
            "num_intersections": output.num_intersections,
        });
        let context = serde_json::json!({
            "plan_ids": output.adaptations.iter().map(|a| a.plan_id.clone()).collect::<Vec<_>>(),
        });
        kb.log_decision(cycle, "plan", "signal_timing_selection", &reasoning, &context).await;
    }
}

/// Selection set (§4.5): `affected_intersections` plus coordination-group
/// members plus incident `from` endpoints, restricted to signalised nodes;
/// falls back to every signalised intersection if empty. Virtual nodes are
/// never planned.
fn selection_set(snapshot: &traffic_common::graph::GraphSnapshot, analyzer_output: &AnalyzerOutput) -> Vec<String> {
    let signalised: HashSet<String> = snapshot.signalised_node_ids().into_iter().map(|id| id.to_string()).collect();

    let mut seen = HashSet::new();
    let mut ordered = Vec::new();
    let mut push = |id: &str, seen: &mut HashSet<String>, ordered: &mut Vec<String>| {
        if signalised.contains(id) && seen.insert(id.to_string()) {
            ordered.push(id.to_string());
        }
    };

    for id in &analyzer_output.targets.affected_intersections {
        push(id, &mut seen, &mut ordered);
    }
    for group in &analyzer_output.coordination_groups {
        for id in &group.intersections {
            push(id, &mut seen, &mut ordered);
        }
    }
    for incident in &analyzer_output.incidents {
        push(&incident.from, &mut seen, &mut ordered);
    }

    if ordered.is_empty() {
        let mut fallback: Vec<String> = signalised.into_iter().collect();
        fallback.sort();
        return fallback;
    }
    ordered
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_common::config::CostCoefficients;
    use traffic_common::topology::reference_network;

    async fn test_kb() -> KnowledgeBase {
        KnowledgeBase::connect_in_memory(CostCoefficients::default()).await.unwrap()
    }

    async fn seed_library(kb: &KnowledgeBase, intersections: &[&str]) {
        for id in intersections {
            for entry in crate::phase_library::default_plans(id) {
                kb.seed_phase_library_entry(&entry).await.unwrap();
            }
        }
    }

    #[tokio::test]
    async fn empty_selection_falls_back_to_all_signalised() {
        let graph = reference_network();
        let kb = test_kb().await;
        seed_library(&kb, &["A", "B", "C", "D", "E"]).await;
        let config = ControllerConfig::default();
        let mut planner = Planner::new(1);

        let output = planner.execute(1, &AnalyzerOutput::default(), &graph, &kb, &config).await;

        assert_eq!(output.num_intersections, 5);
        assert!(!output.is_incident_mode);
    }

    #[tokio::test]
    async fn incident_forces_incident_mode_and_skips_bandit() {
        let graph = reference_network();
        let kb = test_kb().await;
        seed_library(&kb, &["B"]).await;
        let config = ControllerConfig::default();
        let mut planner = Planner::new(1);

        let mut output_in = AnalyzerOutput::default();
        output_in.incidents.push(traffic_analyzer::Incident {
            from: "B".into(),
            to: "D".into(),
            queue: 70.0,
            delay: 35.0,
            severity: traffic_analyzer::Severity::High,
        });
        output_in.targets.affected_intersections.push("B".to_string());

        let output = planner.execute(1, &output_in, &graph, &kb, &config).await;
        assert!(output.is_incident_mode);
        assert_eq!(output.adaptations[0].intersection_id, "B");
        assert_eq!(output.adaptations[0].plan_id, "B_balanced");
    }

    #[tokio::test]
    async fn coordination_assigns_zero_offset_to_first_group_member() {
        let graph = reference_network();
        let kb = test_kb().await;
        seed_library(&kb, &["A", "C", "E"]).await;
        let config = ControllerConfig::default();
        let mut planner = Planner::new(1);

        let mut output_in = AnalyzerOutput::default();
        output_in.targets.affected_intersections = vec!["A".into(), "C".into(), "E".into()];
        output_in.coordination_groups.push(traffic_analyzer::CoordinationGroup {
            intersections: vec!["A".into(), "C".into(), "E".into()],
            size: 3,
            representative: "A".into(),
        });

        let output = planner.execute(1, &output_in, &graph, &kb, &config).await;
        let first = output.adaptations.iter().find(|a| a.intersection_id == "A").unwrap();
        assert_eq!(first.offset, 0.0);
    }
}
