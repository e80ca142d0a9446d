//! Analyzer stage (§4.4): edge costs, hotspots, bypasses, trends,
//! incidents, throttle/favor targets, coordination groups.

use tracing::info;

use traffic_common::config::ControllerConfig;
use traffic_common::graph::RuntimeGraph;
use traffic_kb::KnowledgeBase;
use traffic_monitor::MonitorOutput;

use crate::coordination::coordination_groups;
use crate::cost::{avg_and_max, compute_edge_costs, edge_key_str, identify_hotspots};
use crate::incidents::lift_incidents;
use crate::paths::find_bypasses;
use crate::targets::compute_targets;
use crate::trends::CostHistory;
use crate::types::AnalyzerOutput;

pub struct Analyzer {
    cost_history: CostHistory,
}

const COST_HISTORY_WINDOW: usize = 10;

impl Analyzer {
    pub fn new() -> Self {
        Self {
            cost_history: CostHistory::new(COST_HISTORY_WINDOW),
        }
    }

    /// Run one Analyzer cycle over the graph's current state and the
    /// Monitor's anomaly output.
    pub async fn execute(
        &mut self,
        cycle: i64,
        monitor_output: &MonitorOutput,
        graph: &RuntimeGraph,
        kb: &KnowledgeBase,
        config: &ControllerConfig,
    ) -> AnalyzerOutput {
        let (a, b, c, d) = kb.get_cost_coefficients();
        let mut coeffs = config.cost_coefficients;
        coeffs.a = a;
        coeffs.b = b;
        coeffs.c = c;
        coeffs.d = d;

        let snapshot = graph.snapshot();
        let costs = compute_edge_costs(&snapshot, &coeffs);
        for (key, cost) in &costs {
            let _ = graph.set_edge_cost(&key.from, &key.to, *cost);
        }

        let hotspot_keys = identify_hotspots(&costs, config.hotspot_threshold);
        let hotspot_costs: Vec<(traffic_common::graph::EdgeKey, f64)> = costs
            .iter()
            .filter(|(k, _)| hotspot_keys.contains(k))
            .cloned()
            .collect();

        let bypasses = find_bypasses(&snapshot, &hotspot_keys, config.k_shortest_paths);

        self.cost_history.record(&costs);
        let trend_map = self.cost_history.trends(config.trend_alpha);

        let incidents = lift_incidents(&monitor_output.anomalies);

        let targets = compute_targets(&hotspot_costs, &incidents, &bypasses);

        let coordination = if config.coordination_enabled && targets.affected_intersections.len() >= 2 {
            let signalised: std::collections::HashSet<String> = snapshot
                .signalised_node_ids()
                .into_iter()
                .map(|id| id.to_string())
                .collect();
            let affected_signalised: Vec<String> = targets
                .affected_intersections
                .iter()
                .filter(|id| signalised.contains(id.as_str()))
                .cloned()
                .collect();
            coordination_groups(&snapshot, &affected_signalised, config.coordination_cutoff)
        } else {
            Vec::new()
        };

        let (avg_cost, max_cost) = avg_and_max(&costs);

        let edge_costs = costs
            .iter()
            .map(|(k, cost)| (edge_key_str(k), *cost))
            .collect();
        let trends = trend_map.into_iter().map(|(k, t)| (edge_key_str(&k), t)).collect();
        let hotspots = hotspot_keys.iter().map(|k| (k.from.to_string(), k.to.to_string())).collect();

        let output = AnalyzerOutput {
            cycle,
            edge_costs,
            hotspots,
            bypasses,
            trends,
            incidents,
            targets,
            coordination_groups: coordination,
            avg_cost,
            max_cost,
        };

        self.log_decision(cycle, kb, &output).await;

        info!(
            "[analyzer] cycle {cycle}: {} hotspots, {} bypasses, {} incidents, adaptation_needed={}",
            output.hotspots.len(),
            output.bypasses.len(),
            output.incidents.len(),
            output.targets.adaptation_needed
        );

        output
    }

    async fn log_decision(&self, cycle: i64, kb: &KnowledgeBase, output: &AnalyzerOutput) {
        let reasoning = serde_json::json!({
            "num_hotspots": output.hotspots.len(),
            "num_bypasses": output.bypasses.len(),
            "num_incidents": output.incidents.len(),
            "adaptation_needed": output.targets.adaptation_needed,
        });
        let context = serde_json::json!({
            "avg_cost": output.avg_cost,
            "max_cost": output.max_cost,
            "affected_intersections": output.targets.affected_intersections,
            "coordination_groups": output.coordination_groups.len(),
        });
        kb.log_decision(cycle, "analyze", "network_analysis", &reasoning, &context).await;
    }
}

impl Default for Analyzer {
    fn default() -> Self {
        Self::new()
    }
}
