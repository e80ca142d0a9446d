//! Phase library bootstrap: seed every signalised intersection with the
//! starter plan set at process startup, idempotently (`seed_phase_library_entry`
//! is an upsert).

use tracing::{error, info};

use traffic_common::graph::RuntimeGraph;
use traffic_kb::KnowledgeBase;
use traffic_planner::phase_library::default_plans;

pub async fn seed_phase_libraries(graph: &RuntimeGraph, kb: &KnowledgeBase) {
    let signalised = graph.snapshot().signalised_node_ids();
    for id in signalised {
        let plans = default_plans(id.as_str());
        for plan in &plans {
            if let Err(e) = kb.seed_phase_library_entry(plan).await {
                error!("failed to seed phase library entry {}: {e}", plan.plan_id);
            }
        }
        info!("seeded {} starter plans for intersection {}", plans.len(), id.as_str());
    }
}
