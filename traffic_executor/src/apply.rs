//! Apply validated adaptations to the simulator and the Runtime Graph
//! (§4.6). Failures are logged per intersection; the batch continues.

use tracing::{error, info};

use traffic_common::graph::{NodeId, RuntimeGraph};
use traffic_kb::AppliedConfiguration;
use traffic_planner::Adaptation;
use traffic_sim_client::SimClient;

use crate::types::AppliedResult;

pub async fn apply_adaptations(
    adaptations: &[Adaptation],
    graph: &RuntimeGraph,
    sim: &SimClient,
) -> (Vec<AppliedResult>, Vec<AppliedConfiguration>) {
    let mut results = Vec::with_capacity(adaptations.len());
    let mut applied_configurations = Vec::new();

    for adaptation in adaptations {
        let success = match sim.apply_plan(&adaptation.intersection_id, adaptation.phase_id).await {
            Ok(()) => {
                if let Err(e) = graph.apply_plan(
                    &NodeId::new(adaptation.intersection_id.as_str()),
                    adaptation.plan_id.clone(),
                    adaptation.offset,
                    adaptation.cycle_length,
                ) {
                    error!("apply_plan graph update failed for {}: {e}", adaptation.intersection_id);
                    false
                } else {
                    info!("[executor] applied {} -> {} (phase {})", adaptation.intersection_id, adaptation.plan_id, adaptation.phase_id);
                    true
                }
            }
            Err(e) => {
                error!("apply_plan failed for {}: {e}", adaptation.intersection_id);
                false
            }
        };

        if success {
            applied_configurations.push(AppliedConfiguration {
                intersection_id: adaptation.intersection_id.clone(),
                plan_id: adaptation.plan_id.clone(),
                phase_id: adaptation.phase_id,
                offset: adaptation.offset,
                cycle_length: adaptation.cycle_length,
                is_incident_mode: adaptation.is_incident_mode,
                rolled_back: false,
            });
        }

        results.push(AppliedResult {
            intersection_id: adaptation.intersection_id.clone(),
            plan_id: adaptation.plan_id.clone(),
            phase_id: adaptation.phase_id,
            offset: adaptation.offset,
            cycle_length: adaptation.cycle_length,
            success,
        });
    }

    (results, applied_configurations)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{routing::post, Json, Router};
    use std::net::SocketAddr;
    use traffic_common::graph::NodeKind;

    async fn spawn_fake_simulator(accept: bool) -> String {
        let app = Router::new().route(
            "/intersections/:id/plan",
            post(move || {
                let accept = accept;
                async move { Json(serde_json::json!({ "success": accept })) }
            }),
        );
        let listener = tokio::net::TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr: SocketAddr = listener.local_addr().unwrap();
        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });
        format!("http://{addr}")
    }

    fn adaptation(intersection: &str) -> Adaptation {
        Adaptation {
            intersection_id: intersection.to_string(),
            plan_id: format!("{intersection}_default"),
            phase_id: 0,
            offset: 10.0,
            cycle_length: 60.0,
            is_incident_mode: false,
        }
    }

    #[tokio::test]
    async fn successful_apply_updates_graph_and_records_configuration() {
        let base_url = spawn_fake_simulator(true).await;
        let sim = SimClient::new(base_url);
        let graph = RuntimeGraph::new();
        graph.add_node(NodeId::new("A"), NodeKind::Signalised);

        let (results, configs) = apply_adaptations(&[adaptation("A")], &graph, &sim).await;

        assert!(results[0].success);
        assert_eq!(configs.len(), 1);
        let node = graph.get_node(&NodeId::new("A")).unwrap();
        assert_eq!(node.current_plan_id, Some("A_default".to_string()));
        assert_eq!(node.current_offset, 10.0);
    }

    #[tokio::test]
    async fn rejected_plan_is_marked_unsuccessful_and_not_recorded() {
        let base_url = spawn_fake_simulator(false).await;
        let sim = SimClient::new(base_url);
        let graph = RuntimeGraph::new();
        graph.add_node(NodeId::new("A"), NodeKind::Signalised);

        let (results, configs) = apply_adaptations(&[adaptation("A")], &graph, &sim).await;

        assert!(!results[0].success);
        assert!(configs.is_empty());
        let node = graph.get_node(&NodeId::new("A")).unwrap();
        assert_eq!(node.current_plan_id, None);
    }
}
