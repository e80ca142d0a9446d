//! Monitor stage (§4.3): ingest the simulator snapshot, update the Runtime
//! Graph, smooth with a last-W-mean rolling window, flag anomalies.

use std::collections::{HashMap, VecDeque};

use tracing::{debug, info, warn};

use traffic_common::graph::{EdgeKey, NodeId, RuntimeGraph};
use traffic_kb::KnowledgeBase;
use traffic_sim_client::SimClient;

use crate::types::{
    edge_key_str, Aggregates, Anomalies, HighCongestionAnomaly, IncidentAnomaly, MonitorOutput, SmoothedEdge,
    SpillbackAnomaly,
};

#[derive(Debug, Clone, Copy, Default)]
struct RawSample {
    queue: f64,
    delay: f64,
    flow: f64,
}

/// Owns the per-edge rolling windows; never serialized, discarded on
/// shutdown (§3).
pub struct Monitor {
    rolling_windows: HashMap<EdgeKey, VecDeque<RawSample>>,
    window_size: usize,
    high_congestion_threshold: f64,
    failed_collections: u64,
}

impl Monitor {
    pub fn new(window_size: usize, high_congestion_threshold: f64) -> Self {
        Self {
            rolling_windows: HashMap::new(),
            window_size: window_size.max(1),
            high_congestion_threshold,
            failed_collections: 0,
        }
    }

    pub fn failed_collections(&self) -> u64 {
        self.failed_collections
    }

    /// Run one Monitor cycle: ingest, update graph, smooth, detect
    /// anomalies, persist.
    pub async fn execute(
        &mut self,
        cycle: i64,
        graph: &RuntimeGraph,
        kb: &KnowledgeBase,
        sim: &SimClient,
    ) -> MonitorOutput {
        info!("[monitor] starting cycle {cycle}");

        let snapshot = match sim.latest_snapshot().await {
            Ok(s) => s,
            Err(e) => {
                self.failed_collections += 1;
                warn!("[monitor] failed to collect snapshot for cycle {cycle}: {e}");
                return MonitorOutput {
                    cycle,
                    collection_failed: true,
                    ..Default::default()
                };
            }
        };

        let edge_index = self.build_edge_index(graph, snapshot.edges.keys());

        let mut aggregates = Aggregates::default();
        let mut anomalies = Anomalies::default();
        let mut edges_updated = 0usize;
        let mut total_queue = 0.0;
        let mut total_delay = 0.0;

        for (edge_id, observation) in &snapshot.edges {
            let Some(key) = edge_index.get(edge_id).cloned() else {
                warn!("[monitor] cannot place unseen edge {edge_id} without known endpoints; skipping");
                continue;
            };

            let queue = observation.estimated_queue();
            let delay = observation.estimated_delay();
            let flow = 0.0;

            graph.ensure_edge(key.from.clone(), key.to.clone());
            if let Err(e) = graph.update_edge_dynamic(&key.from, &key.to, queue, delay, flow, false, false) {
                warn!("[monitor] rejected dynamic update for {edge_id}: {e}");
                continue;
            }
            edges_updated += 1;

            let window = self
                .rolling_windows
                .entry(key.clone())
                .or_insert_with(|| VecDeque::with_capacity(self.window_size));
            if window.len() == self.window_size {
                window.pop_front();
            }
            window.push_back(RawSample { queue, delay, flow });

            let avg_queue = window.iter().map(|s| s.queue).sum::<f64>() / window.len() as f64;
            let avg_delay = window.iter().map(|s| s.delay).sum::<f64>() / window.len() as f64;

            aggregates.smoothed_edges.insert(
                edge_key_str(&key),
                SmoothedEdge {
                    avg_queue,
                    avg_delay,
                    raw_queue: queue,
                    raw_delay: delay,
                    window_len: window.len(),
                },
            );
            total_queue += avg_queue;
            total_delay += avg_delay;
            aggregates.max_queue = aggregates.max_queue.max(avg_queue);
            aggregates.max_delay = aggregates.max_delay.max(avg_delay);

            if queue > self.high_congestion_threshold {
                anomalies.high_congestion.push(HighCongestionAnomaly {
                    from: key.from.to_string(),
                    to: key.to.to_string(),
                    queue,
                    capacity: graph.get_edge(&key.from, &key.to).map(|e| e.capacity).unwrap_or(0.0),
                });
            }

            kb.insert_snapshot(
                cycle,
                snapshot.timestamp,
                key.from.as_str(),
                key.to.as_str(),
                queue,
                delay,
                flow,
                false,
                false,
            )
            .await;
            if let Some(edge) = graph.get_edge(&key.from, &key.to) {
                kb.upsert_edge(
                    cycle,
                    &traffic_kb::EdgeRow {
                        edge_id: edge.edge_id.clone(),
                        from: edge.from.to_string(),
                        to: edge.to.to_string(),
                        capacity: edge.capacity,
                        free_flow_time: edge.free_flow_time,
                        length: edge.length,
                        lane_count: edge.lane_count as i64,
                        current_queue: edge.current_queue,
                        current_delay: edge.current_delay,
                        current_flow: edge.current_flow,
                        spillback_active: edge.spillback_active,
                        incident_active: edge.incident_active,
                        edge_cost: edge.edge_cost,
                        last_updated_cycle: cycle,
                    },
                )
                .await;
            }

            // Spillback/incident flags are not derivable from the raw
            // snapshot (the simulator does not expose them directly);
            // any edge already carrying either flag (e.g. injected by a
            // test, or set by an earlier cycle) still shows up as an
            // anomaly so downstream stages see it every cycle it persists.
            if let Some(edge) = graph.get_edge(&key.from, &key.to) {
                if edge.spillback_active {
                    anomalies.spillbacks.push(SpillbackAnomaly {
                        from: key.from.to_string(),
                        to: key.to.to_string(),
                        queue,
                        delay,
                    });
                }
                if edge.incident_active {
                    anomalies.incidents.push(IncidentAnomaly {
                        from: key.from.to_string(),
                        to: key.to.to_string(),
                        queue,
                        delay,
                    });
                }
            }
        }

        if edges_updated > 0 {
            aggregates.avg_queue = total_queue / edges_updated as f64;
            aggregates.avg_delay = total_delay / edges_updated as f64;
        }
        aggregates.total_edges = edges_updated;

        self.recompute_node_flags(graph);

        info!(
            "[monitor] completed cycle {cycle}: {edges_updated} edges updated, {} spillbacks, {} incidents",
            anomalies.spillbacks.len(),
            anomalies.incidents.len()
        );

        MonitorOutput {
            cycle,
            timestamp: snapshot.timestamp,
            edges_updated,
            aggregates,
            anomalies,
            collection_failed: false,
        }
    }

    /// Build an `edge_id -> (from, to)` index from the graph's current
    /// edges, since the simulator's wire format only ever gives edge ids
    /// (lane-aggregated), never endpoints directly.
    fn build_edge_index<'a>(
        &self,
        graph: &RuntimeGraph,
        wanted: impl Iterator<Item = &'a String>,
    ) -> HashMap<String, EdgeKey> {
        let snapshot = graph.snapshot();
        let mut index: HashMap<String, EdgeKey> = snapshot
            .edges
            .values()
            .map(|e| (e.edge_id.clone(), e.key()))
            .collect();

        let known_ids: std::collections::HashSet<String> =
            snapshot.nodes.keys().map(|n| n.as_str().to_string()).collect();

        for edge_id in wanted {
            if index.contains_key(edge_id) {
                continue;
            }
            if let Some((from, to)) = resolve_endpoints(edge_id, &known_ids) {
                debug!("[monitor] resolved unseen edge {edge_id} as {from}->{to}");
                index.insert(edge_id.clone(), EdgeKey::new(NodeId::new(from), NodeId::new(to)));
            }
        }
        index
    }

    /// Recompute `is_congested`/`has_spillback` for every signalised node
    /// from its outgoing edges (§3: derived flags, mutated only by the
    /// Monitor).
    fn recompute_node_flags(&self, graph: &RuntimeGraph) {
        let snapshot = graph.snapshot();
        for node in snapshot.nodes.values() {
            if !node.kind.is_signalised() {
                continue;
            }
            let mut is_congested = false;
            let mut has_spillback = false;
            for key in &node.outgoing {
                if let Some(edge) = snapshot.edges.get(key) {
                    if edge.current_queue > self.high_congestion_threshold {
                        is_congested = true;
                    }
                    if edge.spillback_active {
                        has_spillback = true;
                    }
                }
            }
            let _ = graph.set_congestion_flags(&node.id, is_congested, has_spillback);
        }
    }
}

/// Try every split point of `edge_id` for a `(from, to)` pair that are
/// both known node ids (the reference network's convention: edge id is
/// the concatenation of its endpoints).
fn resolve_endpoints(edge_id: &str, known_ids: &std::collections::HashSet<String>) -> Option<(String, String)> {
    for split in 1..edge_id.len() {
        let (from, to) = edge_id.split_at(split);
        if known_ids.contains(from) && known_ids.contains(to) {
            return Some((from.to_string(), to.to_string()));
        }
    }
    None
}
