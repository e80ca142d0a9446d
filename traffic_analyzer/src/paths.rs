//! Bypass search: k-shortest simple paths around hotspot edges (§4.4),
//! grounded on `graph_manager/graph_utils.py::find_k_shortest_paths`
//! (itself `nx.shortest_simple_paths`, i.e. Yen's algorithm), reimplemented
//! over `petgraph` (pack-grounded: `dashterm-graph`).

use std::collections::{HashMap, HashSet};

use petgraph::algo::astar;
use petgraph::graph::{DiGraph, NodeIndex};

use traffic_common::graph::{EdgeKey, GraphSnapshot, NodeId};

use crate::types::Bypass;

const MAX_HOTSPOTS_CONSIDERED: usize = 5;
const MAX_NEIGHBOR_CANDIDATES: usize = 2;

struct WeightedGraph {
    graph: DiGraph<NodeId, f64>,
    index_of: HashMap<NodeId, NodeIndex>,
}

fn build_graph(snapshot: &GraphSnapshot) -> WeightedGraph {
    let mut graph = DiGraph::new();
    let mut index_of = HashMap::new();
    for id in snapshot.nodes.keys() {
        index_of.insert(id.clone(), graph.add_node(id.clone()));
    }
    for key in snapshot.get_edge_ids() {
        let edge = snapshot.edges.get(&key).expect("key from this snapshot");
        graph.add_edge(index_of[&key.from], index_of[&key.to], edge.edge_cost);
    }
    WeightedGraph { graph, index_of }
}

/// Shortest simple path from `start` to `goal` in `graph`, excluding
/// `removed_nodes` and `removed_edges`.
fn shortest_path(
    base: &WeightedGraph,
    start: NodeIndex,
    goal: NodeIndex,
    removed_nodes: &HashSet<NodeIndex>,
    removed_edges: &HashSet<(NodeIndex, NodeIndex)>,
) -> Option<(Vec<NodeIndex>, f64)> {
    astar(
        &base.graph,
        start,
        |n| n == goal,
        |edge| {
            let (s, t) = (edge.source(), edge.target());
            if removed_nodes.contains(&s) || removed_nodes.contains(&t) || removed_edges.contains(&(s, t)) {
                f64::INFINITY
            } else {
                *edge.weight()
            }
        },
        |_| 0.0,
    )
    .filter(|(cost, _)| cost.is_finite())
}

/// Yen's algorithm: up to `k` loopless shortest paths from `start` to `goal`.
fn k_shortest_simple_paths(base: &WeightedGraph, start: NodeIndex, goal: NodeIndex, k: usize) -> Vec<(Vec<NodeIndex>, f64)> {
    let Some(first) = shortest_path(base, start, goal, &HashSet::new(), &HashSet::new()) else {
        return Vec::new();
    };
    let mut accepted = vec![first];
    let mut candidates: Vec<(Vec<NodeIndex>, f64)> = Vec::new();

    while accepted.len() < k {
        let prev_path = accepted.last().unwrap().0.clone();
        for i in 0..prev_path.len().saturating_sub(1) {
            let spur_node = prev_path[i];
            let root_path = &prev_path[..=i];

            let mut removed_edges = HashSet::new();
            for (path, _) in &accepted {
                if path.len() > i && path[..=i] == *root_path {
                    removed_edges.insert((path[i], path[i + 1]));
                }
            }
            let removed_nodes: HashSet<NodeIndex> = root_path[..i].iter().copied().collect();

            if let Some((spur_path, spur_cost)) = shortest_path(base, spur_node, goal, &removed_nodes, &removed_edges) {
                let mut total_path = root_path[..i].to_vec();
                total_path.extend(spur_path);
                let root_cost: f64 = root_path[..i]
                    .windows(2)
                    .map(|w| {
                        base.graph
                            .edges_connecting(w[0], w[1])
                            .next()
                            .map(|e| *e.weight())
                            .unwrap_or(0.0)
                    })
                    .sum();
                let total_cost = root_cost + spur_cost;
                if !accepted.iter().any(|(p, _)| *p == total_path) && !candidates.iter().any(|(p, _)| *p == total_path) {
                    candidates.push((total_path, total_cost));
                }
            }
        }

        if candidates.is_empty() {
            break;
        }
        candidates.sort_by(|a, b| a.1.partial_cmp(&b.1).unwrap());
        accepted.push(candidates.remove(0));
    }

    accepted
}

/// For each hotspot edge `(u, v)` (at most five), for each predecessor of
/// `u` and successor of `v` (at most two each), compute up to `k` simple
/// shortest paths rejecting any that pass through `(u, v)` itself.
pub fn find_bypasses(snapshot: &GraphSnapshot, hotspots: &[EdgeKey], k: usize) -> Vec<Bypass> {
    if hotspots.is_empty() || snapshot.nodes.len() < 2 {
        return Vec::new();
    }
    let base = build_graph(snapshot);
    let mut bypasses = Vec::new();

    for hotspot in hotspots.iter().take(MAX_HOTSPOTS_CONSIDERED) {
        let Some(&u) = base.index_of.get(&hotspot.from) else { continue };
        let Some(&v) = base.index_of.get(&hotspot.to) else { continue };

        let predecessors: Vec<NodeIndex> = base
            .graph
            .neighbors_directed(u, petgraph::Direction::Incoming)
            .take(MAX_NEIGHBOR_CANDIDATES)
            .collect();
        let successors: Vec<NodeIndex> = base
            .graph
            .neighbors_directed(v, petgraph::Direction::Outgoing)
            .take(MAX_NEIGHBOR_CANDIDATES)
            .collect();
        if predecessors.is_empty() || successors.is_empty() {
            continue;
        }

        for &upstream in &predecessors {
            for &downstream in &successors {
                for (path, _) in k_shortest_simple_paths(&base, upstream, downstream, k) {
                    let mut edge_path = Vec::new();
                    let mut total_cost = 0.0;
                    let mut uses_hotspot = false;
                    for window in path.windows(2) {
                        let (a, b) = (window[0], window[1]);
                        let from = base.graph[a].clone();
                        let to = base.graph[b].clone();
                        if from == hotspot.from && to == hotspot.to {
                            uses_hotspot = true;
                            break;
                        }
                        let cost = base
                            .graph
                            .edges_connecting(a, b)
                            .next()
                            .map(|e| *e.weight())
                            .unwrap_or(0.0);
                        total_cost += cost;
                        edge_path.push((from.to_string(), to.to_string()));
                    }
                    if !uses_hotspot && !edge_path.is_empty() {
                        bypasses.push(Bypass {
                            source: base.graph[upstream].to_string(),
                            destination: base.graph[downstream].to_string(),
                            length: edge_path.len(),
                            path: edge_path,
                            total_cost,
                            bypasses: (hotspot.from.to_string(), hotspot.to.to_string()),
                        });
                    }
                }
            }
        }
    }

    bypasses
}
