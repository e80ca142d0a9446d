//! Coordination-group clustering (§4.4), grounded on
//! `original_source/aegislights-controller/adaptation_manager/coordination.py::_identify_coordination_groups`,
//! generalized from "intersections touched by a bypass path" to the
//! richer hop-distance clustering the spec calls for.

use std::collections::{HashMap, HashSet, VecDeque};

use traffic_common::graph::{GraphSnapshot, NodeId};

use crate::types::CoordinationGroup;

/// Cluster `affected` signalised intersections by hop distance on the
/// undirected projection of the graph, cut off at `cutoff` hops. A group
/// is emitted only if it has at least two members; its representative is
/// the first member in the input order.
pub fn coordination_groups(snapshot: &GraphSnapshot, affected: &[String], cutoff: usize) -> Vec<CoordinationGroup> {
    if affected.len() < 2 {
        return Vec::new();
    }

    let adjacency = undirected_adjacency(snapshot);
    let affected_set: HashSet<&str> = affected.iter().map(String::as_str).collect();
    let mut visited: HashSet<String> = HashSet::new();
    let mut groups = Vec::new();

    for id in affected {
        if visited.contains(id) {
            continue;
        }
        let members = bfs_within_cutoff(id, &adjacency, &affected_set, cutoff);
        if members.len() >= 2 {
            for m in &members {
                visited.insert(m.clone());
            }
            let representative = members[0].clone();
            groups.push(CoordinationGroup {
                size: members.len(),
                intersections: members,
                representative,
            });
        } else {
            visited.insert(id.clone());
        }
    }

    groups
}

fn undirected_adjacency(snapshot: &GraphSnapshot) -> HashMap<NodeId, Vec<NodeId>> {
    let mut adjacency: HashMap<NodeId, Vec<NodeId>> = HashMap::new();
    for key in snapshot.get_edge_ids() {
        adjacency.entry(key.from.clone()).or_default().push(key.to.clone());
        adjacency.entry(key.to.clone()).or_default().push(key.from.clone());
    }
    adjacency
}

/// BFS from `start`, retaining only nodes within `cutoff` hops that are
/// also members of `affected_set`, in discovery order.
fn bfs_within_cutoff(
    start: &str,
    adjacency: &HashMap<NodeId, Vec<NodeId>>,
    affected_set: &HashSet<&str>,
    cutoff: usize,
) -> Vec<String> {
    let start_id = NodeId::new(start);
    let mut queue: VecDeque<(NodeId, usize)> = VecDeque::new();
    let mut seen: HashSet<NodeId> = HashSet::new();
    queue.push_back((start_id.clone(), 0));
    seen.insert(start_id);

    let mut members = Vec::new();
    while let Some((node, dist)) = queue.pop_front() {
        if affected_set.contains(node.as_str()) {
            members.push(node.to_string());
        }
        if dist >= cutoff {
            continue;
        }
        if let Some(neighbors) = adjacency.get(&node) {
            for neighbor in neighbors {
                if seen.insert(neighbor.clone()) {
                    queue.push_back((neighbor.clone(), dist + 1));
                }
            }
        }
    }
    members
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_common::graph::RuntimeGraph;

    fn linear_graph() -> GraphSnapshot {
        let g = RuntimeGraph::new();
        g.add_edge(NodeId::new("A"), NodeId::new("C"), "AC".into(), 1.0, 20.0, 1.0, 1);
        g.add_edge(NodeId::new("C"), NodeId::new("E"), "CE".into(), 1.0, 25.0, 1.0, 1);
        g.snapshot()
    }

    #[test]
    fn groups_two_or_more_affected_within_cutoff() {
        let snapshot = linear_graph();
        let affected = vec!["A".to_string(), "C".to_string(), "E".to_string()];
        let groups = coordination_groups(&snapshot, &affected, 3);
        assert_eq!(groups.len(), 1);
        assert_eq!(groups[0].size, 3);
        assert_eq!(groups[0].representative, "A");
    }

    #[test]
    fn fewer_than_two_affected_yields_no_groups() {
        let snapshot = linear_graph();
        assert!(coordination_groups(&snapshot, &["A".to_string()], 3).is_empty());
    }

    #[test]
    fn cutoff_excludes_distant_members() {
        let snapshot = linear_graph();
        let affected = vec!["A".to_string(), "E".to_string()];
        let groups = coordination_groups(&snapshot, &affected, 1);
        assert!(groups.is_empty());
    }
}
