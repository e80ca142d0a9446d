//! Batch validation (§4.6): reject the whole batch if any adaptation is
//! invalid — no partial apply. Plans in the library are pre-validated at
//! load time; there is no per-apply conflict check (§9 Open Question d).

use std::collections::HashMap;

use traffic_common::graph::{GraphSnapshot, NodeId};
use traffic_kb::PhaseLibraryEntry;
use traffic_planner::Adaptation;

use crate::error::ExecutorError;

const MIN_PHASE_ID: i64 = 0;
const MAX_PHASE_ID: i64 = 3;
const MIN_OFFSET: f64 = 0.0;
const MAX_OFFSET: f64 = 300.0;

pub fn validate_batch(
    adaptations: &[Adaptation],
    snapshot: &GraphSnapshot,
    libraries: &HashMap<String, Vec<PhaseLibraryEntry>>,
) -> Result<(), ExecutorError> {
    for adaptation in adaptations {
        let node = snapshot.get_node(&NodeId::new(adaptation.intersection_id.as_str()));
        if !node.map(|n| n.kind.is_signalised()).unwrap_or(false) {
            return Err(ExecutorError::ValidationFailed(format!(
                "{} is not a signalised intersection",
                adaptation.intersection_id
            )));
        }
        if !(MIN_PHASE_ID..=MAX_PHASE_ID).contains(&adaptation.phase_id) {
            return Err(ExecutorError::ValidationFailed(format!(
                "phase_id {} for {} out of range [0,3]",
                adaptation.phase_id, adaptation.intersection_id
            )));
        }
        if !(MIN_OFFSET..=MAX_OFFSET).contains(&adaptation.offset) {
            return Err(ExecutorError::ValidationFailed(format!(
                "offset {} for {} out of range [0,300]",
                adaptation.offset, adaptation.intersection_id
            )));
        }
        let plan_exists = libraries
            .get(&adaptation.intersection_id)
            .map(|entries| entries.iter().any(|e| e.plan_id == adaptation.plan_id))
            .unwrap_or(false);
        if !plan_exists {
            return Err(ExecutorError::ValidationFailed(format!(
                "plan {} missing from library for {}",
                adaptation.plan_id, adaptation.intersection_id
            )));
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_common::graph::{NodeKind, RuntimeGraph};

    fn libs(intersection: &str, plan_id: &str) -> HashMap<String, Vec<PhaseLibraryEntry>> {
        let mut map = HashMap::new();
        map.insert(
            intersection.to_string(),
            vec![PhaseLibraryEntry {
                plan_id: plan_id.to_string(),
                intersection_id: intersection.to_string(),
                plan_name: "default".to_string(),
                tags: vec!["default".to_string()],
                cycle_length: 60.0,
                phase_id: Some(0),
                timing: serde_json::json!({}),
            }],
        );
        map
    }

    fn adaptation(intersection: &str, plan_id: &str, phase_id: i64, offset: f64) -> Adaptation {
        Adaptation {
            intersection_id: intersection.to_string(),
            plan_id: plan_id.to_string(),
            phase_id,
            offset,
            cycle_length: 60.0,
            is_incident_mode: false,
        }
    }

    #[test]
    fn rejects_virtual_intersections() {
        let g = RuntimeGraph::new();
        g.add_node(NodeId::new("1"), NodeKind::Virtual);
        let snapshot = g.snapshot();
        let adaptations = vec![adaptation("1", "1_default", 0, 0.0)];
        let err = validate_batch(&adaptations, &snapshot, &libs("1", "1_default")).unwrap_err();
        assert!(matches!(err, ExecutorError::ValidationFailed(_)));
    }

    #[test]
    fn rejects_out_of_range_phase_id() {
        let g = RuntimeGraph::new();
        g.add_node(NodeId::new("A"), NodeKind::Signalised);
        let snapshot = g.snapshot();
        let adaptations = vec![adaptation("A", "A_default", 9, 0.0)];
        assert!(validate_batch(&adaptations, &snapshot, &libs("A", "A_default")).is_err());
    }

    #[test]
    fn rejects_missing_plan() {
        let g = RuntimeGraph::new();
        g.add_node(NodeId::new("A"), NodeKind::Signalised);
        let snapshot = g.snapshot();
        let adaptations = vec![adaptation("A", "nonexistent", 0, 0.0)];
        assert!(validate_batch(&adaptations, &snapshot, &libs("A", "A_default")).is_err());
    }

    #[test]
    fn accepts_a_valid_batch() {
        let g = RuntimeGraph::new();
        g.add_node(NodeId::new("A"), NodeKind::Signalised);
        let snapshot = g.snapshot();
        let adaptations = vec![adaptation("A", "A_default", 0, 10.0)];
        assert!(validate_batch(&adaptations, &snapshot, &libs("A", "A_default")).is_ok());
    }
}
