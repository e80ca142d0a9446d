//! Default phase library seeding (§3, §6.3 `phase_libraries`), grounded on
//! `original_source/aegislights-controller/{app/models,db_manager,knowledge}/phase_library.py`.
//!
//! Production deployments load plans from the Knowledge Base; this module
//! only supplies the four-plan starter set (`default`, `ns_priority`,
//! `ew_priority`, `balanced`) the supervisor binary seeds on first boot.

use traffic_kb::PhaseLibraryEntry;

const DEFAULT_CYCLE_LENGTH: f64 = 60.0;
const BALANCED_CYCLE_LENGTH: f64 = 80.0;

/// Build the starter plan set for one intersection.
pub fn default_plans(intersection: &str) -> Vec<PhaseLibraryEntry> {
    vec![
        PhaseLibraryEntry {
            plan_id: format!("{intersection}_default"),
            intersection_id: intersection.to_string(),
            plan_name: "default".to_string(),
            tags: vec!["default".to_string()],
            cycle_length: DEFAULT_CYCLE_LENGTH,
            phase_id: Some(0),
            timing: serde_json::json!({"phase_0": 25, "phase_1": 5, "phase_2": 25, "phase_3": 5}),
        },
        PhaseLibraryEntry {
            plan_id: format!("{intersection}_ns_priority"),
            intersection_id: intersection.to_string(),
            plan_name: "ns_priority".to_string(),
            tags: vec!["ns_priority".to_string(), "main_arterial_bias".to_string()],
            cycle_length: DEFAULT_CYCLE_LENGTH,
            phase_id: Some(0),
            timing: serde_json::json!({"phase_0": 35, "phase_1": 5, "phase_2": 15, "phase_3": 5}),
        },
        PhaseLibraryEntry {
            plan_id: format!("{intersection}_ew_priority"),
            intersection_id: intersection.to_string(),
            plan_name: "ew_priority".to_string(),
            tags: vec!["ew_priority".to_string()],
            cycle_length: DEFAULT_CYCLE_LENGTH,
            phase_id: Some(2),
            timing: serde_json::json!({"phase_0": 15, "phase_1": 5, "phase_2": 35, "phase_3": 5}),
        },
        PhaseLibraryEntry {
            plan_id: format!("{intersection}_balanced"),
            intersection_id: intersection.to_string(),
            plan_name: "balanced".to_string(),
            tags: vec!["balanced".to_string(), "incident_mode".to_string()],
            cycle_length: BALANCED_CYCLE_LENGTH,
            phase_id: Some(0),
            timing: serde_json::json!({"phase_0": 30, "phase_1": 10, "phase_2": 30, "phase_3": 10}),
        },
    ]
}

/// Fall back to inferring a simulator phase id from the plan name when the
/// library entry carries none (§4.5 "Phase id extraction").
pub fn phase_id_for_plan(plan_name: &str) -> i64 {
    if plan_name.contains("ns_priority") {
        0
    } else if plan_name.contains("ew_priority") {
        2
    } else if plan_name.contains("balanced") {
        0
    } else {
        0
    }
}
