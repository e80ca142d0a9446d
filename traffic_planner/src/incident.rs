//! Incident-mode plan selection (§4.5), grounded on
//! `original_source/aegislights-controller/adaptation_manager/incident_handler.py::select_incident_plan`.

use traffic_analyzer::{Bypass, Incident};
use traffic_kb::PhaseLibraryEntry;

/// Intersections on the NS corridor; used to classify a bypass's favoured
/// direction, mirroring the original's hardcoded reference-network split.
const NS_CORRIDOR: [&str; 3] = ["A", "C", "E"];

/// Select a plan for `intersection` while the network is in incident mode.
/// Preference order: direction-biased plan if this intersection anchors a
/// bypass, else a `balanced` plan if adjacent to an incident edge, else the
/// first library entry.
pub fn select_incident_plan<'a>(
    intersection: &str,
    library: &'a [PhaseLibraryEntry],
    bypasses: &[Bypass],
    incidents: &[Incident],
) -> Option<&'a PhaseLibraryEntry> {
    if library.is_empty() {
        return None;
    }

    if let Some(bypass) = bypasses.iter().find(|b| b.source == intersection) {
        let direction_tag = if NS_CORRIDOR.contains(&bypass.destination.as_str()) {
            "ns_priority"
        } else {
            "ew_priority"
        };
        if let Some(plan) = find_by_tag(library, direction_tag) {
            return Some(plan);
        }
    }

    let has_nearby_incident = incidents.iter().any(|i| i.from == intersection);
    if has_nearby_incident {
        if let Some(plan) = find_by_tag(library, "balanced") {
            return Some(plan);
        }
    }

    library.first()
}

fn find_by_tag<'a>(library: &'a [PhaseLibraryEntry], tag: &str) -> Option<&'a PhaseLibraryEntry> {
    library.iter().find(|p| p.tags.iter().any(|t| t == tag) || p.plan_name.contains(tag))
}
