//! Analyzer output types (§4.4).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Trend {
    Increasing,
    Stable,
    Decreasing,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Severity {
    Medium,
    High,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Incident {
    pub from: String,
    pub to: String,
    pub queue: f64,
    pub delay: f64,
    pub severity: Severity,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Bypass {
    pub source: String,
    pub destination: String,
    pub path: Vec<(String, String)>,
    pub total_cost: f64,
    pub bypasses: (String, String),
    pub length: usize,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TargetReason {
    Hotspot,
    Incident,
    Bypass,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TargetEdge {
    pub from: String,
    pub to: String,
    pub reason: String,
    pub cost: f64,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Targets {
    pub edges_to_throttle: Vec<TargetEdge>,
    pub edges_to_favor: Vec<TargetEdge>,
    pub affected_intersections: Vec<String>,
    pub adaptation_needed: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoordinationGroup {
    pub intersections: Vec<String>,
    pub size: usize,
    pub representative: String,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct CostBreakdown {
    pub total_cost: f64,
    pub delay_component: f64,
    pub queue_component: f64,
    pub spillback_component: f64,
    pub incident_component: f64,
    pub delay: f64,
    pub queue: f64,
    pub spillback: bool,
    pub incident: bool,
}

/// `{edge_costs, hotspots, bypasses, trends, incidents, targets,
/// coordination_groups, avg_cost, max_cost}` (§4.4).
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AnalyzerOutput {
    pub cycle: i64,
    pub edge_costs: HashMap<String, f64>,
    pub hotspots: Vec<(String, String)>,
    pub bypasses: Vec<Bypass>,
    pub trends: HashMap<String, Trend>,
    pub incidents: Vec<Incident>,
    pub targets: Targets,
    pub coordination_groups: Vec<CoordinationGroup>,
    pub avg_cost: f64,
    pub max_cost: f64,
}
