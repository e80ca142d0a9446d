//! Lift Monitor anomalies into Analyzer incident records (§4.4), grounded
//! on `original_source/.../adaptation_manager/analyze.py::_process_incidents`.

use traffic_monitor::types::Anomalies;

use crate::types::{Incident, Severity};

const HIGH_SEVERITY_DELAY_THRESHOLD: f64 = 15.0;

/// Every Monitor-flagged incident becomes an incident record; severity is
/// `high` if `delay > 15s` else `medium` (§4.4).
pub fn lift_incidents(anomalies: &Anomalies) -> Vec<Incident> {
    anomalies
        .incidents
        .iter()
        .map(|a| Incident {
            from: a.from.clone(),
            to: a.to.clone(),
            queue: a.queue,
            delay: a.delay,
            severity: if a.delay > HIGH_SEVERITY_DELAY_THRESHOLD {
                Severity::High
            } else {
                Severity::Medium
            },
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_monitor::types::IncidentAnomaly;

    #[test]
    fn high_delay_is_high_severity() {
        let anomalies = Anomalies {
            incidents: vec![IncidentAnomaly {
                from: "B".into(),
                to: "D".into(),
                queue: 70.0,
                delay: 35.0,
            }],
            ..Default::default()
        };
        let incidents = lift_incidents(&anomalies);
        assert_eq!(incidents.len(), 1);
        assert_eq!(incidents[0].severity, Severity::High);
    }

    #[test]
    fn low_delay_is_medium_severity() {
        let anomalies = Anomalies {
            incidents: vec![IncidentAnomaly {
                from: "B".into(),
                to: "D".into(),
                queue: 70.0,
                delay: 10.0,
            }],
            ..Default::default()
        };
        let incidents = lift_incidents(&anomalies);
        assert_eq!(incidents[0].severity, Severity::Medium);
    }
}
