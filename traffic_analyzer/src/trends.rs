//! Cost history and trend estimation (§4.4), grounded on
//! `original_source/aegislights-controller/adaptation_manager/analyze.py::_update_cost_history`
//! / `_predict_trends`.
//!
//! Smoothing here is one-sided exponential (EMA), distinct from the
//! Monitor's last-W-mean (§4.3): the Monitor smooths raw observations,
//! the Analyzer smooths the resulting cost series to detect direction.

use std::collections::{HashMap, VecDeque};

use traffic_common::graph::EdgeKey;

use crate::types::Trend;

const SLOPE_INCREASING: f64 = 1.0;
const SLOPE_DECREASING: f64 = -1.0;
const MIN_HISTORY_FOR_TREND: usize = 3;

/// Bounded per-edge cost history (window `H`), feeding trend estimation
/// only — never consulted by any other stage (§10 supplement).
pub struct CostHistory {
    window: usize,
    history: HashMap<EdgeKey, VecDeque<f64>>,
}

impl CostHistory {
    pub fn new(window: usize) -> Self {
        Self {
            window: window.max(1),
            history: HashMap::new(),
        }
    }

    /// Append this cycle's cost for every edge, evicting the oldest entry
    /// once a series reaches the configured window.
    pub fn record(&mut self, costs: &[(EdgeKey, f64)]) {
        for (key, cost) in costs {
            let series = self.history.entry(key.clone()).or_insert_with(|| VecDeque::with_capacity(self.window));
            if series.len() == self.window {
                series.pop_front();
            }
            series.push_back(*cost);
        }
    }

    /// Classify the trend of every edge with at least three historical
    /// costs by the slope of the last three EMA-smoothed values.
    pub fn trends(&self, alpha: f64) -> HashMap<EdgeKey, Trend> {
        let mut trends = HashMap::new();
        for (key, series) in &self.history {
            if series.len() < MIN_HISTORY_FOR_TREND {
                continue;
            }
            let smoothed = ema(series, alpha);
            let tail = &smoothed[smoothed.len() - 3..];
            let slope = (tail[2] - tail[0]) / 2.0;
            let trend = if slope > SLOPE_INCREASING {
                Trend::Increasing
            } else if slope < SLOPE_DECREASING {
                Trend::Decreasing
            } else {
                Trend::Stable
            };
            trends.insert(key.clone(), trend);
        }
        trends
    }
}

/// One-sided exponential smoothing: `s_0 = x_0`, `s_t = α·x_t + (1-α)·s_{t-1}`.
fn ema(series: &VecDeque<f64>, alpha: f64) -> Vec<f64> {
    let mut smoothed = Vec::with_capacity(series.len());
    let mut prev = series[0];
    smoothed.push(prev);
    for &x in series.iter().skip(1) {
        prev = alpha * x + (1.0 - alpha) * prev;
        smoothed.push(prev);
    }
    smoothed
}

#[cfg(test)]
mod tests {
    use super::*;
    use traffic_common::graph::NodeId;

    fn key(from: &str, to: &str) -> EdgeKey {
        EdgeKey::new(NodeId::new(from), NodeId::new(to))
    }

    #[test]
    fn fewer_than_three_samples_yields_no_trend() {
        let mut history = CostHistory::new(10);
        history.record(&[(key("A", "B"), 10.0)]);
        history.record(&[(key("A", "B"), 20.0)]);
        assert!(history.trends(0.3).is_empty());
    }

    #[test]
    fn steadily_rising_costs_are_classified_increasing() {
        let mut history = CostHistory::new(10);
        for cost in [10.0, 40.0, 90.0, 160.0] {
            history.record(&[(key("A", "B"), cost)]);
        }
        let trends = history.trends(0.3);
        assert_eq!(trends[&key("A", "B")], Trend::Increasing);
    }

    #[test]
    fn steadily_falling_costs_are_classified_decreasing() {
        let mut history = CostHistory::new(10);
        for cost in [160.0, 90.0, 40.0, 10.0] {
            history.record(&[(key("A", "B"), cost)]);
        }
        let trends = history.trends(0.3);
        assert_eq!(trends[&key("A", "B")], Trend::Decreasing);
    }

    #[test]
    fn flat_costs_are_classified_stable() {
        let mut history = CostHistory::new(10);
        for _ in 0..4 {
            history.record(&[(key("A", "B"), 50.0)]);
        }
        let trends = history.trends(0.3);
        assert_eq!(trends[&key("A", "B")], Trend::Stable);
    }

    #[test]
    fn history_window_evicts_oldest_entry() {
        let mut history = CostHistory::new(2);
        history.record(&[(key("A", "B"), 1.0)]);
        history.record(&[(key("A", "B"), 2.0)]);
        history.record(&[(key("A", "B"), 3.0)]);
        assert_eq!(history.history[&key("A", "B")].len(), 2);
        assert_eq!(*history.history[&key("A", "B")].front().unwrap(), 2.0);
    }
}
