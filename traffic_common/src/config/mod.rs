//! Configuration surface for the traffic controller (§6).
//!
//! A single record, loaded once and passed by reference to every stage's
//! constructor (§9 "Configuration" design note), mirroring how `evo_common`
//! loads one `SharedConfig` per application.

use serde::{Deserialize, Serialize};
use std::path::Path;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file not found: {0}")]
    FileNotFound(String),
    #[error("failed to parse configuration: {0}")]
    ParseError(String),
    #[error("configuration validation failed: {0}")]
    ValidationError(String),
}

/// Bandit algorithm selection (§6).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BanditAlgorithm {
    Ucb,
    ThompsonSampling,
}

/// Cost-function coefficients `(a, b, c, d)` plus the fixed indicator
/// magnitudes `S`, `I` (§4.4).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct CostCoefficients {
    #[serde(default = "default_a")]
    pub a: f64,
    #[serde(default = "default_b")]
    pub b: f64,
    #[serde(default = "default_c")]
    pub c: f64,
    #[serde(default = "default_d")]
    pub d: f64,
    #[serde(default = "default_spillback_magnitude")]
    pub spillback_magnitude: f64,
    #[serde(default = "default_incident_magnitude")]
    pub incident_magnitude: f64,
}

impl Default for CostCoefficients {
    fn default() -> Self {
        Self {
            a: default_a(),
            b: default_b(),
            c: default_c(),
            d: default_d(),
            spillback_magnitude: default_spillback_magnitude(),
            incident_magnitude: default_incident_magnitude(),
        }
    }
}

fn default_a() -> f64 {
    1.0
}
fn default_b() -> f64 {
    0.5
}
fn default_c() -> f64 {
    10.0
}
fn default_d() -> f64 {
    20.0
}
fn default_spillback_magnitude() -> f64 {
    10.0
}
fn default_incident_magnitude() -> f64 {
    20.0
}

/// Rollback utility weights `(w1, w2, w3, w4)` and spillback penalty `P`
/// (§4.6, richer variant confirmed against `original_source`).
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct UtilityWeights {
    #[serde(default = "default_w1")]
    pub w1: f64,
    #[serde(default = "default_w2")]
    pub w2: f64,
    #[serde(default = "default_w3")]
    pub w3: f64,
    #[serde(default = "default_w4")]
    pub w4: f64,
    #[serde(default = "default_spillback_penalty")]
    pub spillback_penalty: f64,
}

impl Default for UtilityWeights {
    fn default() -> Self {
        Self {
            w1: default_w1(),
            w2: default_w2(),
            w3: default_w3(),
            w4: default_w4(),
            spillback_penalty: default_spillback_penalty(),
        }
    }
}

fn default_w1() -> f64 {
    1.0
}
fn default_w2() -> f64 {
    1.0
}
fn default_w3() -> f64 {
    0.5
}
fn default_w4() -> f64 {
    1.0
}
fn default_spillback_penalty() -> f64 {
    10.0
}

/// The single configuration record every stage is constructed with.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ControllerConfig {
    #[serde(default = "default_cycle_period_seconds")]
    pub cycle_period_seconds: u64,
    #[serde(default = "default_rolling_window_size")]
    pub rolling_window_size: usize,
    #[serde(default = "default_hotspot_threshold")]
    pub hotspot_threshold: f64,
    #[serde(default = "default_k_shortest_paths")]
    pub k_shortest_paths: usize,
    #[serde(default = "default_trend_alpha")]
    pub trend_alpha: f64,
    #[serde(default = "default_bandit_algorithm")]
    pub bandit_algorithm: BanditAlgorithm,
    #[serde(default = "default_exploration_factor")]
    pub exploration_factor: f64,
    #[serde(default = "default_true")]
    pub coordination_enabled: bool,
    #[serde(default = "default_true")]
    pub enable_rollback: bool,
    #[serde(default = "default_rollback_window_size")]
    pub rollback_window_size: usize,
    #[serde(default = "default_performance_degradation_threshold")]
    pub performance_degradation_threshold: f64,
    #[serde(default = "default_true")]
    pub incident_mode_enabled: bool,
    #[serde(default = "default_high_congestion_threshold")]
    pub high_congestion_threshold: f64,
    #[serde(default)]
    pub cost_coefficients: CostCoefficients,
    #[serde(default)]
    pub utility_weights: UtilityWeights,
    #[serde(default = "default_coordination_cutoff")]
    pub coordination_cutoff: usize,
    #[serde(default = "default_simulator_base_url")]
    pub simulator_base_url: String,
    #[serde(default = "default_database_url")]
    pub database_url: String,
}

fn default_cycle_period_seconds() -> u64 {
    60
}
fn default_rolling_window_size() -> usize {
    3
}
fn default_hotspot_threshold() -> f64 {
    0.7
}
fn default_k_shortest_paths() -> usize {
    3
}
fn default_trend_alpha() -> f64 {
    0.3
}
fn default_bandit_algorithm() -> BanditAlgorithm {
    BanditAlgorithm::Ucb
}
fn default_exploration_factor() -> f64 {
    0.2
}
fn default_true() -> bool {
    true
}
fn default_rollback_window_size() -> usize {
    3
}
fn default_performance_degradation_threshold() -> f64 {
    0.10
}
fn default_high_congestion_threshold() -> f64 {
    50.0
}
fn default_coordination_cutoff() -> usize {
    3
}
fn default_simulator_base_url() -> String {
    "http://localhost:8000".to_string()
}
fn default_database_url() -> String {
    "sqlite://traffic.db".to_string()
}

impl Default for ControllerConfig {
    fn default() -> Self {
        Self {
            cycle_period_seconds: default_cycle_period_seconds(),
            rolling_window_size: default_rolling_window_size(),
            hotspot_threshold: default_hotspot_threshold(),
            k_shortest_paths: default_k_shortest_paths(),
            trend_alpha: default_trend_alpha(),
            bandit_algorithm: default_bandit_algorithm(),
            exploration_factor: default_exploration_factor(),
            coordination_enabled: true,
            enable_rollback: true,
            rollback_window_size: default_rollback_window_size(),
            performance_degradation_threshold: default_performance_degradation_threshold(),
            incident_mode_enabled: true,
            high_congestion_threshold: default_high_congestion_threshold(),
            cost_coefficients: CostCoefficients::default(),
            utility_weights: UtilityWeights::default(),
            coordination_cutoff: default_coordination_cutoff(),
            simulator_base_url: default_simulator_base_url(),
            database_url: default_database_url(),
        }
    }
}

impl ControllerConfig {
    /// Load and validate configuration from a TOML file.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)
            .map_err(|_| ConfigError::FileNotFound(path.display().to_string()))?;
        let config: Self = toml::from_str(&text).map_err(|e| ConfigError::ParseError(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.cycle_period_seconds == 0 {
            return Err(ConfigError::ValidationError(
                "cycle_period_seconds must be > 0".to_string(),
            ));
        }
        if self.k_shortest_paths == 0 {
            return Err(ConfigError::ValidationError(
                "k_shortest_paths must be > 0".to_string(),
            ));
        }
        if !(0.0..=1.0).contains(&self.hotspot_threshold) {
            return Err(ConfigError::ValidationError(
                "hotspot_threshold must be in [0, 1]".to_string(),
            ));
        }
        if !(0.0..1.0).contains(&self.trend_alpha) {
            return Err(ConfigError::ValidationError(
                "trend_alpha must be in (0, 1)".to_string(),
            ));
        }
        if self.performance_degradation_threshold < 0.0 {
            return Err(ConfigError::ValidationError(
                "performance_degradation_threshold must be >= 0".to_string(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_match_spec() {
        let c = ControllerConfig::default();
        assert_eq!(c.cycle_period_seconds, 60);
        assert_eq!(c.rolling_window_size, 3);
        assert_eq!(c.hotspot_threshold, 0.7);
        assert_eq!(c.k_shortest_paths, 3);
        assert_eq!(c.trend_alpha, 0.3);
        assert_eq!(c.bandit_algorithm, BanditAlgorithm::Ucb);
        assert_eq!(c.exploration_factor, 0.2);
        assert!(c.coordination_enabled);
        assert!(c.enable_rollback);
        assert_eq!(c.rollback_window_size, 3);
        assert_eq!(c.performance_degradation_threshold, 0.10);
        assert_eq!(c.cost_coefficients.a, 1.0);
        assert_eq!(c.cost_coefficients.b, 0.5);
        assert_eq!(c.cost_coefficients.c, 10.0);
        assert_eq!(c.cost_coefficients.d, 20.0);
        assert_eq!(c.utility_weights.w1, 1.0);
        assert_eq!(c.utility_weights.w3, 0.5);
        assert_eq!(c.utility_weights.spillback_penalty, 10.0);
    }

    #[test]
    fn load_missing_file_is_file_not_found() {
        let err = ControllerConfig::load(Path::new("/nonexistent/path.toml")).unwrap_err();
        assert!(matches!(err, ConfigError::FileNotFound(_)));
    }

    #[test]
    fn load_rejects_bad_hotspot_threshold() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "hotspot_threshold = 1.5\n").unwrap();
        let err = ControllerConfig::load(&path).unwrap_err();
        assert!(matches!(err, ConfigError::ValidationError(_)));
    }

    #[test]
    fn load_partial_toml_fills_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.toml");
        std::fs::write(&path, "k_shortest_paths = 5\n").unwrap();
        let cfg = ControllerConfig::load(&path).unwrap();
        assert_eq!(cfg.k_shortest_paths, 5);
        assert_eq!(cfg.cycle_period_seconds, 60);
    }
}
