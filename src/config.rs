//! Named options for one analysis run.

use clap::ValueEnum;
use serde::{Deserialize, Serialize};
use std::path::Path;

use crate::error::{AnalysisError, Result};

/// Which feature set the feature builder selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
pub enum Mode {
    /// raw sector seconds, tyre age, track temperature, speed trap, compound
    #[default]
    Fixed,
    /// outlier filter + sector deltas + variance-gated weather columns
    Adaptive,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// `EventName` of the session to analyze
    #[serde(default = "default_event")]
    pub event: String,

    #[serde(default)]
    pub mode: Mode,

    /// Multiplier for the standardized sector-delta columns (adaptive mode)
    #[serde(default = "default_weight_factor")]
    pub weight_factor: f64,

    /// Laps slower than `outlier_ratio * median` are dropped (adaptive mode)
    #[serde(default = "default_outlier_ratio")]
    pub outlier_ratio: f64,

    #[serde(default = "default_track_temp_std_threshold")]
    pub track_temp_std_threshold: f64,

    #[serde(default = "default_wind_speed_std_threshold")]
    pub wind_speed_std_threshold: f64,

    #[serde(default = "default_n_clusters")]
    pub n_clusters: usize,

    /// k-means restarts, best inertia wins
    #[serde(default = "default_n_runs")]
    pub n_runs: usize,

    #[serde(default = "default_max_iterations")]
    pub max_iterations: u64,

    #[serde(default = "default_tolerance")]
    pub tolerance: f64,

    #[serde(default)]
    pub seed: u64,

    /// Minimum laps on one compound before a degradation line is fitted
    #[serde(default = "default_min_degradation_laps")]
    pub min_degradation_laps: usize,
}

fn default_event() -> String {
    "Australian Grand Prix".to_string()
}

fn default_weight_factor() -> f64 {
    1.5
}

fn default_outlier_ratio() -> f64 {
    1.10
}

fn default_track_temp_std_threshold() -> f64 {
    0.5
}

fn default_wind_speed_std_threshold() -> f64 {
    1.0
}

fn default_n_clusters() -> usize {
    5
}

fn default_n_runs() -> usize {
    20
}

fn default_max_iterations() -> u64 {
    300
}

fn default_tolerance() -> f64 {
    1e-4
}

fn default_min_degradation_laps() -> usize {
    5
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            event: default_event(),
            mode: Mode::default(),
            weight_factor: default_weight_factor(),
            outlier_ratio: default_outlier_ratio(),
            track_temp_std_threshold: default_track_temp_std_threshold(),
            wind_speed_std_threshold: default_wind_speed_std_threshold(),
            n_clusters: default_n_clusters(),
            n_runs: default_n_runs(),
            max_iterations: default_max_iterations(),
            tolerance: default_tolerance(),
            seed: 0,
            min_degradation_laps: default_min_degradation_laps(),
        }
    }
}

impl AnalysisConfig {
    /// Load configuration from a YAML file. Missing keys fall back to defaults.
    pub fn from_yaml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: AnalysisConfig = serde_yaml::from_str(&content)?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        let invalid = |msg: String| Err(AnalysisError::InvalidConfig(msg));

        if !(self.weight_factor >= 1.0) {
            return invalid(format!("weight_factor must be >= 1.0, got {}", self.weight_factor));
        }
        if !(self.outlier_ratio >= 1.0) {
            return invalid(format!("outlier_ratio must be >= 1.0, got {}", self.outlier_ratio));
        }
        if !(self.track_temp_std_threshold >= 0.0) || !(self.wind_speed_std_threshold >= 0.0) {
            return invalid("variance thresholds must be non-negative".to_string());
        }
        if self.n_clusters == 0 {
            return invalid("n_clusters must be at least 1".to_string());
        }
        if self.n_runs < 10 {
            return invalid(format!("n_runs must be at least 10, got {}", self.n_runs));
        }
        if self.max_iterations == 0 {
            return invalid("max_iterations must be positive".to_string());
        }
        if !(self.tolerance > 0.0) {
            return invalid(format!("tolerance must be positive, got {}", self.tolerance));
        }
        Ok(())
    }
}
