//! # Analysis Configuration
//!
//! Immutable parameter sets handed to every stage of the engine. Nothing in
//! the engine reads ambient state; callers build one [`AnalysisConfig`],
//! validate it, and pass references down.
//!
//! All sections deserialize from YAML or JSON with per-field defaults, so a
//! config file only needs to name the values it changes.

use crate::error::ConfigError;
use serde::{Deserialize, Serialize};

/// Supreme Isthmus map extent in elmos.
pub const DEFAULT_MAP_SIZE: f64 = 12288.0;

/// Full configuration for one analysis run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct AnalysisConfig {
    pub map: MapSpec,
    pub positions: PositionClusteringConfig,
    pub builds: BuildClusteringConfig,
    pub overview: OverviewConfig,
}

/// Square map with diagonal mirror symmetry across x = z.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MapSpec {
    pub name: String,
    pub size: f64,
}

impl Default for MapSpec {
    fn default() -> Self {
        Self {
            name: "Supreme Isthmus".to_string(),
            size: DEFAULT_MAP_SIZE,
        }
    }
}

impl MapSpec {
    pub fn center(&self) -> (f64, f64) {
        (self.size / 2.0, self.size / 2.0)
    }

    pub fn contains(&self, value: f64) -> bool {
        (0.0..=self.size).contains(&value)
    }
}

/// Density clustering parameters for spawn positions.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PositionClusteringConfig {
    /// Neighborhood radius in map units.
    pub eps: f64,
    /// Points (including the point itself) needed within `eps` to seed a cluster.
    pub min_samples: usize,
    /// Surplus clusters closer than this to a labeled cluster are merged into
    /// it. Falls back to `eps` when unset.
    pub merge_tolerance: Option<f64>,
}

impl Default for PositionClusteringConfig {
    fn default() -> Self {
        Self {
            eps: 800.0,
            min_samples: 3,
            merge_tolerance: None,
        }
    }
}

impl PositionClusteringConfig {
    pub fn effective_merge_tolerance(&self) -> f64 {
        self.merge_tolerance.unwrap_or(self.eps)
    }
}

/// Costs of the (token, run_length) edit distance.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EditCosts {
    /// Insert or delete one step.
    pub indel: f64,
    /// Substitute a step with a different unit token.
    pub token_mismatch: f64,
    /// Upper bound for substituting a step that only differs in run length.
    pub run_mismatch: f64,
}

impl Default for EditCosts {
    fn default() -> Self {
        Self {
            indel: 1.0,
            token_mismatch: 1.5,
            run_mismatch: 0.5,
        }
    }
}

/// Build-order clustering parameters, applied per position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BuildClusteringConfig {
    /// Only events with `time_ms <= time_window_ms` are kept.
    pub time_window_ms: i64,
    /// Upper bound on archetypes retained per position.
    pub max_clusters: usize,
    /// Archetypes with fewer members are discarded.
    pub min_cluster_size: usize,
    /// Merging stops once every inter-cluster distance exceeds this
    /// (length-normalised edit distance).
    pub stop_distance: f64,
    /// Keep at most this many collapsed steps per sequence.
    pub max_steps: Option<usize>,
    /// Measure the window from the player's first event instead of game start.
    pub align_to_first_event: bool,
    pub costs: EditCosts,
}

impl Default for BuildClusteringConfig {
    fn default() -> Self {
        Self {
            time_window_ms: 360_000,
            max_clusters: 5,
            min_cluster_size: 5,
            stop_distance: 0.5,
            max_steps: None,
            align_to_first_event: false,
            costs: EditCosts::default(),
        }
    }
}

/// Thresholds for the per-position overview statistics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OverviewConfig {
    pub high_skill_threshold: f64,
    pub mid_skill_threshold: f64,
    /// Highest-skill members listed as examples on each archetype.
    pub top_examples: usize,
}

impl Default for OverviewConfig {
    fn default() -> Self {
        Self {
            high_skill_threshold: 30.0,
            mid_skill_threshold: 20.0,
            top_examples: 3,
        }
    }
}

fn require_positive(field: &'static str, value: f64) -> Result<(), ConfigError> {
    if !value.is_finite() {
        return Err(ConfigError::NonFinite { field });
    }
    if value <= 0.0 {
        return Err(ConfigError::NonPositive { field, value });
    }
    Ok(())
}

fn require_count(field: &'static str, value: usize) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::ZeroCount { field });
    }
    Ok(())
}

impl AnalysisConfig {
    /// Reject out-of-range parameters before any record is processed.
    pub fn validate(&self) -> Result<(), ConfigError> {
        require_positive("map.size", self.map.size)?;

        require_positive("positions.eps", self.positions.eps)?;
        require_count("positions.min_samples", self.positions.min_samples)?;
        if let Some(tolerance) = self.positions.merge_tolerance {
            require_positive("positions.merge_tolerance", tolerance)?;
        }

        let builds = &self.builds;
        require_positive("builds.time_window_ms", builds.time_window_ms as f64)?;
        require_count("builds.max_clusters", builds.max_clusters)?;
        require_count("builds.min_cluster_size", builds.min_cluster_size)?;
        if !builds.stop_distance.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "builds.stop_distance",
            });
        }
        if builds.stop_distance < 0.0 {
            return Err(ConfigError::NonPositive {
                field: "builds.stop_distance",
                value: builds.stop_distance,
            });
        }
        if let Some(max_steps) = builds.max_steps {
            require_count("builds.max_steps", max_steps)?;
        }
        require_positive("builds.costs.indel", builds.costs.indel)?;
        require_positive("builds.costs.token_mismatch", builds.costs.token_mismatch)?;
        require_positive("builds.costs.run_mismatch", builds.costs.run_mismatch)?;

        let overview = &self.overview;
        if !overview.high_skill_threshold.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "overview.high_skill_threshold",
            });
        }
        if !overview.mid_skill_threshold.is_finite() {
            return Err(ConfigError::NonFinite {
                field: "overview.mid_skill_threshold",
            });
        }
        if overview.mid_skill_threshold > overview.high_skill_threshold {
            return Err(ConfigError::InvertedThresholds);
        }

        Ok(())
    }

    pub fn from_yaml(text: &str) -> Result<Self, serde_yaml::Error> {
        serde_yaml::from_str(text)
    }

    pub fn from_json(text: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(text)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_is_valid() {
        let config = AnalysisConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.positions.eps, 800.0);
        assert_eq!(config.builds.time_window_ms, 360_000);
    }

    #[test]
    fn test_negative_eps_rejected() {
        let mut config = AnalysisConfig::default();
        config.positions.eps = -5.0;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonPositive {
                field: "positions.eps",
                value: -5.0
            })
        );
    }

    #[test]
    fn test_nan_eps_rejected() {
        let mut config = AnalysisConfig::default();
        config.positions.eps = f64::NAN;
        assert_eq!(
            config.validate(),
            Err(ConfigError::NonFinite {
                field: "positions.eps"
            })
        );
    }

    #[test]
    fn test_zero_counts_rejected() {
        let mut config = AnalysisConfig::default();
        config.builds.min_cluster_size = 0;
        assert!(matches!(
            config.validate(),
            Err(ConfigError::ZeroCount { .. })
        ));

        let mut config = AnalysisConfig::default();
        config.positions.min_samples = 0;
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_inverted_skill_thresholds_rejected() {
        let mut config = AnalysisConfig::default();
        config.overview.mid_skill_threshold = 40.0;
        assert_eq!(config.validate(), Err(ConfigError::InvertedThresholds));
    }

    #[test]
    fn test_merge_tolerance_falls_back_to_eps() {
        let mut positions = PositionClusteringConfig::default();
        assert_eq!(positions.effective_merge_tolerance(), 800.0);
        positions.merge_tolerance = Some(1200.0);
        assert_eq!(positions.effective_merge_tolerance(), 1200.0);
    }

    #[test]
    fn test_partial_yaml_keeps_defaults() {
        let yaml = r#"
positions:
  eps: 650
builds:
  max_clusters: 8
  costs:
    token_mismatch: 2.0
"#;
        let config = AnalysisConfig::from_yaml(yaml).unwrap();
        assert_eq!(config.positions.eps, 650.0);
        assert_eq!(config.positions.min_samples, 3);
        assert_eq!(config.builds.max_clusters, 8);
        assert_eq!(config.builds.min_cluster_size, 5);
        assert_eq!(config.builds.costs.token_mismatch, 2.0);
        assert_eq!(config.builds.costs.indel, 1.0);
        assert_eq!(config.map.size, DEFAULT_MAP_SIZE);
    }

    #[test]
    fn test_json_config() {
        let config =
            AnalysisConfig::from_json(r#"{"builds": {"time_window_ms": 120000}}"#).unwrap();
        assert_eq!(config.builds.time_window_ms, 120_000);
        assert!(config.validate().is_ok());
    }
}
