//! # opening_core - Spawn Position and Opening Build Clustering
//!
//! Offline analysis of parsed replay data for a two-team RTS map.
//!
//! ## Stages
//! - Coordinate normalization (fold team 1 onto team 0's half)
//! - DBSCAN over normalized spawns, then template labeling of clusters
//! - Build order windowing and run-length collapse
//! - Per-position agglomerative clustering of openings
//! - Archetype summaries (medoid, win rate, skill)
//!
//! ## Features
//! - Deterministic: identical inputs give identical artifacts
//! - Malformed records are skipped and counted, never fatal
//! - Embedded map templates, YAML/JSON configuration

pub mod builds;
pub mod config;
pub mod data;
pub mod error;
pub mod ingest;
pub mod models;
pub mod overview;
pub mod pipeline;
pub mod spatial;

pub use config::{
    AnalysisConfig, BuildClusteringConfig, EditCosts, MapSpec, OverviewConfig,
    PositionClusteringConfig,
};
pub use data::{PositionTemplate, TemplateSlot};
pub use error::{AnalysisError, AnalysisWarning, ConfigError, RecordError, Result};
pub use ingest::{IngestStats, RecordKind};
pub use models::{
    ArchetypeExample, BuildArchetype, BuildClusterStatus, BuildEvent, BuildRecord, BuildStep,
    NormalizedBuildSequence, PositionAssignment, PositionBuildSummary, PositionCluster,
    RawBuildRecord, RawSpawnRecord, SpawnRecord,
};
pub use overview::{PositionOverview, RunSummary, SkillTier};
pub use pipeline::{analyze, cluster_positions, AnalysisReport, PositionReport};

/// Library version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Version of the JSON artifacts written from an [`AnalysisReport`].
pub const SCHEMA_VERSION: u32 = 1;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version() {
        assert!(!VERSION.is_empty());
    }

    #[test]
    fn test_default_template_is_valid() {
        let template = PositionTemplate::supreme_isthmus().unwrap();
        assert_eq!(template.len(), 8);
        assert!(template.validate().is_ok());
        assert!(AnalysisConfig::default().validate().is_ok());
    }
}
