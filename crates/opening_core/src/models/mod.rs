//! Data model shared by every stage of the engine.

pub mod build;
pub mod position;
pub mod records;

pub use build::{
    ArchetypeExample, BuildArchetype, BuildClusterStatus, BuildStep, NormalizedBuildSequence,
    PositionBuildSummary,
};
pub use position::{
    ClusterGeometry, MapPoint, NormalizedSpawn, PositionAssignment, PositionCluster, NOISE_LABEL,
    UNLABELED,
};
pub use records::{
    BuildEvent, BuildRecord, RawBuildEvent, RawBuildRecord, RawSpawnRecord, SpawnRecord,
};
