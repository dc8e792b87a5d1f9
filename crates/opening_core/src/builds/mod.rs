//! # Build Stages
//!
//! Per-position opening analysis.
//!
//! - `sequence` - window, order and run-length collapse of raw build logs
//! - `distance` - weighted edit distance and the pairwise matrix
//! - `agglomerative` - average-linkage merging
//! - `archetype` - medoid and membership statistics
//! - `clusterer` - one position end to end

pub mod agglomerative;
pub mod archetype;
pub mod clusterer;
pub mod distance;
pub mod sequence;

pub use agglomerative::agglomerate;
pub use archetype::{archetype_name, medoid, summarize_archetype};
pub use clusterer::{cluster_position, group_identical, PositionBuilds, SequenceGroups};
pub use distance::{edit_distance, sequence_distance, DistanceMatrix};
pub use sequence::{collapse_runs, normalize_build, normalize_steps, windowed_events};
