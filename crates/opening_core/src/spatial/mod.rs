//! # Spatial Stages
//!
//! Spawn coordinates to named map positions.
//!
//! - `normalize` - fold both teams into the canonical half of the map
//! - `dbscan` - density clustering of normalized spawns
//! - `labeler` - match cluster centroids to template slots
//! - `assign` - cluster records and per-spawn assignments

pub mod assign;
pub mod dbscan;
pub mod labeler;
pub mod normalize;

pub use assign::{assign_positions, build_position_clusters};
pub use dbscan::{dbscan, DensityClustering};
pub use labeler::{cluster_geometry, distance_to_front, label_clusters, ClusterLabel, Labeling};
pub use normalize::{fold, normalize, normalize_spawns};
