//! Spatial data model: normalised spawns, position clusters, assignments.

use super::records::SpawnRecord;
use serde::{Deserialize, Serialize};

/// Label for spawns that no dense region reached.
pub const NOISE_LABEL: &str = "noise";
/// Label for clusters that could not be matched to a template slot.
pub const UNLABELED: &str = "unlabeled";

/// A point in map units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct MapPoint {
    pub x: f64,
    pub z: f64,
}

impl MapPoint {
    pub fn new(x: f64, z: f64) -> Self {
        Self { x, z }
    }

    pub fn distance(&self, other: &MapPoint) -> f64 {
        ((self.x - other.x).powi(2) + (self.z - other.z).powi(2)).sqrt()
    }

    /// Arithmetic mean of `points`; `None` for an empty input.
    pub fn mean<'a>(points: impl IntoIterator<Item = &'a MapPoint>) -> Option<MapPoint> {
        let mut sum_x = 0.0;
        let mut sum_z = 0.0;
        let mut n = 0usize;
        for p in points {
            sum_x += p.x;
            sum_z += p.z;
            n += 1;
        }
        if n == 0 {
            return None;
        }
        Some(MapPoint::new(sum_x / n as f64, sum_z / n as f64))
    }
}

/// Spawn folded into the canonical half of the map.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedSpawn {
    #[serde(flatten)]
    pub record: SpawnRecord,
    pub nx: f64,
    pub nz: f64,
}

impl NormalizedSpawn {
    pub fn point(&self) -> MapPoint {
        MapPoint::new(self.nx, self.nz)
    }
}

/// Geometric features the labeler computes per centroid.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct ClusterGeometry {
    pub dist_from_center: f64,
    /// Distance to the x = z symmetry axis (the front line).
    pub dist_from_front: f64,
    /// Distance to the closest other centroid; `None` for a lone cluster.
    pub nearest_neighbor_dist: Option<f64>,
}

/// One raw density cluster after labeling.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionCluster {
    /// `None` for the noise pseudo-cluster.
    pub raw_cluster_id: Option<usize>,
    pub label: String,
    pub centroid: MapPoint,
    pub member_count: usize,
    pub geometry: ClusterGeometry,
    /// Raw cluster whose label this surplus cluster adopted.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub merged_into: Option<usize>,
    pub unique_players: usize,
    pub games: usize,
    pub avg_skill: f64,
}

impl PositionCluster {
    pub fn is_noise(&self) -> bool {
        self.raw_cluster_id.is_none()
    }

    /// Labeled clusters take part in build analysis.
    pub fn is_labeled(&self) -> bool {
        !self.is_noise() && self.label != UNLABELED
    }
}

/// Resolved position of one input spawn.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionAssignment {
    pub replay_id: String,
    pub player_id: i64,
    pub team_id: u8,
    pub position_label: String,
    pub distance_from_centroid: f64,
    pub raw_cluster_id: Option<usize>,
    /// Excluded from centroid computation; label is nearest-centroid best effort.
    pub is_noise: bool,
    pub nx: f64,
    pub nz: f64,
    pub skill: f64,
    pub won_game: bool,
}

impl PositionAssignment {
    pub fn key(&self) -> (&str, i64) {
        (self.replay_id.as_str(), self.player_id)
    }

    pub fn is_routable(&self) -> bool {
        self.position_label != UNLABELED && self.position_label != NOISE_LABEL
    }
}
