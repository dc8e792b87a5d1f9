//! Build-order data model: collapsed sequences and archetypes.

use serde::{Deserialize, Serialize};
use std::fmt;

/// `run_length` consecutive orders of the same unit.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct BuildStep {
    pub unit_token: String,
    pub run_length: u32,
}

impl BuildStep {
    pub fn new(unit_token: impl Into<String>, run_length: u32) -> Self {
        Self {
            unit_token: unit_token.into(),
            run_length,
        }
    }
}

impl fmt::Display for BuildStep {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        if self.run_length == 1 {
            write!(f, "{}", self.unit_token)
        } else {
            write!(f, "{} x{}", self.unit_token, self.run_length)
        }
    }
}

/// One player's opening at a resolved position, with the provenance the
/// archetype statistics need.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NormalizedBuildSequence {
    pub replay_id: String,
    pub player_id: i64,
    pub position_label: String,
    pub skill: f64,
    pub won_game: bool,
    pub steps: Vec<BuildStep>,
}

impl NormalizedBuildSequence {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }
}

/// High-skill member shown next to an archetype.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ArchetypeExample {
    pub replay_id: String,
    pub player_id: i64,
    pub skill: f64,
    pub won_game: bool,
}

/// A recurring opening for one position.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildArchetype {
    pub position_label: String,
    pub archetype_id: usize,
    pub name: String,
    pub representative_sequence: Vec<BuildStep>,
    pub member_count: usize,
    /// member_count / qualifying sequences at this position
    pub share: f64,
    pub avg_skill: f64,
    pub win_rate: f64,
    /// Summed distance from the representative to every other member.
    pub medoid_total_distance: f64,
    pub examples: Vec<ArchetypeExample>,
}

impl BuildArchetype {
    /// "MetalExtractor x3 → WindTurbine x2"
    pub fn opening_summary(&self, max_steps: usize) -> String {
        self.representative_sequence
            .iter()
            .take(max_steps)
            .map(|s| s.to_string())
            .collect::<Vec<_>>()
            .join(" → ")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BuildClusterStatus {
    Clustered,
    InsufficientData,
}

/// Bookkeeping for one position's build analysis.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionBuildSummary {
    pub position_label: String,
    /// Build records routed to this position.
    pub total_builds: usize,
    pub qualifying: usize,
    /// Records with no event inside the window.
    pub excluded_empty: usize,
    /// Members of clusters below `min_cluster_size`.
    pub discarded_members: usize,
    pub archetype_count: usize,
    pub status: BuildClusterStatus,
}
