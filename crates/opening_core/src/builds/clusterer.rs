//! # Build Clusterer
//!
//! Groups one position's qualifying sequences into archetypes.
//!
//! Identical sequences are folded into one weighted item first, so a position
//! where most players share an opening costs a handful of distance rows rather
//! than a full quadratic matrix. The pairwise matrix over the distinct items is
//! computed in parallel; merging runs sequentially with average linkage.
//! Clusters smaller than `min_cluster_size` are discarded and counted.

use super::agglomerative::agglomerate;
use super::archetype::{medoid, summarize_archetype};
use super::distance::DistanceMatrix;
use crate::config::BuildClusteringConfig;
use crate::error::AnalysisWarning;
use crate::models::{
    BuildArchetype, BuildClusterStatus, BuildStep, NormalizedBuildSequence, PositionBuildSummary,
};
use rustc_hash::FxHashMap;
use tracing::{debug, info};

/// Distinct step lists with the sequences that share each one, in order of
/// first appearance.
#[derive(Debug, Clone, PartialEq)]
pub struct SequenceGroups<'a> {
    pub steps: Vec<&'a [BuildStep]>,
    pub members: Vec<Vec<usize>>,
}

impl SequenceGroups<'_> {
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    pub fn weights(&self) -> Vec<usize> {
        self.members.iter().map(|m| m.len()).collect()
    }
}

pub fn group_identical(sequences: &[NormalizedBuildSequence]) -> SequenceGroups<'_> {
    let mut index: FxHashMap<&[BuildStep], usize> = FxHashMap::default();
    let mut groups = SequenceGroups {
        steps: Vec::new(),
        members: Vec::new(),
    };
    for (i, sequence) in sequences.iter().enumerate() {
        let steps = sequence.steps.as_slice();
        let slot = *index.entry(steps).or_insert_with(|| {
            groups.steps.push(steps);
            groups.members.push(Vec::new());
            groups.steps.len() - 1
        });
        groups.members[slot].push(i);
    }
    groups
}

/// Archetypes and bookkeeping for one position.
#[derive(Debug, Clone, PartialEq)]
pub struct PositionBuilds {
    pub archetypes: Vec<BuildArchetype>,
    pub summary: PositionBuildSummary,
    pub warnings: Vec<AnalysisWarning>,
}

/// Cluster the qualifying sequences of one position.
///
/// # Arguments
/// * `sequences` - Qualifying (non-empty) sequences routed to this position
/// * `total_builds` - Build records routed here, including empty ones
/// * `excluded_empty` - Routed records with nothing inside the window
/// * `top_examples` - Examples listed per archetype
///
/// Archetypes come back ordered by member count, largest first, with
/// `archetype_id` equal to that rank.
pub fn cluster_position(
    position_label: &str,
    sequences: &[NormalizedBuildSequence],
    total_builds: usize,
    excluded_empty: usize,
    config: &BuildClusteringConfig,
    top_examples: usize,
) -> PositionBuilds {
    let qualifying = sequences.len();
    let mut summary = PositionBuildSummary {
        position_label: position_label.to_string(),
        total_builds,
        qualifying,
        excluded_empty,
        discarded_members: 0,
        archetype_count: 0,
        status: BuildClusterStatus::Clustered,
    };

    if qualifying == 0 {
        info!("{}: no qualifying build sequences", position_label);
        summary.status = BuildClusterStatus::InsufficientData;
        return PositionBuilds {
            archetypes: Vec::new(),
            summary,
            warnings: vec![AnalysisWarning::InsufficientBuilds {
                position_label: position_label.to_string(),
                qualifying,
            }],
        };
    }

    let groups = group_identical(sequences);
    let weights = groups.weights();
    let matrix = DistanceMatrix::compute(&groups.steps, &config.costs);
    debug!(
        "{}: {} sequences, {} distinct",
        position_label,
        qualifying,
        groups.len()
    );

    let clusters = agglomerate(&matrix, &weights, config.max_clusters, config.stop_distance);

    struct Retained<'a> {
        medoid: usize,
        total_distance: f64,
        members: Vec<&'a NormalizedBuildSequence>,
    }

    let mut retained: Vec<Retained> = Vec::new();
    for cluster in &clusters {
        let size: usize = cluster.iter().map(|&item| weights[item]).sum();
        if size < config.min_cluster_size {
            summary.discarded_members += size;
            continue;
        }
        let Some((medoid_item, total_distance)) = medoid(cluster, &weights, &matrix) else {
            continue;
        };
        let mut indices: Vec<usize> = cluster
            .iter()
            .flat_map(|&item| groups.members[item].iter().copied())
            .collect();
        indices.sort_unstable();
        retained.push(Retained {
            medoid: medoid_item,
            total_distance,
            members: indices.into_iter().map(|i| &sequences[i]).collect(),
        });
    }

    // Stable: equal sizes keep first-appearance order
    retained.sort_by(|a, b| b.members.len().cmp(&a.members.len()));

    let archetypes: Vec<BuildArchetype> = retained
        .into_iter()
        .enumerate()
        .map(|(archetype_id, r)| {
            summarize_archetype(
                position_label,
                archetype_id,
                groups.steps[r.medoid].to_vec(),
                r.total_distance,
                &r.members,
                qualifying,
                top_examples,
            )
        })
        .collect();

    summary.archetype_count = archetypes.len();
    let mut warnings = Vec::new();
    if archetypes.is_empty() {
        info!(
            "{}: {} sequences, no cluster reached {} members",
            position_label, qualifying, config.min_cluster_size
        );
        warnings.push(AnalysisWarning::NoArchetypes {
            position_label: position_label.to_string(),
            discarded_members: summary.discarded_members,
        });
    } else {
        debug!(
            "{}: {} archetypes, {} members discarded",
            position_label,
            archetypes.len(),
            summary.discarded_members
        );
    }

    PositionBuilds {
        archetypes,
        summary,
        warnings,
    }
}
