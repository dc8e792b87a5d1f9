//! # Archetype Summarizer
//!
//! Turns one retained build cluster into a [`BuildArchetype`]: the medoid as
//! representative opening plus membership statistics.

use super::distance::DistanceMatrix;
use crate::models::{ArchetypeExample, BuildArchetype, BuildStep, NormalizedBuildSequence};
use std::cmp::Ordering;

/// Display name for an archetype, e.g. `front-1_archetype_0`.
pub fn archetype_name(position_label: &str, archetype_id: usize) -> String {
    format!("{}_archetype_{}", position_label, archetype_id)
}

/// Item of `cluster` with the smallest weighted distance sum to the rest.
///
/// `weights[i]` counts how many members item `i` stands for. Ties go to the
/// lowest item index. Returns `(item, total_distance)`.
pub fn medoid(cluster: &[usize], weights: &[usize], matrix: &DistanceMatrix) -> Option<(usize, f64)> {
    let mut best: Option<(usize, f64)> = None;
    for &candidate in cluster {
        let total: f64 = cluster
            .iter()
            .map(|&other| weights[other] as f64 * matrix.get(candidate, other))
            .sum();
        let better = match best {
            None => true,
            Some((item, best_total)) => match total.total_cmp(&best_total) {
                Ordering::Less => true,
                Ordering::Equal => candidate < item,
                Ordering::Greater => false,
            },
        };
        if better {
            best = Some((candidate, total));
        }
    }
    best
}

/// Highest-skill members first; equal skill keeps member order.
pub fn top_examples(members: &[&NormalizedBuildSequence], limit: usize) -> Vec<ArchetypeExample> {
    let mut ranked: Vec<&NormalizedBuildSequence> = members.to_vec();
    ranked.sort_by(|a, b| b.skill.total_cmp(&a.skill));
    ranked
        .into_iter()
        .take(limit)
        .map(|s| ArchetypeExample {
            replay_id: s.replay_id.clone(),
            player_id: s.player_id,
            skill: s.skill,
            won_game: s.won_game,
        })
        .collect()
}

/// Assemble an archetype record.
///
/// # Arguments
/// * `representative` - Steps of the medoid sequence
/// * `medoid_total_distance` - Medoid's summed distance to all members
/// * `members` - Every sequence in the cluster (non-empty)
/// * `qualifying` - Qualifying sequences at this position, for `share`
pub fn summarize_archetype(
    position_label: &str,
    archetype_id: usize,
    representative: Vec<BuildStep>,
    medoid_total_distance: f64,
    members: &[&NormalizedBuildSequence],
    qualifying: usize,
    example_limit: usize,
) -> BuildArchetype {
    let member_count = members.len();
    let n = member_count.max(1) as f64;
    let avg_skill = members.iter().map(|s| s.skill).sum::<f64>() / n;
    let wins = members.iter().filter(|s| s.won_game).count();

    BuildArchetype {
        position_label: position_label.to_string(),
        archetype_id,
        name: archetype_name(position_label, archetype_id),
        representative_sequence: representative,
        member_count,
        share: if qualifying == 0 {
            0.0
        } else {
            member_count as f64 / qualifying as f64
        },
        avg_skill,
        win_rate: wins as f64 / n,
        medoid_total_distance,
        examples: top_examples(members, example_limit),
    }
}
