//! Per-position and run-wide statistics.
//!
//! Assignments are counted under their resolved label, so noise spawns that
//! were routed to their nearest position count there too.

use crate::config::OverviewConfig;
use crate::data::PositionTemplate;
use crate::models::{BuildArchetype, PositionAssignment};
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};

/// Spawns in one skill band and how often they won.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SkillTier {
    pub spawns: usize,
    /// None when the tier is empty.
    pub win_rate: Option<f64>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionOverview {
    pub position_label: String,
    pub spawns: usize,
    pub noise_spawns: usize,
    pub unique_players: usize,
    pub games: usize,
    pub win_rate: f64,
    pub avg_skill: f64,
    /// skill >= high_skill_threshold
    pub high_skill: SkillTier,
    /// mid_skill_threshold <= skill < high_skill_threshold
    pub mid_skill: SkillTier,
    pub low_skill: SkillTier,
    pub archetype_count: usize,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunSummary {
    pub total_spawns: usize,
    pub noise_spawns: usize,
    pub total_games: usize,
    pub total_players: usize,
    pub avg_skill: f64,
    /// Positions with at least one assigned spawn.
    pub positions: usize,
    pub archetypes: usize,
}

#[derive(Default)]
struct TierCounter {
    spawns: usize,
    wins: usize,
}

impl TierCounter {
    fn add(&mut self, won: bool) {
        self.spawns += 1;
        if won {
            self.wins += 1;
        }
    }

    fn finish(&self) -> SkillTier {
        SkillTier {
            spawns: self.spawns,
            win_rate: (self.spawns > 0).then(|| self.wins as f64 / self.spawns as f64),
        }
    }
}

#[derive(Default)]
struct Accumulator<'a> {
    spawns: usize,
    noise: usize,
    wins: usize,
    skill_sum: f64,
    players: FxHashSet<i64>,
    games: FxHashSet<&'a str>,
    high: TierCounter,
    mid: TierCounter,
    low: TierCounter,
}

/// One overview per template label that received spawns, in template order.
pub fn position_overview(
    assignments: &[PositionAssignment],
    archetypes: &[BuildArchetype],
    template: &PositionTemplate,
    config: &OverviewConfig,
) -> Vec<PositionOverview> {
    let mut by_label: FxHashMap<&str, Accumulator> = FxHashMap::default();
    for a in assignments.iter().filter(|a| a.is_routable()) {
        let acc = by_label.entry(a.position_label.as_str()).or_default();
        acc.spawns += 1;
        if a.is_noise {
            acc.noise += 1;
        }
        if a.won_game {
            acc.wins += 1;
        }
        acc.skill_sum += a.skill;
        acc.players.insert(a.player_id);
        acc.games.insert(a.replay_id.as_str());

        let tier = if a.skill >= config.high_skill_threshold {
            &mut acc.high
        } else if a.skill >= config.mid_skill_threshold {
            &mut acc.mid
        } else {
            &mut acc.low
        };
        tier.add(a.won_game);
    }

    let mut archetype_counts: FxHashMap<&str, usize> = FxHashMap::default();
    for archetype in archetypes {
        *archetype_counts
            .entry(archetype.position_label.as_str())
            .or_insert(0) += 1;
    }

    template
        .labels()
        .filter_map(|label| {
            let acc = by_label.get(label)?;
            let n = acc.spawns as f64;
            Some(PositionOverview {
                position_label: label.to_string(),
                spawns: acc.spawns,
                noise_spawns: acc.noise,
                unique_players: acc.players.len(),
                games: acc.games.len(),
                win_rate: acc.wins as f64 / n,
                avg_skill: acc.skill_sum / n,
                high_skill: acc.high.finish(),
                mid_skill: acc.mid.finish(),
                low_skill: acc.low.finish(),
                archetype_count: archetype_counts.get(label).copied().unwrap_or(0),
            })
        })
        .collect()
}

pub fn run_summary(assignments: &[PositionAssignment], archetypes: &[BuildArchetype]) -> RunSummary {
    let games: FxHashSet<&str> = assignments.iter().map(|a| a.replay_id.as_str()).collect();
    let players: FxHashSet<i64> = assignments.iter().map(|a| a.player_id).collect();
    let positions: FxHashSet<&str> = assignments
        .iter()
        .filter(|a| a.is_routable())
        .map(|a| a.position_label.as_str())
        .collect();
    let skill_sum: f64 = assignments.iter().map(|a| a.skill).sum();

    RunSummary {
        total_spawns: assignments.len(),
        noise_spawns: assignments.iter().filter(|a| a.is_noise).count(),
        total_games: games.len(),
        total_players: players.len(),
        avg_skill: if assignments.is_empty() {
            0.0
        } else {
            skill_sum / assignments.len() as f64
        },
        positions: positions.len(),
        archetypes: archetypes.len(),
    }
}
