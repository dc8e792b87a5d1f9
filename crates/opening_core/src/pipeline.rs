//! # Analysis Pipeline
//!
//! End-to-end run over one batch of spawn and build records.
//!
//! ## Flow
//! 1. Validate configuration and template (fatal)
//! 2. Validate and normalize spawns (malformed records are skipped)
//! 3. DBSCAN, label, assign
//! 4. Route build records to positions by (replay_id, player_id)
//! 5. Per position, in parallel: normalize, cluster, summarize
//! 6. Overview statistics
//!
//! A run fails only on invalid configuration or when no spawn survives
//! validation. Everything else degrades into skip counts and warnings.

use crate::builds::{cluster_position, normalize_build, PositionBuilds};
use crate::config::AnalysisConfig;
use crate::data::PositionTemplate;
use crate::error::{AnalysisError, AnalysisWarning, RecordError, Result};
use crate::ingest::{IngestStats, RecordKind};
use crate::models::{
    BuildArchetype, BuildRecord, MapPoint, NormalizedBuildSequence, PositionAssignment,
    PositionBuildSummary, PositionCluster, SpawnRecord,
};
use crate::overview::{position_overview, run_summary, PositionOverview, RunSummary};
use crate::spatial::{assign_positions, build_position_clusters, dbscan, label_clusters, normalize_spawns};
use rayon::prelude::*;
use rustc_hash::{FxHashMap, FxHashSet};
use serde::{Deserialize, Serialize};
use tracing::{debug, info, warn};

/// Position artifacts only.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PositionReport {
    /// Template order, noise pseudo-cluster last.
    pub clusters: Vec<PositionCluster>,
    /// One per valid spawn, in input order.
    pub assignments: Vec<PositionAssignment>,
    pub ingest: IngestStats,
    pub warnings: Vec<AnalysisWarning>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisReport {
    pub position_clusters: Vec<PositionCluster>,
    pub assignments: Vec<PositionAssignment>,
    /// Grouped by position in template order, largest archetype first.
    pub archetypes: Vec<BuildArchetype>,
    pub build_summaries: Vec<PositionBuildSummary>,
    pub overview: Vec<PositionOverview>,
    pub summary: RunSummary,
    pub ingest: IngestStats,
    pub warnings: Vec<AnalysisWarning>,
}

fn validate_inputs(config: &AnalysisConfig, template: &PositionTemplate) -> Result<()> {
    config.validate()?;
    template.validate()?;
    Ok(())
}

/// Normalize, cluster, label and assign spawns.
pub fn cluster_positions(
    spawns: Vec<SpawnRecord>,
    config: &AnalysisConfig,
    template: &PositionTemplate,
) -> Result<PositionReport> {
    validate_inputs(config, template)?;

    let mut ingest = IngestStats::new();
    let normalized = normalize_spawns(spawns, &config.map, &mut ingest);
    if normalized.is_empty() {
        return Err(AnalysisError::NoUsableData {
            reason: format!(
                "none of {} spawn records passed validation",
                ingest.spawns_read
            ),
        });
    }

    let mut warnings = Vec::new();
    let params = &config.positions;
    if normalized.len() < params.min_samples {
        warn!(
            "{} valid spawns, fewer than min_samples {}",
            normalized.len(),
            params.min_samples
        );
        warnings.push(AnalysisWarning::InsufficientSpawns {
            spawns: normalized.len(),
            min_samples: params.min_samples,
        });
    }

    let points: Vec<MapPoint> = normalized.iter().map(|s| s.point()).collect();
    let clustering = dbscan(&points, params.eps, params.min_samples);
    info!(
        "DBSCAN: {} spawns -> {} clusters, {} noise",
        normalized.len(),
        clustering.cluster_count(),
        clustering.noise_count()
    );

    let labeling = label_clusters(
        &clustering.centroids,
        &clustering.member_counts,
        template,
        &config.map,
        params.effective_merge_tolerance(),
    );
    warnings.extend(labeling.warnings());

    let clusters = build_position_clusters(&normalized, &clustering, &labeling, template, &config.map);
    let assignments = assign_positions(&normalized, &clustering, &labeling);

    Ok(PositionReport {
        clusters,
        assignments,
        ingest,
        warnings,
    })
}

/// Build records grouped under the position their player was assigned.
#[derive(Default)]
struct RoutedBuilds {
    total: usize,
    excluded_empty: usize,
    sequences: Vec<NormalizedBuildSequence>,
}

fn route_builds(
    builds: &[BuildRecord],
    assignments: &[PositionAssignment],
    config: &AnalysisConfig,
    ingest: &mut IngestStats,
) -> FxHashMap<String, RoutedBuilds> {
    let index: FxHashMap<(&str, i64), &PositionAssignment> = assignments
        .iter()
        .filter(|a| a.is_routable())
        .map(|a| (a.key(), a))
        .collect();

    let mut seen: FxHashSet<(&str, i64)> = FxHashSet::default();
    let mut routed: FxHashMap<String, RoutedBuilds> = FxHashMap::default();
    for record in builds {
        ingest.record_read(RecordKind::Build);
        if !seen.insert(record.key()) {
            let err = RecordError::Duplicate {
                replay_id: record.replay_id.clone(),
                player_id: record.player_id,
            };
            debug!("Skipping build: {}", err);
            ingest.record_skip(RecordKind::Build, &err);
            continue;
        }

        let Some(assignment) = index.get(&record.key()) else {
            ingest.builds_unrouted += 1;
            continue;
        };

        let bucket = routed.entry(assignment.position_label.clone()).or_default();
        bucket.total += 1;
        match normalize_build(record, assignment, &config.builds) {
            Some(sequence) => bucket.sequences.push(sequence),
            None => bucket.excluded_empty += 1,
        }
    }

    if ingest.builds_unrouted > 0 {
        debug!("{} build records had no routable position", ingest.builds_unrouted);
    }
    routed
}

/// Full run: positions, then build archetypes for every labeled position.
pub fn analyze(
    spawns: Vec<SpawnRecord>,
    builds: Vec<BuildRecord>,
    config: &AnalysisConfig,
    template: &PositionTemplate,
) -> Result<AnalysisReport> {
    let PositionReport {
        clusters,
        assignments,
        mut ingest,
        mut warnings,
    } = cluster_positions(spawns, config, template)?;

    let mut routed = route_builds(&builds, &assignments, config, &mut ingest);

    // Labeled positions present in this run, in template order
    let labels: Vec<&str> = template
        .labels()
        .filter(|label| clusters.iter().any(|c| c.label == *label))
        .collect();

    let inputs: Vec<(&str, RoutedBuilds)> = labels
        .iter()
        .map(|&label| (label, routed.remove(label).unwrap_or_default()))
        .collect();

    let per_position: Vec<PositionBuilds> = inputs
        .par_iter()
        .map(|(label, bucket)| {
            cluster_position(
                label,
                &bucket.sequences,
                bucket.total,
                bucket.excluded_empty,
                &config.builds,
                config.overview.top_examples,
            )
        })
        .collect();

    let mut archetypes = Vec::new();
    let mut build_summaries = Vec::with_capacity(per_position.len());
    for position in per_position {
        archetypes.extend(position.archetypes);
        build_summaries.push(position.summary);
        warnings.extend(position.warnings);
    }

    let overview = position_overview(&assignments, &archetypes, template, &config.overview);
    let summary = run_summary(&assignments, &archetypes);
    info!(
        "Analysis complete: {} positions, {} archetypes, {} records skipped",
        summary.positions,
        summary.archetypes,
        ingest.total_skipped()
    );

    Ok(AnalysisReport {
        position_clusters: clusters,
        assignments,
        archetypes,
        build_summaries,
        overview,
        summary,
        ingest,
        warnings,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::MapSpec;
    use crate::error::ConfigError;
    use crate::models::{BuildClusterStatus, BuildEvent, UNLABELED};
    use rand::{Rng, SeedableRng};
    use rand_chacha::ChaCha8Rng;

    /// Spawns scattered tightly around every template slot, both teams.
    fn synthetic_spawns(template: &PositionTemplate, games: usize, seed: u64) -> Vec<SpawnRecord> {
        let map = MapSpec::default();
        let mut rng = ChaCha8Rng::seed_from_u64(seed);
        let mut spawns = Vec::new();
        for game in 0..games {
            for (slot_index, slot) in template.slots.iter().enumerate() {
                let (x, z) = slot.position(&map);
                for team in 0..2u8 {
                    let jitter_x = rng.gen_range(-150.0..150.0);
                    let jitter_z = rng.gen_range(-150.0..150.0);
                    let (px, pz) = if team == 1 { (z, x) } else { (x, z) };
                    spawns.push(SpawnRecord {
                        replay_id: format!("game-{}", game),
                        player_id: (slot_index * 2 + team as usize) as i64,
                        team_id: team,
                        x: px + jitter_x,
                        z: pz + jitter_z,
                        skill: rng.gen_range(5.0..45.0),
                        won_game: team == (game % 2) as u8,
                    });
                }
            }
        }
        spawns
    }

    fn opening_for(slot_index: usize) -> Vec<BuildEvent> {
        let (first, second) = if slot_index % 2 == 0 {
            ("ArmMex", "ArmWin")
        } else {
            ("ArmLab", "ArmCk")
        };
        let mut events: Vec<BuildEvent> = (0..3)
            .map(|i| BuildEvent::new(i * 10_000, first))
            .collect();
        events.push(BuildEvent::new(40_000, second));
        events.push(BuildEvent::new(500_000, "ArmFus"));
        events
    }

    fn builds_for(spawns: &[SpawnRecord]) -> Vec<BuildRecord> {
        spawns
            .iter()
            .map(|s| BuildRecord {
                replay_id: s.replay_id.clone(),
                player_id: s.player_id,
                events: opening_for(s.player_id as usize / 2),
            })
            .collect()
    }

    #[test]
    fn test_recovers_every_template_position() {
        let template = PositionTemplate::supreme_isthmus().unwrap();
        let spawns = synthetic_spawns(&template, 6, 11);
        let report = cluster_positions(spawns.clone(), &AnalysisConfig::default(), &template).unwrap();

        assert_eq!(report.assignments.len(), spawns.len());
        let labels: Vec<&str> = report.clusters.iter().map(|c| c.label.as_str()).collect();
        let expected: Vec<&str> = template.labels().collect();
        assert_eq!(labels, expected);
        assert!(report.warnings.is_empty(), "{:?}", report.warnings);

        // Both teams' players at one slot share a label
        for pair in report.assignments.chunks(2) {
            assert_eq!(pair[0].position_label, pair[1].position_label);
        }
        for (i, slot) in template.slots.iter().enumerate() {
            assert_eq!(report.assignments[i * 2].position_label, slot.label);
        }
    }

    #[test]
    fn test_end_to_end_archetypes() {
        let template = PositionTemplate::supreme_isthmus().unwrap();
        let spawns = synthetic_spawns(&template, 5, 3);
        let builds = builds_for(&spawns);
        let report = analyze(spawns, builds, &AnalysisConfig::default(), &template).unwrap();

        assert_eq!(report.build_summaries.len(), template.len());
        assert_eq!(report.archetypes.len(), template.len());
        for summary in &report.build_summaries {
            assert_eq!(summary.qualifying, 10);
            assert_eq!(summary.archetype_count, 1);
            assert_eq!(summary.status, BuildClusterStatus::Clustered);
        }
        let geo = report
            .archetypes
            .iter()
            .find(|a| a.position_label == "geo")
            .unwrap();
        assert_eq!(geo.member_count, 10);
        assert_eq!(geo.win_rate, 0.5);
        assert_eq!(geo.opening_summary(5), "ArmMex x3 → ArmWin");
        assert_eq!(report.summary.archetypes, template.len());
        assert_eq!(report.overview.len(), template.len());
        assert_eq!(report.ingest.builds_read as usize, report.assignments.len());
    }

    #[test]
    fn test_unmatched_builds_are_counted() {
        let template = PositionTemplate::supreme_isthmus().unwrap();
        let spawns = synthetic_spawns(&template, 3, 5);
        let mut builds = builds_for(&spawns);
        builds.push(BuildRecord {
            replay_id: "unknown".to_string(),
            player_id: 99,
            events: vec![BuildEvent::new(0, "ArmMex")],
        });
        builds.push(builds[0].clone());

        let report = analyze(spawns, builds, &AnalysisConfig::default(), &template).unwrap();
        assert_eq!(report.ingest.builds_unrouted, 1);
        assert_eq!(report.ingest.builds_skipped, 1);
        assert_eq!(report.ingest.skipped_by_reason["duplicate"], 1);
    }

    #[test]
    fn test_builds_in_unlabeled_cluster_are_not_routed() {
        let template = PositionTemplate::supreme_isthmus().unwrap();
        let mut spawns = synthetic_spawns(&template, 5, 23);
        let mut builds = builds_for(&spawns);

        // A ninth dense group far from every slot and every labeled cluster
        let mut rng = ChaCha8Rng::seed_from_u64(29);
        for i in 0..6 {
            let spawn = SpawnRecord {
                replay_id: "stray".to_string(),
                player_id: 100 + i,
                team_id: 0,
                x: 1200.0 + rng.gen_range(-100.0..100.0),
                z: 11_000.0 + rng.gen_range(-100.0..100.0),
                skill: 20.0,
                won_game: true,
            };
            builds.push(BuildRecord {
                replay_id: spawn.replay_id.clone(),
                player_id: spawn.player_id,
                events: vec![BuildEvent::new(0, "ArmMex"), BuildEvent::new(10_000, "ArmVp")],
            });
            spawns.push(spawn);
        }

        let report = analyze(spawns, builds, &AnalysisConfig::default(), &template).unwrap();

        let stray: Vec<&PositionAssignment> = report
            .assignments
            .iter()
            .filter(|a| a.replay_id == "stray")
            .collect();
        assert_eq!(stray.len(), 6);
        assert!(stray
            .iter()
            .all(|a| a.position_label == UNLABELED && !a.is_noise));
        assert!(report.warnings.iter().any(|w| matches!(
            w,
            AnalysisWarning::SurplusClusters { merged, unlabeled }
                if merged.is_empty() && unlabeled.len() == 1
        )));

        assert_eq!(report.ingest.builds_unrouted, 6);
        assert_eq!(report.archetypes.len(), template.len());
        assert!(report.archetypes.iter().all(|a| a.position_label != UNLABELED));
        assert!(report.archetypes.iter().all(|a| a.member_count == 10));
        assert!(report
            .build_summaries
            .iter()
            .all(|s| s.position_label != UNLABELED && s.total_builds == 10));
    }

    #[test]
    fn test_tiny_eps_is_accepted_and_clusters() {
        let template = PositionTemplate::supreme_isthmus().unwrap();
        let mut config = AnalysisConfig::default();
        config.positions.eps = 1e-16;
        assert!(config.validate().is_ok());

        let spawns: Vec<SpawnRecord> = (0..3)
            .map(|i| SpawnRecord {
                replay_id: "r".to_string(),
                player_id: i,
                team_id: 0,
                x: 12_000.0,
                z: 100.0,
                skill: 10.0,
                won_game: false,
            })
            .collect();
        let report = cluster_positions(spawns, &config, &template).unwrap();

        assert_eq!(report.assignments.len(), 3);
        assert!(report.assignments.iter().all(|a| !a.is_noise));
    }

    #[test]
    fn test_invalid_config_is_fatal() {
        let template = PositionTemplate::supreme_isthmus().unwrap();
        let mut config = AnalysisConfig::default();
        config.positions.eps = 0.0;

        let err = analyze(Vec::new(), Vec::new(), &config, &template).unwrap_err();
        assert!(matches!(
            err,
            AnalysisError::Config(ConfigError::NonPositive { field: "positions.eps", .. })
        ));
    }

    #[test]
    fn test_no_valid_spawns_is_fatal() {
        let template = PositionTemplate::supreme_isthmus().unwrap();
        let bad = SpawnRecord {
            replay_id: "r".to_string(),
            player_id: 1,
            team_id: 3,
            x: 100.0,
            z: 100.0,
            skill: 10.0,
            won_game: false,
        };
        let err = cluster_positions(vec![bad], &AnalysisConfig::default(), &template).unwrap_err();
        assert!(matches!(err, AnalysisError::NoUsableData { .. }));
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_sparse_spawns_warn_and_stay_unlabeled() {
        let template = PositionTemplate::supreme_isthmus().unwrap();
        let spawns = vec![SpawnRecord {
            replay_id: "r".to_string(),
            player_id: 1,
            team_id: 0,
            x: 6000.0,
            z: 2000.0,
            skill: 10.0,
            won_game: true,
        }];
        let report = analyze(spawns, Vec::new(), &AnalysisConfig::default(), &template).unwrap();

        assert_eq!(report.assignments[0].position_label, UNLABELED);
        assert!(report.archetypes.is_empty());
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, AnalysisWarning::InsufficientSpawns { spawns: 1, .. })));
        assert!(report
            .warnings
            .iter()
            .any(|w| matches!(w, AnalysisWarning::MissingLabels { labels } if labels.len() == 8)));
    }

    #[test]
    fn test_repeat_runs_are_identical() {
        let template = PositionTemplate::supreme_isthmus().unwrap();
        let spawns = synthetic_spawns(&template, 4, 17);
        let builds = builds_for(&spawns);
        let config = AnalysisConfig::default();

        let first = analyze(spawns.clone(), builds.clone(), &config, &template).unwrap();
        let second = analyze(spawns, builds, &config, &template).unwrap();
        assert_eq!(first, second);
    }
}
