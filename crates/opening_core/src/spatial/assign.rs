//! Position artifacts: one record per cluster, one assignment per spawn.

use super::dbscan::DensityClustering;
use super::labeler::{point_geometry, template_order, Labeling};
use crate::config::MapSpec;
use crate::data::PositionTemplate;
use crate::models::{
    MapPoint, NormalizedSpawn, PositionAssignment, PositionCluster, NOISE_LABEL, UNLABELED,
};
use rustc_hash::FxHashSet;

struct MemberStats {
    unique_players: usize,
    games: usize,
    avg_skill: f64,
}

fn member_stats<'a>(members: impl Iterator<Item = &'a NormalizedSpawn>) -> MemberStats {
    let mut players: FxHashSet<i64> = FxHashSet::default();
    let mut games: FxHashSet<&str> = FxHashSet::default();
    let mut skill_sum = 0.0;
    let mut n = 0usize;
    for spawn in members {
        players.insert(spawn.record.player_id);
        games.insert(spawn.record.replay_id.as_str());
        skill_sum += spawn.record.skill;
        n += 1;
    }
    MemberStats {
        unique_players: players.len(),
        games: games.len(),
        avg_skill: if n == 0 { 0.0 } else { skill_sum / n as f64 },
    }
}

/// Cluster records in template order, followed by a noise pseudo-cluster when
/// any spawn was left unclustered.
pub fn build_position_clusters(
    spawns: &[NormalizedSpawn],
    clustering: &DensityClustering,
    labeling: &Labeling,
    template: &PositionTemplate,
    map: &MapSpec,
) -> Vec<PositionCluster> {
    let members = clustering.members();
    let mut records: Vec<PositionCluster> = template_order(labeling, template)
        .into_iter()
        .map(|cluster| {
            let stats = member_stats(members[cluster].iter().map(|&i| &spawns[i]));
            PositionCluster {
                raw_cluster_id: Some(cluster),
                label: labeling.clusters[cluster].label.clone(),
                centroid: clustering.centroids[cluster],
                member_count: clustering.member_counts[cluster],
                geometry: labeling.geometry[cluster],
                merged_into: labeling.clusters[cluster].merged_into,
                unique_players: stats.unique_players,
                games: stats.games,
                avg_skill: stats.avg_skill,
            }
        })
        .collect();

    let noise: Vec<&NormalizedSpawn> = spawns
        .iter()
        .zip(&clustering.labels)
        .filter(|(_, label)| label.is_none())
        .map(|(spawn, _)| spawn)
        .collect();
    let noise_points: Vec<MapPoint> = noise.iter().map(|s| s.point()).collect();
    if let Some(centroid) = MapPoint::mean(&noise_points) {
        let stats = member_stats(noise.iter().copied());
        records.push(PositionCluster {
            raw_cluster_id: None,
            label: NOISE_LABEL.to_string(),
            centroid,
            member_count: noise.len(),
            geometry: point_geometry(&centroid, &clustering.centroids, map),
            merged_into: None,
            unique_players: stats.unique_players,
            games: stats.games,
            avg_skill: stats.avg_skill,
        });
    }

    records
}

/// One assignment per spawn, in input order.
///
/// Clustered spawns take their cluster's label and are measured against their
/// own cluster centroid. Noise spawns take the nearest labeled centroid; with
/// no labeled cluster at all they stay [`UNLABELED`] at `f64::MAX`.
pub fn assign_positions(
    spawns: &[NormalizedSpawn],
    clustering: &DensityClustering,
    labeling: &Labeling,
) -> Vec<PositionAssignment> {
    let labeled: Vec<usize> = (0..clustering.cluster_count())
        .filter(|&c| labeling.clusters[c].is_labeled())
        .collect();

    spawns
        .iter()
        .zip(&clustering.labels)
        .map(|(spawn, cluster)| {
            let point = spawn.point();
            let (position_label, distance_from_centroid) = match cluster {
                Some(c) => (
                    labeling.clusters[*c].label.clone(),
                    point.distance(&clustering.centroids[*c]),
                ),
                None => labeled
                    .iter()
                    .map(|&c| (point.distance(&clustering.centroids[c]), c))
                    .min_by(|a, b| a.0.total_cmp(&b.0).then_with(|| a.1.cmp(&b.1)))
                    .map(|(dist, c)| (labeling.clusters[c].label.clone(), dist))
                    .unwrap_or_else(|| (UNLABELED.to_string(), f64::MAX)),
            };

            PositionAssignment {
                replay_id: spawn.record.replay_id.clone(),
                player_id: spawn.record.player_id,
                team_id: spawn.record.team_id,
                position_label,
                distance_from_centroid,
                raw_cluster_id: *cluster,
                is_noise: cluster.is_none(),
                nx: spawn.nx,
                nz: spawn.nz,
                skill: spawn.record.skill,
                won_game: spawn.record.won_game,
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::TemplateSlot;
    use crate::models::SpawnRecord;
    use crate::spatial::dbscan::dbscan;
    use crate::spatial::labeler::label_clusters;
    use crate::spatial::normalize::normalize;

    fn spawn(player: i64, x: f64, z: f64) -> NormalizedSpawn {
        normalize(SpawnRecord {
            replay_id: format!("r{}", player % 3),
            player_id: player,
            team_id: 0,
            x,
            z,
            skill: player as f64,
            won_game: player % 2 == 0,
        })
    }

    fn setup() -> (Vec<NormalizedSpawn>, DensityClustering, Labeling, PositionTemplate, MapSpec) {
        let map = MapSpec::default();
        let template = PositionTemplate {
            map_name: "test".to_string(),
            slots: vec![
                TemplateSlot {
                    label: "east".to_string(),
                    x: 0.8,
                    z: 0.2,
                },
                TemplateSlot {
                    label: "west".to_string(),
                    x: 0.3,
                    z: 0.1,
                },
            ],
        };
        let mut spawns = Vec::new();
        for i in 0..5 {
            spawns.push(spawn(i, 9800.0 + i as f64 * 20.0, 2450.0));
        }
        for i in 5..9 {
            spawns.push(spawn(i, 3700.0, 1200.0 + i as f64 * 10.0));
        }
        spawns.push(spawn(9, 6000.0, 6000.0));

        let points: Vec<MapPoint> = spawns.iter().map(|s| s.point()).collect();
        let clustering = dbscan(&points, 800.0, 3);
        let labeling = label_clusters(
            &clustering.centroids,
            &clustering.member_counts,
            &template,
            &map,
            800.0,
        );
        (spawns, clustering, labeling, template, map)
    }

    #[test]
    fn test_every_spawn_assigned_once() {
        let (spawns, clustering, labeling, _, _) = setup();
        let assignments = assign_positions(&spawns, &clustering, &labeling);
        assert_eq!(assignments.len(), spawns.len());
        for (spawn, assignment) in spawns.iter().zip(&assignments) {
            assert_eq!(spawn.record.key(), assignment.key());
        }
    }

    #[test]
    fn test_noise_gets_nearest_label() {
        let (spawns, clustering, labeling, _, _) = setup();
        let assignments = assign_positions(&spawns, &clustering, &labeling);

        let noise = &assignments[9];
        assert!(noise.is_noise);
        assert_eq!(noise.raw_cluster_id, None);
        assert!(noise.position_label == "east" || noise.position_label == "west");
        assert!(noise.distance_from_centroid > 800.0);

        assert_eq!(assignments[0].position_label, "east");
        assert_eq!(assignments[6].position_label, "west");
        assert!(!assignments[0].is_noise);
        assert!(assignments[0].distance_from_centroid < 100.0);
    }

    #[test]
    fn test_cluster_records_in_template_order_with_noise_last() {
        let (spawns, clustering, labeling, template, map) = setup();
        let records = build_position_clusters(&spawns, &clustering, &labeling, &template, &map);

        assert_eq!(records.len(), 3);
        assert_eq!(records[0].label, "east");
        assert_eq!(records[0].member_count, 5);
        assert_eq!(records[0].unique_players, 5);
        assert_eq!(records[0].games, 3);
        assert_eq!(records[1].label, "west");
        assert_eq!(records[1].member_count, 4);
        assert!(records[2].is_noise());
        assert_eq!(records[2].label, NOISE_LABEL);
        assert_eq!(records[2].member_count, 1);
        assert_eq!(records[2].avg_skill, 9.0);
    }

    #[test]
    fn test_no_clusters_leaves_everything_unlabeled() {
        let spawns = vec![spawn(1, 100.0, 50.0), spawn(2, 9000.0, 50.0)];
        let points: Vec<MapPoint> = spawns.iter().map(|s| s.point()).collect();
        let clustering = dbscan(&points, 800.0, 3);
        let template = PositionTemplate::supreme_isthmus().unwrap();
        let labeling = label_clusters(&[], &[], &template, &MapSpec::default(), 800.0);

        let assignments = assign_positions(&spawns, &clustering, &labeling);
        assert!(assignments
            .iter()
            .all(|a| a.position_label == UNLABELED && a.distance_from_centroid == f64::MAX));
    }
}
