//! # Coordinate Normalizer
//!
//! The map is mirrored across the x = z diagonal: team 1 plays the reflection
//! of team 0's territory. Team 0 coordinates are kept as they are and team 1
//! coordinates are swapped, so both teams' spawns at one logical position land
//! on the same point of the canonical frame.

use crate::config::MapSpec;
use crate::error::RecordError;
use crate::ingest::{IngestStats, RecordKind};
use crate::models::{NormalizedSpawn, SpawnRecord};
use rustc_hash::FxHashSet;
use tracing::debug;

/// Reflect `(x, z)` into the canonical frame for `team_id`.
pub fn fold(team_id: u8, x: f64, z: f64) -> (f64, f64) {
    if team_id == 1 {
        (z, x)
    } else {
        (x, z)
    }
}

/// Pure per-record normalization.
pub fn normalize(record: SpawnRecord) -> NormalizedSpawn {
    let (nx, nz) = fold(record.team_id, record.x, record.z);
    NormalizedSpawn { record, nx, nz }
}

/// Validate and normalize a spawn stream.
///
/// Malformed records and repeated (replay_id, player_id) keys are skipped and
/// counted in `stats`; input order is preserved for everything kept.
pub fn normalize_spawns(
    records: Vec<SpawnRecord>,
    map: &MapSpec,
    stats: &mut IngestStats,
) -> Vec<NormalizedSpawn> {
    let mut seen: FxHashSet<(String, i64)> = FxHashSet::default();
    let mut normalized = Vec::with_capacity(records.len());

    for record in records {
        stats.record_read(RecordKind::Spawn);

        if let Err(err) = record.validate(map) {
            debug!(
                "Skipping spawn {}/{}: {}",
                record.replay_id, record.player_id, err
            );
            stats.record_skip(RecordKind::Spawn, &err);
            continue;
        }

        if !seen.insert((record.replay_id.clone(), record.player_id)) {
            let err = RecordError::Duplicate {
                replay_id: record.replay_id.clone(),
                player_id: record.player_id,
            };
            debug!("Skipping spawn: {}", err);
            stats.record_skip(RecordKind::Spawn, &err);
            continue;
        }

        normalized.push(normalize(record));
    }

    normalized
}

#[cfg(test)]
mod tests {
    use super::*;
    use proptest::prelude::*;

    fn spawn(replay: &str, player: i64, team: u8, x: f64, z: f64) -> SpawnRecord {
        SpawnRecord {
            replay_id: replay.to_string(),
            player_id: player,
            team_id: team,
            x,
            z,
            skill: 20.0,
            won_game: false,
        }
    }

    #[test]
    fn test_mirrored_pair_lands_on_same_point() {
        let a = normalize(spawn("r", 1, 0, 100.0, 200.0));
        let b = normalize(spawn("r", 2, 1, 200.0, 100.0));
        assert_eq!((a.nx, a.nz), (100.0, 200.0));
        assert_eq!((b.nx, b.nz), (100.0, 200.0));
    }

    #[test]
    fn test_team_zero_unchanged() {
        let s = normalize(spawn("r", 1, 0, 9000.0, 3000.0));
        assert_eq!((s.nx, s.nz), (9000.0, 3000.0));
        assert_eq!(s.record.x, 9000.0);
    }

    #[test]
    fn test_malformed_and_duplicate_spawns_counted() {
        let map = MapSpec::default();
        let mut stats = IngestStats::new();
        let records = vec![
            spawn("r", 1, 0, 100.0, 200.0),
            spawn("r", 1, 0, 110.0, 210.0),
            spawn("r", 2, 3, 100.0, 200.0),
            spawn("r", 3, 1, -10.0, 200.0),
            spawn("r", 4, 1, 500.0, 600.0),
        ];

        let normalized = normalize_spawns(records, &map, &mut stats);

        assert_eq!(normalized.len(), 2);
        assert_eq!(normalized[0].record.player_id, 1);
        assert_eq!(normalized[1].record.player_id, 4);
        assert_eq!(stats.spawns_read, 5);
        assert_eq!(stats.spawns_skipped, 3);
        assert_eq!(stats.skipped_by_reason["duplicate"], 1);
        assert_eq!(stats.skipped_by_reason["team_out_of_range"], 1);
        assert_eq!(stats.skipped_by_reason["coordinate_out_of_range"], 1);
    }

    proptest! {
        /// A team 1 spawn and its mirror image played by team 0 fold together.
        #[test]
        fn prop_symmetry_invariance(
            x in 0.0f64..=12288.0,
            z in 0.0f64..=12288.0
        ) {
            let team_one = normalize(spawn("r", 1, 1, x, z));
            let mirrored = normalize(spawn("r", 2, 0, z, x));
            prop_assert_eq!((team_one.nx, team_one.nz), (mirrored.nx, mirrored.nz));
        }

        /// Folding never leaves the map.
        #[test]
        fn prop_fold_stays_in_bounds(
            team in 0u8..=1,
            x in 0.0f64..=12288.0,
            z in 0.0f64..=12288.0
        ) {
            let (nx, nz) = fold(team, x, z);
            let map = MapSpec::default();
            prop_assert!(map.contains(nx) && map.contains(nz));
        }
    }
}
