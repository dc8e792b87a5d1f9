//! Input records produced by the replay parser.
//!
//! `Raw*` types mirror the line-delimited stream with every field optional so
//! a missing field becomes a counted [`RecordError`] instead of a parse
//! failure of the whole stream.

use crate::config::MapSpec;
use crate::error::RecordError;
use serde::{Deserialize, Serialize};

/// A player's start coordinate in one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SpawnRecord {
    pub replay_id: String,
    pub player_id: i64,
    /// Ally team, 0 or 1
    pub team_id: u8,
    pub x: f64,
    pub z: f64,
    pub skill: f64,
    pub won_game: bool,
}

impl SpawnRecord {
    /// Check ranges that the type system does not cover.
    pub fn validate(&self, map: &MapSpec) -> Result<(), RecordError> {
        if self.team_id > 1 {
            return Err(RecordError::TeamOutOfRange {
                team_id: self.team_id as i64,
            });
        }
        check_coordinate("x", self.x, map)?;
        check_coordinate("z", self.z, map)?;
        if !self.skill.is_finite() {
            return Err(RecordError::NonFinite { field: "skill" });
        }
        Ok(())
    }

    pub fn key(&self) -> (&str, i64) {
        (self.replay_id.as_str(), self.player_id)
    }
}

fn check_coordinate(axis: &'static str, value: f64, map: &MapSpec) -> Result<(), RecordError> {
    if !value.is_finite() {
        return Err(RecordError::NonFinite { field: axis });
    }
    if !map.contains(value) {
        return Err(RecordError::CoordinateOutOfRange { axis, value });
    }
    Ok(())
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawSpawnRecord {
    #[serde(default, alias = "replayId")]
    pub replay_id: Option<String>,
    #[serde(default, alias = "playerId")]
    pub player_id: Option<i64>,
    #[serde(default, alias = "allyTeamId")]
    pub team_id: Option<i64>,
    #[serde(default)]
    pub x: Option<f64>,
    #[serde(default)]
    pub z: Option<f64>,
    #[serde(default)]
    pub skill: Option<f64>,
    #[serde(default, alias = "wonGame")]
    pub won_game: Option<bool>,
}

impl RawSpawnRecord {
    pub fn into_record(self, map: &MapSpec) -> Result<SpawnRecord, RecordError> {
        let replay_id = self
            .replay_id
            .filter(|id| !id.is_empty())
            .ok_or(RecordError::MissingField { field: "replay_id" })?;
        let player_id = self
            .player_id
            .ok_or(RecordError::MissingField { field: "player_id" })?;
        let team_id = self
            .team_id
            .ok_or(RecordError::MissingField { field: "team_id" })?;
        let team_id = match team_id {
            0 => 0u8,
            1 => 1u8,
            other => return Err(RecordError::TeamOutOfRange { team_id: other }),
        };
        let x = self.x.ok_or(RecordError::MissingField { field: "x" })?;
        let z = self.z.ok_or(RecordError::MissingField { field: "z" })?;
        let skill = self
            .skill
            .ok_or(RecordError::MissingField { field: "skill" })?;
        let won_game = self
            .won_game
            .ok_or(RecordError::MissingField { field: "won_game" })?;

        let record = SpawnRecord {
            replay_id,
            player_id,
            team_id,
            x,
            z,
            skill,
            won_game,
        };
        record.validate(map)?;
        Ok(record)
    }
}

/// One construction order from a player's build log.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildEvent {
    pub time_ms: i64,
    pub unit_token: String,
}

impl BuildEvent {
    pub fn new(time_ms: i64, unit_token: impl Into<String>) -> Self {
        Self {
            time_ms,
            unit_token: unit_token.into(),
        }
    }

    pub fn validate(&self) -> Result<(), RecordError> {
        if self.time_ms < 0 {
            return Err(RecordError::NegativeTime {
                time_ms: self.time_ms,
            });
        }
        if self.unit_token.trim().is_empty() {
            return Err(RecordError::EmptyToken);
        }
        Ok(())
    }
}

/// A player's ordered build log for one replay.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BuildRecord {
    pub replay_id: String,
    pub player_id: i64,
    pub events: Vec<BuildEvent>,
}

impl BuildRecord {
    pub fn key(&self) -> (&str, i64) {
        (self.replay_id.as_str(), self.player_id)
    }
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBuildEvent {
    #[serde(default)]
    pub time_ms: Option<i64>,
    #[serde(default, alias = "unitDisplayName", alias = "unit")]
    pub unit_token: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RawBuildRecord {
    #[serde(default, alias = "replayId")]
    pub replay_id: Option<String>,
    #[serde(default, alias = "playerId")]
    pub player_id: Option<i64>,
    #[serde(default, alias = "buildOrder", alias = "events")]
    pub build_order: Option<Vec<RawBuildEvent>>,
}

impl RawBuildRecord {
    /// Validate the record. Malformed events inside an otherwise valid record
    /// are dropped and returned alongside it so the caller can count them.
    pub fn into_record(self) -> Result<(BuildRecord, Vec<RecordError>), RecordError> {
        let replay_id = self
            .replay_id
            .filter(|id| !id.is_empty())
            .ok_or(RecordError::MissingField { field: "replay_id" })?;
        let player_id = self
            .player_id
            .ok_or(RecordError::MissingField { field: "player_id" })?;
        let raw_events = self
            .build_order
            .ok_or(RecordError::MissingField {
                field: "build_order",
            })?;

        let mut events = Vec::with_capacity(raw_events.len());
        let mut rejected = Vec::new();
        for raw in raw_events {
            let event = match (raw.time_ms, raw.unit_token) {
                (Some(time_ms), Some(unit_token)) => BuildEvent { time_ms, unit_token },
                (None, _) => {
                    rejected.push(RecordError::MissingField { field: "time_ms" });
                    continue;
                }
                (_, None) => {
                    rejected.push(RecordError::MissingField {
                        field: "unit_token",
                    });
                    continue;
                }
            };
            match event.validate() {
                Ok(()) => events.push(event),
                Err(err) => rejected.push(err),
            }
        }

        Ok((
            BuildRecord {
                replay_id,
                player_id,
                events,
            },
            rejected,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn raw_spawn() -> RawSpawnRecord {
        RawSpawnRecord {
            replay_id: Some("r1".to_string()),
            player_id: Some(7),
            team_id: Some(1),
            x: Some(1000.0),
            z: Some(9000.0),
            skill: Some(25.5),
            won_game: Some(true),
        }
    }

    #[test]
    fn test_valid_raw_spawn_converts() {
        let record = raw_spawn().into_record(&MapSpec::default()).unwrap();
        assert_eq!(record.team_id, 1);
        assert_eq!(record.key(), ("r1", 7));
    }

    #[test]
    fn test_missing_field_reported_by_name() {
        let mut raw = raw_spawn();
        raw.skill = None;
        assert_eq!(
            raw.into_record(&MapSpec::default()),
            Err(RecordError::MissingField { field: "skill" })
        );
    }

    #[test]
    fn test_team_out_of_range() {
        let mut raw = raw_spawn();
        raw.team_id = Some(2);
        assert_eq!(
            raw.into_record(&MapSpec::default()),
            Err(RecordError::TeamOutOfRange { team_id: 2 })
        );
    }

    #[test]
    fn test_coordinate_outside_map() {
        let mut raw = raw_spawn();
        raw.z = Some(20_000.0);
        assert!(matches!(
            raw.into_record(&MapSpec::default()),
            Err(RecordError::CoordinateOutOfRange { axis: "z", .. })
        ));
    }

    #[test]
    fn test_camel_case_aliases_accepted() {
        let line = r#"{"replayId":"abc","playerId":3,"allyTeamId":0,"x":10.0,"z":20.0,"skill":12.0,"wonGame":false}"#;
        let raw: RawSpawnRecord = serde_json::from_str(line).unwrap();
        let record = raw.into_record(&MapSpec::default()).unwrap();
        assert_eq!(record.replay_id, "abc");
        assert!(!record.won_game);
    }

    #[test]
    fn test_build_record_drops_bad_events() {
        let line = r#"{"replay_id":"r","player_id":1,"build_order":[
            {"time_ms":100,"unit_token":"MetalExtractor"},
            {"time_ms":-5,"unit_token":"WindTurbine"},
            {"time_ms":200,"unit_token":""},
            {"unit_token":"Solar"},
            {"time_ms":300,"unit_token":"Solar"}
        ]}"#;
        let raw: RawBuildRecord = serde_json::from_str(line).unwrap();
        let (record, rejected) = raw.into_record().unwrap();
        assert_eq!(record.events.len(), 2);
        assert_eq!(rejected.len(), 3);
        assert!(rejected.contains(&RecordError::NegativeTime { time_ms: -5 }));
        assert!(rejected.contains(&RecordError::EmptyToken));
    }

    #[test]
    fn test_build_record_without_order_is_malformed() {
        let raw = RawBuildRecord {
            replay_id: Some("r".to_string()),
            player_id: Some(1),
            build_order: None,
        };
        assert_eq!(
            raw.into_record().map(|(r, _)| r),
            Err(RecordError::MissingField {
                field: "build_order"
            })
        );
    }
}
