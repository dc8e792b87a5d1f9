//! # Build Sequence Normalizer
//!
//! Raw build log to a position-scoped run-length sequence:
//!
//! 1. keep events inside the time window
//! 2. stable sort by time (equal timestamps keep emission order)
//! 3. collapse consecutive identical tokens into `(token, run_length)` steps
//! 4. optionally keep only the first `max_steps` steps
//!
//! A log with nothing inside the window yields `None`; such players do not
//! take part in clustering.

use crate::config::BuildClusteringConfig;
use crate::models::{BuildEvent, BuildRecord, BuildStep, NormalizedBuildSequence, PositionAssignment};

/// Collapse consecutive identical tokens.
pub fn collapse_runs<'a>(tokens: impl IntoIterator<Item = &'a str>) -> Vec<BuildStep> {
    let mut steps: Vec<BuildStep> = Vec::new();
    for token in tokens {
        match steps.last_mut() {
            Some(last) if last.unit_token == token => last.run_length += 1,
            _ => steps.push(BuildStep::new(token, 1)),
        }
    }
    steps
}

/// Events inside the window, stably ordered by time.
pub fn windowed_events<'a>(
    events: &'a [BuildEvent],
    config: &BuildClusteringConfig,
) -> Vec<&'a BuildEvent> {
    let origin = if config.align_to_first_event {
        events.iter().map(|e| e.time_ms).min().unwrap_or(0)
    } else {
        0
    };

    let mut kept: Vec<&BuildEvent> = events
        .iter()
        .filter(|e| e.time_ms >= origin && e.time_ms - origin <= config.time_window_ms)
        .collect();
    // sort_by_key is stable
    kept.sort_by_key(|e| e.time_ms);
    kept
}

/// Steps of one build log, before any position is attached.
pub fn normalize_steps(events: &[BuildEvent], config: &BuildClusteringConfig) -> Vec<BuildStep> {
    let kept = windowed_events(events, config);
    let mut steps = collapse_runs(kept.iter().map(|e| e.unit_token.as_str()));
    if let Some(max_steps) = config.max_steps {
        steps.truncate(max_steps);
    }
    steps
}

/// Normalize `record` for the position resolved in `assignment`.
pub fn normalize_build(
    record: &BuildRecord,
    assignment: &PositionAssignment,
    config: &BuildClusteringConfig,
) -> Option<NormalizedBuildSequence> {
    let steps = normalize_steps(&record.events, config);
    if steps.is_empty() {
        return None;
    }

    Some(NormalizedBuildSequence {
        replay_id: record.replay_id.clone(),
        player_id: record.player_id,
        position_label: assignment.position_label.clone(),
        skill: assignment.skill,
        won_game: assignment.won_game,
        steps,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(window: i64) -> BuildClusteringConfig {
        BuildClusteringConfig {
            time_window_ms: window,
            ..Default::default()
        }
    }

    fn assignment() -> PositionAssignment {
        PositionAssignment {
            replay_id: "r".to_string(),
            player_id: 4,
            team_id: 0,
            position_label: "eco".to_string(),
            distance_from_centroid: 12.0,
            raw_cluster_id: Some(0),
            is_noise: false,
            nx: 0.0,
            nz: 0.0,
            skill: 31.0,
            won_game: true,
        }
    }

    #[test]
    fn test_collapse_runs() {
        let steps = collapse_runs(["Mex", "Mex", "Mex", "Wind", "Wind", "Mex"]);
        assert_eq!(
            steps,
            vec![
                BuildStep::new("Mex", 3),
                BuildStep::new("Wind", 2),
                BuildStep::new("Mex", 1),
            ]
        );
    }

    #[test]
    fn test_five_extractors_become_one_step() {
        let events: Vec<BuildEvent> = (0..5)
            .map(|i| BuildEvent::new(i * 1000, "MetalExtractor"))
            .collect();
        let steps = normalize_steps(&events, &config(360_000));
        assert_eq!(steps, vec![BuildStep::new("MetalExtractor", 5)]);
    }

    #[test]
    fn test_window_filters_late_events() {
        let events = vec![
            BuildEvent::new(1_000, "Mex"),
            BuildEvent::new(359_999, "Wind"),
            BuildEvent::new(360_000, "Wind"),
            BuildEvent::new(360_001, "Fusion"),
        ];
        let steps = normalize_steps(&events, &config(360_000));
        assert_eq!(steps, vec![BuildStep::new("Mex", 1), BuildStep::new("Wind", 2)]);
    }

    #[test]
    fn test_sort_is_stable_for_equal_times() {
        let events = vec![
            BuildEvent::new(500, "Lab"),
            BuildEvent::new(0, "Mex"),
            BuildEvent::new(0, "Wind"),
            BuildEvent::new(0, "Mex"),
        ];
        let steps = normalize_steps(&events, &config(1_000));
        assert_eq!(
            steps,
            vec![
                BuildStep::new("Mex", 1),
                BuildStep::new("Wind", 1),
                BuildStep::new("Mex", 1),
                BuildStep::new("Lab", 1),
            ]
        );
    }

    #[test]
    fn test_align_to_first_event_shifts_window() {
        let events = vec![
            BuildEvent::new(50_000, "Mex"),
            BuildEvent::new(100_000, "Wind"),
            BuildEvent::new(160_000, "Lab"),
        ];
        let mut cfg = config(60_000);
        assert_eq!(normalize_steps(&events, &cfg), vec![BuildStep::new("Mex", 1)]);

        cfg.align_to_first_event = true;
        assert_eq!(
            normalize_steps(&events, &cfg),
            vec![BuildStep::new("Mex", 1), BuildStep::new("Wind", 1)]
        );
    }

    #[test]
    fn test_max_steps_truncates() {
        let events = vec![
            BuildEvent::new(1, "A"),
            BuildEvent::new(2, "B"),
            BuildEvent::new(3, "B"),
            BuildEvent::new(4, "C"),
        ];
        let mut cfg = config(1_000);
        cfg.max_steps = Some(2);
        assert_eq!(
            normalize_steps(&events, &cfg),
            vec![BuildStep::new("A", 1), BuildStep::new("B", 2)]
        );
    }

    #[test]
    fn test_empty_window_excluded() {
        let record = BuildRecord {
            replay_id: "r".to_string(),
            player_id: 4,
            events: vec![BuildEvent::new(500_000, "Mex")],
        };
        assert!(normalize_build(&record, &assignment(), &config(360_000)).is_none());
    }

    #[test]
    fn test_sequence_carries_player_outcome() {
        let record = BuildRecord {
            replay_id: "r".to_string(),
            player_id: 4,
            events: vec![BuildEvent::new(10, "Mex")],
        };
        let sequence = normalize_build(&record, &assignment(), &config(360_000)).unwrap();
        assert_eq!(sequence.position_label, "eco");
        assert_eq!(sequence.skill, 31.0);
        assert!(sequence.won_game);
    }
}
