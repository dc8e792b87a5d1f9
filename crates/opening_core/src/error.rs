use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Run-level failures. Nothing is emitted when one of these is returned.
#[derive(Error, Debug)]
pub enum AnalysisError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("Template parse error: {0}")]
    Template(#[from] serde_yaml::Error),

    #[error("No usable data: {reason}")]
    NoUsableData { reason: String },
}

impl AnalysisError {
    /// Data problems can be retried with different input; configuration
    /// problems have to be fixed first.
    pub fn is_recoverable(&self) -> bool {
        match self {
            AnalysisError::NoUsableData { .. } => true,
            AnalysisError::Config(_) => false,
            AnalysisError::Template(_) => false,
        }
    }
}

#[derive(Error, Debug, Clone, PartialEq)]
pub enum ConfigError {
    #[error("{field} must be positive, got {value}")]
    NonPositive { field: &'static str, value: f64 },

    #[error("{field} must be a finite number")]
    NonFinite { field: &'static str },

    #[error("{field} must be at least 1")]
    ZeroCount { field: &'static str },

    #[error("Position template has no slots")]
    EmptyTemplate,

    #[error("Position template lists label '{label}' more than once")]
    DuplicateLabel { label: String },

    #[error("Template slot '{label}' lies outside the unit square")]
    TemplateSlotOutOfRange { label: String },

    #[error("mid_skill_threshold must not exceed high_skill_threshold")]
    InvertedThresholds,
}

/// Why a single input record was rejected. Rejected records are skipped and
/// counted, never fatal.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum RecordError {
    #[error("Missing field: {field}")]
    MissingField { field: &'static str },

    #[error("team_id must be 0 or 1, got {team_id}")]
    TeamOutOfRange { team_id: i64 },

    #[error("{axis} coordinate {value} outside map bounds")]
    CoordinateOutOfRange { axis: &'static str, value: f64 },

    #[error("{field} is not a finite number")]
    NonFinite { field: &'static str },

    #[error("Negative event time: {time_ms}")]
    NegativeTime { time_ms: i64 },

    #[error("Empty unit token")]
    EmptyToken,

    #[error("Duplicate record for replay {replay_id}, player {player_id}")]
    Duplicate { replay_id: String, player_id: i64 },
}

impl RecordError {
    /// Stable key used by the skip counters.
    pub fn reason(&self) -> &'static str {
        match self {
            RecordError::MissingField { .. } => "missing_field",
            RecordError::TeamOutOfRange { .. } => "team_out_of_range",
            RecordError::CoordinateOutOfRange { .. } => "coordinate_out_of_range",
            RecordError::NonFinite { .. } => "non_finite",
            RecordError::NegativeTime { .. } => "negative_time",
            RecordError::EmptyToken => "empty_token",
            RecordError::Duplicate { .. } => "duplicate",
        }
    }
}

/// Non-fatal conditions surfaced alongside a successful run.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisWarning {
    /// Fewer valid spawns than `min_samples`; no clusters could form.
    InsufficientSpawns { spawns: usize, min_samples: usize },
    /// Fewer clusters than template slots; these labels stay unassigned.
    MissingLabels { labels: Vec<String> },
    /// More clusters than template slots.
    SurplusClusters {
        merged: Vec<usize>,
        unlabeled: Vec<usize>,
    },
    /// Zero qualifying build sequences routed to a position.
    InsufficientBuilds {
        position_label: String,
        qualifying: usize,
    },
    /// Sequences were clustered but none reached `min_cluster_size`.
    NoArchetypes {
        position_label: String,
        discarded_members: usize,
    },
}

pub type Result<T> = std::result::Result<T, AnalysisError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_config_errors_are_fatal() {
        let err = AnalysisError::from(ConfigError::EmptyTemplate);
        assert!(!err.is_recoverable());
        assert!(err.to_string().contains("no slots"));
    }

    #[test]
    fn test_no_usable_data_is_recoverable() {
        let err = AnalysisError::NoUsableData {
            reason: "all spawns malformed".to_string(),
        };
        assert!(err.is_recoverable());
    }

    #[test]
    fn test_record_error_reason_keys() {
        assert_eq!(
            RecordError::MissingField { field: "x" }.reason(),
            "missing_field"
        );
        assert_eq!(RecordError::EmptyToken.reason(), "empty_token");
        assert_eq!(
            RecordError::CoordinateOutOfRange {
                axis: "z",
                value: -1.0
            }
            .reason(),
            "coordinate_out_of_range"
        );
    }

    #[test]
    fn test_warning_serializes_with_kind_tag() {
        let warning = AnalysisWarning::MissingLabels {
            labels: vec!["pond".to_string()],
        };
        let json = serde_json::to_value(&warning).unwrap();
        assert_eq!(json["kind"], "missing_labels");
        assert_eq!(json["labels"][0], "pond");
    }
}
