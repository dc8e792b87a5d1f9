//! Record-level skip accounting.
//!
//! Malformed records never abort a run. Every rejection lands here with a
//! reason key so the caller can report what was dropped and why.

use crate::error::RecordError;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Which stream a rejected item came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordKind {
    Spawn,
    Build,
    /// A single event inside an otherwise valid build record.
    BuildEvent,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct IngestStats {
    pub spawns_read: u32,
    pub spawns_skipped: u32,
    pub builds_read: u32,
    pub builds_skipped: u32,
    pub events_skipped: u32,
    /// Build records whose (replay_id, player_id) has no routable position.
    pub builds_unrouted: u32,
    pub skipped_by_reason: BTreeMap<String, u32>,
}

impl IngestStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record_read(&mut self, kind: RecordKind) {
        match kind {
            RecordKind::Spawn => self.spawns_read += 1,
            RecordKind::Build => self.builds_read += 1,
            RecordKind::BuildEvent => {}
        }
    }

    pub fn record_skip(&mut self, kind: RecordKind, err: &RecordError) {
        self.record_skip_reason(kind, err.reason());
    }

    /// Count a rejection whose cause is not a [`RecordError`], such as an
    /// unparseable stream line.
    pub fn record_skip_reason(&mut self, kind: RecordKind, reason: &str) {
        match kind {
            RecordKind::Spawn => self.spawns_skipped += 1,
            RecordKind::Build => self.builds_skipped += 1,
            RecordKind::BuildEvent => self.events_skipped += 1,
        }
        *self.skipped_by_reason.entry(reason.to_string()).or_insert(0) += 1;
    }

    pub fn total_skipped(&self) -> u32 {
        self.spawns_skipped + self.builds_skipped + self.events_skipped
    }

    /// Fold counts gathered at the stream boundary into this run's stats.
    pub fn merge(&mut self, other: &IngestStats) {
        self.spawns_read += other.spawns_read;
        self.spawns_skipped += other.spawns_skipped;
        self.builds_read += other.builds_read;
        self.builds_skipped += other.builds_skipped;
        self.events_skipped += other.events_skipped;
        self.builds_unrouted += other.builds_unrouted;
        for (reason, count) in &other.skipped_by_reason {
            *self.skipped_by_reason.entry(reason.clone()).or_insert(0) += count;
        }
    }
}
