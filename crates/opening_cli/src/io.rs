//! Record streams in, artifacts out.
//!
//! Input streams are line-delimited JSON. A line that fails to parse or
//! validate is counted in [`IngestStats`] and skipped; only I/O failures abort.
//! Records that pass are handed to the engine, which counts them as read.

use anyhow::{Context, Result};
use opening_core::{
    BuildArchetype, BuildRecord, IngestStats, MapSpec, PositionAssignment, RawBuildRecord,
    RawSpawnRecord, RecordKind, SpawnRecord,
};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs::{self, File};
use std::io::{BufRead, BufReader, BufWriter, Write};
use std::path::Path;
use tracing::warn;

/// Parse every non-blank line of `path` as `T`.
///
/// Unparseable lines are recorded under reason `parse` for `kind`.
pub fn read_jsonl<T: DeserializeOwned>(
    path: &Path,
    kind: RecordKind,
    stats: &mut IngestStats,
) -> Result<Vec<T>> {
    let file = File::open(path).with_context(|| format!("Failed to open {}", path.display()))?;
    let reader = BufReader::new(file);

    let mut items = Vec::new();
    for (line_no, line) in reader.lines().enumerate() {
        let line = line.with_context(|| format!("Failed to read {}", path.display()))?;
        if line.trim().is_empty() {
            continue;
        }
        match serde_json::from_str::<T>(&line) {
            Ok(item) => items.push(item),
            Err(err) => {
                warn!("{}:{}: {}", path.display(), line_no + 1, err);
                stats.record_read(kind);
                stats.record_skip_reason(kind, "parse");
            }
        }
    }
    Ok(items)
}

pub fn read_spawns(path: &Path, map: &MapSpec, stats: &mut IngestStats) -> Result<Vec<SpawnRecord>> {
    let raw: Vec<RawSpawnRecord> = read_jsonl(path, RecordKind::Spawn, stats)?;
    let mut spawns = Vec::with_capacity(raw.len());
    for record in raw {
        match record.into_record(map) {
            Ok(spawn) => spawns.push(spawn),
            Err(err) => {
                stats.record_read(RecordKind::Spawn);
                stats.record_skip(RecordKind::Spawn, &err);
            }
        }
    }
    Ok(spawns)
}

pub fn read_builds(path: &Path, stats: &mut IngestStats) -> Result<Vec<BuildRecord>> {
    let raw: Vec<RawBuildRecord> = read_jsonl(path, RecordKind::Build, stats)?;
    let mut builds = Vec::with_capacity(raw.len());
    for record in raw {
        match record.into_record() {
            Ok((build, rejected)) => {
                for err in &rejected {
                    stats.record_skip(RecordKind::BuildEvent, err);
                }
                builds.push(build);
            }
            Err(err) => {
                stats.record_read(RecordKind::Build);
                stats.record_skip(RecordKind::Build, &err);
            }
        }
    }
    Ok(builds)
}

fn create(path: &Path) -> Result<BufWriter<File>> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("Failed to create output directory: {}", parent.display()))?;
    }
    let file = File::create(path).with_context(|| format!("Failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

pub fn write_json<T: Serialize + ?Sized>(path: &Path, value: &T) -> Result<()> {
    let mut writer = create(path)?;
    serde_json::to_writer_pretty(&mut writer, value)
        .with_context(|| format!("Failed to serialize {}", path.display()))?;
    writer.write_all(b"\n")?;
    writer.flush()?;
    Ok(())
}

pub fn write_jsonl<T: Serialize>(path: &Path, items: &[T]) -> Result<()> {
    let mut writer = create(path)?;
    for item in items {
        serde_json::to_writer(&mut writer, item)
            .with_context(|| format!("Failed to serialize {}", path.display()))?;
        writer.write_all(b"\n")?;
    }
    writer.flush()?;
    Ok(())
}

pub fn write_assignments_csv(path: &Path, assignments: &[PositionAssignment]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    for assignment in assignments {
        writer.serialize(assignment)?;
    }
    writer.flush()?;
    Ok(())
}

/// Flat archetype row; the sequence is rendered as text.
#[derive(Debug, Serialize)]
struct ArchetypeRow<'a> {
    position_label: &'a str,
    archetype_id: usize,
    name: &'a str,
    member_count: usize,
    share: f64,
    avg_skill: f64,
    win_rate: f64,
    medoid_total_distance: f64,
    opening: String,
}

pub fn write_archetypes_csv(path: &Path, archetypes: &[BuildArchetype]) -> Result<()> {
    let mut writer = csv::Writer::from_writer(create(path)?);
    for a in archetypes {
        writer.serialize(ArchetypeRow {
            position_label: &a.position_label,
            archetype_id: a.archetype_id,
            name: &a.name,
            member_count: a.member_count,
            share: a.share,
            avg_skill: a.avg_skill,
            win_rate: a.win_rate,
            medoid_total_distance: a.medoid_total_distance,
            opening: a.opening_summary(a.representative_sequence.len()),
        })?;
    }
    writer.flush()?;
    Ok(())
}
