//! Opening Analysis CLI Library
//!
//! Spawn/build JSONL streams → position and archetype artifacts
//! Configuration and template loading, parameter overrides

pub mod io;

use anyhow::{Context, Result};
use opening_core::{
    AnalysisConfig, AnalysisWarning, IngestStats, PositionBuildSummary, PositionOverview,
    PositionTemplate, RunSummary,
};
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::info;

pub const POSITION_CLUSTERS_FILE: &str = "position-clusters.json";
pub const POSITION_ASSIGNMENTS_FILE: &str = "position-assignments.jsonl";
pub const BUILD_ARCHETYPES_FILE: &str = "build-archetypes.json";
pub const RUN_SUMMARY_FILE: &str = "run-summary.json";
pub const ASSIGNMENTS_CSV_FILE: &str = "position-assignments.csv";
pub const ARCHETYPES_CSV_FILE: &str = "build-archetypes.csv";

/// Run metadata written next to the artifacts.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RunMetadata {
    /// Artifact schema version
    pub schema_version: u32,
    /// Engine version that produced the run
    pub engine_version: String,
    /// Creation time (RFC3339)
    pub created_at: String,
    pub map_name: String,
    pub config: AnalysisConfig,
    /// None for position-only runs
    pub summary: Option<RunSummary>,
    pub overview: Vec<PositionOverview>,
    pub build_summaries: Vec<PositionBuildSummary>,
    pub ingest: IngestStats,
    pub warnings: Vec<AnalysisWarning>,
    /// Files written, relative to the output directory
    pub artifacts: Vec<String>,
}

/// Command-line overrides applied on top of the config file.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Overrides {
    pub eps: Option<f64>,
    pub min_samples: Option<usize>,
    pub merge_tolerance: Option<f64>,
    pub time_window_ms: Option<i64>,
    pub max_clusters: Option<usize>,
    pub min_cluster_size: Option<usize>,
    pub stop_distance: Option<f64>,
}

impl Overrides {
    pub fn apply(&self, config: &mut AnalysisConfig) {
        if let Some(eps) = self.eps {
            config.positions.eps = eps;
        }
        if let Some(min_samples) = self.min_samples {
            config.positions.min_samples = min_samples;
        }
        if let Some(tolerance) = self.merge_tolerance {
            config.positions.merge_tolerance = Some(tolerance);
        }
        if let Some(window) = self.time_window_ms {
            config.builds.time_window_ms = window;
        }
        if let Some(max_clusters) = self.max_clusters {
            config.builds.max_clusters = max_clusters;
        }
        if let Some(min_cluster_size) = self.min_cluster_size {
            config.builds.min_cluster_size = min_cluster_size;
        }
        if let Some(stop_distance) = self.stop_distance {
            config.builds.stop_distance = stop_distance;
        }
    }
}

fn is_json(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"))
}

/// Load the analysis config, apply overrides and validate.
///
/// Without a path the built-in defaults are used. `.json` files are read as
/// JSON, anything else as YAML.
pub fn load_config(path: Option<&Path>, overrides: &Overrides) -> Result<AnalysisConfig> {
    let mut config = match path {
        None => AnalysisConfig::default(),
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read config file: {}", path.display()))?;
            if is_json(path) {
                AnalysisConfig::from_json(&text)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))?
            } else {
                AnalysisConfig::from_yaml(&text)
                    .with_context(|| format!("Failed to parse config: {}", path.display()))?
            }
        }
    };
    overrides.apply(&mut config);
    config.validate().context("Invalid analysis configuration")?;
    Ok(config)
}

/// Load a position template, or the embedded Supreme Isthmus one.
pub fn load_template(path: Option<&Path>) -> Result<PositionTemplate> {
    let template = match path {
        None => PositionTemplate::supreme_isthmus().context("Embedded template is invalid")?,
        Some(path) => {
            let text = fs::read_to_string(path)
                .with_context(|| format!("Failed to read template file: {}", path.display()))?;
            if is_json(path) {
                serde_json::from_str(&text)
                    .with_context(|| format!("Failed to parse template: {}", path.display()))?
            } else {
                PositionTemplate::from_yaml(&text)
                    .with_context(|| format!("Failed to parse template: {}", path.display()))?
            }
        }
    };
    template.validate().context("Invalid position template")?;
    Ok(template)
}

/// Inputs and output location shared by both analysis commands.
#[derive(Debug, Clone)]
pub struct RunRequest {
    pub spawns: PathBuf,
    /// Required for a full run, ignored by position-only runs
    pub builds: Option<PathBuf>,
    pub out_dir: PathBuf,
    pub config: AnalysisConfig,
    pub template: PositionTemplate,
    pub csv: bool,
}

fn metadata(request: &RunRequest) -> RunMetadata {
    RunMetadata {
        schema_version: opening_core::SCHEMA_VERSION,
        engine_version: opening_core::VERSION.to_string(),
        created_at: chrono::Utc::now().to_rfc3339(),
        map_name: request.template.map_name.clone(),
        config: request.config.clone(),
        summary: None,
        overview: Vec::new(),
        build_summaries: Vec::new(),
        ingest: IngestStats::new(),
        warnings: Vec::new(),
        artifacts: Vec::new(),
    }
}

struct ArtifactWriter<'a> {
    out_dir: &'a Path,
    written: Vec<String>,
}

impl<'a> ArtifactWriter<'a> {
    fn new(out_dir: &'a Path) -> Self {
        Self {
            out_dir,
            written: Vec::new(),
        }
    }

    fn path(&mut self, name: &str) -> PathBuf {
        self.written.push(name.to_string());
        self.out_dir.join(name)
    }
}

/// Cluster spawns only and write the position artifacts.
pub fn run_positions(request: &RunRequest) -> Result<RunMetadata> {
    let mut boundary = IngestStats::new();
    let spawns = io::read_spawns(&request.spawns, &request.config.map, &mut boundary)?;
    info!("Read {} spawn records", spawns.len());

    let mut report = opening_core::cluster_positions(spawns, &request.config, &request.template)?;
    report.ingest.merge(&boundary);

    let mut out = ArtifactWriter::new(&request.out_dir);
    io::write_json(&out.path(POSITION_CLUSTERS_FILE), &report.clusters)?;
    io::write_jsonl(&out.path(POSITION_ASSIGNMENTS_FILE), &report.assignments)?;
    if request.csv {
        io::write_assignments_csv(&out.path(ASSIGNMENTS_CSV_FILE), &report.assignments)?;
    }

    let mut meta = metadata(request);
    meta.ingest = report.ingest;
    meta.warnings = report.warnings;
    let summary_path = out.path(RUN_SUMMARY_FILE);
    meta.artifacts = out.written;
    io::write_json(&summary_path, &meta)?;
    Ok(meta)
}

/// Full run: positions and build archetypes.
pub fn run_analysis(request: &RunRequest) -> Result<RunMetadata> {
    let builds_path = request
        .builds
        .as_deref()
        .context("A build record stream is required for a full analysis")?;

    let mut boundary = IngestStats::new();
    let spawns = io::read_spawns(&request.spawns, &request.config.map, &mut boundary)?;
    let builds = io::read_builds(builds_path, &mut boundary)?;
    info!("Read {} spawn records, {} build records", spawns.len(), builds.len());

    let mut report = opening_core::analyze(spawns, builds, &request.config, &request.template)?;
    report.ingest.merge(&boundary);

    let mut out = ArtifactWriter::new(&request.out_dir);
    io::write_json(&out.path(POSITION_CLUSTERS_FILE), &report.position_clusters)?;
    io::write_jsonl(&out.path(POSITION_ASSIGNMENTS_FILE), &report.assignments)?;
    io::write_json(&out.path(BUILD_ARCHETYPES_FILE), &report.archetypes)?;
    if request.csv {
        io::write_assignments_csv(&out.path(ASSIGNMENTS_CSV_FILE), &report.assignments)?;
        io::write_archetypes_csv(&out.path(ARCHETYPES_CSV_FILE), &report.archetypes)?;
    }

    let mut meta = metadata(request);
    meta.summary = Some(report.summary);
    meta.overview = report.overview;
    meta.build_summaries = report.build_summaries;
    meta.ingest = report.ingest;
    meta.warnings = report.warnings;
    let summary_path = out.path(RUN_SUMMARY_FILE);
    meta.artifacts = out.written;
    io::write_json(&summary_path, &meta)?;
    Ok(meta)
}
