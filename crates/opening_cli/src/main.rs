//! Opening Analysis CLI
//!
//! Spawn JSONL → position clusters and assignments
//! Build JSONL → per-position opening archetypes

#[cfg(feature = "cli")]
use anyhow::{Context, Result};
#[cfg(feature = "cli")]
use clap::{Args, Parser, Subcommand};
#[cfg(feature = "cli")]
use opening_cli::{Overrides, RunMetadata, RunRequest};
#[cfg(feature = "cli")]
use std::path::PathBuf;

#[cfg(feature = "cli")]
#[derive(Parser)]
#[command(name = "opening-cli")]
#[command(about = "Cluster replay spawns into positions and openings into archetypes", long_about = None)]
struct Cli {
    /// Debug-level logging (RUST_LOG takes precedence)
    #[arg(long, short, global = true)]
    verbose: bool,

    #[command(subcommand)]
    command: Commands,
}

#[cfg(feature = "cli")]
#[derive(Args)]
struct ParamArgs {
    /// Analysis config file (.yaml or .json)
    #[arg(long)]
    config: Option<PathBuf>,

    /// Position template file (.yaml or .json); embedded Supreme Isthmus if omitted
    #[arg(long)]
    template: Option<PathBuf>,

    /// DBSCAN neighborhood radius in map units
    #[arg(long)]
    eps: Option<f64>,

    /// DBSCAN minimum neighborhood size
    #[arg(long)]
    min_samples: Option<usize>,

    /// Max distance for a surplus cluster to adopt a neighbor's label
    #[arg(long)]
    merge_tolerance: Option<f64>,

    /// Also write CSV versions of the assignments and archetypes
    #[arg(long, default_value = "false")]
    csv: bool,
}

/// Build clustering flags, only meaningful for a full analysis.
#[cfg(feature = "cli")]
#[derive(Args)]
struct BuildArgs {
    /// Build events after this many milliseconds are ignored
    #[arg(long)]
    time_window_ms: Option<i64>,

    /// Upper bound on archetypes per position
    #[arg(long)]
    max_clusters: Option<usize>,

    /// Archetypes with fewer members are discarded
    #[arg(long)]
    min_cluster_size: Option<usize>,

    /// Normalized edit distance above which clusters stay apart
    #[arg(long)]
    stop_distance: Option<f64>,
}

#[cfg(feature = "cli")]
impl ParamArgs {
    fn overrides(&self, build: Option<&BuildArgs>) -> Overrides {
        let mut overrides = Overrides {
            eps: self.eps,
            min_samples: self.min_samples,
            merge_tolerance: self.merge_tolerance,
            ..Default::default()
        };
        if let Some(build) = build {
            overrides.time_window_ms = build.time_window_ms;
            overrides.max_clusters = build.max_clusters;
            overrides.min_cluster_size = build.min_cluster_size;
            overrides.stop_distance = build.stop_distance;
        }
        overrides
    }

    fn request(
        &self,
        spawns: PathBuf,
        builds: Option<PathBuf>,
        build_args: Option<&BuildArgs>,
        out: PathBuf,
    ) -> Result<RunRequest> {
        Ok(RunRequest {
            spawns,
            builds,
            out_dir: out,
            config: opening_cli::load_config(self.config.as_deref(), &self.overrides(build_args))?,
            template: opening_cli::load_template(self.template.as_deref())?,
            csv: self.csv,
        })
    }
}

#[cfg(feature = "cli")]
#[derive(Subcommand)]
enum Commands {
    /// Cluster positions and build archetypes
    Analyze {
        /// Spawn records (JSONL)
        #[arg(long)]
        spawns: PathBuf,

        /// Build records (JSONL)
        #[arg(long)]
        builds: PathBuf,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        #[command(flatten)]
        params: ParamArgs,

        #[command(flatten)]
        build_params: BuildArgs,
    },

    /// Cluster positions only
    Positions {
        /// Spawn records (JSONL)
        #[arg(long)]
        spawns: PathBuf,

        /// Output directory
        #[arg(long)]
        out: PathBuf,

        #[command(flatten)]
        params: ParamArgs,
    },

    /// Print or save the embedded position template
    Template {
        /// Output YAML file path (stdout if omitted)
        #[arg(long)]
        out: Option<PathBuf>,
    },
}

#[cfg(feature = "cli")]
fn init_tracing(verbose: bool) {
    let default_level = if verbose { "debug" } else { "info" };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[cfg(feature = "cli")]
fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    match cli.command {
        Commands::Analyze {
            spawns,
            builds,
            out,
            params,
            build_params,
        } => {
            println!("🔨 Analyzing openings...");
            println!("   Spawns: {}", spawns.display());
            println!("   Builds: {}", builds.display());
            println!("   Output: {}", out.display());

            let request = params.request(spawns, Some(builds), Some(&build_params), out)?;
            let meta = opening_cli::run_analysis(&request)?;
            print_metadata(&meta);
        }

        Commands::Positions {
            spawns,
            out,
            params,
        } => {
            println!("🔨 Clustering positions...");
            println!("   Spawns: {}", spawns.display());
            println!("   Output: {}", out.display());

            let request = params.request(spawns, None, None, out)?;
            let meta = opening_cli::run_positions(&request)?;
            print_metadata(&meta);
        }

        Commands::Template { out } => {
            let yaml = opening_cli::load_template(None)?
                .to_yaml()
                .context("Failed to serialize template")?;
            match out {
                Some(path) => {
                    std::fs::write(&path, yaml)
                        .with_context(|| format!("Failed to write {}", path.display()))?;
                    println!("📄 Template saved to: {}", path.display());
                }
                None => print!("{}", yaml),
            }
        }
    }

    Ok(())
}

#[cfg(feature = "cli")]
fn print_metadata(meta: &RunMetadata) {
    println!("\n✅ Analysis complete!");
    if let Some(summary) = &meta.summary {
        println!("   Games:       {}", summary.total_games);
        println!("   Players:     {}", summary.total_players);
        println!("   Positions:   {}", summary.positions);
        println!("   Archetypes:  {}", summary.archetypes);
        println!("   Avg skill:   {:.1}", summary.avg_skill);
    }
    for position in &meta.build_summaries {
        println!(
            "   {:<10} {:>4} builds, {:>4} qualifying, {} archetypes",
            position.position_label, position.total_builds, position.qualifying, position.archetype_count
        );
    }
    println!(
        "   Skipped:     {} spawns, {} builds, {} events",
        meta.ingest.spawns_skipped, meta.ingest.builds_skipped, meta.ingest.events_skipped
    );
    if !meta.warnings.is_empty() {
        println!("   Warnings:    {}", meta.warnings.len());
    }
    println!("   Artifacts:   {}", meta.artifacts.join(", "));
    println!("   Created:     {}", meta.created_at);
}


#[cfg(not(feature = "cli"))]
fn main() {
    eprintln!("opening-cli is not available. Enable the 'cli' feature to use it.");
    std::process::exit(1);
}
