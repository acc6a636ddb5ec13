//! `clue` command-line tool.
//!
//! Reads calorimeter hits grouped by event, clusters every event with CLUE
//! and writes the resulting clusters.
#![allow(clippy::uninlined_format_args, clippy::cast_precision_loss)]

use clap::{Args, Parser, Subcommand};

use clue_algorithms::cluster_events;
use clue_core::{ClueConfig, HitData};
use clue_io::{ClusterFileWriter, ClusterRecord, Event, HitFileReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use thiserror::Error;

/// Result type for CLI operations.
type Result<T> = std::result::Result<T, CliError>;

/// CLI error types.
#[derive(Error, Debug)]
enum CliError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("I/O error: {0}")]
    ClueIo(#[from] clue_io::Error),

    #[error("Core error: {0}")]
    Core(#[from] clue_core::Error),

    #[error("Config error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("Unsupported output format: {0}")]
    UnsupportedOutput(String),
}

/// Density-based calorimeter shower clustering.
#[derive(Parser)]
#[command(name = "clue")]
#[command(author, version, about, long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Cluster the events of one or more hit files
    Process {
        /// Input hit file(s) (.csv or .json)
        #[arg(required = true)]
        input: Vec<PathBuf>,

        /// Output file path (.csv or .json)
        #[arg(short, long)]
        output: PathBuf,

        #[command(flatten)]
        overrides: Overrides,

        /// Verbose output
        #[arg(short, long)]
        verbose: bool,
    },

    /// Show information about a hit file
    Info {
        /// Input hit file
        input: PathBuf,
    },
}

/// Clustering parameters; command-line values win over the config file.
#[derive(Args)]
struct Overrides {
    /// JSON configuration file
    #[arg(long)]
    config: Option<PathBuf>,

    /// Bucket side for merging nearby hits (mm, 0 merges identical positions only)
    #[arg(long)]
    dc: Option<f64>,

    /// Seed energy threshold in single-layer mode (MeV)
    #[arg(long)]
    rc: Option<f64>,

    /// Seed separation (mm)
    #[arg(long)]
    deltac: Option<f64>,

    /// Outlier separation (mm)
    #[arg(long)]
    deltao: Option<f64>,

    /// Number of clustering layers (1 disables the cross-layer pass)
    #[arg(long)]
    layers: Option<usize>,

    /// Split clusters above the energy ceiling (single-layer mode only)
    #[arg(long)]
    recluster: bool,

    /// Energy ceiling for reclustering (MeV)
    #[arg(long)]
    max_cluster_energy: Option<f64>,

    /// Log per-node decisions
    #[arg(long)]
    debug: bool,
}

impl Overrides {
    fn resolve(&self) -> Result<ClueConfig> {
        let mut config = match &self.config {
            Some(path) => {
                let text = std::fs::read_to_string(path)?;
                serde_json::from_str(&text)?
            }
            None => ClueConfig::default(),
        };
        if let Some(dc) = self.dc {
            config = config.with_bucket_side(dc);
        }
        if let Some(rc) = self.rc {
            config = config.with_seed_density(rc);
        }
        if let Some(deltac) = self.deltac {
            config = config.with_seed_separation(deltac);
        }
        if let Some(deltao) = self.deltao {
            config = config.with_outlier_separation(deltao);
        }
        if let Some(layers) = self.layers {
            config = config.with_layer_count(layers);
        }
        if let Some(energy) = self.max_cluster_energy {
            config = config.with_max_cluster_energy(energy);
        }
        if self.recluster {
            config = config.with_reclustering(true);
        }
        if self.debug {
            config = config.with_debug(true);
        }
        config.validate()?;
        Ok(config)
    }
}

#[derive(Clone, Copy)]
enum OutputFormat {
    Csv,
    Json,
}

impl OutputFormat {
    fn from_path(path: &Path) -> Result<Self> {
        let ext = path
            .extension()
            .and_then(|ext| ext.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        match ext.as_str() {
            "csv" => Ok(Self::Csv),
            "json" => Ok(Self::Json),
            _ => Err(CliError::UnsupportedOutput(path.display().to_string())),
        }
    }
}

fn init_logging(verbose: bool) {
    let level = if verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(level)).init();
}

fn read_all(inputs: &[PathBuf]) -> Result<Vec<Event>> {
    let mut events = Vec::new();
    for path in inputs {
        log::info!("Reading: {}", path.display());
        let reader = HitFileReader::open(path)?;
        events.extend(reader.read_events()?);
    }
    Ok(events)
}

fn process(inputs: &[PathBuf], output: &Path, overrides: &Overrides) -> Result<()> {
    let config = overrides.resolve()?;
    let format = OutputFormat::from_path(output)?;
    log::debug!("configuration: {:?}", config);

    let start = Instant::now();
    let events = read_all(inputs)?;
    let total_hits: usize = events.iter().map(|e| e.hits.len()).sum();

    let hits: Vec<Vec<HitData>> = events.iter().map(|e| e.hits.clone()).collect();
    let outputs = cluster_events(&hits, &config);

    let mut writer = ClusterFileWriter::create(output)?;
    log::info!("Writing output to: {}", output.display());
    let total_clusters: usize = outputs.iter().map(|o| o.clusters.len()).sum();
    let unconverged = outputs.iter().filter(|o| !o.statistics.converged).count();
    match format {
        OutputFormat::Csv => {
            let mut wrote_header = false;
            for (event, result) in events.iter().zip(&outputs) {
                writer.write_clusters_csv(event.number, &result.clusters, !wrote_header)?;
                wrote_header = true;
            }
        }
        OutputFormat::Json => {
            let records: Vec<ClusterRecord> = events
                .iter()
                .zip(&outputs)
                .flat_map(|(event, result)| {
                    ClusterRecord::from_event(event.number, &result.clusters)
                })
                .collect();
            writer.write_clusters_json(&records)?;
        }
    }
    writer.flush()?;

    let elapsed = start.elapsed();
    println!(
        "Processed {} events from {} file(s) in {:.2}s",
        events.len(),
        inputs.len(),
        elapsed.as_secs_f64()
    );
    println!("Total hits: {}", total_hits);
    println!("Total clusters: {}", total_clusters);
    if unconverged > 0 {
        println!("Events with unconverged reclustering: {}", unconverged);
    }
    Ok(())
}

fn info(input: &Path) -> Result<()> {
    let reader = HitFileReader::open(input)?;
    let events = reader.read_events()?;
    let hits: Vec<&HitData> = events.iter().flat_map(|e| e.hits.iter()).collect();

    println!("File: {}", input.display());
    println!(
        "Size: {} bytes ({:.2} MB)",
        reader.file_size(),
        reader.file_size() as f64 / 1_000_000.0
    );
    println!("Events: {}", events.len());
    println!("Hits: {}", hits.len());

    if !hits.is_empty() {
        let (min_z, max_z) = range(hits.iter().map(|h| h.z));
        let (min_e, max_e) = range(hits.iter().map(|h| h.energy));
        let total: f64 = hits.iter().map(|h| h.energy).sum();
        println!("Z range: {} - {}", min_z, max_z);
        println!("Energy range: {} - {}", min_e, max_e);
        println!("Total energy: {:.3}", total);
    }
    Ok(())
}

fn range(values: impl Iterator<Item = f64>) -> (f64, f64) {
    values.fold((f64::INFINITY, f64::NEG_INFINITY), |(lo, hi), v| {
        (lo.min(v), hi.max(v))
    })
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Process {
            input,
            output,
            overrides,
            verbose,
        } => {
            init_logging(verbose);
            process(&input, &output, &overrides)?;
        }

        Commands::Info { input } => {
            init_logging(false);
            info(&input)?;
        }
    }

    Ok(())
}
