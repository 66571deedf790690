//! Command-line interface for building graph hierarchies.

use clap::{Parser, Subcommand};
use indicatif::{ProgressBar, ProgressStyle};
use log::{error, info, warn};
use rayon::prelude::*;
use std::path::{Path, PathBuf};
use std::time::Instant;

use crate::core::loaders::load_point_cloud;
use crate::core::transforms::subsample_cloud;
use crate::core::writers::write_hierarchy;
use crate::dataset::{DirectorySource, GraphDataset, SampleSource};
use crate::processors::hierarchy::{build_hierarchy, HierarchySummary};
use crate::PipelineConfig;

#[derive(Parser)]
#[command(name = "graph-hierarchy")]
#[command(about = "Multi-resolution point cloud graph builder", version)]
pub struct Cli {
    /// Path to YAML config file
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Increase verbosity
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build the hierarchy for one PLY or CSV point cloud
    Build {
        /// Input point cloud file
        input: PathBuf,
        /// Directory for CSV tables (nothing is written if omitted)
        #[arg(short, long)]
        output_dir: Option<PathBuf>,
        /// Subsample clouds larger than this
        #[arg(long)]
        max_points: Option<usize>,
    },

    /// Build hierarchies for every point cloud in a directory
    Scan {
        /// Directory containing PLY/CSV files
        directory: PathBuf,
        /// Limit number of files to process
        #[arg(long)]
        limit: Option<usize>,
        /// Fail on the first bad sample instead of substituting another
        #[arg(long)]
        test_mode: bool,
    },

    /// Write the effective configuration as YAML
    Config {
        /// Output file (stdout if omitted)
        output: Option<PathBuf>,
    },
}

/// Create a spinner for indeterminate operations
fn create_spinner(message: &str) -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    if let Ok(style) = ProgressStyle::default_spinner().template("{spinner:.green} {msg}") {
        pb.set_style(style);
    }
    pb.set_message(message.to_string());
    pb.enable_steady_tick(std::time::Duration::from_millis(100));
    pb
}

fn create_progress_bar(len: u64) -> ProgressBar {
    let pb = ProgressBar::new(len);
    if let Ok(style) = ProgressStyle::default_bar()
        .template("{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} ({eta})")
    {
        pb.set_style(style.progress_chars("#>-"));
    }
    pb
}

/// Print a summary box
fn print_summary(title: &str, items: &[(&str, String)]) {
    println!();
    println!("╔══════════════════════════════════════════════════════════════╗");
    println!("║ {:<62} ║", title);
    println!("╠══════════════════════════════════════════════════════════════╣");
    for (key, value) in items {
        let display_value = if value.chars().count() > 39 {
            format!("{}...", value.chars().take(36).collect::<String>())
        } else {
            value.clone()
        };
        println!("║ {:<20}: {:<39} ║", key, display_value);
    }
    println!("╚══════════════════════════════════════════════════════════════╝");
    println!();
}

fn join_counts(counts: &[usize]) -> String {
    counts
        .iter()
        .map(|n| n.to_string())
        .collect::<Vec<_>>()
        .join(" / ")
}

fn summary_rows(summary: &HierarchySummary) -> Vec<(String, String)> {
    summary
        .inter_edges
        .iter()
        .map(|(key, n)| (format!("Inter {}", key), n.to_string()))
        .chain(
            summary
                .intra_edges
                .iter()
                .map(|(key, n)| (format!("Intra {}", key), n.to_string())),
        )
        .collect()
}

/// Configuration from `path`, or defaults when no file was given.
///
/// A file that cannot be read or parsed is an error rather than a silent
/// fallback to defaults.
fn load_config(path: Option<&Path>) -> anyhow::Result<PipelineConfig> {
    match path {
        Some(path) => {
            let config = PipelineConfig::from_yaml(path)
                .map_err(|e| anyhow::anyhow!("failed to load config from {}: {}", path.display(), e))?;
            info!("Loaded config from: {}", path.display());
            Ok(config)
        }
        None => Ok(PipelineConfig::default()),
    }
}

pub fn run() {
    let cli = Cli::parse();

    // Initialize logging based on verbosity (must come first)
    env_logger::Builder::new()
        .filter_level(match cli.verbose {
            0 => log::LevelFilter::Warn,
            1 => log::LevelFilter::Info,
            _ => log::LevelFilter::Debug,
        })
        .format_timestamp_secs()
        .init();

    let config = match load_config(cli.config.as_deref()) {
        Ok(config) => config,
        Err(e) => {
            error!("{:#}", e);
            std::process::exit(1);
        }
    };

    let result = match cli.command {
        Commands::Build {
            input,
            output_dir,
            max_points,
        } => cmd_build(&input, output_dir.as_deref(), max_points, &config),
        Commands::Scan {
            directory,
            limit,
            test_mode,
        } => cmd_scan(&directory, limit, test_mode, config),
        Commands::Config { output } => cmd_config(output.as_deref(), &config),
    };

    if let Err(e) = result {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn cmd_build(
    input: &Path,
    output_dir: Option<&Path>,
    max_points: Option<usize>,
    config: &PipelineConfig,
) -> anyhow::Result<()> {
    let start = Instant::now();

    println!("Building graph hierarchy...");
    println!("Input: {}", input.display());

    let spinner = create_spinner("Loading point cloud...");
    let mut cloud = match load_point_cloud(input) {
        Ok(cloud) => cloud,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    let raw_points = cloud.len();
    if let Some(limit) = max_points.or(config.sampling.max_points) {
        cloud = subsample_cloud(&cloud, limit, config.sampling.seed);
    }

    spinner.set_message("Voxelizing and searching neighbors...");
    let hierarchy = match build_hierarchy(cloud.coords(), &config.graph) {
        Ok(h) => h,
        Err(e) => {
            spinner.finish_and_clear();
            return Err(e.into());
        }
    };

    let written = match output_dir {
        Some(dir) => {
            spinner.set_message("Writing tables...");
            let stem = input
                .file_stem()
                .map(|s| s.to_string_lossy().to_string())
                .unwrap_or_else(|| "sample".to_string());
            match write_hierarchy(dir, &stem, &hierarchy) {
                Ok(paths) => paths.len(),
                Err(e) => {
                    spinner.finish_and_clear();
                    return Err(e.into());
                }
            }
        }
        None => 0,
    };
    spinner.finish_and_clear();

    let summary = hierarchy.summary();
    let edge_rows = summary_rows(&summary);
    let mut items: Vec<(&str, String)> = vec![
        ("Input file", input.display().to_string()),
        ("Points loaded", raw_points.to_string()),
        ("Points used", cloud.len().to_string()),
        ("Nodes per level", join_counts(&summary.nodes_per_level)),
    ];
    items.extend(edge_rows.iter().map(|(k, v)| (k.as_str(), v.clone())));
    items.push(("Total edges", summary.total_edges().to_string()));
    if let Some(dir) = output_dir {
        items.push(("Output directory", dir.display().to_string()));
        items.push(("Files written", written.to_string()));
    }
    items.push(("Duration", format!("{:.2?}", start.elapsed())));

    print_summary("Graph Hierarchy Complete", &items);
    Ok(())
}

fn cmd_scan(
    directory: &Path,
    limit: Option<usize>,
    test_mode: bool,
    mut config: PipelineConfig,
) -> anyhow::Result<()> {
    let start = Instant::now();
    config.sampling.test_mode |= test_mode;

    let source = DirectorySource::new(directory)?;
    let dataset = GraphDataset::new(source, config)?;

    let total = limit.map_or(dataset.len(), |l| l.min(dataset.len()));
    if total == 0 {
        warn!("No PLY or CSV files found in {}", directory.display());
    }
    println!("Scanning {} samples in {}", total, directory.display());

    let pb = create_progress_bar(total as u64);
    let results: Vec<_> = (0..total)
        .into_par_iter()
        .map(|i| {
            let result = dataset.get(i);
            pb.inc(1);
            result
        })
        .collect();
    pb.finish_and_clear();

    let mut built = 0usize;
    let mut substituted = 0usize;
    let mut failed = 0usize;
    let mut nodes: Vec<usize> = Vec::new();
    let mut edges = 0usize;

    for (i, result) in results.into_iter().enumerate() {
        match result {
            Ok(sample) => {
                built += 1;
                if sample.index != sample.requested {
                    substituted += 1;
                }
                let summary = sample.hierarchy.summary();
                if nodes.len() < summary.nodes_per_level.len() {
                    nodes.resize(summary.nodes_per_level.len(), 0);
                }
                for (sum, n) in nodes.iter_mut().zip(&summary.nodes_per_level) {
                    *sum += n;
                }
                edges += summary.total_edges();
            }
            Err(e) => {
                failed += 1;
                error!("{}: {}", dataset.source().describe(i), e);
                if dataset.config().sampling.test_mode {
                    return Err(e.into());
                }
            }
        }
    }

    print_summary(
        "Scan Complete",
        &[
            ("Directory", directory.display().to_string()),
            ("Samples built", built.to_string()),
            ("Substituted", substituted.to_string()),
            ("Failed", failed.to_string()),
            ("Nodes per level", join_counts(&nodes)),
            ("Total edges", edges.to_string()),
            ("Duration", format!("{:.2?}", start.elapsed())),
        ],
    );
    Ok(())
}

fn cmd_config(output: Option<&Path>, config: &PipelineConfig) -> anyhow::Result<()> {
    match output {
        Some(path) => {
            config
                .to_yaml(path)
                .map_err(|e| anyhow::anyhow!("failed to write {}: {}", path.display(), e))?;
            println!("Wrote configuration to {}", path.display());
        }
        None => print!("{}", serde_yaml::to_string(config)?),
    }
    Ok(())
}
