//! Command implementation for the AERMOD post-processor CLI
//!
//! Runs every input file through the processing engine, prints a summary per
//! result table and writes exports when an output directory is given.

use crate::buildings::{BuildingSet, read_buildings};
use crate::cli::args::Args;
use crate::config::ExportConfig;
use crate::models::ProcessingStats;
use crate::processor::PostProcessor;
use crate::processor::writer::{TableWriter, rank_label, summarize};
use crate::schema::SchemaRegistry;
use anyhow::{Context, Result};
use colored::*;
use indicatif::{HumanDuration, ProgressBar, ProgressStyle};
use std::io::BufRead;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Totals over one invocation
#[derive(Debug, Clone, Default)]
pub struct RunSummary {
    pub files_processed: usize,
    /// Files whose reading stopped before a clean end of file
    pub files_stopped_early: usize,
    pub blocks_processed: usize,
    pub files_written: Vec<PathBuf>,
    pub processing_time: Duration,
}

/// Main command runner
pub fn run(args: Args) -> Result<RunSummary> {
    let start_time = Instant::now();

    setup_logging(&args);
    debug!("Command line arguments: {:?}", args);

    args.validate()?;
    let processor_config = args.processor_config();
    processor_config.validate()?;
    let export_config = args.export_config();
    export_config.validate()?;

    let registry = SchemaRegistry::new();
    let files = args.input_files()?;
    info!("Processing {} files", files.len());

    if let Some(path) = &args.buildings {
        let set = read_buildings(path, !args.no_sources)
            .with_context(|| format!("Failed to read building file {}", path.display()))?;
        report_buildings(path, &set);
    }

    let mut summary = RunSummary::default();
    for path in &files {
        let progress = if args.show_progress() {
            Some(spinner(path)?)
        } else {
            None
        };

        let mut processor = PostProcessor::open(path, processor_config.clone(), &registry)
            .with_context(|| format!("Failed to open {}", path.display()))?;
        if let Some(pb) = &progress {
            processor = processor.with_progress(pb.clone());
        }

        let stats = processor
            .process()
            .with_context(|| format!("Failed to process {}", path.display()))?;

        if let Some(pb) = &progress {
            pb.finish_and_clear();
        }

        summary.files_processed += 1;
        summary.blocks_processed += stats.blocks_processed;
        if !stats.termination.is_clean() {
            summary.files_stopped_early += 1;
        }

        report_file(path, &processor, &stats, &export_config);

        if let Some(output_dir) = &args.output {
            let written = export_file(path, output_dir, &processor, &export_config, args.timestamps)
                .with_context(|| format!("Failed to export results of {}", path.display()))?;
            summary.files_written.extend(written);
        }
    }

    summary.processing_time = start_time.elapsed();
    report_run(&summary);
    Ok(summary)
}

/// Set up structured logging based on CLI arguments
fn setup_logging(args: &Args) {
    use tracing_subscriber::{EnvFilter, fmt, layer::SubscriberExt, util::SubscriberInitExt};

    let log_level = args.get_log_level();

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new(format!("aermod_post={}", log_level)));

    let initialised = if args.quiet {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_writer(std::io::stderr)
                    .compact(),
            )
            .try_init()
    } else {
        tracing_subscriber::registry()
            .with(filter)
            .with(
                fmt::layer()
                    .with_target(false)
                    .with_level(true)
                    .with_timer(fmt::time::uptime())
                    .with_writer(std::io::stderr),
            )
            .try_init()
    };

    if initialised.is_err() {
        debug!("Logging was already initialised");
    } else {
        debug!("Logging initialized at level: {}", log_level);
    }
}

fn spinner(path: &Path) -> Result<ProgressBar> {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.green} [{elapsed_precise}] {pos} blocks {msg}")?,
    );
    pb.set_message(path.display().to_string());
    pb.enable_steady_tick(Duration::from_millis(120));
    Ok(pb)
}

/// Write every table of one file, plus the timestamps if asked for
fn export_file<R: BufRead>(
    input: &Path,
    output_dir: &Path,
    processor: &PostProcessor<R>,
    config: &ExportConfig,
    with_timestamps: bool,
) -> crate::error::Result<Vec<PathBuf>> {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .unwrap_or_else(|| "output".to_string());
    let writer = TableWriter::new(output_dir.join(stem), config.clone());

    let mut written = Vec::new();
    for (key, table) in processor.tables() {
        written.push(writer.write_table(key, table, processor.receptors())?);
    }
    if with_timestamps {
        if processor.timestamps().is_empty() {
            warn!("{} has no hourly timestamps to write", input.display());
        } else {
            written.push(writer.write_timestamps(processor.timestamps())?);
        }
    }
    Ok(written)
}

fn report_file<R: BufRead>(
    path: &Path,
    processor: &PostProcessor<R>,
    stats: &ProcessingStats,
    config: &ExportConfig,
) {
    println!("\n{}", path.display().to_string().bright_green().bold());
    println!(
        "   • {} sections, {} blocks, {} receptors ({} ms)",
        stats.sections, stats.blocks_processed, stats.receptors, stats.processing_time_ms
    );
    if !stats.termination.is_clean() {
        println!(
            "   {} {}",
            "Stopped early:".yellow().bold(),
            stats.termination.to_string().yellow()
        );
    }

    let top_n = processor.config().top_n;
    let ranks: Vec<usize> = if top_n > 1 { vec![0, top_n - 1] } else { vec![0] };

    for (key, table) in processor.tables() {
        println!("   {}", key.to_string().cyan());
        for &rank in &ranks {
            match summarize(key, table, processor.receptors(), rank, config) {
                Some(max) => println!(
                    "      {} highest: {:.5} at ({:.2}, {:.2}, {:.2})",
                    rank_label(rank),
                    max.value,
                    max.location.0,
                    max.location.1,
                    max.location.2
                ),
                None => println!("      {} highest: no receptors", rank_label(rank)),
            }
        }
    }
}

fn report_buildings(path: &Path, set: &BuildingSet) {
    println!("\n{}", path.display().to_string().bright_green().bold());
    println!(
        "   • {} buildings, {} vertices, {} sources ({} {})",
        set.buildings.len(),
        set.vertex_count(),
        set.sources.len(),
        set.units,
        set.unit_value
    );
    for building in &set.buildings {
        println!(
            "      {} ({} stories, base {:.2})",
            building.name, building.stories, building.base_elevation
        );
    }
}

fn report_run(summary: &RunSummary) {
    println!(
        "\n{} {} files, {} blocks in {}",
        "Done:".bright_green().bold(),
        summary.files_processed,
        summary.blocks_processed,
        HumanDuration(summary.processing_time)
    );
    if summary.files_stopped_early > 0 {
        println!(
            "{} {} files stopped before the end of file",
            "Warning:".yellow().bold(),
            summary.files_stopped_early
        );
    }
    if !summary.files_written.is_empty() {
        println!("Output files:");
        for file in &summary.files_written {
            println!("   • {}", file.display());
        }
    }
}
