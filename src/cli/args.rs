//! Command-line argument definitions for the AERMOD post-processor
//!
//! Defines the CLI interface using the clap derive API and converts the
//! parsed arguments into processing and export configuration.

use crate::config::{ExportConfig, ExportFormat, ProcessorConfig};
use crate::constants::{DEFAULT_CENTURY, DEFAULT_SCHEMA, DEFAULT_TOP_N};
use crate::error::{PostError, Result};
use clap::{Parser, ValueEnum};
use std::path::PathBuf;

/// Rank AERMOD POST/PLOT file concentrations per receptor
///
/// Reads one or more AERMOD output files, keeps the highest concentrations
/// at every receptor and optionally exports the ranked tables.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "aermod-post",
    version,
    about = "Rank AERMOD POST/PLOT file concentrations per receptor",
    long_about = "Streams AERMOD POST and PLOT output files, keeps the top-N concentrations \
                  at every receptor (optionally per calendar year) and exports the ranked \
                  tables to CSV or Parquet."
)]
pub struct Args {
    /// Output files to process (paths or glob patterns)
    #[arg(value_name = "FILE", required = true)]
    pub inputs: Vec<String>,

    /// Column layout of the data rows
    #[arg(short = 's', long, value_name = "NAME", default_value = DEFAULT_SCHEMA)]
    pub schema: String,

    /// Number of highest values kept per receptor
    #[arg(short = 'n', long = "ranked", value_name = "N", default_value_t = DEFAULT_TOP_N)]
    pub top_n: usize,

    /// Rank values separately for each calendar year
    #[arg(short, long)]
    pub annual: bool,

    /// Century prefixed to the two-digit years of the date field
    #[arg(long, value_name = "CC", default_value_t = DEFAULT_CENTURY)]
    pub century: i32,

    /// BPIP building file to read alongside the output files
    #[arg(short, long, value_name = "PATH")]
    pub buildings: Option<PathBuf>,

    /// Do not read the source list of the building file
    #[arg(long)]
    pub no_sources: bool,

    /// Directory to write ranked tables into
    #[arg(short, long, value_name = "DIR")]
    pub output: Option<PathBuf>,

    /// Export format for ranked tables
    #[arg(short, long, value_enum, default_value = "csv")]
    pub format: FormatArg,

    /// Multiplier applied to every concentration on export
    #[arg(long, default_value_t = 1.0)]
    pub scalar: f64,

    /// Background concentration added after scaling
    #[arg(long, default_value_t = 0.0)]
    pub background: f64,

    /// Only export and summarise ground-level receptors
    #[arg(long)]
    pub exclude_flagpole: bool,

    /// Also write the hourly timestamps of each file
    #[arg(long)]
    pub timestamps: bool,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    pub verbose: u8,

    /// Only print errors
    #[arg(short, long, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Export format as given on the command line
#[derive(Debug, Clone, Copy, PartialEq, Eq, ValueEnum)]
pub enum FormatArg {
    Csv,
    Parquet,
}

impl From<FormatArg> for ExportFormat {
    fn from(format: FormatArg) -> Self {
        match format {
            FormatArg::Csv => ExportFormat::Csv,
            FormatArg::Parquet => ExportFormat::Parquet,
        }
    }
}

impl Args {
    /// Validate argument combinations
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(PostError::configuration("--ranked must be at least 1"));
        }
        if self.timestamps && self.output.is_none() {
            return Err(PostError::configuration(
                "--timestamps needs an --output directory",
            ));
        }
        Ok(())
    }

    /// Expand glob patterns into the list of files to process.
    ///
    /// Arguments without glob metacharacters are passed through as-is so a
    /// missing file is reported by name later.
    pub fn input_files(&self) -> Result<Vec<PathBuf>> {
        let mut files = Vec::new();
        for input in &self.inputs {
            if !input.contains(['*', '?', '[']) {
                files.push(PathBuf::from(input));
                continue;
            }

            let paths = glob::glob(input).map_err(|e| {
                PostError::configuration(format!("invalid pattern '{}': {}", input, e))
            })?;
            let before = files.len();
            for entry in paths {
                files.push(entry.map_err(|e| PostError::Io(e.into_error()))?);
            }
            if files.len() == before {
                return Err(PostError::configuration(format!(
                    "pattern '{}' matched no files",
                    input
                )));
            }
        }
        Ok(files)
    }

    pub fn processor_config(&self) -> ProcessorConfig {
        let config = ProcessorConfig::default()
            .with_schema(self.schema.clone())
            .with_century(self.century)
            .with_top_n(self.top_n);
        if self.annual { config.with_annual() } else { config }
    }

    pub fn export_config(&self) -> ExportConfig {
        let config = ExportConfig::default()
            .with_format(self.format.into())
            .with_scalar(self.scalar)
            .with_background(self.background);
        if self.exclude_flagpole {
            config.without_flagpole_receptors()
        } else {
            config
        }
    }

    /// Log level for the tracing filter
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Show progress spinners unless quiet
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}
