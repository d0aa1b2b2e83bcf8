//! Configuration management and validation.
//!
//! Provides the configuration structures for file processing (schema,
//! century, ranking depth, annual partitioning) and for exporting ranked
//! tables, replacing ad-hoc option bags with explicit, validated values.

use crate::constants::{DEFAULT_CENTURY, DEFAULT_SCHEMA, DEFAULT_TOP_N};
use crate::error::{PostError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Configuration for processing one output file
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessorConfig {
    /// Name of the column schema in the registry
    pub schema: String,

    /// Century prefixed to two-digit years (20 => 20xx)
    pub century: i32,

    /// Number of highest values retained per receptor
    pub top_n: usize,

    /// Partition the ranked values by calendar year
    pub annual: bool,
}

impl Default for ProcessorConfig {
    fn default() -> Self {
        Self {
            schema: DEFAULT_SCHEMA.to_string(),
            century: DEFAULT_CENTURY,
            top_n: DEFAULT_TOP_N,
            annual: false,
        }
    }
}

impl ProcessorConfig {
    /// Use a different schema
    pub fn with_schema(mut self, schema: impl Into<String>) -> Self {
        self.schema = schema.into();
        self
    }

    /// Set the century used to expand two-digit years
    pub fn with_century(mut self, century: i32) -> Self {
        self.century = century;
        self
    }

    /// Set how many ranked values are kept per receptor
    pub fn with_top_n(mut self, top_n: usize) -> Self {
        self.top_n = top_n;
        self
    }

    /// Enable annual partitioning
    pub fn with_annual(mut self) -> Self {
        self.annual = true;
        self
    }

    /// Check the configuration for values the engine cannot work with
    pub fn validate(&self) -> Result<()> {
        if self.top_n == 0 {
            return Err(PostError::configuration(
                "top_n must keep at least one ranked value",
            ));
        }
        if self.century < 0 {
            return Err(PostError::configuration(format!(
                "century must not be negative, got {}",
                self.century
            )));
        }
        if self.schema.trim().is_empty() {
            return Err(PostError::configuration("schema name is empty"));
        }
        debug!(
            "Processor config: schema={} century={} top_n={} annual={}",
            self.schema, self.century, self.top_n, self.annual
        );
        Ok(())
    }
}

/// Output format for exported tables
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExportFormat {
    Csv,
    Parquet,
}

impl ExportFormat {
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Csv => "csv",
            ExportFormat::Parquet => "parquet",
        }
    }
}

/// Configuration for exporting and summarising ranked tables
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExportConfig {
    pub format: ExportFormat,

    /// Multiplier applied to every concentration (unit conversion)
    pub scalar: f64,

    /// Background concentration added after scaling
    pub background: f64,

    /// Keep only ground-level receptors (flagpole height of zero)
    pub exclude_flagpole: bool,
}

impl Default for ExportConfig {
    fn default() -> Self {
        Self {
            format: ExportFormat::Csv,
            scalar: 1.0,
            background: 0.0,
            exclude_flagpole: false,
        }
    }
}

impl ExportConfig {
    pub fn with_format(mut self, format: ExportFormat) -> Self {
        self.format = format;
        self
    }

    pub fn with_scalar(mut self, scalar: f64) -> Self {
        self.scalar = scalar;
        self
    }

    pub fn with_background(mut self, background: f64) -> Self {
        self.background = background;
        self
    }

    pub fn without_flagpole_receptors(mut self) -> Self {
        self.exclude_flagpole = true;
        self
    }

    /// Apply scaling and background to a raw concentration
    pub fn adjust(&self, value: f64) -> f64 {
        value * self.scalar + self.background
    }

    pub fn validate(&self) -> Result<()> {
        if !self.scalar.is_finite() || !self.background.is_finite() {
            return Err(PostError::configuration(format!(
                "scalar ({}) and background ({}) must be finite",
                self.scalar, self.background
            )));
        }
        Ok(())
    }
}
