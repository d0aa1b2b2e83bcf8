//! AERMOD Post-Processor Library
//!
//! A Rust library for reading AERMOD POST and PLOT output files and reducing
//! them to per-receptor ranked concentration tables.
//!
//! This library provides tools for:
//! - Decoding fixed-width data rows through named column schemas
//! - Parsing the `*` documentation block that opens each result section
//! - Streaming hourly blocks into top-N tables, optionally split by year
//! - Reading BPIP building and source geometry
//! - Exporting ranked tables to CSV or Snappy-compressed Parquet

pub mod buildings;
pub mod config;
pub mod constants;
pub mod error;
pub mod header;
pub mod models;
pub mod processor;
pub mod record;
pub mod schema;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{ExportConfig, ExportFormat, ProcessorConfig};
pub use error::{PostError, Result};
pub use models::{Points, ProcessingStats, ResultKey, Termination};
pub use processor::PostProcessor;
pub use processor::ranking::RankedTable;
pub use schema::{Schema, SchemaRegistry};
