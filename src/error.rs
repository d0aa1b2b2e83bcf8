//! Error handling for AERMOD output processing.
//!
//! Provides error types with context for schema lookup, header and record
//! decoding, receptor container access, geometry parsing and export failures.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum PostError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("Unknown schema '{name}' (known: {known})")]
    UnknownSchema { name: String, known: String },

    #[error("Truncated header: expected {expected} lines, found {found}")]
    TruncatedHeader { expected: usize, found: usize },

    #[error("Header format error: {reason}")]
    HeaderFormat { reason: String },

    #[error("Malformed record: {reason}")]
    MalformedRecord { reason: String },

    #[error("Index {index} out of range for container of length {len}")]
    IndexOutOfRange { index: usize, len: usize },

    #[error("Input stream exhausted")]
    StreamExhausted,

    #[error("Dimension mismatch: {reason}")]
    DimensionMismatch { reason: String },

    #[error("Geometry format error at line {line}: {reason}")]
    GeometryFormat { line: usize, reason: String },

    #[error("Input file not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl PostError {
    /// Create a malformed record error
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedRecord {
            reason: reason.into(),
        }
    }

    /// Create a header format error
    pub fn header_format(reason: impl Into<String>) -> Self {
        Self::HeaderFormat {
            reason: reason.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// True for the error kinds the aggregation loop treats as end of usable data
    pub fn is_end_of_data(&self) -> bool {
        matches!(
            self,
            Self::TruncatedHeader { .. }
                | Self::HeaderFormat { .. }
                | Self::MalformedRecord { .. }
                | Self::StreamExhausted
        )
    }
}

pub type Result<T> = std::result::Result<T, PostError>;
