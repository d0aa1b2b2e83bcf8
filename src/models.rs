//! Core data structures and types for AERMOD output processing.
//!
//! Defines result keys, the receptor/point container, section outcomes and
//! processing statistics used throughout the library.

use crate::error::{PostError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;

/// Identifies one data table within an output file
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResultKey {
    /// Averaging period, e.g. `1-HR`
    pub result_type: String,
    /// Result description, e.g. `CONCURRENT` or `HIGH 1ST HIGH`
    pub result_form: String,
    pub source_group: String,
}

impl ResultKey {
    pub fn new(
        result_type: impl Into<String>,
        result_form: impl Into<String>,
        source_group: impl Into<String>,
    ) -> Self {
        Self {
            result_type: result_type.into(),
            result_form: result_form.into(),
            source_group: source_group.into(),
        }
    }

    /// File-name friendly form: parts joined by `_`, spaces replaced
    pub fn file_stem(&self) -> String {
        [&self.result_type, &self.result_form, &self.source_group]
            .iter()
            .map(|part| part.replace(' ', "_"))
            .collect::<Vec<_>>()
            .join("_")
    }
}

impl fmt::Display for ResultKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} {} ({})",
            self.result_type, self.result_form, self.source_group
        )
    }
}

/// Fixed-length set of points stored as parallel x, y and z sequences.
///
/// Used for receptor locations, building footprints and source positions.
/// The length is fixed at construction; writes outside it fail with
/// [`PostError::IndexOutOfRange`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Points {
    x: Vec<f64>,
    y: Vec<f64>,
    z: Vec<f64>,
}

impl Points {
    /// `len` points at the origin
    pub fn new(len: usize) -> Self {
        Self {
            x: vec![0.0; len],
            y: vec![0.0; len],
            z: vec![0.0; len],
        }
    }

    /// Points from x and y coordinates, with z = 0
    pub fn from_xy(x: Vec<f64>, y: Vec<f64>) -> Result<Self> {
        let z = vec![0.0; x.len()];
        Self::from_xyz(x, y, z)
    }

    /// Points from three equally long coordinate sequences
    pub fn from_xyz(x: Vec<f64>, y: Vec<f64>, z: Vec<f64>) -> Result<Self> {
        if x.len() != y.len() || x.len() != z.len() {
            return Err(PostError::DimensionMismatch {
                reason: format!(
                    "coordinate lengths differ: x={}, y={}, z={}",
                    x.len(),
                    y.len(),
                    z.len()
                ),
            });
        }
        Ok(Self { x, y, z })
    }

    pub fn len(&self) -> usize {
        self.x.len()
    }

    pub fn is_empty(&self) -> bool {
        self.x.is_empty()
    }

    pub fn x(&self) -> &[f64] {
        &self.x
    }

    pub fn y(&self) -> &[f64] {
        &self.y
    }

    pub fn z(&self) -> &[f64] {
        &self.z
    }

    /// Coordinates of point `index`
    pub fn get(&self, index: usize) -> Option<(f64, f64, f64)> {
        if index < self.len() {
            Some((self.x[index], self.y[index], self.z[index]))
        } else {
            None
        }
    }

    /// Overwrite all coordinates of point `index`
    pub fn set(&mut self, index: usize, x: f64, y: f64, z: f64) -> Result<()> {
        self.check(index)?;
        self.x[index] = x;
        self.y[index] = y;
        self.z[index] = z;
        Ok(())
    }

    pub fn set_x(&mut self, index: usize, value: f64) -> Result<()> {
        self.check(index)?;
        self.x[index] = value;
        Ok(())
    }

    pub fn set_y(&mut self, index: usize, value: f64) -> Result<()> {
        self.check(index)?;
        self.y[index] = value;
        Ok(())
    }

    pub fn set_z(&mut self, index: usize, value: f64) -> Result<()> {
        self.check(index)?;
        self.z[index] = value;
        Ok(())
    }

    /// Mean of the x and y coordinates, `None` for an empty set
    pub fn centroid(&self) -> Option<(f64, f64)> {
        if self.is_empty() {
            return None;
        }
        let n = self.len() as f64;
        Some((
            self.x.iter().sum::<f64>() / n,
            self.y.iter().sum::<f64>() / n,
        ))
    }

    fn check(&self, index: usize) -> Result<()> {
        if index >= self.len() {
            return Err(PostError::IndexOutOfRange {
                index,
                len: self.len(),
            });
        }
        Ok(())
    }
}

/// How a section's data ended
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum SectionStatus {
    /// All blocks were read up to a section boundary or the end of the file
    Complete,
    /// The stream ended part-way through an hourly block
    Truncated,
    /// A data row could not be decoded
    Malformed(String),
}

/// Per-section processing outcome
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SectionSummary {
    pub key: ResultKey,
    pub title: String,
    /// Blocks committed to the ranked table
    pub blocks: usize,
    pub status: SectionStatus,
}

/// Why the read loop stopped
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Termination {
    /// Clean end of file after complete data
    EndOfFile,
    /// The stream ended inside a metadata or title block
    TruncatedHeader(String),
    /// A metadata block could not be interpreted
    HeaderFormat(String),
    /// The stream ended inside an hourly block
    TruncatedBlock,
    /// A data row could not be decoded
    MalformedRecord(String),
}

impl Termination {
    /// True if the file was read to a clean end
    pub fn is_clean(&self) -> bool {
        matches!(self, Termination::EndOfFile)
    }
}

impl fmt::Display for Termination {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Termination::EndOfFile => write!(f, "end of file"),
            Termination::TruncatedHeader(reason) => write!(f, "truncated header: {}", reason),
            Termination::HeaderFormat(reason) => write!(f, "unreadable header: {}", reason),
            Termination::TruncatedBlock => write!(f, "truncated hourly block"),
            Termination::MalformedRecord(reason) => write!(f, "malformed record: {}", reason),
        }
    }
}

/// Processing statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessingStats {
    pub input_path: Option<PathBuf>,
    pub sections: usize,
    pub blocks_processed: usize,
    pub rows_processed: usize,
    pub receptors: usize,
    pub termination: Termination,
    pub processing_time_ms: u128,
}

impl Default for ProcessingStats {
    fn default() -> Self {
        Self {
            input_path: None,
            sections: 0,
            blocks_processed: 0,
            rows_processed: 0,
            receptors: 0,
            termination: Termination::EndOfFile,
            processing_time_ms: 0,
        }
    }
}
