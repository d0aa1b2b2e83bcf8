//! Table export for ranked concentration results
//!
//! Converts ranked tables and receptor locations into Polars frames and
//! writes them as CSV or Snappy-compressed Parquet files.

use super::ranking::RankedTable;
use crate::config::{ExportConfig, ExportFormat};
use crate::constants::{
    DATETIME_COLUMN, DATETIME_FORMAT, MEAN_SUFFIX, TIMESTAMPS_FILE, X_COLUMN, Y_COLUMN, Z_COLUMN,
};
use crate::error::{PostError, Result};
use crate::models::{Points, ResultKey};

use chrono::NaiveDateTime;
use polars::prelude::{Column, CsvWriter, DataFrame, ParquetCompression, ParquetWriter, SerWriter};
use serde::Serialize;
use std::fs::{self, File};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// English ordinal for a 1-based rank: 1st, 2nd, 3rd, 4th, 11th, 112th, 121st
pub fn ordinal(value: usize) -> String {
    let suffix = match (value % 10, value % 100) {
        (_, 11..=13) => "th",
        (1, _) => "st",
        (2, _) => "nd",
        (3, _) => "rd",
        _ => "th",
    };
    format!("{}{}", value, suffix)
}

/// Column label for a 0-based rank index
pub fn rank_label(rank: usize) -> String {
    ordinal(rank + 1)
}

/// Build the export frame for one ranked table.
///
/// Columns are `x`, `y`, `z` followed by one column per rank. Annual tables
/// get one column per rank and year plus a mean over years. Concentrations
/// are scaled and offset by the export configuration.
pub fn build_frame(
    table: &RankedTable,
    receptors: &Points,
    config: &ExportConfig,
) -> Result<DataFrame> {
    config.validate()?;
    if receptors.len() != table.receptors() {
        return Err(PostError::DimensionMismatch {
            reason: format!(
                "{} receptor locations for a table of {} receptors",
                receptors.len(),
                table.receptors()
            ),
        });
    }

    let keep = receptor_mask(receptors, config);
    let select = |values: &[f64]| -> Vec<f64> {
        values
            .iter()
            .zip(&keep)
            .filter_map(|(value, &kept)| kept.then_some(*value))
            .collect()
    };
    let adjusted = |values: Vec<f64>| -> Vec<f64> {
        select(&values).into_iter().map(|v| config.adjust(v)).collect()
    };

    let mut columns = vec![
        Column::new(X_COLUMN.into(), select(receptors.x())),
        Column::new(Y_COLUMN.into(), select(receptors.y())),
        Column::new(Z_COLUMN.into(), select(receptors.z())),
    ];

    for rank in 0..table.top_n() {
        let label = rank_label(rank);
        if table.is_annual() {
            for year_index in 0..table.year_count() {
                let year = table
                    .years()
                    .get(year_index)
                    .map(|y| y.to_string())
                    .unwrap_or_else(|| (year_index + 1).to_string());
                if let Some(values) = table.rank_column(rank, year_index) {
                    columns.push(Column::new(
                        format!("{}_{}", label, year).into(),
                        adjusted(values),
                    ));
                }
            }
            if let Some(values) = table.mean_rank_column(rank) {
                columns.push(Column::new(
                    format!("{}_{}", label, MEAN_SUFFIX).into(),
                    adjusted(values),
                ));
            }
        } else if let Some(values) = table.rank_column(rank, 0) {
            columns.push(Column::new(label.into(), adjusted(values)));
        }
    }

    let df = DataFrame::new(columns)?;
    debug!("Built frame {:?}", df.shape());
    Ok(df)
}

/// Write a frame to `path` in the given format
pub fn write_frame(df: &mut DataFrame, path: &Path, format: ExportFormat) -> Result<()> {
    if let Some(parent) = path.parent() {
        if !parent.as_os_str().is_empty() {
            fs::create_dir_all(parent)?;
        }
    }

    let mut file = File::create(path)?;
    match format {
        ExportFormat::Csv => {
            CsvWriter::new(&mut file).include_header(true).finish(df)?;
        }
        ExportFormat::Parquet => {
            ParquetWriter::new(file)
                .with_compression(ParquetCompression::Snappy)
                .finish(df)?;
        }
    }
    Ok(())
}

/// Highest value of one rank across the receptors of a table
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TableSummary {
    pub key: ResultKey,
    /// 0-based rank index
    pub rank: usize,
    /// Maximum adjusted concentration
    pub value: f64,
    pub receptor: usize,
    pub location: (f64, f64, f64),
}

/// Find the receptor holding the highest value at `rank`.
///
/// Annual tables are summarised on the mean over years. Returns `None` if
/// the rank is out of range or no receptor passes the flagpole filter.
pub fn summarize(
    key: &ResultKey,
    table: &RankedTable,
    receptors: &Points,
    rank: usize,
    config: &ExportConfig,
) -> Option<TableSummary> {
    let values = if table.is_annual() {
        table.mean_rank_column(rank)?
    } else {
        table.rank_column(rank, 0)?
    };
    let keep = receptor_mask(receptors, config);

    values
        .iter()
        .enumerate()
        .filter(|(index, _)| keep.get(*index).copied().unwrap_or(false))
        .fold(None, |best: Option<(usize, f64)>, (index, &value)| match best {
            Some((_, max)) if max >= value => best,
            _ => Some((index, value)),
        })
        .and_then(|(receptor, value)| {
            receptors.get(receptor).map(|location| TableSummary {
                key: key.clone(),
                rank,
                value: config.adjust(value),
                receptor,
                location,
            })
        })
}

fn receptor_mask(receptors: &Points, config: &ExportConfig) -> Vec<bool> {
    receptors
        .z()
        .iter()
        .map(|&z| !config.exclude_flagpole || z == 0.0)
        .collect()
}

/// Writes ranked tables and the timestamp log into an output directory
#[derive(Debug, Clone)]
pub struct TableWriter {
    output_dir: PathBuf,
    config: ExportConfig,
}

impl TableWriter {
    pub fn new(output_dir: PathBuf, config: ExportConfig) -> Self {
        Self { output_dir, config }
    }

    pub fn output_dir(&self) -> &Path {
        &self.output_dir
    }

    /// Output path for a result key
    pub fn table_path(&self, key: &ResultKey) -> PathBuf {
        self.output_dir
            .join(format!("{}.{}", key.file_stem(), self.config.format.extension()))
    }

    /// Export one table, returning the written path
    pub fn write_table(
        &self,
        key: &ResultKey,
        table: &RankedTable,
        receptors: &Points,
    ) -> Result<PathBuf> {
        let mut df = build_frame(table, receptors, &self.config)?;
        let path = self.table_path(key);
        write_frame(&mut df, &path, self.config.format)?;
        info!("Wrote {} ({} rows) to {}", key, df.height(), path.display());
        Ok(path)
    }

    /// Export the block timestamps as a single `datetime` column
    pub fn write_timestamps(&self, timestamps: &[NaiveDateTime]) -> Result<PathBuf> {
        let formatted: Vec<String> = timestamps
            .iter()
            .map(|stamp| stamp.format(DATETIME_FORMAT).to_string())
            .collect();
        let mut df = DataFrame::new(vec![Column::new(DATETIME_COLUMN.into(), formatted)])?;

        let path = self.output_dir.join(TIMESTAMPS_FILE);
        write_frame(&mut df, &path, ExportFormat::Csv)?;
        info!("Wrote {} timestamps to {}", timestamps.len(), path.display());
        Ok(path)
    }
}
