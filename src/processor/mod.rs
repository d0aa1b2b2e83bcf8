//! Streaming aggregation engine for AERMOD POST/PLOT files.
//!
//! Drives the read loop over an output file: section metadata, title lines,
//! then hourly (or single-pass) blocks of one row per receptor. Each block is
//! folded into the ranked table of its result key, so memory stays bounded
//! by `receptors * top_n * years` no matter how many hours the file holds.

pub mod ranking;
pub mod stream;
pub mod writer;

#[cfg(test)]
pub mod tests;

use self::ranking::{RankedTable, slice_cells};
use self::stream::{LineSource, ReadOutcome};

use crate::config::ProcessorConfig;
use crate::error::{PostError, Result};
use crate::header::{self, SectionMeta};
use crate::models::{Points, ProcessingStats, ResultKey, SectionStatus, SectionSummary, Termination};
use crate::record::DecodedRecord;
use crate::schema::{Schema, SchemaRegistry};

use chrono::{Datelike, NaiveDateTime};
use indicatif::ProgressBar;
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{debug, info, warn};

/// Outcome of reading one block of receptor rows
enum BlockRead {
    Complete(Vec<DecodedRecord>),
    /// Section or stream ended before the first row of the block
    Boundary,
    /// Section or stream ended inside the block
    Truncated { rows_read: usize },
    Malformed(String),
}

/// Processor for a single AERMOD output file
pub struct PostProcessor<R: BufRead> {
    source: Option<LineSource<R>>,
    input_path: Option<PathBuf>,
    schema: Schema,
    config: ProcessorConfig,
    receptors: Points,
    receptors_populated: bool,
    receptor_count: Option<usize>,
    result_keys: Vec<ResultKey>,
    tables: HashMap<ResultKey, RankedTable>,
    timestamps: Vec<NaiveDateTime>,
    sections: Vec<SectionSummary>,
    documentation: Vec<Vec<String>>,
    progress: Option<ProgressBar>,
}

impl PostProcessor<BufReader<File>> {
    /// Open an output file for processing
    pub fn open(path: &Path, config: ProcessorConfig, registry: &SchemaRegistry) -> Result<Self> {
        if !path.exists() {
            return Err(PostError::FileNotFound {
                path: path.to_path_buf(),
            });
        }

        info!("Opening file: {}", path.display());
        let file = File::open(path)?;
        let mut processor = Self::from_reader(BufReader::new(file), config, registry)?;
        processor.input_path = Some(path.to_path_buf());
        Ok(processor)
    }
}

impl<R: BufRead> PostProcessor<R> {
    /// Create a processor over any buffered reader
    pub fn from_reader(reader: R, config: ProcessorConfig, registry: &SchemaRegistry) -> Result<Self> {
        config.validate()?;
        let schema = registry.lookup(&config.schema)?.clone();

        Ok(Self {
            source: Some(LineSource::new(reader)),
            input_path: None,
            schema,
            config,
            receptors: Points::new(0),
            receptors_populated: false,
            receptor_count: None,
            result_keys: Vec::new(),
            tables: HashMap::new(),
            timestamps: Vec::new(),
            sections: Vec::new(),
            documentation: Vec::new(),
            progress: None,
        })
    }

    /// Report committed blocks on a progress bar
    pub fn with_progress(mut self, progress: ProgressBar) -> Self {
        self.progress = Some(progress);
        self
    }

    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    pub fn config(&self) -> &ProcessorConfig {
        &self.config
    }

    /// Result keys in the order they were first seen
    pub fn result_keys(&self) -> &[ResultKey] {
        &self.result_keys
    }

    pub fn table(&self, key: &ResultKey) -> Option<&RankedTable> {
        self.tables.get(key)
    }

    /// Tables in the order their keys were first seen
    pub fn tables(&self) -> impl Iterator<Item = (&ResultKey, &RankedTable)> {
        self.result_keys
            .iter()
            .filter_map(|key| self.tables.get(key).map(|table| (key, table)))
    }

    /// Receptor locations (z holds the flagpole height)
    pub fn receptors(&self) -> &Points {
        &self.receptors
    }

    /// Stamp of the first row of every committed hourly block
    pub fn timestamps(&self) -> &[NaiveDateTime] {
        &self.timestamps
    }

    pub fn sections(&self) -> &[SectionSummary] {
        &self.sections
    }

    /// Raw documentation blocks, one per section
    pub fn documentation(&self) -> &[Vec<String>] {
        &self.documentation
    }

    /// True once `process` has consumed the input stream
    pub fn is_consumed(&self) -> bool {
        self.source.is_none()
    }

    /// Run the read loop to the end of usable data.
    ///
    /// Header, record and truncation problems stop the loop and are reported
    /// in [`ProcessingStats::termination`]; tables built up to that point
    /// are kept. Invalid UTF-8 is decoded lossily; only device I/O failures
    /// while reading a header are returned as errors. The input stream is
    /// released when this returns.
    pub fn process(&mut self) -> Result<ProcessingStats> {
        let mut source = self.source.take().ok_or(PostError::StreamExhausted)?;
        let start_time = Instant::now();

        info!(
            "Processing {} (schema '{}', top {}, {})",
            self.input_name(),
            self.schema.name(),
            self.config.top_n,
            if self.config.annual { "annual" } else { "pooled" }
        );

        let mut blocks_processed = 0usize;
        let termination = loop {
            source.skip_blank_lines();
            if source.at_end() {
                break Termination::EndOfFile;
            }

            let meta = match header::read_section(&mut source) {
                Ok(meta) => meta,
                Err(e) if e.is_end_of_data() => break header_termination(e),
                Err(e) => return Err(e),
            };
            let title = match header::read_title(&mut source) {
                Ok(title) => title,
                Err(e) if e.is_end_of_data() => break header_termination(e),
                Err(e) => return Err(e),
            };
            let receptor_count = match self.resolve_receptor_count(&meta) {
                Ok(count) => count,
                Err(e) if e.is_end_of_data() => break header_termination(e),
                Err(e) => return Err(e),
            };

            let key = meta.key();
            self.register(&key, receptor_count);
            self.documentation.push(meta.documentation);

            if let Some(progress) = &self.progress {
                progress.set_message(key.to_string());
            }

            let (blocks, status) = self.read_blocks(&mut source, &key, receptor_count);
            blocks_processed += blocks;
            debug!("Section {}: {} blocks, {:?}", key, blocks, status);

            self.sections.push(SectionSummary {
                key,
                title,
                blocks,
                status: status.clone(),
            });

            match status {
                SectionStatus::Complete => continue,
                SectionStatus::Truncated => break Termination::TruncatedBlock,
                SectionStatus::Malformed(reason) => break Termination::MalformedRecord(reason),
            }
        };

        let lines_read = source.line_number();
        drop(source);

        if termination.is_clean() {
            info!(
                "Finished {}: {} sections, {} blocks, {} lines",
                self.input_name(),
                self.sections.len(),
                blocks_processed,
                lines_read
            );
        } else {
            warn!(
                "Stopped reading {} after {} lines: {}",
                self.input_name(),
                lines_read,
                termination
            );
        }

        let receptors = self.receptor_count.unwrap_or(0);
        Ok(ProcessingStats {
            input_path: self.input_path.clone(),
            sections: self.sections.len(),
            blocks_processed,
            rows_processed: blocks_processed * receptors,
            receptors,
            termination,
            processing_time_ms: start_time.elapsed().as_millis(),
        })
    }

    fn input_name(&self) -> String {
        self.input_path
            .as_ref()
            .map(|p| p.display().to_string())
            .unwrap_or_else(|| "<stream>".to_string())
    }

    /// Receptor count is fixed by the first section; later sections reuse it
    fn resolve_receptor_count(&mut self, meta: &SectionMeta) -> Result<usize> {
        if let Some(established) = self.receptor_count {
            if let Some(announced) = meta.receptor_count {
                if announced != established {
                    warn!(
                        "Section {} announces {} receptors, keeping {} from the first section",
                        meta.key(),
                        announced,
                        established
                    );
                }
            }
            return Ok(established);
        }

        match meta.receptor_count {
            Some(count) if count > 0 && slice_cells(count, self.config.top_n).is_none() => {
                Err(PostError::header_format(format!(
                    "{} receptors with top {} exceeds the table size limit",
                    count, self.config.top_n
                )))
            }
            Some(count) if count > 0 => {
                debug!("File has {} receptors", count);
                self.receptor_count = Some(count);
                self.receptors = Points::new(count);
                Ok(count)
            }
            _ => Err(PostError::header_format(format!(
                "no receptor count in: {}",
                meta.documentation.get(4).map(|l| l.trim()).unwrap_or("")
            ))),
        }
    }

    fn register(&mut self, key: &ResultKey, receptor_count: usize) {
        if self.tables.contains_key(key) {
            debug!("Result {} seen again, continuing its table", key);
            return;
        }
        debug!("New result {}", key);
        self.result_keys.push(key.clone());
        self.tables.insert(
            key.clone(),
            RankedTable::new(receptor_count, self.config.top_n, self.config.annual),
        );
    }

    /// Read blocks until the section ends: once for single-pass schemas,
    /// repeatedly for schemas with an hour field
    fn read_blocks(
        &mut self,
        source: &mut LineSource<R>,
        key: &ResultKey,
        receptor_count: usize,
    ) -> (usize, SectionStatus) {
        let hourly = self.schema.has_time_axis();
        let mut blocks = 0usize;

        loop {
            match self.read_block(source, receptor_count) {
                BlockRead::Complete(rows) => {
                    if let Err(e) = self.commit(key, &rows) {
                        return (blocks, SectionStatus::Malformed(e.to_string()));
                    }
                    blocks += 1;
                    if !hourly {
                        return (blocks, SectionStatus::Complete);
                    }
                }
                BlockRead::Boundary => return (blocks, SectionStatus::Complete),
                BlockRead::Truncated { rows_read } => {
                    debug!(
                        "Block {} of {} ends after {} of {} rows",
                        blocks + 1,
                        key,
                        rows_read,
                        receptor_count
                    );
                    return (blocks, SectionStatus::Truncated);
                }
                BlockRead::Malformed(reason) => return (blocks, SectionStatus::Malformed(reason)),
            }
        }
    }

    fn read_block(&self, source: &mut LineSource<R>, receptor_count: usize) -> BlockRead {
        let mut rows = Vec::new();

        while rows.len() < receptor_count {
            match source.next_row(&self.schema, self.config.century) {
                ReadOutcome::Row(record) => rows.push(record),
                ReadOutcome::SectionEnd | ReadOutcome::StreamEnd if rows.is_empty() => {
                    return BlockRead::Boundary;
                }
                ReadOutcome::SectionEnd | ReadOutcome::StreamEnd => {
                    return BlockRead::Truncated {
                        rows_read: rows.len(),
                    };
                }
                ReadOutcome::Malformed(reason) => return BlockRead::Malformed(reason),
            }
        }

        BlockRead::Complete(rows)
    }

    /// Fold a complete block into the key's table, the timestamp log and,
    /// for the first block of the file, the receptor set
    fn commit(&mut self, key: &ResultKey, rows: &[DecodedRecord]) -> Result<()> {
        let stamp = rows.first().and_then(|row| row.timestamp);
        let concentrations: Vec<f64> = rows.iter().map(|row| row.conc).collect();

        let table = self
            .tables
            .get_mut(key)
            .ok_or_else(|| PostError::configuration(format!("no table for {}", key)))?;
        if table.commit_block(stamp.map(|s| s.year()), &concentrations)? {
            debug!("Year slice added to {} at {:?}", key, stamp);
        }

        if let Some(stamp) = stamp {
            self.timestamps.push(stamp);
        }

        if !self.receptors_populated {
            for (index, row) in rows.iter().enumerate() {
                self.receptors.set(index, row.x, row.y, row.zflag)?;
            }
            self.receptors_populated = true;
        }

        if let Some(progress) = &self.progress {
            progress.inc(1);
        }

        Ok(())
    }
}

/// Map a metadata/title read failure onto the loop's stop reason
fn header_termination(error: PostError) -> Termination {
    match error {
        PostError::TruncatedHeader { .. } | PostError::StreamExhausted => {
            Termination::TruncatedHeader(error.to_string())
        }
        PostError::HeaderFormat { .. } => Termination::HeaderFormat(error.to_string()),
        other => Termination::MalformedRecord(other.to_string()),
    }
}
