//! Ranked concentration tables.
//!
//! Each table keeps, per receptor, the `top_n` highest concentrations seen so
//! far in descending order. In annual mode the table also has a year axis and
//! values are ranked within each calendar year.

use crate::constants::MAX_TABLE_CELLS;
use crate::error::{PostError, Result};
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Cells in one year slice of a `[receptors, top_n]` table, if it stays
/// within [`MAX_TABLE_CELLS`]
pub fn slice_cells(receptors: usize, top_n: usize) -> Option<usize> {
    receptors
        .checked_mul(top_n)
        .filter(|&cells| cells <= MAX_TABLE_CELLS)
}

/// Per-receptor top-N concentrations, optionally partitioned by year
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RankedTable {
    receptors: usize,
    top_n: usize,
    annual: bool,
    /// One `receptors * top_n` slice per year (a single slice when not annual)
    slices: Vec<Vec<f64>>,
    /// Calendar year of each slice in ascending order, when known
    years: Vec<i32>,
    /// Slice the previous block went into
    current: usize,
    blocks: usize,
}

impl RankedTable {
    /// All-zero table of shape `[receptors, top_n]` (plus a year axis of length 1 if annual)
    pub fn new(receptors: usize, top_n: usize, annual: bool) -> Self {
        Self {
            receptors,
            top_n,
            annual,
            slices: vec![vec![0.0; receptors * top_n]],
            years: Vec::new(),
            current: 0,
            blocks: 0,
        }
    }

    pub fn receptors(&self) -> usize {
        self.receptors
    }

    pub fn top_n(&self) -> usize {
        self.top_n
    }

    pub fn is_annual(&self) -> bool {
        self.annual
    }

    /// Length of the year axis (1 when not annual)
    pub fn year_count(&self) -> usize {
        self.slices.len()
    }

    /// Calendar year of each year slice; empty when rows carry no date
    pub fn years(&self) -> &[i32] {
        &self.years
    }

    /// Number of blocks committed so far
    pub fn blocks(&self) -> usize {
        self.blocks
    }

    /// Ranked values of a receptor in the first (or only) year slice
    pub fn ranks(&self, receptor: usize) -> Option<&[f64]> {
        self.ranks_for_year(receptor, 0)
    }

    /// Ranked values of a receptor within year slice `year_index`
    pub fn ranks_for_year(&self, receptor: usize, year_index: usize) -> Option<&[f64]> {
        if receptor >= self.receptors {
            return None;
        }
        let start = receptor * self.top_n;
        self.slices
            .get(year_index)
            .map(|slice| &slice[start..start + self.top_n])
    }

    /// Value at `rank` (0 = highest) for every receptor in one year slice
    pub fn rank_column(&self, rank: usize, year_index: usize) -> Option<Vec<f64>> {
        if rank >= self.top_n {
            return None;
        }
        let slice = self.slices.get(year_index)?;
        Some(
            (0..self.receptors)
                .map(|r| slice[r * self.top_n + rank])
                .collect(),
        )
    }

    /// Value at `rank` averaged over all year slices, per receptor
    pub fn mean_rank_column(&self, rank: usize) -> Option<Vec<f64>> {
        if rank >= self.top_n {
            return None;
        }
        let years = self.slices.len() as f64;
        Some(
            (0..self.receptors)
                .map(|r| {
                    self.slices
                        .iter()
                        .map(|slice| slice[r * self.top_n + rank])
                        .sum::<f64>()
                        / years
                })
                .collect(),
        )
    }

    /// Fold one block of concentrations (one per receptor) into the table.
    ///
    /// In annual mode the block goes into the slice of its calendar year; a
    /// year not seen before gets a new all-zero slice at its place in the
    /// ascending year axis. Blocks without a date reuse the slice of the
    /// previous block. Returns true if the year axis grew.
    pub fn commit_block(&mut self, year: Option<i32>, concentrations: &[f64]) -> Result<bool> {
        if concentrations.len() != self.receptors {
            return Err(PostError::DimensionMismatch {
                reason: format!(
                    "block has {} values for {} receptors",
                    concentrations.len(),
                    self.receptors
                ),
            });
        }

        let (index, grew) = self.year_slice(year);
        self.current = index;

        let top_n = self.top_n;
        let slice = &mut self.slices[index];
        for (receptor, &conc) in concentrations.iter().enumerate() {
            let start = receptor * top_n;
            insert_ranked(&mut slice[start..start + top_n], conc);
        }

        self.blocks += 1;
        Ok(grew)
    }

    fn year_slice(&mut self, year: Option<i32>) -> (usize, bool) {
        let (true, Some(year)) = (self.annual, year) else {
            return (self.current, false);
        };

        if self.years.is_empty() {
            self.years.push(year);
            return (0, false);
        }

        match self.years.binary_search(&year) {
            Ok(index) => (index, false),
            Err(index) => {
                debug!("First block of year {}, adding year slice", year);
                self.slices
                    .insert(index, vec![0.0; self.receptors * self.top_n]);
                self.years.insert(index, year);
                (index, true)
            }
        }
    }
}

/// Insert `value` into a descending list, dropping the smallest entry.
///
/// Equal values keep first-seen order; NaN never ranks.
pub fn insert_ranked(ranks: &mut [f64], value: f64) {
    if let Some(pos) = ranks.iter().position(|&current| value > current) {
        ranks[pos..].rotate_right(1);
        ranks[pos] = value;
    }
}
