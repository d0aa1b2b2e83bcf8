//! Application constants for the AERMOD post processor
//!
//! This module contains the file format constants, default values and
//! naming conventions used throughout the crate.

// =============================================================================
// File Format
// =============================================================================

/// Number of documentation lines in the metadata block preceding each section
pub const METADATA_LINES: usize = 6;

/// Lines following the metadata block before data rows begin (title + separator)
pub const TITLE_LINES: usize = 2;

/// Leading character of every documentation, title and separator line
pub const DOC_LINE_MARKER: char = '*';

/// Header markers locating the result description on the 4th metadata line
pub mod markers {
    /// Token immediately following the result type
    pub const VALUES: &str = "VALUES";

    /// Token immediately preceding the result form
    pub const OF: &str = "OF";

    /// Prefix of the data format descriptor on the 6th metadata line
    pub const FORMAT: &str = "FORMAT:";
}

/// Field names every schema must declare
pub mod fields {
    pub const X: &str = "x";
    pub const Y: &str = "y";
    pub const CONC: &str = "conc";
    pub const Z: &str = "z";
    pub const ZHILL: &str = "zhill";
    pub const ZFLAG: &str = "zflag";
    pub const AVE: &str = "ave";
    pub const GROUP: &str = "group";
    pub const NETID: &str = "netid";
    pub const YEAR: &str = "year";
    pub const MONTH: &str = "month";
    pub const DAY: &str = "day";
    pub const HOUR: &str = "hour";
    pub const N_YRS: &str = "n_yrs";

    /// Fields decoded for every data row
    pub const REQUIRED: &[&str] = &[X, Y, ZFLAG, CONC];

    /// Fields whose joint presence gives a schema an hourly time axis
    pub const DATE_PARTS: &[&str] = &[YEAR, MONTH, DAY, HOUR];
}

/// Built-in schema names
pub const SCHEMA_POST: &str = "post";
pub const SCHEMA_GRF: &str = "grf";

// =============================================================================
// Processing Defaults
// =============================================================================

/// Century used to expand two-digit years (20 => 20xx)
pub const DEFAULT_CENTURY: i32 = 20;

/// Number of ranked values kept per receptor
pub const DEFAULT_TOP_N: usize = 1;

/// Default schema for new processors
pub const DEFAULT_SCHEMA: &str = SCHEMA_POST;

/// Upper bound on `receptors * top_n` for one year slice of a ranked table.
/// A header announcing more is rejected before anything is allocated.
pub const MAX_TABLE_CELLS: usize = 100_000_000;

// =============================================================================
// Export
// =============================================================================

/// Column names for receptor coordinates in exported tables
pub const X_COLUMN: &str = "x";
pub const Y_COLUMN: &str = "y";
pub const Z_COLUMN: &str = "z";

/// Suffix of the cross-year average column in annual exports
pub const MEAN_SUFFIX: &str = "mean";

/// Column name of the exported timestamp log
pub const DATETIME_COLUMN: &str = "datetime";

/// Timestamp rendering used in exports
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M";

/// File name of the exported timestamp log
pub const TIMESTAMPS_FILE: &str = "timestamps.csv";
