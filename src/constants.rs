//! Application constants for the W2 processor
//!
//! File naming conventions, fixed-width layout defaults, descriptor
//! header vocabulary and export naming used throughout the crate.

// =============================================================================
// File Naming Conventions
// =============================================================================

/// Files whose name starts with this prefix (case-insensitive) are time-series
/// output files with the column header on the first line
pub const TSR_PREFIX: &str = "tsr";

/// Header row for files following the reserved `tsr` naming convention
pub const TSR_HEADER_ROW: usize = 0;

/// Header row for every other W2 input/output file (title line, blank line, header)
pub const DEFAULT_HEADER_ROW: usize = 2;

/// Extensions read as fixed-width unless the first data line contains a comma
pub const FIXED_WIDTH_EXTENSIONS: &[&str] = &["npt", "opt"];

/// Extensions always read as comma-delimited
pub const DELIMITED_EXTENSIONS: &[&str] = &["csv"];

// =============================================================================
// Fixed-Width Layout
// =============================================================================

/// Width of a standard W2 field, including the time column
pub const DEFAULT_FIELD_WIDTH: usize = 8;

/// Width of the leading JDAY column in fixed-width data files
pub const DEFAULT_TIME_WIDTH: usize = DEFAULT_FIELD_WIDTH;

/// Value columns of a W2 meteorology input file, in file order
pub const MET_COLUMNS: [&str; 6] = [
    "Air Temperature (C)",
    "Dew Point Temperature (C)",
    "Wind Speed (m/s)",
    "Wind Direction (radians)",
    "Cloudiness (fraction)",
    "Solar Radiation (W/m2)",
];

/// Name given to the time column when writing W2 native files
pub const TIME_COLUMN_NAME: &str = "JDAY";

// =============================================================================
// Descriptor Layout
// =============================================================================

/// Minimum run of leading dots that marks a descriptor section header
pub const SECTION_MARKER: &str = "...";

/// Token that terminates the section label in a header line
pub const SECTION_LABEL_SUFFIX: &str = "NAME";

/// Descriptor zones, in the order they conventionally appear after the name
pub mod zones {
    pub const FORMAT: &[&str] = &["FORMAT", "FMT"];
    pub const MULTIPLIER: &[&str] = &["MULT", "MULTIPLIER"];
    pub const MIN: &[&str] = &["MIN", "CHPMIN"];
    pub const MAX: &[&str] = &["MAX", "CHPMAX"];
    pub const PLOT: &[&str] = &["PLOT", "CPLTC", "ON/OFF"];
    pub const SEQUENCE: &[&str] = &["SEQ", "INDEX", "#"];
}

/// Plot flag spellings
pub const PLOT_ON: &str = "ON";
pub const PLOT_OFF: &str = "OFF";

// =============================================================================
// Control File Lookup
// =============================================================================

/// Control file names searched for the simulation start year, in order
pub const CONTROL_FILE_CSV: &str = "w2_con.csv";
pub const CONTROL_FILE_NPT: &str = "w2_con.npt";

/// Row label preceding the start-time row in the CSV control file
pub const CONTROL_CSV_TIME_LABEL: &str = "TMSTRT";

/// Cell index of the start year on the row after the label
pub const CONTROL_CSV_YEAR_CELL: usize = 2;

/// Card labels preceding the start-time line in the fixed-width control file
pub const CONTROL_NPT_TIME_LABELS: &[&str] = &["TMSTR", "TIME"];

/// Character offset of the start year on the line after the card label
pub const CONTROL_NPT_YEAR_OFFSET: usize = 24;

// =============================================================================
// Time Handling
// =============================================================================

pub const MILLIS_PER_DAY: f64 = 86_400_000.0;

/// Text form of timestamps in relational exports
pub const RELATIONAL_TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.3f";

/// Column holding the calendar index in every export
pub const DATE_COLUMN: &str = "Date";

// =============================================================================
// Export Naming
// =============================================================================

pub const COLUMN_METADATA_TABLE: &str = "column_metadata";
pub const SERIES_METADATA_TABLE: &str = "series_metadata";

/// NetCDF record dimension and coordinate variable
pub const NETCDF_TIME_DIMENSION: &str = "time";

pub const NETCDF_CONVENTIONS: &str = "CF-1.8";

/// Decimal places used for values in native W2 CSV output
pub const DEFAULT_NATIVE_PRECISION: usize = 3;

/// Title line written at the top of native W2 CSV output
pub const NATIVE_TITLE_LINE: &str = "$";
