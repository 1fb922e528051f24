//! Configuration management and validation.
//!
//! Provides configuration structures for reading W2 data files and for
//! exporting assembled tables, with builder-style overrides and validation.

use crate::constants::{
    DEFAULT_FIELD_WIDTH, DEFAULT_NATIVE_PRECISION, DEFAULT_TIME_WIDTH, MET_COLUMNS,
};
use crate::error::{Result, W2Error};
use crate::models::FileDialect;
use polars::prelude::ParquetCompression;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Supported compression algorithms for parquet files
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CompressionAlgorithm {
    /// Snappy compression - good balance of speed and compression
    Snappy,
    /// ZSTD compression - better compression ratio, slower
    Zstd,
    /// LZ4 compression - fastest, lower compression ratio
    Lz4,
    /// No compression
    Uncompressed,
}

impl CompressionAlgorithm {
    /// Convert to polars ParquetCompression type
    pub fn to_polars_compression(&self) -> ParquetCompression {
        match self {
            CompressionAlgorithm::Snappy => ParquetCompression::Snappy,
            CompressionAlgorithm::Zstd => ParquetCompression::Zstd(None),
            CompressionAlgorithm::Lz4 => ParquetCompression::Lz4Raw,
            CompressionAlgorithm::Uncompressed => ParquetCompression::Uncompressed,
        }
    }

    /// Parse a command-line compression name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "snappy" => Some(CompressionAlgorithm::Snappy),
            "zstd" => Some(CompressionAlgorithm::Zstd),
            "lz4" => Some(CompressionAlgorithm::Lz4),
            "none" | "uncompressed" => Some(CompressionAlgorithm::Uncompressed),
            _ => None,
        }
    }
}

/// Settings for reading one data file
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReadConfig {
    /// Year whose Jan 1 is day 1; looked up in the control file when unset
    pub reference_year: Option<i32>,

    /// Override the filename header-row convention
    pub header_row: Option<usize>,

    /// Force a dialect instead of detecting it from extension and content
    pub dialect: Option<FileDialect>,

    /// Width of the leading time column in fixed-width files
    pub time_width: usize,

    /// Column width for fixed-width files read without a descriptor
    pub default_field_width: usize,

    /// Restrict descriptor fields to one section
    pub section: Option<String>,

    /// Value column names used instead of the header row when no
    /// descriptor is given
    pub column_names: Option<Vec<String>>,

    /// Table name; defaults to the data file stem
    pub series_name: Option<String>,

    /// Round converted timestamps to a whole number of seconds
    pub round_to_seconds: Option<u32>,

    /// Search for w2_con.csv / w2_con.npt when no reference year is given
    pub search_control_file: bool,
}

impl Default for ReadConfig {
    fn default() -> Self {
        Self {
            reference_year: None,
            header_row: None,
            dialect: None,
            time_width: DEFAULT_TIME_WIDTH,
            default_field_width: DEFAULT_FIELD_WIDTH,
            section: None,
            column_names: None,
            series_name: None,
            round_to_seconds: None,
            search_control_file: true,
        }
    }
}

impl ReadConfig {
    pub fn with_reference_year(mut self, year: i32) -> Self {
        self.reference_year = Some(year);
        self
    }

    pub fn with_header_row(mut self, row: usize) -> Self {
        self.header_row = Some(row);
        self
    }

    pub fn with_dialect(mut self, dialect: FileDialect) -> Self {
        self.dialect = Some(dialect);
        self
    }

    pub fn with_time_width(mut self, width: usize) -> Self {
        self.time_width = width;
        self
    }

    pub fn with_default_field_width(mut self, width: usize) -> Self {
        self.default_field_width = width;
        self
    }

    pub fn with_section(mut self, section: impl Into<String>) -> Self {
        self.section = Some(section.into());
        self
    }

    pub fn with_series_name(mut self, name: impl Into<String>) -> Self {
        self.series_name = Some(name.into());
        self
    }

    /// Name the value columns instead of taking names from the header row
    pub fn with_column_names<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.column_names = Some(names.into_iter().map(Into::into).collect());
        self
    }

    /// Settings for a meteorology input file: the six standard met columns
    pub fn meteorology() -> Self {
        Self::default().with_column_names(MET_COLUMNS)
    }

    /// Round timestamps, e.g. 3600 to snap to the hour
    pub fn with_rounding(mut self, seconds: u32) -> Self {
        self.round_to_seconds = Some(seconds);
        self
    }

    /// Never consult the W2 control file for the reference year
    pub fn without_control_file(mut self) -> Self {
        self.search_control_file = false;
        self
    }

    pub fn validate(&self) -> Result<()> {
        if self.time_width == 0 {
            return Err(W2Error::Configuration {
                message: "time column width must be greater than zero".to_string(),
            });
        }
        if self.default_field_width == 0 {
            return Err(W2Error::Configuration {
                message: "default field width must be greater than zero".to_string(),
            });
        }
        if self.round_to_seconds == Some(0) {
            return Err(W2Error::Configuration {
                message: "rounding interval must be at least one second".to_string(),
            });
        }
        if let Some(names) = &self.column_names {
            if names.is_empty() || names.iter().any(|n| n.trim().is_empty()) {
                return Err(W2Error::Configuration {
                    message: "column names must be non-empty".to_string(),
                });
            }
        }
        if let Some(name) = &self.series_name {
            if name.trim().is_empty() {
                return Err(W2Error::Configuration {
                    message: "series name must not be blank".to_string(),
                });
            }
        }
        debug!("Read configuration validated: {:?}", self);
        Ok(())
    }
}

/// Settings shared by all exporters
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportOptions {
    /// Replace an existing destination (or series within it)
    pub overwrite: bool,

    /// Name to store the series under; defaults to the table name
    pub series_name: Option<String>,

    /// Parquet compression
    pub compression: CompressionAlgorithm,

    /// Decimal places for native W2 CSV values
    pub native_precision: usize,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            overwrite: false,
            series_name: None,
            compression: CompressionAlgorithm::Snappy,
            native_precision: DEFAULT_NATIVE_PRECISION,
        }
    }
}

impl ExportOptions {
    pub fn with_overwrite(mut self) -> Self {
        self.overwrite = true;
        self
    }

    pub fn with_series_name(mut self, name: impl Into<String>) -> Self {
        self.series_name = Some(name.into());
        self
    }

    pub fn with_compression(mut self, compression: CompressionAlgorithm) -> Self {
        self.compression = compression;
        self
    }

    pub fn with_native_precision(mut self, precision: usize) -> Self {
        self.native_precision = precision;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_read_config_defaults() {
        let config = ReadConfig::default();
        assert_eq!(config.time_width, 8);
        assert_eq!(config.default_field_width, 8);
        assert!(config.search_control_file);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_read_config_validation() {
        assert!(ReadConfig::default().with_time_width(0).validate().is_err());
        assert!(ReadConfig::default().with_rounding(0).validate().is_err());
        assert!(ReadConfig::default().with_series_name("  ").validate().is_err());
        assert!(ReadConfig::default().with_rounding(3600).validate().is_ok());
        assert!(ReadConfig::default().with_column_names(Vec::<String>::new()).validate().is_err());
        assert!(ReadConfig::default().with_column_names(["T", " "]).validate().is_err());
        assert!(ReadConfig::meteorology().validate().is_ok());
    }

    #[test]
    fn test_compression_names() {
        assert_eq!(
            CompressionAlgorithm::from_name("ZSTD"),
            Some(CompressionAlgorithm::Zstd)
        );
        assert_eq!(
            CompressionAlgorithm::from_name("none"),
            Some(CompressionAlgorithm::Uncompressed)
        );
        assert_eq!(CompressionAlgorithm::from_name("brotli"), None);
    }
}
