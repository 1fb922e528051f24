//! Error handling for W2 time-series processing.
//!
//! Provides error types with context for descriptor parsing, field parsing,
//! calendar conversion and export failures. Field-level parse failures are
//! recovered and collected rather than returned; everything else is fatal
//! for the file being processed.

use std::path::PathBuf;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum W2Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Polars error: {0}")]
    Polars(#[from] polars::error::PolarsError),

    #[error("File not found: {path}")]
    FileNotFound { path: PathBuf },

    #[error("Descriptor parse error in {path} at line {line}: {reason}")]
    DescriptorParse {
        path: PathBuf,
        line: usize,
        reason: String,
    },

    #[error("Date conversion failed{}: {reason}", line_suffix(.line))]
    DateConversion { reason: String, line: Option<usize> },

    #[error("Export to {path} failed: {reason}")]
    Export { path: PathBuf, reason: String },

    #[error("Unknown file type for {path}: expected .npt, .opt or .csv")]
    UnknownFileType { path: PathBuf },

    #[error("Invalid data file {path}: {reason}")]
    InvalidFormat { path: PathBuf, reason: String },

    #[error("Configuration error: {message}")]
    Configuration { message: String },
}

impl W2Error {
    /// Date conversion failure not tied to a source line
    pub fn date(reason: impl Into<String>) -> Self {
        W2Error::DateConversion {
            reason: reason.into(),
            line: None,
        }
    }

    /// Export failure for a destination
    pub fn export(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        W2Error::Export {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T> = std::result::Result<T, W2Error>;

fn line_suffix(line: &Option<usize>) -> String {
    line.map(|l| format!(" at line {l}")).unwrap_or_default()
}

/// A single malformed field in a data row.
///
/// These are never fatal: the row is kept with a missing value in the
/// offending column and the error is appended to the parse statistics.
#[derive(Error, Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
#[error("line {line}, column {column} ({column_name}): cannot parse {raw:?} as a number")]
pub struct FieldParseError {
    /// 1-based line number in the data file
    pub line: usize,
    /// 0-based data column, not counting the time column
    pub column: usize,
    pub column_name: String,
    pub raw: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_date_conversion_message_includes_line() {
        let err = W2Error::DateConversion {
            reason: "negative day -1".to_string(),
            line: Some(7),
        };
        assert_eq!(
            err.to_string(),
            "Date conversion failed at line 7: negative day -1"
        );
        assert_eq!(
            W2Error::date("no reference year").to_string(),
            "Date conversion failed: no reference year"
        );
    }

    #[test]
    fn test_field_parse_error_locator() {
        let err = FieldParseError {
            line: 12,
            column: 3,
            column_name: "TDS".to_string(),
            raw: "1.2.3".to_string(),
        };
        let message = err.to_string();
        assert!(message.contains("line 12"));
        assert!(message.contains("column 3"));
        assert!(message.contains("TDS"));
        assert!(message.contains("\"1.2.3\""));
    }
}
