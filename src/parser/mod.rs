//! Data file parsing for W2 fixed-width and comma-delimited files
//!
//! Splits each data line into a time value and one raw value per column,
//! either from descriptor field widths, from the header row, or from CSV
//! cells. Malformed numeric fields are recovered as missing values and
//! recorded in [`ParseStats`]; a line whose time column cannot be read
//! aborts the file.

pub mod delimited;
pub mod fixed_width;
pub mod numeric;

#[cfg(test)]
pub mod tests;

use crate::config::ReadConfig;
use crate::error::{FieldParseError, Result, W2Error};
use crate::header::{detect_dialect, header_row_for};
use crate::models::{FieldSpec, FileDialect, ParseStats, RawRow, RawValue};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Rows and column layout read from one data file
#[derive(Debug, Clone)]
pub struct ParsedFile {
    pub path: PathBuf,
    pub dialect: FileDialect,
    /// Zero-based header row used for this file
    pub header_row: usize,
    /// Name of the time column as written in the header, if any
    pub time_column: Option<String>,
    /// One name per value column
    pub column_names: Vec<String>,
    /// Descriptor fields the columns were read with
    pub fields: Option<Vec<FieldSpec>>,
    pub rows: Vec<RawRow>,
    pub stats: ParseStats,
}

/// Parse a data file, detecting its header row and dialect
pub fn parse_file(
    path: &Path,
    fields: Option<&[FieldSpec]>,
    config: &ReadConfig,
) -> Result<ParsedFile> {
    if !path.exists() {
        return Err(W2Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }

    // W2 files are nominally ASCII but unit labels are often Latin-1.
    let bytes = fs::read(path)?;
    let content = String::from_utf8_lossy(&bytes);

    let header_row = config.header_row.unwrap_or_else(|| header_row_for(path));
    let lines: Vec<&str> = content.lines().collect();
    let dialect = match config.dialect {
        Some(dialect) => dialect,
        None => detect_dialect(path, &lines, header_row)?,
    };

    if lines.len() <= header_row {
        return Err(W2Error::InvalidFormat {
            path: path.to_path_buf(),
            reason: format!(
                "file has {} lines but the header is expected on line {}",
                lines.len(),
                header_row + 1
            ),
        });
    }

    if fields.is_some() && config.column_names.is_some() {
        debug!(
            "{}: descriptor names take precedence over configured column names",
            path.display()
        );
    }

    info!(
        "Parsing {} as {} with header on line {}",
        path.display(),
        dialect,
        header_row + 1
    );

    let parsed = match dialect {
        FileDialect::FixedWidth => {
            fixed_width::parse_lines(path, &lines, header_row, fields, config)?
        }
        FileDialect::Delimited => delimited::parse_text(
            path,
            &content,
            header_row,
            fields,
            config.column_names.as_deref(),
        )?,
    };

    debug!(
        "Parsed {} rows and {} columns from {} ({} field warnings)",
        parsed.rows.len(),
        parsed.column_names.len(),
        path.display(),
        parsed.stats.warning_count()
    );
    Ok(parsed)
}

/// Parse a time-column value or fail with the line number
pub(crate) fn parse_time(raw: &str, line_number: usize) -> Result<f64> {
    numeric::parse_number(raw).ok_or_else(|| W2Error::DateConversion {
        reason: format!("cannot read time value {:?}", raw.trim()),
        line: Some(line_number),
    })
}

/// Parse a value field, recording a recoverable error when it is malformed
pub(crate) fn parse_value(
    raw: &str,
    line_number: usize,
    column: usize,
    column_name: &str,
    stats: &mut ParseStats,
) -> RawValue {
    match numeric::parse_field(raw) {
        Ok(value) => value,
        Err(raw) => {
            stats.field_errors.push(FieldParseError {
                line: line_number,
                column,
                column_name: column_name.to_string(),
                raw,
            });
            RawValue::Missing
        }
    }
}

/// Column names for descriptor fields
pub(crate) fn field_names(fields: &[FieldSpec]) -> Vec<String> {
    fields.iter().map(|f| f.name.clone()).collect()
}
