//! Comma-delimited reading
//!
//! W2 CSV files often end every line with a comma, which yields empty
//! trailing cells; those are dropped from the header and ignored in data
//! rows.

use super::{ParsedFile, field_names, parse_time, parse_value};
use crate::error::{Result, W2Error};
use crate::models::{FieldSpec, FileDialect, ParseStats, RawRow, RawValue};
use csv::{ReaderBuilder, StringRecord, Trim};
use std::path::Path;
use tracing::debug;

/// Byte offset of the start of line `line` in `content`
fn line_offset(content: &str, line: usize) -> usize {
    if line == 0 {
        return 0;
    }
    content
        .match_indices('\n')
        .nth(line - 1)
        .map(|(i, _)| i + 1)
        .unwrap_or(content.len())
}

/// Value column names from a header record, without the time column
pub fn header_names(headers: &StringRecord) -> Vec<String> {
    let mut cells: Vec<&str> = headers.iter().skip(1).collect();
    while cells.last().is_some_and(|c| c.is_empty()) {
        cells.pop();
    }
    cells
        .iter()
        .enumerate()
        .map(|(i, c)| {
            if c.is_empty() {
                format!("column_{}", i + 1)
            } else {
                c.to_string()
            }
        })
        .collect()
}

/// Parse comma-delimited content whose header sits on `header_row`.
///
/// Without descriptor `fields`, value columns are named by `names` when
/// given and by the header cells otherwise.
pub fn parse_text(
    path: &Path,
    content: &str,
    header_row: usize,
    fields: Option<&[FieldSpec]>,
    names: Option<&[String]>,
) -> Result<ParsedFile> {
    let body = &content[line_offset(content, header_row)..];
    let mut reader = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::All)
        .from_reader(body.as_bytes());

    let csv_error = |e: csv::Error| W2Error::InvalidFormat {
        path: path.to_path_buf(),
        reason: e.to_string(),
    };

    let headers = reader.headers().map_err(csv_error)?.clone();
    let time_column = headers.get(0).filter(|c| !c.is_empty()).map(str::to_string);
    let header_columns = header_names(&headers);

    let column_names = match fields {
        Some(fields) => {
            if fields.len() != header_columns.len() {
                debug!(
                    "{}: header has {} value columns, descriptor declares {}",
                    path.display(),
                    header_columns.len(),
                    fields.len()
                );
            }
            field_names(fields)
        }
        None => match names {
            Some(names) => names.to_vec(),
            None => header_columns,
        },
    };

    let mut stats = ParseStats::new();
    let mut rows = Vec::new();

    for record in reader.records() {
        let record = record.map_err(csv_error)?;
        // Record positions are 1-based within the body, which starts at the header.
        let line_number = header_row + record.position().map(|p| p.line() as usize).unwrap_or(1);

        if record.iter().all(str::is_empty) {
            stats.blank_lines += 1;
            continue;
        }

        let day = parse_time(record.get(0).unwrap_or_default(), line_number)?;

        let mut short = false;
        let values = column_names
            .iter()
            .enumerate()
            .map(|(column, name)| match record.get(column + 1) {
                Some(cell) => parse_value(cell, line_number, column, name, &mut stats),
                None => {
                    short = true;
                    RawValue::Missing
                }
            })
            .collect();

        if short {
            stats.short_rows += 1;
        }
        rows.push(RawRow {
            line_number,
            day,
            values,
        });
    }
    stats.rows_parsed = rows.len();

    Ok(ParsedFile {
        path: path.to_path_buf(),
        dialect: FileDialect::Delimited,
        header_row,
        time_column,
        column_names,
        fields: fields.map(<[FieldSpec]>::to_vec),
        rows,
        stats,
    })
}
