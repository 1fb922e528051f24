//! Fixed-width line splitting
//!
//! Columns are sliced by character position, never by whitespace, so
//! adjacent fields that fill their whole width are still separated.

use super::{ParsedFile, field_names, parse_time, parse_value};
use crate::config::ReadConfig;
use crate::models::{FieldSpec, FileDialect, ParseStats, RawRow, RawValue};
use crate::error::Result;
use std::path::Path;
use tracing::debug;

/// Character span of one column
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpan {
    pub start: usize,
    pub end: usize,
}

/// Consecutive spans following the time column
pub fn column_spans(time_width: usize, widths: impl IntoIterator<Item = usize>) -> Vec<ColumnSpan> {
    let mut start = time_width;
    widths
        .into_iter()
        .map(|width| {
            let span = ColumnSpan {
                start,
                end: start + width,
            };
            start += width;
            span
        })
        .collect()
}

/// Slice `chars[start..end]`, clipped to the line; `None` when the span
/// begins past the end of the line
pub fn slice(chars: &[char], span: ColumnSpan) -> Option<String> {
    if span.start >= chars.len() {
        return None;
    }
    let end = span.end.min(chars.len());
    Some(chars[span.start..end].iter().collect())
}

/// Parse fixed-width data lines that follow the header row
pub fn parse_lines(
    path: &Path,
    lines: &[&str],
    header_row: usize,
    fields: Option<&[FieldSpec]>,
    config: &ReadConfig,
) -> Result<ParsedFile> {
    let header_tokens: Vec<&str> = lines[header_row].split_whitespace().collect();
    let time_column = header_tokens.first().map(|t| t.to_string());

    let (column_names, spans) = match fields {
        Some(fields) => (
            field_names(fields),
            column_spans(config.time_width, fields.iter().map(FieldSpec::width)),
        ),
        None => {
            let names: Vec<String> = match &config.column_names {
                Some(names) => names.clone(),
                None => header_tokens.iter().skip(1).map(|t| t.to_string()).collect(),
            };
            let spans = column_spans(
                config.time_width,
                std::iter::repeat_n(config.default_field_width, names.len()),
            );
            (names, spans)
        }
    };
    debug!("Fixed-width spans for {}: {:?}", path.display(), spans);

    let time_span = ColumnSpan {
        start: 0,
        end: config.time_width,
    };
    let mut stats = ParseStats::new();
    let mut rows = Vec::new();

    for (index, line) in lines.iter().enumerate().skip(header_row + 1) {
        let line_number = index + 1;
        if line.trim().is_empty() {
            stats.blank_lines += 1;
            continue;
        }

        let chars: Vec<char> = line.chars().collect();
        let time_text = slice(&chars, time_span).unwrap_or_default();
        let day = parse_time(&time_text, line_number)?;

        let mut short = false;
        let values = spans
            .iter()
            .enumerate()
            .map(|(column, &span)| match slice(&chars, span) {
                Some(text) => {
                    parse_value(&text, line_number, column, &column_names[column], &mut stats)
                }
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
        dialect: FileDialect::FixedWidth,
        header_row,
        time_column,
        column_names,
        fields: fields.map(<[FieldSpec]>::to_vec),
        rows,
        stats,
    })
}
