//! Tests for fixed-width parsing

use super::{sample_descriptor, write_file};
use crate::config::ReadConfig;
use crate::constants::MET_COLUMNS;
use crate::error::W2Error;
use crate::models::{FileDialect, RawValue};
use crate::parser::fixed_width::{ColumnSpan, column_spans, slice};
use crate::parser::parse_file;

fn data_line(day: &str, level: &str, flow: &str, temp: &str) -> String {
    format!("{day:>8}{level:>8}{flow:>10}{temp:>8}")
}

fn sample_file(rows: &[String]) -> String {
    let mut lines = vec![
        "$ Branch 1 outflow".to_string(),
        String::new(),
        "    JDAY   ELWS         Q       T".to_string(),
    ];
    lines.extend_from_slice(rows);
    lines.join("\n")
}

#[test]
fn test_column_spans_accumulate() {
    let spans = column_spans(8, [8, 10, 8]);
    assert_eq!(
        spans,
        vec![
            ColumnSpan { start: 8, end: 16 },
            ColumnSpan { start: 16, end: 26 },
            ColumnSpan { start: 26, end: 34 },
        ]
    );
    let chars: Vec<char> = "abc".chars().collect();
    assert_eq!(slice(&chars, ColumnSpan { start: 1, end: 10 }), Some("bc".to_string()));
    assert_eq!(slice(&chars, ColumnSpan { start: 3, end: 10 }), None);
}

#[test]
fn test_descriptor_driven_widths() {
    let descriptor = sample_descriptor();
    let fields = descriptor.select(None).unwrap();
    let content = sample_file(&[
        data_line("1.0", "101.25", "12.500", "4.10"),
        data_line("1.5", "101.30", "13.125", "4.35"),
    ]);
    let (_dir, path) = write_file("qwo_1.opt", &content);

    let parsed = parse_file(&path, Some(&fields), &ReadConfig::default()).unwrap();

    assert_eq!(parsed.dialect, FileDialect::FixedWidth);
    assert_eq!(parsed.header_row, 2);
    assert_eq!(parsed.time_column.as_deref(), Some("JDAY"));
    assert_eq!(parsed.column_names, ["Water level", "Flow rate", "Temperature [T1]"]);
    assert_eq!(parsed.rows.len(), 2);
    assert_eq!(parsed.rows[0].line_number, 4);
    assert_eq!(parsed.rows[1].day, 1.5);
    assert_eq!(
        parsed.rows[1].values,
        vec![
            RawValue::Number(101.30),
            RawValue::Number(13.125),
            RawValue::Number(4.35)
        ]
    );
    assert_eq!(parsed.stats.warning_count(), 0);
}

#[test]
fn test_fields_filling_whole_width_are_separated() {
    let descriptor = sample_descriptor();
    let fields = descriptor.select(None).unwrap();
    // Every field fills its width, so there is no whitespace between them.
    let content = sample_file(&["123.5000-.100000123456.789-12.3456".to_string()]);
    let (_dir, path) = write_file("wide.npt", &content);

    let parsed = parse_file(&path, Some(&fields), &ReadConfig::default()).unwrap();
    let row = &parsed.rows[0];
    assert_eq!(row.day, 123.5);
    assert_eq!(row.values[0], RawValue::Number(-0.1));
    assert_eq!(row.values[1], RawValue::Number(123456.789));
    assert_eq!(row.values[2], RawValue::Number(-12.3456));
}

#[test]
fn test_malformed_field_recovered_with_locator() {
    let descriptor = sample_descriptor();
    let fields = descriptor.select(None).unwrap();
    let content = sample_file(&[
        data_line("1.0", "101.25", "********", "4.10"),
        data_line("2.0", "101.30", "14.000", "4.35"),
    ]);
    let (_dir, path) = write_file("bad.npt", &content);

    let parsed = parse_file(&path, Some(&fields), &ReadConfig::default()).unwrap();

    assert_eq!(parsed.rows.len(), 2);
    assert_eq!(parsed.rows[0].values[1], RawValue::Missing);
    assert_eq!(parsed.rows[1].values[1], RawValue::Number(14.0));
    assert_eq!(parsed.stats.warning_count(), 1);
    let err = &parsed.stats.field_errors[0];
    assert_eq!(err.line, 4);
    assert_eq!(err.column, 1);
    assert_eq!(err.column_name, "Flow rate");
    assert_eq!(err.raw, "********");
}

#[test]
fn test_short_line_yields_missing() {
    let descriptor = sample_descriptor();
    let fields = descriptor.select(None).unwrap();
    let content = sample_file(&[format!("{:>8}{:>8}", "3.0", "100.0")]);
    let (_dir, path) = write_file("short.npt", &content);

    let parsed = parse_file(&path, Some(&fields), &ReadConfig::default()).unwrap();
    assert_eq!(
        parsed.rows[0].values,
        vec![RawValue::Number(100.0), RawValue::Missing, RawValue::Missing]
    );
    assert_eq!(parsed.stats.short_rows, 1);
    assert_eq!(parsed.stats.warning_count(), 0);
}

#[test]
fn test_blank_fields_and_lines() {
    let descriptor = sample_descriptor();
    let fields = descriptor.select(None).unwrap();
    let content = sample_file(&[
        data_line("1.0", "", "12.000", "4.10"),
        String::new(),
        data_line("2.0", "100.00", "12.500", "4.20"),
    ]);
    let (_dir, path) = write_file("gaps.npt", &content);

    let parsed = parse_file(&path, Some(&fields), &ReadConfig::default()).unwrap();
    assert_eq!(parsed.rows.len(), 2);
    assert_eq!(parsed.rows[0].values[0], RawValue::Missing);
    assert_eq!(parsed.rows[1].line_number, 6);
    assert_eq!(parsed.stats.blank_lines, 1);
    assert_eq!(parsed.stats.warning_count(), 0);
}

#[test]
fn test_unreadable_time_is_fatal() {
    let descriptor = sample_descriptor();
    let fields = descriptor.select(None).unwrap();
    let content = sample_file(&[
        data_line("1.0", "100.00", "12.000", "4.10"),
        data_line("day2", "100.00", "12.000", "4.10"),
    ]);
    let (_dir, path) = write_file("time.npt", &content);

    match parse_file(&path, Some(&fields), &ReadConfig::default()) {
        Err(W2Error::DateConversion { line, .. }) => assert_eq!(line, Some(5)),
        other => panic!("expected DateConversion, got {other:?}"),
    }
}

#[test]
fn test_header_driven_columns_without_descriptor() {
    let content = [
        "$ Meteorology",
        "",
        "    JDAY    TAIR    TDEW    WIND     PHI   CLOUD",
        "     1.0    12.5     8.1     2.3    0.50     4.0",
        "    1.25    13.0     8.4     2.8    0.55        ",
    ]
    .join("\n");
    let (_dir, path) = write_file("met.npt", &content);

    let parsed = parse_file(&path, None, &ReadConfig::default()).unwrap();
    assert_eq!(parsed.column_names, ["TAIR", "TDEW", "WIND", "PHI", "CLOUD"]);
    assert!(parsed.fields.is_none());
    assert_eq!(parsed.rows[1].values[0], RawValue::Number(13.0));
    assert_eq!(parsed.rows[1].values[4], RawValue::Missing);
}

#[test]
fn test_header_row_override() {
    let content = ["    JDAY      Q1", "     1.0    42.0"].join("\n");
    let (_dir, path) = write_file("flow.npt", &content);

    let config = ReadConfig::default().with_header_row(0);
    let parsed = parse_file(&path, None, &config).unwrap();
    assert_eq!(parsed.rows.len(), 1);
    assert_eq!(parsed.rows[0].values[0], RawValue::Number(42.0));
}

#[test]
fn test_missing_header_line_is_invalid_format() {
    let (_dir, path) = write_file("tiny.npt", "$ only a title\n");
    assert!(matches!(
        parse_file(&path, None, &ReadConfig::default()),
        Err(W2Error::InvalidFormat { .. })
    ));
}

#[test]
fn test_meteorology_names_replace_header_tokens() {
    let row: String = ["1.0", "4.5", "-1.2", "3.1", "1.57", "0.4", "120.0"]
        .iter()
        .map(|cell| format!("{cell:>8}"))
        .collect();
    let content = [
        "$ Meteorology",
        "",
        "    JDAY    TAIR    TDEW    WIND     PHI   CLOUD   SOLAR",
        row.as_str(),
    ]
    .join("\n");
    let (_dir, path) = write_file("met_br1.npt", &content);

    let parsed = parse_file(&path, None, &ReadConfig::meteorology()).unwrap();

    assert_eq!(parsed.column_names, MET_COLUMNS);
    assert_eq!(parsed.time_column.as_deref(), Some("JDAY"));
    assert_eq!(parsed.rows[0].values[1], RawValue::Number(-1.2));
    assert_eq!(parsed.rows[0].values[5], RawValue::Number(120.0));
}
