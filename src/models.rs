//! Core data structures shared across parsing, assembly and export.
//!
//! Defines Fortran-style format codes, descriptor field specifications,
//! raw parsed rows, file dialects and per-file parse statistics.

use crate::error::FieldParseError;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

static FORMAT_CODE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^\(?\s*(ES|EN|F|E|D|G|I)\s*(\d+)(?:\.(\d+))?\s*\)?$")
        .unwrap_or_else(|e| panic!("format code pattern is invalid: {e}"))
});

/// Edit descriptor family of a format code
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FormatKind {
    /// `F` fixed-point real
    Fixed,
    /// `E`, `ES`, `EN` and `D` exponential reals
    Exponential,
    /// `G` general real
    General,
    /// `I` integer
    Integer,
}

/// Parsed Fortran edit descriptor such as `(f10.3)`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FormatCode {
    pub kind: FormatKind,
    pub width: usize,
    pub precision: Option<usize>,
}

impl FormatCode {
    pub fn new(kind: FormatKind, width: usize, precision: Option<usize>) -> Self {
        Self {
            kind,
            width,
            precision,
        }
    }

    /// Parse a format code, with or without parentheses, in any case
    pub fn parse(text: &str) -> Option<Self> {
        let caps = FORMAT_CODE.captures(text.trim())?;
        let kind = match caps[1].to_ascii_uppercase().as_str() {
            "F" => FormatKind::Fixed,
            "E" | "ES" | "EN" | "D" => FormatKind::Exponential,
            "G" => FormatKind::General,
            _ => FormatKind::Integer,
        };
        let width: usize = caps[2].parse().ok()?;
        if width == 0 {
            return None;
        }
        let precision = match caps.get(3) {
            Some(p) => Some(p.as_str().parse().ok()?),
            None => None,
        };
        Some(Self::new(kind, width, precision))
    }
}

impl FromStr for FormatCode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        FormatCode::parse(s).ok_or_else(|| format!("invalid format code '{}'", s.trim()))
    }
}

impl fmt::Display for FormatCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let letter = match self.kind {
            FormatKind::Fixed => "f",
            FormatKind::Exponential => "e",
            FormatKind::General => "g",
            FormatKind::Integer => "i",
        };
        match self.precision {
            Some(p) => write!(f, "({}{}.{})", letter, self.width, p),
            None => write!(f, "({}{})", letter, self.width),
        }
    }
}

/// One column declared in a format descriptor
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldSpec {
    /// Display name, may carry a bracketed mnemonic such as `[T1]`
    pub name: String,
    /// Unit annotation following the last comma of the name zone
    pub unit: Option<String>,
    pub format_code: FormatCode,
    /// Scale factor applied to every parsed value
    pub multiplier: f64,
    /// Advisory lower bound for plotting; never used to reject data
    pub min: f64,
    /// Advisory upper bound for plotting; never used to reject data
    pub max: f64,
    pub plot_flag: bool,
    /// Declared position; not required to be unique
    pub sequence_index: i64,
    /// Name of the descriptor section owning this field
    pub section: String,
    /// 1-based line in the descriptor file
    pub line_number: usize,
}

impl FieldSpec {
    /// Width in characters of this field in fixed-width data
    pub fn width(&self) -> usize {
        self.format_code.width
    }
}

/// Layout dialect of a data file
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FileDialect {
    /// Character-position columns (`.npt`, `.opt`)
    FixedWidth,
    /// Comma-separated columns (`.csv`, or comma-bearing `.npt`/`.opt`)
    Delimited,
}

impl fmt::Display for FileDialect {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            FileDialect::FixedWidth => write!(f, "fixed-width"),
            FileDialect::Delimited => write!(f, "delimited"),
        }
    }
}

/// A single parsed field value
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum RawValue {
    Number(f64),
    Missing,
}

impl RawValue {
    pub fn as_option(self) -> Option<f64> {
        match self {
            RawValue::Number(v) => Some(v),
            RawValue::Missing => None,
        }
    }
}

/// One data line after field splitting and numeric parsing
#[derive(Debug, Clone, PartialEq)]
pub struct RawRow {
    /// 1-based line number in the source file
    pub line_number: usize,
    /// Fractional day-of-year from the time column
    pub day: f64,
    /// Field values in descriptor or header order
    pub values: Vec<RawValue>,
}

/// Per-file parsing statistics
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ParseStats {
    /// Data rows read into the table
    pub rows_parsed: usize,

    /// Blank lines skipped inside the data block
    pub blank_lines: usize,

    /// Rows with fewer fields than expected
    pub short_rows: usize,

    /// Rows whose timestamp is earlier than the previous row's
    pub out_of_order_rows: usize,

    /// Recovered field-level errors
    pub field_errors: Vec<FieldParseError>,
}

impl ParseStats {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of malformed fields replaced with missing values
    pub fn warning_count(&self) -> usize {
        self.field_errors.len()
    }

    /// Percentage of fields that parsed cleanly, given the column count
    pub fn field_success_rate(&self, columns: usize) -> f64 {
        let total = self.rows_parsed * columns;
        if total == 0 {
            100.0
        } else {
            (1.0 - self.field_errors.len() as f64 / total as f64) * 100.0
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_code_variants() {
        let f = FormatCode::parse("(f10.3)").unwrap();
        assert_eq!(f, FormatCode::new(FormatKind::Fixed, 10, Some(3)));

        let e = FormatCode::parse("ES12.4").unwrap();
        assert_eq!(e.kind, FormatKind::Exponential);
        assert_eq!(e.width, 12);

        let d = FormatCode::parse("( d9.2 )").unwrap();
        assert_eq!(d.kind, FormatKind::Exponential);

        let i = FormatCode::parse("(I5)").unwrap();
        assert_eq!(i, FormatCode::new(FormatKind::Integer, 5, None));
    }

    #[test]
    fn test_format_code_rejects_garbage() {
        assert!(FormatCode::parse("(a8)").is_none());
        assert!(FormatCode::parse("(f0.3)").is_none());
        assert!(FormatCode::parse("10.3").is_none());
        assert!("".parse::<FormatCode>().is_err());
    }

    #[test]
    fn test_format_code_display() {
        let code = FormatCode::parse("(F8.2)").unwrap();
        assert_eq!(code.to_string(), "(f8.2)");
        assert_eq!(code.to_string().parse::<FormatCode>().unwrap(), code);
    }

    #[test]
    fn test_parse_stats_rates() {
        let mut stats = ParseStats::new();
        assert_eq!(stats.field_success_rate(3), 100.0);

        stats.rows_parsed = 10;
        stats.field_errors.push(FieldParseError {
            line: 4,
            column: 0,
            column_name: "Q".to_string(),
            raw: "***".to_string(),
        });
        assert_eq!(stats.warning_count(), 1);
        assert!((stats.field_success_rate(2) - 95.0).abs() < 1e-9);
    }
}
