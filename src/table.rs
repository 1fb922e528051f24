//! Typed time-series tables and their assembly from parsed rows.
//!
//! The assembler scales values by their descriptor multiplier, converts the
//! time column to calendar timestamps and attaches descriptor metadata to
//! every column. Tables are immutable once assembled; exporters only borrow
//! them.

use crate::constants::DATE_COLUMN;
use crate::datetime::DayOfYearConverter;
use crate::error::{Result, W2Error};
use crate::models::{FieldSpec, FormatCode, ParseStats};
use crate::parser::ParsedFile;
use chrono::NaiveDateTime;
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use tracing::warn;

/// Descriptor metadata carried by a table column
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ColumnMetadata {
    pub unit: Option<String>,
    /// Scale factor already applied to the column values
    pub multiplier: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
    pub plot_flag: Option<bool>,
    pub section: Option<String>,
    pub sequence_index: Option<i64>,
    pub format_code: Option<FormatCode>,
}

impl ColumnMetadata {
    pub fn from_field(field: &FieldSpec) -> Self {
        Self {
            unit: field.unit.clone(),
            multiplier: Some(field.multiplier),
            min: Some(field.min),
            max: Some(field.max),
            plot_flag: Some(field.plot_flag),
            section: Some(field.section.clone()),
            sequence_index: Some(field.sequence_index),
            format_code: Some(field.format_code),
        }
    }

    /// Advisory plotting range, when it is a proper interval
    pub fn range(&self) -> Option<(f64, f64)> {
        match (self.min, self.max) {
            (Some(min), Some(max)) if min <= max => Some((min, max)),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// One named value column; `None` marks a missing value
#[derive(Debug, Clone, PartialEq)]
pub struct TableColumn {
    name: String,
    values: Vec<Option<f64>>,
    metadata: ColumnMetadata,
}

impl TableColumn {
    pub fn new(
        name: impl Into<String>,
        values: Vec<Option<f64>>,
        metadata: ColumnMetadata,
    ) -> Self {
        Self {
            name: name.into(),
            values,
            metadata,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn values(&self) -> &[Option<f64>] {
        &self.values
    }

    pub fn metadata(&self) -> &ColumnMetadata {
        &self.metadata
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn missing_count(&self) -> usize {
        self.values.iter().filter(|v| v.is_none()).count()
    }

    /// Row positions whose value falls outside the advisory range.
    ///
    /// Values are only flagged; nothing is removed from the column.
    pub fn out_of_range(&self) -> Vec<usize> {
        let Some((min, max)) = self.metadata.range() else {
            return Vec::new();
        };
        self.values
            .iter()
            .enumerate()
            .filter_map(|(i, v)| v.filter(|v| *v < min || *v > max).map(|_| i))
            .collect()
    }
}

/// Immutable calendar-indexed table read from one W2 file
#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeriesTable {
    name: String,
    source: Option<PathBuf>,
    reference_year: i32,
    index: Vec<NaiveDateTime>,
    columns: Vec<TableColumn>,
}

impl TimeSeriesTable {
    /// Build a table; every column must match the index length
    pub fn new(
        name: impl Into<String>,
        reference_year: i32,
        index: Vec<NaiveDateTime>,
        columns: Vec<TableColumn>,
    ) -> Result<Self> {
        let name = name.into();
        if let Some(column) = columns.iter().find(|c| c.len() != index.len()) {
            return Err(W2Error::Configuration {
                message: format!(
                    "column '{}' of table '{}' has {} values but the index has {} timestamps",
                    column.name,
                    name,
                    column.len(),
                    index.len()
                ),
            });
        }
        Ok(Self {
            name,
            source: None,
            reference_year,
            index,
            columns,
        })
    }

    pub fn with_source(mut self, source: impl Into<PathBuf>) -> Self {
        self.source = Some(source.into());
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn source(&self) -> Option<&Path> {
        self.source.as_deref()
    }

    pub fn reference_year(&self) -> i32 {
        self.reference_year
    }

    pub fn index(&self) -> &[NaiveDateTime] {
        &self.index
    }

    pub fn columns(&self) -> &[TableColumn] {
        &self.columns
    }

    pub fn column(&self, name: &str) -> Option<&TableColumn> {
        self.columns.iter().find(|c| c.name == name)
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    pub fn row_count(&self) -> usize {
        self.index.len()
    }

    pub fn is_empty(&self) -> bool {
        self.index.is_empty()
    }

    /// Materialise as a polars DataFrame with a millisecond `Date` column
    pub fn to_dataframe(&self) -> Result<DataFrame> {
        let millis: Vec<i64> = self
            .index
            .iter()
            .map(|t| crate::datetime::to_epoch_millis(*t))
            .collect();
        let date = Int64Chunked::from_vec(DATE_COLUMN.into(), millis)
            .into_datetime(TimeUnit::Milliseconds, None)
            .into_series();

        let mut columns = Vec::with_capacity(self.columns.len() + 1);
        columns.push(Column::from(date));
        for (column, name) in self.columns.iter().zip(self.frame_names()) {
            let series = Float64Chunked::from_iter_options(
                name.as_str().into(),
                column.values.iter().copied(),
            )
            .into_series();
            columns.push(Column::from(series));
        }
        Ok(DataFrame::new(columns)?)
    }

    /// Column names with repeats and the `Date` name suffixed `_2`, `_3`, ...
    fn frame_names(&self) -> Vec<String> {
        let mut taken: HashSet<String> = HashSet::from([DATE_COLUMN.to_string()]);
        self.columns
            .iter()
            .map(|column| {
                let mut candidate = column.name.clone();
                let mut n = 2;
                while taken.contains(&candidate) {
                    candidate = format!("{}_{n}", column.name);
                    n += 1;
                }
                taken.insert(candidate.clone());
                candidate
            })
            .collect()
    }
}

/// Table plus the statistics gathered while reading it
#[derive(Debug, Clone)]
pub struct ParseResult {
    pub table: TimeSeriesTable,
    pub stats: ParseStats,
}

/// Turns parsed rows into a [`TimeSeriesTable`]
#[derive(Debug, Clone, Copy)]
pub struct TabularAssembler {
    converter: DayOfYearConverter,
}

impl TabularAssembler {
    pub fn new(converter: DayOfYearConverter) -> Self {
        Self { converter }
    }

    /// Assemble a table named `name` from a parsed file
    pub fn assemble(&self, name: &str, parsed: ParsedFile) -> Result<ParseResult> {
        let ParsedFile {
            path,
            column_names,
            fields,
            rows,
            mut stats,
            ..
        } = parsed;

        let mut index = Vec::with_capacity(rows.len());
        let mut previous: Option<NaiveDateTime> = None;
        for row in &rows {
            let timestamp = self.converter.to_calendar(row.day).map_err(|e| match e {
                W2Error::DateConversion { reason, .. } => W2Error::DateConversion {
                    reason: format!("{} in {}", reason, path.display()),
                    line: Some(row.line_number),
                },
                other => other,
            })?;
            if previous.is_some_and(|p| timestamp < p) {
                stats.out_of_order_rows += 1;
                warn!(
                    "{}: line {} goes back in time (day {}); source order kept",
                    path.display(),
                    row.line_number,
                    row.day
                );
            }
            previous = Some(timestamp);
            index.push(timestamp);
        }

        let columns = column_names
            .into_iter()
            .enumerate()
            .map(|(position, column_name)| {
                let field = fields.as_ref().and_then(|f| f.get(position));
                let scale = field.map(|f| f.multiplier).unwrap_or(1.0);
                let values = rows
                    .iter()
                    .map(|row| {
                        row.values
                            .get(position)
                            .and_then(|v| v.as_option())
                            .map(|v| v * scale)
                    })
                    .collect();
                let metadata = field.map(ColumnMetadata::from_field).unwrap_or_default();
                TableColumn::new(column_name, values, metadata)
            })
            .collect();

        let table = TimeSeriesTable {
            name: name.to_string(),
            source: Some(path),
            reference_year: self.converter.reference_year(),
            index,
            columns,
        };
        Ok(ParseResult { table, stats })
    }
}
