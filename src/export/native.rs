//! Native W2 CSV export.
//!
//! Writes a `$` title line and a blank line, then a `JDAY` header followed
//! by the value columns, so the output reads back through the CSV parser
//! with the standard header row. Files whose names start with `tsr` carry
//! the header on the first line instead.

use super::{ExportFormat, TableExporter, prepare_file, series_name};
use crate::config::ExportOptions;
use crate::constants::{NATIVE_TITLE_LINE, TIME_COLUMN_NAME};
use crate::datetime::DayOfYearConverter;
use crate::error::{Result, W2Error};
use crate::header::header_row_for;
use crate::table::TimeSeriesTable;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::Path;
use tracing::info;

/// Writes a table back out as a W2 CSV time-series file
#[derive(Debug, Clone, Copy, Default)]
pub struct NativeCsvExporter;

impl TableExporter for NativeCsvExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Native
    }

    fn export(
        &self,
        table: &TimeSeriesTable,
        destination: &Path,
        options: &ExportOptions,
    ) -> Result<()> {
        prepare_file(destination, options)?;
        let fail = |e: csv::Error| W2Error::export(destination, e);
        let converter = DayOfYearConverter::new(Some(table.reference_year()))?;

        let file = File::create(destination).map_err(|e| W2Error::export(destination, e))?;
        let mut out = BufWriter::new(file);
        if header_row_for(destination) > 0 {
            writeln!(out, "{} {}", NATIVE_TITLE_LINE, series_name(table, options))
                .and_then(|_| writeln!(out))
                .map_err(|e| W2Error::export(destination, e))?;
        }

        let mut writer = csv::Writer::from_writer(out);
        let mut header = vec![TIME_COLUMN_NAME];
        header.extend(table.column_names());
        writer.write_record(&header).map_err(fail)?;

        let precision = options.native_precision;
        for (row, timestamp) in table.index().iter().enumerate() {
            let mut record = Vec::with_capacity(table.columns().len() + 1);
            // Shortest round-trip form keeps the timestamp exact on re-read.
            record.push(converter.to_julian(*timestamp).to_string());
            record.extend(table.columns().iter().map(|column| {
                column.values()[row]
                    .map(|v| format!("{v:.precision$}"))
                    .unwrap_or_default()
            }));
            writer.write_record(&record).map_err(fail)?;
        }
        writer.flush().map_err(|e| W2Error::export(destination, e))?;

        info!(
            "Wrote {} rows of '{}' to {}",
            table.row_count(),
            table.name(),
            destination.display()
        );
        Ok(())
    }
}
