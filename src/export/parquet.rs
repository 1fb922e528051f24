//! Parquet export through polars.

use super::{ExportFormat, TableExporter, prepare_file};
use crate::config::ExportOptions;
use crate::error::{Result, W2Error};
use crate::table::TimeSeriesTable;
use polars::prelude::*;
use std::fs::File;
use std::path::Path;
use tracing::info;

/// Writes a table as a Parquet file with a millisecond `Date` column
#[derive(Debug, Clone, Copy, Default)]
pub struct ParquetExporter;

impl TableExporter for ParquetExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Parquet
    }

    fn export(
        &self,
        table: &TimeSeriesTable,
        destination: &Path,
        options: &ExportOptions,
    ) -> Result<()> {
        let mut df = table
            .to_dataframe()
            .map_err(|e| W2Error::export(destination, e))?;
        prepare_file(destination, options)?;
        let file = File::create(destination).map_err(|e| W2Error::export(destination, e))?;
        ParquetWriter::new(file)
            .with_compression(options.compression.to_polars_compression())
            .with_statistics(StatisticsOptions::full())
            .finish(&mut df)
            .map_err(|e| W2Error::export(destination, e))?;

        info!(
            "Wrote {} rows x {} columns to {}",
            df.height(),
            df.width(),
            destination.display()
        );
        Ok(())
    }
}
