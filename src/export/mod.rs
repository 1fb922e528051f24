//! Exporters from [`TimeSeriesTable`] to storage formats.
//!
//! | Format        | Module          | Container                                   |
//! |---------------|-----------------|---------------------------------------------|
//! | Relational    | `relational`    | SQLite database, one table per series       |
//! | Hierarchical  | `hierarchical`  | netCDF-4/HDF5 file, one group per series    |
//! | NetCDF        | `cf_netcdf`     | CF-style netCDF with an unlimited time axis |
//! | Parquet       | `parquet`       | Apache Parquet via polars                   |
//! | Native        | `native`        | W2 CSV with a leading JDAY column           |
//!
//! All exporters implement [`TableExporter`]. Every failure is reported as
//! [`W2Error::Export`] carrying the destination path.

mod attributes;
pub mod cf_netcdf;
pub mod hierarchical;
pub mod native;
pub mod parquet;
pub mod relational;

#[cfg(test)]
pub mod tests;

pub use cf_netcdf::{NetCdfExporter, read_netcdf};
pub use hierarchical::{HierarchicalExporter, read_hierarchical};
pub use native::NativeCsvExporter;
pub use parquet::ParquetExporter;
pub use relational::{RelationalExporter, read_relational};

use crate::config::ExportOptions;
use crate::error::{Result, W2Error};
use crate::table::TimeSeriesTable;
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use std::fmt;
use std::fs;
use std::path::Path;
use tracing::debug;

/// Output formats
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum ExportFormat {
    Relational,
    Hierarchical,
    NetCdf,
    Parquet,
    Native,
}

impl ExportFormat {
    pub const ALL: [ExportFormat; 5] = [
        ExportFormat::Relational,
        ExportFormat::Hierarchical,
        ExportFormat::NetCdf,
        ExportFormat::Parquet,
        ExportFormat::Native,
    ];

    /// File extension used for this format
    pub fn extension(&self) -> &'static str {
        match self {
            ExportFormat::Relational => "db",
            ExportFormat::Hierarchical => "h5",
            ExportFormat::NetCdf => "nc",
            ExportFormat::Parquet => "parquet",
            ExportFormat::Native => "csv",
        }
    }

    /// Parse a command-line format name
    pub fn from_name(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "sqlite" | "sql" | "db" | "relational" => Some(ExportFormat::Relational),
            "hdf5" | "h5" | "hierarchical" => Some(ExportFormat::Hierarchical),
            "netcdf" | "nc" => Some(ExportFormat::NetCdf),
            "parquet" => Some(ExportFormat::Parquet),
            "w2csv" | "native" | "csv" => Some(ExportFormat::Native),
            _ => None,
        }
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ExportFormat::Relational => "sqlite",
            ExportFormat::Hierarchical => "hdf5",
            ExportFormat::NetCdf => "netcdf",
            ExportFormat::Parquet => "parquet",
            ExportFormat::Native => "w2csv",
        };
        write!(f, "{name}")
    }
}

/// Writes a table to one storage format
pub trait TableExporter {
    fn format(&self) -> ExportFormat;

    fn export(
        &self,
        table: &TimeSeriesTable,
        destination: &Path,
        options: &ExportOptions,
    ) -> Result<()>;
}

/// Exporter instance for a format
pub fn exporter_for(format: ExportFormat) -> Box<dyn TableExporter> {
    match format {
        ExportFormat::Relational => Box::new(RelationalExporter),
        ExportFormat::Hierarchical => Box::new(HierarchicalExporter),
        ExportFormat::NetCdf => Box::new(NetCdfExporter),
        ExportFormat::Parquet => Box::new(ParquetExporter),
        ExportFormat::Native => Box::new(NativeCsvExporter),
    }
}

pub fn export_relational(table: &TimeSeriesTable, destination: &Path) -> Result<()> {
    RelationalExporter.export(table, destination, &ExportOptions::default())
}

pub fn export_relational_with(
    table: &TimeSeriesTable,
    destination: &Path,
    options: &ExportOptions,
) -> Result<()> {
    RelationalExporter.export(table, destination, options)
}

pub fn export_hierarchical(table: &TimeSeriesTable, destination: &Path) -> Result<()> {
    HierarchicalExporter.export(table, destination, &ExportOptions::default())
}

pub fn export_hierarchical_with(
    table: &TimeSeriesTable,
    destination: &Path,
    options: &ExportOptions,
) -> Result<()> {
    HierarchicalExporter.export(table, destination, options)
}

pub fn export_netcdf(table: &TimeSeriesTable, destination: &Path) -> Result<()> {
    NetCdfExporter.export(table, destination, &ExportOptions::default())
}

pub fn export_netcdf_with(
    table: &TimeSeriesTable,
    destination: &Path,
    options: &ExportOptions,
) -> Result<()> {
    NetCdfExporter.export(table, destination, options)
}

/// Series name to store a table under
pub(crate) fn series_name(table: &TimeSeriesTable, options: &ExportOptions) -> String {
    options
        .series_name
        .clone()
        .unwrap_or_else(|| table.name().to_string())
}

/// Create parent directories and clear a whole-file destination.
///
/// Fails when the file exists and overwriting was not requested.
pub(crate) fn prepare_file(destination: &Path, options: &ExportOptions) -> Result<()> {
    if destination.exists() {
        if !options.overwrite {
            return Err(W2Error::export(destination, "destination already exists"));
        }
        debug!("Replacing existing {}", destination.display());
        fs::remove_file(destination).map_err(|e| W2Error::export(destination, e))?;
    }
    create_parent(destination)
}

pub(crate) fn create_parent(destination: &Path) -> Result<()> {
    if let Some(parent) = destination.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent).map_err(|e| W2Error::export(destination, e))?;
    }
    Ok(())
}

/// Turn an arbitrary column name into an identifier: ASCII letters, digits
/// and underscores, not starting with a digit
pub fn sanitize_name(name: &str) -> String {
    let mut out = String::with_capacity(name.len());
    for c in name.chars() {
        if c.is_ascii_alphanumeric() {
            out.push(c);
        } else if !out.ends_with('_') {
            out.push('_');
        }
    }
    let trimmed = out.trim_matches('_');
    if trimmed.is_empty() {
        "column".to_string()
    } else if trimmed.starts_with(|c: char| c.is_ascii_digit()) {
        format!("v_{trimmed}")
    } else {
        trimmed.to_string()
    }
}

/// Sanitised names made unique ignoring case, in input order.
///
/// `reserved` names (such as the time column) are never handed out.
pub fn unique_names<'a>(
    names: impl IntoIterator<Item = &'a str>,
    reserved: &[&str],
) -> Vec<String> {
    let mut taken: HashSet<String> = reserved.iter().map(|r| r.to_ascii_lowercase()).collect();
    names
        .into_iter()
        .map(|name| {
            let base = sanitize_name(name);
            let mut candidate = base.clone();
            let mut n = 2;
            while taken.contains(&candidate.to_ascii_lowercase()) {
                candidate = format!("{base}_{n}");
                n += 1;
            }
            taken.insert(candidate.to_ascii_lowercase());
            candidate
        })
        .collect()
}
