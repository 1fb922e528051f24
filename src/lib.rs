//! W2 Processor Library
//!
//! A Rust library for reading CE-QUAL-W2 time-series files into typed,
//! calendar-indexed tables and exporting them to storage formats.
//!
//! This library provides tools for:
//! - Parsing graph descriptors that name, scale and format each column
//! - Detecting header rows and fixed-width or comma-delimited layouts
//! - Parsing legacy Fortran numbers, recovering from malformed fields
//! - Converting fractional day-of-year time to calendar timestamps
//! - Writing SQLite, HDF5 (netCDF-4 groups), NetCDF, Parquet and W2 CSV

pub mod config;
pub mod constants;
pub mod control;
pub mod datetime;
pub mod descriptor;
pub mod error;
pub mod export;
pub mod header;
pub mod models;
pub mod parser;
pub mod processor;
pub mod table;

// CLI modules
pub mod cli {
    pub mod args;
    pub mod commands;
}

// Re-export commonly used types
pub use config::{CompressionAlgorithm, ExportOptions, ReadConfig};
pub use datetime::DayOfYearConverter;
pub use descriptor::{FormatDescriptor, parse_descriptor};
pub use error::{FieldParseError, Result, W2Error};
pub use export::{
    ExportFormat, TableExporter, export_hierarchical, export_hierarchical_with, export_netcdf,
    export_netcdf_with, export_relational, export_relational_with, read_hierarchical, read_netcdf,
    read_relational,
};
pub use models::{FieldSpec, FormatCode, ParseStats};
pub use processor::{SeriesReader, read, read_with_config};
pub use table::{ColumnMetadata, ParseResult, TableColumn, TabularAssembler, TimeSeriesTable};
