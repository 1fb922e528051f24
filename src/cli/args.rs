//! Command-line argument definitions for the W2 processor
//!
//! Defines the `convert` and `inspect` subcommands using the clap derive
//! API. Verbosity flags are global so they work after either subcommand.

use crate::config::{CompressionAlgorithm, ExportOptions, ReadConfig};
use crate::constants::DEFAULT_NATIVE_PRECISION;
use crate::error::{Result, W2Error};
use crate::export::ExportFormat;
use clap::{ArgAction, Parser, Subcommand};
use std::path::PathBuf;

/// CLI arguments for the CE-QUAL-W2 time-series processor
#[derive(Debug, Clone, Parser)]
#[command(
    name = "w2_processor",
    version,
    about = "Convert CE-QUAL-W2 time-series files to SQLite, HDF5, NetCDF and Parquet",
    long_about = "Reads CE-QUAL-W2 fixed-width (.npt/.opt) and CSV time-series files, \
                  resolves their columns from a graph descriptor, converts day-of-year \
                  time to calendar timestamps and writes the resulting tables to \
                  relational, hierarchical and NetCDF stores."
)]
pub struct Args {
    #[command(subcommand)]
    pub command: Option<Commands>,

    /// Increase logging verbosity (-v info, -vv debug, -vvv trace)
    #[arg(short, long, action = ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Only log errors and hide progress bars
    #[arg(short, long, global = true, conflicts_with = "verbose")]
    pub quiet: bool,
}

/// Available subcommands
#[derive(Debug, Clone, Subcommand)]
pub enum Commands {
    /// Read W2 data files and export them
    Convert(ConvertArgs),
    /// Print a descriptor's sections or a summary of data files
    Inspect(InspectArgs),
}

/// Options shared by commands that read data files
#[derive(Debug, Clone, clap::Args)]
pub struct ReadArgs {
    /// Graph descriptor giving column names, formats and metadata
    #[arg(short = 'd', long, value_name = "FILE")]
    pub descriptor: Option<PathBuf>,

    /// Reference year; looked up in w2_con.csv / w2_con.npt when omitted
    #[arg(short = 'y', long, value_name = "YEAR")]
    pub year: Option<i32>,

    /// Only use descriptor fields from this section
    #[arg(long, value_name = "NAME")]
    pub section: Option<String>,

    /// Snap timestamps to a multiple of this many seconds
    #[arg(long, value_name = "SECONDS")]
    pub round: Option<u32>,

    /// Value column names to use instead of the header row
    #[arg(long, value_name = "NAMES", value_delimiter = ',', conflicts_with = "met")]
    pub columns: Vec<String>,

    /// Name columns as a meteorology input file (air and dew point temperature,
    /// wind speed and direction, cloudiness, solar radiation)
    #[arg(long)]
    pub met: bool,
}

impl ReadArgs {
    pub fn read_config(&self) -> ReadConfig {
        let base = if self.met {
            ReadConfig::meteorology()
        } else if !self.columns.is_empty() {
            ReadConfig::default().with_column_names(self.columns.iter().map(|c| c.trim()))
        } else {
            ReadConfig::default()
        };
        ReadConfig {
            reference_year: self.year,
            section: self.section.clone(),
            round_to_seconds: self.round,
            ..base
        }
    }
}

/// Arguments for the convert command
#[derive(Debug, Clone, Parser)]
pub struct ConvertArgs {
    /// Data files or directories containing .npt, .opt and .csv files
    #[arg(value_name = "PATH", required = true)]
    pub inputs: Vec<PathBuf>,

    #[command(flatten)]
    pub read: ReadArgs,

    /// Output formats: sqlite, hdf5, netcdf, parquet, w2csv
    #[arg(
        short = 'f',
        long = "format",
        value_name = "FORMAT",
        value_delimiter = ',',
        default_value = "sqlite"
    )]
    pub formats: Vec<String>,

    /// Directory for exported files
    #[arg(short = 'o', long = "output-dir", value_name = "PATH", default_value = "output")]
    pub output_dir: PathBuf,

    /// File stem for the shared SQLite and HDF5 containers
    #[arg(long, value_name = "NAME", default_value = "w2_series")]
    pub container: String,

    /// Replace existing outputs
    #[arg(long)]
    pub overwrite: bool,

    /// Descend into sub-directories of input directories
    #[arg(short = 'r', long)]
    pub recursive: bool,

    /// Parquet compression algorithm (snappy, zstd, lz4, none)
    #[arg(long, default_value = "snappy")]
    pub compression: String,

    /// Decimal places for values in w2csv output
    #[arg(long, default_value_t = DEFAULT_NATIVE_PRECISION)]
    pub precision: usize,
}

impl ConvertArgs {
    /// Parse and de-duplicate the requested formats, keeping their order
    pub fn export_formats(&self) -> Result<Vec<ExportFormat>> {
        let mut formats = Vec::new();
        for name in &self.formats {
            let format = ExportFormat::from_name(name.trim()).ok_or_else(|| W2Error::Configuration {
                message: format!(
                    "unknown output format '{name}': \
                     expected sqlite, hdf5, netcdf, parquet or w2csv"
                ),
            })?;
            if !formats.contains(&format) {
                formats.push(format);
            }
        }
        Ok(formats)
    }

    pub fn export_options(&self) -> Result<ExportOptions> {
        let compression = CompressionAlgorithm::from_name(&self.compression).ok_or_else(|| {
            W2Error::Configuration {
                message: format!("unknown compression '{}'", self.compression),
            }
        })?;
        let mut options = ExportOptions::default()
            .with_compression(compression)
            .with_native_precision(self.precision);
        if self.overwrite {
            options = options.with_overwrite();
        }
        Ok(options)
    }

    pub fn validate(&self) -> Result<()> {
        if self.container.trim().is_empty() {
            return Err(W2Error::Configuration {
                message: "container name must not be blank".to_string(),
            });
        }
        self.export_formats()?;
        self.export_options()?;
        self.read.read_config().validate()
    }
}

/// Arguments for the inspect command
#[derive(Debug, Clone, Parser)]
pub struct InspectArgs {
    /// Data files to summarise; with none, only the descriptor is printed
    #[arg(value_name = "FILE")]
    pub files: Vec<PathBuf>,

    #[command(flatten)]
    pub read: ReadArgs,
}

impl InspectArgs {
    pub fn validate(&self) -> Result<()> {
        if self.files.is_empty() && self.read.descriptor.is_none() {
            return Err(W2Error::Configuration {
                message: "give data files to inspect or a --descriptor".to_string(),
            });
        }
        self.read.read_config().validate()
    }
}

impl Args {
    /// Log level implied by -v / -q
    pub fn get_log_level(&self) -> &'static str {
        if self.quiet {
            "error"
        } else {
            match self.verbose {
                0 => "warn",
                1 => "info",
                2 => "debug",
                _ => "trace",
            }
        }
    }

    /// Check if we should show progress bars (not in quiet mode)
    pub fn show_progress(&self) -> bool {
        !self.quiet
    }
}
