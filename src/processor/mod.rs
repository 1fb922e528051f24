//! Read pipeline from W2 data files to typed tables.
//!
//! Ties together header detection, parsing, reference-year resolution and
//! assembly. A [`SeriesReader`] holds one shared descriptor and reads any
//! number of data files with it.

pub mod discovery;

#[cfg(test)]
pub mod tests;

use crate::config::ReadConfig;
use crate::control::find_reference_year;
use crate::datetime::DayOfYearConverter;
use crate::descriptor::FormatDescriptor;
use crate::error::{Result, W2Error};
use crate::parser::parse_file;
use crate::table::{ParseResult, TabularAssembler, TimeSeriesTable};
use std::path::Path;
use std::sync::Arc;
use tracing::{info, warn};

/// Reads data files against an optional shared descriptor
#[derive(Debug, Clone, Default)]
pub struct SeriesReader {
    descriptor: Option<Arc<FormatDescriptor>>,
    config: ReadConfig,
}

impl SeriesReader {
    pub fn new(descriptor: Option<Arc<FormatDescriptor>>, config: ReadConfig) -> Result<Self> {
        config.validate()?;
        if let (Some(descriptor), Some(section)) = (&descriptor, &config.section) {
            descriptor.select(Some(section))?;
        }
        Ok(Self { descriptor, config })
    }

    pub fn descriptor(&self) -> Option<&FormatDescriptor> {
        self.descriptor.as_deref()
    }

    pub fn config(&self) -> &ReadConfig {
        &self.config
    }

    /// Read one data file into a table and its parse statistics
    pub fn read(&self, path: &Path) -> Result<ParseResult> {
        read_with_config(path, self.descriptor(), &self.config)
    }
}

/// Read a data file into a table.
///
/// `reference_year` takes precedence; without it the W2 control file next
/// to the data file is consulted.
pub fn read(
    path: &Path,
    descriptor: Option<&FormatDescriptor>,
    reference_year: Option<i32>,
) -> Result<TimeSeriesTable> {
    let config = ReadConfig {
        reference_year,
        ..ReadConfig::default()
    };
    Ok(read_with_config(path, descriptor, &config)?.table)
}

/// Read a data file with explicit settings, returning parse statistics too
pub fn read_with_config(
    path: &Path,
    descriptor: Option<&FormatDescriptor>,
    config: &ReadConfig,
) -> Result<ParseResult> {
    config.validate()?;

    let fields = descriptor
        .map(|d| d.select(config.section.as_deref()))
        .transpose()?;

    let parsed = parse_file(path, fields.as_deref(), config)?;

    let year = resolve_reference_year(path, config)?;
    let mut converter = DayOfYearConverter::new(Some(year))?;
    if let Some(seconds) = config.round_to_seconds {
        converter = converter.with_rounding(seconds);
    }

    let name = config
        .series_name
        .clone()
        .unwrap_or_else(|| series_name_for(path));
    let result = TabularAssembler::new(converter).assemble(&name, parsed)?;

    let stats = &result.stats;
    if stats.warning_count() > 0 {
        let first = &stats.field_errors[0];
        warn!(
            "{}: {} malformed fields replaced with missing values (first at {})",
            path.display(),
            stats.warning_count(),
            first
        );
    }
    if stats.out_of_order_rows > 0 {
        warn!(
            "{}: {} rows are earlier than the row before them",
            path.display(),
            stats.out_of_order_rows
        );
    }
    info!(
        "Read {} rows x {} columns from {} (reference year {})",
        result.table.row_count(),
        result.table.columns().len(),
        path.display(),
        year
    );
    Ok(result)
}

/// Reference year from the configuration or, failing that, the control file
pub fn resolve_reference_year(path: &Path, config: &ReadConfig) -> Result<i32> {
    if let Some(year) = config.reference_year {
        return Ok(year);
    }
    if config.search_control_file {
        if let Some(year) = find_reference_year(path)? {
            return Ok(year);
        }
    }
    Err(W2Error::DateConversion {
        reason: format!(
            "no reference year given for {} and no w2_con control file found",
            path.display()
        ),
        line: None,
    })
}

/// Default table name for a data file: its stem
pub fn series_name_for(path: &Path) -> String {
    path.file_stem()
        .map(|s| s.to_string_lossy().to_string())
        .filter(|s| !s.is_empty())
        .unwrap_or_else(|| "series".to_string())
}
