//! NetCDF export following the CF conventions.
//!
//! A single unlimited `time` dimension carries `f64` days since midnight on
//! January 1 of the reference year. Each column is an `f64` variable with a
//! sanitised name, its original name in `long_name` and NaN as `_FillValue`.

use super::attributes::{
    self, column_from_variable, fill_missing, put_column_attributes, restore_missing,
};
use super::{ExportFormat, TableExporter, prepare_file, series_name, unique_names};
use crate::config::ExportOptions;
use crate::constants::{MILLIS_PER_DAY, NETCDF_CONVENTIONS, NETCDF_TIME_DIMENSION};
use crate::error::{Result, W2Error};
use crate::table::{TableColumn, TimeSeriesTable};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use std::path::Path;
use tracing::info;

const TIME_UNITS_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Writes a table as a CF-style NetCDF file
#[derive(Debug, Clone, Copy, Default)]
pub struct NetCdfExporter;

impl TableExporter for NetCdfExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::NetCdf
    }

    fn export(
        &self,
        table: &TimeSeriesTable,
        destination: &Path,
        options: &ExportOptions,
    ) -> Result<()> {
        prepare_file(destination, options)?;
        let series = series_name(table, options);
        write_file(destination, &series, table).map_err(|e| W2Error::export(destination, e))?;
        info!(
            "Wrote {} time steps of '{}' to {}",
            table.row_count(),
            series,
            destination.display()
        );
        Ok(())
    }
}

/// `units` attribute of the time variable
pub fn time_units(reference_year: i32) -> String {
    format!("days since {reference_year:04}-01-01 00:00:00")
}

fn write_file(destination: &Path, series: &str, table: &TimeSeriesTable) -> netcdf::Result<()> {
    let steps = table.row_count();
    let mut file = netcdf::create(destination)?;
    file.add_attribute("Conventions", NETCDF_CONVENTIONS)?;
    file.add_attribute("title", series)?;
    file.add_attribute("reference_year", table.reference_year())?;
    if let Some(source) = table.source() {
        file.add_attribute("source", &*source.to_string_lossy())?;
    }
    file.add_attribute(
        "history",
        format!("created by w2_processor {}", env!("CARGO_PKG_VERSION")).as_str(),
    )?;

    file.add_unlimited_dimension(NETCDF_TIME_DIMENSION)?;

    let epoch = year_start(table.reference_year());
    let days: Vec<f64> = table
        .index()
        .iter()
        .map(|t| t.signed_duration_since(epoch).num_milliseconds() as f64 / MILLIS_PER_DAY)
        .collect();
    let mut time = file.add_variable::<f64>(NETCDF_TIME_DIMENSION, &[NETCDF_TIME_DIMENSION])?;
    time.put_attribute("standard_name", "time")?;
    time.put_attribute(attributes::LONG_NAME, "time")?;
    time.put_attribute(attributes::UNITS, time_units(table.reference_year()).as_str())?;
    time.put_attribute("calendar", "standard")?;
    time.put_attribute("axis", "T")?;
    if steps > 0 {
        time.put_values(&days, (0..steps,))?;
    }

    let names = unique_names(
        table.columns().iter().map(TableColumn::name),
        &[NETCDF_TIME_DIMENSION],
    );
    for (position, (column, name)) in table.columns().iter().zip(&names).enumerate() {
        let mut var = file.add_variable::<f64>(name, &[NETCDF_TIME_DIMENSION])?;
        put_column_attributes(&mut var, column, position)?;
        if steps > 0 {
            var.put_values(&fill_missing(column), (0..steps,))?;
        }
    }
    Ok(())
}

fn year_start(year: i32) -> NaiveDateTime {
    NaiveDate::from_ymd_opt(year, 1, 1)
        .and_then(|d| d.and_hms_opt(0, 0, 0))
        .unwrap_or_default()
}

/// Parse `days since YYYY-MM-DD[ HH:MM:SS]`
fn parse_time_units(units: &str) -> Option<NaiveDateTime> {
    let base = units.trim().strip_prefix("days since ")?.trim();
    NaiveDateTime::parse_from_str(base, TIME_UNITS_FORMAT)
        .ok()
        .or_else(|| {
            NaiveDate::parse_from_str(base.get(..10)?, "%Y-%m-%d")
                .ok()?
                .and_hms_opt(0, 0, 0)
        })
}

/// Rebuild a table from a file written by [`NetCdfExporter`]
pub fn read_netcdf(path: &Path) -> Result<TimeSeriesTable> {
    let fail = |e: netcdf::Error| W2Error::export(path, e);
    if !path.exists() {
        return Err(W2Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let file = netcdf::open(path).map_err(fail)?;
    let global = |name: &str| file.attribute(name).and_then(|a| a.value().ok());

    let time = file
        .variable(NETCDF_TIME_DIMENSION)
        .ok_or_else(|| W2Error::export(path, "no time variable"))?;
    let units = attributes::attr_string(&time, attributes::UNITS)
        .ok_or_else(|| W2Error::export(path, "time variable has no units"))?;
    let base = parse_time_units(&units)
        .ok_or_else(|| W2Error::export(path, format!("unsupported time units {units:?}")))?;

    let steps = time.dimensions().first().map(|d| d.len()).unwrap_or(0);
    let days: Vec<f64> = if steps > 0 {
        time.get_values::<f64, _>(..).map_err(fail)?
    } else {
        Vec::new()
    };
    let index = days
        .iter()
        .map(|day| {
            Duration::try_milliseconds((day * MILLIS_PER_DAY).round() as i64)
                .and_then(|offset| base.checked_add_signed(offset))
                .ok_or_else(|| W2Error::export(path, format!("time value {day} is out of range")))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut columns = Vec::new();
    for var in file.variables() {
        if var.name() == NETCDF_TIME_DIMENSION {
            continue;
        }
        let (name, position, metadata) = column_from_variable(&var);
        let values = if steps > 0 {
            restore_missing(var.get_values::<f64, _>(..).map_err(fail)?)
        } else {
            Vec::new()
        };
        columns.push((position, TableColumn::new(name, values, metadata)));
    }
    columns.sort_by_key(|(position, _)| position.unwrap_or(i64::MAX));

    let title = global("title")
        .and_then(attributes::as_string)
        .or_else(|| path.file_stem().map(|s| s.to_string_lossy().to_string()))
        .unwrap_or_default();
    let reference_year = global("reference_year")
        .and_then(attributes::as_i64)
        .and_then(|year| i32::try_from(year).ok())
        .unwrap_or_else(|| chrono::Datelike::year(&base));
    let source = global("source").and_then(attributes::as_string);

    let table = TimeSeriesTable::new(
        title,
        reference_year,
        index,
        columns.into_iter().map(|(_, c)| c).collect(),
    )?;
    Ok(match source {
        Some(source) => table.with_source(source),
        None => table,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_time_units_round_trip() {
        let units = time_units(2008);
        assert_eq!(units, "days since 2008-01-01 00:00:00");
        assert_eq!(parse_time_units(&units), Some(year_start(2008)));
        assert_eq!(parse_time_units("days since 1999-01-01"), Some(year_start(1999)));
        assert_eq!(parse_time_units("hours since 1999-01-01"), None);
    }
}
