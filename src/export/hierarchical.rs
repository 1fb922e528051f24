//! Hierarchical export: one netCDF-4 (HDF5) group per series.
//!
//! Each group holds a `Date` dimension, an `i64` `Date` variable in epoch
//! milliseconds and one `f64` variable per column with NaN as fill value.
//! Group attributes record the original series name, the reference year and
//! the source path. Further series can be appended to an existing file.

use super::attributes::{
    self, column_from_variable, fill_missing, put_column_attributes, restore_missing,
};
use super::{ExportFormat, TableExporter, create_parent, sanitize_name, series_name, unique_names};
use crate::config::ExportOptions;
use crate::constants::DATE_COLUMN;
use crate::datetime::{from_epoch_millis, to_epoch_millis};
use crate::error::{Result, W2Error};
use crate::table::{TableColumn, TimeSeriesTable};
use std::fs;
use std::path::Path;
use tracing::{debug, info};

const SERIES_ATTR: &str = "series";
const REFERENCE_YEAR_ATTR: &str = "reference_year";
const SOURCE_ATTR: &str = "source";
const DATE_UNITS: &str = "milliseconds since 1970-01-01 00:00:00";

/// Writes tables as groups of a netCDF-4/HDF5 file
#[derive(Debug, Clone, Copy, Default)]
pub struct HierarchicalExporter;

impl TableExporter for HierarchicalExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Hierarchical
    }

    fn export(
        &self,
        table: &TimeSeriesTable,
        destination: &Path,
        options: &ExportOptions,
    ) -> Result<()> {
        let fail = |e: netcdf::Error| W2Error::export(destination, e);
        let series = series_name(table, options);
        let group = sanitize_name(&series);

        if !destination.exists() {
            create_parent(destination)?;
            let mut file = netcdf::create(destination).map_err(fail)?;
            write_group(&mut file, &group, &series, table).map_err(fail)?;
        } else {
            let stored = stored_series(destination)?;
            match stored.iter().find(|(g, _)| *g == group) {
                None => {
                    let mut file = netcdf::append(destination).map_err(fail)?;
                    write_group(&mut file, &group, &series, table).map_err(fail)?;
                }
                Some((_, existing)) if *existing != series => {
                    return Err(W2Error::export(
                        destination,
                        format!("group '{group}' already holds series '{existing}'"),
                    ));
                }
                Some(_) if !options.overwrite => {
                    return Err(W2Error::export(
                        destination,
                        format!("series '{series}' already exists"),
                    ));
                }
                Some(_) => {
                    debug!("Rewriting {} to replace '{}'", destination.display(), series);
                    rewrite_replacing(destination, &stored, &group, &series, table)?;
                }
            }
        }

        info!(
            "Wrote {} rows of '{}' to group '{}' of {}",
            table.row_count(),
            series,
            group,
            destination.display()
        );
        Ok(())
    }
}

/// netCDF-4 cannot delete groups, so the file is rebuilt with every other
/// series kept in place
fn rewrite_replacing(
    destination: &Path,
    stored: &[(String, String)],
    group: &str,
    series: &str,
    table: &TimeSeriesTable,
) -> Result<()> {
    let fail = |e: netcdf::Error| W2Error::export(destination, e);
    let others = stored
        .iter()
        .filter(|(g, _)| g != group)
        .map(|(g, s)| Ok((g.clone(), s.clone(), read_hierarchical(destination, Some(s))?)))
        .collect::<Result<Vec<_>>>()?;

    fs::remove_file(destination).map_err(|e| W2Error::export(destination, e))?;
    let mut file = netcdf::create(destination).map_err(fail)?;
    for (g, _) in stored {
        if g == group {
            write_group(&mut file, group, series, table).map_err(fail)?;
        } else if let Some((g, s, other)) = others.iter().find(|(other, _, _)| other == g) {
            write_group(&mut file, g, s, other).map_err(fail)?;
        }
    }
    Ok(())
}

fn write_group(
    file: &mut netcdf::FileMut,
    group_name: &str,
    series: &str,
    table: &TimeSeriesTable,
) -> netcdf::Result<()> {
    let rows = table.row_count();
    let mut group = file.add_group(group_name)?;
    group.add_attribute(SERIES_ATTR, series)?;
    group.add_attribute(REFERENCE_YEAR_ATTR, table.reference_year())?;
    if let Some(source) = table.source() {
        group.add_attribute(SOURCE_ATTR, &*source.to_string_lossy())?;
    }
    group.add_dimension(DATE_COLUMN, rows)?;

    let millis: Vec<i64> = table.index().iter().map(|t| to_epoch_millis(*t)).collect();
    let mut date = group.add_variable::<i64>(DATE_COLUMN, &[DATE_COLUMN])?;
    date.put_attribute(attributes::UNITS, DATE_UNITS)?;
    if rows > 0 {
        date.put_values(&millis, (0..rows,))?;
    }

    let names = unique_names(table.columns().iter().map(TableColumn::name), &[DATE_COLUMN]);
    for (position, (column, name)) in table.columns().iter().zip(&names).enumerate() {
        let mut var = group.add_variable::<f64>(name, &[DATE_COLUMN])?;
        put_column_attributes(&mut var, column, position)?;
        if rows > 0 {
            var.put_values(&fill_missing(column), (0..rows,))?;
        }
    }
    Ok(())
}

/// `(group, series)` pairs stored in a file, in file order
fn stored_series(path: &Path) -> Result<Vec<(String, String)>> {
    let fail = |e: netcdf::Error| W2Error::export(path, e);
    let file = netcdf::open(path).map_err(fail)?;
    let groups = file.groups().map_err(fail)?;
    Ok(groups
        .map(|group| {
            let name = group.name();
            let series = group
                .attribute(SERIES_ATTR)
                .and_then(|a| a.value().ok())
                .and_then(attributes::as_string)
                .unwrap_or_else(|| name.clone());
            (name, series)
        })
        .collect())
}

/// Series names stored in a hierarchical file
pub fn list_series(path: &Path) -> Result<Vec<String>> {
    if !path.exists() {
        return Err(W2Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Ok(stored_series(path)?.into_iter().map(|(_, series)| series).collect())
}

/// Rebuild a table from a hierarchical file.
///
/// `series` may be omitted when the file holds exactly one group.
pub fn read_hierarchical(path: &Path, series: Option<&str>) -> Result<TimeSeriesTable> {
    let fail = |e: netcdf::Error| W2Error::export(path, e);
    if !path.exists() {
        return Err(W2Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    let stored = stored_series(path)?;
    let (group_name, series) = match series {
        Some(wanted) => stored.into_iter().find(|(_, s)| s == wanted),
        None if stored.len() == 1 => stored.into_iter().next(),
        None => {
            return Err(W2Error::export(
                path,
                format!("expected one series, found {}: name one explicitly", stored.len()),
            ));
        }
    }
    .ok_or_else(|| W2Error::export(path, format!("series '{}' not found", series.unwrap_or(""))))?;

    let file = netcdf::open(path).map_err(fail)?;
    let group = file
        .group(&group_name)
        .map_err(fail)?
        .ok_or_else(|| W2Error::export(path, format!("group '{group_name}' not found")))?;

    let reference_year = group
        .attribute(REFERENCE_YEAR_ATTR)
        .and_then(|a| a.value().ok())
        .and_then(attributes::as_i64)
        .and_then(|year| i32::try_from(year).ok())
        .ok_or_else(|| {
            W2Error::export(path, format!("group '{group_name}' has no reference year"))
        })?;
    let source = group
        .attribute(SOURCE_ATTR)
        .and_then(|a| a.value().ok())
        .and_then(attributes::as_string);

    let date = group
        .variable(DATE_COLUMN)
        .ok_or_else(|| {
            W2Error::export(path, format!("group '{group_name}' has no Date variable"))
        })?;
    let rows = date.dimensions().first().map(|d| d.len()).unwrap_or(0);
    let millis: Vec<i64> = if rows > 0 {
        date.get_values::<i64, _>(..).map_err(fail)?
    } else {
        Vec::new()
    };
    let index = millis
        .into_iter()
        .map(|ms| {
            from_epoch_millis(ms)
                .ok_or_else(|| W2Error::export(path, format!("timestamp {ms} is out of range")))
        })
        .collect::<Result<Vec<_>>>()?;

    let mut columns = Vec::new();
    for var in group.variables() {
        if var.name() == DATE_COLUMN {
            continue;
        }
        let (name, position, metadata) = column_from_variable(&var);
        let values = if rows > 0 {
            restore_missing(var.get_values::<f64, _>(..).map_err(fail)?)
        } else {
            Vec::new()
        };
        columns.push((position, TableColumn::new(name, values, metadata)));
    }
    columns.sort_by_key(|(position, _)| position.unwrap_or(i64::MAX));

    let table = TimeSeriesTable::new(
        series,
        reference_year,
        index,
        columns.into_iter().map(|(_, c)| c).collect(),
    )?;
    Ok(match source {
        Some(source) => table.with_source(source),
        None => table,
    })
}
