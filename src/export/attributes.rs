//! Column metadata as netCDF variable attributes.
//!
//! Shared by the hierarchical and CF exporters. The advisory descriptor
//! limits are stored as `plot_min`/`plot_max`: CF readers would mask data
//! outside `valid_min`/`valid_max`, and W2 limits only steer plotting.

use crate::constants::{PLOT_OFF, PLOT_ON};
use crate::models::FormatCode;
use crate::table::{ColumnMetadata, TableColumn};
use netcdf::AttributeValue;

pub(crate) const LONG_NAME: &str = "long_name";
pub(crate) const UNITS: &str = "units";
pub(crate) const FILL_VALUE: &str = "_FillValue";
pub(crate) const POSITION: &str = "column_position";
const MULTIPLIER: &str = "multiplier";
const PLOT_MIN: &str = "plot_min";
const PLOT_MAX: &str = "plot_max";
const PLOT_FLAG: &str = "plot_flag";
const SECTION: &str = "section";
const SEQUENCE_INDEX: &str = "sequence_index";
const FORMAT_CODE: &str = "format_code";

/// Attach the column's name, position and metadata to a variable.
///
/// Must run before values are written so `_FillValue` can still be set.
pub(crate) fn put_column_attributes(
    var: &mut netcdf::VariableMut<'_>,
    column: &TableColumn,
    position: usize,
) -> netcdf::Result<()> {
    var.put_attribute(FILL_VALUE, f64::NAN)?;
    var.put_attribute(LONG_NAME, column.name())?;
    var.put_attribute(POSITION, position as i64)?;

    let meta = column.metadata();
    if let Some(unit) = &meta.unit {
        var.put_attribute(UNITS, unit.as_str())?;
    }
    if let Some(multiplier) = meta.multiplier {
        var.put_attribute(MULTIPLIER, multiplier)?;
    }
    if let Some(min) = meta.min {
        var.put_attribute(PLOT_MIN, min)?;
    }
    if let Some(max) = meta.max {
        var.put_attribute(PLOT_MAX, max)?;
    }
    if let Some(flag) = meta.plot_flag {
        var.put_attribute(PLOT_FLAG, if flag { PLOT_ON } else { PLOT_OFF })?;
    }
    if let Some(section) = &meta.section {
        var.put_attribute(SECTION, section.as_str())?;
    }
    if let Some(index) = meta.sequence_index {
        var.put_attribute(SEQUENCE_INDEX, index)?;
    }
    if let Some(code) = meta.format_code {
        var.put_attribute(FORMAT_CODE, code.to_string().as_str())?;
    }
    Ok(())
}

/// Column values with missing entries as NaN
pub(crate) fn fill_missing(column: &TableColumn) -> Vec<f64> {
    column.values().iter().map(|v| v.unwrap_or(f64::NAN)).collect()
}

/// Inverse of [`fill_missing`]
pub(crate) fn restore_missing(values: Vec<f64>) -> Vec<Option<f64>> {
    values.into_iter().map(|v| (!v.is_nan()).then_some(v)).collect()
}

/// Column name, stored position and metadata read back from a variable
pub(crate) fn column_from_variable(
    var: &netcdf::Variable<'_>,
) -> (String, Option<i64>, ColumnMetadata) {
    let name = attr_string(var, LONG_NAME).unwrap_or_else(|| var.name());
    let metadata = ColumnMetadata {
        unit: attr_string(var, UNITS),
        multiplier: attr_f64(var, MULTIPLIER),
        min: attr_f64(var, PLOT_MIN),
        max: attr_f64(var, PLOT_MAX),
        plot_flag: attr_string(var, PLOT_FLAG).map(|flag| flag.eq_ignore_ascii_case(PLOT_ON)),
        section: attr_string(var, SECTION),
        sequence_index: attr_i64(var, SEQUENCE_INDEX),
        format_code: attr_string(var, FORMAT_CODE).as_deref().and_then(FormatCode::parse),
    };
    (name, attr_i64(var, POSITION), metadata)
}

fn attr_value(var: &netcdf::Variable<'_>, name: &str) -> Option<AttributeValue> {
    var.attribute_value(name).and_then(|value| value.ok())
}

pub(crate) fn attr_string(var: &netcdf::Variable<'_>, name: &str) -> Option<String> {
    attr_value(var, name).and_then(as_string)
}

fn attr_f64(var: &netcdf::Variable<'_>, name: &str) -> Option<f64> {
    attr_value(var, name).and_then(as_f64)
}

fn attr_i64(var: &netcdf::Variable<'_>, name: &str) -> Option<i64> {
    attr_value(var, name).and_then(as_i64)
}

pub(crate) fn as_string(value: AttributeValue) -> Option<String> {
    match value {
        AttributeValue::Str(s) => Some(s),
        _ => None,
    }
}

pub(crate) fn as_f64(value: AttributeValue) -> Option<f64> {
    match value {
        AttributeValue::Double(v) => Some(v),
        AttributeValue::Float(v) => Some(f64::from(v)),
        other => as_i64(other).map(|v| v as f64),
    }
}

pub(crate) fn as_i64(value: AttributeValue) -> Option<i64> {
    match value {
        AttributeValue::Longlong(v) => Some(v),
        AttributeValue::Int(v) => Some(i64::from(v)),
        AttributeValue::Short(v) => Some(i64::from(v)),
        AttributeValue::Schar(v) => Some(i64::from(v)),
        AttributeValue::Uint(v) => Some(i64::from(v)),
        AttributeValue::Ushort(v) => Some(i64::from(v)),
        AttributeValue::Uchar(v) => Some(i64::from(v)),
        _ => None,
    }
}
