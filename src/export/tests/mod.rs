//! Tests for the exporters
//!
//! Every format is written from the same sample table and, where a reader
//! exists, rebuilt and compared with the original.


use crate::datetime::DayOfYearConverter;
use crate::models::{FormatCode, FormatKind};
use crate::table::{ColumnMetadata, TableColumn, TimeSeriesTable};

fn constituent(unit: &str, multiplier: f64, min: f64, max: f64, plot: bool) -> ColumnMetadata {
    ColumnMetadata {
        unit: Some(unit.to_string()),
        multiplier: Some(multiplier),
        min: Some(min),
        max: Some(max),
        plot_flag: Some(plot),
        section: Some("CONSTITUENT".to_string()),
        sequence_index: Some(2),
        format_code: Some(FormatCode::new(FormatKind::Fixed, 8, Some(2))),
    }
}

/// Outflow table for 2008 with a gap and a column without metadata
pub fn sample_table() -> TimeSeriesTable {
    let converter = DayOfYearConverter::new(Some(2008)).unwrap();
    let index = converter
        .days_to_calendar(&[60.0, 60.5, 61.25, 366.999])
        .unwrap();
    let columns = vec![
        TableColumn::new(
            "Temperature [T1]",
            vec![Some(4.2), Some(4.35), Some(-0.5), Some(31.0)],
            constituent("C", 1.0, -2.0, 30.0, true),
        ),
        TableColumn::new(
            "Dissolved oxygen [DO]",
            vec![Some(11.0), None, Some(10.5), Some(9.75)],
            constituent("g/m3", 0.001, 0.0, 15.0, false),
        ),
        TableColumn::new(
            "Outflow",
            vec![Some(12.5), Some(12.75), None, Some(13.0)],
            ColumnMetadata::default(),
        ),
    ];
    TimeSeriesTable::new("qwo_1", 2008, index, columns)
        .unwrap()
        .with_source("/run/qwo_1.opt")
}

/// Same layout as [`sample_table`] with no rows
pub fn empty_table() -> TimeSeriesTable {
    let columns = vec![TableColumn::new(
        "Outflow",
        Vec::new(),
        constituent("m3/s", 1.0, 0.0, 50.0, true),
    )];
    TimeSeriesTable::new("empty", 1995, Vec::new(), columns).unwrap()
}
