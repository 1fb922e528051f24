//! SQLite export.
//!
//! Each series becomes one table: an integer `row_id` primary key, a `Date`
//! text column and one nullable REAL column per value column. Column names
//! are sanitised for SQL and made unique; the original names, units and the
//! rest of the descriptor metadata live in the shared `column_metadata`
//! table, keyed by series and position. `series_metadata` holds the
//! reference year and source path so a table can be rebuilt exactly.
//!
//! A database may hold many series. Overwriting replaces only the named
//! series, inside one transaction.

use super::{ExportFormat, TableExporter, create_parent, series_name, unique_names};
use crate::config::ExportOptions;
use crate::constants::{
    COLUMN_METADATA_TABLE, DATE_COLUMN, RELATIONAL_TIMESTAMP_FORMAT, SERIES_METADATA_TABLE,
};
use crate::error::{Result, W2Error};
use crate::models::FormatCode;
use crate::table::{ColumnMetadata, TableColumn, TimeSeriesTable};
use chrono::NaiveDateTime;
use rusqlite::types::Value;
use rusqlite::{Connection, OptionalExtension, Transaction, params, params_from_iter};
use std::path::Path;
use tracing::{debug, info};

const ROW_ID_COLUMN: &str = "row_id";

/// Writes tables into a SQLite database
#[derive(Debug, Clone, Copy, Default)]
pub struct RelationalExporter;

impl TableExporter for RelationalExporter {
    fn format(&self) -> ExportFormat {
        ExportFormat::Relational
    }

    fn export(
        &self,
        table: &TimeSeriesTable,
        destination: &Path,
        options: &ExportOptions,
    ) -> Result<()> {
        let fail = |e: rusqlite::Error| W2Error::export(destination, e);
        let series = series_name(table, options);
        if [COLUMN_METADATA_TABLE, SERIES_METADATA_TABLE]
            .iter()
            .any(|reserved| reserved.eq_ignore_ascii_case(&series))
        {
            return Err(W2Error::export(
                destination,
                format!("'{series}' is reserved for metadata"),
            ));
        }

        create_parent(destination)?;
        let mut conn = Connection::open(destination).map_err(fail)?;
        let tx = conn.transaction().map_err(fail)?;

        create_metadata_tables(&tx).map_err(fail)?;
        if table_exists(&tx, &series).map_err(fail)? {
            if !options.overwrite {
                return Err(W2Error::export(
                    destination,
                    format!("series '{series}' already exists"),
                ));
            }
            debug!("Replacing series '{}' in {}", series, destination.display());
            drop_series(&tx, &series).map_err(fail)?;
        }

        let sql_names = unique_names(
            table.columns().iter().map(TableColumn::name),
            &[ROW_ID_COLUMN, DATE_COLUMN],
        );
        write_series(&tx, table, &series, &sql_names).map_err(fail)?;
        write_metadata(&tx, table, &series, &sql_names).map_err(fail)?;
        tx.commit().map_err(fail)?;

        info!(
            "Wrote {} rows of '{}' to {}",
            table.row_count(),
            series,
            destination.display()
        );
        Ok(())
    }
}

/// Quote an SQL identifier
fn quote(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

fn create_metadata_tables(tx: &Transaction) -> rusqlite::Result<()> {
    tx.execute_batch(&format!(
        "CREATE TABLE IF NOT EXISTS {COLUMN_METADATA_TABLE} (
            series TEXT NOT NULL,
            position INTEGER NOT NULL,
            column_name TEXT NOT NULL,
            sql_column TEXT NOT NULL,
            unit TEXT,
            multiplier REAL,
            min_value REAL,
            max_value REAL,
            plot_flag INTEGER,
            section TEXT,
            sequence_index INTEGER,
            format_code TEXT,
            PRIMARY KEY (series, position)
        );
        CREATE TABLE IF NOT EXISTS {SERIES_METADATA_TABLE} (
            series TEXT PRIMARY KEY,
            reference_year INTEGER NOT NULL,
            source TEXT
        );"
    ))
}

/// SQLite table names ignore case, so `qwo` and `Qwo` are the same table
fn table_exists(tx: &Transaction, name: &str) -> rusqlite::Result<bool> {
    tx.query_row(
        "SELECT COUNT(*) FROM sqlite_master WHERE type = 'table' AND name = ?1 COLLATE NOCASE",
        [name],
        |row| row.get::<_, i64>(0),
    )
    .map(|count| count > 0)
}

fn drop_series(tx: &Transaction, series: &str) -> rusqlite::Result<()> {
    tx.execute(&format!("DROP TABLE IF EXISTS {}", quote(series)), [])?;
    tx.execute(
        &format!("DELETE FROM {COLUMN_METADATA_TABLE} WHERE series = ?1 COLLATE NOCASE"),
        [series],
    )?;
    tx.execute(
        &format!("DELETE FROM {SERIES_METADATA_TABLE} WHERE series = ?1 COLLATE NOCASE"),
        [series],
    )?;
    Ok(())
}

fn write_series(
    tx: &Transaction,
    table: &TimeSeriesTable,
    series: &str,
    sql_names: &[String],
) -> rusqlite::Result<()> {
    let mut definitions = vec![
        format!("{} INTEGER PRIMARY KEY", quote(ROW_ID_COLUMN)),
        format!("{} TEXT NOT NULL", quote(DATE_COLUMN)),
    ];
    definitions.extend(sql_names.iter().map(|n| format!("{} REAL", quote(n))));
    tx.execute(
        &format!("CREATE TABLE {} ({})", quote(series), definitions.join(", ")),
        [],
    )?;
    tx.execute(
        &format!(
            "CREATE INDEX {} ON {} ({})",
            quote(&format!("{series}_date_idx")),
            quote(series),
            quote(DATE_COLUMN)
        ),
        [],
    )?;

    let mut targets = vec![quote(DATE_COLUMN)];
    targets.extend(sql_names.iter().map(|n| quote(n)));
    let placeholders = vec!["?"; targets.len()].join(", ");
    let mut insert = tx.prepare(&format!(
        "INSERT INTO {} ({}) VALUES ({})",
        quote(series),
        targets.join(", "),
        placeholders
    ))?;

    for (row, timestamp) in table.index().iter().enumerate() {
        let mut values = Vec::with_capacity(targets.len());
        values.push(Value::Text(
            timestamp.format(RELATIONAL_TIMESTAMP_FORMAT).to_string(),
        ));
        values.extend(
            table
                .columns()
                .iter()
                .map(|c| c.values()[row].map(Value::Real).unwrap_or(Value::Null)),
        );
        insert.execute(params_from_iter(values.iter()))?;
    }
    Ok(())
}

fn write_metadata(
    tx: &Transaction,
    table: &TimeSeriesTable,
    series: &str,
    sql_names: &[String],
) -> rusqlite::Result<()> {
    let mut insert = tx.prepare(&format!(
        "INSERT INTO {COLUMN_METADATA_TABLE} (series, position, column_name, sql_column, unit,
            multiplier, min_value, max_value, plot_flag, section, sequence_index, format_code)
         VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12)"
    ))?;
    for (position, (column, sql_name)) in table.columns().iter().zip(sql_names).enumerate() {
        let meta = column.metadata();
        insert.execute(params![
            series,
            position as i64,
            column.name(),
            sql_name,
            meta.unit,
            meta.multiplier,
            meta.min,
            meta.max,
            meta.plot_flag,
            meta.section,
            meta.sequence_index,
            meta.format_code.map(|f| f.to_string()),
        ])?;
    }

    tx.execute(
        &format!(
            "INSERT INTO {SERIES_METADATA_TABLE} (series, reference_year, source) \
             VALUES (?1, ?2, ?3)"
        ),
        params![
            series,
            table.reference_year(),
            table.source().map(|p| p.to_string_lossy().to_string()),
        ],
    )?;
    Ok(())
}

/// Series names stored in a database, in insertion order
pub fn list_series(path: &Path) -> Result<Vec<String>> {
    let fail = |e: rusqlite::Error| W2Error::export(path, e);
    let conn = open_existing(path)?;
    let mut stmt = conn
        .prepare(&format!(
            "SELECT series FROM {SERIES_METADATA_TABLE} ORDER BY rowid"
        ))
        .map_err(fail)?;
    let names = stmt
        .query_map([], |row| row.get::<_, String>(0))
        .map_err(fail)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(fail)?;
    Ok(names)
}

/// Rebuild a table from a database.
///
/// `series` may be omitted when the database holds exactly one series.
pub fn read_relational(path: &Path, series: Option<&str>) -> Result<TimeSeriesTable> {
    let fail = |e: rusqlite::Error| W2Error::export(path, e);
    let series = match series {
        Some(name) => name.to_string(),
        None => {
            let mut names = list_series(path)?;
            if names.len() != 1 {
                return Err(W2Error::export(
                    path,
                    format!("expected one series, found {}: name one explicitly", names.len()),
                ));
            }
            names.remove(0)
        }
    };

    let conn = open_existing(path)?;
    let (reference_year, source) = conn
        .query_row(
            &format!(
                "SELECT reference_year, source FROM {SERIES_METADATA_TABLE} WHERE series = ?1"
            ),
            [&series],
            |row| Ok((row.get::<_, i32>(0)?, row.get::<_, Option<String>>(1)?)),
        )
        .optional()
        .map_err(fail)?
        .ok_or_else(|| W2Error::export(path, format!("series '{series}' not found")))?;

    let mut stmt = conn
        .prepare(&format!(
            "SELECT column_name, sql_column, unit, multiplier, min_value, max_value, plot_flag,
                    section, sequence_index, format_code
             FROM {COLUMN_METADATA_TABLE} WHERE series = ?1 ORDER BY position"
        ))
        .map_err(fail)?;
    let described = stmt
        .query_map([&series], |row| {
            let format_code: Option<String> = row.get(9)?;
            let metadata = ColumnMetadata {
                unit: row.get(2)?,
                multiplier: row.get(3)?,
                min: row.get(4)?,
                max: row.get(5)?,
                plot_flag: row.get(6)?,
                section: row.get(7)?,
                sequence_index: row.get(8)?,
                format_code: format_code.as_deref().and_then(FormatCode::parse),
            };
            Ok((row.get::<_, String>(0)?, row.get::<_, String>(1)?, metadata))
        })
        .map_err(fail)?
        .collect::<rusqlite::Result<Vec<_>>>()
        .map_err(fail)?;

    let mut selected = vec![quote(DATE_COLUMN)];
    selected.extend(described.iter().map(|(_, sql_name, _)| quote(sql_name)));
    let mut stmt = conn
        .prepare(&format!(
            "SELECT {} FROM {} ORDER BY {}",
            selected.join(", "),
            quote(&series),
            quote(ROW_ID_COLUMN)
        ))
        .map_err(fail)?;

    let mut index = Vec::new();
    let mut values: Vec<Vec<Option<f64>>> = vec![Vec::new(); described.len()];
    let mut rows = stmt.query([]).map_err(fail)?;
    while let Some(row) = rows.next().map_err(fail)? {
        let text: String = row.get(0).map_err(fail)?;
        let timestamp = NaiveDateTime::parse_from_str(&text, RELATIONAL_TIMESTAMP_FORMAT)
            .map_err(|e| W2Error::export(path, format!("bad timestamp {text:?}: {e}")))?;
        index.push(timestamp);
        for (i, column) in values.iter_mut().enumerate() {
            column.push(row.get(i + 1).map_err(fail)?);
        }
    }

    let columns = described
        .into_iter()
        .zip(values)
        .map(|((name, _, metadata), values)| TableColumn::new(name, values, metadata))
        .collect();
    let table = TimeSeriesTable::new(series, reference_year, index, columns)?;
    Ok(match source {
        Some(source) => table.with_source(source),
        None => table,
    })
}

fn open_existing(path: &Path) -> Result<Connection> {
    if !path.exists() {
        return Err(W2Error::FileNotFound {
            path: path.to_path_buf(),
        });
    }
    Connection::open(path).map_err(|e| W2Error::export(path, e))
}
