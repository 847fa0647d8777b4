//! Table CSV codec.
//!
//! Layout: header `Date,<column>,...`, one row per date in index order, dates
//! as `YYYY-MM-DD`. Values use the shortest `f64` representation that parses
//! back to the same bits; a missing value is an empty field. Non-finite
//! values (`NaN`, `inf`) read back as missing.

use crate::adapters::csv_adapter::{malformed, parse_date};
use crate::domain::derived::correlation::CorrelationMatrix;
use crate::domain::error::StockError;
use crate::domain::ohlcv::normalize_header;
use crate::domain::table::{Column, Table};
use chrono::NaiveDate;
use std::collections::HashSet;
use std::fs;
use std::io::{Read, Write};
use std::path::Path;

pub const DATE_HEADER: &str = "Date";

pub fn write_table(path: &Path, table: &Table) -> Result<(), StockError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let file = fs::File::create(path)?;
    to_writer(file, table).map_err(|e| match e {
        StockError::MalformedFile { reason, .. } => malformed(path, reason),
        other => other,
    })
}

pub fn read_table(path: &Path) -> Result<Table, StockError> {
    let file = fs::File::open(path)?;
    from_reader(file).map_err(|e| match e {
        StockError::MalformedFile { reason, .. } => malformed(path, reason),
        other => other,
    })
}

pub fn to_writer<W: Write>(writer: W, table: &Table) -> Result<(), StockError> {
    let mut wtr = csv::Writer::from_writer(writer);
    let csv_err = |e: csv::Error| csv_error("<writer>", e);

    let mut header = Vec::with_capacity(table.columns().len() + 1);
    header.push(DATE_HEADER);
    header.extend(table.column_names());
    wtr.write_record(&header).map_err(csv_err)?;

    let mut row = Vec::with_capacity(header.len());
    for (i, date) in table.dates().iter().enumerate() {
        row.clear();
        row.push(date.format("%Y-%m-%d").to_string());
        for column in table.columns() {
            row.push(match column.values[i] {
                Some(v) => v.to_string(),
                None => String::new(),
            });
        }
        wtr.write_record(&row).map_err(csv_err)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn from_reader<R: Read>(reader: R) -> Result<Table, StockError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::Fields)
        .from_reader(reader);
    let parse_err = |e: csv::Error| csv_error("<reader>", e);

    let headers = rdr.headers().map_err(parse_err)?.clone();
    match headers.get(0) {
        Some(h) if normalize_header(h) == "date" => {}
        _ => return Err(malformed(Path::new("<reader>"), "first column must be Date")),
    }

    let names: Vec<String> = headers.iter().skip(1).map(str::to_string).collect();
    let mut seen = HashSet::new();
    for name in &names {
        if !seen.insert(name.as_str()) {
            return Err(malformed(
                Path::new("<reader>"),
                format!("duplicate column {:?}", name),
            ));
        }
    }

    let mut rows: Vec<(NaiveDate, Vec<Option<f64>>)> = Vec::new();
    for result in rdr.records() {
        let record = result.map_err(parse_err)?;
        let date_str = record.get(0).unwrap_or("");
        let date = parse_date(date_str).ok_or_else(|| {
            malformed(Path::new("<reader>"), format!("invalid date {:?}", date_str))
        })?;

        let mut values = Vec::with_capacity(names.len());
        for (name, raw) in names.iter().zip(record.iter().skip(1)) {
            if raw.is_empty() {
                values.push(None);
                continue;
            }
            let v = raw.parse::<f64>().map_err(|e| {
                malformed(
                    Path::new("<reader>"),
                    format!("invalid {} value {:?} on {}: {}", name, raw, date, e),
                )
            })?;
            values.push(Some(v).filter(|v| v.is_finite()));
        }
        rows.push((date, values));
    }

    rows.sort_by_key(|(date, _)| *date);
    if let Some(w) = rows.windows(2).find(|w| w[0].0 == w[1].0) {
        return Err(malformed(
            Path::new("<reader>"),
            format!("duplicate date {}", w[0].0),
        ));
    }

    let dates: Vec<NaiveDate> = rows.iter().map(|(date, _)| *date).collect();
    let columns: Vec<Column> = names
        .into_iter()
        .enumerate()
        .map(|(j, name)| Column {
            name,
            values: rows.iter().map(|(_, values)| values[j]).collect(),
        })
        .collect();

    Table::new(dates, columns)
}

/// Square matrix layout: an empty corner cell, then one row per column name.
pub fn write_correlation(path: &Path, matrix: &CorrelationMatrix) -> Result<(), StockError> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut wtr = csv::Writer::from_writer(fs::File::create(path)?);
    let csv_err = |e: csv::Error| csv_error(&path.display().to_string(), e);

    let mut header = vec![String::new()];
    header.extend(matrix.names().iter().cloned());
    wtr.write_record(&header).map_err(csv_err)?;

    for (name, row) in matrix.rows() {
        let mut record = Vec::with_capacity(row.len() + 1);
        record.push(name.to_string());
        record.extend(row.iter().map(|v| v.map(|v| v.to_string()).unwrap_or_default()));
        wtr.write_record(&record).map_err(csv_err)?;
    }
    wtr.flush()?;
    Ok(())
}

fn csv_error(source: &str, e: csv::Error) -> StockError {
    if e.is_io_error() {
        if let csv::ErrorKind::Io(io) = e.into_kind() {
            return StockError::Io(io);
        }
        return malformed(Path::new(source), "CSV I/O error");
    }
    malformed(Path::new(source), format!("CSV parse error: {}", e))
}
