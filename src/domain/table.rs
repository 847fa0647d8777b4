//! Date-indexed table of aligned columns.
//!
//! All columns share one sorted, de-duplicated date index. A column lacking a
//! value on a date stores `None` for that row instead of omitting it.

use crate::domain::derived::correlation::CorrelationMatrix;
use crate::domain::derived::fill::forward_fill_values;
use crate::domain::derived::Derived;
use crate::domain::error::StockError;
use crate::domain::ohlcv::{OhlcvBar, PriceField};
use crate::domain::series::TimeSeries;
use chrono::NaiveDate;
use std::collections::{BTreeSet, HashMap, HashSet};

#[derive(Debug, Clone, PartialEq)]
pub struct Column {
    pub name: String,
    pub values: Vec<Option<f64>>,
}

#[derive(Debug, Clone, PartialEq, Default)]
pub struct Table {
    dates: Vec<NaiveDate>,
    columns: Vec<Column>,
}

/// Summary statistics over the defined values of one column.
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnSummary {
    pub name: String,
    pub count: usize,
    pub mean: Option<f64>,
    pub std: Option<f64>,
    pub min: Option<f64>,
    pub max: Option<f64>,
}

impl Table {
    /// Build a table from a date index and columns. Dates must be strictly
    /// increasing and every column must have one value per date.
    pub fn new(dates: Vec<NaiveDate>, columns: Vec<Column>) -> Result<Self, StockError> {
        if let Some(w) = dates.windows(2).find(|w| w[0] >= w[1]) {
            return Err(StockError::DuplicateDate {
                name: "table index".into(),
                date: w[1],
            });
        }

        let mut seen = HashSet::new();
        for column in &columns {
            if !seen.insert(column.name.as_str()) {
                return Err(StockError::DuplicateColumn(column.name.clone()));
            }
            if column.values.len() != dates.len() {
                return Err(StockError::LengthMismatch {
                    name: column.name.clone(),
                    expected: dates.len(),
                    actual: column.values.len(),
                });
            }
        }

        Ok(Self { dates, columns })
    }

    /// Align several series on the sorted union of their dates.
    /// Column order follows input order.
    pub fn assemble(series: &[TimeSeries]) -> Result<Self, StockError> {
        let dates: Vec<NaiveDate> = series
            .iter()
            .flat_map(|s| s.dates())
            .collect::<BTreeSet<_>>()
            .into_iter()
            .collect();

        let mut table = Table {
            dates,
            columns: Vec::with_capacity(series.len()),
        };
        for s in series {
            if table.column(s.name()).is_some() {
                return Err(StockError::DuplicateColumn(s.name().to_string()));
            }
            table.insert_series(s);
        }
        Ok(table)
    }

    /// One column per OHLCV field, indexed by bar date.
    pub fn from_bars(bars: &[OhlcvBar]) -> Result<Self, StockError> {
        let series = PriceField::ALL
            .iter()
            .map(|&field| TimeSeries::from_bars(field.column_name(), bars, field))
            .collect::<Result<Vec<_>, _>>()?;
        Self::assemble(&series)
    }

    pub fn dates(&self) -> &[NaiveDate] {
        &self.dates
    }

    pub fn columns(&self) -> &[Column] {
        &self.columns
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    /// Number of rows.
    pub fn len(&self) -> usize {
        self.dates.len()
    }

    pub fn is_empty(&self) -> bool {
        self.dates.is_empty()
    }

    pub fn column(&self, name: &str) -> Option<&[Option<f64>]> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.values.as_slice())
    }

    pub fn series(&self, name: &str) -> Result<TimeSeries, StockError> {
        let values = self
            .column(name)
            .ok_or_else(|| StockError::UnknownColumn(name.to_string()))?;
        Ok(TimeSeries::from_aligned(
            name.to_string(),
            &self.dates,
            values.to_vec(),
        ))
    }

    /// Insert or replace a column. `values` must have one entry per row.
    pub fn insert_column(
        &mut self,
        name: impl Into<String>,
        values: Vec<Option<f64>>,
    ) -> Result<(), StockError> {
        let name = name.into();
        if values.len() != self.dates.len() {
            return Err(StockError::LengthMismatch {
                name,
                expected: self.dates.len(),
                actual: values.len(),
            });
        }
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column { name, values }),
        }
        Ok(())
    }

    /// Insert or replace a column from a series, aligned on this table's index.
    /// Series dates outside the index are ignored.
    pub fn insert_series(&mut self, series: &TimeSeries) {
        let lookup: HashMap<NaiveDate, Option<f64>> =
            series.points().iter().map(|p| (p.date, p.value)).collect();
        let values = self
            .dates
            .iter()
            .map(|d| lookup.get(d).copied().flatten())
            .collect();
        let name = series.name().to_string();
        match self.columns.iter_mut().find(|c| c.name == name) {
            Some(existing) => existing.values = values,
            None => self.columns.push(Column { name, values }),
        }
    }

    /// Compute a derived series from `source` and add it as a column.
    /// Returns the new column name.
    pub fn add_derived(&mut self, source: &str, derived: Derived) -> Result<String, StockError> {
        let out = derived.compute(&self.series(source)?);
        let name = out.name().to_string();
        self.insert_series(&out);
        Ok(name)
    }

    pub fn remove_column(&mut self, name: &str) -> Result<Column, StockError> {
        let index = self
            .columns
            .iter()
            .position(|c| c.name == name)
            .ok_or_else(|| StockError::UnknownColumn(name.to_string()))?;
        Ok(self.columns.remove(index))
    }

    /// New table with only the named columns, in the given order.
    pub fn select(&self, names: &[&str]) -> Result<Table, StockError> {
        let mut columns = Vec::with_capacity(names.len());
        for &name in names {
            let values = self
                .column(name)
                .ok_or_else(|| StockError::UnknownColumn(name.to_string()))?;
            columns.push(Column {
                name: name.to_string(),
                values: values.to_vec(),
            });
        }
        Table::new(self.dates.clone(), columns)
    }

    /// Rows with `start <= date <= end`.
    pub fn between(&self, start: NaiveDate, end: NaiveDate) -> Table {
        let from = self.dates.partition_point(|d| *d < start);
        let to = self.dates.partition_point(|d| *d <= end).max(from);
        Table {
            dates: self.dates[from..to].to_vec(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: c.values[from..to].to_vec(),
                })
                .collect(),
        }
    }

    /// Drop every row in which any column is missing.
    pub fn drop_missing(&self) -> Table {
        let keep: Vec<usize> = (0..self.dates.len())
            .filter(|&i| self.columns.iter().all(|c| c.values[i].is_some()))
            .collect();
        Table {
            dates: keep.iter().map(|&i| self.dates[i]).collect(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: keep.iter().map(|&i| c.values[i]).collect(),
                })
                .collect(),
        }
    }

    pub fn forward_fill(&self) -> Table {
        Table {
            dates: self.dates.clone(),
            columns: self
                .columns
                .iter()
                .map(|c| Column {
                    name: c.name.clone(),
                    values: forward_fill_values(&c.values),
                })
                .collect(),
        }
    }

    pub fn correlation(&self) -> CorrelationMatrix {
        let columns: Vec<(&str, &[Option<f64>])> = self
            .columns
            .iter()
            .map(|c| (c.name.as_str(), c.values.as_slice()))
            .collect();
        CorrelationMatrix::compute(&columns)
    }

    pub fn describe(&self) -> Vec<ColumnSummary> {
        self.columns.iter().map(summarize).collect()
    }
}

fn summarize(column: &Column) -> ColumnSummary {
    let defined: Vec<f64> = column.values.iter().flatten().copied().collect();
    let count = defined.len();

    let mean = (count > 0).then(|| defined.iter().sum::<f64>() / count as f64);
    let std = match mean {
        Some(m) if count > 1 => {
            let var = defined.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (count - 1) as f64;
            Some(var.sqrt())
        }
        _ => None,
    };
    let min = defined.iter().copied().reduce(f64::min);
    let max = defined.iter().copied().reduce(f64::max);

    ColumnSummary {
        name: column.name.clone(),
        count,
        mean,
        std,
        min,
        max,
    }
}
