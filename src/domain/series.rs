//! Dated observation series.
//!
//! A [`TimeSeries`] is a named sequence of [`Observation`]s whose dates are
//! strictly increasing. A missing observation is stored as `None` rather than
//! dropped, so derived series keep the same date index as their source.

use crate::domain::error::StockError;
use crate::domain::ohlcv::{OhlcvBar, PriceField};
use chrono::NaiveDate;

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Observation {
    pub date: NaiveDate,
    pub value: Option<f64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct TimeSeries {
    name: String,
    points: Vec<Observation>,
}

impl TimeSeries {
    /// Build from pairs in any order. Rejects duplicate dates.
    pub fn from_pairs<I>(name: impl Into<String>, pairs: I) -> Result<Self, StockError>
    where
        I: IntoIterator<Item = (NaiveDate, Option<f64>)>,
    {
        let name = name.into();
        let mut points: Vec<Observation> = pairs
            .into_iter()
            .map(|(date, value)| Observation { date, value })
            .collect();
        points.sort_by_key(|p| p.date);

        if let Some(dup) = points.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(StockError::DuplicateDate {
                name,
                date: dup[0].date,
            });
        }

        Ok(Self { name, points })
    }

    /// Build from dates and values that are already aligned and ordered.
    pub(crate) fn from_aligned(name: String, dates: &[NaiveDate], values: Vec<Option<f64>>) -> Self {
        let points = dates
            .iter()
            .zip(values)
            .map(|(&date, value)| Observation { date, value })
            .collect();
        Self { name, points }
    }

    /// One observation per bar, taking the given field.
    pub fn from_bars(
        name: impl Into<String>,
        bars: &[OhlcvBar],
        field: PriceField,
    ) -> Result<Self, StockError> {
        Self::from_pairs(name, bars.iter().map(|b| (b.date, Some(b.field(field)))))
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn points(&self) -> &[Observation] {
        &self.points
    }

    pub fn len(&self) -> usize {
        self.points.len()
    }

    pub fn is_empty(&self) -> bool {
        self.points.is_empty()
    }

    pub fn dates(&self) -> impl Iterator<Item = NaiveDate> + '_ {
        self.points.iter().map(|p| p.date)
    }

    pub fn values(&self) -> Vec<Option<f64>> {
        self.points.iter().map(|p| p.value).collect()
    }

    pub fn get(&self, date: NaiveDate) -> Option<f64> {
        self.points
            .binary_search_by_key(&date, |p| p.date)
            .ok()
            .and_then(|i| self.points[i].value)
    }

    /// Number of observations that carry a value.
    pub fn defined_count(&self) -> usize {
        self.points.iter().filter(|p| p.value.is_some()).count()
    }

    /// Same dates, values replaced. `values` must have one entry per observation.
    pub(crate) fn with_values(&self, name: String, values: Vec<Option<f64>>) -> Self {
        debug_assert_eq!(values.len(), self.points.len());
        let points = self
            .points
            .iter()
            .zip(values)
            .map(|(p, value)| Observation {
                date: p.date,
                value,
            })
            .collect();
        Self { name, points }
    }
}
