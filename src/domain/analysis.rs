//! Price analysis pipeline: assemble a price table from acquired bars, fill
//! gaps, derive moving averages and returns, correlate returns.

use crate::domain::derived::correlation::CorrelationMatrix;
use crate::domain::derived::returns::returns_values;
use crate::domain::derived::Derived;
use crate::domain::error::StockError;
use crate::domain::ohlcv::PriceField;
use crate::domain::series::TimeSeries;
use crate::domain::table::{Column, ColumnSummary, Table};
use crate::domain::universe::SymbolData;
use chrono::NaiveDate;
use log::{debug, warn};

#[derive(Debug, Clone)]
pub struct AnalysisConfig {
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub price_field: PriceField,
    pub window: usize,
    pub forward_fill: bool,
    pub strict_history: bool,
}

#[derive(Debug, Clone)]
pub struct Analysis {
    /// One column per symbol.
    pub prices: Table,
    /// Prices plus `<SYMBOL> SMA(n)`, `STD(n)`, `RET` and `CUMRET` columns.
    pub derived: Table,
    /// One returns column per symbol, named after the symbol.
    pub returns: Table,
    pub correlation: CorrelationMatrix,
    pub price_summary: Vec<ColumnSummary>,
    pub returns_summary: Vec<ColumnSummary>,
}

/// Align one price field of every symbol on the union of their dates.
pub fn price_table(data: &[SymbolData], field: PriceField) -> Result<Table, StockError> {
    let series = data
        .iter()
        .map(|sd| TimeSeries::from_bars(sd.symbol.as_str(), &sd.bars, field))
        .collect::<Result<Vec<_>, _>>()?;
    Table::assemble(&series)
}

pub fn run_analysis(data: &[SymbolData], config: &AnalysisConfig) -> Result<Analysis, StockError> {
    let mut prices = price_table(data, config.price_field)?.between(config.start_date, config.end_date);
    debug!(
        "price table: {} rows x {} columns",
        prices.len(),
        prices.columns().len()
    );

    if config.forward_fill {
        prices = prices.forward_fill();
    }

    let symbols: Vec<String> = prices.column_names().iter().map(|s| s.to_string()).collect();

    for symbol in &symbols {
        let observations = prices.series(symbol)?.defined_count();
        if observations < config.window {
            let err = StockError::InsufficientHistory {
                column: symbol.clone(),
                observations,
                window: config.window,
            };
            if config.strict_history {
                return Err(err);
            }
            warn!("{err}; moving average will be undefined");
        }
    }

    let mut derived = prices.clone();
    let mut return_columns = Vec::with_capacity(symbols.len());
    for symbol in &symbols {
        for kind in [
            Derived::MovingAverage(config.window),
            Derived::RollingStd(config.window),
            Derived::Returns,
            Derived::CumulativeReturns,
        ] {
            derived.add_derived(symbol, kind)?;
        }

        let values = prices
            .column(symbol)
            .ok_or_else(|| StockError::UnknownColumn(symbol.clone()))?;
        return_columns.push(Column {
            name: symbol.clone(),
            values: returns_values(values),
        });
    }

    let returns = Table::new(prices.dates().to_vec(), return_columns)?;
    let correlation = returns.correlation();

    Ok(Analysis {
        price_summary: prices.describe(),
        returns_summary: returns.describe(),
        prices,
        derived,
        returns,
        correlation,
    })
}
