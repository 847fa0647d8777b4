//! Symbol universe: parses symbol lists from configuration and acquires bars
//! for each symbol through a [`DataPort`].

use crate::domain::error::StockError;
use crate::domain::ohlcv::OhlcvBar;
use crate::ports::data_port::DataPort;
use chrono::NaiveDate;
use log::{info, warn};
use std::collections::HashSet;

#[derive(Debug, Clone, thiserror::Error)]
pub enum UniverseError {
    #[error("empty token in symbol list")]
    EmptyToken,

    #[error("duplicate symbol: {0}")]
    DuplicateSymbol(String),

    #[error("invalid symbol {0:?}: symbols name files and may not contain path separators or '..'")]
    InvalidSymbol(String),
}

/// Trim and uppercase one symbol. Symbols become file names
/// (`<SYMBOL>.csv`, `<SYMBOL>_sma.svg`), so path components are rejected.
pub fn normalize_symbol(token: &str) -> Result<String, UniverseError> {
    let trimmed = token.trim();
    if trimmed.is_empty() {
        return Err(UniverseError::EmptyToken);
    }
    if trimmed.contains(['/', '\\']) || trimmed.contains("..") {
        return Err(UniverseError::InvalidSymbol(trimmed.to_string()));
    }
    Ok(trimmed.to_uppercase())
}

pub fn parse_symbols(input: &str) -> Result<Vec<String>, UniverseError> {
    let mut symbols = Vec::new();
    let mut seen = HashSet::new();

    for token in input.split(',') {
        let symbol = normalize_symbol(token)?;
        if !seen.insert(symbol.clone()) {
            return Err(UniverseError::DuplicateSymbol(symbol));
        }
        symbols.push(symbol);
    }

    Ok(symbols)
}

/// Bars for one symbol.
#[derive(Debug, Clone)]
pub struct SymbolData {
    pub symbol: String,
    pub bars: Vec<OhlcvBar>,
}

#[derive(Debug, Clone)]
pub struct Acquired {
    pub data: Vec<SymbolData>,
    pub skipped: Vec<String>,
}

/// Fetch bars for every symbol, in order. Symbols with no data in the range
/// are skipped; any other failure is returned to the caller. Fails with
/// `DataUnavailable` when no symbol has data.
pub fn acquire(
    data_port: &dyn DataPort,
    symbols: &[String],
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Acquired, StockError> {
    let mut data = Vec::with_capacity(symbols.len());
    let mut skipped = Vec::new();

    for symbol in symbols {
        match data_port.fetch_ohlcv(symbol, start_date, end_date) {
            Ok(bars) if bars.is_empty() => {
                warn!("skipping {} (no data between {} and {})", symbol, start_date, end_date);
                skipped.push(symbol.clone());
            }
            Ok(bars) => {
                info!("  {}: {} bars", symbol, bars.len());
                data.push(SymbolData {
                    symbol: symbol.clone(),
                    bars,
                });
            }
            Err(StockError::DataUnavailable { .. }) => {
                warn!("skipping {} (no data between {} and {})", symbol, start_date, end_date);
                skipped.push(symbol.clone());
            }
            Err(e) => return Err(e),
        }
    }

    if data.is_empty() {
        return Err(StockError::DataUnavailable {
            symbol: symbols.join(","),
        });
    }

    if !skipped.is_empty() {
        info!(
            "acquired {} of {} symbols",
            data.len(),
            data.len() + skipped.len()
        );
    }

    Ok(Acquired { data, skipped })
}
