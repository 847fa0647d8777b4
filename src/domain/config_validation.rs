//! Configuration validation.
//!
//! Validates all config fields before any data is acquired.

use crate::domain::error::StockError;
use crate::domain::ohlcv::PriceField;
use crate::domain::universe::parse_symbols;
use crate::ports::config_port::ConfigPort;
use chrono::NaiveDate;

pub const SOURCES: [&str; 2] = ["csv", "yahoo"];

pub fn validate_data_config(config: &dyn ConfigPort) -> Result<(), StockError> {
    validate_source(config)?;
    validate_symbols(config)?;
    validate_dates(config)?;
    validate_price_field(config)?;
    Ok(())
}

pub fn validate_analysis_config(config: &dyn ConfigPort) -> Result<(), StockError> {
    validate_window(config)?;
    Ok(())
}

fn invalid(section: &str, key: &str, reason: impl Into<String>) -> StockError {
    StockError::ConfigInvalid {
        section: section.to_string(),
        key: key.to_string(),
        reason: reason.into(),
    }
}

fn validate_source(config: &dyn ConfigPort) -> Result<(), StockError> {
    let source = config
        .get_string("data", "source")
        .unwrap_or_else(|| "csv".to_string())
        .to_lowercase();
    if !SOURCES.contains(&source.as_str()) {
        return Err(invalid(
            "data",
            "source",
            format!("source must be one of {}", SOURCES.join(", ")),
        ));
    }
    if source == "csv" {
        config.require_string("data", "csv_dir")?;
    }
    Ok(())
}

fn validate_symbols(config: &dyn ConfigPort) -> Result<(), StockError> {
    let symbols = config.require_string("data", "symbols")?;
    parse_symbols(&symbols)
        .map(|_| ())
        .map_err(|e| invalid("data", "symbols", e.to_string()))
}

fn validate_dates(config: &dyn ConfigPort) -> Result<(), StockError> {
    let start_str = config.get_string("data", "start_date");
    let end_str = config.get_string("data", "end_date");

    let start_date = parse_date(start_str.as_deref(), "start_date")?;
    let end_date = parse_date(end_str.as_deref(), "end_date")?;

    if start_date > end_date {
        return Err(invalid(
            "data",
            "start_date",
            "start_date must not be after end_date",
        ));
    }
    Ok(())
}

pub fn parse_date(value: Option<&str>, field: &str) -> Result<NaiveDate, StockError> {
    match value {
        None => Err(StockError::ConfigMissing {
            section: "data".to_string(),
            key: field.to_string(),
        }),
        Some(s) => NaiveDate::parse_from_str(s.trim(), "%Y-%m-%d").map_err(|_| {
            invalid(
                "data",
                field,
                format!("invalid {} format, expected YYYY-MM-DD", field),
            )
        }),
    }
}

fn validate_price_field(config: &dyn ConfigPort) -> Result<(), StockError> {
    if let Some(value) = config.get_string("data", "price_field") {
        if PriceField::parse(&value).is_none() {
            return Err(invalid(
                "data",
                "price_field",
                "price_field must be one of open, high, low, close, adj_close, volume",
            ));
        }
    }
    Ok(())
}

fn validate_window(config: &dyn ConfigPort) -> Result<(), StockError> {
    let value = config.get_int("analysis", "window", 20);
    if value < 1 {
        return Err(invalid("analysis", "window", "window must be at least 1"));
    }
    Ok(())
}
