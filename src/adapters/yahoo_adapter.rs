//! Yahoo Finance chart API adapter.
//!
//! The HTTP client needs the `remote` feature. Response parsing is always
//! available so recorded responses can be replayed offline.

use crate::domain::error::StockError;
use crate::domain::ohlcv::OhlcvBar;
use chrono::{DateTime, NaiveDate};
use serde::Deserialize;

pub const DEFAULT_BASE_URL: &str = "https://query1.finance.yahoo.com/v8/finance/chart";

#[derive(Debug, Deserialize)]
struct ChartResponse {
    chart: Chart,
}

#[derive(Debug, Deserialize)]
struct Chart {
    #[serde(default)]
    result: Option<Vec<ChartData>>,
    #[serde(default)]
    error: Option<ChartError>,
}

#[derive(Debug, Deserialize)]
struct ChartError {
    code: String,
    #[serde(default)]
    description: String,
}

#[derive(Debug, Deserialize)]
struct ChartData {
    #[serde(default)]
    timestamp: Vec<i64>,
    indicators: Indicators,
}

#[derive(Debug, Deserialize)]
struct Indicators {
    #[serde(default)]
    quote: Vec<QuoteData>,
    #[serde(default)]
    adjclose: Vec<AdjClose>,
}

#[derive(Debug, Default, Deserialize)]
struct QuoteData {
    #[serde(default)]
    open: Vec<Option<f64>>,
    #[serde(default)]
    high: Vec<Option<f64>>,
    #[serde(default)]
    low: Vec<Option<f64>>,
    #[serde(default)]
    close: Vec<Option<f64>>,
    #[serde(default)]
    volume: Vec<Option<f64>>,
}

#[derive(Debug, Deserialize)]
struct AdjClose {
    #[serde(default)]
    adjclose: Vec<Option<f64>>,
}

fn at(values: &[Option<f64>], i: usize) -> Option<f64> {
    values.get(i).copied().flatten()
}

/// Convert a chart API response body into bars within `[start_date, end_date]`.
///
/// Rows without a full open/high/low/close quote are dropped. A provider
/// error of `Not Found`, or no remaining rows, is `DataUnavailable`.
pub fn parse_chart_response(
    symbol: &str,
    body: &str,
    start_date: NaiveDate,
    end_date: NaiveDate,
) -> Result<Vec<OhlcvBar>, StockError> {
    let unavailable = || StockError::DataUnavailable {
        symbol: symbol.to_string(),
    };

    let response: ChartResponse = serde_json::from_str(body).map_err(|e| StockError::Provider {
        reason: format!("invalid chart response for {}: {}", symbol, e),
    })?;

    if let Some(err) = response.chart.error {
        if err.code.eq_ignore_ascii_case("Not Found") {
            return Err(unavailable());
        }
        return Err(StockError::Provider {
            reason: format!("{}: {}", err.code, err.description),
        });
    }

    let data = response
        .chart
        .result
        .and_then(|r| r.into_iter().next())
        .ok_or_else(unavailable)?;

    let quote = data.indicators.quote.into_iter().next().unwrap_or_default();
    let adj = data
        .indicators
        .adjclose
        .into_iter()
        .next()
        .map(|a| a.adjclose)
        .unwrap_or_default();

    let mut bars = Vec::with_capacity(data.timestamp.len());
    for (i, &ts) in data.timestamp.iter().enumerate() {
        let Some(date) = DateTime::from_timestamp(ts, 0).map(|dt| dt.date_naive()) else {
            continue;
        };
        if date < start_date || date > end_date {
            continue;
        }
        let (Some(open), Some(high), Some(low), Some(close)) = (
            at(&quote.open, i),
            at(&quote.high, i),
            at(&quote.low, i),
            at(&quote.close, i),
        ) else {
            continue;
        };

        bars.push(OhlcvBar {
            symbol: symbol.to_string(),
            date,
            open,
            high,
            low,
            close,
            adj_close: at(&adj, i).unwrap_or(close),
            volume: at(&quote.volume, i).unwrap_or(0.0),
        });
    }

    bars.sort_by_key(|b| b.date);
    bars.dedup_by_key(|b| b.date);

    if bars.is_empty() {
        return Err(unavailable());
    }
    Ok(bars)
}

#[cfg(feature = "remote")]
pub use client::YahooAdapter;

#[cfg(feature = "remote")]
mod client {
    use super::{parse_chart_response, DEFAULT_BASE_URL};
    use crate::domain::error::StockError;
    use crate::domain::ohlcv::OhlcvBar;
    use crate::ports::data_port::DataPort;
    use chrono::{Days, NaiveDate};
    use log::{debug, info};
    use std::time::{Duration, SystemTime, UNIX_EPOCH};

    const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

    pub struct YahooAdapter {
        base_url: String,
        client: reqwest::blocking::Client,
    }

    impl YahooAdapter {
        pub fn new() -> Result<Self, StockError> {
            Self::with_url(DEFAULT_BASE_URL)
        }

        pub fn with_url(base_url: &str) -> Result<Self, StockError> {
            let client = reqwest::blocking::Client::builder()
                .timeout(REQUEST_TIMEOUT)
                .user_agent(concat!("stockseries/", env!("CARGO_PKG_VERSION")))
                .build()
                .map_err(|e| StockError::Provider {
                    reason: format!("failed to build HTTP client: {}", e),
                })?;
            Ok(Self {
                base_url: base_url.trim_end_matches('/').to_string(),
                client,
            })
        }

        fn build_url(&self, symbol: &str, start_date: NaiveDate, end_date: NaiveDate) -> String {
            let period1 = epoch_seconds(start_date);
            // period2 is exclusive
            let period2 = epoch_seconds(end_date.checked_add_days(Days::new(1)).unwrap_or(end_date));
            format!(
                "{}/{}?period1={}&period2={}&interval=1d&events=history&includeAdjustedClose=true",
                self.base_url, symbol, period1, period2
            )
        }
    }

    fn epoch_seconds(date: NaiveDate) -> i64 {
        date.and_hms_opt(0, 0, 0)
            .map(|dt| dt.and_utc().timestamp())
            .unwrap_or(0)
    }

    fn today() -> NaiveDate {
        let secs = SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs() as i64)
            .unwrap_or(0);
        chrono::DateTime::from_timestamp(secs, 0)
            .map(|dt| dt.date_naive())
            .unwrap_or(NaiveDate::MAX)
    }

    impl DataPort for YahooAdapter {
        fn fetch_ohlcv(
            &self,
            symbol: &str,
            start_date: NaiveDate,
            end_date: NaiveDate,
        ) -> Result<Vec<OhlcvBar>, StockError> {
            let epoch = NaiveDate::from_ymd_opt(1970, 1, 1).unwrap_or(NaiveDate::MIN);
            let url = self.build_url(symbol, start_date.max(epoch), end_date.min(today()));
            info!("fetching {} from {}", symbol, self.base_url);
            debug!("GET {}", url);

            let response = self.client.get(&url).send().map_err(|e| StockError::Provider {
                reason: format!("request for {} failed: {}", symbol, e),
            })?;
            let status = response.status();
            let body = response.text().map_err(|e| StockError::Provider {
                reason: format!("reading response for {} failed: {}", symbol, e),
            })?;

            match parse_chart_response(symbol, &body, start_date, end_date) {
                Err(StockError::Provider { .. }) if !status.is_success() => {
                    Err(StockError::Provider {
                        reason: format!("HTTP {} for {}", status, symbol),
                    })
                }
                other => other,
            }
        }

        fn list_symbols(&self) -> Result<Vec<String>, StockError> {
            Err(StockError::Provider {
                reason: "symbol listing is not supported by the chart API".to_string(),
            })
        }
    }

    #[cfg(test)]
    mod tests {
        use super::*;

        #[test]
        fn url_contains_period_bounds() {
            let adapter = YahooAdapter::with_url("https://example.test/chart/").unwrap();
            let url = adapter.build_url(
                "AAPL",
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
                NaiveDate::from_ymd_opt(2024, 1, 1).unwrap(),
            );
            assert_eq!(
                url,
                "https://example.test/chart/AAPL?period1=1704067200&period2=1704153600&interval=1d&events=history&includeAdjustedClose=true"
            );
        }
    }
}
