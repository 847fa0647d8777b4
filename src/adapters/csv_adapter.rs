//! CSV file data adapter.
//!
//! One file per symbol, `<base>/<SYMBOL>.csv`, with a header row. Header names
//! are matched ignoring case, spaces and underscores. `Adj Close` is optional
//! and defaults to `Close`.

use crate::adapters::table_csv;
use crate::domain::error::StockError;
use crate::domain::ohlcv::{normalize_header, OhlcvBar, PriceField};
use crate::domain::table::Table;
use crate::ports::data_port::DataPort;
use chrono::{NaiveDate, NaiveDateTime};
use log::debug;
use std::fs;
use std::io;
use std::path::{Path, PathBuf};

pub struct CsvAdapter {
    base_path: PathBuf,
}

impl CsvAdapter {
    pub fn new(base_path: PathBuf) -> Self {
        Self { base_path }
    }

    pub fn csv_path(&self, symbol: &str) -> PathBuf {
        self.base_path.join(format!("{}.csv", symbol))
    }

    /// Write bars in the layout `fetch_ohlcv` reads back.
    pub fn write_bars(&self, symbol: &str, bars: &[OhlcvBar]) -> Result<PathBuf, StockError> {
        fs::create_dir_all(&self.base_path)?;
        let path = self.csv_path(symbol);
        table_csv::write_table(&path, &Table::from_bars(bars)?)?;
        Ok(path)
    }
}

/// Column positions of the OHLCV fields in a header row.
struct HeaderIndex {
    date: usize,
    open: usize,
    high: usize,
    low: usize,
    close: usize,
    adj_close: Option<usize>,
    volume: usize,
}

impl HeaderIndex {
    fn from_headers(headers: &csv::StringRecord, path: &Path) -> Result<Self, StockError> {
        let find = |wanted: &str| {
            headers
                .iter()
                .position(|h| normalize_header(h) == wanted)
        };
        let require = |wanted: &str| {
            find(wanted).ok_or_else(|| malformed(path, format!("missing {} column", wanted)))
        };

        Ok(Self {
            date: require("date")?,
            open: require("open")?,
            high: require("high")?,
            low: require("low")?,
            close: require("close")?,
            adj_close: find("adjclose"),
            volume: require("volume")?,
        })
    }
}

pub(crate) fn malformed(path: &Path, reason: impl Into<String>) -> StockError {
    StockError::MalformedFile {
        path: path.display().to_string(),
        reason: reason.into(),
    }
}

/// Parse `YYYY-MM-DD`, also accepting a trailing time (`YYYY-MM-DD HH:MM:SS`
/// or `YYYY-MM-DDTHH:MM:SS`).
pub(crate) fn parse_date(value: &str) -> Option<NaiveDate> {
    let value = value.trim();
    NaiveDate::parse_from_str(value, "%Y-%m-%d")
        .ok()
        .or_else(|| {
            NaiveDateTime::parse_from_str(value, "%Y-%m-%d %H:%M:%S")
                .or_else(|_| NaiveDateTime::parse_from_str(value, "%Y-%m-%dT%H:%M:%S"))
                .ok()
                .map(|dt| dt.date())
        })
}

/// `None` for an empty, `null` or non-finite field.
fn parse_field(
    record: &csv::StringRecord,
    index: usize,
    field: PriceField,
    path: &Path,
) -> Result<Option<f64>, StockError> {
    let raw = record.get(index).unwrap_or("").trim();
    if raw.is_empty() || raw.eq_ignore_ascii_case("null") {
        return Ok(None);
    }
    let value = raw.parse::<f64>().map_err(|e| {
        malformed(
            path,
            format!("invalid {} value {:?}: {}", field.column_name(), raw, e),
        )
    })?;
    Ok(Some(value).filter(|v| v.is_finite()))
}

impl DataPort for CsvAdapter {
    fn fetch_ohlcv(
        &self,
        symbol: &str,
        start_date: NaiveDate,
        end_date: NaiveDate,
    ) -> Result<Vec<OhlcvBar>, StockError> {
        let path = self.csv_path(symbol);
        let content = match fs::read_to_string(&path) {
            Ok(c) => c,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(StockError::DataUnavailable {
                    symbol: symbol.to_string(),
                });
            }
            Err(e) => return Err(e.into()),
        };

        let mut rdr = csv::ReaderBuilder::new()
            .trim(csv::Trim::All)
            .from_reader(content.as_bytes());
        let headers = rdr
            .headers()
            .map_err(|e| malformed(&path, format!("CSV parse error: {}", e)))?
            .clone();
        let index = HeaderIndex::from_headers(&headers, &path)?;

        let mut bars = Vec::new();
        for result in rdr.records() {
            let record = result.map_err(|e| malformed(&path, format!("CSV parse error: {}", e)))?;

            let date_str = record.get(index.date).unwrap_or("");
            let date = parse_date(date_str)
                .ok_or_else(|| malformed(&path, format!("invalid date {:?}", date_str)))?;

            if date < start_date || date > end_date {
                continue;
            }

            let open = parse_field(&record, index.open, PriceField::Open, &path)?;
            let high = parse_field(&record, index.high, PriceField::High, &path)?;
            let low = parse_field(&record, index.low, PriceField::Low, &path)?;
            let close = parse_field(&record, index.close, PriceField::Close, &path)?;
            let volume = parse_field(&record, index.volume, PriceField::Volume, &path)?;
            let adj_close = match index.adj_close {
                Some(i) => parse_field(&record, i, PriceField::AdjClose, &path)?,
                None => close,
            };

            let (Some(open), Some(high), Some(low), Some(close), Some(adj_close), Some(volume)) =
                (open, high, low, close, adj_close, volume)
            else {
                debug!("{}: skipping incomplete row for {}", path.display(), date);
                continue;
            };

            bars.push(OhlcvBar {
                symbol: symbol.to_string(),
                date,
                open,
                high,
                low,
                close,
                adj_close,
                volume,
            });
        }

        bars.sort_by_key(|b| b.date);
        if let Some(w) = bars.windows(2).find(|w| w[0].date == w[1].date) {
            return Err(malformed(&path, format!("duplicate date {}", w[0].date)));
        }
        if bars.is_empty() {
            return Err(StockError::DataUnavailable {
                symbol: symbol.to_string(),
            });
        }

        debug!("{}: {} bars", path.display(), bars.len());
        Ok(bars)
    }

    fn list_symbols(&self) -> Result<Vec<String>, StockError> {
        let entries = fs::read_dir(&self.base_path)?;

        let mut symbols = Vec::new();
        for entry in entries {
            let entry = entry?;
            let name = entry.file_name();
            let name_str = name.to_string_lossy();

            if let Some(symbol) = name_str.strip_suffix(".csv") {
                symbols.push(symbol.to_string());
            }
        }

        symbols.sort();
        Ok(symbols)
    }
}
