//! Domain error types.

use chrono::NaiveDate;

/// Top-level error type for stockseries.
#[derive(Debug, thiserror::Error)]
pub enum StockError {
    #[error("no data available for {symbol}")]
    DataUnavailable { symbol: String },

    #[error("malformed file {path}: {reason}")]
    MalformedFile { path: String, reason: String },

    #[error("insufficient history for {column}: have {observations} observations, window is {window}")]
    InsufficientHistory {
        column: String,
        observations: usize,
        window: usize,
    },

    #[error("data provider error: {reason}")]
    Provider { reason: String },

    #[error("config parse error in {file}: {reason}")]
    ConfigParse { file: String, reason: String },

    #[error("missing config key [{section}] {key}")]
    ConfigMissing { section: String, key: String },

    #[error("invalid config value [{section}] {key}: {reason}")]
    ConfigInvalid {
        section: String,
        key: String,
        reason: String,
    },

    #[error("duplicate date {date} in {name}")]
    DuplicateDate { name: String, date: NaiveDate },

    #[error("duplicate column: {0}")]
    DuplicateColumn(String),

    #[error("unknown column: {0}")]
    UnknownColumn(String),

    #[error("column {name} has {actual} values, table has {expected} rows")]
    LengthMismatch {
        name: String,
        expected: usize,
        actual: usize,
    },

    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<&StockError> for std::process::ExitCode {
    fn from(err: &StockError) -> Self {
        let code: u8 = match err {
            StockError::Io(_) => 1,
            StockError::ConfigParse { .. }
            | StockError::ConfigMissing { .. }
            | StockError::ConfigInvalid { .. } => 2,
            StockError::Provider { .. } => 3,
            StockError::MalformedFile { .. } => 4,
            StockError::DataUnavailable { .. } | StockError::InsufficientHistory { .. } => 5,
            StockError::DuplicateDate { .. }
            | StockError::DuplicateColumn(_)
            | StockError::UnknownColumn(_)
            | StockError::LengthMismatch { .. } => 6,
        };
        std::process::ExitCode::from(code)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_data_unavailable() {
        let err = StockError::DataUnavailable {
            symbol: "AAPL".into(),
        };
        assert_eq!(err.to_string(), "no data available for AAPL");
    }

    #[test]
    fn display_insufficient_history() {
        let err = StockError::InsufficientHistory {
            column: "AAPL".into(),
            observations: 3,
            window: 20,
        };
        assert_eq!(
            err.to_string(),
            "insufficient history for AAPL: have 3 observations, window is 20"
        );
    }

    #[test]
    fn io_error_converts() {
        let io = std::io::Error::new(std::io::ErrorKind::NotFound, "gone");
        let err: StockError = io.into();
        assert!(matches!(err, StockError::Io(_)));
    }
}
