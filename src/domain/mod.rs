//! Core domain types and logic.

pub mod ohlcv;
pub mod series;
pub mod table;
pub mod derived;
pub mod analysis;
pub mod universe;
pub mod config_validation;
pub mod error;
