//! Integration tests across acquisition, table assembly, derivation and CSV I/O.
//!
//! Tests cover:
//! - Acquisition through CsvAdapter and MockDataPort, with skipped symbols
//! - Union alignment of symbols with different trading calendars
//! - Derived columns added to and removed from a table
//! - Exact CSV round-trip of an OHLCV table
//! - Correlation of returns across symbols

mod common;

use approx::assert_relative_eq;
use common::*;
use stockseries::adapters::csv_adapter::CsvAdapter;
use stockseries::adapters::table_csv;
use stockseries::domain::analysis::price_table;
use stockseries::domain::derived::rolling::moving_average;
use stockseries::domain::derived::Derived;
use stockseries::domain::error::StockError;
use stockseries::domain::ohlcv::PriceField;
use stockseries::domain::series::TimeSeries;
use stockseries::domain::table::{Column, Table};
use stockseries::domain::universe::acquire;
use tempfile::TempDir;

mod acquisition {
    use super::*;

    #[test]
    fn partial_universe_proceeds() {
        let port = MockDataPort::new()
            .with_bars("AAPL", generate_bars("AAPL", "2024-01-01", 5, 10.0))
            .with_bars("EMPTY", vec![]);
        let symbols = vec!["AAPL".to_string(), "EMPTY".to_string(), "GONE".to_string()];
        let acquired = acquire(&port, &symbols, date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(acquired.data.len(), 1);
        assert_eq!(acquired.skipped, vec!["EMPTY", "GONE"]);
    }

    #[test]
    fn out_of_range_symbol_is_skipped() {
        let port = MockDataPort::new()
            .with_bars("OLD", generate_bars("OLD", "2010-01-01", 5, 10.0))
            .with_bars("NEW", generate_bars("NEW", "2024-01-01", 5, 10.0));
        let symbols = vec!["OLD".to_string(), "NEW".to_string()];
        let acquired = acquire(&port, &symbols, date(2024, 1, 1), date(2024, 1, 31)).unwrap();
        assert_eq!(acquired.skipped, vec!["OLD"]);
        assert_eq!(acquired.data[0].symbol, "NEW");
    }

    #[test]
    fn csv_directory_round_trip() {
        let dir = TempDir::new().unwrap();
        let adapter = CsvAdapter::new(dir.path().to_path_buf());
        let bars = generate_bars("AAPL", "2024-03-01", 20, 150.25);
        adapter.write_bars("AAPL", &bars).unwrap();

        let symbols = vec!["AAPL".to_string()];
        let acquired = acquire(&adapter, &symbols, date(2024, 3, 5), date(2024, 3, 9)).unwrap();
        assert_eq!(acquired.data[0].bars, bars[4..9].to_vec());
    }
}

mod alignment {
    use super::*;

    #[test]
    fn union_of_calendars() {
        let port = MockDataPort::new()
            .with_bars(
                "US",
                vec![
                    make_bar("US", "2024-07-03", 10.0),
                    make_bar("US", "2024-07-05", 11.0),
                ],
            )
            .with_bars(
                "EU",
                vec![
                    make_bar("EU", "2024-07-03", 20.0),
                    make_bar("EU", "2024-07-04", 21.0),
                ],
            );
        let symbols = vec!["US".to_string(), "EU".to_string()];
        let acquired = acquire(&port, &symbols, date(2024, 7, 1), date(2024, 7, 31)).unwrap();
        let table = price_table(&acquired.data, PriceField::Close).unwrap();

        assert_eq!(table.dates(), &[date(2024, 7, 3), date(2024, 7, 4), date(2024, 7, 5)]);
        assert_eq!(table.column("US").unwrap(), &[Some(10.0), None, Some(11.0)]);
        assert_eq!(table.column("EU").unwrap(), &[Some(20.0), Some(21.0), None]);

        let filled = table.forward_fill();
        assert_eq!(filled.column("US").unwrap(), &[Some(10.0), Some(10.0), Some(11.0)]);
        assert_eq!(filled.column("EU").unwrap(), &[Some(20.0), Some(21.0), Some(21.0)]);
    }
}

mod derived_columns {
    use super::*;

    #[test]
    fn moving_average_example() {
        let s = TimeSeries::from_pairs(
            "S",
            (1..=5).map(|d| (date(2024, 1, d), Some(d as f64))),
        )
        .unwrap();
        let ma = moving_average(&s, 3);
        assert_eq!(ma.values(), vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
        assert_eq!(ma.defined_count(), 3);
    }

    #[test]
    fn add_and_remove_derived() {
        let bars = generate_bars("AAPL", "2024-01-01", 30, 100.0);
        let mut table = Table::from_bars(&bars).unwrap();

        let ma = table.add_derived("Close", Derived::MovingAverage(20)).unwrap();
        let ret = table.add_derived("Close", Derived::Returns).unwrap();
        assert_eq!(ma, "Close SMA(20)");
        assert_eq!(ret, "Close RET");

        let ma_values = table.column(&ma).unwrap();
        assert_eq!(ma_values.iter().filter(|v| v.is_some()).count(), 11);
        // closes 100..=119 average to 109.5
        assert_relative_eq!(ma_values[19].unwrap(), 109.5);
        assert_relative_eq!(table.column(&ret).unwrap()[1].unwrap(), 101.0 / 100.0 - 1.0);

        table.remove_column(&ma).unwrap();
        assert!(table.column(&ma).is_none());
        assert!(matches!(
            table.remove_column(&ma),
            Err(StockError::UnknownColumn(_))
        ));
    }

    #[test]
    fn correlation_of_returns() {
        let up = generate_bars("UP", "2024-01-01", 10, 10.0);
        let mut accel = generate_bars("ACCEL", "2024-01-01", 10, 10.0);
        for (i, bar) in accel.iter_mut().enumerate() {
            bar.close = 100.0 + (i * i) as f64;
        }
        let mut twin = up.clone();
        for bar in &mut twin {
            bar.symbol = "TWIN".into();
            bar.close *= 3.0;
        }

        let series = [
            TimeSeries::from_bars("UP", &up, PriceField::Close).unwrap(),
            TimeSeries::from_bars("TWIN", &twin, PriceField::Close).unwrap(),
            TimeSeries::from_bars("ACCEL", &accel, PriceField::Close).unwrap(),
        ];
        let mut returns = Table::assemble(&series).unwrap();
        for name in ["UP", "TWIN", "ACCEL"] {
            let r = returns.add_derived(name, Derived::Returns).unwrap();
            let values = returns.remove_column(&r).unwrap().values;
            returns.insert_column(name, values).unwrap();
        }

        let corr = returns.correlation();
        assert_relative_eq!(corr.get("UP", "TWIN").unwrap(), 1.0, epsilon = 1e-12);
        assert!(corr.get("UP", "ACCEL").unwrap() < 0.0);
        assert_eq!(corr.get("ACCEL", "ACCEL"), Some(1.0));
        assert_eq!(corr.get("UP", "ACCEL"), corr.get("ACCEL", "UP"));
    }
}

mod csv_round_trip {
    use super::*;

    #[test]
    fn ohlcv_five_rows_exact() {
        let dates: Vec<_> = (2..=6).map(|d| date(2024, 9, d)).collect();
        let column = |name: &str, values: [f64; 5]| Column {
            name: name.to_string(),
            values: values.iter().map(|&v| Some(v)).collect(),
        };
        let table = Table::new(
            dates,
            vec![
                column("Open", [187.15, 184.22, 182.15, 181.99, 182.09]),
                column("High", [188.44, 185.88, 183.09, 182.76, 182.76]),
                column("Low", [183.89, 183.43, 180.88, 180.17, 180.17]),
                column("Close", [185.64, 184.25, 181.91, 181.18, 181.18]),
                column("Volume", [82488700.0, 58414500.0, 71983600.0, 62303300.0, 1.0 / 3.0]),
            ],
        )
        .unwrap();

        let dir = TempDir::new().unwrap();
        let path = dir.path().join("ohlcv.csv");
        table_csv::write_table(&path, &table).unwrap();
        let back = table_csv::read_table(&path).unwrap();

        assert_eq!(back.dates(), table.dates());
        assert_eq!(back.column_names(), vec!["Open", "High", "Low", "Close", "Volume"]);
        for (a, b) in back.columns().iter().zip(table.columns()) {
            let bits = |c: &Column| c.values.iter().map(|v| v.map(f64::to_bits)).collect::<Vec<_>>();
            assert_eq!(bits(a), bits(b));
        }
    }

    #[test]
    fn missing_values_survive() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("gaps.csv");
        let table = Table::new(
            vec![date(2024, 1, 1), date(2024, 1, 2), date(2024, 1, 3)],
            vec![Column {
                name: "X".into(),
                values: vec![None, Some(1.0), None],
            }],
        )
        .unwrap();
        table_csv::write_table(&path, &table).unwrap();
        assert_eq!(table_csv::read_table(&path).unwrap(), table);
    }
}
