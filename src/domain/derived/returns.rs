//! Period-over-period returns.
//!
//! RET[i] = P[i] / P[i-1] - 1 for i >= 1; RET[0] is undefined.
//! Undefined when either price is missing or P[i-1] == 0.
//!
//! CUMRET[i] = P[i] / P[first] - 1, where P[first] is the first defined price.

use crate::domain::derived::Derived;
use crate::domain::series::TimeSeries;

pub fn returns(series: &TimeSeries) -> TimeSeries {
    let values = returns_values(&series.values());
    series.with_values(Derived::Returns.column_name(series.name()), values)
}

pub fn returns_values(prices: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut out = Vec::with_capacity(prices.len());
    for i in 0..prices.len() {
        let value = if i == 0 {
            None
        } else {
            match (prices[i - 1], prices[i]) {
                (Some(prev), Some(curr)) if prev != 0.0 => Some(curr / prev - 1.0),
                _ => None,
            }
        };
        out.push(value);
    }
    out
}

pub fn cumulative_returns(series: &TimeSeries) -> TimeSeries {
    let prices = series.values();
    let base = prices.iter().flatten().copied().next();

    let values = match base {
        Some(base) if base != 0.0 => prices.iter().map(|p| p.map(|v| v / base - 1.0)).collect(),
        _ => vec![None; prices.len()],
    };

    series.with_values(Derived::CumulativeReturns.column_name(series.name()), values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use chrono::NaiveDate;

    fn series(values: &[Option<f64>]) -> TimeSeries {
        TimeSeries::from_pairs(
            "TEST",
            values
                .iter()
                .enumerate()
                .map(|(i, &v)| (NaiveDate::from_ymd_opt(2024, 1, (i + 1) as u32).unwrap(), v)),
        )
        .unwrap()
    }

    #[test]
    fn first_return_is_undefined() {
        let r = returns(&series(&[Some(100.0), Some(110.0)]));
        assert_eq!(r.values()[0], None);
        assert!(r.values()[1].is_some());
    }

    #[test]
    fn basic_calculation() {
        let r = returns(&series(&[Some(100.0), Some(110.0), Some(99.0)]));
        assert_relative_eq!(r.values()[1].unwrap(), 0.1, epsilon = 1e-12);
        assert_relative_eq!(r.values()[2].unwrap(), -0.1, epsilon = 1e-12);
    }

    #[test]
    fn matches_difference_form() {
        let prices = [Some(13.5), Some(14.25), Some(12.0), Some(12.75)];
        let r = returns(&series(&prices));
        for i in 1..prices.len() {
            let (prev, curr) = (prices[i - 1].unwrap(), prices[i].unwrap());
            assert_relative_eq!(r.values()[i].unwrap(), (curr - prev) / prev, epsilon = 1e-12);
        }
    }

    #[test]
    fn missing_price_undefines_both_neighbours() {
        let r = returns(&series(&[Some(1.0), None, Some(2.0), Some(3.0)]));
        assert_eq!(r.values()[1], None);
        assert_eq!(r.values()[2], None);
        assert!(r.values()[3].is_some());
    }

    #[test]
    fn zero_previous_price_is_undefined() {
        let r = returns(&series(&[Some(0.0), Some(5.0)]));
        assert_eq!(r.values()[1], None);
    }

    #[test]
    fn cumulative_from_first_defined() {
        let c = cumulative_returns(&series(&[None, Some(50.0), Some(75.0), None, Some(25.0)]));
        assert_eq!(
            c.values(),
            vec![None, Some(0.0), Some(0.5), None, Some(-0.5)]
        );
        assert_eq!(c.name(), "TEST CUMRET");
    }

    #[test]
    fn cumulative_all_missing() {
        let c = cumulative_returns(&series(&[None, None]));
        assert_eq!(c.defined_count(), 0);
    }
}
