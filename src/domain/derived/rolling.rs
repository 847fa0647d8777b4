//! Trailing-window statistics.
//!
//! SMA(n)[i] = mean(v[i-n+1..=i]) for i >= n-1
//! STD(n)[i] = sample standard deviation of the same window (n-1 denominator)
//!
//! Warmup: first (n-1) positions are `None`. A window containing a missing
//! value yields `None`. `n == 0` or `n > len` yields an all-`None` series.

use crate::domain::derived::Derived;
use crate::domain::series::TimeSeries;

pub fn moving_average(series: &TimeSeries, window: usize) -> TimeSeries {
    let values = rolling_apply(&series.values(), window, |w| {
        Some(w.iter().sum::<f64>() / w.len() as f64)
    });
    series.with_values(
        Derived::MovingAverage(window).column_name(series.name()),
        values,
    )
}

pub fn rolling_std(series: &TimeSeries, window: usize) -> TimeSeries {
    let values = rolling_apply(&series.values(), window, sample_std);
    series.with_values(Derived::RollingStd(window).column_name(series.name()), values)
}

fn sample_std(window: &[f64]) -> Option<f64> {
    let n = window.len();
    if n < 2 {
        return None;
    }
    let mean = window.iter().sum::<f64>() / n as f64;
    let variance = window
        .iter()
        .map(|v| {
            let diff = v - mean;
            diff * diff
        })
        .sum::<f64>()
        / (n - 1) as f64;
    Some(variance.sqrt())
}

pub(crate) fn rolling_apply<F>(values: &[Option<f64>], window: usize, f: F) -> Vec<Option<f64>>
where
    F: Fn(&[f64]) -> Option<f64>,
{
    let mut out = vec![None; values.len()];
    if window == 0 || window > values.len() {
        return out;
    }

    let mut buf = Vec::with_capacity(window);
    for i in (window - 1)..values.len() {
        let slice = &values[i + 1 - window..=i];
        if slice.iter().any(Option::is_none) {
            continue;
        }
        buf.clear();
        buf.extend(slice.iter().flatten());
        out[i] = f(&buf);
    }
    out
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

    fn prices(values: &[f64]) -> TimeSeries {
        let wrapped: Vec<_> = values.iter().map(|&v| Some(v)).collect();
        series(&wrapped)
    }

    #[test]
    fn sma_warmup_and_values() {
        let ma = moving_average(&prices(&[1.0, 2.0, 3.0, 4.0, 5.0]), 3);
        assert_eq!(
            ma.values(),
            vec![None, None, Some(2.0), Some(3.0), Some(4.0)]
        );
    }

    #[test]
    fn sma_keeps_date_index() {
        let source = prices(&[1.0, 2.0, 3.0]);
        let ma = moving_average(&source, 2);
        assert_eq!(ma.dates().collect::<Vec<_>>(), source.dates().collect::<Vec<_>>());
    }

    #[test]
    fn sma_window_one_is_identity() {
        let ma = moving_average(&prices(&[4.0, 5.0, 6.0]), 1);
        assert_eq!(ma.values(), vec![Some(4.0), Some(5.0), Some(6.0)]);
    }

    #[test]
    fn sma_window_longer_than_series_is_all_undefined() {
        let ma = moving_average(&prices(&[1.0, 2.0]), 5);
        assert_eq!(ma.len(), 2);
        assert_eq!(ma.defined_count(), 0);
    }

    #[test]
    fn sma_zero_window_is_all_undefined() {
        let ma = moving_average(&prices(&[1.0, 2.0]), 0);
        assert_eq!(ma.defined_count(), 0);
    }

    #[test]
    fn sma_propagates_missing() {
        let ma = moving_average(
            &series(&[Some(1.0), Some(2.0), None, Some(4.0), Some(5.0), Some(6.0)]),
            2,
        );
        assert_eq!(
            ma.values(),
            vec![None, Some(1.5), None, None, Some(4.5), Some(5.5)]
        );
    }

    #[test]
    fn std_known_values() {
        let sd = rolling_std(&prices(&[2.0, 4.0, 4.0, 4.0, 5.0, 5.0, 7.0, 9.0]), 8);
        // population std is 2.0, sample std is sqrt(32/7)
        assert_relative_eq!(sd.values()[7].unwrap(), (32.0f64 / 7.0).sqrt(), epsilon = 1e-12);
    }

    #[test]
    fn std_constant_window_is_zero() {
        let sd = rolling_std(&prices(&[3.0, 3.0, 3.0]), 3);
        assert_eq!(sd.values()[2], Some(0.0));
    }

    #[test]
    fn std_window_one_is_undefined() {
        let sd = rolling_std(&prices(&[3.0, 4.0]), 1);
        assert_eq!(sd.defined_count(), 0);
    }
}
