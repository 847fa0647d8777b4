//! Series derived from a price series.
//!
//! - `Derived`: identity + parameters of a derived series (also names the output column)
//! - [`rolling`]: moving average and rolling standard deviation
//! - [`returns`]: period-over-period and cumulative returns
//! - [`fill`]: forward-fill imputation (applied table-wide, see `Table::forward_fill`)
//! - [`correlation`]: pairwise Pearson correlation
//!
//! Every derived series keeps the date index of its source. Positions without a
//! defined value (warmup, gaps) are `None`.

pub mod correlation;
pub mod fill;
pub mod returns;
pub mod rolling;

use crate::domain::series::TimeSeries;
use std::fmt;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Derived {
    MovingAverage(usize),
    RollingStd(usize),
    Returns,
    CumulativeReturns,
}

impl Derived {
    /// Output column name for a derived series of `source`, e.g. `AAPL SMA(20)`.
    pub fn column_name(&self, source: &str) -> String {
        format!("{} {}", source, self)
    }

    pub fn compute(&self, series: &TimeSeries) -> TimeSeries {
        match *self {
            Derived::MovingAverage(window) => rolling::moving_average(series, window),
            Derived::RollingStd(window) => rolling::rolling_std(series, window),
            Derived::Returns => returns::returns(series),
            Derived::CumulativeReturns => returns::cumulative_returns(series),
        }
    }
}

impl fmt::Display for Derived {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Derived::MovingAverage(window) => write!(f, "SMA({})", window),
            Derived::RollingStd(window) => write!(f, "STD({})", window),
            Derived::Returns => write!(f, "RET"),
            Derived::CumulativeReturns => write!(f, "CUMRET"),
        }
    }
}
