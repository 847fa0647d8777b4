//! Chart rendering port trait.

use crate::domain::derived::correlation::CorrelationMatrix;
use crate::domain::error::StockError;
use crate::domain::series::TimeSeries;
use crate::domain::table::Table;
use std::path::Path;

/// Port for rendering charts to files.
pub trait ChartPort {
    /// One line per named column, x axis is the table's date index.
    fn line_chart(
        &self,
        table: &Table,
        columns: &[&str],
        title: &str,
        output_path: &Path,
    ) -> Result<(), StockError>;

    /// Points at dates where both series have a value.
    fn scatter_chart(
        &self,
        x: &TimeSeries,
        y: &TimeSeries,
        title: &str,
        output_path: &Path,
    ) -> Result<(), StockError>;

    fn heatmap(
        &self,
        matrix: &CorrelationMatrix,
        title: &str,
        output_path: &Path,
    ) -> Result<(), StockError>;
}
