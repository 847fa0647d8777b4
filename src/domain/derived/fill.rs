//! Forward-fill imputation.
//!
//! A missing value takes the nearest preceding defined value. Leading missing
//! values stay missing; nothing is ever filled from a later observation.

pub fn forward_fill_values(values: &[Option<f64>]) -> Vec<Option<f64>> {
    let mut last = None;
    values
        .iter()
        .map(|v| {
            if v.is_some() {
                last = *v;
            }
            last
        })
        .collect()
}
