//! Pearson correlation over pairwise complete observations.
//!
//! For each pair of columns only rows where both have a value are used.
//! The coefficient is undefined with fewer than two such rows or when either
//! side has zero variance over them. Non-finite inputs are treated as
//! missing. The diagonal is 1.0 for every column that has at least one value.

#[derive(Debug, Clone, PartialEq)]
pub struct CorrelationMatrix {
    names: Vec<String>,
    values: Vec<Vec<Option<f64>>>,
}

impl CorrelationMatrix {
    pub fn compute(columns: &[(&str, &[Option<f64>])]) -> Self {
        let n = columns.len();
        let names: Vec<String> = columns.iter().map(|(name, _)| name.to_string()).collect();
        let mut values = vec![vec![None; n]; n];

        for i in 0..n {
            let (_, a) = columns[i];
            if a.iter().flatten().any(|v| v.is_finite()) {
                values[i][i] = Some(1.0);
            }
            for j in (i + 1)..n {
                let (_, b) = columns[j];
                let r = pearson(a, b);
                values[i][j] = r;
                values[j][i] = r;
            }
        }

        Self { names, values }
    }

    pub fn names(&self) -> &[String] {
        &self.names
    }

    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Coefficient by position.
    pub fn at(&self, row: usize, col: usize) -> Option<f64> {
        self.values.get(row).and_then(|r| r.get(col)).copied().flatten()
    }

    /// Coefficient by column names.
    pub fn get(&self, a: &str, b: &str) -> Option<f64> {
        let i = self.names.iter().position(|n| n == a)?;
        let j = self.names.iter().position(|n| n == b)?;
        self.at(i, j)
    }

    pub fn rows(&self) -> impl Iterator<Item = (&str, &[Option<f64>])> {
        self.names
            .iter()
            .zip(&self.values)
            .map(|(name, row)| (name.as_str(), row.as_slice()))
    }
}

pub fn pearson(a: &[Option<f64>], b: &[Option<f64>]) -> Option<f64> {
    let pairs: Vec<(f64, f64)> = a
        .iter()
        .zip(b)
        .filter_map(|(x, y)| Some(((*x)?, (*y)?)))
        .filter(|(x, y)| x.is_finite() && y.is_finite())
        .collect();

    let n = pairs.len();
    if n < 2 {
        return None;
    }

    let mean_x = pairs.iter().map(|(x, _)| x).sum::<f64>() / n as f64;
    let mean_y = pairs.iter().map(|(_, y)| y).sum::<f64>() / n as f64;

    let mut cov = 0.0;
    let mut var_x = 0.0;
    let mut var_y = 0.0;
    for (x, y) in &pairs {
        let dx = x - mean_x;
        let dy = y - mean_y;
        cov += dx * dy;
        var_x += dx * dx;
        var_y += dy * dy;
    }

    if var_x == 0.0 || var_y == 0.0 {
        return None;
    }

    let r = cov / (var_x * var_y).sqrt();
    r.is_finite().then(|| r.clamp(-1.0, 1.0))
}
