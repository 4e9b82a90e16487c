//! Small statistics kit for the policies and the aggregator: mean, sample
//! standard deviation, and an ordinary least-squares line fit.

/// Arithmetic mean. Callers guarantee a non-empty slice.
pub fn mean(values: &[f64]) -> f64 {
    debug_assert!(!values.is_empty());
    values.iter().sum::<f64>() / values.len() as f64
}

/// Sample standard deviation (n − 1). Zero for fewer than two points, so a
/// flat or single-point history keeps the 3-sigma rule meaningful: any value
/// off the mean trips it.
pub fn stdev(values: &[f64]) -> f64 {
    if values.len() < 2 {
        return 0.0;
    }
    let m = mean(values);
    let var = values.iter().map(|v| (v - m) * (v - m)).sum::<f64>() / (values.len() - 1) as f64;
    var.sqrt()
}

#[derive(Debug, Clone, Copy)]
pub struct LinearFit {
    pub slope: f64,
    pub intercept: f64,
}

impl LinearFit {
    pub fn predict(&self, x: f64) -> f64 {
        self.slope * x + self.intercept
    }
}

/// Least-squares line through (x, y) points. Degenerate inputs (fewer than
/// two points, or no spread in x) fit a flat line through the mean.
pub fn linear_fit(points: &[(f64, f64)]) -> LinearFit {
    if points.is_empty() {
        return LinearFit { slope: 0.0, intercept: 0.0 };
    }
    let n = points.len() as f64;
    let mean_x = points.iter().map(|(x, _)| x).sum::<f64>() / n;
    let mean_y = points.iter().map(|(_, y)| y).sum::<f64>() / n;
    let sxx = points.iter().map(|(x, _)| (x - mean_x) * (x - mean_x)).sum::<f64>();
    if sxx == 0.0 {
        return LinearFit { slope: 0.0, intercept: mean_y };
    }
    let sxy = points.iter().map(|(x, y)| (x - mean_x) * (y - mean_y)).sum::<f64>();
    let slope = sxy / sxx;
    LinearFit { slope, intercept: mean_y - slope * mean_x }
}
