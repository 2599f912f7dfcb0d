//! Small descriptive statistics shared by the analysis stages
//!
//! Mean and sample standard deviation go through `statrs`; the correlation
//! estimators are written out because they need the shifted-window form.

use statrs::statistics::{Data, Distribution};

/// Relative spread below which a series is considered constant
pub const DEGENERATE_TOLERANCE: f64 = 1e-12;

pub fn mean(values: &[f64]) -> Option<f64> {
    if values.is_empty() {
        return None;
    }
    Data::new(values.to_vec()).mean()
}

/// Sample standard deviation (n - 1 denominator)
pub fn sample_std(values: &[f64]) -> Option<f64> {
    if values.len() < 2 {
        return None;
    }
    Data::new(values.to_vec()).std_dev()
}

/// True when every value equals the mean up to [`DEGENERATE_TOLERANCE`]
pub fn is_constant(values: &[f64]) -> bool {
    let Some(m) = mean(values) else {
        return true;
    };
    let scale = m.abs().max(1.0);
    values
        .iter()
        .all(|v| (v - m).abs() <= DEGENERATE_TOLERANCE * scale)
}

/// Sample autocorrelation `r_k = Σ (x_t - m)(x_{t+k} - m) / Σ (x_t - m)^2`
/// for `k = 0..=max_lag`, the estimator the Ljung-Box statistic is defined on.
///
/// `None` for a constant series.
pub fn sample_autocorrelation(values: &[f64], max_lag: usize) -> Option<Vec<f64>> {
    let n = values.len();
    let m = mean(values)?;
    let denominator: f64 = values.iter().map(|v| (v - m).powi(2)).sum();
    if denominator < 1e-300 {
        return None;
    }

    let max_lag = max_lag.min(n.saturating_sub(1));
    Some(
        (0..=max_lag)
            .map(|lag| {
                let num: f64 = values[lag..]
                    .iter()
                    .zip(&values[..n - lag])
                    .map(|(a, b)| (a - m) * (b - m))
                    .sum();
                num / denominator
            })
            .collect(),
    )
}
