//! Series transformations: differencing, moving averages and additive
//! seasonal decomposition.
//!
//! Undefined positions are `None`, never zero, so later tests are not biased
//! by filler values.

use crate::domain::analysis::decomposition::DecompositionResult;
use crate::domain::errors::AnalysisError;
use tracing::debug;

/// First difference, `diff[t] = x[t] - x[t-1]`; `diff[0]` is undefined
pub fn difference(values: &[f64]) -> Vec<Option<f64>> {
    if values.is_empty() {
        return Vec::new();
    }
    std::iter::once(None)
        .chain(values.windows(2).map(|w| Some(w[1] - w[0])))
        .collect()
}

/// Trailing moving average of `window` observations.
///
/// `None` for `t < window - 1` and wherever the window holds a missing value.
pub fn moving_average(
    values: &[Option<f64>],
    window: usize,
) -> Result<Vec<Option<f64>>, AnalysisError> {
    if window == 0 {
        return Err(AnalysisError::invalid_parameter("ma_window", window));
    }

    let mut out = vec![None; values.len()];
    if values.len() < window {
        return Ok(out);
    }

    for (t, slot) in out.iter_mut().enumerate().skip(window - 1) {
        let slice = &values[t + 1 - window..=t];
        let sum: Option<f64> = slice.iter().copied().sum();
        *slot = sum.map(|s| s / window as f64);
    }
    Ok(out)
}

/// Moving average over a fully observed series
pub fn moving_average_of(values: &[f64], window: usize) -> Result<Vec<Option<f64>>, AnalysisError> {
    let wrapped: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    moving_average(&wrapped, window)
}

/// Apply moving averages one after another.
///
/// `[w, m]` gives the `m×MA_w` smoother, `[w, m, m]` a triple re-averaged
/// one. Each pass extends the undefined prefix by `window - 1`.
pub fn repeated_moving_average(
    values: &[f64],
    windows: &[usize],
) -> Result<Vec<Option<f64>>, AnalysisError> {
    let mut current: Vec<Option<f64>> = values.iter().copied().map(Some).collect();
    for &window in windows {
        current = moving_average(&current, window)?;
    }
    Ok(current)
}

/// Key for a chain of windows, `[7, 2]` -> `"7x2"`
pub fn ma_chain_label(windows: &[usize]) -> String {
    windows
        .iter()
        .map(|w| w.to_string())
        .collect::<Vec<_>>()
        .join("x")
}

/// Centred moving average used as the decomposition trend.
///
/// Odd `period`: plain window of `period`. Even `period`: `2×period` filter,
/// i.e. `period + 1` points with half weight on both ends. Undefined within
/// `period / 2` of either boundary.
pub fn centered_moving_average(values: &[f64], period: usize) -> Vec<Option<f64>> {
    let n = values.len();
    let half = period / 2;
    let mut trend = vec![None; n];
    if period == 0 || n < 2 * half + 1 {
        return trend;
    }

    for (t, slot) in trend.iter_mut().enumerate().take(n - half).skip(half) {
        let window = &values[t - half..=t + half];
        let value = if period % 2 == 1 {
            window.iter().sum::<f64>() / period as f64
        } else {
            let inner: f64 = window[1..window.len() - 1].iter().sum();
            (inner + 0.5 * (window[0] + window[window.len() - 1])) / period as f64
        };
        *slot = Some(value);
    }
    trend
}

/// Additive decomposition `observed = trend + seasonal + residual`.
///
/// Seasonal effects are the per-position means of `observed - trend`,
/// shifted to sum to zero over one period, then tiled over the series.
pub fn seasonal_decompose(values: &[f64], period: usize) -> Result<DecompositionResult, AnalysisError> {
    if period < 2 {
        return Err(AnalysisError::invalid_parameter("decomposition_period", period));
    }
    let n = values.len();
    if n < 2 * period {
        return Err(AnalysisError::insufficient("seasonal_decompose", 2 * period, n));
    }
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::degenerate(
            "seasonal_decompose",
            "series contains non-finite values",
        ));
    }

    let trend = centered_moving_average(values, period);

    let mut sums = vec![0.0; period];
    let mut counts = vec![0usize; period];
    for (t, (x, tr)) in values.iter().zip(&trend).enumerate() {
        if let Some(tr) = tr {
            sums[t % period] += x - tr;
            counts[t % period] += 1;
        }
    }

    // n >= 2 * period guarantees every position has at least one defined trend
    let mut pattern: Vec<f64> = sums
        .iter()
        .zip(&counts)
        .map(|(s, &c)| if c > 0 { s / c as f64 } else { 0.0 })
        .collect();
    let offset = pattern.iter().sum::<f64>() / period as f64;
    for p in &mut pattern {
        *p -= offset;
    }

    let seasonal: Vec<f64> = (0..n).map(|t| pattern[t % period]).collect();
    let residual: Vec<Option<f64>> = values
        .iter()
        .zip(&trend)
        .zip(&seasonal)
        .map(|((x, tr), s)| tr.map(|tr| x - tr - s))
        .collect();

    debug!(
        "Decomposed {} observations with period {} ({} trend points)",
        n,
        period,
        trend.iter().filter(|t| t.is_some()).count()
    );

    Ok(DecompositionResult {
        period,
        observed: values.to_vec(),
        trend,
        seasonal,
        residual,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_difference() {
        let diff = difference(&[100.0, 102.0, 101.0, 105.0]);
        assert_eq!(diff, vec![None, Some(2.0), Some(-1.0), Some(4.0)]);
        assert!(difference(&[]).is_empty());
        assert_eq!(difference(&[3.0]), vec![None]);
    }

    #[test]
    fn test_moving_average_prefix() {
        let ma = moving_average_of(&[1.0, 2.0, 3.0, 4.0, 5.0], 3).unwrap();
        assert_eq!(ma, vec![None, None, Some(2.0), Some(3.0), Some(4.0)]);
    }

    #[test]
    fn test_moving_average_missing_inputs_propagate() {
        let ma = moving_average(&[None, Some(2.0), Some(4.0), Some(6.0)], 2).unwrap();
        assert_eq!(ma, vec![None, None, Some(3.0), Some(5.0)]);
    }

    #[test]
    fn test_moving_average_window_longer_than_series() {
        let ma = moving_average_of(&[1.0, 2.0], 5).unwrap();
        assert_eq!(ma, vec![None, None]);
        assert!(moving_average_of(&[1.0], 0).is_err());
    }

    #[test]
    fn test_repeated_moving_average_compounds_prefix() {
        let values: Vec<f64> = (1..=10).map(|i| i as f64).collect();
        let smoothed = repeated_moving_average(&values, &[3, 2]).unwrap();

        // 3 - 1 + 2 - 1 undefined leading points
        assert!(smoothed[..3].iter().all(|v| v.is_none()));
        // MA3 of a line is the line shifted by 1; MA2 of that shifts by 0.5 more
        assert_eq!(smoothed[3], Some(2.5));
        assert_eq!(smoothed[9], Some(8.5));

        let triple = repeated_moving_average(&values, &[3, 3, 3]).unwrap();
        assert_eq!(triple.iter().take_while(|v| v.is_none()).count(), 6);
    }

    #[test]
    fn test_centered_moving_average_even_period() {
        let values: Vec<f64> = (0..8).map(|i| i as f64).collect();
        let trend = centered_moving_average(&values, 4);
        assert_eq!(trend[0], None);
        assert_eq!(trend[1], None);
        assert_eq!(trend[2], Some(2.0));
        assert_eq!(trend[5], Some(5.0));
        assert_eq!(trend[6], None);
    }

    #[test]
    fn test_decomposition_reconstructs_observed() {
        let pattern = [3.0, -1.0, 0.5, -2.5];
        let values: Vec<f64> = (0..40)
            .map(|t| 50.0 + 0.3 * t as f64 + pattern[t % 4] + ((t * 7) % 5) as f64 * 0.1)
            .collect();

        let result = seasonal_decompose(&values, 4).unwrap();
        assert_eq!(result.len(), values.len());

        for (t, rebuilt) in result.reconstructed().iter().enumerate() {
            if let Some(rebuilt) = rebuilt {
                assert!((rebuilt - values[t]).abs() <= 1e-6 * values[t].abs());
            } else {
                assert!(result.trend[t].is_none());
            }
        }

        let one_cycle: f64 = result.seasonal[..4].iter().sum();
        assert!(one_cycle.abs() < 1e-9);
        assert_eq!(result.seasonal[0], result.seasonal[4]);
    }

    #[test]
    fn test_decomposition_recovers_pure_seasonality() {
        let pattern = [2.0, -1.0, -1.0];
        let values: Vec<f64> = (0..30).map(|t| 10.0 + pattern[t % 3]).collect();

        let result = seasonal_decompose(&values, 3).unwrap();
        for t in 0..3 {
            assert!((result.seasonal[t] - pattern[t]).abs() < 1e-9);
        }
        for r in result.residual.iter().flatten() {
            assert!(r.abs() < 1e-9);
        }
    }

    #[test]
    fn test_decomposition_needs_two_cycles() {
        let err = seasonal_decompose(&[1.0; 10], 6).unwrap_err();
        assert_eq!(err, AnalysisError::insufficient("seasonal_decompose", 12, 10));
        assert!(seasonal_decompose(&[1.0; 10], 1).is_err());
    }
}
