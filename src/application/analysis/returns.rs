use crate::application::analysis::statistics::sample_std;
use crate::domain::analysis::returns::ReturnSeries;
use crate::domain::errors::AnalysisError;
use std::collections::BTreeMap;
use tracing::debug;

/// Simple returns `R_t = (P_t - P_{t-1}) / P_{t-1}` with `R_0 = 0`
pub fn simple_returns(prices: &[f64]) -> Result<Vec<f64>, AnalysisError> {
    if prices.is_empty() {
        return Err(AnalysisError::insufficient("simple_returns", 1, 0));
    }

    let mut returns = Vec::with_capacity(prices.len());
    returns.push(0.0);
    for (t, w) in prices.windows(2).enumerate() {
        if w[0] == 0.0 {
            return Err(AnalysisError::degenerate(
                "simple_returns",
                format!("zero price at index {}", t),
            ));
        }
        returns.push((w[1] - w[0]) / w[0]);
    }
    Ok(returns)
}

/// Running sum of returns.
///
/// This is a sum, not the compounded product `Π(1 + R_t) - 1`; for small
/// daily returns the two are close but they are not equal.
pub fn cumulative_returns(returns: &[f64]) -> Vec<f64> {
    returns
        .iter()
        .scan(0.0, |acc, r| {
            *acc += r;
            Some(*acc)
        })
        .collect()
}

/// Trailing sample standard deviation over `window` returns.
///
/// `None` for `t < window - 1`.
pub fn rolling_volatility(returns: &[f64], window: usize) -> Result<Vec<Option<f64>>, AnalysisError> {
    if window < 2 {
        return Err(AnalysisError::invalid_parameter("volatility_window", window));
    }

    let mut out = vec![None; returns.len()];
    for (t, slot) in out.iter_mut().enumerate().skip(window - 1) {
        *slot = sample_std(&returns[t + 1 - window..=t]);
    }
    Ok(out)
}

/// Computes returns, cumulative returns and one volatility series per window
#[derive(Debug, Clone)]
pub struct ReturnCalculator {
    pub volatility_windows: Vec<usize>,
}

impl ReturnCalculator {
    pub fn new(volatility_windows: Vec<usize>) -> Self {
        Self { volatility_windows }
    }

    pub fn compute(&self, prices: &[f64]) -> Result<ReturnSeries, AnalysisError> {
        let returns = simple_returns(prices)?;
        let cumulative = cumulative_returns(&returns);

        let mut volatility = BTreeMap::new();
        for &window in &self.volatility_windows {
            volatility.insert(window, rolling_volatility(&returns, window)?);
        }

        debug!(
            "Computed {} returns, final cumulative {:.4}",
            returns.len(),
            cumulative.last().copied().unwrap_or_default()
        );

        Ok(ReturnSeries {
            returns,
            cumulative,
            volatility,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_simple_returns() {
        let returns = simple_returns(&[100.0, 110.0, 99.0]).unwrap();
        assert_eq!(returns[0], 0.0);
        assert!((returns[1] - 0.10).abs() < 1e-12);
        assert!((returns[2] + 0.10).abs() < 1e-12);
    }

    #[test]
    fn test_simple_returns_zero_price() {
        let err = simple_returns(&[100.0, 0.0, 5.0]).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateSeries { .. }));
        assert!(simple_returns(&[]).is_err());
    }

    #[test]
    fn test_cumulative_is_running_sum() {
        let cumulative = cumulative_returns(&[0.0, 0.1, -0.05, 0.02]);
        let expected = [0.0, 0.1, 0.05, 0.07];
        for (c, e) in cumulative.iter().zip(expected) {
            assert!((c - e).abs() < 1e-12);
        }
    }

    #[test]
    fn test_rolling_volatility() {
        let returns = vec![0.0, 0.01, -0.01, 0.01, -0.01];
        let vol = rolling_volatility(&returns, 3).unwrap();
        assert_eq!(vol[0], None);
        assert_eq!(vol[1], None);
        // [0, 0.01, -0.01]: mean 0, sum sq 0.0002 / 2
        assert!((vol[2].unwrap() - 0.01).abs() < 1e-12);
        assert!(rolling_volatility(&returns, 1).is_err());
    }

    #[test]
    fn test_calculator_builds_every_window() {
        let prices: Vec<f64> = (0..40).map(|i| 100.0 + (i as f64).sin()).collect();
        let series = ReturnCalculator::new(vec![7, 14]).compute(&prices).unwrap();

        assert_eq!(series.len(), 40);
        assert_eq!(series.volatility.len(), 2);
        assert_eq!(series.volatility[&7].iter().filter(|v| v.is_none()).count(), 6);
        assert_eq!(series.volatility[&14].iter().filter(|v| v.is_none()).count(), 13);
    }
}
