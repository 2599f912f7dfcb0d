//! Stationarity diagnostics: autocorrelation, Ljung-Box and Augmented
//! Dickey-Fuller.
//!
//! - Ljung-Box H0: autocorrelations up to lag h are jointly zero
//! - ADF H0: the series has a unit root (non-stationary)
//!
//! Each test can fail on its own (too little data, constant series); the
//! analyzer records the failure and carries on with the remaining tests.

use crate::application::analysis::statistics::{is_constant, sample_autocorrelation};
use crate::domain::analysis::stationarity::{
    AdfResult, CriticalValues, LjungBoxOutcome, LjungBoxResult, StationarityReport, TestOutcome,
};
use crate::domain::config::PipelineConfig;
use crate::domain::errors::AnalysisError;
use nalgebra::{DMatrix, DVector};
use statrs::distribution::{ChiSquared, ContinuousCDF, Normal};
use tracing::{debug, warn};

// MacKinnon (1994) response surface for the constant-only regression, one
// integrated variable. p = Phi(poly(tau)).
const TAU_MAX: f64 = 2.74;
const TAU_MIN: f64 = -18.83;
const TAU_STAR: f64 = -1.61;
const TAU_SMALL_P: [f64; 3] = [2.1659, 1.4412, 0.038269];
const TAU_LARGE_P: [f64; 4] = [1.7339, 0.93202, -0.12745, -0.010368];

// MacKinnon (2010) critical value surfaces: b0 + b1/T + b2/T^2 + b3/T^3
const CRIT_1PCT: [f64; 4] = [-3.43035, -6.5393, -16.786, -79.433];
const CRIT_5PCT: [f64; 4] = [-2.86154, -2.8903, -4.234, -40.040];
const CRIT_10PCT: [f64; 4] = [-2.56677, -1.5384, -2.809, 0.0];

/// Autocorrelation function for lags `0..=max_lag`.
///
/// Uses the global-mean sample estimator, so `acf[0] = 1` and every lag is
/// defined as soon as the series as a whole varies. A flat stretch inside a
/// varying series is fine.
pub fn autocorrelation(values: &[f64], max_lag: usize) -> Result<Vec<f64>, AnalysisError> {
    let n = values.len();
    if n < max_lag + 1 {
        return Err(AnalysisError::insufficient("autocorrelation", max_lag + 1, n));
    }
    if is_constant(values) {
        return Err(AnalysisError::degenerate(
            "autocorrelation",
            "series has zero variance",
        ));
    }

    sample_autocorrelation(values, max_lag)
        .ok_or_else(|| AnalysisError::degenerate("autocorrelation", "series has zero variance"))
}

/// Ljung-Box Q statistic and χ² p-value for a single lag count
pub fn ljung_box_single(values: &[f64], lags: usize) -> Result<LjungBoxResult, AnalysisError> {
    if lags == 0 {
        return Err(AnalysisError::invalid_parameter("ljungbox_lags", lags));
    }
    let n = values.len();
    if n < lags + 1 {
        return Err(AnalysisError::insufficient("ljung_box", lags + 1, n));
    }

    let acf = sample_autocorrelation(values, lags)
        .ok_or_else(|| AnalysisError::degenerate("ljung_box", "series has zero variance"))?;

    let nf = n as f64;
    let statistic = nf
        * (nf + 2.0)
        * acf[1..]
            .iter()
            .enumerate()
            .map(|(i, rho)| rho * rho / (nf - (i + 1) as f64))
            .sum::<f64>();

    let chi2 = ChiSquared::new(lags as f64)
        .map_err(|e| AnalysisError::invalid_parameter("ljungbox_lags", format!("{} ({})", lags, e)))?;
    let p_value = (1.0 - chi2.cdf(statistic)).clamp(0.0, 1.0);

    Ok(LjungBoxResult {
        lags,
        statistic,
        p_value,
    })
}

/// Ljung-Box test for each requested lag count, failures kept per lag
pub fn ljung_box(values: &[f64], lags: &[usize]) -> Vec<LjungBoxOutcome> {
    lags.iter()
        .map(|&lag| LjungBoxOutcome {
            lags: lag,
            outcome: ljung_box_single(values, lag).into(),
        })
        .collect()
}

/// Stationary only if every completed lag keeps `p >= alpha`.
///
/// `None` when no lag could be tested.
pub fn ljung_box_verdict(outcomes: &[LjungBoxOutcome], alpha: f64) -> Option<bool> {
    let completed: Vec<&LjungBoxResult> =
        outcomes.iter().filter_map(|o| o.outcome.completed()).collect();
    if completed.is_empty() {
        return None;
    }
    Some(completed.iter().all(|r| r.p_value >= alpha))
}

/// Default ADF lag ceiling, `ceil(12 * (n / 100)^(1/4))`
pub fn default_adf_max_lag(n: usize) -> usize {
    (12.0 * (n as f64 / 100.0).powf(0.25)).ceil() as usize
}

/// Augmented Dickey-Fuller test with a constant.
///
/// Regresses `Δx_t` on `[1, x_{t-1}, Δx_{t-1}, .., Δx_{t-p}]`. The lag order `p`
/// is chosen by AIC over `0..=max_lag` on a common sample, then the
/// regression is refit on all usable rows. The statistic is the t-value of the
/// `x_{t-1}` coefficient.
pub fn adf_test(values: &[f64], max_lag: Option<usize>) -> Result<AdfResult, AnalysisError> {
    const OP: &str = "adf_test";
    let n = values.len();

    if n < 4 {
        return Err(AnalysisError::insufficient(OP, 4, n));
    }
    // Leaves at least one residual degree of freedom at the largest lag
    let cap = n / 2 - 2;
    if values.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::degenerate(OP, "series contains non-finite values"));
    }
    if is_constant(values) {
        return Err(AnalysisError::degenerate(OP, "series is constant"));
    }

    let max_lag = max_lag.unwrap_or_else(|| default_adf_max_lag(n)).min(cap);
    let diff: Vec<f64> = values.windows(2).map(|w| w[1] - w[0]).collect();

    let used_lag = if max_lag == 0 {
        0
    } else {
        select_lag_by_aic(values, &diff, max_lag)?
    };

    let (x, y) = adf_design(values, &diff, used_lag, used_lag);
    let fit = ols(&x, &y).ok_or_else(|| AnalysisError::degenerate(OP, "singular regression"))?;
    let statistic = fit.t_value(1).ok_or_else(|| {
        AnalysisError::degenerate(OP, "regression residuals vanish, t-statistic undefined")
    })?;

    let nobs = y.len();
    let p_value = mackinnon_p_value(statistic);
    debug!(
        "ADF: stat={:.4}, p={:.4}, lag={}, nobs={}",
        statistic, p_value, used_lag, nobs
    );

    Ok(AdfResult {
        statistic,
        p_value,
        used_lag,
        nobs,
        critical_values: critical_values(nobs),
    })
}

fn select_lag_by_aic(values: &[f64], diff: &[f64], max_lag: usize) -> Result<usize, AnalysisError> {
    let mut best: Option<(f64, usize)> = None;

    for lag in 0..=max_lag {
        // Same rows for every candidate: the sample left by the largest lag
        let (x, y) = adf_design(values, diff, max_lag, lag);
        if y.len() <= x.ncols() {
            continue;
        }
        if let Some(fit) = ols(&x, &y) {
            let aic = fit.aic();
            if best.is_none_or(|(best_aic, _)| aic < best_aic) {
                best = Some((aic, lag));
            }
        }
    }

    best.map(|(_, lag)| lag)
        .ok_or_else(|| AnalysisError::degenerate("adf_test", "no lag order could be fitted"))
}

/// Design matrix for the ADF regression.
///
/// Rows start at `diff[skip]` so that candidate lag orders up to `skip` share
/// one sample; `lags` lagged differences are included.
fn adf_design(values: &[f64], diff: &[f64], skip: usize, lags: usize) -> (DMatrix<f64>, DVector<f64>) {
    let rows = diff.len().saturating_sub(skip);
    let cols = 2 + lags;
    let mut data = Vec::with_capacity(rows * cols);
    let mut target = Vec::with_capacity(rows);

    for t in skip..diff.len() {
        data.push(1.0);
        data.push(values[t]);
        for i in 1..=lags {
            data.push(diff[t - i]);
        }
        target.push(diff[t]);
    }

    (
        DMatrix::from_row_slice(rows, cols, &data),
        DVector::from_vec(target),
    )
}

struct OlsFit {
    beta: DVector<f64>,
    xtx_inv: DMatrix<f64>,
    ssr: f64,
    nobs: usize,
    k: usize,
}

impl OlsFit {
    fn t_value(&self, i: usize) -> Option<f64> {
        let dof = self.nobs.checked_sub(self.k).filter(|&d| d > 0)? as f64;
        let sigma2 = self.ssr / dof;
        let se = (sigma2 * self.xtx_inv[(i, i)]).sqrt();
        if !se.is_finite() || se <= f64::EPSILON * self.beta[i].abs().max(1e-300) {
            return None;
        }
        Some(self.beta[i] / se)
    }

    /// Gaussian AIC, `-2 llf + 2k`
    fn aic(&self) -> f64 {
        let nobs = self.nobs as f64;
        let llf = -nobs / 2.0 * ((2.0 * std::f64::consts::PI).ln() + (self.ssr / nobs).ln() + 1.0);
        -2.0 * llf + 2.0 * self.k as f64
    }
}

/// Ordinary least squares through the normal equations
fn ols(x: &DMatrix<f64>, y: &DVector<f64>) -> Option<OlsFit> {
    let xtx = x.transpose() * x;
    let xtx_inv = xtx.try_inverse()?;
    let beta = &xtx_inv * (x.transpose() * y);
    let residuals = y - x * &beta;
    let ssr = residuals.iter().map(|r| r * r).sum::<f64>();
    if !ssr.is_finite() || beta.iter().any(|b| !b.is_finite()) {
        return None;
    }
    Some(OlsFit {
        beta,
        xtx_inv,
        ssr,
        nobs: x.nrows(),
        k: x.ncols(),
    })
}

/// Approximate p-value of an ADF statistic (constant, no trend)
pub fn mackinnon_p_value(statistic: f64) -> f64 {
    if statistic > TAU_MAX {
        return 1.0;
    }
    if statistic < TAU_MIN {
        return 0.0;
    }

    let z = if statistic <= TAU_STAR {
        polyval(&TAU_SMALL_P, statistic)
    } else {
        polyval(&TAU_LARGE_P, statistic)
    };

    match Normal::new(0.0, 1.0) {
        Ok(normal) => normal.cdf(z),
        Err(_) => f64::NAN,
    }
}

/// Critical values for a regression on `nobs` rows
pub fn critical_values(nobs: usize) -> CriticalValues {
    let surface = |b: &[f64; 4]| {
        let t = nobs as f64;
        b[0] + b[1] / t + b[2] / (t * t) + b[3] / (t * t * t)
    };
    CriticalValues {
        one_pct: surface(&CRIT_1PCT),
        five_pct: surface(&CRIT_5PCT),
        ten_pct: surface(&CRIT_10PCT),
    }
}

/// Polynomial with coefficients in increasing order
fn polyval(coefficients: &[f64], x: f64) -> f64 {
    coefficients.iter().rev().fold(0.0, |acc, c| acc * x + c)
}

/// Runs the ACF, Ljung-Box and ADF tests on one series
#[derive(Debug, Clone)]
pub struct StationarityAnalyzer {
    pub acf_max_lag: usize,
    pub ljungbox_lags: Vec<usize>,
    pub adf_max_lag: Option<usize>,
    pub significance_level: f64,
}

impl Default for StationarityAnalyzer {
    fn default() -> Self {
        Self::from_config(&PipelineConfig::default())
    }
}

impl StationarityAnalyzer {
    pub fn from_config(config: &PipelineConfig) -> Self {
        Self {
            acf_max_lag: config.acf_max_lag,
            ljungbox_lags: config.ljungbox_lags.clone(),
            adf_max_lag: config.adf_max_lag,
            significance_level: config.significance_level,
        }
    }

    /// Build the full report. Never fails: test failures are recorded.
    pub fn analyze(&self, values: &[f64]) -> StationarityReport {
        let alpha = self.significance_level;

        let acf: TestOutcome<Vec<f64>> = autocorrelation(values, self.acf_max_lag).into();
        let ljung_box = ljung_box(values, &self.ljungbox_lags);
        let adf: TestOutcome<AdfResult> = adf_test(values, self.adf_max_lag).into();

        let ljung_box_stationary = ljung_box_verdict(&ljung_box, alpha);
        let adf_stationary = adf.completed().map(|r| r.p_value < alpha);

        let report = StationarityReport {
            observations: values.len(),
            significance_level: alpha,
            acf,
            ljung_box,
            adf,
            ljung_box_stationary,
            adf_stationary,
        };

        for failure in report.failures() {
            warn!("Stationarity test skipped: {}", failure);
        }

        report
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Deterministic pseudo-noise in [-0.5, 0.5)
    fn noise(n: usize, seed: u64) -> Vec<f64> {
        let mut state = seed.wrapping_mul(6364136223846793005).wrapping_add(1442695040888963407);
        (0..n)
            .map(|_| {
                state = state
                    .wrapping_mul(6364136223846793005)
                    .wrapping_add(1442695040888963407);
                ((state >> 11) as f64 / (1u64 << 53) as f64) - 0.5
            })
            .collect()
    }

    fn random_walk(n: usize, seed: u64) -> Vec<f64> {
        noise(n, seed)
            .iter()
            .scan(100.0, |level, step| {
                *level += step;
                Some(*level)
            })
            .collect()
    }

    #[test]
    fn test_acf_lag_zero_is_one() {
        let data = noise(200, 7);
        let acf = autocorrelation(&data, 10).unwrap();
        assert_eq!(acf.len(), 11);
        assert_eq!(acf[0], 1.0);
        for &r in &acf[1..] {
            assert!(r.abs() < 0.3, "white noise autocorrelation too large: {}", r);
        }
    }

    #[test]
    fn test_acf_insufficient_data() {
        let err = autocorrelation(&[1.0, 2.0, 3.0], 5).unwrap_err();
        assert_eq!(err, AnalysisError::insufficient("autocorrelation", 6, 3));
    }

    #[test]
    fn test_acf_constant_series_is_degenerate() {
        let err = autocorrelation(&[4.0; 20], 3).unwrap_err();
        assert!(matches!(err, AnalysisError::DegenerateSeries { .. }));
    }

    #[test]
    fn test_acf_trend_decays_slowly() {
        let data: Vec<f64> = (0..50).map(|i| i as f64 * 2.0 + 1.0).collect();
        let acf = autocorrelation(&data, 3).unwrap();
        assert!((acf[1] - 0.94).abs() < 1e-9);
        assert!(acf.windows(2).all(|w| w[0] > w[1]));
        assert!(acf[3] > 0.8);
    }

    #[test]
    fn test_acf_flat_tail_is_not_degenerate() {
        let acf = autocorrelation(&[1.0, 2.0, 3.0, 3.0, 3.0, 3.0, 3.0, 3.0], 3).unwrap();
        assert_eq!(acf.len(), 4);
        assert_eq!(acf[0], 1.0);
        assert!((acf[1] - 0.383_064_516).abs() < 1e-6);

        let mut data = vec![0.0];
        data.extend([5.0; 9]);
        let acf = autocorrelation(&data, 1).unwrap();
        assert!((acf[1] + 1.0 / 90.0).abs() < 1e-12);
    }

    #[test]
    fn test_acf_uses_every_available_lag() {
        let acf = autocorrelation(&[1.0, 3.0, 2.0, 5.0], 3).unwrap();
        assert_eq!(acf.len(), 4);
        assert!((acf[3] + 0.45).abs() < 1e-12);
    }

    #[test]
    fn test_analyzer_reports_acf_for_halted_series() {
        let mut data: Vec<f64> = (0..105).map(|i| 100.0 + (i as f64 * 0.3).sin()).collect();
        data.extend([100.5; 45]);
        let report = StationarityAnalyzer::default().analyze(&data);
        let acf = report.acf.completed().unwrap();
        assert_eq!(acf.len(), 41);
        assert_eq!(acf[0], 1.0);
    }

    #[test]
    fn test_ljung_box_white_noise_not_rejected() {
        let data = noise(500, 11);
        let result = ljung_box_single(&data, 10).unwrap();
        assert!(result.statistic >= 0.0);
        assert!(result.p_value > 0.001, "p = {}", result.p_value);
    }

    #[test]
    fn test_ljung_box_random_walk_rejected() {
        let data = random_walk(300, 3);
        let outcomes = ljung_box(&data, &[5, 10]);
        assert_eq!(outcomes.len(), 2);
        assert_eq!(ljung_box_verdict(&outcomes, 0.05), Some(false));
    }

    #[test]
    fn test_ljung_box_records_failure_per_lag() {
        let data = noise(8, 1);
        let outcomes = ljung_box(&data, &[3, 20]);
        assert!(outcomes[0].outcome.completed().is_some());
        assert!(matches!(
            outcomes[1].outcome.error(),
            Some(AnalysisError::InsufficientData { .. })
        ));
        // Verdict only looks at lags that ran
        assert!(ljung_box_verdict(&outcomes, 0.05).is_some());
    }

    #[test]
    fn test_ljung_box_verdict_without_results() {
        let outcomes = ljung_box(&[1.0, 1.0, 1.0, 1.0], &[1, 2]);
        assert_eq!(ljung_box_verdict(&outcomes, 0.05), None);
    }

    #[test]
    fn test_mackinnon_p_value_shape() {
        assert_eq!(mackinnon_p_value(-25.0), 0.0);
        assert_eq!(mackinnon_p_value(3.0), 1.0);
        // 5% critical value maps to roughly p = 0.05
        assert!((mackinnon_p_value(-2.86) - 0.05).abs() < 0.005);
        assert!(mackinnon_p_value(-4.0) < mackinnon_p_value(-2.0));
        assert!(mackinnon_p_value(0.0) > 0.5);
    }

    #[test]
    fn test_critical_values_large_sample() {
        let cv = critical_values(1_000_000);
        assert!((cv.one_pct + 3.43).abs() < 0.01);
        assert!((cv.five_pct + 2.86).abs() < 0.01);
        assert!((cv.ten_pct + 2.57).abs() < 0.01);
    }

    #[test]
    fn test_adf_white_noise_stationary() {
        let data = noise(300, 5);
        let result = adf_test(&data, None).unwrap();
        assert!(result.statistic < result.critical_values.five_pct);
        assert!(result.p_value < 0.05);
        assert!(result.used_lag <= default_adf_max_lag(300));
    }

    #[test]
    fn test_adf_random_walk_not_stationary() {
        let data = random_walk(300, 9);
        let result = adf_test(&data, None).unwrap();
        assert!(result.statistic > -4.0);
    }

    #[test]
    fn test_adf_degenerate_and_short() {
        assert!(matches!(
            adf_test(&[5.0; 50], None),
            Err(AnalysisError::DegenerateSeries { .. })
        ));
        assert!(matches!(
            adf_test(&[1.0, 2.0, 1.5], None),
            Err(AnalysisError::InsufficientData { .. })
        ));
    }

    #[test]
    fn test_analyzer_keeps_going_after_failures() {
        let analyzer = StationarityAnalyzer {
            acf_max_lag: 500,
            ljungbox_lags: vec![5],
            adf_max_lag: None,
            significance_level: 0.05,
        };
        let report = analyzer.analyze(&noise(120, 21));

        assert!(report.acf.error().is_some());
        assert_eq!(report.failures().len(), 1);
        assert!(report.ljung_box_stationary.is_some());
        assert_eq!(report.adf_stationary, Some(true));
    }
}
