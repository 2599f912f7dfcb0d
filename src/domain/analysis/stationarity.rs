use crate::domain::errors::AnalysisError;
use serde::Serialize;

/// Result of a test that may have been skipped
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "status", content = "value", rename_all = "snake_case")]
pub enum TestOutcome<T> {
    Completed(T),
    Failed { error: AnalysisError },
}

impl<T> TestOutcome<T> {
    pub fn completed(&self) -> Option<&T> {
        match self {
            TestOutcome::Completed(value) => Some(value),
            TestOutcome::Failed { .. } => None,
        }
    }

    pub fn error(&self) -> Option<&AnalysisError> {
        match self {
            TestOutcome::Completed(_) => None,
            TestOutcome::Failed { error } => Some(error),
        }
    }
}

impl<T> From<Result<T, AnalysisError>> for TestOutcome<T> {
    fn from(result: Result<T, AnalysisError>) -> Self {
        match result {
            Ok(value) => TestOutcome::Completed(value),
            Err(error) => TestOutcome::Failed { error },
        }
    }
}

/// Ljung-Box Q statistic for one lag count
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct LjungBoxResult {
    pub lags: usize,
    pub statistic: f64,
    pub p_value: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct LjungBoxOutcome {
    pub lags: usize,
    pub outcome: TestOutcome<LjungBoxResult>,
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct CriticalValues {
    #[serde(rename = "1%")]
    pub one_pct: f64,
    #[serde(rename = "5%")]
    pub five_pct: f64,
    #[serde(rename = "10%")]
    pub ten_pct: f64,
}

/// Augmented Dickey-Fuller test with constant
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct AdfResult {
    pub statistic: f64,
    pub p_value: f64,
    /// Lagged differences kept after AIC selection
    pub used_lag: usize,
    /// Observations in the final regression
    pub nobs: usize,
    pub critical_values: CriticalValues,
}

/// Stationarity diagnostics of one series.
///
/// The two verdicts answer different questions (residual autocorrelation vs.
/// unit root) and are reported independently; `None` means the test could not
/// run at all.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationarityReport {
    pub observations: usize,
    pub significance_level: f64,
    pub acf: TestOutcome<Vec<f64>>,
    pub ljung_box: Vec<LjungBoxOutcome>,
    pub adf: TestOutcome<AdfResult>,
    pub ljung_box_stationary: Option<bool>,
    pub adf_stationary: Option<bool>,
}

impl StationarityReport {
    /// Every structured failure in the report
    pub fn failures(&self) -> Vec<&AnalysisError> {
        let mut failures: Vec<&AnalysisError> = Vec::new();
        failures.extend(self.acf.error());
        failures.extend(self.ljung_box.iter().filter_map(|lb| lb.outcome.error()));
        failures.extend(self.adf.error());
        failures
    }
}
