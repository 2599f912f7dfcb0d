//! Pipeline Configuration Domain Value Object
//!
//! This module defines the `PipelineConfig` value object, which encapsulates
//! every tunable of the preprocessing and stationarity pipeline.

use crate::domain::market::field::Field;
use crate::domain::market::granularity::{Aggregation, Granularity};
use anyhow::anyhow;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use thiserror::Error;

/// Error type for PipelineConfig validation
#[derive(Debug, Error, PartialEq)]
pub enum PipelineConfigError {
    #[error("Invalid period: {field} = {value}. Must be > 0")]
    InvalidPeriod { field: String, value: usize },

    #[error("Invalid window: {field} = {value}. Must be >= {min}")]
    InvalidWindow {
        field: String,
        value: usize,
        min: usize,
    },

    #[error("Empty list: {field}")]
    EmptyList { field: String },

    #[error("Invalid significance level: {value}. Must be in (0, 1)")]
    InvalidSignificance { value: f64 },

    #[error("Invalid analysis field: {field}. Must be a numeric column")]
    InvalidAnalysisField { field: Field },
}

/// Neighbour weighting used by the KNN imputer
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum KnnWeighting {
    #[default]
    Uniform,
    Distance,
}

impl FromStr for KnnWeighting {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "uniform" => Ok(KnnWeighting::Uniform),
            "distance" => Ok(KnnWeighting::Distance),
            _ => Err(anyhow!(
                "Invalid KNN weighting: '{}'. Valid options: uniform, distance",
                s
            )),
        }
    }
}

impl fmt::Display for KnnWeighting {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            KnnWeighting::Uniform => write!(f, "uniform"),
            KnnWeighting::Distance => write!(f, "distance"),
        }
    }
}

/// Pipeline configuration value object
///
/// # Invariants
///
/// - `knn_neighbors`, `decomposition_period`, `acf_max_lag`, every MA window
///   and every Ljung-Box lag must be > 0
/// - every volatility window must be >= 2 (sample standard deviation)
/// - the window/lag lists must not be empty
/// - `ma_chains` may be empty, but each chain needs at least one window > 0
/// - `significance_level` lies strictly between 0 and 1
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PipelineConfig {
    // Imputation
    pub knn_neighbors: usize,
    pub knn_weighting: KnnWeighting,

    // Resampling
    pub resample_granularity: Granularity,
    pub resample_aggregation: Aggregation,

    // Transformations
    pub ma_windows: Vec<usize>,
    /// Re-averaged smoothers, windows in application order (`[7, 2]` is 2×MA_7)
    pub ma_chains: Vec<Vec<usize>>,
    pub decomposition_period: usize,

    // Stationarity tests
    pub ljungbox_lags: Vec<usize>,
    pub acf_max_lag: usize,
    pub adf_max_lag: Option<usize>,
    pub significance_level: f64,

    // Returns
    pub volatility_windows: Vec<usize>,

    // Ingestion
    pub strict_parsing: bool,
    pub analysis_field: Field,
}

impl PipelineConfig {
    /// Validate and return the configuration
    pub fn validated(self) -> Result<Self, PipelineConfigError> {
        self.validate()?;
        Ok(self)
    }

    pub fn validate(&self) -> Result<(), PipelineConfigError> {
        self.validate_period("knn_neighbors", self.knn_neighbors)?;
        self.validate_period("decomposition_period", self.decomposition_period)?;
        self.validate_period("acf_max_lag", self.acf_max_lag)?;

        self.validate_list("ma_windows", &self.ma_windows, 1)?;
        self.validate_list("ljungbox_lags", &self.ljungbox_lags, 1)?;
        self.validate_list("volatility_windows", &self.volatility_windows, 2)?;
        for chain in &self.ma_chains {
            self.validate_list("ma_chains", chain, 1)?;
        }

        if !(self.significance_level > 0.0 && self.significance_level < 1.0) {
            return Err(PipelineConfigError::InvalidSignificance {
                value: self.significance_level,
            });
        }

        if self.analysis_field == Field::Date {
            return Err(PipelineConfigError::InvalidAnalysisField {
                field: self.analysis_field,
            });
        }

        Ok(())
    }

    fn validate_period(&self, field: &str, value: usize) -> Result<(), PipelineConfigError> {
        if value == 0 {
            return Err(PipelineConfigError::InvalidPeriod {
                field: field.to_string(),
                value,
            });
        }
        Ok(())
    }

    fn validate_list(
        &self,
        field: &str,
        values: &[usize],
        min: usize,
    ) -> Result<(), PipelineConfigError> {
        if values.is_empty() {
            return Err(PipelineConfigError::EmptyList {
                field: field.to_string(),
            });
        }
        if let Some(&value) = values.iter().find(|&&v| v < min) {
            return Err(PipelineConfigError::InvalidWindow {
                field: field.to_string(),
                value,
                min,
            });
        }
        Ok(())
    }
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            knn_neighbors: 5,
            knn_weighting: KnnWeighting::Uniform,
            resample_granularity: Granularity::Month,
            resample_aggregation: Aggregation::Mean,
            ma_windows: vec![7, 30],
            ma_chains: Vec::new(),
            decomposition_period: 180,
            ljungbox_lags: vec![10, 20],
            acf_max_lag: 40,
            adf_max_lag: None,
            significance_level: 0.05,
            volatility_windows: vec![7, 14, 21, 28],
            strict_parsing: false,
            analysis_field: Field::Close,
        }
    }
}
