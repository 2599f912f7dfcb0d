//! End-to-end preprocessing pipeline.
//!
//! Raw rows are normalized and imputed once; the resulting series is then
//! shared read-only by the four independent downstream stages, which run on
//! the rayon pool.

use crate::application::analysis::returns::ReturnCalculator;
use crate::application::analysis::stationarity::StationarityAnalyzer;
use crate::application::analysis::transformer::{
    difference, ma_chain_label, moving_average_of, repeated_moving_average, seasonal_decompose,
};
use crate::application::market_data::resampler::Resampler;
use crate::application::preprocessing::imputer::KnnImputer;
use crate::application::preprocessing::normalizer::FieldNormalizer;
use crate::domain::analysis::aggregated::AggregatedSeries;
use crate::domain::analysis::decomposition::DecompositionResult;
use crate::domain::analysis::imputation::ImputationResult;
use crate::domain::analysis::returns::ReturnSeries;
use crate::domain::analysis::stationarity::{StationarityReport, TestOutcome};
use crate::domain::config::{PipelineConfig, PipelineConfigError};
use crate::domain::errors::{AnalysisError, ParseError};
use crate::domain::market::field::{Field, RawRecord};
use crate::domain::market::observation::TimeSeries;
use serde::Serialize;
use std::collections::BTreeMap;
use std::time::Instant;
use thiserror::Error;
use tracing::{debug, info, warn};

#[derive(Debug, Error, PartialEq)]
pub enum PipelineError {
    #[error("Invalid configuration: {0}")]
    Config(#[from] PipelineConfigError),

    #[error("Ingestion failed: {0}")]
    Parse(#[from] ParseError),

    #[error("Imputation failed: {0}")]
    Imputation(#[from] AnalysisError),
}

/// Stationarity of a series and of its first difference
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StationaritySummary {
    pub level: StationarityReport,
    pub difference: StationarityReport,
}

/// Everything one run produces
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutput {
    pub config: PipelineConfig,
    /// Cleaned and imputed series
    pub series: TimeSeries,
    pub rejected: Vec<ParseError>,
    pub imputation: ImputationResult,
    pub aggregated: AggregatedSeries,
    pub stationarity: StationaritySummary,
    /// First difference of the analysis field, aligned with `series`
    pub differences: Vec<Option<f64>>,
    pub moving_averages: BTreeMap<usize, TestOutcome<Vec<Option<f64>>>>,
    /// Re-averaged smoothers keyed by chain label (`"7x2"`)
    pub repeated_moving_averages: BTreeMap<String, TestOutcome<Vec<Option<f64>>>>,
    pub decomposition: TestOutcome<DecompositionResult>,
    /// Returns on closing prices
    pub returns: TestOutcome<ReturnSeries>,
}

/// Output of the transformation stage
struct Transforms {
    differences: Vec<Option<f64>>,
    moving_averages: BTreeMap<usize, TestOutcome<Vec<Option<f64>>>>,
    repeated_moving_averages: BTreeMap<String, TestOutcome<Vec<Option<f64>>>>,
    decomposition: TestOutcome<DecompositionResult>,
}

pub struct Pipeline {
    config: PipelineConfig,
    normalizer: FieldNormalizer,
    imputer: KnnImputer,
    analyzer: StationarityAnalyzer,
    returns: ReturnCalculator,
}

impl Pipeline {
    pub fn new(config: PipelineConfig) -> Result<Self, PipelineError> {
        let config = config.validated()?;
        Ok(Self {
            normalizer: FieldNormalizer::new(config.strict_parsing),
            imputer: KnnImputer::new(config.knn_neighbors, config.knn_weighting),
            analyzer: StationarityAnalyzer::from_config(&config),
            returns: ReturnCalculator::new(config.volatility_windows.clone()),
            config,
        })
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    /// Normalize then impute. Shared by every entry point.
    pub fn prepare(
        &self,
        records: &[RawRecord],
    ) -> Result<(TimeSeries, Vec<ParseError>, ImputationResult), PipelineError> {
        let started = Instant::now();
        let batch = self.normalizer.normalize(records)?;
        let (series, imputation) = self.imputer.impute_series(&batch.series)?;
        debug!("Prepared {} observations in {:?}", series.len(), started.elapsed());
        Ok((series, batch.rejected, imputation))
    }

    pub fn run(&self, records: &[RawRecord]) -> Result<PipelineOutput, PipelineError> {
        let started = Instant::now();
        let (series, rejected, imputation) = self.prepare(records)?;
        let values = analysis_values(&series, self.config.analysis_field);
        let closes = series.closes();

        let ((aggregated, stationarity), (transforms, returns)) = rayon::join(
            || {
                rayon::join(
                    || self.resample(&series),
                    || self.stationarity(&values),
                )
            },
            || rayon::join(|| self.transform(&values), || self.compute_returns(&closes)),
        );

        info!(
            "Pipeline finished: {} observations, {} rejected, {} imputed, {} buckets in {:?}",
            series.len(),
            rejected.len(),
            imputation.filled_count(),
            aggregated.len(),
            started.elapsed()
        );

        Ok(PipelineOutput {
            config: self.config.clone(),
            series,
            rejected,
            imputation,
            aggregated,
            stationarity,
            differences: transforms.differences,
            moving_averages: transforms.moving_averages,
            repeated_moving_averages: transforms.repeated_moving_averages,
            decomposition: transforms.decomposition,
            returns,
        })
    }

    pub fn resample(&self, series: &TimeSeries) -> AggregatedSeries {
        Resampler::new().resample(
            series,
            self.config.resample_granularity,
            self.config.resample_aggregation,
        )
    }

    pub fn stationarity(&self, values: &[f64]) -> StationaritySummary {
        let level = self.analyzer.analyze(values);
        // diff[0] is undefined and dropped before testing
        let diffs: Vec<f64> = difference(values).into_iter().flatten().collect();
        let difference = self.analyzer.analyze(&diffs);

        debug!(
            "Stationarity verdicts: level adf={:?} lb={:?}, difference adf={:?} lb={:?}",
            level.adf_stationary,
            level.ljung_box_stationary,
            difference.adf_stationary,
            difference.ljung_box_stationary
        );

        StationaritySummary { level, difference }
    }

    fn compute_returns(&self, closes: &[f64]) -> TestOutcome<ReturnSeries> {
        let outcome: TestOutcome<ReturnSeries> = self.returns.compute(closes).into();
        if let Some(e) = outcome.error() {
            warn!("Return calculation skipped: {}", e);
        }
        outcome
    }

    fn transform(&self, values: &[f64]) -> Transforms {
        let moving_averages: BTreeMap<usize, TestOutcome<Vec<Option<f64>>>> = self
            .config
            .ma_windows
            .iter()
            .map(|&w| (w, moving_average_of(values, w).into()))
            .collect();

        let repeated_moving_averages: BTreeMap<String, TestOutcome<Vec<Option<f64>>>> = self
            .config
            .ma_chains
            .iter()
            .map(|chain| (ma_chain_label(chain), repeated_moving_average(values, chain).into()))
            .collect();

        let decomposition: TestOutcome<DecompositionResult> =
            seasonal_decompose(values, self.config.decomposition_period).into();
        if let Some(e) = decomposition.error() {
            warn!("Seasonal decomposition skipped: {}", e);
        }

        Transforms {
            differences: difference(values),
            moving_averages,
            repeated_moving_averages,
            decomposition,
        }
    }
}

/// Values of the analysed column; gaps left after imputation are skipped
pub fn analysis_values(series: &TimeSeries, field: Field) -> Vec<f64> {
    series.column(field).into_iter().flatten().collect()
}
