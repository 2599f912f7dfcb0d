use crate::application::pipeline::{PipelineOutput, StationaritySummary};
use crate::domain::analysis::aggregated::AggregatedSeries;
use crate::domain::analysis::decomposition::DecompositionResult;
use crate::domain::analysis::imputation::ImputationResult;
use crate::domain::analysis::stationarity::TestOutcome;
use crate::domain::config::PipelineConfig;
use crate::domain::errors::{AnalysisError, ParseError};
use crate::domain::ports::DatasetSink;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use serde::Serialize;
use std::collections::BTreeMap;
use std::fs;
use std::path::PathBuf;
use tracing::info;

/// JSON view of a pipeline run, without the row-level series
#[derive(Debug, Serialize)]
pub struct PipelineReport<'a> {
    pub config: &'a PipelineConfig,
    pub observations: usize,
    pub first_date: Option<NaiveDate>,
    pub last_date: Option<NaiveDate>,
    pub rejected: &'a [ParseError],
    pub imputation: &'a ImputationResult,
    pub stationarity: &'a StationaritySummary,
    pub aggregated: &'a AggregatedSeries,
    pub moving_averages: &'a BTreeMap<usize, TestOutcome<Vec<Option<f64>>>>,
    pub repeated_moving_averages: &'a BTreeMap<String, TestOutcome<Vec<Option<f64>>>>,
    pub decomposition: &'a TestOutcome<DecompositionResult>,
    pub final_cumulative_return: Option<f64>,
    pub return_error: Option<&'a AnalysisError>,
}

impl<'a> PipelineReport<'a> {
    pub fn from_output(output: &'a PipelineOutput) -> Self {
        Self {
            config: &output.config,
            observations: output.series.len(),
            first_date: output.series.first_date(),
            last_date: output.series.last_date(),
            rejected: &output.rejected,
            imputation: &output.imputation,
            stationarity: &output.stationarity,
            aggregated: &output.aggregated,
            moving_averages: &output.moving_averages,
            repeated_moving_averages: &output.repeated_moving_averages,
            decomposition: &output.decomposition,
            final_cumulative_return: output.returns.completed().and_then(|r| r.final_cumulative()),
            return_error: output.returns.error(),
        }
    }
}

pub fn report_json(output: &PipelineOutput) -> Result<String> {
    serde_json::to_string_pretty(&PipelineReport::from_output(output))
        .context("Failed to serialize pipeline report")
}

/// Writes the JSON report next to the dataset
pub struct JsonReportWriter {
    file_path: PathBuf,
}

impl JsonReportWriter {
    pub fn new(file_path: impl Into<PathBuf>) -> Self {
        Self {
            file_path: file_path.into(),
        }
    }

    pub fn save<T: Serialize>(&self, value: &T) -> Result<()> {
        let content = serde_json::to_string_pretty(value).context("Failed to serialize report")?;

        // Atomic write: write to temp file then rename
        let temp_path = self.file_path.with_extension("tmp");
        fs::write(&temp_path, content).context("Failed to write temp report file")?;
        fs::rename(&temp_path, &self.file_path).context("Failed to rename report file")?;

        info!("Saved report to {:?}", self.file_path);
        Ok(())
    }
}

impl DatasetSink for JsonReportWriter {
    fn write_dataset(&self, output: &PipelineOutput) -> Result<()> {
        self.save(&PipelineReport::from_output(output))
    }
}
