//! Configuration loading for tsprep.
//!
//! Three layers feed a [`PipelineConfig`]: built-in defaults, `TSPREP_*`
//! environment variables (a `.env` file is honoured by the binary) and an
//! optional TOML file. Command-line flags are applied last by the binary.

use crate::domain::config::{KnnWeighting, PipelineConfig};
use crate::domain::market::field::Field;
use crate::domain::market::granularity::{Aggregation, Granularity};
use anyhow::{Context, Result};
use serde::Deserialize;
use std::env;
use std::path::Path;
use std::str::FromStr;

/// Pipeline settings read from the process environment
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineEnvConfig {
    pub pipeline: PipelineConfig,
}

impl PipelineEnvConfig {
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Build from an arbitrary key lookup; unset keys keep their default
    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = PipelineConfig::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let pipeline = PipelineConfig {
            knn_neighbors: parse_or("TSPREP_KNN_NEIGHBORS", get("TSPREP_KNN_NEIGHBORS"), defaults.knn_neighbors)?,
            knn_weighting: parse_enum_or::<KnnWeighting>(
                "TSPREP_KNN_WEIGHTING",
                get("TSPREP_KNN_WEIGHTING"),
                defaults.knn_weighting,
            )?,
            resample_granularity: parse_enum_or::<Granularity>(
                "TSPREP_RESAMPLE_GRANULARITY",
                get("TSPREP_RESAMPLE_GRANULARITY"),
                defaults.resample_granularity,
            )?,
            resample_aggregation: parse_enum_or::<Aggregation>(
                "TSPREP_RESAMPLE_AGGREGATION",
                get("TSPREP_RESAMPLE_AGGREGATION"),
                defaults.resample_aggregation,
            )?,
            ma_windows: parse_list_or("TSPREP_MA_WINDOWS", get("TSPREP_MA_WINDOWS"), defaults.ma_windows)?,
            ma_chains: parse_chains_or("TSPREP_MA_CHAINS", get("TSPREP_MA_CHAINS"), defaults.ma_chains)?,
            decomposition_period: parse_or(
                "TSPREP_DECOMPOSITION_PERIOD",
                get("TSPREP_DECOMPOSITION_PERIOD"),
                defaults.decomposition_period,
            )?,
            ljungbox_lags: parse_list_or("TSPREP_LJUNGBOX_LAGS", get("TSPREP_LJUNGBOX_LAGS"), defaults.ljungbox_lags)?,
            acf_max_lag: parse_or("TSPREP_ACF_MAX_LAG", get("TSPREP_ACF_MAX_LAG"), defaults.acf_max_lag)?,
            adf_max_lag: match get("TSPREP_ADF_MAX_LAG") {
                Some(raw) if raw.trim().eq_ignore_ascii_case("auto") => None,
                Some(raw) => Some(
                    raw.trim()
                        .parse::<usize>()
                        .context("Failed to parse TSPREP_ADF_MAX_LAG")?,
                ),
                None => defaults.adf_max_lag,
            },
            significance_level: parse_or(
                "TSPREP_SIGNIFICANCE_LEVEL",
                get("TSPREP_SIGNIFICANCE_LEVEL"),
                defaults.significance_level,
            )?,
            volatility_windows: parse_list_or(
                "TSPREP_VOLATILITY_WINDOWS",
                get("TSPREP_VOLATILITY_WINDOWS"),
                defaults.volatility_windows,
            )?,
            strict_parsing: get("TSPREP_STRICT_PARSING")
                .and_then(|v| v.trim().parse::<bool>().ok())
                .unwrap_or(defaults.strict_parsing),
            analysis_field: parse_enum_or::<Field>(
                "TSPREP_ANALYSIS_FIELD",
                get("TSPREP_ANALYSIS_FIELD"),
                defaults.analysis_field,
            )?,
        };

        Ok(Self { pipeline })
    }
}

fn parse_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr,
    T::Err: std::error::Error + Send + Sync + 'static,
{
    match raw {
        Some(raw) => raw
            .trim()
            .parse::<T>()
            .context(format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

fn parse_enum_or<T>(key: &str, raw: Option<String>, default: T) -> Result<T>
where
    T: FromStr<Err = anyhow::Error>,
{
    match raw {
        Some(raw) => T::from_str(raw.trim()).context(format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

/// Comma separated list, e.g. `7,30`
fn parse_list_or(key: &str, raw: Option<String>, default: Vec<usize>) -> Result<Vec<usize>> {
    match raw {
        Some(raw) => raw
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| s.parse::<usize>())
            .collect::<Result<Vec<_>, _>>()
            .context(format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

/// Chains separated by `;`, windows inside a chain by `x`, e.g. `7x2;12x2`
fn parse_chains_or(key: &str, raw: Option<String>, default: Vec<Vec<usize>>) -> Result<Vec<Vec<usize>>> {
    match raw {
        Some(raw) => raw
            .split(';')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|chain| {
                chain
                    .split(['x', 'X'])
                    .map(|w| w.trim().parse::<usize>())
                    .collect::<Result<Vec<_>, _>>()
            })
            .collect::<Result<Vec<_>, _>>()
            .context(format!("Failed to parse {}", key)),
        None => Ok(default),
    }
}

/// Partial configuration as written in a TOML file.
///
/// Every key is optional; missing keys leave the base value untouched.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct ConfigOverrides {
    pub knn_neighbors: Option<usize>,
    pub knn_weighting: Option<KnnWeighting>,
    pub resample_granularity: Option<Granularity>,
    pub resample_aggregation: Option<Aggregation>,
    pub ma_windows: Option<Vec<usize>>,
    pub ma_chains: Option<Vec<Vec<usize>>>,
    pub decomposition_period: Option<usize>,
    pub ljungbox_lags: Option<Vec<usize>>,
    pub acf_max_lag: Option<usize>,
    pub adf_max_lag: Option<usize>,
    pub significance_level: Option<f64>,
    pub volatility_windows: Option<Vec<usize>>,
    pub strict_parsing: Option<bool>,
    pub analysis_field: Option<Field>,
}

impl ConfigOverrides {
    pub fn apply(self, base: PipelineConfig) -> PipelineConfig {
        PipelineConfig {
            knn_neighbors: self.knn_neighbors.unwrap_or(base.knn_neighbors),
            knn_weighting: self.knn_weighting.unwrap_or(base.knn_weighting),
            resample_granularity: self.resample_granularity.unwrap_or(base.resample_granularity),
            resample_aggregation: self.resample_aggregation.unwrap_or(base.resample_aggregation),
            ma_windows: self.ma_windows.unwrap_or(base.ma_windows),
            ma_chains: self.ma_chains.unwrap_or(base.ma_chains),
            decomposition_period: self.decomposition_period.unwrap_or(base.decomposition_period),
            ljungbox_lags: self.ljungbox_lags.unwrap_or(base.ljungbox_lags),
            acf_max_lag: self.acf_max_lag.unwrap_or(base.acf_max_lag),
            adf_max_lag: self.adf_max_lag.or(base.adf_max_lag),
            significance_level: self.significance_level.unwrap_or(base.significance_level),
            volatility_windows: self.volatility_windows.unwrap_or(base.volatility_windows),
            strict_parsing: self.strict_parsing.unwrap_or(base.strict_parsing),
            analysis_field: self.analysis_field.unwrap_or(base.analysis_field),
        }
    }
}

/// Parse TOML overrides from a string
pub fn parse_config_overrides(content: &str) -> Result<ConfigOverrides> {
    toml::from_str(content).context("Failed to parse pipeline config TOML")
}

/// Loads configuration overrides from a TOML file.
pub fn load_config_file(path: impl AsRef<Path>) -> Result<ConfigOverrides> {
    let path = path.as_ref();
    let content = std::fs::read_to_string(path)
        .context(format!("Failed to read config file: {}", path.display()))?;
    parse_config_overrides(&content).context(format!("Invalid config file: {}", path.display()))
}

/// Environment first, then the optional file on top
pub fn resolve_config(file: Option<&Path>) -> Result<PipelineConfig> {
    let base = PipelineEnvConfig::from_env()?.pipeline;
    match file {
        Some(path) => Ok(load_config_file(path)?.apply(base)),
        None => Ok(base),
    }
}
