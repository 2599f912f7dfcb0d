//! Configuration domain module
//!
//! This module contains the validated value object for pipeline configuration.
//! Loading from the environment and from files lives in `crate::config`.

pub mod pipeline_config;

pub use pipeline_config::{KnnWeighting, PipelineConfig, PipelineConfigError};
