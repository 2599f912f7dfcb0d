//! Read-only artifacts produced by the analysis stages.

pub mod aggregated;
pub mod decomposition;
pub mod imputation;
pub mod returns;
pub mod stationarity;

pub use aggregated::{AggregatedSeries, Bucket, ColumnStats, PeriodLabel};
pub use decomposition::DecompositionResult;
pub use imputation::ImputationResult;
pub use returns::ReturnSeries;
pub use stationarity::{
    AdfResult, CriticalValues, LjungBoxOutcome, LjungBoxResult, StationarityReport, TestOutcome,
};
