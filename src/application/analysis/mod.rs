// Statistical analysis of cleaned series
pub mod returns;
pub mod stationarity;
pub mod statistics;
pub mod transformer;

pub use returns::ReturnCalculator;
pub use stationarity::StationarityAnalyzer;
