// Raw and cleaned market data
pub mod market;

// Artifacts produced by the analysis stages
pub mod analysis;

// Pipeline configuration value object
pub mod config;

// Port interfaces
pub mod ports;

// Domain-specific error types
pub mod errors;
