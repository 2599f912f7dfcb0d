// Ingestion: parsing and gap filling
pub mod preprocessing;

// Calendar resampling
pub mod market_data;

// Stationarity tests, transforms and returns
pub mod analysis;

// Orchestrator
pub mod pipeline;
