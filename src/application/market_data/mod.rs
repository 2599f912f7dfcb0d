// Market data processing modules
pub mod resampler;

pub use resampler::Resampler;
