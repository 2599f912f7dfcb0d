pub mod field;
pub mod granularity;
pub mod observation;
pub mod volume;

pub use field::{Field, RawField, RawRecord};
pub use granularity::{Aggregation, Granularity};
pub use observation::{Observation, PercentPoints, TimeSeries};
pub use volume::{VolumeToken, VolumeUnit, format_volume};
