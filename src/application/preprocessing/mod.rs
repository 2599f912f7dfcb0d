// Raw field parsing and missing-value handling
pub mod imputer;
pub mod normalizer;

pub use imputer::KnnImputer;
pub use normalizer::{FieldNormalizer, NormalizedBatch};
