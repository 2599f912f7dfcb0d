use crate::domain::market::field::Field;
use serde::Serialize;
use std::collections::BTreeMap;

/// What the imputer filled, for reporting only
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct ImputationResult {
    /// Row index -> filled value, per imputed column
    pub filled: BTreeMap<Field, BTreeMap<usize, f64>>,
    /// Fraction of missing entries per numeric column, before imputation
    pub missing_fraction: BTreeMap<Field, f64>,
}

impl ImputationResult {
    pub fn filled_count(&self) -> usize {
        self.filled.values().map(|m| m.len()).sum()
    }
}
