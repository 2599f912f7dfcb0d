use serde::Serialize;
use std::collections::BTreeMap;

/// Simple returns and the series derived from them
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ReturnSeries {
    /// `R_t = (P_t - P_{t-1}) / P_{t-1}`, with `R_0 = 0`
    pub returns: Vec<f64>,
    /// Running sum of `returns` (not compounded)
    pub cumulative: Vec<f64>,
    /// Rolling sample standard deviation of `returns`, keyed by window width
    pub volatility: BTreeMap<usize, Vec<Option<f64>>>,
}

impl ReturnSeries {
    pub fn len(&self) -> usize {
        self.returns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.returns.is_empty()
    }

    pub fn final_cumulative(&self) -> Option<f64> {
        self.cumulative.last().copied()
    }
}
