use serde::Serialize;

/// Additive decomposition `observed = trend + seasonal + residual`.
///
/// All four sequences have the input length. `trend` and `residual` are
/// `None` within `period / 2` of either end.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DecompositionResult {
    pub period: usize,
    pub observed: Vec<f64>,
    pub trend: Vec<Option<f64>>,
    pub seasonal: Vec<f64>,
    pub residual: Vec<Option<f64>>,
}

impl DecompositionResult {
    pub fn len(&self) -> usize {
        self.observed.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observed.is_empty()
    }

    /// `trend + seasonal + residual` where the trend is defined
    pub fn reconstructed(&self) -> Vec<Option<f64>> {
        self.trend
            .iter()
            .zip(&self.seasonal)
            .zip(&self.residual)
            .map(|((t, s), r)| match (t, r) {
                (Some(t), Some(r)) => Some(t + s + r),
                _ => None,
            })
            .collect()
    }
}
