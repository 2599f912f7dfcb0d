//! K-nearest-neighbour imputation of missing numeric observations.
//!
//! A missing cell is replaced by the (uniform or inverse-distance weighted)
//! mean of the same column over the `k` closest complete rows. Closeness is
//! measured on the other numeric columns with a NaN-aware Euclidean distance,
//! so a receiver row that also misses other cells is still comparable.

use crate::domain::analysis::imputation::ImputationResult;
use crate::domain::config::KnnWeighting;
use crate::domain::errors::AnalysisError;
use crate::domain::market::field::Field;
use crate::domain::market::observation::TimeSeries;
use std::collections::BTreeMap;
use tracing::{debug, info};

/// Distances below this are treated as exact matches
const ZERO_DISTANCE: f64 = 1e-12;

#[derive(Debug, Clone)]
pub struct KnnImputer {
    pub neighbors: usize,
    pub weighting: KnnWeighting,
}

impl Default for KnnImputer {
    fn default() -> Self {
        Self {
            neighbors: 5,
            weighting: KnnWeighting::Uniform,
        }
    }
}

impl KnnImputer {
    pub fn new(neighbors: usize, weighting: KnnWeighting) -> Self {
        Self {
            neighbors,
            weighting,
        }
    }

    /// Fill the missing entries of column `target` in a row-major matrix.
    ///
    /// Returns the completed column and the filled `row -> value` pairs.
    /// A column without gaps is returned unchanged.
    pub fn impute_column(
        &self,
        matrix: &[Vec<Option<f64>>],
        target: usize,
    ) -> Result<(Vec<f64>, BTreeMap<usize, f64>), AnalysisError> {
        if self.neighbors == 0 {
            return Err(AnalysisError::invalid_parameter("knn_neighbors", 0));
        }

        let column: Vec<Option<f64>> = matrix
            .iter()
            .map(|row| row.get(target).copied().flatten())
            .collect();
        let missing: Vec<usize> = (0..column.len()).filter(|&i| column[i].is_none()).collect();

        if missing.is_empty() {
            let values = column.into_iter().flatten().collect();
            return Ok((values, BTreeMap::new()));
        }

        let donors: Vec<usize> = matrix
            .iter()
            .enumerate()
            .filter(|(_, row)| !row.is_empty() && row.iter().all(|v| v.is_some()))
            .map(|(i, _)| i)
            .collect();

        if donors.is_empty() {
            return Err(AnalysisError::insufficient("knn_impute", 1, 0));
        }

        let k = self.neighbors.min(donors.len());
        if k < self.neighbors {
            debug!(
                "Only {} complete rows available, using all of them instead of k={}",
                donors.len(),
                self.neighbors
            );
        }

        let mut filled = BTreeMap::new();
        for &row in &missing {
            let value = self.estimate(matrix, target, row, &donors, k);
            filled.insert(row, value);
        }

        let values = column
            .iter()
            .enumerate()
            .map(|(i, v)| v.or_else(|| filled.get(&i).copied()).unwrap_or(f64::NAN))
            .collect();

        Ok((values, filled))
    }

    fn estimate(
        &self,
        matrix: &[Vec<Option<f64>>],
        target: usize,
        row: usize,
        donors: &[usize],
        k: usize,
    ) -> f64 {
        let receiver = &matrix[row];
        let mut ranked: Vec<(f64, usize)> = donors
            .iter()
            .map(|&d| (nan_euclidean(receiver, &matrix[d], target), d))
            .collect();
        // Ties resolve towards the earlier row
        ranked.sort_by(|a, b| a.0.total_cmp(&b.0).then(a.1.cmp(&b.1)));
        let nearest = &ranked[..k];

        let donor_value = |d: usize| matrix[d][target].unwrap_or(f64::NAN);

        match self.weighting {
            KnnWeighting::Uniform => {
                nearest.iter().map(|&(_, d)| donor_value(d)).sum::<f64>() / k as f64
            }
            KnnWeighting::Distance => {
                let exact: Vec<usize> = nearest
                    .iter()
                    .filter(|(dist, _)| *dist < ZERO_DISTANCE)
                    .map(|&(_, d)| d)
                    .collect();
                if !exact.is_empty() {
                    return exact.iter().map(|&d| donor_value(d)).sum::<f64>() / exact.len() as f64;
                }
                let (weighted, total) = nearest.iter().fold((0.0, 0.0), |(acc, w_sum), &(dist, d)| {
                    let w = 1.0 / dist;
                    (acc + w * donor_value(d), w_sum + w)
                });
                weighted / total
            }
        }
    }

    /// Impute the volume column of a series and report missing fractions.
    ///
    /// Returns a new series; the input is left untouched and no row is dropped.
    pub fn impute_series(
        &self,
        series: &TimeSeries,
    ) -> Result<(TimeSeries, ImputationResult), AnalysisError> {
        let matrix = series.numeric_matrix();
        let mut result = ImputationResult::default();

        for (col, &field) in Field::NUMERIC.iter().enumerate() {
            let missing = matrix.iter().filter(|row| row[col].is_none()).count();
            let fraction = if matrix.is_empty() {
                0.0
            } else {
                missing as f64 / matrix.len() as f64
            };
            result.missing_fraction.insert(field, fraction);
            if missing > 0 {
                info!(
                    "{}: {} of {} values missing ({:.2}%)",
                    field,
                    missing,
                    matrix.len(),
                    fraction * 100.0
                );
            }
        }

        // Only the volume column may be missing after normalization
        let volume_col = Field::NUMERIC
            .iter()
            .position(|&f| f == Field::Volume)
            .unwrap_or(4);
        let (volumes, filled) = self.impute_column(&matrix, volume_col)?;

        if filled.is_empty() {
            return Ok((series.clone(), result));
        }

        info!("Imputed {} volume values (k={}, {})", filled.len(), self.neighbors, self.weighting);
        result.filled.insert(Field::Volume, filled);
        Ok((series.with_volumes(&volumes), result))
    }
}

/// Euclidean distance over the coordinates present in both rows, excluding
/// `skip`, scaled up by the share of coordinates that were usable.
fn nan_euclidean(a: &[Option<f64>], b: &[Option<f64>], skip: usize) -> f64 {
    let mut total = 0usize;
    let mut present = 0usize;
    let mut sum_sq = 0.0;

    for (i, (x, y)) in a.iter().zip(b).enumerate() {
        if i == skip {
            continue;
        }
        total += 1;
        if let (Some(x), Some(y)) = (x, y) {
            present += 1;
            sum_sq += (x - y).powi(2);
        }
    }

    if present == 0 {
        return f64::INFINITY;
    }
    (sum_sq * total as f64 / present as f64).sqrt()
}
