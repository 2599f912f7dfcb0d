use crate::domain::errors::ParseError;
use crate::domain::market::field::Field;
use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

/// A percentage in percentage points: `-1.25` means -1.25 %.
///
/// The feed's change column is kept in this unit end to end. Callers that
/// need a fraction must ask for it with [`PercentPoints::as_fraction`].
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PercentPoints(pub f64);

impl PercentPoints {
    pub fn value(&self) -> f64 {
        self.0
    }

    pub fn as_fraction(&self) -> f64 {
        self.0 / 100.0
    }
}

/// One cleaned daily row
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Observation {
    pub date: NaiveDate,
    pub open: f64,
    pub high: f64,
    pub low: f64,
    pub close: f64,
    /// `None` until imputed
    pub volume: Option<f64>,
    pub change_pct: PercentPoints,
}

impl Observation {
    /// Value of a numeric column; `None` for a missing volume or for `Field::Date`
    pub fn value(&self, field: Field) -> Option<f64> {
        match field {
            Field::Date => None,
            Field::Open => Some(self.open),
            Field::High => Some(self.high),
            Field::Low => Some(self.low),
            Field::Close => Some(self.close),
            Field::Volume => self.volume,
            Field::ChangePct => Some(self.change_pct.value()),
        }
    }
}

/// Date-ordered sequence of observations.
///
/// # Invariants
///
/// - dates strictly increase (no duplicates)
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct TimeSeries {
    observations: Vec<Observation>,
}

impl TimeSeries {
    /// Build a series from rows that are already in ascending date order
    pub fn new(observations: Vec<Observation>) -> Result<Self, ParseError> {
        for (i, pair) in observations.windows(2).enumerate() {
            if pair[1].date <= pair[0].date {
                return Err(ParseError::invalid(
                    i + 2,
                    Field::Date,
                    pair[1].date.to_string(),
                    format!("date is not after previous date {}", pair[0].date),
                ));
            }
        }
        Ok(Self { observations })
    }

    pub fn observations(&self) -> &[Observation] {
        &self.observations
    }

    pub fn len(&self) -> usize {
        self.observations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.observations.is_empty()
    }

    pub fn dates(&self) -> Vec<NaiveDate> {
        self.observations.iter().map(|o| o.date).collect()
    }

    pub fn closes(&self) -> Vec<f64> {
        self.observations.iter().map(|o| o.close).collect()
    }

    /// Column values, `None` where missing
    pub fn column(&self, field: Field) -> Vec<Option<f64>> {
        self.observations.iter().map(|o| o.value(field)).collect()
    }

    /// Row-major matrix of every numeric column, in [`Field::NUMERIC`] order
    pub fn numeric_matrix(&self) -> Vec<Vec<Option<f64>>> {
        self.observations
            .iter()
            .map(|o| Field::NUMERIC.iter().map(|&f| o.value(f)).collect())
            .collect()
    }

    /// New series with the volume column replaced
    pub fn with_volumes(&self, volumes: &[f64]) -> Self {
        let observations = self
            .observations
            .iter()
            .zip(volumes)
            .map(|(o, &v)| Observation {
                volume: Some(v),
                ..o.clone()
            })
            .collect();
        Self { observations }
    }

    pub fn first_date(&self) -> Option<NaiveDate> {
        self.observations.first().map(|o| o.date)
    }

    pub fn last_date(&self) -> Option<NaiveDate> {
        self.observations.last().map(|o| o.date)
    }
}
