use crate::domain::market::field::Field;
use crate::domain::market::granularity::{Aggregation, Granularity};
use chrono::{Datelike, NaiveDate};
use serde::Serialize;
use std::collections::BTreeMap;

/// Per-column statistics of one bucket
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ColumnStats {
    pub mean: Option<f64>,
    /// Sample standard deviation, only with [`Aggregation::MeanStd`]
    pub std: Option<f64>,
}

/// Calendar fields extracted from a bucket label
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PeriodLabel {
    pub year: i32,
    pub month: u32,
    pub week: u32,
}

/// One resampling bucket, labelled by its last calendar day
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Bucket {
    pub end: NaiveDate,
    /// Observations that fell in the bucket; 0 for an explicit gap
    pub count: usize,
    pub stats: BTreeMap<Field, ColumnStats>,
}

impl Bucket {
    pub fn is_empty(&self) -> bool {
        self.count == 0
    }

    pub fn mean(&self, field: Field) -> Option<f64> {
        self.stats.get(&field).and_then(|s| s.mean)
    }

    pub fn std(&self, field: Field) -> Option<f64> {
        self.stats.get(&field).and_then(|s| s.std)
    }

    /// Year, month and ISO week number of the bucket end
    pub fn period(&self) -> PeriodLabel {
        PeriodLabel {
            year: self.end.year(),
            month: self.end.month(),
            week: self.end.iso_week().week(),
        }
    }
}

/// Regular calendar-bucketed view of a [`TimeSeries`](crate::domain::market::TimeSeries)
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AggregatedSeries {
    pub granularity: Granularity,
    pub aggregation: Aggregation,
    pub buckets: Vec<Bucket>,
}

impl AggregatedSeries {
    pub fn len(&self) -> usize {
        self.buckets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.buckets.is_empty()
    }
}
