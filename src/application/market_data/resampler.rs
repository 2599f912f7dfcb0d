use crate::application::analysis::statistics::{mean, sample_std};
use crate::domain::analysis::aggregated::{AggregatedSeries, Bucket, ColumnStats};
use crate::domain::market::field::Field;
use crate::domain::market::granularity::{Aggregation, Granularity};
use crate::domain::market::observation::{Observation, TimeSeries};
use chrono::NaiveDate;
use std::collections::BTreeMap;
use tracing::debug;

/// Groups a daily series into calendar buckets
///
/// Buckets are labelled by their last day and laid out on a regular axis from
/// the first to the last observation. A bucket nobody fell into is kept with
/// `count = 0` and no statistics, so charts and period grouping stay aligned.
#[derive(Debug, Clone, Copy, Default)]
pub struct Resampler;

impl Resampler {
    pub fn new() -> Self {
        Self
    }

    pub fn resample(
        &self,
        series: &TimeSeries,
        granularity: Granularity,
        aggregation: Aggregation,
    ) -> AggregatedSeries {
        let (Some(first), Some(last)) = (series.first_date(), series.last_date()) else {
            return AggregatedSeries {
                granularity,
                aggregation,
                buckets: Vec::new(),
            };
        };

        let mut grouped: BTreeMap<NaiveDate, Vec<&Observation>> = BTreeMap::new();
        for observation in series.observations() {
            grouped
                .entry(granularity.bucket_end(observation.date))
                .or_default()
                .push(observation);
        }

        let last_end = granularity.bucket_end(last);
        let mut end = granularity.bucket_end(first);
        let mut buckets = Vec::new();
        let mut gaps = 0usize;

        while end <= last_end {
            let members = grouped.get(&end).map(Vec::as_slice).unwrap_or(&[]);
            if members.is_empty() {
                gaps += 1;
            }
            buckets.push(build_bucket(end, members, aggregation));
            end = granularity.next_bucket_end(end);
        }

        debug!(
            "Resampled {} observations into {} {} buckets ({} empty)",
            series.len(),
            buckets.len(),
            granularity,
            gaps
        );

        AggregatedSeries {
            granularity,
            aggregation,
            buckets,
        }
    }
}

fn build_bucket(end: NaiveDate, members: &[&Observation], aggregation: Aggregation) -> Bucket {
    let stats = Field::NUMERIC
        .iter()
        .map(|&field| {
            let values: Vec<f64> = members.iter().filter_map(|o| o.value(field)).collect();
            let column = ColumnStats {
                mean: mean(&values),
                std: if aggregation.includes_std() {
                    sample_std(&values)
                } else {
                    None
                },
            };
            (field, column)
        })
        .collect();

    Bucket {
        end,
        count: members.len(),
        stats,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::market::observation::PercentPoints;

    fn create_test_observation(date: NaiveDate, close: f64, volume: Option<f64>) -> Observation {
        Observation {
            date,
            open: close,
            high: close + 1.0,
            low: close - 1.0,
            close,
            volume,
            change_pct: PercentPoints(0.0),
        }
    }

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_monthly_mean_with_gap_month() {
        let series = TimeSeries::new(vec![
            create_test_observation(date(2024, 1, 10), 10.0, Some(100.0)),
            create_test_observation(date(2024, 1, 20), 20.0, Some(300.0)),
            // February has no rows
            create_test_observation(date(2024, 3, 5), 40.0, None),
        ])
        .unwrap();

        let aggregated = Resampler::new().resample(&series, Granularity::Month, Aggregation::Mean);

        assert_eq!(aggregated.len(), 3);
        let ends: Vec<NaiveDate> = aggregated.buckets.iter().map(|b| b.end).collect();
        assert_eq!(ends, vec![date(2024, 1, 31), date(2024, 2, 29), date(2024, 3, 31)]);

        assert_eq!(aggregated.buckets[0].mean(Field::Close), Some(15.0));
        assert_eq!(aggregated.buckets[0].mean(Field::Volume), Some(200.0));
        assert_eq!(aggregated.buckets[0].std(Field::Close), None);

        assert!(aggregated.buckets[1].is_empty());
        assert_eq!(aggregated.buckets[1].mean(Field::Close), None);

        assert_eq!(aggregated.buckets[2].mean(Field::Close), Some(40.0));
        assert_eq!(aggregated.buckets[2].mean(Field::Volume), None);
    }

    #[test]
    fn test_weekly_labels_end_on_sunday() {
        let series = TimeSeries::new(vec![
            create_test_observation(date(2024, 1, 1), 1.0, None), // Monday
            create_test_observation(date(2024, 1, 7), 2.0, None), // Sunday
            create_test_observation(date(2024, 1, 8), 3.0, None), // Monday
        ])
        .unwrap();

        let aggregated = Resampler::new().resample(&series, Granularity::Week, Aggregation::Mean);

        assert_eq!(aggregated.len(), 2);
        assert_eq!(aggregated.buckets[0].end, date(2024, 1, 7));
        assert_eq!(aggregated.buckets[0].count, 2);
        assert_eq!(aggregated.buckets[1].end, date(2024, 1, 14));
        assert_eq!(aggregated.buckets[1].period().week, 2);
    }

    #[test]
    fn test_mean_std_aggregation() {
        let series = TimeSeries::new(vec![
            create_test_observation(date(2023, 2, 1), 2.0, Some(1.0)),
            create_test_observation(date(2023, 6, 1), 4.0, Some(1.0)),
            create_test_observation(date(2023, 9, 1), 6.0, Some(1.0)),
        ])
        .unwrap();

        let aggregated = Resampler::new().resample(&series, Granularity::Year, Aggregation::MeanStd);

        assert_eq!(aggregated.len(), 1);
        let bucket = &aggregated.buckets[0];
        assert_eq!(bucket.end, date(2023, 12, 31));
        assert!((bucket.mean(Field::Close).unwrap() - 4.0).abs() < 1e-12);
        assert!((bucket.std(Field::Close).unwrap() - 2.0).abs() < 1e-12);
        assert!(bucket.std(Field::Volume).unwrap().abs() < 1e-12);

        let period = bucket.period();
        assert_eq!((period.year, period.month), (2023, 12));
    }

    #[test]
    fn test_empty_series() {
        let aggregated = Resampler::new().resample(&TimeSeries::default(), Granularity::Week, Aggregation::Mean);
        assert!(aggregated.is_empty());
    }
}
