use crate::domain::errors::ParseError;
use crate::domain::market::field::{Field, RawField, RawRecord};
use crate::domain::market::observation::{Observation, PercentPoints, TimeSeries};
use crate::domain::market::volume::VolumeToken;
use chrono::NaiveDate;
use std::collections::HashMap;
use tracing::{debug, info, warn};

/// Date layout used by the price feed (month/day/year)
pub const DATE_FORMAT: &str = "%m/%d/%Y";

/// Placeholder the feed writes for an unknown volume
const MISSING_VOLUME_MARKER: &str = "-";

/// Accepted rows plus every row that was rejected and why
#[derive(Debug, Clone, PartialEq)]
pub struct NormalizedBatch {
    pub series: TimeSeries,
    pub rejected: Vec<ParseError>,
}

/// Converts raw string-typed rows into a date-ordered [`TimeSeries`]
#[derive(Debug, Clone, Default)]
pub struct FieldNormalizer {
    /// Abort on the first malformed row instead of rejecting it
    pub strict: bool,
}

impl FieldNormalizer {
    pub fn new(strict: bool) -> Self {
        Self { strict }
    }

    /// Normalize every record, sort by date and re-index.
    ///
    /// In lenient mode malformed rows are dropped and returned in
    /// `rejected`; in strict mode the first malformed row is returned as the
    /// error.
    pub fn normalize(&self, records: &[RawRecord]) -> Result<NormalizedBatch, ParseError> {
        let mut parsed: Vec<(usize, Observation)> = Vec::with_capacity(records.len());
        let mut rejected = Vec::new();

        for record in records {
            match normalize_record(record) {
                Ok(observation) => parsed.push((record.row, observation)),
                Err(e) => {
                    if self.strict {
                        return Err(e);
                    }
                    warn!("Rejected input row: {}", e);
                    rejected.push(e);
                }
            }
        }

        // Stable sort keeps source order among equal dates, so the first row wins
        parsed.sort_by_key(|(_, o)| o.date);

        let mut seen: HashMap<NaiveDate, usize> = HashMap::with_capacity(parsed.len());
        let mut observations = Vec::with_capacity(parsed.len());
        for (row, observation) in parsed {
            if let Some(&first_row) = seen.get(&observation.date) {
                let e = ParseError::DuplicateDate {
                    date: observation.date,
                    first_row,
                    row,
                };
                if self.strict {
                    return Err(e);
                }
                warn!("Rejected input row: {}", e);
                rejected.push(e);
                continue;
            }
            seen.insert(observation.date, row);
            observations.push(observation);
        }

        let series = TimeSeries::new(observations)?;
        info!(
            "Normalized {} rows ({} rejected), {} -> {}",
            series.len(),
            rejected.len(),
            series.first_date().map(|d| d.to_string()).unwrap_or_default(),
            series.last_date().map(|d| d.to_string()).unwrap_or_default(),
        );

        Ok(NormalizedBatch { series, rejected })
    }
}

/// Parse one raw row into an [`Observation`]
pub fn normalize_record(record: &RawRecord) -> Result<Observation, ParseError> {
    let row = record.row;
    let observation = Observation {
        date: parse_date(row, &record.date)?,
        open: parse_price(row, Field::Open, &record.open)?,
        high: parse_price(row, Field::High, &record.high)?,
        low: parse_price(row, Field::Low, &record.low)?,
        close: parse_price(row, Field::Close, &record.close)?,
        volume: parse_volume(row, &record.volume)?,
        change_pct: parse_percent(row, &record.change_pct)?,
    };
    debug!("Row {} -> {}", row, observation.date);
    Ok(observation)
}

/// Parse a `%m/%d/%Y` date
pub fn parse_date(row: usize, raw: &RawField) -> Result<NaiveDate, ParseError> {
    match raw {
        RawField::Text(s) => NaiveDate::parse_from_str(s.trim(), DATE_FORMAT).map_err(|e| {
            ParseError::invalid(row, Field::Date, s.as_str(), format!("expected MM/DD/YYYY ({})", e))
        }),
        other => Err(ParseError::invalid(
            row,
            Field::Date,
            other.display_value(),
            "expected a MM/DD/YYYY string",
        )),
    }
}

/// Parse a price, ignoring thousands separators
pub fn parse_price(row: usize, field: Field, raw: &RawField) -> Result<f64, ParseError> {
    let value = match raw {
        RawField::Number(v) => *v,
        RawField::Text(s) => {
            let cleaned: String = s.trim().chars().filter(|c| *c != ',').collect();
            cleaned
                .parse::<f64>()
                .map_err(|_| ParseError::invalid(row, field, s.as_str(), "not a number"))?
        }
        RawField::Missing => {
            return Err(ParseError::invalid(row, field, "", "missing value"));
        }
    };

    if !value.is_finite() || value < 0.0 {
        return Err(ParseError::invalid(
            row,
            field,
            raw.display_value(),
            "price must be a finite non-negative number",
        ));
    }
    Ok(value)
}

/// Parse a percent change, keeping percentage-point units
pub fn parse_percent(row: usize, raw: &RawField) -> Result<PercentPoints, ParseError> {
    let value = match raw {
        RawField::Number(v) => *v,
        RawField::Text(s) => {
            let trimmed = s.trim();
            let stripped = trimmed.strip_suffix('%').unwrap_or(trimmed);
            let cleaned: String = stripped.trim().chars().filter(|c| *c != ',').collect();
            cleaned
                .parse::<f64>()
                .map_err(|_| ParseError::invalid(row, Field::ChangePct, s.as_str(), "not a percentage"))?
        }
        RawField::Missing => {
            return Err(ParseError::invalid(row, Field::ChangePct, "", "missing value"));
        }
    };

    if !value.is_finite() {
        return Err(ParseError::invalid(
            row,
            Field::ChangePct,
            raw.display_value(),
            "percentage must be finite",
        ));
    }
    Ok(PercentPoints(value))
}

/// Parse a volume; `Ok(None)` marks a missing observation
pub fn parse_volume(row: usize, raw: &RawField) -> Result<Option<f64>, ParseError> {
    match raw {
        RawField::Number(v) => {
            if !v.is_finite() || *v < 0.0 {
                return Err(ParseError::invalid(
                    row,
                    Field::Volume,
                    v.to_string(),
                    "volume must be a finite non-negative number",
                ));
            }
            Ok(Some(*v))
        }
        RawField::Text(s) => {
            let trimmed = s.trim();
            if trimmed.is_empty() || trimmed == MISSING_VOLUME_MARKER {
                return Ok(None);
            }
            VolumeToken::parse(trimmed)
                .map(|token| Some(token.resolve()))
                .map_err(|reason| ParseError::invalid(row, Field::Volume, s.as_str(), reason))
        }
        RawField::Missing => Ok(None),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn record(row: usize, date: &str, close: &str, volume: &str) -> RawRecord {
        RawRecord {
            row,
            date: date.into(),
            open: close.into(),
            high: close.into(),
            low: close.into(),
            close: close.into(),
            volume: volume.into(),
            change_pct: "0.50%".into(),
        }
    }

    #[test]
    fn test_parse_price_strips_thousands_separator() {
        assert_eq!(parse_price(1, Field::Close, &"16,625.10".into()).unwrap(), 16625.1);
        assert_eq!(parse_price(1, Field::Close, &RawField::Number(42.0)).unwrap(), 42.0);
        assert!(parse_price(1, Field::Close, &"n/a".into()).is_err());
        assert!(parse_price(1, Field::Close, &RawField::Missing).is_err());
        assert!(parse_price(1, Field::Close, &"-5".into()).is_err());
    }

    #[test]
    fn test_parse_percent_keeps_points() {
        assert_eq!(parse_percent(1, &"-1.25%".into()).unwrap(), PercentPoints(-1.25));
        assert_eq!(parse_percent(1, &"3.00 %".into()).unwrap(), PercentPoints(3.0));
        assert_eq!(parse_percent(1, &RawField::Number(0.7)).unwrap(), PercentPoints(0.7));
        assert!(parse_percent(1, &"abc%".into()).is_err());
    }

    #[test]
    fn test_parse_volume_variants() {
        assert!((parse_volume(1, &"1.2K".into()).unwrap().unwrap() - 1200.0).abs() < 1e-9);
        assert_eq!(parse_volume(1, &"3M".into()).unwrap(), Some(3_000_000.0));
        assert_eq!(parse_volume(1, &"500".into()).unwrap(), Some(500.0));
        assert_eq!(parse_volume(1, &RawField::Number(777.0)).unwrap(), Some(777.0));
        assert_eq!(parse_volume(1, &"-".into()).unwrap(), None);
        assert_eq!(parse_volume(1, &"".into()).unwrap(), None);
        assert_eq!(parse_volume(1, &RawField::Missing).unwrap(), None);
        assert!(parse_volume(1, &"12Q".into()).is_err());
    }

    #[test]
    fn test_parse_date_format() {
        assert_eq!(
            parse_date(1, &"03/14/2021".into()).unwrap(),
            NaiveDate::from_ymd_opt(2021, 3, 14).unwrap()
        );
        assert!(parse_date(1, &"2021-03-14".into()).is_err());
        assert!(parse_date(1, &"14/03/2021".into()).is_err());
        assert!(parse_date(1, &RawField::Number(20210314.0)).is_err());
    }

    #[test]
    fn test_normalize_sorts_ascending() {
        let records = vec![
            record(1, "01/03/2022", "102", "1K"),
            record(2, "01/02/2022", "101", "1K"),
            record(3, "01/01/2022", "100", "1K"),
        ];

        let batch = FieldNormalizer::new(false).normalize(&records).unwrap();
        assert!(batch.rejected.is_empty());
        assert_eq!(batch.series.closes(), vec![100.0, 101.0, 102.0]);
        for pair in batch.series.observations().windows(2) {
            assert!(pair[0].date < pair[1].date);
        }
    }

    #[test]
    fn test_normalize_rejects_bad_row_with_identifier() {
        let records = vec![
            record(1, "01/01/2022", "100", "1K"),
            record(2, "01/02/2022", "oops", "1K"),
            record(3, "01/03/2022", "102", "1K"),
        ];

        let batch = FieldNormalizer::new(false).normalize(&records).unwrap();
        assert_eq!(batch.series.len(), 2);
        assert_eq!(batch.rejected.len(), 1);
        match &batch.rejected[0] {
            ParseError::InvalidField { row, field, .. } => {
                assert_eq!(*row, 2);
                assert_eq!(*field, Field::Open);
            }
            other => panic!("unexpected error: {:?}", other),
        }
    }

    #[test]
    fn test_strict_mode_aborts() {
        let records = vec![
            record(1, "01/01/2022", "100", "1K"),
            record(2, "2022-01-02", "101", "1K"),
        ];

        let err = FieldNormalizer::new(true).normalize(&records).unwrap_err();
        assert_eq!(err.row(), 2);
    }

    #[test]
    fn test_duplicate_dates_rejected() {
        let records = vec![
            record(1, "01/01/2022", "100", "1K"),
            record(2, "01/02/2022", "101", "1K"),
            record(3, "01/01/2022", "999", "1K"),
        ];

        let batch = FieldNormalizer::new(false).normalize(&records).unwrap();
        assert_eq!(batch.series.closes(), vec![100.0, 101.0]);
        assert_eq!(
            batch.rejected,
            vec![ParseError::DuplicateDate {
                date: NaiveDate::from_ymd_opt(2022, 1, 1).unwrap(),
                first_row: 1,
                row: 3,
            }]
        );

        assert!(FieldNormalizer::new(true).normalize(&records).is_err());
    }
}
