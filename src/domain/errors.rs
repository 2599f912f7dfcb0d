use crate::domain::market::field::Field;
use chrono::NaiveDate;
use serde::Serialize;
use thiserror::Error;

/// Errors raised while turning raw feed rows into typed observations.
///
/// A parse error is fatal for its row only: the row is rejected, never coerced.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
pub enum ParseError {
    #[error("Row {row}: invalid {field} value '{value}': {reason}")]
    InvalidField {
        row: usize,
        field: Field,
        value: String,
        reason: String,
    },

    #[error("Row {row}: duplicate date {date} (first seen at row {first_row})")]
    DuplicateDate {
        date: NaiveDate,
        first_row: usize,
        row: usize,
    },
}

impl ParseError {
    pub fn invalid(row: usize, field: Field, value: impl Into<String>, reason: impl Into<String>) -> Self {
        ParseError::InvalidField {
            row,
            field,
            value: value.into(),
            reason: reason.into(),
        }
    }

    /// Source row the error refers to
    pub fn row(&self) -> usize {
        match self {
            ParseError::InvalidField { row, .. } => *row,
            ParseError::DuplicateDate { row, .. } => *row,
        }
    }
}

/// Errors raised by the statistical stages.
///
/// These are caught per test / per request and reported next to the
/// successful results; they never abort a whole report.
#[derive(Debug, Clone, Error, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum AnalysisError {
    #[error("Insufficient data for {operation}: need {required} observations, got {actual}")]
    InsufficientData {
        operation: String,
        required: usize,
        actual: usize,
    },

    #[error("Degenerate series for {operation}: {reason}")]
    DegenerateSeries { operation: String, reason: String },

    #[error("Invalid parameter: {name} = {value}")]
    InvalidParameter { name: String, value: String },
}

impl AnalysisError {
    pub fn insufficient(operation: &str, required: usize, actual: usize) -> Self {
        AnalysisError::InsufficientData {
            operation: operation.to_string(),
            required,
            actual,
        }
    }

    pub fn degenerate(operation: &str, reason: impl Into<String>) -> Self {
        AnalysisError::DegenerateSeries {
            operation: operation.to_string(),
            reason: reason.into(),
        }
    }

    pub fn invalid_parameter(name: &str, value: impl ToString) -> Self {
        AnalysisError::InvalidParameter {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_error_formatting() {
        let err = ParseError::invalid(12, Field::Volume, "1.2X", "unknown unit suffix 'X'");

        let msg = err.to_string();
        assert!(msg.contains("Row 12"));
        assert!(msg.contains("Volume"));
        assert!(msg.contains("1.2X"));
        assert_eq!(err.row(), 12);
    }

    #[test]
    fn test_duplicate_date_formatting() {
        let err = ParseError::DuplicateDate {
            date: NaiveDate::from_ymd_opt(2021, 3, 14).unwrap(),
            first_row: 2,
            row: 9,
        };

        let msg = err.to_string();
        assert!(msg.contains("2021-03-14"));
        assert!(msg.contains("row 2"));
        assert_eq!(err.row(), 9);
    }

    #[test]
    fn test_analysis_error_formatting() {
        let err = AnalysisError::insufficient("seasonal_decompose", 360, 120);

        let msg = err.to_string();
        assert!(msg.contains("seasonal_decompose"));
        assert!(msg.contains("360"));
        assert!(msg.contains("120"));
    }
}
