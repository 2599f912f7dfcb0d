use anyhow::{Result, anyhow};
use chrono::{Datelike, Days, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Calendar bucket size used by the resampler
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Granularity {
    Week,
    Month,
    Year,
}

impl Granularity {
    /// Label of the bucket containing `date`.
    ///
    /// Buckets are labelled by their last day: the Sunday ending the week,
    /// the last day of the month, or 31 December.
    pub fn bucket_end(&self, date: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Week => {
                let days_to_sunday = 6 - date.weekday().num_days_from_monday();
                date + Days::new(days_to_sunday as u64)
            }
            Granularity::Month => month_end(date.year(), date.month()),
            Granularity::Year => NaiveDate::from_ymd_opt(date.year(), 12, 31).unwrap_or(date),
        }
    }

    /// Label of the bucket following the one labelled `end`
    pub fn next_bucket_end(&self, end: NaiveDate) -> NaiveDate {
        match self {
            Granularity::Week => end + Days::new(7),
            Granularity::Month | Granularity::Year => self.bucket_end(end + Days::new(1)),
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Granularity::Week => "week",
            Granularity::Month => "month",
            Granularity::Year => "year",
        }
    }
}

fn month_end(year: i32, month: u32) -> NaiveDate {
    let (next_year, next_month) = if month == 12 { (year + 1, 1) } else { (year, month + 1) };
    NaiveDate::from_ymd_opt(next_year, next_month, 1)
        .and_then(|d| d.pred_opt())
        .unwrap_or(NaiveDate::MAX)
}

impl FromStr for Granularity {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().as_str() {
            "w" | "week" | "weekly" => Ok(Granularity::Week),
            "m" | "month" | "monthly" => Ok(Granularity::Month),
            "y" | "year" | "yearly" | "annual" => Ok(Granularity::Year),
            _ => Err(anyhow!(
                "Invalid granularity: '{}'. Valid options: week, month, year",
                s
            )),
        }
    }
}

impl fmt::Display for Granularity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Statistics computed per bucket
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Aggregation {
    #[default]
    Mean,
    MeanStd,
}

impl Aggregation {
    pub fn includes_std(&self) -> bool {
        matches!(self, Aggregation::MeanStd)
    }
}

impl FromStr for Aggregation {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self> {
        match s.to_lowercase().replace(['+', '-'], "_").as_str() {
            "mean" => Ok(Aggregation::Mean),
            "mean_std" | "meanstd" => Ok(Aggregation::MeanStd),
            _ => Err(anyhow!(
                "Invalid aggregation: '{}'. Valid options: mean, mean_std",
                s
            )),
        }
    }
}
