use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Columns of a daily price/volume table
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Field {
    Date,
    Open,
    High,
    Low,
    Close,
    Volume,
    ChangePct,
}

impl Field {
    /// Numeric columns in table order
    pub const NUMERIC: [Field; 6] = [
        Field::Open,
        Field::High,
        Field::Low,
        Field::Close,
        Field::Volume,
        Field::ChangePct,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            Field::Date => "Date",
            Field::Open => "Open",
            Field::High => "High",
            Field::Low => "Low",
            Field::Close => "Close",
            Field::Volume => "Volume",
            Field::ChangePct => "Change %",
        }
    }
}

impl FromStr for Field {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> anyhow::Result<Self> {
        match s.trim().to_lowercase().as_str() {
            "date" => Ok(Field::Date),
            "open" => Ok(Field::Open),
            "high" => Ok(Field::High),
            "low" => Ok(Field::Low),
            "close" | "price" => Ok(Field::Close),
            "volume" | "vol." | "vol" => Ok(Field::Volume),
            "change_pct" | "change %" | "change" => Ok(Field::ChangePct),
            _ => anyhow::bail!(
                "Invalid field: '{}'. Valid options: date, open, high, low, close, volume, change_pct",
                s
            ),
        }
    }
}

impl fmt::Display for Field {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// One raw cell as delivered by the feed.
///
/// CSV feeds only ever produce `Text`/`Missing`; JSON feeds may carry numbers,
/// which the normalizer passes through unchanged.
#[derive(Debug, Clone, PartialEq, Default, Deserialize)]
#[serde(untagged)]
pub enum RawField {
    Number(f64),
    Text(String),
    #[default]
    Missing,
}

impl RawField {
    pub fn text(s: impl Into<String>) -> Self {
        RawField::Text(s.into())
    }

    /// Rendering used in error messages
    pub fn display_value(&self) -> String {
        match self {
            RawField::Number(v) => v.to_string(),
            RawField::Text(s) => s.clone(),
            RawField::Missing => String::new(),
        }
    }
}

impl From<&str> for RawField {
    fn from(s: &str) -> Self {
        RawField::Text(s.to_string())
    }
}

impl From<f64> for RawField {
    fn from(v: f64) -> Self {
        RawField::Number(v)
    }
}

impl From<Option<String>> for RawField {
    fn from(v: Option<String>) -> Self {
        match v {
            Some(s) => RawField::Text(s),
            None => RawField::Missing,
        }
    }
}

/// One untyped row of the input table
#[derive(Debug, Clone, PartialEq)]
pub struct RawRecord {
    /// 1-based data row number in the source file
    pub row: usize,
    pub date: RawField,
    pub open: RawField,
    pub high: RawField,
    pub low: RawField,
    pub close: RawField,
    pub volume: RawField,
    pub change_pct: RawField,
}
