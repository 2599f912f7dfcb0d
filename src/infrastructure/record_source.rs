//! File readers producing [`RawRecord`]s.
//!
//! Nothing is interpreted here: every cell is handed to the normalizer as
//! text (CSV) or as whatever scalar the JSON carried.

use crate::domain::market::field::{RawField, RawRecord};
use crate::domain::ports::RecordSource;
use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs::File;
use std::io::{BufReader, Read};
use std::path::{Path, PathBuf};
use tracing::info;

/// One CSV line under the feed's header names
#[derive(Debug, Deserialize)]
struct CsvRow {
    #[serde(rename = "Date", default)]
    date: Option<String>,
    #[serde(rename = "Price", alias = "Close", default)]
    close: Option<String>,
    #[serde(rename = "Open", default)]
    open: Option<String>,
    #[serde(rename = "High", default)]
    high: Option<String>,
    #[serde(rename = "Low", default)]
    low: Option<String>,
    #[serde(rename = "Vol.", alias = "Volume", default)]
    volume: Option<String>,
    #[serde(rename = "Change %", alias = "Change", default)]
    change_pct: Option<String>,
}

/// One JSON object; values may be strings, numbers or null
#[derive(Debug, Deserialize)]
struct JsonRow {
    #[serde(rename = "Date", alias = "date", default)]
    date: RawField,
    #[serde(rename = "Price", alias = "Close", alias = "close", alias = "price", default)]
    close: RawField,
    #[serde(rename = "Open", alias = "open", default)]
    open: RawField,
    #[serde(rename = "High", alias = "high", default)]
    high: RawField,
    #[serde(rename = "Low", alias = "low", default)]
    low: RawField,
    #[serde(rename = "Vol.", alias = "Volume", alias = "volume", default)]
    volume: RawField,
    #[serde(rename = "Change %", alias = "Change", alias = "change_pct", default)]
    change_pct: RawField,
}

/// Parse CSV rows; row numbers count data lines from 1
pub fn read_csv_records<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .flexible(true)
        .from_reader(reader);

    let mut records = Vec::new();
    for (i, result) in rdr.deserialize::<CsvRow>().enumerate() {
        let row = i + 1;
        let line: CsvRow = result.context(format!("Failed to read CSV row {}", row))?;
        records.push(RawRecord {
            row,
            date: line.date.into(),
            open: line.open.into(),
            high: line.high.into(),
            low: line.low.into(),
            close: line.close.into(),
            volume: line.volume.into(),
            change_pct: line.change_pct.into(),
        });
    }
    Ok(records)
}

/// Parse a JSON array of row objects
pub fn read_json_records<R: Read>(reader: R) -> Result<Vec<RawRecord>> {
    let rows: Vec<JsonRow> =
        serde_json::from_reader(reader).context("Failed to parse JSON records")?;

    Ok(rows
        .into_iter()
        .enumerate()
        .map(|(i, r)| RawRecord {
            row: i + 1,
            date: r.date,
            open: r.open,
            high: r.high,
            low: r.low,
            close: r.close,
            volume: r.volume,
            change_pct: r.change_pct,
        })
        .collect())
}

pub struct CsvRecordSource {
    path: PathBuf,
}

impl CsvRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for CsvRecordSource {
    fn read_records(&self) -> Result<Vec<RawRecord>> {
        let file = File::open(&self.path)
            .context(format!("Failed to open input file: {}", self.path.display()))?;
        let records = read_csv_records(BufReader::new(file))?;
        info!("Read {} CSV rows from {:?}", records.len(), self.path);
        Ok(records)
    }
}

pub struct JsonRecordSource {
    path: PathBuf,
}

impl JsonRecordSource {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl RecordSource for JsonRecordSource {
    fn read_records(&self) -> Result<Vec<RawRecord>> {
        let file = File::open(&self.path)
            .context(format!("Failed to open input file: {}", self.path.display()))?;
        let records = read_json_records(BufReader::new(file))?;
        info!("Read {} JSON rows from {:?}", records.len(), self.path);
        Ok(records)
    }
}

/// Pick a reader from the file extension; anything but `.json` is CSV
pub fn source_for(path: &Path) -> Box<dyn RecordSource> {
    let is_json = path
        .extension()
        .and_then(|e| e.to_str())
        .is_some_and(|e| e.eq_ignore_ascii_case("json"));

    if is_json {
        Box::new(JsonRecordSource::new(path))
    } else {
        Box::new(CsvRecordSource::new(path))
    }
}

pub fn load_records(path: impl AsRef<Path>) -> Result<Vec<RawRecord>> {
    source_for(path.as_ref()).read_records()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_csv_feed_headers() {
        let data = "\"Date\",\"Price\",\"Open\",\"High\",\"Low\",\"Vol.\",\"Change %\"\n\
                    \"01/03/2024\",\"1,234.50\",\"1,230.00\",\"1,240.00\",\"1,225.00\",\"1.2K\",\"0.36%\"\n\
                    \"01/02/2024\",\"1,230.10\",\"1,220.00\",\"1,235.00\",\"1,219.00\",\"\",\"-0.10%\"\n";

        let records = read_csv_records(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].row, 1);
        assert_eq!(records[0].close, RawField::text("1,234.50"));
        assert_eq!(records[0].volume, RawField::text("1.2K"));
        assert_eq!(records[1].volume, RawField::Missing);
        assert_eq!(records[1].change_pct, RawField::text("-0.10%"));
    }

    #[test]
    fn test_csv_alias_headers() {
        let data = "Date,Close,Open,High,Low,Volume,Change\n01/02/2024,10,9,11,8,3M,1.5%\n";
        let records = read_csv_records(data.as_bytes()).unwrap();
        assert_eq!(records[0].close, RawField::text("10"));
        assert_eq!(records[0].volume, RawField::text("3M"));
        assert_eq!(records[0].change_pct, RawField::text("1.5%"));
    }

    #[test]
    fn test_json_numbers_and_strings() {
        let data = r#"[
            {"Date": "01/02/2024", "Price": 101.5, "Open": "100.0", "High": 102, "Low": 99.5, "Vol.": "2.5M", "Change %": "1.50%"},
            {"Date": "01/03/2024", "Price": 100.0, "Open": 101.5, "High": 101.5, "Low": 99.0, "Vol.": null, "Change %": -1.48}
        ]"#;

        let records = read_json_records(data.as_bytes()).unwrap();
        assert_eq!(records.len(), 2);
        assert_eq!(records[0].close, RawField::Number(101.5));
        assert_eq!(records[0].open, RawField::text("100.0"));
        assert_eq!(records[1].volume, RawField::Missing);
        assert_eq!(records[1].change_pct, RawField::Number(-1.48));
        assert_eq!(records[1].row, 2);
    }

    #[test]
    fn test_json_must_be_an_array() {
        assert!(read_json_records("{\"Date\": 1}".as_bytes()).is_err());
    }

    #[test]
    fn test_missing_file() {
        let err = load_records("/no/such/prices.csv").unwrap_err();
        assert!(err.to_string().contains("Failed to open input file"));
    }
}
