use crate::application::pipeline::PipelineOutput;
use crate::domain::analysis::aggregated::AggregatedSeries;
use crate::domain::analysis::decomposition::DecompositionResult;
use crate::domain::market::field::Field;
use crate::domain::ports::DatasetSink;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::fs::File;
use std::io::{BufWriter, Write};
use std::path::PathBuf;
use tracing::info;

const OUTPUT_DATE_FORMAT: &str = "%Y-%m-%d";

fn cell(value: Option<f64>) -> String {
    value.map(|v| v.to_string()).unwrap_or_default()
}

/// Cleaned series plus `R_j`, `A_t` and one `σ_<w>` column per window.
///
/// Derived columns are left empty when the return calculation failed.
pub fn write_dataset_csv<W: Write>(writer: W, output: &PipelineOutput) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let returns = output.returns.completed();
    let windows: Vec<usize> = output.config.volatility_windows.clone();

    let mut header: Vec<String> = [
        "date", "open", "high", "low", "close", "volume", "change_pct", "R_j", "A_t",
    ]
    .iter()
    .map(|s| s.to_string())
    .collect();
    header.extend(windows.iter().map(|w| format!("σ_{}", w)));
    wtr.write_record(&header)?;

    for (t, o) in output.series.observations().iter().enumerate() {
        let mut record = vec![
            o.date.format(OUTPUT_DATE_FORMAT).to_string(),
            o.open.to_string(),
            o.high.to_string(),
            o.low.to_string(),
            o.close.to_string(),
            cell(o.volume),
            o.change_pct.value().to_string(),
            cell(returns.and_then(|r| r.returns.get(t).copied())),
            cell(returns.and_then(|r| r.cumulative.get(t).copied())),
        ];
        for w in &windows {
            let sigma = returns
                .and_then(|r| r.volatility.get(w))
                .and_then(|v| v.get(t).copied().flatten());
            record.push(cell(sigma));
        }
        wtr.write_record(&record)?;
    }

    wtr.flush().context("Failed to flush dataset CSV")?;
    Ok(())
}

/// One line per bucket; `<column>_std` columns only with mean+std aggregation
pub fn write_aggregated_csv<W: Write>(writer: W, aggregated: &AggregatedSeries) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    let with_std = aggregated.aggregation.includes_std();

    let mut header = vec![
        "period_end".to_string(),
        "year".to_string(),
        "month".to_string(),
        "week".to_string(),
        "count".to_string(),
    ];
    for field in Field::NUMERIC {
        let name = column_name(field);
        header.push(format!("{}_mean", name));
        if with_std {
            header.push(format!("{}_std", name));
        }
    }
    wtr.write_record(&header)?;

    for bucket in &aggregated.buckets {
        let period = bucket.period();
        let mut record = vec![
            bucket.end.format(OUTPUT_DATE_FORMAT).to_string(),
            period.year.to_string(),
            period.month.to_string(),
            period.week.to_string(),
            bucket.count.to_string(),
        ];
        for field in Field::NUMERIC {
            record.push(cell(bucket.mean(field)));
            if with_std {
                record.push(cell(bucket.std(field)));
            }
        }
        wtr.write_record(&record)?;
    }

    wtr.flush().context("Failed to flush aggregated CSV")?;
    Ok(())
}

pub fn write_decomposition_csv<W: Write>(
    writer: W,
    dates: &[NaiveDate],
    decomposition: &DecompositionResult,
) -> Result<()> {
    let mut wtr = csv::Writer::from_writer(writer);
    wtr.write_record(["date", "observed", "trend", "seasonal", "residual"])?;

    for (t, date) in dates.iter().enumerate().take(decomposition.len()) {
        wtr.write_record([
            date.format(OUTPUT_DATE_FORMAT).to_string(),
            decomposition.observed[t].to_string(),
            cell(decomposition.trend[t]),
            decomposition.seasonal[t].to_string(),
            cell(decomposition.residual[t]),
        ])?;
    }

    wtr.flush().context("Failed to flush decomposition CSV")?;
    Ok(())
}

fn column_name(field: Field) -> &'static str {
    match field {
        Field::Date => "date",
        Field::Open => "open",
        Field::High => "high",
        Field::Low => "low",
        Field::Close => "close",
        Field::Volume => "volume",
        Field::ChangePct => "change_pct",
    }
}

pub fn create_output(path: &std::path::Path) -> Result<BufWriter<File>> {
    let file = File::create(path).context(format!("Failed to create output file: {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Writes the cleaned dataset as CSV
pub struct CsvDatasetWriter {
    path: PathBuf,
}

impl CsvDatasetWriter {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

impl DatasetSink for CsvDatasetWriter {
    fn write_dataset(&self, output: &PipelineOutput) -> Result<()> {
        write_dataset_csv(create_output(&self.path)?, output)?;
        info!("Wrote {} rows to {:?}", output.series.len(), self.path);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::domain::analysis::aggregated::{Bucket, ColumnStats};
    use crate::domain::market::granularity::{Aggregation, Granularity};
    use std::collections::BTreeMap;

    fn bucket(end: NaiveDate, count: usize, close: Option<f64>) -> Bucket {
        let mut stats = BTreeMap::new();
        for field in Field::NUMERIC {
            stats.insert(field, ColumnStats::default());
        }
        stats.insert(
            Field::Close,
            ColumnStats {
                mean: close,
                std: close.map(|_| 0.5),
            },
        );
        Bucket { end, count, stats }
    }

    #[test]
    fn test_aggregated_csv_layout() {
        let aggregated = AggregatedSeries {
            granularity: Granularity::Month,
            aggregation: Aggregation::MeanStd,
            buckets: vec![
                bucket(NaiveDate::from_ymd_opt(2024, 1, 31).unwrap(), 3, Some(10.5)),
                bucket(NaiveDate::from_ymd_opt(2024, 2, 29).unwrap(), 0, None),
            ],
        };

        let mut buf = Vec::new();
        write_aggregated_csv(&mut buf, &aggregated).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines.len(), 3);
        assert!(lines[0].starts_with("period_end,year,month,week,count,open_mean,open_std"));
        assert!(lines[1].starts_with("2024-01-31,2024,1,5,3,"));
        assert!(lines[1].contains(",10.5,0.5,"));
        assert!(lines[2].starts_with("2024-02-29,2024,2,9,0,"));
    }

    #[test]
    fn test_decomposition_csv_blanks_undefined_trend() {
        let decomposition = DecompositionResult {
            period: 2,
            observed: vec![1.0, 2.0, 3.0],
            trend: vec![None, Some(2.0), None],
            seasonal: vec![0.0, 0.0, 0.0],
            residual: vec![None, Some(0.0), None],
        };
        let dates: Vec<NaiveDate> = (1..=3)
            .map(|d| NaiveDate::from_ymd_opt(2024, 3, d).unwrap())
            .collect();

        let mut buf = Vec::new();
        write_decomposition_csv(&mut buf, &dates, &decomposition).unwrap();
        let text = String::from_utf8(buf).unwrap();
        let lines: Vec<&str> = text.lines().collect();

        assert_eq!(lines[0], "date,observed,trend,seasonal,residual");
        assert_eq!(lines[1], "2024-03-01,1,,0,");
        assert_eq!(lines[2], "2024-03-02,2,2,0,0");
    }
}
