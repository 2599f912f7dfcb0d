//! tsprep - time-series preprocessing and stationarity analysis
//!
//! # Usage
//! ```sh
//! tsprep clean --input prices.csv --output clean.csv --report report.json
//! tsprep analyze --input prices.csv
//! tsprep resample --input prices.csv --granularity week --std --output weekly.csv
//! tsprep decompose --input prices.csv --period 30 --output decomposition.csv
//! ```
//!
//! Settings come from `TSPREP_*` environment variables (or `.env`), then an
//! optional `--config` TOML file, then command-line flags.

use anyhow::{Context, Result, bail};
use clap::{Parser, Subcommand};
use std::path::{Path, PathBuf};
use tracing::info;
use tracing_subscriber::prelude::*;
use tsprep::application::analysis::transformer::seasonal_decompose;
use tsprep::application::pipeline::{Pipeline, analysis_values};
use tsprep::config::resolve_config;
use tsprep::domain::config::PipelineConfig;
use tsprep::domain::market::field::Field;
use tsprep::domain::market::granularity::{Aggregation, Granularity};
use tsprep::domain::ports::DatasetSink;
use tsprep::infrastructure::dataset_writer::{create_output, write_aggregated_csv, write_decomposition_csv};
use tsprep::infrastructure::report_writer::report_json;
use tsprep::infrastructure::{CsvDatasetWriter, JsonReportWriter, load_records};

#[derive(Parser)]
#[command(author, version, about = "Time-series preprocessing and stationarity analysis", long_about = None)]
struct Cli {
    /// TOML file with pipeline settings
    #[arg(short, long, global = true)]
    config: Option<PathBuf>,

    /// Abort on the first malformed row
    #[arg(long, global = true)]
    strict: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the full pipeline and write the cleaned dataset
    Clean {
        /// Input file (.csv or .json)
        #[arg(short, long)]
        input: PathBuf,

        /// Output CSV
        #[arg(short, long)]
        output: PathBuf,

        /// Optional JSON report
        #[arg(short, long)]
        report: Option<PathBuf>,
    },
    /// Print stationarity reports as JSON
    Analyze {
        #[arg(short, long)]
        input: PathBuf,

        /// Column to analyse (open, high, low, close, volume, change_pct)
        #[arg(short, long)]
        field: Option<String>,
    },
    /// Aggregate into weekly, monthly or yearly buckets
    Resample {
        #[arg(short, long)]
        input: PathBuf,

        /// week, month or year
        #[arg(short, long)]
        granularity: Option<String>,

        /// Add sample standard deviations
        #[arg(long)]
        std: bool,

        #[arg(short, long)]
        output: PathBuf,
    },
    /// Additive seasonal decomposition of the analysis column
    Decompose {
        #[arg(short, long)]
        input: PathBuf,

        /// Season length in observations
        #[arg(short, long)]
        period: Option<usize>,

        #[arg(short, long)]
        output: PathBuf,
    },
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .with(
            tracing_subscriber::fmt::layer()
                .with_target(false)
                .with_writer(std::io::stderr),
        )
        .init();

    let cli = Cli::parse();
    let mut config = resolve_config(cli.config.as_deref())?;
    if cli.strict {
        config.strict_parsing = true;
    }

    match cli.command {
        Commands::Clean {
            input,
            output,
            report,
        } => {
            let pipeline = Pipeline::new(config)?;
            let records = load_records(&input)?;
            let result = pipeline.run(&records)?;

            CsvDatasetWriter::new(&output).write_dataset(&result)?;
            if let Some(report) = report {
                JsonReportWriter::new(report).write_dataset(&result)?;
            }
            info!(
                "Cleaned {} rows ({} rejected) into {:?}",
                result.series.len(),
                result.rejected.len(),
                output
            );
        }
        Commands::Analyze { input, field } => {
            if let Some(field) = field {
                config.analysis_field = field.parse::<Field>()?;
            }
            let pipeline = Pipeline::new(config)?;
            let result = pipeline.run(&load_records(&input)?)?;
            println!("{}", report_json(&result)?);

            let summary = &result.stationarity;
            info!(
                "Level: adf={:?} ljung-box={:?}; difference: adf={:?} ljung-box={:?}",
                summary.level.adf_stationary,
                summary.level.ljung_box_stationary,
                summary.difference.adf_stationary,
                summary.difference.ljung_box_stationary
            );
        }
        Commands::Resample {
            input,
            granularity,
            std,
            output,
        } => {
            if let Some(granularity) = granularity {
                config.resample_granularity = granularity.parse::<Granularity>()?;
            }
            if std {
                config.resample_aggregation = Aggregation::MeanStd;
            }
            let pipeline = Pipeline::new(config)?;
            let (series, _, _) = pipeline.prepare(&load_records(&input)?)?;
            let aggregated = pipeline.resample(&series);

            write_aggregated_csv(create_output(&output)?, &aggregated)?;
            info!("Wrote {} {} buckets to {:?}", aggregated.len(), aggregated.granularity, output);
        }
        Commands::Decompose {
            input,
            period,
            output,
        } => {
            if let Some(period) = period {
                config.decomposition_period = period;
            }
            decompose(config, &input, &output)?;
        }
    }

    Ok(())
}

fn decompose(config: PipelineConfig, input: &Path, output: &Path) -> Result<()> {
    let period = config.decomposition_period;
    let field = config.analysis_field;
    let pipeline = Pipeline::new(config)?;
    let (series, _, _) = pipeline.prepare(&load_records(input)?)?;

    let values = analysis_values(&series, field);
    if values.len() != series.len() {
        bail!("Column {} still has gaps after imputation", field);
    }
    let decomposition = seasonal_decompose(&values, period)
        .context(format!("Cannot decompose {} with period {}", field, period))?;

    write_decomposition_csv(create_output(output)?, &series.dates(), &decomposition)?;
    info!("Wrote decomposition of {} observations to {:?}", decomposition.len(), output);
    Ok(())
}
