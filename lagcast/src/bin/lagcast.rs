//! # lagcast
//!
//! Command-line front end: load a CSV, forecast every series, print JSON.

use anyhow::{bail, Context, Result};
use clap::{Args, Parser, Subcommand};
use lagcast::balance::{historical_balance, project_balance, BalancePoint};
use lagcast::batch::{BatchForecaster, SeriesError};
use lagcast::config::AppConfig;
use lagcast::metrics::{evaluate_holdout, HoldoutReport};
use lagcast::models::AnyRegressor;
use lagcast::{DataLoader, Dataset, RecursiveForecaster, Regressor, SeriesKey};
use serde::Serialize;
use std::fs;
use std::path::PathBuf;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[derive(Parser)]
#[command(name = "lagcast")]
#[command(about = "Recursive lag-based forecasting of regional food balance data", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Args)]
struct CommonArgs {
    /// Input CSV file
    #[arg(short, long)]
    input: PathBuf,

    /// JSON config file (defaults apply when omitted)
    #[arg(short, long)]
    config: Option<PathBuf>,

    /// Number of periods to forecast (overrides the config)
    #[arg(long)]
    horizon: Option<usize>,

    /// Comma-separated feature names (overrides the config)
    #[arg(long, value_delimiter = ',')]
    features: Option<Vec<String>>,

    /// Restrict to one series, one value per group column in mapping order
    #[arg(short, long)]
    group: Vec<String>,

    /// Output file (stdout when omitted)
    #[arg(short, long)]
    output: Option<PathBuf>,
}

#[derive(Subcommand)]
enum Commands {
    /// Forecast one or more targets for every series
    Forecast {
        #[command(flatten)]
        common: CommonArgs,

        /// Target column (repeatable)
        #[arg(short, long, required = true)]
        target: Vec<String>,
    },

    /// Forecast supply and demand and report the surplus per period
    Balance {
        #[command(flatten)]
        common: CommonArgs,

        /// Supply column, e.g. produksi
        #[arg(long)]
        supply: String,

        /// Demand column, e.g. konsumsi
        #[arg(long)]
        demand: String,
    },

    /// Hold back the last periods and score the forecast against them
    Evaluate {
        #[command(flatten)]
        common: CommonArgs,

        /// Target column
        #[arg(short, long)]
        target: String,

        /// Number of trailing observations to hold back
        #[arg(long, default_value = "2")]
        holdout: usize,
    },
}

#[derive(Serialize)]
struct BalanceEntry {
    key: SeriesKey,
    history: Vec<BalancePoint>,
    projection: Option<Vec<BalancePoint>>,
    error: Option<SeriesError>,
}

#[derive(Serialize)]
struct EvaluationEntry {
    key: SeriesKey,
    report: Option<HoldoutReport>,
    error: Option<SeriesError>,
}

fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "lagcast=info".into()),
        )
        .init();

    let cli = Cli::parse();
    match cli.command {
        Commands::Forecast { common, target } => run_forecast(&common, &target),
        Commands::Balance {
            common,
            supply,
            demand,
        } => run_balance(&common, &supply, &demand),
        Commands::Evaluate {
            common,
            target,
            holdout,
        } => run_evaluate(&common, &target, holdout),
    }
}

/// Load config and data, apply command-line overrides and the group filter
fn load(common: &CommonArgs) -> Result<(AppConfig, Dataset)> {
    let mut config = match &common.config {
        Some(path) => AppConfig::from_json_file(path)
            .with_context(|| format!("Failed to read config {}", path.display()))?,
        None => AppConfig::default(),
    };
    if let Some(horizon) = common.horizon {
        config.forecast.horizon = horizon;
    }
    if let Some(features) = &common.features {
        config.forecast.features = features.clone();
    }

    let dataset = DataLoader::from_csv(&common.input, &config.data.column_mapping())
        .with_context(|| format!("Failed to load {}", common.input.display()))?;

    if common.group.is_empty() {
        return Ok((config, dataset));
    }

    let key = SeriesKey::new(common.group.iter().cloned());
    let Some(series) = dataset.get(&key) else {
        bail!("No series {} in {}", key, common.input.display());
    };
    let mut selected = Dataset::new();
    selected.insert(series.clone());
    Ok((config, selected))
}

fn build_forecaster(config: &AppConfig) -> Result<RecursiveForecaster<AnyRegressor>> {
    let regressor = config.forecast.model.build()?;
    let forecaster = RecursiveForecaster::new(regressor, config.forecast.forecast_config())?;
    info!(
        model = forecaster.regressor().name(),
        horizon = config.forecast.horizon,
        "forecaster ready"
    );
    Ok(forecaster)
}

fn write_output<T: Serialize>(value: &T, output: Option<&PathBuf>) -> Result<()> {
    let json = serde_json::to_string_pretty(value)?;
    match output {
        Some(path) => {
            fs::write(path, json).with_context(|| format!("Failed to write {}", path.display()))?
        }
        None => println!("{}", json),
    }
    Ok(())
}

fn run_forecast(common: &CommonArgs, targets: &[String]) -> Result<()> {
    let (config, dataset) = load(common)?;
    let mut batch = BatchForecaster::new(build_forecaster(&config)?).parallel(config.batch.parallel);
    if config.batch.cache_models {
        batch = batch.with_registry();
    }

    let report = batch.run(&dataset, targets)?;
    write_output(&report, common.output.as_ref())
}

fn run_balance(common: &CommonArgs, supply: &str, demand: &str) -> Result<()> {
    let (config, dataset) = load(common)?;
    let forecaster = build_forecaster(&config)?;

    let entries: Vec<BalanceEntry> = dataset
        .iter()
        .map(|series| {
            let projection = forecaster.forecast(series, supply).and_then(|s| {
                let d = forecaster.forecast(series, demand)?;
                for side in [&s, &d] {
                    if let Some(err) = side.interruption_error() {
                        return Err(err);
                    }
                }
                project_balance(&s, &d)
            });

            let (projection, error) = match projection {
                Ok(points) => (Some(points), None),
                Err(err) => (None, Some(SeriesError::from(&err))),
            };
            BalanceEntry {
                key: series.key().clone(),
                history: historical_balance(series, supply, demand),
                projection,
                error,
            }
        })
        .collect();

    write_output(&entries, common.output.as_ref())
}

fn run_evaluate(common: &CommonArgs, target: &str, holdout: usize) -> Result<()> {
    let (config, dataset) = load(common)?;
    let forecaster = build_forecaster(&config)?;

    let entries: Vec<EvaluationEntry> = dataset
        .iter()
        .map(|series| match evaluate_holdout(&forecaster, series, target, holdout) {
            Ok(report) => EvaluationEntry {
                key: series.key().clone(),
                report: Some(report),
                error: None,
            },
            Err(err) => EvaluationEntry {
                key: series.key().clone(),
                report: None,
                error: Some(SeriesError::from(&err)),
            },
        })
        .collect();

    write_output(&entries, common.output.as_ref())
}
