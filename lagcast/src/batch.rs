//! Forecasting many series at once with per-series error records

use crate::error::{ErrorKind, ForecastError, Result};
use crate::forecaster::{RecursiveForecaster, SeriesForecast, TrainedModel};
use crate::models::Regressor;
use crate::registry::ModelRegistry;
use crate::series::{Dataset, Series, SeriesKey};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use tracing::{info, warn};

/// Structured per-series failure
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SeriesError {
    /// Error tag
    pub kind: ErrorKind,
    /// Human readable detail
    pub message: String,
}

impl From<&ForecastError> for SeriesError {
    fn from(err: &ForecastError) -> Self {
        Self {
            kind: err.kind(),
            message: err.to_string(),
        }
    }
}

/// Outcome for one (series, target) pair.
///
/// A partial forecast carries both the produced points and a
/// `PredictionFailed` error.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesOutcome {
    pub key: SeriesKey,
    pub target: String,
    pub forecast: Option<SeriesForecast>,
    pub error: Option<SeriesError>,
}

impl SeriesOutcome {
    fn from_result(key: &SeriesKey, target: &str, result: Result<SeriesForecast>) -> Self {
        match result {
            Ok(forecast) => {
                let error = forecast.interruption_error().as_ref().map(SeriesError::from);
                Self {
                    key: key.clone(),
                    target: target.to_string(),
                    forecast: Some(forecast),
                    error,
                }
            }
            Err(err) => Self {
                key: key.clone(),
                target: target.to_string(),
                forecast: None,
                error: Some(SeriesError::from(&err)),
            },
        }
    }

    /// Whether the full horizon was forecast
    pub fn is_success(&self) -> bool {
        self.error.is_none() && self.forecast.is_some()
    }
}

/// Results of a batch run in dataset key order, then target order
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BatchReport {
    pub outcomes: Vec<SeriesOutcome>,
}

impl BatchReport {
    /// Outcomes without errors
    pub fn succeeded(&self) -> usize {
        self.outcomes.iter().filter(|o| o.is_success()).count()
    }

    /// Outcomes with an error, including partial forecasts
    pub fn failed(&self) -> usize {
        self.outcomes.len() - self.succeeded()
    }

    /// Outcome for one pair
    pub fn get(&self, key: &SeriesKey, target: &str) -> Option<&SeriesOutcome> {
        self.outcomes
            .iter()
            .find(|o| &o.key == key && o.target == target)
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// Runs a [`RecursiveForecaster`] over every series of a dataset
#[derive(Debug)]
pub struct BatchForecaster<R: Regressor> {
    forecaster: RecursiveForecaster<R>,
    parallel: bool,
    registry: Option<ModelRegistry<TrainedModel<R::Fitted>>>,
}

impl<R: Regressor> BatchForecaster<R> {
    /// Wrap a forecaster; runs in parallel across series by default
    pub fn new(forecaster: RecursiveForecaster<R>) -> Self {
        Self {
            forecaster,
            parallel: true,
            registry: None,
        }
    }

    /// Toggle parallelism across series
    pub fn parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }

    /// Reuse fitted models across runs through a registry
    pub fn with_registry(mut self) -> Self {
        self.registry = Some(ModelRegistry::new());
        self
    }

    /// Registry, if enabled
    pub fn registry(&self) -> Option<&ModelRegistry<TrainedModel<R::Fitted>>> {
        self.registry.as_ref()
    }

    /// Wrapped forecaster
    pub fn forecaster(&self) -> &RecursiveForecaster<R> {
        &self.forecaster
    }

    /// Forecast every target of every series.
    ///
    /// Config errors are returned before any work starts; everything else is
    /// recorded per series in the report.
    pub fn run<S: AsRef<str> + Sync>(&self, dataset: &Dataset, targets: &[S]) -> Result<BatchReport> {
        self.forecaster.config().validate()?;
        if targets.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one target is required".to_string(),
            ));
        }

        let series: Vec<&Series> = dataset.iter().collect();
        let per_series = |s: &&Series| -> Vec<SeriesOutcome> {
            targets
                .iter()
                .map(|target| self.forecast_one(s, target.as_ref()))
                .collect()
        };

        let outcomes: Vec<SeriesOutcome> = if self.parallel {
            series.par_iter().flat_map_iter(per_series).collect()
        } else {
            series.iter().flat_map(per_series).collect()
        };

        let report = BatchReport { outcomes };
        info!(
            series = dataset.len(),
            succeeded = report.succeeded(),
            failed = report.failed(),
            "batch finished"
        );
        Ok(report)
    }

    fn forecast_one(&self, series: &Series, target: &str) -> SeriesOutcome {
        let result = match &self.registry {
            Some(registry) => self.forecaster.forecast_cached(registry, series, target),
            None => self.forecaster.forecast(series, target),
        };

        if let Err(err) = &result {
            warn!(series = %series.key(), target, error = %err, "series forecast failed");
        }
        SeriesOutcome::from_result(series.key(), target, result)
    }
}
