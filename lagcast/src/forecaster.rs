//! Recursive multi-step forecasting with lag features
//!
//! One forecast run trains a single model on the full history of a series,
//! then rolls forward one period at a time: build the feature row from the
//! carry-forward state, predict, invert the target transform, emit, and push
//! the emitted value back into the state as the next `lag1`. Step `k + 1`
//! depends on step `k`, so the steps of one series are strictly sequential.

use crate::error::{ForecastError, Result};
use crate::features::{build_forecast_row, build_training_set, FeatureSet, ForecastState};
use crate::models::{FittedRegressor, Regressor};
use crate::registry::{ModelKey, ModelRegistry};
use crate::series::{Series, SeriesKey};
use crate::transform::TargetTransform;
use lag_math::{fit_line, LinearModel};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::{debug, info};

/// What to do with negative predictions
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ClampPolicy {
    /// Emit predictions as they are
    #[default]
    None,
    /// Replace negative predictions with zero
    NonNegative,
}

impl ClampPolicy {
    /// Apply the policy to one prediction
    pub fn apply(self, value: f64) -> f64 {
        match self {
            ClampPolicy::None => value,
            ClampPolicy::NonNegative => value.max(0.0),
        }
    }
}

/// How covariates evolve over the forecast horizon
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CovariatePolicy {
    /// Hold each covariate at its last known value
    #[default]
    CarryForward,
    /// Extrapolate each covariate along a least-squares line over its periods
    LinearTrend,
}

/// Externally supplied per-step covariate values.
///
/// Step `1` is the first forecast period. Past the end of a projection its
/// last value is held.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CovariateProjections {
    values: BTreeMap<String, Vec<f64>>,
}

impl CovariateProjections {
    /// Create an empty set of projections
    pub fn new() -> Self {
        Self::default()
    }

    /// Builder-style insertion
    pub fn with(mut self, name: impl Into<String>, values: Vec<f64>) -> Self {
        self.values.insert(name.into(), values);
        self
    }

    /// Projected value of `name` at `step` (1-based)
    pub fn value_at(&self, name: &str, step: usize) -> Option<f64> {
        let values = self.values.get(name)?;
        let index = step.checked_sub(1)?.min(values.len().checked_sub(1)?);
        values.get(index).copied()
    }

    /// Names with a projection
    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.values.keys().map(String::as_str)
    }

    /// Check if no projections are present
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Per-run forecasting parameters
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastConfig {
    /// Number of future periods
    pub horizon: usize,
    /// Ordered feature names, shared by training and prediction
    pub features: Vec<String>,
    /// Target transform applied before fitting
    #[serde(default)]
    pub transform: TargetTransform,
    /// Negative prediction policy
    #[serde(default)]
    pub clamp: ClampPolicy,
    /// Covariate evolution policy
    #[serde(default)]
    pub covariates: CovariatePolicy,
}

impl ForecastConfig {
    /// Create a config with default policies
    pub fn new<S: Into<String>>(horizon: usize, features: impl IntoIterator<Item = S>) -> Self {
        Self {
            horizon,
            features: features.into_iter().map(Into::into).collect(),
            transform: TargetTransform::Identity,
            clamp: ClampPolicy::None,
            covariates: CovariatePolicy::CarryForward,
        }
    }

    /// Set the target transform
    pub fn with_transform(mut self, transform: TargetTransform) -> Self {
        self.transform = transform;
        self
    }

    /// Set the clamp policy
    pub fn with_clamp(mut self, clamp: ClampPolicy) -> Self {
        self.clamp = clamp;
        self
    }

    /// Set the covariate policy
    pub fn with_covariate_policy(mut self, covariates: CovariatePolicy) -> Self {
        self.covariates = covariates;
        self
    }

    /// Validate the horizon and parse the feature list
    pub fn validate(&self) -> Result<FeatureSet> {
        if self.horizon < 1 {
            return Err(ForecastError::InvalidHorizon(self.horizon));
        }
        FeatureSet::parse(&self.features)
    }
}

/// One forecast period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastPoint {
    /// Forecast period
    pub period: i64,
    /// Predicted target, on the raw scale
    pub target: f64,
    /// Covariate values used for this period
    pub covariates: BTreeMap<String, f64>,
    /// Feature row fed to the model, in feature order
    pub feature_row: Vec<f64>,
}

/// Where and why a roll-forward stopped early
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StepFailure {
    /// 1-based step that failed
    pub step: usize,
    /// Backend or data message
    pub reason: String,
}

/// Result of forecasting one (series, target) pair
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SeriesForecast {
    /// Series key
    pub key: SeriesKey,
    /// Forecast target
    pub target: String,
    /// Backend name
    pub model: String,
    /// Feature names in column order
    pub features: Vec<String>,
    /// Rows used to train
    pub training_rows: usize,
    /// Observations excluded from training
    pub filtered_rows: usize,
    /// Emitted periods, in order
    pub points: Vec<ForecastPoint>,
    /// Set when the roll-forward stopped before the full horizon
    pub interruption: Option<StepFailure>,
}

impl SeriesForecast {
    /// Whether every requested step was produced
    pub fn is_complete(&self) -> bool {
        self.interruption.is_none()
    }

    /// Predicted values
    pub fn values(&self) -> Vec<f64> {
        self.points.iter().map(|p| p.target).collect()
    }

    /// Forecast periods
    pub fn periods(&self) -> Vec<i64> {
        self.points.iter().map(|p| p.period).collect()
    }

    /// The interruption as an error, if any
    pub fn interruption_error(&self) -> Option<ForecastError> {
        self.interruption
            .as_ref()
            .map(|f| ForecastError::PredictionFailed {
                step: f.step,
                reason: f.reason.clone(),
            })
    }

    /// Serialize to pretty JSON
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }
}

/// A fitted model together with its training summary
#[derive(Debug)]
pub struct TrainedModel<F> {
    model: F,
    training_rows: usize,
    filtered_rows: usize,
}

impl<F: FittedRegressor> TrainedModel<F> {
    /// Fitted backend
    pub fn model(&self) -> &F {
        &self.model
    }

    /// Rows used to train
    pub fn training_rows(&self) -> usize {
        self.training_rows
    }

    /// Observations excluded from training
    pub fn filtered_rows(&self) -> usize {
        self.filtered_rows
    }
}

/// Trains one model per (series, target) and rolls it forward
#[derive(Debug, Clone)]
pub struct RecursiveForecaster<R: Regressor> {
    regressor: R,
    config: ForecastConfig,
    features: FeatureSet,
}

impl<R: Regressor> RecursiveForecaster<R> {
    /// Create a forecaster, validating the config
    pub fn new(regressor: R, config: ForecastConfig) -> Result<Self> {
        let features = config.validate()?;
        Ok(Self {
            regressor,
            config,
            features,
        })
    }

    /// Active config
    pub fn config(&self) -> &ForecastConfig {
        &self.config
    }

    /// Parsed features
    pub fn features(&self) -> &FeatureSet {
        &self.features
    }

    /// Regression backend
    pub fn regressor(&self) -> &R {
        &self.regressor
    }

    /// Forecast `horizon` periods past the end of `series`
    pub fn forecast(&self, series: &Series, target: &str) -> Result<SeriesForecast> {
        self.forecast_with(series, target, &CovariateProjections::default())
    }

    /// Forecast with explicit covariate projections overriding the policy
    pub fn forecast_with(
        &self,
        series: &Series,
        target: &str,
        projections: &CovariateProjections,
    ) -> Result<SeriesForecast> {
        let trained = self.train(series, target)?;
        self.roll_forward(&trained, series, target, projections)
    }

    /// Forecast using a registry of fitted models, training only on a miss
    pub fn forecast_cached(
        &self,
        registry: &ModelRegistry<TrainedModel<R::Fitted>>,
        series: &Series,
        target: &str,
    ) -> Result<SeriesForecast> {
        let key = ModelKey::new(series.key().clone(), target);
        let trained = registry.get_or_train(key, || self.train(series, target))?;
        self.roll_forward(&*trained, series, target, &CovariateProjections::default())
    }

    /// Build the training set, transform the target and fit exactly one model
    pub fn train(&self, series: &Series, target: &str) -> Result<TrainedModel<R::Fitted>> {
        let training = build_training_set(series, target, &self.features)?;

        let transform = self.config.transform;
        transform.verify(training.targets())?;
        let targets = transform.forward_all(training.targets())?;

        let model = self.regressor.fit(training.rows(), &targets)?;
        debug!(
            series = %series.key(),
            target,
            model = model.name(),
            rows = training.len(),
            "trained model"
        );

        Ok(TrainedModel {
            model,
            training_rows: training.len(),
            filtered_rows: training.filtered(),
        })
    }

    /// Roll a fitted model forward over the configured horizon.
    ///
    /// Failures at a step stop the roll-forward and are recorded in
    /// [`SeriesForecast::interruption`] next to the steps already produced.
    pub fn roll_forward<F: FittedRegressor>(
        &self,
        trained: &TrainedModel<F>,
        series: &Series,
        target: &str,
        projections: &CovariateProjections,
    ) -> Result<SeriesForecast> {
        let horizon = self.config.horizon;
        if horizon < 1 {
            return Err(ForecastError::InvalidHorizon(horizon));
        }
        if trained.model.num_features() != self.features.len() {
            return Err(ForecastError::InvalidParameter(format!(
                "Model expects {} features, forecaster is configured with {}",
                trained.model.num_features(),
                self.features.len()
            )));
        }

        let mut state = ForecastState::from_series(series, target, &self.features)?;
        let trends = match self.config.covariates {
            CovariatePolicy::CarryForward => BTreeMap::new(),
            CovariatePolicy::LinearTrend => covariate_trends(series, target),
        };

        let mut forecast = SeriesForecast {
            key: series.key().clone(),
            target: target.to_string(),
            model: trained.model.name().to_string(),
            features: self.features.names(),
            training_rows: trained.training_rows,
            filtered_rows: trained.filtered_rows,
            points: Vec::with_capacity(horizon),
            interruption: None,
        };

        for step in 1..=horizon {
            state.advance();
            for (name, line) in &trends {
                if let Ok(value) = line.predict(&[state.period() as f64]) {
                    state.set_covariate(name, value);
                }
            }
            for name in projections.names() {
                if let Some(value) = projections.value_at(name, step) {
                    state.set_covariate(name, value);
                }
            }

            match self.predict_step(&trained.model, &state) {
                Ok((row, value)) => {
                    debug!(series = %series.key(), target, step, period = state.period(), value, "forecast step");
                    forecast.points.push(ForecastPoint {
                        period: state.period(),
                        target: value,
                        covariates: state.covariates().clone(),
                        feature_row: row,
                    });
                    state.push_target(value);
                }
                Err(e) => {
                    forecast.interruption = Some(StepFailure {
                        step,
                        reason: e.to_string(),
                    });
                    break;
                }
            }
        }

        info!(
            series = %series.key(),
            target,
            steps = forecast.points.len(),
            complete = forecast.is_complete(),
            "forecast finished"
        );
        Ok(forecast)
    }

    fn predict_step<F: FittedRegressor>(&self, model: &F, state: &ForecastState) -> Result<(Vec<f64>, f64)> {
        let row = build_forecast_row(state, &self.features)?;
        let raw = model.predict(&row)?;
        let value = self.config.transform.inverse(raw);
        if !value.is_finite() {
            return Err(ForecastError::DataError(format!(
                "non-finite prediction {} for period {}",
                value,
                state.period()
            )));
        }
        Ok((row, self.config.clamp.apply(value)))
    }
}

/// Least-squares lines over (period, value) for every non-target field with
/// at least two observed points
fn covariate_trends(series: &Series, target: &str) -> BTreeMap<String, LinearModel> {
    let mut names: Vec<&String> = series
        .observations()
        .iter()
        .flat_map(|o| o.values().keys())
        .filter(|name| name.as_str() != target)
        .collect();
    names.sort();
    names.dedup();

    names
        .into_iter()
        .filter_map(|name| {
            let points = series.field(name);
            if points.len() < 2 {
                return None;
            }
            let (x, y): (Vec<f64>, Vec<f64>) = points.iter().map(|&(p, v)| (p as f64, v)).unzip();
            fit_line(&x, &y).ok().map(|line| (name.clone(), line))
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::LinearRegression;
    use crate::series::Observation;

    fn series() -> Series {
        Series::new(
            SeriesKey::new(["Aceh", "Beras"]),
            vec![
                Observation::new(2018).with("y", 100.0).with("r", 10.0),
                Observation::new(2019).with("y", 110.0).with("r", 12.0),
                Observation::new(2020).with("y", 121.0).with("r", 11.0),
            ],
        )
        .unwrap()
    }

    #[test]
    fn test_rejects_zero_horizon() {
        let err = RecursiveForecaster::new(LinearRegression::new(), ForecastConfig::new(0, ["lag1"]))
            .unwrap_err();
        assert!(matches!(err, ForecastError::InvalidHorizon(0)));
    }

    #[test]
    fn test_projection_holds_last_value() {
        let p = CovariateProjections::new().with("r", vec![1.0, 2.0]);
        assert_eq!(p.value_at("r", 1), Some(1.0));
        assert_eq!(p.value_at("r", 5), Some(2.0));
        assert_eq!(p.value_at("r", 0), None);
        assert_eq!(p.value_at("x", 1), None);
        assert_eq!(CovariateProjections::new().with("e", vec![]).value_at("e", 1), None);
    }

    #[test]
    fn test_clamp_policy() {
        assert_eq!(ClampPolicy::None.apply(-3.0), -3.0);
        assert_eq!(ClampPolicy::NonNegative.apply(-3.0), 0.0);
        assert_eq!(ClampPolicy::NonNegative.apply(3.0), 3.0);
    }

    #[test]
    fn test_linear_trend_covariates() {
        let s = Series::new(
            SeriesKey::new(["x"]),
            vec![
                Observation::new(2018).with("y", 1.0).with("pop", 100.0),
                Observation::new(2019).with("y", 2.0).with("pop", 110.0),
                Observation::new(2020).with("y", 3.5).with("pop", 120.0),
                Observation::new(2021).with("y", 4.0).with("pop", 130.0),
            ],
        )
        .unwrap();
        let config = ForecastConfig::new(2, ["pop"]).with_covariate_policy(CovariatePolicy::LinearTrend);
        let forecaster = RecursiveForecaster::new(LinearRegression::new(), config).unwrap();
        let forecast = forecaster.forecast(&s, "y").unwrap();

        let pops: Vec<f64> = forecast.points.iter().map(|p| p.covariates["pop"]).collect();
        assert!((pops[0] - 140.0).abs() < 1e-6);
        assert!((pops[1] - 150.0).abs() < 1e-6);
    }

    #[test]
    fn test_scenario_chains_lag() {
        let forecaster =
            RecursiveForecaster::new(LinearRegression::new(), ForecastConfig::new(2, ["lag1"])).unwrap();
        let forecast = forecaster.forecast(&series(), "y").unwrap();

        assert_eq!(forecast.periods(), vec![2021, 2022]);
        assert_eq!(forecast.points[0].feature_row, vec![121.0]);
        assert_eq!(
            forecast.points[1].feature_row[0].to_bits(),
            forecast.points[0].target.to_bits()
        );
        assert!((forecast.points[0].target - 133.1).abs() < 1e-6);
        assert_eq!(forecast.points[0].covariates["r"], 11.0);
    }
}
