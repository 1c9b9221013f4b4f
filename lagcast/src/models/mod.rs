//! Regression backends for the recursive forecaster
//!
//! The forecaster only depends on [`Regressor`] (something that can be fitted)
//! and [`FittedRegressor`] (something that can predict one row). Which
//! algorithm sits behind them is the caller's choice.

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt::Debug;

pub mod bagged;
pub mod linear;

pub use bagged::{BaggedLinearRegression, FittedBagged};
pub use linear::{FittedLinear, LinearRegression, RidgeRegression};

/// Trained regression model bound to a fixed feature width
pub trait FittedRegressor: Debug + Send + Sync {
    /// Predict the (possibly transformed) target for a single feature row
    fn predict(&self, row: &[f64]) -> Result<f64>;

    /// Number of features each row must have
    fn num_features(&self) -> usize;

    /// Name of the model
    fn name(&self) -> &str;
}

/// Regression model that can be trained on a feature matrix
pub trait Regressor: Debug + Clone + Send + Sync {
    /// The type of trained model produced
    type Fitted: FittedRegressor;

    /// Train the model
    fn fit(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<Self::Fitted>;

    /// Get the name of the model
    fn name(&self) -> &str;
}

impl<F: FittedRegressor + ?Sized> FittedRegressor for Box<F> {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        (**self).predict(row)
    }

    fn num_features(&self) -> usize {
        (**self).num_features()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

impl<F: FittedRegressor + ?Sized> FittedRegressor for std::sync::Arc<F> {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        (**self).predict(row)
    }

    fn num_features(&self) -> usize {
        (**self).num_features()
    }

    fn name(&self) -> &str {
        (**self).name()
    }
}

/// Check a prediction row against the model width
pub(crate) fn check_width(row: &[f64], expected: usize) -> Result<()> {
    if row.len() != expected {
        return Err(ForecastError::InvalidParameter(format!(
            "Feature row has {} values, model was trained on {}",
            row.len(),
            expected
        )));
    }
    Ok(())
}

/// Map a math failure during training into the forecaster's taxonomy
pub(crate) fn fit_error(model: &str, err: lag_math::MathError) -> ForecastError {
    ForecastError::ModelFitFailed(format!("{}: {}", model, err))
}

/// Config-selectable backend
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum ModelSpec {
    /// Ordinary least squares
    Linear,
    /// L2-penalised least squares
    Ridge { alpha: f64 },
    /// Seeded bootstrap ensemble of least-squares fits
    Bagged {
        estimators: usize,
        seed: u64,
        #[serde(default)]
        alpha: f64,
    },
}

impl Default for ModelSpec {
    fn default() -> Self {
        ModelSpec::Linear
    }
}

/// Backend chosen at runtime from a [`ModelSpec`]
#[derive(Debug, Clone)]
pub enum AnyRegressor {
    Linear(LinearRegression),
    Ridge(RidgeRegression),
    Bagged(BaggedLinearRegression),
}

/// Fitted counterpart of [`AnyRegressor`]
#[derive(Debug, Clone)]
pub enum AnyFitted {
    Linear(FittedLinear),
    Bagged(FittedBagged),
}

impl ModelSpec {
    /// Build the backend, validating its parameters
    pub fn build(&self) -> Result<AnyRegressor> {
        Ok(match self {
            ModelSpec::Linear => AnyRegressor::Linear(LinearRegression::new()),
            ModelSpec::Ridge { alpha } => AnyRegressor::Ridge(RidgeRegression::new(*alpha)?),
            ModelSpec::Bagged {
                estimators,
                seed,
                alpha,
            } => AnyRegressor::Bagged(
                BaggedLinearRegression::new(*estimators, *seed)?.with_ridge(*alpha)?,
            ),
        })
    }
}

impl Regressor for AnyRegressor {
    type Fitted = AnyFitted;

    fn fit(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<Self::Fitted> {
        match self {
            AnyRegressor::Linear(m) => m.fit(rows, targets).map(AnyFitted::Linear),
            AnyRegressor::Ridge(m) => m.fit(rows, targets).map(AnyFitted::Linear),
            AnyRegressor::Bagged(m) => m.fit(rows, targets).map(AnyFitted::Bagged),
        }
    }

    fn name(&self) -> &str {
        match self {
            AnyRegressor::Linear(m) => m.name(),
            AnyRegressor::Ridge(m) => m.name(),
            AnyRegressor::Bagged(m) => m.name(),
        }
    }
}

impl FittedRegressor for AnyFitted {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        match self {
            AnyFitted::Linear(m) => m.predict(row),
            AnyFitted::Bagged(m) => m.predict(row),
        }
    }

    fn num_features(&self) -> usize {
        match self {
            AnyFitted::Linear(m) => m.num_features(),
            AnyFitted::Bagged(m) => m.num_features(),
        }
    }

    fn name(&self) -> &str {
        match self {
            AnyFitted::Linear(m) => m.name(),
            AnyFitted::Bagged(m) => m.name(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_model_spec_from_json() {
        let spec: ModelSpec = serde_json::from_str(r#"{"kind":"bagged","estimators":5,"seed":7}"#).unwrap();
        assert_eq!(
            spec,
            ModelSpec::Bagged {
                estimators: 5,
                seed: 7,
                alpha: 0.0
            }
        );
        assert!(spec.build().is_ok());
    }

    #[test]
    fn test_model_spec_rejects_bad_parameters() {
        assert!(ModelSpec::Ridge { alpha: -1.0 }.build().is_err());
        assert!(ModelSpec::Bagged {
            estimators: 0,
            seed: 1,
            alpha: 0.0
        }
        .build()
        .is_err());
    }

    #[test]
    fn test_any_regressor_fits_line() {
        let model = ModelSpec::Linear.build().unwrap();
        let rows = vec![vec![1.0], vec![2.0], vec![3.0]];
        let fitted = model.fit(&rows, &[2.0, 4.0, 6.0]).unwrap();
        assert_eq!(fitted.num_features(), 1);
        assert!((fitted.predict(&[4.0]).unwrap() - 8.0).abs() < 1e-9);
    }
}
