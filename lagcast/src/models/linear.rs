//! Least-squares regression backends

use crate::error::{ForecastError, Result};
use crate::models::{check_width, fit_error, FittedRegressor, Regressor};
use lag_math::{fit_least_squares, LinearModel};

/// Ordinary least squares with an intercept
#[derive(Debug, Clone)]
pub struct LinearRegression {
    /// Name of the model
    name: String,
}

/// Ridge (L2-penalised) least squares; the intercept is not penalised
#[derive(Debug, Clone)]
pub struct RidgeRegression {
    /// Name of the model
    name: String,
    /// Penalty strength
    alpha: f64,
}

/// Trained least-squares model
#[derive(Debug, Clone)]
pub struct FittedLinear {
    /// Name of the model
    name: String,
    /// Fitted parameters
    model: LinearModel,
    /// In-sample fit quality, when defined
    r_squared: Option<f64>,
}

impl LinearRegression {
    /// Create a new OLS backend
    pub fn new() -> Self {
        Self {
            name: "Linear Regression".to_string(),
        }
    }
}

impl Default for LinearRegression {
    fn default() -> Self {
        Self::new()
    }
}

impl RidgeRegression {
    /// Create a new ridge backend
    pub fn new(alpha: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "Ridge alpha must be a finite, non-negative number".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Ridge Regression (alpha={})", alpha),
            alpha,
        })
    }

    /// Penalty strength
    pub fn alpha(&self) -> f64 {
        self.alpha
    }
}

impl FittedLinear {
    pub(crate) fn from_fit(name: &str, model: LinearModel, rows: &[Vec<f64>], targets: &[f64]) -> Self {
        let r_squared = model.r_squared(rows, targets).ok();
        Self {
            name: name.to_string(),
            model,
            r_squared,
        }
    }

    /// Fitted intercept and coefficients
    pub fn parameters(&self) -> &LinearModel {
        &self.model
    }

    /// In-sample R-squared, `None` when the target has no variance
    pub fn r_squared(&self) -> Option<f64> {
        self.r_squared
    }
}

impl Regressor for LinearRegression {
    type Fitted = FittedLinear;

    fn fit(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<Self::Fitted> {
        let model = fit_least_squares(rows, targets, 0.0).map_err(|e| fit_error(&self.name, e))?;
        Ok(FittedLinear::from_fit(&self.name, model, rows, targets))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl Regressor for RidgeRegression {
    type Fitted = FittedLinear;

    fn fit(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<Self::Fitted> {
        let model =
            fit_least_squares(rows, targets, self.alpha).map_err(|e| fit_error(&self.name, e))?;
        Ok(FittedLinear::from_fit(&self.name, model, rows, targets))
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedRegressor for FittedLinear {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        check_width(row, self.model.num_features())?;
        self.model
            .predict(row)
            .map_err(|e| ForecastError::InvalidParameter(e.to_string()))
    }

    fn num_features(&self) -> usize {
        self.model.num_features()
    }

    fn name(&self) -> &str {
        &self.name
    }
}
