//! Bootstrap-aggregated least squares with a fixed seed

use crate::error::{ForecastError, Result};
use crate::models::{check_width, FittedRegressor, Regressor};
use lag_math::{fit_least_squares, LinearModel};
use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use tracing::debug;

/// Attempts per requested member before giving up on singular resamples
const ATTEMPTS_PER_MEMBER: usize = 4;

/// Ensemble of least-squares fits on bootstrap resamples.
///
/// Resampling is driven by a seeded `StdRng`, so the same seed and data
/// always give the same members and the same predictions.
#[derive(Debug, Clone)]
pub struct BaggedLinearRegression {
    /// Name of the model
    name: String,
    /// Number of members to fit
    estimators: usize,
    /// Resampling seed
    seed: u64,
    /// Ridge penalty for each member
    alpha: f64,
}

/// Trained ensemble
#[derive(Debug, Clone)]
pub struct FittedBagged {
    /// Name of the model
    name: String,
    /// Member fits
    members: Vec<LinearModel>,
    /// Feature width
    width: usize,
}

impl BaggedLinearRegression {
    /// Create a new ensemble backend
    pub fn new(estimators: usize, seed: u64) -> Result<Self> {
        if estimators == 0 {
            return Err(ForecastError::InvalidParameter(
                "Ensemble needs at least one estimator".to_string(),
            ));
        }

        Ok(Self {
            name: format!("Bagged Linear Regression (n={}, seed={})", estimators, seed),
            estimators,
            seed,
            alpha: 0.0,
        })
    }

    /// Penalise every member with the given ridge strength
    pub fn with_ridge(mut self, alpha: f64) -> Result<Self> {
        if !alpha.is_finite() || alpha < 0.0 {
            return Err(ForecastError::InvalidParameter(
                "Ridge alpha must be a finite, non-negative number".to_string(),
            ));
        }
        self.alpha = alpha;
        Ok(self)
    }
}

impl FittedBagged {
    /// Number of members that were fitted successfully
    pub fn members(&self) -> usize {
        self.members.len()
    }
}

impl Regressor for BaggedLinearRegression {
    type Fitted = FittedBagged;

    fn fit(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<Self::Fitted> {
        let n = rows.len();
        if n == 0 || targets.len() != n {
            return Err(ForecastError::ModelFitFailed(format!(
                "{}: need matching, non-empty rows and targets",
                self.name
            )));
        }

        let mut rng = StdRng::seed_from_u64(self.seed);
        let mut members = Vec::with_capacity(self.estimators);
        let mut last_error = None;
        let mut sample_rows = Vec::with_capacity(n);
        let mut sample_targets = Vec::with_capacity(n);

        for _ in 0..self.estimators * ATTEMPTS_PER_MEMBER {
            if members.len() == self.estimators {
                break;
            }

            sample_rows.clear();
            sample_targets.clear();
            for _ in 0..n {
                let i = rng.gen_range(0..n);
                sample_rows.push(rows[i].clone());
                sample_targets.push(targets[i]);
            }

            match fit_least_squares(&sample_rows, &sample_targets, self.alpha) {
                Ok(model) => members.push(model),
                Err(e) => last_error = Some(e),
            }
        }

        if members.is_empty() {
            return Err(ForecastError::ModelFitFailed(format!(
                "{}: no bootstrap resample could be fitted ({})",
                self.name,
                last_error.map(|e| e.to_string()).unwrap_or_default()
            )));
        }

        debug!(
            model = %self.name,
            members = members.len(),
            "fitted bootstrap ensemble"
        );

        Ok(FittedBagged {
            name: self.name.clone(),
            width: rows[0].len(),
            members,
        })
    }

    fn name(&self) -> &str {
        &self.name
    }
}

impl FittedRegressor for FittedBagged {
    fn predict(&self, row: &[f64]) -> Result<f64> {
        check_width(row, self.width)?;
        let mut sum = 0.0;
        for member in &self.members {
            sum += member
                .predict(row)
                .map_err(|e| ForecastError::InvalidParameter(e.to_string()))?;
        }
        Ok(sum / self.members.len() as f64)
    }

    fn num_features(&self) -> usize {
        self.width
    }

    fn name(&self) -> &str {
        &self.name
    }
}
