//! Least-squares regression over dense feature rows
//!
//! Fits `y = intercept + sum(coef_j * x_j)` by solving the normal equations
//! on mean-centred columns, so the intercept is never penalised and a
//! constant column shows up as a singular system instead of a silent
//! near-zero coefficient.

use crate::linalg::cholesky_solve;
use crate::{MathError, Result};
use serde::{Deserialize, Serialize};

/// Fitted linear model: intercept plus one coefficient per feature column
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearModel {
    intercept: f64,
    coefficients: Vec<f64>,
}

impl LinearModel {
    /// Create a model from known parameters
    pub fn new(intercept: f64, coefficients: Vec<f64>) -> Self {
        Self {
            intercept,
            coefficients,
        }
    }

    /// Intercept term
    pub fn intercept(&self) -> f64 {
        self.intercept
    }

    /// Coefficients, in feature column order
    pub fn coefficients(&self) -> &[f64] {
        &self.coefficients
    }

    /// Number of feature columns the model expects
    pub fn num_features(&self) -> usize {
        self.coefficients.len()
    }

    /// Predict a single row
    pub fn predict(&self, row: &[f64]) -> Result<f64> {
        if row.len() != self.coefficients.len() {
            return Err(MathError::InvalidInput(format!(
                "Row has {} features, model expects {}",
                row.len(),
                self.coefficients.len()
            )));
        }

        Ok(self.intercept
            + self
                .coefficients
                .iter()
                .zip(row.iter())
                .map(|(c, x)| c * x)
                .sum::<f64>())
    }

    /// Coefficient of determination over the given rows
    pub fn r_squared(&self, rows: &[Vec<f64>], targets: &[f64]) -> Result<f64> {
        if rows.len() != targets.len() || rows.is_empty() {
            return Err(MathError::InvalidInput(
                "Rows and targets must have the same non-zero length".to_string(),
            ));
        }

        let y_mean = targets.iter().sum::<f64>() / targets.len() as f64;
        let mut ss_total = 0.0;
        let mut ss_residual = 0.0;
        for (row, &y) in rows.iter().zip(targets.iter()) {
            let y_pred = self.predict(row)?;
            ss_total += (y - y_mean).powi(2);
            ss_residual += (y - y_pred).powi(2);
        }

        if ss_total.abs() < 1e-10 {
            return Err(MathError::InsufficientData(
                "Cannot calculate R-squared: total sum of squares is too small".to_string(),
            ));
        }

        Ok(1.0 - ss_residual / ss_total)
    }
}

/// Fit ordinary least squares, or ridge regression when `ridge_alpha > 0`.
///
/// Every row must have the same length. Plain OLS needs at least one more row
/// than there are features.
pub fn fit_least_squares(rows: &[Vec<f64>], targets: &[f64], ridge_alpha: f64) -> Result<LinearModel> {
    let n = rows.len();
    if n == 0 {
        return Err(MathError::InsufficientData(
            "Need at least one row to fit a regression".to_string(),
        ));
    }
    if targets.len() != n {
        return Err(MathError::InvalidInput(format!(
            "Got {} rows but {} targets",
            n,
            targets.len()
        )));
    }
    if !ridge_alpha.is_finite() || ridge_alpha < 0.0 {
        return Err(MathError::InvalidInput(
            "Ridge penalty must be a finite, non-negative number".to_string(),
        ));
    }

    let k = rows[0].len();
    if let Some(bad) = rows.iter().position(|row| row.len() != k) {
        return Err(MathError::InvalidInput(format!(
            "Row {} has {} features, expected {}",
            bad,
            rows[bad].len(),
            k
        )));
    }
    if rows.iter().flatten().chain(targets.iter()).any(|v| !v.is_finite()) {
        return Err(MathError::InvalidInput(
            "Rows and targets must be finite".to_string(),
        ));
    }

    let y_mean = targets.iter().sum::<f64>() / n as f64;
    if k == 0 {
        return Ok(LinearModel::new(y_mean, Vec::new()));
    }

    if ridge_alpha == 0.0 && n < k + 1 {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} rows for {} features, got {}",
            k + 1,
            k,
            n
        )));
    }

    let mut x_mean = vec![0.0; k];
    for row in rows {
        for (m, x) in x_mean.iter_mut().zip(row.iter()) {
            *m += x;
        }
    }
    for m in x_mean.iter_mut() {
        *m /= n as f64;
    }

    // Centred X'X and X'y
    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &y) in rows.iter().zip(targets.iter()) {
        let yc = y - y_mean;
        for i in 0..k {
            let xi = row[i] - x_mean[i];
            xty[i] += xi * yc;
            for j in 0..=i {
                xtx[i][j] += xi * (row[j] - x_mean[j]);
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[j][i] = xtx[i][j];
        }
        xtx[i][i] += ridge_alpha;
    }

    let coefficients = cholesky_solve(&xtx, &xty)?;
    let intercept = y_mean
        - coefficients
            .iter()
            .zip(x_mean.iter())
            .map(|(c, m)| c * m)
            .sum::<f64>();

    Ok(LinearModel::new(intercept, coefficients))
}

/// Fit a straight line `y = a + b x`
pub fn fit_line(x: &[f64], y: &[f64]) -> Result<LinearModel> {
    let rows: Vec<Vec<f64>> = x.iter().map(|&v| vec![v]).collect();
    fit_least_squares(&rows, y, 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_fit_line_exact() {
        let model = fit_line(&[2018.0, 2019.0, 2020.0], &[10.0, 20.0, 30.0]).unwrap();
        assert_relative_eq!(model.coefficients()[0], 10.0, epsilon = 1e-8);
        assert_relative_eq!(model.predict(&[2021.0]).unwrap(), 40.0, epsilon = 1e-6);
    }

    #[test]
    fn test_multivariate_recovers_coefficients() {
        // y = 3 + 2a - b
        let rows = vec![
            vec![1.0, 0.0],
            vec![0.0, 1.0],
            vec![2.0, 1.0],
            vec![3.0, 5.0],
            vec![4.0, 2.0],
        ];
        let targets: Vec<f64> = rows.iter().map(|r| 3.0 + 2.0 * r[0] - r[1]).collect();
        let model = fit_least_squares(&rows, &targets, 0.0).unwrap();

        assert_relative_eq!(model.intercept(), 3.0, epsilon = 1e-9);
        assert_relative_eq!(model.coefficients()[0], 2.0, epsilon = 1e-9);
        assert_relative_eq!(model.coefficients()[1], -1.0, epsilon = 1e-9);
        assert!(model.r_squared(&rows, &targets).unwrap() > 0.999_999);
    }

    #[test]
    fn test_constant_column_is_singular() {
        let rows = vec![vec![5.0], vec![5.0], vec![5.0]];
        let err = fit_least_squares(&rows, &[1.0, 2.0, 3.0], 0.0).unwrap_err();
        assert!(matches!(err, MathError::SingularMatrix(_)));
    }

    #[test]
    fn test_ridge_handles_constant_column() {
        let rows = vec![vec![5.0], vec![5.0], vec![5.0]];
        let model = fit_least_squares(&rows, &[1.0, 2.0, 3.0], 1.0).unwrap();
        assert_relative_eq!(model.coefficients()[0], 0.0, epsilon = 1e-12);
        assert_relative_eq!(model.intercept(), 2.0, epsilon = 1e-12);
    }

    #[test]
    fn test_ridge_shrinks_slope() {
        let x = [[1.0], [2.0], [3.0], [4.0]];
        let rows: Vec<Vec<f64>> = x.iter().map(|r| r.to_vec()).collect();
        let y = [2.0, 4.0, 6.0, 8.0];
        let ols = fit_least_squares(&rows, &y, 0.0).unwrap();
        let ridge = fit_least_squares(&rows, &y, 10.0).unwrap();
        assert!(ridge.coefficients()[0] < ols.coefficients()[0]);
    }

    #[test]
    fn test_too_few_rows() {
        let rows = vec![vec![1.0, 2.0], vec![2.0, 1.0]];
        let err = fit_least_squares(&rows, &[1.0, 2.0], 0.0).unwrap_err();
        assert!(matches!(err, MathError::InsufficientData(_)));
    }

    #[test]
    fn test_no_features_gives_mean() {
        let rows = vec![vec![], vec![]];
        let model = fit_least_squares(&rows, &[2.0, 4.0], 0.0).unwrap();
        assert_eq!(model.intercept(), 3.0);
        assert_eq!(model.predict(&[]).unwrap(), 3.0);
    }

    #[test]
    fn test_predict_rejects_wrong_width() {
        let model = LinearModel::new(1.0, vec![1.0, 1.0]);
        assert!(model.predict(&[1.0]).is_err());
    }

    #[test]
    fn test_rejects_non_finite() {
        let rows = vec![vec![1.0], vec![f64::NAN]];
        assert!(fit_least_squares(&rows, &[1.0, 2.0], 0.0).is_err());
    }
}
