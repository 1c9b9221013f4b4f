//! Hold-out evaluation of the recursive forecaster

use crate::error::{ForecastError, Result};
use crate::forecaster::{ForecastConfig, RecursiveForecaster};
use crate::models::Regressor;
use crate::series::Series;
use serde::{Deserialize, Serialize};
use statrs::statistics::Statistics;
use std::fmt;

/// Forecast accuracy metrics
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForecastAccuracy {
    /// Mean Absolute Error
    pub mae: f64,
    /// Mean Squared Error
    pub mse: f64,
    /// Root Mean Squared Error
    pub rmse: f64,
    /// Mean Absolute Percentage Error over non-zero actuals, if any
    pub mape: Option<f64>,
    /// Mean of `actual - forecast`
    pub bias: f64,
}

impl fmt::Display for ForecastAccuracy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Forecast Accuracy Metrics:")?;
        writeln!(f, "  MAE:   {:.4}", self.mae)?;
        writeln!(f, "  MSE:   {:.4}", self.mse)?;
        writeln!(f, "  RMSE:  {:.4}", self.rmse)?;
        match self.mape {
            Some(mape) => writeln!(f, "  MAPE:  {:.4}%", mape)?,
            None => writeln!(f, "  MAPE:  n/a")?,
        }
        writeln!(f, "  Bias:  {:.4}", self.bias)?;
        Ok(())
    }
}

/// Calculate accuracy metrics for a forecast vs actual values
pub fn forecast_accuracy(forecast: &[f64], actual: &[f64]) -> Result<ForecastAccuracy> {
    if forecast.len() != actual.len() || forecast.is_empty() {
        return Err(ForecastError::InvalidParameter(
            "Forecast and actual values must have the same non-zero length".to_string(),
        ));
    }

    let errors: Vec<f64> = forecast
        .iter()
        .zip(actual.iter())
        .map(|(&f, &a)| a - f)
        .collect();

    let mae = errors.iter().map(|e| e.abs()).mean();
    let mse = errors.iter().map(|e| e.powi(2)).mean();
    let bias = errors.iter().mean();

    let percentage: Vec<f64> = actual
        .iter()
        .zip(errors.iter())
        .filter(|(a, _)| **a != 0.0)
        .map(|(&a, &e)| e.abs() / a.abs() * 100.0)
        .collect();
    let mape = if percentage.is_empty() {
        None
    } else {
        Some(percentage.iter().mean())
    };

    Ok(ForecastAccuracy {
        mae,
        mse,
        rmse: mse.sqrt(),
        mape,
        bias,
    })
}

/// Hold-out comparison for one series and target
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct HoldoutReport {
    pub target: String,
    /// Observations held back from training
    pub holdout: usize,
    /// Periods compared
    pub periods: Vec<i64>,
    pub actual: Vec<f64>,
    pub predicted: Vec<f64>,
    pub accuracy: ForecastAccuracy,
}

/// Train on all but the last `holdout` observations, forecast through the
/// held-back periods and score the forecast against them.
///
/// Held-back observations without a target value are skipped.
pub fn evaluate_holdout<R: Regressor>(
    forecaster: &RecursiveForecaster<R>,
    series: &Series,
    target: &str,
    holdout: usize,
) -> Result<HoldoutReport> {
    if holdout == 0 || holdout >= series.len() {
        return Err(ForecastError::InvalidParameter(format!(
            "Hold-out must be between 1 and {} for a series of {} observations",
            series.len().saturating_sub(1),
            series.len()
        )));
    }

    let train_len = series.len() - holdout;
    let head = series.head(train_len);
    let tail = series.tail_after(train_len);

    // The roll-forward starts after the last training row with a target value
    let anchor = head
        .observations()
        .iter()
        .rev()
        .find(|o| o.value(target).is_some())
        .map(|o| o.period())
        .ok_or_else(|| ForecastError::InsufficientHistory {
            series: series.key().to_string(),
            filtered: head.len(),
        })?;
    let end = tail.last().map(|o| o.period()).unwrap_or(anchor);
    let horizon = usize::try_from(end - anchor).map_err(|_| {
        ForecastError::DataError("Hold-out periods precede the training periods".to_string())
    })?;

    let config = ForecastConfig {
        horizon,
        ..forecaster.config().clone()
    };
    let scoped = RecursiveForecaster::new(forecaster.regressor().clone(), config)?;
    let forecast = scoped.forecast(&head, target)?;
    if let Some(err) = forecast.interruption_error() {
        return Err(err);
    }

    let mut periods = Vec::new();
    let mut actual = Vec::new();
    let mut predicted = Vec::new();
    for observation in tail {
        let Some(value) = observation.value(target) else {
            continue;
        };
        if let Some(point) = forecast.points.iter().find(|p| p.period == observation.period()) {
            periods.push(observation.period());
            actual.push(value);
            predicted.push(point.target);
        }
    }

    let accuracy = forecast_accuracy(&predicted, &actual)?;
    Ok(HoldoutReport {
        target: target.to_string(),
        holdout,
        periods,
        actual,
        predicted,
        accuracy,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_forecast_accuracy() {
        let accuracy = forecast_accuracy(&[105.0, 106.0, 107.0], &[106.0, 107.0, 108.0]).unwrap();
        assert_relative_eq!(accuracy.mae, 1.0);
        assert_relative_eq!(accuracy.mse, 1.0);
        assert_relative_eq!(accuracy.rmse, 1.0);
        assert_relative_eq!(accuracy.bias, 1.0);
        assert!(accuracy.mape.unwrap() > 0.9 && accuracy.mape.unwrap() < 1.0);
    }

    #[test]
    fn test_mape_skips_zero_actuals() {
        let accuracy = forecast_accuracy(&[1.0, 0.0], &[0.0, 0.0]).unwrap();
        assert!(accuracy.mape.is_none());
        assert_relative_eq!(accuracy.mae, 0.5);
    }

    #[test]
    fn test_length_mismatch() {
        assert!(forecast_accuracy(&[1.0], &[1.0, 2.0]).is_err());
        assert!(forecast_accuracy(&[], &[]).is_err());
    }
}
