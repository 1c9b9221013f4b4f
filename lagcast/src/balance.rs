//! Supply/demand balance: surplus or deficit per period

use crate::error::{ForecastError, Result};
use crate::forecaster::SeriesForecast;
use crate::series::Series;
use serde::{Deserialize, Serialize};

/// Sign of the balance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BalanceStatus {
    Surplus,
    Deficit,
}

impl BalanceStatus {
    /// Surplus when strictly positive, deficit otherwise
    pub fn of(surplus: f64) -> Self {
        if surplus > 0.0 {
            BalanceStatus::Surplus
        } else {
            BalanceStatus::Deficit
        }
    }
}

/// Production against consumption for one period
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BalancePoint {
    pub period: i64,
    pub supply: f64,
    pub demand: f64,
    pub surplus: f64,
    pub status: BalanceStatus,
    /// Whether the values are forecasts rather than observations
    pub projected: bool,
}

impl BalancePoint {
    fn new(period: i64, supply: f64, demand: f64, projected: bool) -> Self {
        let surplus = supply - demand;
        Self {
            period,
            supply,
            demand,
            surplus,
            status: BalanceStatus::of(surplus),
            projected,
        }
    }
}

/// Combine a supply forecast and a demand forecast period by period.
///
/// Both forecasts must cover the same periods; a partial forecast on either
/// side is rejected rather than silently shortened.
pub fn project_balance(supply: &SeriesForecast, demand: &SeriesForecast) -> Result<Vec<BalancePoint>> {
    if supply.periods() != demand.periods() {
        return Err(ForecastError::DataError(format!(
            "Supply ({}) and demand ({}) forecasts cover different periods",
            supply.target, demand.target
        )));
    }

    Ok(supply
        .points
        .iter()
        .zip(demand.points.iter())
        .map(|(s, d)| BalancePoint::new(s.period, s.target, d.target, true))
        .collect())
}

/// Balance over the observed periods where both fields are present
pub fn historical_balance(series: &Series, supply: &str, demand: &str) -> Vec<BalancePoint> {
    series
        .observations()
        .iter()
        .filter_map(|o| match (o.value(supply), o.value(demand)) {
            (Some(s), Some(d)) => Some(BalancePoint::new(o.period(), s, d, false)),
            _ => None,
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::series::{Observation, SeriesKey};

    #[test]
    fn test_status() {
        assert_eq!(BalanceStatus::of(1.0), BalanceStatus::Surplus);
        assert_eq!(BalanceStatus::of(0.0), BalanceStatus::Deficit);
        assert_eq!(BalanceStatus::of(-5.0), BalanceStatus::Deficit);
    }

    #[test]
    fn test_historical_balance_skips_incomplete_periods() {
        let series = Series::new(
            SeriesKey::new(["Aceh", "Jagung"]),
            vec![
                Observation::new(2019).with("produksi", 50.0).with("konsumsi", 40.0),
                Observation::new(2020).with("produksi", 45.0),
                Observation::new(2021).with("produksi", 30.0).with("konsumsi", 42.0),
            ],
        )
        .unwrap();

        let balance = historical_balance(&series, "produksi", "konsumsi");
        assert_eq!(balance.len(), 2);
        assert_eq!(balance[0].surplus, 10.0);
        assert_eq!(balance[0].status, BalanceStatus::Surplus);
        assert_eq!(balance[1].surplus, -12.0);
        assert_eq!(balance[1].status, BalanceStatus::Deficit);
        assert!(!balance[1].projected);
    }
}
