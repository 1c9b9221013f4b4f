//! Feature construction for training and for the forecast roll-forward
//!
//! Feature names are parsed once into a [`FeatureSet`]:
//!
//! - `lag1`, `lag2`, ... `lagN`: the target value N observations earlier in the same series
//! - `period`: the observation's period as a trend regressor
//! - anything else: a covariate column of the series
//!
//! The same ordered set drives both [`build_training_set`] and
//! [`build_forecast_row`], so training and prediction rows always line up.

use crate::error::{ForecastError, Result};
use crate::series::Series;
use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, HashSet, VecDeque};
use tracing::debug;

/// Name of the trend feature
pub const PERIOD_FEATURE: &str = "period";

/// A single parsed feature
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum Feature {
    /// Target value `n` observations back
    Lag(usize),
    /// The period itself
    Period,
    /// A named exogenous column
    Covariate(String),
}

impl Feature {
    /// Parse a feature name
    pub fn parse(name: &str) -> Result<Self> {
        let name = name.trim();
        if name.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "Feature names must not be empty".to_string(),
            ));
        }
        if name == PERIOD_FEATURE {
            return Ok(Feature::Period);
        }
        if let Some(digits) = name.strip_prefix("lag") {
            if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
                let n: usize = digits.parse().map_err(|_| {
                    ForecastError::InvalidParameter(format!("Lag feature '{}' is out of range", name))
                })?;
                if n == 0 {
                    return Err(ForecastError::InvalidParameter(
                        "lag0 is the target itself and cannot be a feature".to_string(),
                    ));
                }
                return Ok(Feature::Lag(n));
            }
        }
        Ok(Feature::Covariate(name.to_string()))
    }

    /// Canonical name
    pub fn name(&self) -> String {
        match self {
            Feature::Lag(n) => format!("lag{}", n),
            Feature::Period => PERIOD_FEATURE.to_string(),
            Feature::Covariate(name) => name.clone(),
        }
    }
}

/// Ordered, validated feature list shared by training and prediction
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FeatureSet {
    features: Vec<Feature>,
}

impl FeatureSet {
    /// Parse and validate an ordered list of feature names
    pub fn parse<S: AsRef<str>>(names: &[S]) -> Result<Self> {
        if names.is_empty() {
            return Err(ForecastError::InvalidParameter(
                "At least one feature is required".to_string(),
            ));
        }

        let mut seen = HashSet::new();
        let mut features = Vec::with_capacity(names.len());
        for name in names {
            let feature = Feature::parse(name.as_ref())?;
            if !seen.insert(feature.clone()) {
                return Err(ForecastError::InvalidParameter(format!(
                    "Duplicate feature '{}'",
                    feature.name()
                )));
            }
            features.push(feature);
        }

        Ok(Self { features })
    }

    /// Features in column order
    pub fn features(&self) -> &[Feature] {
        &self.features
    }

    /// Canonical names in column order
    pub fn names(&self) -> Vec<String> {
        self.features.iter().map(Feature::name).collect()
    }

    /// Number of columns
    pub fn len(&self) -> usize {
        self.features.len()
    }

    /// Always false for a parsed set
    pub fn is_empty(&self) -> bool {
        self.features.is_empty()
    }

    /// Deepest lag referenced, zero if none
    pub fn max_lag(&self) -> usize {
        self.features
            .iter()
            .filter_map(|f| match f {
                Feature::Lag(n) => Some(*n),
                _ => None,
            })
            .max()
            .unwrap_or(0)
    }

    /// Column index of `lagN`, if present
    pub fn lag_column(&self, n: usize) -> Option<usize> {
        self.features.iter().position(|f| *f == Feature::Lag(n))
    }

    /// Covariate names referenced by the set
    pub fn covariates(&self) -> impl Iterator<Item = &str> {
        self.features.iter().filter_map(|f| match f {
            Feature::Covariate(name) => Some(name.as_str()),
            _ => None,
        })
    }

    /// Fail if `target` is also listed as a covariate
    pub fn check_target(&self, target: &str) -> Result<()> {
        if self.covariates().any(|c| c == target) {
            return Err(ForecastError::InvalidParameter(format!(
                "Target '{}' cannot also be a covariate feature; use lag features instead",
                target
            )));
        }
        Ok(())
    }
}

/// Aligned feature matrix and target vector for one series and target
#[derive(Debug, Clone, PartialEq)]
pub struct TrainingSet {
    rows: Vec<Vec<f64>>,
    targets: Vec<f64>,
    periods: Vec<i64>,
    filtered: usize,
}

impl TrainingSet {
    /// Feature rows
    pub fn rows(&self) -> &[Vec<f64>] {
        &self.rows
    }

    /// Target values, one per row
    pub fn targets(&self) -> &[f64] {
        &self.targets
    }

    /// Period of each row
    pub fn periods(&self) -> &[i64] {
        &self.periods
    }

    /// Observations excluded for missing lags, target or covariates
    pub fn filtered(&self) -> usize {
        self.filtered
    }

    /// Number of usable rows
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Check if no rows survived filtering
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }
}

/// Build the training rows for `target` from a series.
///
/// Observations whose lags reach before the start of the series (or hit a
/// missing target), whose own target is missing, or whose covariates have no
/// value yet are excluded and counted in [`TrainingSet::filtered`]. Covariates
/// missing on an observation take the last earlier value in the series.
pub fn build_training_set(series: &Series, target: &str, features: &FeatureSet) -> Result<TrainingSet> {
    features.check_target(target)?;

    let observations = series.observations();
    let targets: Vec<Option<f64>> = observations.iter().map(|o| o.value(target)).collect();

    let mut carried: BTreeMap<&str, f64> = BTreeMap::new();
    let mut set = TrainingSet {
        rows: Vec::new(),
        targets: Vec::new(),
        periods: Vec::new(),
        filtered: 0,
    };

    for (i, observation) in observations.iter().enumerate() {
        for name in features.covariates() {
            if let Some(v) = observation.value(name) {
                carried.insert(name, v);
            }
        }

        let y = match targets[i] {
            Some(y) => y,
            None => {
                set.filtered += 1;
                continue;
            }
        };

        let row: Option<Vec<f64>> = features
            .features()
            .iter()
            .map(|feature| match feature {
                Feature::Lag(n) => i.checked_sub(*n).and_then(|j| targets[j]),
                Feature::Period => Some(observation.period() as f64),
                Feature::Covariate(name) => carried.get(name.as_str()).copied(),
            })
            .collect();

        match row {
            Some(row) => {
                set.rows.push(row);
                set.targets.push(y);
                set.periods.push(observation.period());
            }
            None => set.filtered += 1,
        }
    }

    debug!(
        series = %series.key(),
        target,
        usable = set.rows.len(),
        filtered = set.filtered,
        "built training set"
    );

    if set.rows.is_empty() {
        return Err(ForecastError::InsufficientHistory {
            series: series.key().to_string(),
            filtered: set.filtered,
        });
    }

    Ok(set)
}

/// Per-run carry-forward record for the roll-forward.
///
/// Holds the current period, the most recent target values (actual history at
/// first, then the forecaster's own emitted values) newest first, and the
/// current covariate values.
#[derive(Debug, Clone, PartialEq)]
pub struct ForecastState {
    period: i64,
    recent: VecDeque<Option<f64>>,
    depth: usize,
    covariates: BTreeMap<String, f64>,
}

impl ForecastState {
    /// Initialise the state from the tail of a series.
    ///
    /// The anchor is the last observation with a target value; trailing rows
    /// without one only contribute covariates. A target missing inside the
    /// lag window takes the last earlier value. Every non-target field of the
    /// series is carried at its last known value.
    pub fn from_series(series: &Series, target: &str, features: &FeatureSet) -> Result<Self> {
        let observations = series.observations();
        let anchor = observations
            .iter()
            .rposition(|o| o.value(target).is_some())
            .ok_or_else(|| ForecastError::InsufficientHistory {
                series: series.key().to_string(),
                filtered: observations.len(),
            })?;

        let mut carried = None;
        let history: Vec<Option<f64>> = observations[..=anchor]
            .iter()
            .map(|o| {
                if let Some(v) = o.value(target) {
                    carried = Some(v);
                }
                carried
            })
            .collect();

        let depth = features.max_lag().max(1);
        let recent: VecDeque<Option<f64>> = history.into_iter().rev().take(depth).collect();

        let mut covariates = BTreeMap::new();
        for observation in series.observations() {
            for (name, value) in observation.values() {
                if name != target {
                    covariates.insert(name.clone(), *value);
                }
            }
        }

        Ok(Self {
            period: observations[anchor].period(),
            recent,
            depth,
            covariates,
        })
    }

    /// Current period
    pub fn period(&self) -> i64 {
        self.period
    }

    /// Target value `n` steps back, if defined
    pub fn lag(&self, n: usize) -> Option<f64> {
        n.checked_sub(1)
            .and_then(|i| self.recent.get(i).copied())
            .flatten()
    }

    /// Current covariate values
    pub fn covariates(&self) -> &BTreeMap<String, f64> {
        &self.covariates
    }

    /// Move to the next period
    pub fn advance(&mut self) {
        self.period += 1;
    }

    /// Override one covariate for the current step
    pub fn set_covariate(&mut self, name: &str, value: f64) {
        self.covariates.insert(name.to_string(), value);
    }

    /// Shift lags and insert the newest target value as `lag1`
    pub fn push_target(&mut self, value: f64) {
        self.recent.push_front(Some(value));
        self.recent.truncate(self.depth);
    }
}

/// Materialise the feature row for the state's current period
pub fn build_forecast_row(state: &ForecastState, features: &FeatureSet) -> Result<Vec<f64>> {
    features
        .features()
        .iter()
        .map(|feature| match feature {
            Feature::Lag(n) => state.lag(*n).ok_or_else(|| {
                ForecastError::DataError(format!(
                    "lag{} is undefined for period {}",
                    n, state.period
                ))
            }),
            Feature::Period => Ok(state.period as f64),
            Feature::Covariate(name) => state.covariates.get(name).copied().ok_or_else(|| {
                ForecastError::DataError(format!(
                    "Covariate '{}' has no known value for period {}",
                    name, state.period
                ))
            }),
        })
        .collect()
}
