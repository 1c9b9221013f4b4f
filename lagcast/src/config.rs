//! Application configuration, loaded from a JSON file

use crate::data::ColumnMapping;
use crate::error::Result;
use crate::forecaster::{ClampPolicy, CovariatePolicy, ForecastConfig};
use crate::models::ModelSpec;
use crate::transform::TargetTransform;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::Path;

/// Top-level configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    #[serde(default)]
    pub forecast: ForecastSection,

    #[serde(default)]
    pub data: DataSection,

    #[serde(default)]
    pub batch: BatchSection,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ForecastSection {
    #[serde(default = "default_horizon")]
    pub horizon: usize,

    #[serde(default = "default_features")]
    pub features: Vec<String>,

    #[serde(default)]
    pub transform: TargetTransform,

    #[serde(default)]
    pub clamp: ClampPolicy,

    #[serde(default)]
    pub covariates: CovariatePolicy,

    #[serde(default)]
    pub model: ModelSpec,
}

impl Default for ForecastSection {
    fn default() -> Self {
        Self {
            horizon: default_horizon(),
            features: default_features(),
            transform: TargetTransform::default(),
            clamp: ClampPolicy::default(),
            covariates: CovariatePolicy::default(),
            model: ModelSpec::default(),
        }
    }
}

impl ForecastSection {
    /// Forecaster parameters described by this section
    pub fn forecast_config(&self) -> ForecastConfig {
        ForecastConfig::new(self.horizon, self.features.iter().cloned())
            .with_transform(self.transform)
            .with_clamp(self.clamp)
            .with_covariate_policy(self.covariates)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DataSection {
    #[serde(default = "default_period_column")]
    pub period: String,

    #[serde(default = "default_group_columns")]
    pub groups: Vec<String>,

    #[serde(default = "default_value_columns")]
    pub values: Vec<String>,
}

impl Default for DataSection {
    fn default() -> Self {
        Self {
            period: default_period_column(),
            groups: default_group_columns(),
            values: default_value_columns(),
        }
    }
}

impl DataSection {
    /// Column mapping described by this section
    pub fn column_mapping(&self) -> ColumnMapping {
        ColumnMapping {
            period: self.period.clone(),
            groups: self.groups.clone(),
            values: self.values.clone(),
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BatchSection {
    #[serde(default = "default_parallel")]
    pub parallel: bool,

    #[serde(default)]
    pub cache_models: bool,
}

impl Default for BatchSection {
    fn default() -> Self {
        Self {
            parallel: default_parallel(),
            cache_models: false,
        }
    }
}

impl AppConfig {
    /// Parse a config from JSON text
    pub fn from_json_str(text: &str) -> Result<Self> {
        Ok(serde_json::from_str(text)?)
    }

    /// Read a config from a JSON file
    pub fn from_json_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let text = fs::read_to_string(path)?;
        Self::from_json_str(&text)
    }
}

fn default_horizon() -> usize {
    3
}
fn default_features() -> Vec<String> {
    vec!["lag1".to_string(), "lag2".to_string()]
}
fn default_period_column() -> String {
    "tahun".to_string()
}
fn default_group_columns() -> Vec<String> {
    vec!["provinsi".to_string(), "komoditas".to_string()]
}
fn default_value_columns() -> Vec<String> {
    vec!["produksi".to_string(), "konsumsi".to_string()]
}
fn default_parallel() -> bool {
    true
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_config_uses_defaults() {
        let config = AppConfig::from_json_str("{}").unwrap();
        assert_eq!(config.forecast.horizon, 3);
        assert_eq!(config.forecast.features, vec!["lag1", "lag2"]);
        assert_eq!(config.forecast.model, ModelSpec::Linear);
        assert!(config.batch.parallel);
        assert_eq!(config.data.period, "tahun");
    }

    #[test]
    fn test_partial_config() {
        let config = AppConfig::from_json_str(
            r#"{
                "forecast": {
                    "horizon": 5,
                    "features": ["lag1", "curah_hujan"],
                    "transform": "log1p",
                    "clamp": "non_negative",
                    "covariates": "linear_trend",
                    "model": {"kind": "ridge", "alpha": 0.1}
                },
                "batch": {"parallel": false}
            }"#,
        )
        .unwrap();

        let forecast = config.forecast.forecast_config();
        assert_eq!(forecast.horizon, 5);
        assert_eq!(forecast.clamp, ClampPolicy::NonNegative);
        assert_eq!(forecast.covariates, CovariatePolicy::LinearTrend);
        assert_eq!(forecast.transform.name(), "log1p");
        assert!(forecast.validate().is_ok());
        assert!(!config.batch.parallel);
    }

    #[test]
    fn test_config_from_owned_text() {
        let text = format!(
            "{{\"forecast\": {{\"horizon\": {}, \"transform\": \"log1p\"}}}}",
            4
        );
        let config = AppConfig::from_json_str(&text).unwrap();
        drop(text);
        assert_eq!(config.forecast.horizon, 4);
        assert_eq!(config.forecast.transform.name(), "log1p");
    }

    #[test]
    fn test_invalid_json() {
        assert!(AppConfig::from_json_str("{\"forecast\": {\"horizon\": -1}}").is_err());
    }
}
