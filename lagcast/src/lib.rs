//! # Lagcast
//!
//! A Rust library for recursive, lag-based forecasting of regional production
//! and consumption series.
//!
//! ## Features
//!
//! - Series data model keyed by group (e.g. province x commodity)
//! - Lag, trend and covariate features with explicit filtering of short history
//! - Pluggable regression backends (OLS, ridge, seeded bagged OLS)
//! - Multi-step roll-forward that feeds each prediction back as the next lag
//! - Batch forecasting with per-series error records, parallel across series
//! - Supply/demand balance projections and hold-out evaluation
//!
//! ## Quick Start
//!
//! ```rust
//! use lagcast::forecaster::{ForecastConfig, RecursiveForecaster};
//! use lagcast::models::LinearRegression;
//! use lagcast::series::{Observation, Series, SeriesKey};
//!
//! let series = Series::new(
//!     SeriesKey::new(["Jawa Barat", "Beras"]),
//!     vec![
//!         Observation::new(2018).with("konsumsi", 100.0),
//!         Observation::new(2019).with("konsumsi", 110.0),
//!         Observation::new(2020).with("konsumsi", 121.0),
//!     ],
//! )?;
//!
//! let forecaster = RecursiveForecaster::new(
//!     LinearRegression::new(),
//!     ForecastConfig::new(2, ["lag1"]),
//! )?;
//! let forecast = forecaster.forecast(&series, "konsumsi")?;
//!
//! assert_eq!(forecast.periods(), vec![2021, 2022]);
//! # Ok::<(), lagcast::ForecastError>(())
//! ```

pub mod balance;
pub mod batch;
pub mod config;
pub mod data;
pub mod error;
pub mod features;
pub mod forecaster;
pub mod metrics;
pub mod models;
pub mod registry;
pub mod series;
pub mod transform;

// Re-export commonly used types
pub use crate::batch::{BatchForecaster, BatchReport, SeriesOutcome};
pub use crate::data::{ColumnMapping, DataLoader};
pub use crate::error::{ErrorKind, ForecastError, Result};
pub use crate::forecaster::{ForecastConfig, RecursiveForecaster, SeriesForecast};
pub use crate::models::{FittedRegressor, Regressor};
pub use crate::series::{Dataset, Observation, Series, SeriesKey};

// Version information
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
pub const NAME: &str = env!("CARGO_PKG_NAME");
