//! Error types for the lagcast crate

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Custom error types for the lagcast crate
#[derive(Debug, Error)]
pub enum ForecastError {
    /// Requested horizon is below one step
    #[error("Invalid horizon: {0} (must be at least 1)")]
    InvalidHorizon(usize),

    /// No usable training rows remain after lag filtering
    #[error("Insufficient history for series {series}: no usable training rows ({filtered} filtered)")]
    InsufficientHistory { series: String, filtered: usize },

    /// The regression backend could not be trained
    #[error("Model fit failed: {0}")]
    ModelFitFailed(String),

    /// The regression backend failed during the roll-forward
    #[error("Prediction failed at step {step}: {reason}")]
    PredictionFailed { step: usize, reason: String },

    /// A target transform is not a usable forward/inverse pair
    #[error("Invalid transform: {0}")]
    InvalidTransform(String),

    /// Error from invalid parameters
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Error related to data validation or processing
    #[error("Data error: {0}")]
    DataError(String),

    /// Error from IO operations
    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    /// Error from CSV parsing
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    /// Error from JSON (de)serialization
    #[error("Serialization error: {0}")]
    SerializationError(#[from] serde_json::Error),
}

/// Result type with our custom error
pub type Result<T> = std::result::Result<T, ForecastError>;

/// Per-series error tag reported in batch output
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorKind {
    InvalidHorizon,
    InsufficientHistory,
    ModelFitFailed,
    PredictionFailed,
    InvalidTransform,
    InvalidParameter,
    DataError,
    Io,
}

impl ForecastError {
    /// The tag used when this error is recorded against a single series
    pub fn kind(&self) -> ErrorKind {
        match self {
            ForecastError::InvalidHorizon(_) => ErrorKind::InvalidHorizon,
            ForecastError::InsufficientHistory { .. } => ErrorKind::InsufficientHistory,
            ForecastError::ModelFitFailed(_) => ErrorKind::ModelFitFailed,
            ForecastError::PredictionFailed { .. } => ErrorKind::PredictionFailed,
            ForecastError::InvalidTransform(_) => ErrorKind::InvalidTransform,
            ForecastError::InvalidParameter(_) => ErrorKind::InvalidParameter,
            ForecastError::DataError(_) | ForecastError::CsvError(_) => ErrorKind::DataError,
            ForecastError::IoError(_) | ForecastError::SerializationError(_) => ErrorKind::Io,
        }
    }
}
