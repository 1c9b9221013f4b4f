//! # Lag Math
//!
//! Numerical building blocks for lag-based forecasting.
//! This crate provides an ordinary least squares solver (with an optional
//! ridge penalty) over dense feature rows, plus the Cholesky solve it rests on.

use thiserror::Error;

pub mod linalg;
pub mod regression;

pub use regression::{fit_least_squares, fit_line, LinearModel};

/// Errors that can occur in regression and linear algebra calculations
#[derive(Error, Debug, Clone, PartialEq)]
pub enum MathError {
    #[error("Insufficient data for calculation: {0}")]
    InsufficientData(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Singular system: {0}")]
    SingularMatrix(String),
}

/// Result type for regression math operations
pub type Result<T> = std::result::Result<T, MathError>;
