//! # Lagcast workspace
//!
//! Umbrella crate re-exporting the workspace members:
//!
//! - [`lagcast`]: recursive lag-based forecasting of grouped yearly series
//! - [`lag_math`]: least-squares fitting used by the regression backends
//!
//! ## Example
//!
//! ```
//! use lagcast_workspace::lag_math::fit_line;
//!
//! let line = fit_line(&[2019.0, 2020.0, 2021.0], &[10.0, 12.0, 14.0]).unwrap();
//! assert!((line.predict(&[2022.0]).unwrap() - 16.0).abs() < 1e-9);
//! ```

pub use lag_math;
pub use lagcast;
