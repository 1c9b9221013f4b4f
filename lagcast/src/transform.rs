//! Target transforms applied before fitting and inverted after each prediction

use crate::error::{ForecastError, Result};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Values every transform must round-trip before it is trusted in a roll-forward
pub const REPRESENTATIVE_VALUES: [f64; 2] = [0.0, 1000.0];

const ROUND_TRIP_TOLERANCE: f64 = 1e-9;

/// A forward/inverse pair for the target variable
#[derive(Clone, Copy, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TargetTransform {
    /// Fit on the raw target
    #[default]
    Identity,
    /// `ln(1 + y)`, for skewed non-negative quantities
    Log1p,
    /// Caller-supplied pair
    #[serde(skip)]
    Custom {
        #[serde(skip)]
        name: &'static str,
        forward: fn(f64) -> f64,
        inverse: fn(f64) -> f64,
    },
}

impl fmt::Debug for TargetTransform {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "TargetTransform({})", self.name())
    }
}

impl TargetTransform {
    /// Build a transform from a caller-supplied pair
    pub fn custom(name: &'static str, forward: fn(f64) -> f64, inverse: fn(f64) -> f64) -> Self {
        TargetTransform::Custom {
            name,
            forward,
            inverse,
        }
    }

    /// Display name
    pub fn name(&self) -> &str {
        match self {
            TargetTransform::Identity => "identity",
            TargetTransform::Log1p => "log1p",
            TargetTransform::Custom { name, .. } => name,
        }
    }

    /// Map a raw target into model space
    pub fn forward(&self, value: f64) -> f64 {
        match self {
            TargetTransform::Identity => value,
            TargetTransform::Log1p => value.ln_1p(),
            TargetTransform::Custom { forward, .. } => forward(value),
        }
    }

    /// Map a model-space prediction back to the raw scale
    pub fn inverse(&self, value: f64) -> f64 {
        match self {
            TargetTransform::Identity => value,
            TargetTransform::Log1p => value.exp_m1(),
            TargetTransform::Custom { inverse, .. } => inverse(value),
        }
    }

    /// Transform a whole target vector, failing on any non-finite result
    pub fn forward_all(&self, values: &[f64]) -> Result<Vec<f64>> {
        values
            .iter()
            .map(|&v| {
                let t = self.forward(v);
                if t.is_finite() {
                    Ok(t)
                } else {
                    Err(ForecastError::InvalidTransform(format!(
                        "{} maps {} to a non-finite value",
                        self.name(),
                        v
                    )))
                }
            })
            .collect()
    }

    /// Check that `inverse(forward(x)) == x` within tolerance for the given samples
    /// and for [`REPRESENTATIVE_VALUES`].
    pub fn verify(&self, samples: &[f64]) -> Result<()> {
        if matches!(self, TargetTransform::Identity) {
            return Ok(());
        }

        for &x in REPRESENTATIVE_VALUES.iter().chain(samples.iter()) {
            let back = self.inverse(self.forward(x));
            let tolerance = ROUND_TRIP_TOLERANCE * x.abs().max(1.0);
            if !back.is_finite() || (back - x).abs() > tolerance {
                return Err(ForecastError::InvalidTransform(format!(
                    "{} does not round-trip {} (got {})",
                    self.name(),
                    x,
                    back
                )));
            }
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case(TargetTransform::Identity)]
    #[case(TargetTransform::Log1p)]
    #[case(TargetTransform::custom("sqrt", f64::sqrt, |v| v * v))]
    fn test_round_trip_representative_values(#[case] transform: TargetTransform) {
        for &x in &[0.0, 1000.0, 12.5, 987_654.321] {
            let back = transform.inverse(transform.forward(x));
            assert!((back - x).abs() <= 1e-9 * x.max(1.0), "{:?} at {}", transform, x);
        }
        assert!(transform.verify(&[1.0, 250.0]).is_ok());
    }

    #[test]
    fn test_verify_rejects_broken_pair() {
        let broken = TargetTransform::custom("broken", |v| v * 2.0, |v| v);
        assert!(matches!(
            broken.verify(&[]),
            Err(ForecastError::InvalidTransform(_))
        ));
    }

    #[test]
    fn test_log1p_rejects_values_below_minus_one() {
        let result = TargetTransform::Log1p.forward_all(&[10.0, -2.0]);
        assert!(matches!(result, Err(ForecastError::InvalidTransform(_))));
    }

    #[test]
    fn test_serde_names() {
        let t: TargetTransform = serde_json::from_str("\"log1p\"").unwrap();
        assert_eq!(t.name(), "log1p");
        assert_eq!(serde_json::to_string(&TargetTransform::Identity).unwrap(), "\"identity\"");
    }
}
