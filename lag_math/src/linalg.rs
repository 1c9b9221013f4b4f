//! Dense linear algebra used by the least-squares solver

use crate::{MathError, Result};

/// Relative pivot tolerance below which a system is treated as singular.
pub const PIVOT_TOLERANCE: f64 = 1e-10;

/// Solve `A x = b` for a symmetric positive definite `A` via Cholesky decomposition.
///
/// A pivot that collapses below `PIVOT_TOLERANCE` times the matching diagonal
/// entry of `A` is reported as `MathError::SingularMatrix`, which is what
/// collinear or constant feature columns produce.
pub fn cholesky_solve(a: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Matrix must be {}x{} to match the right-hand side",
            n, n
        )));
    }

    // A = L L'
    let mut l = vec![vec![0.0; n]; n];
    for i in 0..n {
        for j in 0..=i {
            let mut sum = a[i][j];
            for k in 0..j {
                sum -= l[i][k] * l[j][k];
            }

            if i == j {
                let scale = a[i][i].abs();
                if !sum.is_finite() || sum <= PIVOT_TOLERANCE * scale || scale == 0.0 {
                    return Err(MathError::SingularMatrix(format!(
                        "pivot {} collapsed (column is constant or collinear)",
                        i
                    )));
                }
                l[i][j] = sum.sqrt();
            } else {
                l[i][j] = sum / l[j][j];
            }
        }
    }

    // L y = b
    let mut y = vec![0.0; n];
    for i in 0..n {
        let mut sum = b[i];
        for j in 0..i {
            sum -= l[i][j] * y[j];
        }
        y[i] = sum / l[i][i];
    }

    // L' x = y
    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let mut sum = y[i];
        for j in (i + 1)..n {
            sum -= l[j][i] * x[j];
        }
        x[i] = sum / l[i][i];
    }

    Ok(x)
}
