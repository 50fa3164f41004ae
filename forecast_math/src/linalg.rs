//! Small dense linear algebra helpers
//!
//! The regression problems solved in this workspace have at most a few dozen
//! columns, so a direct Gaussian elimination is sufficient.

use crate::{MathError, Result};

/// Diagonal jitter added to normal equations so unpenalised columns stay solvable
const RIDGE_JITTER: f64 = 1e-9;

/// Solve the square system `a * x = b` by Gaussian elimination with partial pivoting
pub fn solve(a: &[Vec<f64>], b: &[f64]) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Expected a {}x{} matrix for a right-hand side of length {}",
            n, n, n
        )));
    }

    // Augmented matrix [a | b]
    let mut m: Vec<Vec<f64>> = a
        .iter()
        .zip(b.iter())
        .map(|(row, &rhs)| {
            let mut r = row.clone();
            r.push(rhs);
            r
        })
        .collect();

    for col in 0..n {
        let pivot = (col..n)
            .max_by(|&i, &j| m[i][col].abs().total_cmp(&m[j][col].abs()))
            .unwrap_or(col);
        if m[pivot][col].abs() < 1e-12 {
            return Err(MathError::CalculationError(
                "Matrix is singular or nearly singular".to_string(),
            ));
        }
        m.swap(col, pivot);

        for row in (col + 1)..n {
            let factor = m[row][col] / m[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                m[row][k] -= factor * m[col][k];
            }
        }
    }

    let mut x = vec![0.0; n];
    for i in (0..n).rev() {
        let tail: f64 = ((i + 1)..n).map(|j| m[i][j] * x[j]).sum();
        x[i] = (m[i][n] - tail) / m[i][i];
    }

    if x.iter().any(|v| !v.is_finite()) {
        return Err(MathError::CalculationError(
            "Solution contains non-finite values".to_string(),
        ));
    }

    Ok(x)
}

/// Ridge-regularised least squares
///
/// Minimises `||y - X b||² + Σ penalties[j] * b[j]²` where `design` holds the
/// rows of `X`. A penalty of zero leaves a coefficient unregularised.
pub fn ridge_least_squares(design: &[Vec<f64>], target: &[f64], penalties: &[f64]) -> Result<Vec<f64>> {
    if design.is_empty() {
        return Err(MathError::InsufficientData(
            "Design matrix has no rows".to_string(),
        ));
    }
    if design.len() != target.len() {
        return Err(MathError::InvalidInput(format!(
            "Design matrix has {} rows but target has {} values",
            design.len(),
            target.len()
        )));
    }

    let k = penalties.len();
    if design.iter().any(|row| row.len() != k) {
        return Err(MathError::InvalidInput(format!(
            "Every design row must have {} columns",
            k
        )));
    }
    if penalties.iter().any(|p| *p < 0.0 || !p.is_finite()) {
        return Err(MathError::InvalidInput(
            "Penalties must be finite and non-negative".to_string(),
        ));
    }

    let mut xtx = vec![vec![0.0; k]; k];
    let mut xty = vec![0.0; k];
    for (row, &y) in design.iter().zip(target.iter()) {
        for i in 0..k {
            xty[i] += row[i] * y;
            for j in i..k {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..k {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
        xtx[i][i] += penalties[i] + RIDGE_JITTER;
    }

    solve(&xtx, &xty)
}
