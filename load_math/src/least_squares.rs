//! Dense linear solves and ordinary least squares

use crate::{MathError, Result};

/// Relative pivot size below which a system is treated as singular
const PIVOT_TOLERANCE: f64 = 1e-12;

/// Solve `a * x = b` by Gaussian elimination with partial pivoting
///
/// `a` is a square matrix given as rows. Both arguments are consumed since
/// elimination happens in place.
pub fn solve_linear_system(mut a: Vec<Vec<f64>>, mut b: Vec<f64>) -> Result<Vec<f64>> {
    let n = b.len();
    if a.len() != n || a.iter().any(|row| row.len() != n) {
        return Err(MathError::InvalidInput(format!(
            "Expected a {}x{} matrix for a right-hand side of length {}",
            n, n, n
        )));
    }
    if n == 0 {
        return Ok(Vec::new());
    }

    let scale = a
        .iter()
        .flat_map(|row| row.iter())
        .fold(0.0_f64, |acc, v| acc.max(v.abs()));
    if scale == 0.0 || !scale.is_finite() {
        return Err(MathError::Singular(
            "Matrix is zero or contains non-finite entries".to_string(),
        ));
    }

    for col in 0..n {
        let pivot_row = (col..n)
            .max_by(|&i, &j| a[i][col].abs().total_cmp(&a[j][col].abs()))
            .unwrap_or(col);

        if a[pivot_row][col].abs() <= PIVOT_TOLERANCE * scale {
            return Err(MathError::Singular(format!(
                "Pivot for column {} vanishes",
                col
            )));
        }

        a.swap(col, pivot_row);
        b.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = a[row][col] / a[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..n {
                a[row][k] -= factor * a[col][k];
            }
            b[row] -= factor * b[col];
        }
    }

    let mut x = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| a[row][k] * x[k]).sum();
        x[row] = (b[row] - tail) / a[row][row];
    }

    Ok(x)
}

/// Ordinary least squares through the normal equations
///
/// Each entry of `design` is one observation's regressor row; `target` holds
/// the matching responses. Returns one coefficient per regressor column.
pub fn ordinary_least_squares(design: &[Vec<f64>], target: &[f64]) -> Result<Vec<f64>> {
    if design.len() != target.len() {
        return Err(MathError::InvalidInput(format!(
            "Design has {} rows but target has {} values",
            design.len(),
            target.len()
        )));
    }
    let columns = design.first().map(|row| row.len()).unwrap_or(0);
    if columns == 0 {
        return Err(MathError::InvalidInput("Design matrix has no columns".to_string()));
    }
    if design.len() < columns {
        return Err(MathError::InsufficientData(format!(
            "Need at least {} observations for {} regressors, got {}",
            columns,
            columns,
            design.len()
        )));
    }

    let mut xtx = vec![vec![0.0; columns]; columns];
    let mut xty = vec![0.0; columns];
    for (row, &y) in design.iter().zip(target) {
        for i in 0..columns {
            xty[i] += row[i] * y;
            for j in i..columns {
                xtx[i][j] += row[i] * row[j];
            }
        }
    }
    for i in 0..columns {
        for j in 0..i {
            xtx[i][j] = xtx[j][i];
        }
    }

    solve_linear_system(xtx, xty)
}
