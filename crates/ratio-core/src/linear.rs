//! Dense Gaussian elimination with partial pivoting.

/// Pivots with a magnitude below this are treated as zero.
pub const DEFAULT_PIVOT_TOLERANCE: f64 = 1e-10;

/// Solve `matrix · x = constants` for a square system.
///
/// Returns `None` when the system is empty, not square, dimension-mismatched,
/// singular (or nearly so), or inconsistent.
pub fn solve_linear_system(matrix: &[Vec<f64>], constants: &[f64]) -> Option<Vec<f64>> {
    solve_linear_system_with_tolerance(matrix, constants, DEFAULT_PIVOT_TOLERANCE)
}

/// Like [`solve_linear_system`], with an explicit pivot tolerance.
pub fn solve_linear_system_with_tolerance(
    matrix: &[Vec<f64>],
    constants: &[f64],
    tolerance: f64,
) -> Option<Vec<f64>> {
    let n = matrix.len();
    if n == 0 || constants.len() != n || matrix.iter().any(|row| row.len() != n) {
        return None;
    }

    // Augmented matrix [A | b].
    let mut aug: Vec<Vec<f64>> = matrix
        .iter()
        .zip(constants)
        .map(|(row, &b)| {
            let mut r = row.clone();
            r.push(b);
            r
        })
        .collect();

    for col in 0..n {
        let pivot_row =
            (col..n).max_by(|&a, &b| aug[a][col].abs().total_cmp(&aug[b][col].abs()))?;
        let pivot = aug[pivot_row][col].abs();
        if pivot.is_nan() || pivot < tolerance {
            return None;
        }
        aug.swap(col, pivot_row);

        for row in (col + 1)..n {
            let factor = aug[row][col] / aug[col][col];
            if factor == 0.0 {
                continue;
            }
            for k in col..=n {
                aug[row][k] -= factor * aug[col][k];
            }
        }
    }

    let mut solution = vec![0.0; n];
    for row in (0..n).rev() {
        let tail: f64 = ((row + 1)..n).map(|k| aug[row][k] * solution[k]).sum();
        solution[row] = (aug[row][n] - tail) / aug[row][row];
    }

    if solution.iter().all(|v| v.is_finite()) {
        Some(solution)
    } else {
        None
    }
}
