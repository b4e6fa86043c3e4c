use crate::error::AnalyticsError;
use crate::AnalyticsResult;

/// Dense row-major matrix.
pub type Matrix = Vec<Vec<f64>>;

const PIVOT_EPSILON: f64 = 1e-14;

/// Dot product.
pub fn vec_dot(a: &[f64], b: &[f64]) -> f64 {
    a.iter().zip(b.iter()).map(|(x, y)| x * y).sum()
}

/// Matrix-vector multiplication.
pub fn mat_vec_multiply(mat: &[Vec<f64>], v: &[f64]) -> Vec<f64> {
    mat.iter().map(|row| vec_dot(row, v)).collect()
}

/// Quadratic form w' * M * w.
pub fn quad_form(w: &[f64], mat: &[Vec<f64>]) -> f64 {
    vec_dot(w, &mat_vec_multiply(mat, w))
}

/// Matrix-matrix multiplication.
#[allow(clippy::needless_range_loop)]
pub fn mat_multiply(a: &[Vec<f64>], b: &[Vec<f64>]) -> Matrix {
    let m = a.len();
    let p = if m > 0 { a[0].len() } else { 0 };
    let n_cols = if !b.is_empty() { b[0].len() } else { 0 };
    let mut c = vec![vec![0.0; n_cols]; m];
    for i in 0..m {
        for j in 0..n_cols {
            let mut sum = 0.0;
            for k in 0..p {
                sum += a[i][k] * b[k][j];
            }
            c[i][j] = sum;
        }
    }
    c
}

pub fn mat_transpose(a: &[Vec<f64>]) -> Matrix {
    if a.is_empty() {
        return Vec::new();
    }
    let rows = a.len();
    let cols = a[0].len();
    (0..cols)
        .map(|j| (0..rows).map(|i| a[i][j]).collect())
        .collect()
}

pub fn mat_add(a: &[Vec<f64>], b: &[Vec<f64>]) -> Matrix {
    a.iter()
        .zip(b.iter())
        .map(|(ra, rb)| ra.iter().zip(rb.iter()).map(|(x, y)| x + y).collect())
        .collect()
}

pub fn mat_scale(a: &[Vec<f64>], s: f64) -> Matrix {
    a.iter()
        .map(|row| row.iter().map(|x| x * s).collect())
        .collect()
}

/// Matrix inverse via Gauss-Jordan with partial pivoting.
#[allow(clippy::needless_range_loop)]
pub fn mat_inverse(mat: &[Vec<f64>]) -> AnalyticsResult<Matrix> {
    let n = mat.len();
    if n == 0 {
        return Ok(Vec::new());
    }

    let mut aug: Matrix = Vec::with_capacity(n);
    for i in 0..n {
        let mut row = Vec::with_capacity(2 * n);
        row.extend_from_slice(&mat[i]);
        for j in 0..n {
            row.push(if i == j { 1.0 } else { 0.0 });
        }
        aug.push(row);
    }

    for col in 0..n {
        // Partial pivoting
        let mut max_row = col;
        let mut max_val = aug[col][col].abs();
        for row in (col + 1)..n {
            let val = aug[row][col].abs();
            if val > max_val {
                max_val = val;
                max_row = row;
            }
        }

        if max_val < PIVOT_EPSILON {
            return Err(AnalyticsError::SingularMatrix(format!(
                "{n}x{n} matrix has no usable pivot in column {col}"
            )));
        }

        if max_row != col {
            aug.swap(col, max_row);
        }

        let pivot = aug[col][col];
        for cell in aug[col].iter_mut() {
            *cell /= pivot;
        }

        let pivot_row = aug[col].clone();
        for row in 0..n {
            if row == col {
                continue;
            }
            let factor = aug[row][col];
            if factor == 0.0 {
                continue;
            }
            for (cell, &pv) in aug[row].iter_mut().zip(pivot_row.iter()) {
                *cell -= factor * pv;
            }
        }
    }

    Ok(aug.iter().map(|row| row[n..].to_vec()).collect())
}

/// Lower-triangular Cholesky factor of a positive-semidefinite matrix.
///
/// Columns whose pivot collapses to (numerical) zero are left at zero, so a
/// rank-deficient covariance still yields `L * L' == M` on its support.
#[allow(clippy::needless_range_loop)]
pub fn cholesky_psd(mat: &[Vec<f64>]) -> Matrix {
    let n = mat.len();
    let scale = (0..n).map(|i| mat[i][i].abs()).fold(0.0_f64, f64::max);
    let tol = scale.max(1.0) * 1e-12;
    let mut l = vec![vec![0.0; n]; n];
    for j in 0..n {
        let mut diag = mat[j][j];
        for k in 0..j {
            diag -= l[j][k] * l[j][k];
        }
        if diag <= tol {
            continue;
        }
        let ljj = diag.sqrt();
        l[j][j] = ljj;
        for i in (j + 1)..n {
            let mut s = mat[i][j];
            for k in 0..j {
                s -= l[i][k] * l[j][k];
            }
            l[i][j] = s / ljj;
        }
    }
    l
}

/// Check a covariance matrix is n x n, symmetric and has a non-negative diagonal.
#[allow(clippy::needless_range_loop)]
pub fn validate_covariance_matrix(cov: &[Vec<f64>], n: usize) -> AnalyticsResult<()> {
    if cov.len() != n {
        return Err(AnalyticsError::invalid(
            "covariance_matrix",
            format!("Expected {}x{} matrix but got {} rows", n, n, cov.len()),
        ));
    }
    for (i, row) in cov.iter().enumerate() {
        if row.len() != n {
            return Err(AnalyticsError::invalid(
                "covariance_matrix",
                format!("Row {} has {} columns, expected {}", i, row.len(), n),
            ));
        }
        if row.iter().any(|x| !x.is_finite()) {
            return Err(AnalyticsError::invalid(
                "covariance_matrix",
                format!("Row {} contains a non-finite entry", i),
            ));
        }
    }
    let tolerance = 1e-8;
    for i in 0..n {
        if cov[i][i] < 0.0 {
            return Err(AnalyticsError::invalid(
                "covariance_matrix",
                format!("Negative variance on diagonal [{},{}]={}", i, i, cov[i][i]),
            ));
        }
        for j in (i + 1)..n {
            if (cov[i][j] - cov[j][i]).abs() > tolerance {
                return Err(AnalyticsError::invalid(
                    "covariance_matrix",
                    format!(
                        "Not symmetric: [{},{}]={} != [{},{}]={}",
                        i, j, cov[i][j], j, i, cov[j][i]
                    ),
                ));
            }
        }
    }
    Ok(())
}
