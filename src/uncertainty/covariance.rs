//! # Covariance Matrix Calculations
//!
//! The covariance of the fitted parameters is estimated as
//! `covar = redchi * inv(J^T J)`, with `J` the Jacobian of the residuals in
//! external parameter space at the optimum and `redchi = chi^2 / (n - k)`.

use crate::utils::matrix_convert::{nalgebra_to_ndarray, ndarray_to_nalgebra};
use nalgebra::DMatrix;
use ndarray::{Array1, Array2};

/// Smallest eigenvalue, relative to the largest, that the unit-diagonal
/// scaled `J^T J` may have before it is treated as singular.
const SINGULAR_RCOND: f64 = 1e-12;

/// Calculate the covariance matrix from the Jacobian and the reduced chi-square.
///
/// `J^T J` is first scaled to unit diagonal so that parameters of very
/// different magnitude do not look singular. Returns `None` when a column of
/// `J` vanishes or the columns are collinear to working precision.
pub fn calculate_covariance(jacobian: &Array2<f64>, redchi: f64) -> Option<Array2<f64>> {
    let j = ndarray_to_nalgebra(jacobian);
    let jtj = j.transpose() * &j;
    let k = jtj.nrows();
    if k == 0 {
        return None;
    }

    let scale: Vec<f64> = (0..k).map(|i| jtj[(i, i)].sqrt()).collect();
    if scale.iter().any(|s| !s.is_finite() || *s <= 0.0) {
        return None;
    }
    let scaled = DMatrix::from_fn(k, k, |r, c| jtj[(r, c)] / (scale[r] * scale[c]));

    let eigenvalues = scaled.clone().symmetric_eigenvalues();
    let max_eig = eigenvalues.max();
    if !(eigenvalues.min() > max_eig * SINGULAR_RCOND) {
        return None;
    }

    let inverse = scaled.cholesky()?.inverse();
    let covar = DMatrix::from_fn(k, k, |r, c| redchi * inverse[(r, c)] / (scale[r] * scale[c]));
    let covar = nalgebra_to_ndarray(&covar);

    let diagonal_ok = covar.diag().iter().all(|v| v.is_finite() && *v >= 0.0);
    if diagonal_ok {
        Some(covar)
    } else {
        None
    }
}

/// Calculate the correlation matrix from a covariance matrix.
///
/// `correl[i,j] = covar[i,j] / sqrt(covar[i,i] * covar[j,j])`
pub fn calculate_correlation(covar: &Array2<f64>) -> Array2<f64> {
    let n = covar.nrows();
    Array2::from_shape_fn((n, n), |(i, j)| {
        if i == j {
            return 1.0;
        }
        let denom = (covar[[i, i]] * covar[[j, j]]).sqrt();
        if denom > 0.0 {
            covar[[i, j]] / denom
        } else {
            0.0
        }
    })
}

/// Standard errors: square roots of the covariance diagonal.
pub fn standard_errors_from_covariance(covar: &Array2<f64>) -> Array1<f64> {
    covar.diag().mapv(|v| v.max(0.0).sqrt())
}

/// Standard errors of the fitted parameters, if they can be estimated.
///
/// `None` when there are no degrees of freedom (`n <= k`) or `J^T J` is singular.
pub fn standard_errors(jacobian: &Array2<f64>, chisqr: f64) -> Option<Array1<f64>> {
    let (n, k) = jacobian.dim();
    if n <= k {
        return None;
    }
    let redchi = chisqr / (n - k) as f64;
    calculate_covariance(jacobian, redchi).map(|covar| standard_errors_from_covariance(&covar))
}
