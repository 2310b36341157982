//! Finite difference Jacobians.
//!
//! Signal laws are plain compiled expressions, so derivatives of the residuals
//! are taken numerically. The optimizer uses the cheap forward scheme; the
//! covariance estimate uses central differences.

use crate::error::{CalibError, Result};
use crate::problem::Problem;
use ndarray::{Array1, Array2};

/// Default relative step for forward differences, about `sqrt(f64::EPSILON)`.
const DEFAULT_EPSILON: f64 = 1.490_116_119_384_765_6e-8;

/// Default relative step for central differences, about `cbrt(f64::EPSILON)`.
const DEFAULT_CENTRAL_EPSILON: f64 = 6.055_454_452_393_343e-6;

fn step_size(param: f64, eps: f64) -> f64 {
    if param.abs() > 1.0 {
        param.abs() * eps
    } else {
        eps
    }
}

fn check_len(expected: usize, residuals: &Array1<f64>) -> Result<()> {
    if residuals.len() != expected {
        return Err(CalibError::DimensionMismatch(format!(
            "Expected {} residuals, got {}",
            expected,
            residuals.len()
        )));
    }
    Ok(())
}

/// Compute the Jacobian `J[i,j] = d residual[i] / d param[j]` using forward
/// finite differences.
pub fn jacobian(problem: &dyn Problem, params: &Array1<f64>, epsilon: Option<f64>) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_EPSILON);
    let n_params = params.len();
    let n_residuals = problem.residual_count();

    let residuals = problem.eval(params)?;
    check_len(n_residuals, &residuals)?;

    let mut jac = Array2::zeros((n_residuals, n_params));
    for j in 0..n_params {
        let h = step_size(params[j], eps);
        let mut perturbed = params.clone();
        perturbed[j] += h;

        let residuals_perturbed = problem.eval(&perturbed)?;
        check_len(n_residuals, &residuals_perturbed)?;

        for i in 0..n_residuals {
            jac[[i, j]] = (residuals_perturbed[i] - residuals[i]) / h;
        }
    }

    Ok(jac)
}

/// Compute the Jacobian using central finite differences.
///
/// Twice the evaluations of [`jacobian`], second-order accurate.
pub fn jacobian_central(problem: &dyn Problem, params: &Array1<f64>, epsilon: Option<f64>) -> Result<Array2<f64>> {
    let eps = epsilon.unwrap_or(DEFAULT_CENTRAL_EPSILON);
    let n_params = params.len();
    let n_residuals = problem.residual_count();

    let mut jac = Array2::zeros((n_residuals, n_params));
    for j in 0..n_params {
        let h = step_size(params[j], eps);

        let mut forward = params.clone();
        forward[j] += h;
        let mut backward = params.clone();
        backward[j] -= h;

        let r_forward = problem.eval(&forward)?;
        let r_backward = problem.eval(&backward)?;
        check_len(n_residuals, &r_forward)?;
        check_len(n_residuals, &r_backward)?;

        for i in 0..n_residuals {
            jac[[i, j]] = (r_forward[i] - r_backward[i]) / (2.0 * h);
        }
    }

    Ok(jac)
}
