//! Implementation of the Levenberg-Marquardt algorithm.

use nalgebra::{DMatrix, DVector};
use ndarray::Array1;
use std::fmt;

use crate::error::{CalibError, Result};
use crate::problem::Problem;
use crate::utils::matrix_convert::{nalgebra_vec_to_ndarray, ndarray_to_nalgebra, ndarray_vec_to_nalgebra};

use super::config::LmConfig;
use super::convergence::ConvergenceStatus;

/// Result of the Levenberg-Marquardt optimization.
#[derive(Debug, Clone)]
pub struct LmResult {
    /// Optimized parameter values
    pub params: Array1<f64>,

    /// Residuals at the solution
    pub residuals: Array1<f64>,

    /// Sum of squared residuals
    pub cost: f64,

    /// Number of accepted steps
    pub iterations: usize,

    /// Number of residual evaluations, Jacobian evaluations included
    pub func_evals: usize,

    /// Whether the optimization converged
    pub success: bool,

    /// How the iteration ended
    pub status: ConvergenceStatus,

    /// A message describing the result
    pub message: String,
}

impl fmt::Display for LmResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Levenberg-Marquardt: {} ({:?})", self.message, self.status)?;
        writeln!(
            f,
            "  cost {:.6e} after {} iterations, {} evaluations",
            self.cost, self.iterations, self.func_evals
        )?;
        writeln!(f, "  params {}", self.params)?;
        Ok(())
    }
}

/// The Levenberg-Marquardt optimizer.
#[derive(Debug, Clone, Default)]
pub struct LevenbergMarquardt {
    config: LmConfig,
}

impl LevenbergMarquardt {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: LmConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &LmConfig {
        &self.config
    }

    /// Minimize the sum of squared residuals for the given problem.
    ///
    /// Returns `Ok` with `success == false` when the iteration limit is hit or
    /// the cost becomes non-finite; errors are reserved for evaluation failures
    /// and bad dimensions.
    pub fn minimize<P: Problem>(&self, problem: &P, initial_params: Array1<f64>) -> Result<LmResult> {
        let n_params = problem.parameter_count();
        if initial_params.len() != n_params {
            return Err(CalibError::DimensionMismatch(format!(
                "Expected {} parameters, got {}",
                n_params,
                initial_params.len()
            )));
        }

        let criteria = self.config.criteria();
        let mut params = initial_params;
        let mut lambda = self.config.initial_lambda;

        let mut residuals = problem.eval(&params)?;
        let mut cost = sum_of_squares(&residuals);
        let mut func_evals = 1;
        let mut iterations = 0;

        if !cost.is_finite() {
            return Ok(LmResult {
                params,
                residuals,
                cost,
                iterations,
                func_evals,
                success: false,
                status: ConvergenceStatus::NumericalError,
                message: "Cost is not finite at the initial parameters".to_string(),
            });
        }

        let status = 'outer: loop {
            if cost == 0.0 {
                break ConvergenceStatus::GradientConvergence;
            }

            let jac = problem.jacobian(&params)?;
            func_evals += n_params + 1;

            let j = ndarray_to_nalgebra(&jac);
            let r = ndarray_vec_to_nalgebra(&residuals);
            let jtj = j.transpose() * &j;
            let g = j.transpose() * &r;

            let gradient_norm = g.amax();
            if !gradient_norm.is_finite() {
                break ConvergenceStatus::NumericalError;
            }
            if gradient_norm <= self.config.gtol {
                break ConvergenceStatus::GradientConvergence;
            }

            // Inner loop: raise the damping until a step decreases the cost
            loop {
                let step = match solve_damped(&jtj, &g, lambda) {
                    Some(step) => step,
                    None => {
                        lambda *= self.config.lambda_up_factor;
                        if lambda >= self.config.max_lambda {
                            break 'outer ConvergenceStatus::NoFurtherImprovement;
                        }
                        continue;
                    }
                };

                let new_params = &params + &nalgebra_vec_to_ndarray(&step);
                let new_residuals = problem.eval(&new_params)?;
                func_evals += 1;
                let new_cost = sum_of_squares(&new_residuals);

                if new_cost.is_finite() && new_cost < cost {
                    iterations += 1;
                    let status = criteria.check(&params, &new_params, cost, new_cost, gradient_norm, iterations);
                    log::debug!(
                        "LM iteration {}: cost {:.6e} -> {:.6e}, lambda {:.1e}",
                        iterations,
                        cost,
                        new_cost,
                        lambda
                    );

                    params = new_params;
                    residuals = new_residuals;
                    cost = new_cost;
                    lambda = (lambda * self.config.lambda_down_factor).max(self.config.min_lambda);

                    if status.is_terminated() {
                        break 'outer status;
                    }
                    break;
                }

                lambda *= self.config.lambda_up_factor;
                if lambda >= self.config.max_lambda {
                    break 'outer ConvergenceStatus::NoFurtherImprovement;
                }
            }
        };

        let message = match status {
            ConvergenceStatus::MaxIterationsReached => {
                format!("Maximum iterations ({}) reached", self.config.max_iterations)
            }
            _ => status.description().to_string(),
        };
        log::debug!("LM finished after {} iterations: {}", iterations, message);

        Ok(LmResult {
            params,
            residuals,
            cost,
            iterations,
            func_evals,
            success: status.is_converged(),
            status,
            message,
        })
    }
}

fn sum_of_squares(residuals: &Array1<f64>) -> f64 {
    residuals.iter().map(|r| r * r).sum()
}

/// Solve `(J^T J + lambda * D) delta = -J^T r` with Marquardt's scaling
/// `D = diag(J^T J)`. Cholesky first, LU when the matrix is not numerically
/// positive definite.
fn solve_damped(jtj: &DMatrix<f64>, g: &DVector<f64>, lambda: f64) -> Option<DVector<f64>> {
    let mut a = jtj.clone();
    for i in 0..a.nrows() {
        let d = jtj[(i, i)].max(1e-12);
        a[(i, i)] += lambda * d;
    }
    let rhs = -g;

    let step = match a.clone().cholesky() {
        Some(chol) => chol.solve(&rhs),
        None => a.lu().solve(&rhs)?,
    };

    if step.iter().all(|v| v.is_finite()) {
        Some(step)
    } else {
        None
    }
}
