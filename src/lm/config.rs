//! Configuration options for the Levenberg-Marquardt algorithm.

use serde::{Deserialize, Serialize};

/// Configuration options for the Levenberg-Marquardt algorithm.
///
/// Every field bounds the work one fit may do; there is no unbounded loop.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LmConfig {
    /// Maximum number of accepted steps. Default: 1000
    pub max_iterations: usize,

    /// Relative tolerance for the change in cost. Default: 1e-10
    pub ftol: f64,

    /// Relative tolerance for the change in parameter values. Default: 1e-10
    pub xtol: f64,

    /// Tolerance for the max-norm of the gradient `J^T r`. Default: 1e-12
    pub gtol: f64,

    /// Initial value for the damping parameter. Default: 1e-3
    pub initial_lambda: f64,

    /// Factor by which to increase lambda after a rejected step. Default: 10.0
    pub lambda_up_factor: f64,

    /// Factor by which to decrease lambda after an accepted step. Default: 0.1
    pub lambda_down_factor: f64,

    /// Minimum value for lambda. Default: 1e-12
    pub min_lambda: f64,

    /// Maximum value for lambda. Once reached, no step can decrease the cost. Default: 1e12
    pub max_lambda: f64,
}

impl Default for LmConfig {
    fn default() -> Self {
        Self {
            max_iterations: 1000,
            ftol: 1e-10,
            xtol: 1e-10,
            gtol: 1e-12,
            initial_lambda: 1e-3,
            lambda_up_factor: 10.0,
            lambda_down_factor: 0.1,
            min_lambda: 1e-12,
            max_lambda: 1e12,
        }
    }
}

impl LmConfig {
    pub fn with_max_iterations(mut self, max_iterations: usize) -> Self {
        self.max_iterations = max_iterations;
        self
    }

    pub fn with_ftol(mut self, ftol: f64) -> Self {
        self.ftol = ftol;
        self
    }

    pub fn with_xtol(mut self, xtol: f64) -> Self {
        self.xtol = xtol;
        self
    }

    pub fn with_gtol(mut self, gtol: f64) -> Self {
        self.gtol = gtol;
        self
    }

    /// Set the initial value for the damping parameter.
    pub fn with_lambda(mut self, lambda: f64) -> Self {
        self.initial_lambda = lambda;
        self
    }

    pub fn with_lambda_factors(mut self, up: f64, down: f64) -> Self {
        self.lambda_up_factor = up;
        self.lambda_down_factor = down;
        self
    }

    /// Convergence criteria derived from this configuration
    pub fn criteria(&self) -> super::ConvergenceCriteria {
        super::ConvergenceCriteria::new(self.xtol, self.ftol, self.gtol, self.max_iterations)
    }
}
