//! Convergence criteria for the Levenberg-Marquardt iteration.

use ndarray::Array1;

/// Possible convergence states of the optimizer.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConvergenceStatus {
    /// The algorithm is still running.
    Running,

    /// Converged due to a small parameter change.
    ParameterConvergence,

    /// Converged due to a small relative change in cost.
    FunctionValueConvergence,

    /// Converged due to a small gradient.
    GradientConvergence,

    /// The damping reached its maximum without finding a better point: the
    /// current parameters are a local minimum to working precision.
    NoFurtherImprovement,

    /// Terminated due to reaching the maximum number of iterations.
    MaxIterationsReached,

    /// Terminated due to a non-finite cost.
    NumericalError,
}

impl ConvergenceStatus {
    pub fn is_terminated(&self) -> bool {
        !matches!(self, ConvergenceStatus::Running)
    }

    pub fn is_converged(&self) -> bool {
        matches!(
            self,
            ConvergenceStatus::ParameterConvergence
                | ConvergenceStatus::FunctionValueConvergence
                | ConvergenceStatus::GradientConvergence
                | ConvergenceStatus::NoFurtherImprovement
        )
    }

    pub fn description(&self) -> &'static str {
        match self {
            ConvergenceStatus::Running => "Optimization is still running",
            ConvergenceStatus::ParameterConvergence => "Converged: small parameter change",
            ConvergenceStatus::FunctionValueConvergence => "Converged: small change in cost",
            ConvergenceStatus::GradientConvergence => "Converged: small gradient",
            ConvergenceStatus::NoFurtherImprovement => "Converged: no step decreases the cost",
            ConvergenceStatus::MaxIterationsReached => "Terminated: maximum iterations reached",
            ConvergenceStatus::NumericalError => "Terminated: non-finite cost",
        }
    }
}

/// Criteria for deciding when an accepted step ends the iteration.
#[derive(Debug, Clone)]
pub struct ConvergenceCriteria {
    /// Tolerance for change in parameter values.
    pub xtol: f64,

    /// Tolerance for relative change in cost.
    pub ftol: f64,

    /// Tolerance for the gradient max-norm.
    pub gtol: f64,

    /// Maximum number of iterations.
    pub max_iterations: usize,
}

impl Default for ConvergenceCriteria {
    fn default() -> Self {
        Self {
            xtol: 1e-10,
            ftol: 1e-10,
            gtol: 1e-12,
            max_iterations: 1000,
        }
    }
}

impl ConvergenceCriteria {
    pub fn new(xtol: f64, ftol: f64, gtol: f64, max_iterations: usize) -> Self {
        Self {
            xtol,
            ftol,
            gtol,
            max_iterations,
        }
    }

    /// Check the state after an accepted step.
    ///
    /// Parameter changes are measured relative to `max(|x|, 1)`, cost changes
    /// relative to the previous cost.
    pub fn check(
        &self,
        params: &Array1<f64>,
        new_params: &Array1<f64>,
        cost: f64,
        new_cost: f64,
        gradient_norm: f64,
        iterations: usize,
    ) -> ConvergenceStatus {
        if !new_cost.is_finite() {
            return ConvergenceStatus::NumericalError;
        }

        if gradient_norm <= self.gtol || new_cost == 0.0 {
            return ConvergenceStatus::GradientConvergence;
        }

        let param_change = new_params
            .iter()
            .zip(params.iter())
            .map(|(a, b)| (a - b).abs() / b.abs().max(1.0))
            .fold(0.0, f64::max);
        if param_change <= self.xtol {
            return ConvergenceStatus::ParameterConvergence;
        }

        let cost_change = (cost - new_cost).abs() / cost.max(f64::MIN_POSITIVE);
        if cost_change <= self.ftol {
            return ConvergenceStatus::FunctionValueConvergence;
        }

        if iterations >= self.max_iterations {
            return ConvergenceStatus::MaxIterationsReached;
        }

        ConvergenceStatus::Running
    }
}
