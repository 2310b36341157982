//! Problem definition trait and the bounds adapter.
//!
//! A [`Problem`] is a nonlinear least squares problem: a residual vector as a
//! function of a parameter vector. [`BoundedProblem`] presents a problem with
//! box-bounded parameters to the optimizer as an unconstrained one.

use crate::error::{CalibError, Result};
use crate::parameters::{Bounds, BoundsTransform};
use ndarray::{Array1, Array2};

/// A trait representing a nonlinear least squares problem.
pub trait Problem {
    /// Evaluate the residuals at the given parameters.
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>>;

    /// Get the number of parameters in the problem.
    fn parameter_count(&self) -> usize;

    /// Get the number of residuals in the problem.
    fn residual_count(&self) -> usize;

    /// Evaluate the Jacobian matrix at the given parameters.
    ///
    /// The default implementation uses forward finite differences.
    fn jacobian(&self, params: &Array1<f64>) -> Result<Array2<f64>>
    where
        Self: Sized,
    {
        crate::utils::finite_difference::jacobian(self, params, None)
    }

    /// Evaluate the sum of squared residuals at the given parameters.
    fn eval_cost(&self, params: &Array1<f64>) -> Result<f64> {
        let residuals = self.eval(params)?;
        Ok(residuals.iter().map(|r| r.powi(2)).sum())
    }
}

/// Wraps a problem with bounded parameters so the optimizer can vary
/// unconstrained internal values.
pub struct BoundedProblem<'a, P: Problem> {
    inner: &'a P,
    transforms: Vec<BoundsTransform>,
}

impl<'a, P: Problem> BoundedProblem<'a, P> {
    /// Create the adapter, one bounds entry per parameter of `inner`.
    pub fn new(inner: &'a P, bounds: &[Bounds]) -> Result<Self> {
        if bounds.len() != inner.parameter_count() {
            return Err(CalibError::DimensionMismatch(format!(
                "Expected {} bounds, got {}",
                inner.parameter_count(),
                bounds.len()
            )));
        }

        Ok(Self {
            inner,
            transforms: bounds.iter().copied().map(BoundsTransform::new).collect(),
        })
    }

    /// Map internal optimizer values to the bounded external values.
    pub fn to_external(&self, internal: &Array1<f64>) -> Array1<f64> {
        internal
            .iter()
            .zip(&self.transforms)
            .map(|(&t, transform)| transform.to_external(t))
            .collect()
    }

    /// Map external values into the optimizer's internal space.
    pub fn to_internal(&self, external: &Array1<f64>) -> Result<Array1<f64>> {
        let internal = external
            .iter()
            .zip(&self.transforms)
            .map(|(&v, transform)| transform.to_internal(v))
            .collect::<std::result::Result<Vec<f64>, _>>()?;
        Ok(Array1::from_vec(internal))
    }
}

impl<P: Problem> Problem for BoundedProblem<'_, P> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        self.inner.eval(&self.to_external(params))
    }

    fn parameter_count(&self) -> usize {
        self.inner.parameter_count()
    }

    fn residual_count(&self) -> usize {
        self.inner.residual_count()
    }
}
