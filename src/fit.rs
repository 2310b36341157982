//! Nonlinear fitting of calibration models.
//!
//! [`Fitter`] estimates the parameters of a [`CalibrationModel`] from
//! reference `(concentration, signal)` pairs with Levenberg-Marquardt on
//! bound-transformed parameters. The model is only touched when the fit
//! succeeds.

use crate::equation::CompiledEquation;
use crate::error::{CalibError, Result};
use crate::lm::{LevenbergMarquardt, LmConfig};
use crate::model::{CalibrationModel, CalibrationRange};
use crate::parameters::Bounds;
use crate::problem::{BoundedProblem, Problem};
use crate::statistics::FitStatistics;
use crate::uncertainty;
use crate::utils::finite_difference;
use ndarray::Array1;
use serde::{Deserialize, Serialize};

/// Residuals `f(x_i; p) - y_i` of a compiled signal law, in external
/// parameter space.
pub struct EquationProblem<'a> {
    equation: &'a CompiledEquation,
    x: Vec<f64>,
    y: Vec<f64>,
}

impl<'a> EquationProblem<'a> {
    /// `x` and `y` must already be free of NaN pairs.
    pub fn new(equation: &'a CompiledEquation, x: Vec<f64>, y: Vec<f64>) -> Self {
        Self { equation, x, y }
    }

    pub fn observed(&self) -> &[f64] {
        &self.y
    }
}

impl Problem for EquationProblem<'_> {
    fn eval(&self, params: &Array1<f64>) -> Result<Array1<f64>> {
        let params = params.as_slice().ok_or_else(|| {
            CalibError::InvalidInput("parameter vector is not contiguous".to_string())
        })?;
        Ok(self
            .x
            .iter()
            .zip(&self.y)
            .map(|(&x, &y)| self.equation.eval(x, params) - y)
            .collect())
    }

    fn parameter_count(&self) -> usize {
        self.equation.parameter_count()
    }

    fn residual_count(&self) -> usize {
        self.x.len()
    }
}

/// Fits calibration models with a fixed optimizer configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Fitter {
    pub config: LmConfig,
}

impl Fitter {
    pub fn new(config: LmConfig) -> Self {
        Self { config }
    }

    /// Fit `model` to the concentrations `x` and signals `y`.
    ///
    /// Pairs with a NaN on either side are left out of the residuals but still
    /// count for the reported calibration range. On success the parameter
    /// values and standard errors, the range, the statistics and `was_fitted`
    /// are written to the model; on failure the model is left as it was.
    ///
    /// # Errors
    ///
    /// * `DimensionMismatch` if `x` and `y` differ in length, hold fewer than
    ///   `k + 1` entries, or fewer than `k` usable pairs remain
    /// * `FitConvergence` if the optimizer does not converge
    pub fn fit(&self, model: &mut CalibrationModel, x: &Array1<f64>, y: &Array1<f64>) -> Result<FitStatistics> {
        let k = model.parameters().len();
        if x.len() != y.len() {
            return Err(CalibError::DimensionMismatch(format!(
                "{} concentrations but {} signals",
                x.len(),
                y.len()
            )));
        }
        if x.len() < k + 1 {
            return Err(CalibError::DimensionMismatch(format!(
                "Model '{}' has {} parameters and needs at least {} samples, got {}",
                model.name(),
                k,
                k + 1,
                x.len()
            )));
        }

        let (xs, ys): (Vec<f64>, Vec<f64>) = x
            .iter()
            .zip(y.iter())
            .filter(|(xi, yi)| !xi.is_nan() && !yi.is_nan())
            .map(|(&xi, &yi)| (xi, yi))
            .unzip();
        if xs.len() < k {
            return Err(CalibError::DimensionMismatch(format!(
                "Model '{}' has {} parameters, only {} samples are not NaN",
                model.name(),
                k,
                xs.len()
            )));
        }
        let range = CalibrationRange::from_data(&x.to_vec(), &y.to_vec());

        let problem = EquationProblem::new(model.equation(), xs, ys);
        let bounds: Vec<Bounds> = model.parameters().iter().map(|p| p.bounds()).collect();
        let bounded = BoundedProblem::new(&problem, &bounds)?;
        let start = bounded.to_internal(&Array1::from_vec(model.parameters().init_values()))?;

        let optimizer = LevenbergMarquardt::with_config(self.config.clone());
        let result = optimizer.minimize(&bounded, start)?;
        if !result.success {
            log::warn!("Fit of model '{}' failed: {}", model.name(), result.message);
            return Err(CalibError::FitConvergence(format!("model '{}': {}", model.name(), result.message)));
        }

        let values = bounded.to_external(&result.params);
        let residuals = problem.eval(&values)?;
        let jacobian = finite_difference::jacobian_central(&problem, &values, None)?;
        let stderrs = uncertainty::standard_errors(&jacobian, result.cost);

        let residuals = residuals.to_vec();
        let statistics = FitStatistics::from_residuals(&residuals, problem.observed(), k);

        let values = values.to_vec();
        let stderrs = stderrs.map(|s| s.to_vec());
        model.commit_fit(&values, stderrs.as_deref(), range, statistics);

        log::info!(
            "Fitted model '{}' in {} iterations: AIC {:.3}, R² {:.5}",
            model.name(),
            result.iterations,
            statistics.aic,
            statistics.r2
        );
        Ok(statistics)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::array;

    fn linear() -> CalibrationModel {
        CalibrationModel::new("linear", "a * x + b", "x").unwrap()
    }

    #[test]
    fn test_exact_linear_fit() {
        let mut model = linear();
        let x = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = array![3.0, 5.0, 7.0, 9.0, 11.0];

        let stats = Fitter::default().fit(&mut model, &x, &y).unwrap();

        assert!(model.was_fitted());
        assert_relative_eq!(model.parameter("a").unwrap().value().unwrap(), 2.0, epsilon = 1e-6);
        assert_relative_eq!(model.parameter("b").unwrap().value().unwrap(), 1.0, epsilon = 1e-6);
        assert_relative_eq!(stats.r2, 1.0, epsilon = 1e-9);
        assert!(stats.aic.is_finite());

        let range = model.calibration_range().unwrap();
        assert_eq!((range.conc_lower, range.conc_upper), (1.0, 5.0));
        assert_eq!((range.signal_lower, range.signal_upper), (3.0, 11.0));
    }

    #[test]
    fn test_stderr_matches_ordinary_least_squares() {
        let mut model = linear();
        let x = array![0.0, 1.0, 2.0, 3.0];
        let y = array![1.1, 2.9, 5.2, 6.8];

        Fitter::default().fit(&mut model, &x, &y).unwrap();

        // var(slope) = s^2 / Sxx for ordinary least squares
        let n = 4.0;
        let x_mean = 1.5;
        let sxx: f64 = x.iter().map(|v| (v - x_mean).powi(2)).sum();
        let slope = model.parameter("a").unwrap().value().unwrap();
        let intercept = model.parameter("b").unwrap().value().unwrap();
        let ss: f64 = x.iter().zip(y.iter()).map(|(xi, yi)| (slope * xi + intercept - yi).powi(2)).sum();
        let s2 = ss / (n - 2.0);

        let stderr_a = model.parameter("a").unwrap().stderr().unwrap();
        assert_relative_eq!(stderr_a, (s2 / sxx).sqrt(), max_relative = 1e-5);
    }

    #[test]
    fn test_nan_pairs_are_skipped() {
        let mut model = linear();
        let x = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = array![3.0, f64::NAN, 7.0, 9.0, 11.0];

        Fitter::default().fit(&mut model, &x, &y).unwrap();
        assert_relative_eq!(model.parameter("a").unwrap().value().unwrap(), 2.0, epsilon = 1e-6);

        // concentration 2.0 still counts for the range
        let x = array![0.5, 2.0, 3.0, 4.0];
        let y = array![f64::NAN, 5.0, 7.0, 9.0];
        Fitter::default().fit(&mut model, &x, &y).unwrap();
        assert_eq!(model.calibration_range().unwrap().conc_lower, 0.5);
    }

    #[test]
    fn test_dimension_errors() {
        let fitter = Fitter::default();
        let mut model = linear();

        let err = fitter.fit(&mut model, &array![1.0, 2.0, 3.0], &array![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, CalibError::DimensionMismatch(_)));

        let err = fitter.fit(&mut model, &array![1.0, 2.0], &array![1.0, 2.0]).unwrap_err();
        assert!(matches!(err, CalibError::DimensionMismatch(_)));

        let nan = f64::NAN;
        let err = fitter
            .fit(&mut model, &array![1.0, 2.0, 3.0], &array![nan, nan, 1.0])
            .unwrap_err();
        assert!(matches!(err, CalibError::DimensionMismatch(_)));
        assert!(!model.was_fitted());
    }

    #[test]
    fn test_no_degrees_of_freedom_gives_no_stderr() {
        let mut model = linear();
        let x = array![1.0, 2.0, 3.0];
        let y = array![3.0, 5.0, f64::NAN];

        Fitter::default().fit(&mut model, &x, &y).unwrap();
        assert!(model.was_fitted());
        assert!(model.parameter("a").unwrap().stderr().is_none());
    }

    #[test]
    fn test_bounds_are_honoured() {
        let mut model = linear().with_parameter("a", 1.0, 0.0, 1.5).unwrap();
        let x = array![1.0, 2.0, 3.0, 4.0, 5.0];
        let y = array![3.0, 5.0, 7.0, 9.0, 11.0];

        Fitter::default().fit(&mut model, &x, &y).unwrap();
        let a = model.parameter("a").unwrap().value().unwrap();
        assert!(a <= 1.5 && a >= 0.0);
        assert_relative_eq!(a, 1.5, epsilon = 1e-3);
    }

    #[test]
    fn test_failed_fit_commits_nothing() {
        let mut model = linear();
        let x = array![1.0, 2.0, 3.0];
        let y = array![3.0, 5.0, 7.0];
        Fitter::default().fit(&mut model, &x, &y).unwrap();
        let before = model.parameters().clone();

        let fitter = Fitter::new(LmConfig::default().with_max_iterations(0));
        let y = array![30.0, 50.0, 70.0];
        assert!(matches!(
            fitter.fit(&mut model, &x, &y),
            Err(CalibError::FitConvergence(_))
        ));
        assert!(model.was_fitted());
        assert_eq!(model.parameters(), &before);
    }
}
