//! Integration tests for the optimizer and the fitting engine

use crate::test_helpers::noisy_signals;
use approx::assert_relative_eq;
use calib_rs::lm::{ConvergenceStatus, LevenbergMarquardt, LmConfig};
use calib_rs::{CalibError, CalibrationModel, Fitter, Problem};
use ndarray::{array, Array1};

/// Exponential decay y = a * exp(-b * t) + c
struct DecayProblem {
    t: Array1<f64>,
    y: Array1<f64>,
}

impl Problem for DecayProblem {
    fn eval(&self, params: &Array1<f64>) -> calib_rs::Result<Array1<f64>> {
        let (a, b, c) = (params[0], params[1], params[2]);
        Ok(self
            .t
            .iter()
            .zip(self.y.iter())
            .map(|(&t, &y)| a * (-b * t).exp() + c - y)
            .collect())
    }

    fn parameter_count(&self) -> usize {
        3
    }

    fn residual_count(&self) -> usize {
        self.t.len()
    }
}

#[test]
fn test_lm_recovers_decay_parameters() {
    let t = Array1::linspace(0.0, 5.0, 30);
    let y = t.mapv(|t: f64| 4.0 * (-1.3 * t).exp() + 0.5);
    let problem = DecayProblem { t, y };

    let result = LevenbergMarquardt::new()
        .minimize(&problem, array![1.0, 0.5, 0.0])
        .unwrap();

    assert!(result.success, "{}", result);
    assert!(result.status.is_converged());
    assert_relative_eq!(result.params[0], 4.0, epsilon = 1e-5);
    assert_relative_eq!(result.params[1], 1.3, epsilon = 1e-5);
    assert_relative_eq!(result.params[2], 0.5, epsilon = 1e-5);
}

#[test]
fn test_lm_reports_iteration_limit() {
    let t = Array1::linspace(0.0, 5.0, 30);
    let y = t.mapv(|t: f64| 4.0 * (-1.3 * t).exp() + 0.5);
    let problem = DecayProblem { t, y };

    let result = LevenbergMarquardt::with_config(LmConfig::default().with_max_iterations(1))
        .minimize(&problem, array![1.0, 0.5, 0.0])
        .unwrap();

    assert!(!result.success);
    assert_eq!(result.status, ConvergenceStatus::MaxIterationsReached);
}

#[test]
fn test_noisy_quadratic_fit() {
    let x = Array1::linspace(0.0, 10.0, 21);
    let y = noisy_signals(|c| 0.05 * c * c + 0.8 * c, &x, 0.02, 7);

    let mut model = CalibrationModel::new("quadratic", "a * c**2 + b * c", "c").unwrap();
    let stats = Fitter::default().fit(&mut model, &x, &y).unwrap();

    let a = model.parameter("a").unwrap();
    let b = model.parameter("b").unwrap();
    assert!((a.value().unwrap() - 0.05).abs() < 4.0 * a.stderr().unwrap());
    assert!((b.value().unwrap() - 0.8).abs() < 4.0 * b.stderr().unwrap());
    assert!(stats.r2 > 0.999);
    assert!(stats.rmsd < 0.05);
    assert!(stats.bic > stats.aic);
}

#[test]
fn test_refit_replaces_previous_results() {
    let x = array![1.0, 2.0, 3.0, 4.0];
    let mut model = CalibrationModel::new("origin", "a * c", "c").unwrap();
    let fitter = Fitter::default();

    fitter.fit(&mut model, &x, &array![2.0, 4.0, 6.0, 8.0]).unwrap();
    assert_relative_eq!(model.parameter("a").unwrap().value().unwrap(), 2.0, epsilon = 1e-8);

    fitter.fit(&mut model, &x, &array![3.0, 6.0, 9.0, 12.0]).unwrap();
    assert_relative_eq!(model.parameter("a").unwrap().value().unwrap(), 3.0, epsilon = 1e-8);
    assert_eq!(model.calibration_range().unwrap().signal_upper, 12.0);

    model.reset();
    assert!(!model.was_fitted());
    assert!(model.parameter("a").unwrap().value().is_none());
    assert!(matches!(model.fitted_values(), Err(CalibError::UnfittedModel(_))));
}

#[test]
fn test_evaluate_uses_fitted_values() {
    let mut model = CalibrationModel::new("affine", "a * c + b", "c").unwrap();
    Fitter::default()
        .fit(&mut model, &array![0.0, 1.0, 2.0], &array![1.0, 3.0, 5.0])
        .unwrap();

    let signals = model.evaluate(&array![0.5, 10.0]).unwrap();
    assert_relative_eq!(signals[0], 2.0, epsilon = 1e-6);
    assert_relative_eq!(signals[1], 21.0, epsilon = 1e-5);
}
