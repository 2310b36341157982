//! End-to-end calibration sessions

use crate::test_helpers::{array_approx_eq, noisy_signals};
use approx::assert_relative_eq;
use calib_rs::{CalibError, Calibrator, CalibratorConfig, Sample, Standard};
use ndarray::{array, Array1};

fn concrete_session() -> Calibrator {
    let mut calibrator = Calibrator::from_arrays(
        "x",
        &[1.0, 2.0, 3.0, 4.0, 5.0],
        &[3.0, 5.0, 7.0, 9.0, 11.0],
        "mM",
    )
    .unwrap();
    calibrator
        .add_model("affine", "a * x + b", 1.0, f64::NEG_INFINITY, f64::INFINITY)
        .unwrap();
    calibrator
}

#[test]
fn test_concrete_scenario() {
    let mut calibrator = concrete_session();
    assert!(calibrator.fit_all().is_complete());

    let model = calibrator.get_model("affine").unwrap();
    assert_relative_eq!(model.parameter("a").unwrap().value().unwrap(), 2.0, epsilon = 1e-6);
    assert_relative_eq!(model.parameter("b").unwrap().value().unwrap(), 1.0, epsilon = 1e-6);

    let conc = calibrator
        .calculate_concentrations("affine", &array![3.0, 5.0, 7.0, 9.0, 11.0], false)
        .unwrap();
    assert!(array_approx_eq(&conc, &array![1.0, 2.0, 3.0, 4.0, 5.0], 1e-6));

    let conc = calibrator.calculate_concentrations("affine", &array![13.0], false).unwrap();
    assert!(conc[0].is_nan());
    let conc = calibrator.calculate_concentrations("affine", &array![13.0], true).unwrap();
    assert_relative_eq!(conc[0], 6.0, epsilon = 1e-6);
}

#[test]
fn test_linear_recovery_from_noisy_data() {
    let x = Array1::linspace(0.0, 8.0, 17);
    let y = noisy_signals(|c| 0.25 * c, &x, 0.005, 42);

    let mut calibrator = Calibrator::from_arrays("s0", x.as_slice().unwrap(), y.as_slice().unwrap(), "mmol / l")
        .unwrap()
        .with_default_models()
        .unwrap();
    calibrator.fit_all();

    let slope = calibrator.get_model("linear").unwrap().parameter("a").unwrap();
    assert!((slope.value().unwrap() - 0.25).abs() < 4.0 * slope.stderr().unwrap());
}

#[test]
fn test_inverse_round_trip_inside_range() {
    let x = Array1::linspace(0.5, 5.0, 10);
    let y = x.mapv(|c: f64| 0.1 * c * c + 0.4 * c);

    let mut calibrator = Calibrator::from_arrays("s0", x.as_slice().unwrap(), y.as_slice().unwrap(), "mM")
        .unwrap()
        .with_default_models()
        .unwrap();
    assert!(calibrator.fit_all().is_complete());

    let conc = calibrator.calculate_concentrations("quadratic", &y, false).unwrap();
    assert!(array_approx_eq(&conc, &x, 1e-5));
}

#[test]
fn test_nan_signals_stay_nan() {
    let mut calibrator = concrete_session();
    calibrator.fit_all();

    let conc = calibrator
        .calculate_concentrations("affine", &array![f64::NAN, 5.0, f64::NAN], true)
        .unwrap();
    assert!(conc[0].is_nan() && conc[2].is_nan());
    assert_relative_eq!(conc[1], 2.0, epsilon = 1e-6);
}

#[test]
fn test_cutoff_before_fit() {
    // saturation above signal 9
    let mut calibrator = Calibrator::from_arrays(
        "x",
        &[1.0, 2.0, 3.0, 4.0, 5.0, 6.0],
        &[3.0, 5.0, 7.0, 9.0, 9.1, 9.15],
        "mM",
    )
    .unwrap()
    .with_cutoff(9.0);
    calibrator.add_model("affine", "a * x + b", 1.0, -1e3, 1e3).unwrap();

    assert!(calibrator.fit_all().is_complete());
    assert_eq!(calibrator.samples().len(), 3);
    let first = calibrator.samples().to_vec();

    calibrator.apply_cutoff();
    assert_eq!(calibrator.samples(), first.as_slice());

    let model = calibrator.get_model("affine").unwrap();
    assert_relative_eq!(model.parameter("a").unwrap().value().unwrap(), 2.0, epsilon = 1e-6);
    assert_eq!(model.calibration_range().unwrap().conc_upper, 3.0);
}

#[test]
fn test_ranking_orders_by_aic() {
    let x = Array1::linspace(0.0, 10.0, 21);
    let y = noisy_signals(|c| 0.04 * c * c + 0.3 * c, &x, 0.01, 3);

    let mut calibrator = Calibrator::from_arrays("s0", x.as_slice().unwrap(), y.as_slice().unwrap(), "mM")
        .unwrap()
        .with_config(CalibratorConfig::default().with_parallel(true))
        .with_default_models()
        .unwrap();
    calibrator.fit_all();
    calibrator.rank();

    let aics: Vec<f64> = calibrator
        .models()
        .iter()
        .map(|m| m.statistics().unwrap().aic)
        .collect();
    assert!(aics.windows(2).all(|w| w[0] <= w[1]));
    assert_ne!(calibrator.models()[0].name(), "linear");
    assert_eq!(
        calibrator.best_model().unwrap().name(),
        calibrator.models()[0].name()
    );
}

#[test]
fn test_failed_models_are_kept_unfitted() {
    let mut calibrator = Calibrator::from_arrays("s0", &[1.0, 2.0, 3.0], &[0.1, 0.2, 0.3], "mM")
        .unwrap()
        .with_default_models()
        .unwrap();

    let report = calibrator.fit_all();
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, "cubic");
    assert_eq!(calibrator.models().len(), 3);

    calibrator.rank();
    let last = calibrator.models().last().unwrap();
    assert_eq!(last.name(), "cubic");
    assert!(!last.was_fitted());
    assert!(matches!(
        calibrator.calculate_concentrations("cubic", &array![0.1], false),
        Err(CalibError::UnfittedModel(_))
    ));
}

#[test]
fn test_standard_json_round_trip() {
    let mut calibrator = concrete_session().with_name("glucose");
    calibrator.fit_all();

    let standard = calibrator.create_standard("affine").unwrap();
    let json = standard.to_json().unwrap();
    assert!(json.contains("\"analyte_name\": \"glucose\""));
    assert!(json.contains("\"was_fitted\": true"));

    let restored = Standard::from_json(&json).unwrap();
    assert_eq!(restored.samples, standard.samples);
    assert_eq!(restored.result.parameters(), standard.result.parameters());

    let signals = array![4.0, 8.0, 12.0];
    let before = standard.result.invert(&signals, true).unwrap();
    let after = restored.result.invert(&signals, true).unwrap();
    assert!(array_approx_eq(&before, &after, 1e-12));

    let session = Calibrator::from_standard(restored, None).unwrap();
    assert_eq!(session.analyte_name(), Some("glucose"));
    let conc = session.calculate_concentrations("affine", &array![7.0], false).unwrap();
    assert_relative_eq!(conc[0], 3.0, epsilon = 1e-6);
}

#[test]
fn test_mixed_units_rejected() {
    let samples = vec![Sample::new(1.0, "mM", 0.1), Sample::new(2.0, "mmol / l", 0.2)];
    assert!(matches!(Calibrator::new("s0", samples), Err(CalibError::InvalidInput(_))));
}

#[test]
fn test_refit_after_cutoff_drops_stale_results() {
    let mut calibrator = concrete_session();
    calibrator
        .add_model("origin", "a * x", 1.0, f64::NEG_INFINITY, f64::INFINITY)
        .unwrap();
    assert!(calibrator.fit_all().is_complete());
    calibrator.rank();
    assert_eq!(calibrator.best_model().unwrap().name(), "affine");

    // only the samples at signals 3 and 5 survive
    let mut calibrator = calibrator.with_cutoff(6.0);
    let report = calibrator.fit_all();
    assert_eq!(calibrator.samples().len(), 2);
    assert_eq!(report.failed.len(), 1);
    assert!(matches!(report.failed[0].1, CalibError::DimensionMismatch(_)));

    let affine = calibrator.get_model("affine").unwrap();
    assert!(!affine.was_fitted());
    assert!(affine.calibration_range().is_none());

    let origin = calibrator.get_model("origin").unwrap();
    assert_eq!(origin.calibration_range().unwrap().conc_upper, 2.0);

    calibrator.rank();
    assert_eq!(calibrator.best_model().unwrap().name(), "origin");
    assert_eq!(calibrator.models()[0].name(), "origin");
    assert_eq!(calibrator.models()[1].name(), "affine");
}

#[test]
fn test_standard_with_constant_signals_round_trips() {
    let mut calibrator = Calibrator::from_arrays("x", &[1.0, 2.0, 3.0], &[2.0, 2.0, 2.0], "mM").unwrap();
    calibrator
        .add_model("affine", "a * x + b", 1.0, f64::NEG_INFINITY, f64::INFINITY)
        .unwrap();
    assert!(calibrator.fit_all().is_complete());
    assert!(calibrator.get_model("affine").unwrap().statistics().unwrap().r2.is_nan());

    let json = calibrator.create_standard("affine").unwrap().to_json().unwrap();
    assert!(json.contains("\"r2\": null"));

    let restored = Standard::from_json(&json).unwrap();
    let stats = restored.result.statistics().unwrap();
    assert!(stats.r2.is_nan());
    assert!(stats.aic.is_finite());
    assert!(format!("{}", calibrator).contains("n.a."));
}
