//! Integration tests for the parameter system

use calib_rs::parameters::{Bounds, BoundsTransform, ParameterSet};
use calib_rs::{CalibError, CalibrationModel};

#[test]
fn test_parameter_set_order_and_duplicates() {
    let mut params = ParameterSet::new();
    params.add("slope", 1.0).unwrap();
    params.add_with_bounds("offset", -5.0, 0.0, 10.0).unwrap();

    assert!(matches!(params.add("slope", 2.0), Err(CalibError::DuplicateParameter(_))));
    assert_eq!(params.symbols(), vec!["slope", "offset"]);
    // clamped into [0, 10]
    assert_eq!(params.init_values(), vec![1.0, 0.0]);
}

#[test]
fn test_declared_parameters_drive_the_model() {
    let mut params = ParameterSet::new();
    params.add_with_bounds("k", 0.1, 0.0, f64::INFINITY).unwrap();
    params.add("s_max", 2.0).unwrap();

    let model = CalibrationModel::from_parameters("saturation", "s_max * c / (k + c)", params).unwrap();
    assert_eq!(model.independent_symbol(), "c");
    assert_eq!(model.parameters().symbols(), vec!["k", "s_max"]);
    assert_eq!(model.parameter("k").unwrap().min(), 0.0);
}

#[test]
fn test_parameter_json_uses_null_for_open_bounds() {
    let mut params = ParameterSet::new();
    params.add_with_bounds("a", 1.0, 0.0, f64::INFINITY).unwrap();

    let json = serde_json::to_string(&params).unwrap();
    assert!(json.contains(r#""lower_bound":0.0"#));
    assert!(json.contains(r#""upper_bound":null"#));

    let back: ParameterSet = serde_json::from_str(&json).unwrap();
    assert_eq!(back, params);
    assert_eq!(back.get("a").unwrap().max(), f64::INFINITY);
}

#[test]
fn test_transform_maps_whole_line_into_bounds() {
    let bounds = Bounds::new(-2.0, 3.0).unwrap();
    let transform = BoundsTransform::new(bounds);
    for i in -50..=50 {
        let external = transform.to_external(i as f64 * 0.37);
        assert!(bounds.is_within_bounds(external));
    }
}
