//! Integration tests for signal law compilation

use approx::assert_relative_eq;
use calib_rs::equation::{compile, CompiledEquation};
use calib_rs::CalibError;
use ndarray::array;
use std::collections::HashMap;

#[test]
fn test_declared_mode_uses_caller_order() {
    let eq = compile("b * conc**2 + a * conc", &["a", "b"]).unwrap();
    assert_eq!(eq.independent_symbol(), "conc");
    assert_eq!(eq.parameter_symbols(), &["a".to_string(), "b".to_string()]);

    // a = 1, b = 2 at conc = 3: 2 * 9 + 3
    assert_relative_eq!(eq.eval(3.0, &[1.0, 2.0]), 21.0);
}

#[test]
fn test_symbol_count_must_leave_one_independent() {
    // two free symbols left
    assert!(matches!(compile("a * x + y", &["a"]), Err(CalibError::EquationParse(_))));
    // nothing left
    assert!(matches!(compile("a * b", &["a", "b"]), Err(CalibError::EquationParse(_))));
    // declared parameter missing from the law
    assert!(matches!(compile("a * x", &["a", "b"]), Err(CalibError::EquationParse(_))));
    // duplicate declaration
    assert!(compile("a * x", &["a", "a"]).is_err());
    // independent symbol missing in discovery mode
    assert!(matches!(
        CompiledEquation::with_independent("a * x", "c"),
        Err(CalibError::EquationParse(_))
    ));
}

#[test]
fn test_malformed_expressions() {
    for expr in ["a *", "(a + x", "a x", "foo(x)", "sqrt(x, a)", ""] {
        assert!(
            CompiledEquation::with_independent(expr, "x").is_err(),
            "'{}' should not compile",
            expr
        );
    }
}

#[test]
fn test_operator_semantics() {
    let eq = CompiledEquation::with_independent("-x**2 + 2^3^2 / 64 - 10 - 4 - 3", "x").unwrap();
    // -(x^2) + 512 / 64 - 17
    assert_relative_eq!(eq.eval(3.0, &[]), -9.0 + 8.0 - 17.0);

    let eq = CompiledEquation::with_independent("E**(ln(x)) + sin(pi / 2) * abs(-a)", "x").unwrap();
    assert_relative_eq!(eq.eval(2.5, &[4.0]), 6.5, epsilon = 1e-12);
}

#[test]
fn test_ieee_arithmetic_is_not_an_error() {
    let eq = CompiledEquation::with_independent("a / x", "x").unwrap();
    assert!(eq.eval(0.0, &[1.0]).is_infinite());
    assert!(eq.eval(0.0, &[0.0]).is_nan());
}

#[test]
fn test_vector_and_named_evaluation_agree() {
    let eq = CompiledEquation::with_independent("a * exp(-k * t) + c", "t").unwrap();
    assert_eq!(eq.parameter_symbols(), &["a".to_string(), "c".to_string(), "k".to_string()]);

    let params = [2.0, 0.5, 0.3];
    let t = array![0.0, 1.0, 2.0];
    let values = eq.eval_array(&t, &params);

    let named: HashMap<String, f64> = [("a", 2.0), ("c", 0.5), ("k", 0.3)]
        .iter()
        .map(|(k, v)| (k.to_string(), *v))
        .collect();
    for (i, &ti) in t.iter().enumerate() {
        assert_relative_eq!(values[i], eq.eval_named(ti, &named).unwrap(), epsilon = 1e-14);
    }

    let mut incomplete = named.clone();
    incomplete.remove("k");
    assert!(eq.eval_named(1.0, &incomplete).is_err());
}
