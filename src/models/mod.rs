//! Built-in signal laws.
//!
//! Polynomial laws through the origin, written in terms of the analyte symbol
//! chosen by the caller. A blank (zero concentration) is expected to give zero
//! signal, so none of them carries an intercept.

use crate::error::Result;
use crate::model::CalibrationModel;

/// `a * X`
pub fn linear_model(analyte: &str) -> Result<CalibrationModel> {
    CalibrationModel::new("linear", &format!("a * {analyte}"), analyte)
}

/// `a * X**2 + b * X`
pub fn quadratic_model(analyte: &str) -> Result<CalibrationModel> {
    CalibrationModel::new("quadratic", &format!("a * {analyte}**2 + b * {analyte}"), analyte)
}

/// `a * X**3 + b * X**2 + c * X`
pub fn cubic_model(analyte: &str) -> Result<CalibrationModel> {
    CalibrationModel::new(
        "cubic",
        &format!("a * {analyte}**3 + b * {analyte}**2 + c * {analyte}"),
        analyte,
    )
}

/// Linear, quadratic and cubic model, in that order.
pub fn default_models(analyte: &str) -> Result<Vec<CalibrationModel>> {
    Ok(vec![linear_model(analyte)?, quadratic_model(analyte)?, cubic_model(analyte)?])
}
