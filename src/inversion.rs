//! Inversion of fitted calibration models: signal to concentration.
//!
//! Each signal is solved independently on the calibrated concentration range,
//! or on that range widened by its own width to both sides when extrapolation
//! is allowed. The bracket is padded by a tiny fraction of its width so that
//! signals measured at the range ends still invert after rounding in the fit. Among several solutions the smallest concentration wins (see
//! [`find_smallest_root`]). Signals without a solution become NaN; they are
//! reported through the log, never as an error.

use crate::error::{CalibError, Result};
use crate::model::CalibrationModel;
use crate::roots::{find_smallest_root, RootOptions};
use ndarray::Array1;
use rayon::prelude::*;
use serde::{Deserialize, Serialize};

/// Padding of the search bracket relative to its width; absolute for a
/// zero-width range
const BRACKET_PADDING: f64 = 1e-9;

/// Options for [`invert_with`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct InversionOptions {
    pub root: RootOptions,
    /// Solve the signals in parallel with rayon
    pub parallel: bool,
}

impl Default for InversionOptions {
    fn default() -> Self {
        Self {
            root: RootOptions::default(),
            parallel: true,
        }
    }
}

impl InversionOptions {
    pub fn with_root_options(mut self, root: RootOptions) -> Self {
        self.root = root;
        self
    }

    pub fn with_parallel(mut self, parallel: bool) -> Self {
        self.parallel = parallel;
        self
    }
}

/// Concentrations for `signals` with default options.
///
/// # Examples
///
/// ```
/// use calib_rs::fit::Fitter;
/// use calib_rs::model::CalibrationModel;
/// use ndarray::array;
///
/// let mut model = CalibrationModel::new("linear", "a * c + b", "c").unwrap();
/// let x = array![1.0, 2.0, 3.0, 4.0, 5.0];
/// let y = array![3.0, 5.0, 7.0, 9.0, 11.0];
/// Fitter::default().fit(&mut model, &x, &y).unwrap();
///
/// let conc = calib_rs::inversion::invert(&model, &array![7.0, 13.0], false).unwrap();
/// assert!((conc[0] - 3.0).abs() < 1e-6);
/// assert!(conc[1].is_nan()); // outside the calibrated range
///
/// let conc = calib_rs::inversion::invert(&model, &array![13.0], true).unwrap();
/// assert!((conc[0] - 6.0).abs() < 1e-6);
/// ```
pub fn invert(model: &CalibrationModel, signals: &Array1<f64>, extrapolate: bool) -> Result<Array1<f64>> {
    invert_with(model, signals, extrapolate, &InversionOptions::default())
}

/// Concentrations for `signals`, same length and order.
///
/// # Errors
/// * `UnfittedModel` if the model has not been fitted
pub fn invert_with(
    model: &CalibrationModel,
    signals: &Array1<f64>,
    extrapolate: bool,
    options: &InversionOptions,
) -> Result<Array1<f64>> {
    let values = model.fitted_values()?;
    let range = model
        .calibration_range()
        .ok_or_else(|| CalibError::UnfittedModel(model.name().to_string()))?;

    let (mut lower, mut upper) = (range.conc_lower, range.conc_upper);
    if extrapolate {
        let width = range.conc_width();
        lower -= width;
        upper += width;
        log::info!(
            "Extrapolating model '{}' to concentrations in [{}, {}]",
            model.name(),
            lower,
            upper
        );
    }
    let width = upper - lower;
    let pad = if width > 0.0 { BRACKET_PADDING * width } else { BRACKET_PADDING };
    let (lower, upper) = (lower - pad, upper + pad);

    let equation = model.equation();
    let solve = |signal: f64| -> Option<f64> {
        if signal.is_nan() {
            return None;
        }
        let scale = signal.abs().max(1.0);
        let residual = |conc: f64| (equation.eval(conc, &values) - signal) / scale;
        find_smallest_root(residual, lower, upper, &options.root)
            .ok()
            .map(|result| result.root)
    };

    let solved: Vec<Option<f64>> = if options.parallel {
        signals.as_slice().map_or_else(
            || signals.iter().map(|&s| solve(s)).collect(),
            |slice| slice.par_iter().map(|&s| solve(s)).collect(),
        )
    } else {
        signals.iter().map(|&s| solve(s)).collect()
    };

    let mut unresolved = 0usize;
    for (&signal, root) in signals.iter().zip(&solved) {
        if root.is_none() && !signal.is_nan() {
            unresolved += 1;
            if extrapolate {
                log::warn!(
                    "No concentration of model '{}' in [{}, {}] gives signal {}",
                    model.name(),
                    lower,
                    upper,
                    signal
                );
            }
        }
    }
    if unresolved > 0 && !extrapolate {
        log::warn!(
            "{} of {} signals are outside the calibrated range of model '{}' and were set to NaN; \
             consider enabling extrapolation",
            unresolved,
            signals.len(),
            model.name()
        );
    }

    Ok(solved.into_iter().map(|root| root.unwrap_or(f64::NAN)).collect())
}
