//! A single named unknown of a signal law.

use crate::parameters::bounds::{Bounds, BoundsError};
use serde::{Deserialize, Serialize};

/// A parameter of a signal law
///
/// `value` and `stderr` stay `None` until a fit succeeds. Only the fitting
/// engine writes them; callers configure `init_value` and the bounds.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Parameter {
    /// Symbol of the parameter in the signal law
    pub symbol: String,

    /// Fitted value
    value: Option<f64>,

    /// Starting point of the optimizer, always inside the bounds
    init_value: f64,

    /// Standard error of the fitted value
    stderr: Option<f64>,

    #[serde(flatten)]
    bounds: Bounds,
}

impl Parameter {
    /// Create an unbounded parameter with the given initial value
    ///
    /// # Examples
    ///
    /// ```
    /// use calib_rs::parameters::Parameter;
    ///
    /// let param = Parameter::new("a", 0.5);
    /// assert_eq!(param.symbol, "a");
    /// assert_eq!(param.init_value(), 0.5);
    /// assert!(param.value().is_none());
    /// ```
    pub fn new(symbol: &str, init_value: f64) -> Self {
        Self {
            symbol: symbol.to_string(),
            value: None,
            init_value,
            stderr: None,
            bounds: Bounds::default(),
        }
    }

    /// Create a bounded parameter. The initial value is clamped into `[min, max]`.
    pub fn with_bounds(symbol: &str, init_value: f64, min: f64, max: f64) -> Result<Self, BoundsError> {
        let bounds = Bounds::new(min, max)?;
        Ok(Self {
            symbol: symbol.to_string(),
            value: None,
            init_value: bounds.clamp(init_value),
            stderr: None,
            bounds,
        })
    }

    pub fn value(&self) -> Option<f64> {
        self.value
    }

    pub fn init_value(&self) -> f64 {
        self.init_value
    }

    pub fn stderr(&self) -> Option<f64> {
        self.stderr
    }

    pub fn bounds(&self) -> Bounds {
        self.bounds
    }

    pub fn min(&self) -> f64 {
        self.bounds.min
    }

    pub fn max(&self) -> f64 {
        self.bounds.max
    }

    /// Replace the initial value, clamped into the current bounds
    pub fn set_init_value(&mut self, init_value: f64) {
        self.init_value = self.bounds.clamp(init_value);
    }

    /// Replace the bounds and re-clamp the initial value
    pub fn set_bounds(&mut self, min: f64, max: f64) -> Result<(), BoundsError> {
        self.bounds = Bounds::new(min, max)?;
        self.init_value = self.bounds.clamp(self.init_value);
        Ok(())
    }

    /// Relative standard error `|stderr / value|`, if both are known and the
    /// value is non-zero.
    pub fn relative_stderr(&self) -> Option<f64> {
        match (self.value, self.stderr) {
            (Some(value), Some(stderr)) if value != 0.0 => Some((stderr / value).abs()),
            _ => None,
        }
    }

    pub(crate) fn commit(&mut self, value: f64, stderr: Option<f64>) {
        self.value = Some(value);
        self.stderr = stderr;
    }

    /// Forget the fitted value and standard error
    pub fn reset(&mut self) {
        self.value = None;
        self.stderr = None;
    }
}
