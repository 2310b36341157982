//! Parameter bounds
//!
//! Box bounds on a parameter and the Minuit-style transformation that lets the
//! unconstrained Levenberg-Marquardt optimizer respect them. The optimizer works
//! on an internal value `t`; the signal law only ever sees the external value.

use serde::{Deserialize, Serialize};
use std::f64::{INFINITY, NEG_INFINITY};
use thiserror::Error;

/// Errors that can occur when working with parameter bounds
#[derive(Error, Debug, Clone, PartialEq)]
pub enum BoundsError {
    #[error("Invalid bounds: lower bound ({min}) must not exceed upper bound ({max})")]
    InvalidBounds { min: f64, max: f64 },

    #[error("Parameter value {value} is outside bounds: [{min}, {max}]")]
    ValueOutsideBounds { value: f64, min: f64, max: f64 },

    #[error("Infinite parameter value is not allowed")]
    InfiniteValue,
}

/// Lower and upper limit of a parameter. Either side may be infinite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Bounds {
    /// Lower limit, `-inf` when unbounded below
    pub min: f64,

    /// Upper limit, `+inf` when unbounded above
    pub max: f64,
}

// Infinite limits are written as `null`, which is how JSON spells "no bound".
impl Serialize for Bounds {
    fn serialize<S>(&self, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: serde::Serializer,
    {
        use serde::ser::SerializeStruct;

        let lower = if self.min.is_finite() { Some(self.min) } else { None };
        let upper = if self.max.is_finite() { Some(self.max) } else { None };

        let mut state = serializer.serialize_struct("Bounds", 2)?;
        state.serialize_field("lower_bound", &lower)?;
        state.serialize_field("upper_bound", &upper)?;
        state.end()
    }
}

impl<'de> Deserialize<'de> for Bounds {
    fn deserialize<D>(deserializer: D) -> Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct BoundsHelper {
            #[serde(default)]
            lower_bound: Option<f64>,

            #[serde(default)]
            upper_bound: Option<f64>,
        }

        let helper = BoundsHelper::deserialize(deserializer)?;
        Bounds::new(
            helper.lower_bound.unwrap_or(NEG_INFINITY),
            helper.upper_bound.unwrap_or(INFINITY),
        )
        .map_err(serde::de::Error::custom)
    }
}

impl Default for Bounds {
    fn default() -> Self {
        Self {
            min: NEG_INFINITY,
            max: INFINITY,
        }
    }
}

impl Bounds {
    /// Create bounds with the given limits.
    ///
    /// # Examples
    ///
    /// ```
    /// use calib_rs::parameters::Bounds;
    ///
    /// let bounds = Bounds::new(0.0, 10.0).unwrap();
    /// assert_eq!(bounds.min, 0.0);
    /// assert!(Bounds::new(10.0, 0.0).is_err());
    /// ```
    pub fn new(min: f64, max: f64) -> Result<Self, BoundsError> {
        // NaN limits compare false everywhere, reject them together with inverted ones
        if min.is_nan() || max.is_nan() || min > max {
            return Err(BoundsError::InvalidBounds { min, max });
        }

        Ok(Self { min, max })
    }

    /// No limits on either side
    pub fn unbounded() -> Self {
        Self::default()
    }

    pub fn min_only(min: f64) -> Self {
        Self { min, max: INFINITY }
    }

    pub fn max_only(max: f64) -> Self {
        Self {
            min: NEG_INFINITY,
            max,
        }
    }

    pub fn is_within_bounds(&self, value: f64) -> bool {
        value >= self.min && value <= self.max
    }

    pub fn has_lower_bound(&self) -> bool {
        self.min.is_finite()
    }

    pub fn has_upper_bound(&self) -> bool {
        self.max.is_finite()
    }

    /// Clamp a value into the bounds
    pub fn clamp(&self, value: f64) -> f64 {
        value.clamp(self.min, self.max)
    }
}

/// Minuit-style mapping between the internal (unconstrained) and the
/// external (bounded) value of a parameter.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct BoundsTransform {
    bounds: Bounds,
}

impl BoundsTransform {
    pub fn new(bounds: Bounds) -> Self {
        Self { bounds }
    }

    /// Map an internal value to the external value seen by the signal law.
    pub fn to_external(&self, internal_value: f64) -> f64 {
        match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => internal_value,
            (true, false) => self.bounds.min - 1.0 + (internal_value * internal_value + 1.0).sqrt(),
            (false, true) => self.bounds.max + 1.0 - (internal_value * internal_value + 1.0).sqrt(),
            (true, true) => {
                let bound_range = self.bounds.max - self.bounds.min;
                self.bounds.min + (internal_value.sin() + 1.0) * bound_range / 2.0
            }
        }
    }

    /// Map an external value to the internal value used by the optimizer.
    ///
    /// Fails if the value is infinite or lies outside the bounds.
    pub fn to_internal(&self, external_value: f64) -> Result<f64, BoundsError> {
        if !external_value.is_finite() {
            return Err(BoundsError::InfiniteValue);
        }

        if !self.bounds.is_within_bounds(external_value) {
            return Err(BoundsError::ValueOutsideBounds {
                value: external_value,
                min: self.bounds.min,
                max: self.bounds.max,
            });
        }

        let internal = match (self.bounds.has_lower_bound(), self.bounds.has_upper_bound()) {
            (false, false) => external_value,
            (true, false) => ((external_value - self.bounds.min + 1.0).powi(2) - 1.0)
                .max(0.0)
                .sqrt(),
            (false, true) => ((self.bounds.max - external_value + 1.0).powi(2) - 1.0)
                .max(0.0)
                .sqrt(),
            (true, true) => {
                let bound_range = self.bounds.max - self.bounds.min;
                if bound_range == 0.0 {
                    return Ok(0.0);
                }
                let scaled = 2.0 * (external_value - self.bounds.min) / bound_range - 1.0;
                scaled.clamp(-1.0, 1.0).asin()
            }
        };

        Ok(internal)
    }
}
