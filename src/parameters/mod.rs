//! # Parameter System
//!
//! Named scalar unknowns of a signal law.
//!
//! - [`Parameter`]: initial guess, bounds, fitted value and standard error
//! - [`ParameterSet`]: ordered, duplicate-free collection consumed positionally by the fitter
//! - [`Bounds`] and [`BoundsTransform`]: box bounds and their Minuit-style transform
//!
//! ```rust
//! use calib_rs::parameters::ParameterSet;
//!
//! let mut params = ParameterSet::new();
//! params.add("a", 1.0).unwrap();
//! params.add_with_bounds("b", 0.0, 0.0, f64::INFINITY).unwrap();
//!
//! assert_eq!(params.symbols(), vec!["a", "b"]);
//! assert!(params.values().is_none());
//! ```

pub mod bounds;
pub mod parameter;
pub mod parameters;

pub use bounds::{Bounds, BoundsError, BoundsTransform};
pub use parameter::Parameter;
pub use parameters::ParameterSet;
