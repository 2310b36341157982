//! # calib-rs
//!
//! `calib-rs` turns analytical-instrument signals into analyte concentrations.
//! A signal law, given as text, is fitted to reference measurements with a
//! Levenberg-Marquardt optimizer, and the fitted law is then inverted for new
//! readings.
//!
//! The library provides:
//! - An equation compiler for signal laws such as `a * s0**2 + b * s0`
//! - A parameter system with bounds, fitted values and standard errors
//! - Levenberg-Marquardt fitting with lmfit-style statistics (AIC, BIC, R², RMSD)
//! - Inversion of fitted laws with an explicit extrapolation policy
//! - A [`Calibrator`] that fits and ranks candidate models for one analyte
//!
//! ## Basic Usage
//!
//! ```
//! use calib_rs::{CalibrationModel, Fitter};
//! use ndarray::array;
//!
//! let mut model = CalibrationModel::new("linear", "a * x + b", "x").unwrap();
//! let x = array![1.0, 2.0, 3.0, 4.0, 5.0];
//! let y = array![3.0, 5.0, 7.0, 9.0, 11.0];
//!
//! let stats = Fitter::default().fit(&mut model, &x, &y).unwrap();
//! assert!(stats.r2 > 0.999);
//!
//! let conc = model.invert(&array![7.0], false).unwrap();
//! assert!((conc[0] - 3.0).abs() < 1e-6);
//! ```
//!
//! The library logs through the `log` facade and never installs a logger.

pub mod error;

// Signal laws and their unknowns
pub mod equation;
pub mod parameters;

// Least squares machinery
pub mod lm;
pub mod problem;
pub mod uncertainty;
pub mod utils;

// Calibration
pub mod calibrator;
pub mod fit;
pub mod inversion;
pub mod model;
pub mod models;
pub mod roots;
pub mod sample;
pub mod statistics;

// Re-exports for convenience
pub use calibrator::{Calibrator, CalibratorConfig, CalibratorState, FitReport};
pub use equation::CompiledEquation;
pub use error::{CalibError, Result};
pub use fit::Fitter;
pub use inversion::InversionOptions;
pub use lm::{LevenbergMarquardt, LmConfig};
pub use model::{CalibrationModel, CalibrationRange};
pub use parameters::{Parameter, ParameterSet};
pub use problem::Problem;
pub use sample::{Sample, Standard};
pub use statistics::FitStatistics;

/// Version of the library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
