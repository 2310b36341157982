//! Levenberg-Marquardt algorithm implementation.
//!
//! A damped Gauss-Newton minimizer for the sum of squared residuals of a
//! [`Problem`](crate::problem::Problem). The damping follows Marquardt's
//! diagonal scaling; all iteration limits and tolerances come from [`LmConfig`].

pub mod algorithm;
pub mod config;
pub mod convergence;

pub use algorithm::{LevenbergMarquardt, LmResult};
pub use config::LmConfig;
pub use convergence::{ConvergenceCriteria, ConvergenceStatus};
