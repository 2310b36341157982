//! # Uncertainty Calculation
//!
//! Parameter standard errors and correlations from the Jacobian at the
//! optimum, computed the way lmfit reports them.

mod covariance;

pub use covariance::{
    calculate_correlation, calculate_covariance, standard_errors, standard_errors_from_covariance,
};
