use thiserror::Error;

/// Error types for the calib-rs library.
#[derive(Error, Debug)]
pub enum CalibError {
    /// The signal law could not be parsed, or its symbols do not leave exactly
    /// one independent variable.
    #[error("Equation parse error: {0}")]
    EquationParse(String),

    /// Mismatched or insufficient data for a fit.
    #[error("Dimension mismatch: {0}")]
    DimensionMismatch(String),

    /// The optimizer did not converge.
    #[error("Fit did not converge: {0}")]
    FitConvergence(String),

    /// An operation needs a fitted model.
    #[error("Model '{0}' has not been fitted")]
    UnfittedModel(String),

    /// Unknown model name.
    #[error("Model '{0}' not found")]
    ModelNotFound(String),

    /// A model with this name already exists.
    #[error("Model '{0}' already exists")]
    DuplicateModel(String),

    /// A parameter with this symbol already exists.
    #[error("Parameter '{0}' already exists")]
    DuplicateParameter(String),

    /// Invalid parameter definition, e.g. inverted bounds.
    #[error("Invalid parameter: {0}")]
    InvalidParameter(String),

    /// Parameter not found.
    #[error("Parameter not found: {0}")]
    ParameterNotFound(String),

    /// Linear algebra error.
    #[error("Linear algebra error: {0}")]
    LinearAlgebraError(String),

    /// Invalid input data.
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// JSON serialization/deserialization error.
    #[error("JSON error: {0}")]
    JsonError(#[from] serde_json::Error),
}

impl From<crate::equation::ExpressionError> for CalibError {
    fn from(err: crate::equation::ExpressionError) -> Self {
        CalibError::EquationParse(format!("{}", err))
    }
}

impl From<crate::parameters::BoundsError> for CalibError {
    fn from(err: crate::parameters::BoundsError) -> Self {
        CalibError::InvalidParameter(format!("{}", err))
    }
}

/// Result type alias for calib-rs operations.
pub type Result<T> = std::result::Result<T, CalibError>;
