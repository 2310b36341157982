//! # Equation Compiler
//!
//! Signal laws arrive as text. This module parses them ([`Expression`]),
//! checks that exactly one free symbol is left as the independent variable,
//! and compiles them into a [`CompiledEquation`] that evaluates
//! `f(concentration; parameters)` without name lookups.
//!
//! ```rust
//! use calib_rs::equation::CompiledEquation;
//!
//! // the analyte symbol is known, everything else is a parameter
//! let eq = CompiledEquation::with_independent("a * s0**2 + b * s0", "s0").unwrap();
//! assert_eq!(eq.parameter_symbols(), &["a".to_string(), "b".to_string()]);
//! assert_eq!(eq.eval(2.0, &[1.0, 3.0]), 10.0);
//! ```

pub mod compiler;
pub mod expression;

pub use compiler::{compile, CompiledEquation};
pub use expression::{BinaryOp, Expression, ExpressionError, UnaryOp};
