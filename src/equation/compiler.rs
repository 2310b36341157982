//! Compilation of signal laws into numeric evaluators.
//!
//! A [`CompiledEquation`] binds every free symbol of an [`Expression`] to a
//! fixed slot: the independent variable, or a parameter position. Evaluation
//! then needs no name lookups, which matters because the optimizer and the
//! root finder call it many thousands of times per fit.

use ndarray::Array1;
use std::collections::HashMap;

use super::expression::{BinaryOp, ExprResult, Expression, ExpressionError, UnaryOp};
use crate::error::{CalibError, Result};

/// Largest integer exponent evaluated with repeated multiplication.
const MAX_INTEGER_POWER: f64 = 64.0;

/// Elementary functions available in signal laws.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Function {
    Exp,
    Ln,
    Log10,
    Sqrt,
    Abs,
    Sin,
    Cos,
    Tan,
}

impl Function {
    fn from_name(name: &str) -> Option<Self> {
        match name {
            "exp" => Some(Function::Exp),
            "ln" | "log" => Some(Function::Ln),
            "log10" => Some(Function::Log10),
            "sqrt" => Some(Function::Sqrt),
            "abs" => Some(Function::Abs),
            "sin" => Some(Function::Sin),
            "cos" => Some(Function::Cos),
            "tan" => Some(Function::Tan),
            _ => None,
        }
    }

    fn apply(self, value: f64) -> f64 {
        match self {
            Function::Exp => value.exp(),
            Function::Ln => value.ln(),
            Function::Log10 => value.log10(),
            Function::Sqrt => value.sqrt(),
            Function::Abs => value.abs(),
            Function::Sin => value.sin(),
            Function::Cos => value.cos(),
            Function::Tan => value.tan(),
        }
    }
}

/// Slot-addressed program node.
#[derive(Debug, Clone, PartialEq)]
enum Node {
    Const(f64),
    Independent,
    Parameter(usize),
    Neg(Box<Node>),
    Binary(BinaryOp, Box<Node>, Box<Node>),
    PowI(Box<Node>, i32),
    Call(Function, Box<Node>),
}

impl Node {
    fn eval(&self, x: f64, params: &[f64]) -> f64 {
        match self {
            Node::Const(value) => *value,
            Node::Independent => x,
            Node::Parameter(index) => params.get(*index).copied().unwrap_or(f64::NAN),
            Node::Neg(inner) => -inner.eval(x, params),
            Node::Binary(op, lhs, rhs) => op.apply(lhs.eval(x, params), rhs.eval(x, params)),
            Node::PowI(base, n) => base.eval(x, params).powi(*n),
            Node::Call(function, arg) => function.apply(arg.eval(x, params)),
        }
    }
}

/// Symbol-to-slot binding used while lowering the AST.
struct SlotMap<'a> {
    independent: &'a str,
    parameters: &'a [String],
}

impl SlotMap<'_> {
    fn lower(&self, expr: &Expression) -> ExprResult<Node> {
        match expr {
            Expression::Number(value) => Ok(Node::Const(*value)),

            Expression::Variable(name) => {
                if name == self.independent {
                    Ok(Node::Independent)
                } else if let Some(index) = self.parameters.iter().position(|p| p == name) {
                    Ok(Node::Parameter(index))
                } else {
                    Err(ExpressionError::UndefinedVariable { name: name.clone() })
                }
            }

            Expression::Unary(UnaryOp::Neg, inner) => match self.lower(inner)? {
                Node::Const(value) => Ok(Node::Const(-value)),
                node => Ok(Node::Neg(Box::new(node))),
            },

            Expression::Binary(op, lhs, rhs) => {
                let lhs = self.lower(lhs)?;
                let rhs = self.lower(rhs)?;
                Ok(match (lhs, rhs) {
                    (Node::Const(a), Node::Const(b)) => Node::Const(op.apply(a, b)),
                    (base, Node::Const(n))
                        if *op == BinaryOp::Pow
                            && n.fract() == 0.0
                            && n.abs() <= MAX_INTEGER_POWER =>
                    {
                        Node::PowI(Box::new(base), n as i32)
                    }
                    (lhs, rhs) => Node::Binary(*op, Box::new(lhs), Box::new(rhs)),
                })
            }

            Expression::Function(name, args) => {
                let function = Function::from_name(name)
                    .ok_or_else(|| ExpressionError::UndefinedFunction { name: name.clone() })?;
                if args.len() != 1 {
                    return Err(ExpressionError::InvalidOperation {
                        message: format!("{}() requires 1 argument, got {}", name, args.len()),
                    });
                }
                Ok(match self.lower(&args[0])? {
                    Node::Const(value) => Node::Const(function.apply(value)),
                    node => Node::Call(function, Box::new(node)),
                })
            }
        }
    }
}

/// A signal law compiled into a numeric evaluator.
///
/// The evaluator computes `f(x; p_0, ..., p_k)` where `x` is the independent
/// variable (the analyte concentration) and `p_i` are the parameters in
/// [`CompiledEquation::parameter_symbols`] order.
#[derive(Debug, Clone)]
pub struct CompiledEquation {
    expression: String,
    independent: String,
    parameters: Vec<String>,
    program: Node,
}

impl CompiledEquation {
    /// Compile with explicitly declared parameter symbols.
    ///
    /// The independent variable is the single free symbol of the expression that
    /// is not a declared parameter.
    ///
    /// # Errors
    ///
    /// `CalibError::EquationParse` if the expression does not parse, if removing the
    /// declared parameters does not leave exactly one free symbol, if a declared
    /// symbol is repeated, or if a declared parameter does not occur in the expression.
    ///
    /// # Examples
    ///
    /// ```
    /// use calib_rs::equation::CompiledEquation;
    ///
    /// let eq = CompiledEquation::compile("a * x + b", &["a", "b"]).unwrap();
    /// assert_eq!(eq.independent_symbol(), "x");
    /// assert_eq!(eq.eval(2.0, &[3.0, 1.0]), 7.0);
    /// ```
    pub fn compile<S: AsRef<str>>(expression: &str, parameter_symbols: &[S]) -> Result<Self> {
        let ast = Expression::parse(expression)?;
        let free = ast.variables();

        let parameters: Vec<String> = parameter_symbols
            .iter()
            .map(|s| s.as_ref().to_string())
            .collect();

        for (i, symbol) in parameters.iter().enumerate() {
            if parameters[..i].contains(symbol) {
                return Err(CalibError::EquationParse(format!(
                    "parameter '{}' is declared more than once",
                    symbol
                )));
            }
            if !free.contains(symbol) {
                return Err(CalibError::EquationParse(format!(
                    "parameter '{}' does not occur in '{}'",
                    symbol, expression
                )));
            }
        }

        let residual: Vec<&String> = free.iter().filter(|s| !parameters.contains(*s)).collect();
        let independent = match residual.as_slice() {
            [single] => single.to_string(),
            [] => {
                return Err(CalibError::EquationParse(format!(
                    "'{}' has no independent variable once the parameters {:?} are removed",
                    expression, parameters
                )))
            }
            many => {
                return Err(CalibError::EquationParse(format!(
                    "'{}' leaves more than one independent variable: {:?}",
                    expression, many
                )))
            }
        };

        Self::lower(expression, &ast, independent, parameters)
    }

    /// Compile with a known independent variable; every other free symbol becomes
    /// a parameter, in sorted order.
    ///
    /// # Errors
    ///
    /// `CalibError::EquationParse` if the expression does not parse or does not
    /// contain `independent`.
    pub fn with_independent(expression: &str, independent: &str) -> Result<Self> {
        let ast = Expression::parse(expression)?;
        let free = ast.variables();

        if !free.iter().any(|s| s == independent) {
            return Err(CalibError::EquationParse(format!(
                "'{}' does not contain the independent variable '{}'",
                expression, independent
            )));
        }

        let parameters = free.into_iter().filter(|s| s != independent).collect();
        Self::lower(expression, &ast, independent.to_string(), parameters)
    }

    fn lower(
        expression: &str,
        ast: &Expression,
        independent: String,
        parameters: Vec<String>,
    ) -> Result<Self> {
        let program = SlotMap {
            independent: &independent,
            parameters: &parameters,
        }
        .lower(ast)?;

        Ok(Self {
            expression: expression.to_string(),
            independent,
            parameters,
            program,
        })
    }

    /// The source text of the signal law.
    pub fn expression(&self) -> &str {
        &self.expression
    }

    /// The independent variable symbol.
    pub fn independent_symbol(&self) -> &str {
        &self.independent
    }

    /// Parameter symbols in evaluation order.
    pub fn parameter_symbols(&self) -> &[String] {
        &self.parameters
    }

    /// Number of parameters, the length `eval` expects for `params`.
    pub fn parameter_count(&self) -> usize {
        self.parameters.len()
    }

    /// Evaluate at a single value of the independent variable.
    ///
    /// `params` are positional, in [`parameter_symbols`](Self::parameter_symbols) order.
    pub fn eval(&self, x: f64, params: &[f64]) -> f64 {
        debug_assert_eq!(params.len(), self.parameters.len());
        self.program.eval(x, params)
    }

    /// Evaluate over an array of independent values.
    pub fn eval_array(&self, x: &Array1<f64>, params: &[f64]) -> Array1<f64> {
        x.mapv(|xi| self.eval(xi, params))
    }

    /// Evaluate with parameters given by name.
    ///
    /// # Errors
    ///
    /// `CalibError::ParameterNotFound` if a parameter of the law is missing from `values`.
    pub fn eval_named(&self, x: f64, values: &HashMap<String, f64>) -> Result<f64> {
        let params = self
            .parameters
            .iter()
            .map(|symbol| {
                values
                    .get(symbol)
                    .copied()
                    .ok_or_else(|| CalibError::ParameterNotFound(symbol.clone()))
            })
            .collect::<Result<Vec<f64>>>()?;
        Ok(self.program.eval(x, &params))
    }
}

/// Compile `expression` with the given parameter symbols.
///
/// Shorthand for [`CompiledEquation::compile`].
pub fn compile<S: AsRef<str>>(expression: &str, parameter_symbols: &[S]) -> Result<CompiledEquation> {
    CompiledEquation::compile(expression, parameter_symbols)
}
