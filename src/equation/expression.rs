//! Expression parsing for signal laws
//!
//! Signal laws are written the way they are usually typed into a notebook:
//! `a * x**2 + b * x`, `a * (1 - exp(-k * s0))`. This module turns such text
//! into an [`Expression`] tree. Numeric evaluation happens on the compiled form
//! (see [`super::compiler`]).

use nom::{
    branch::alt,
    bytes::complete::tag,
    character::complete::{alpha1, alphanumeric1, char, digit0, digit1, multispace0, one_of},
    combinator::{map_res, not, opt, recognize, value},
    multi::{many0, separated_list1},
    sequence::{delimited, pair, preceded, terminated},
    IResult, Parser,
};
use thiserror::Error;

/// Error that can occur during expression parsing or compilation
#[derive(Error, Debug, Clone, PartialEq)]
pub enum ExpressionError {
    #[error("Failed to parse expression: {message}")]
    ParseError { message: String },

    #[error("Undefined variable: {name}")]
    UndefinedVariable { name: String },

    #[error("Invalid operation: {message}")]
    InvalidOperation { message: String },

    #[error("Undefined function: {name}")]
    UndefinedFunction { name: String },
}

/// Result type for expression handling
pub(crate) type ExprResult<T> = Result<T, ExpressionError>;

/// Expression AST node
#[derive(Debug, Clone, PartialEq)]
pub enum Expression {
    /// Constant number (including the named constants `pi` and `E`)
    Number(f64),

    /// Free symbol
    Variable(String),

    /// Unary operations
    Unary(UnaryOp, Box<Expression>),

    /// Binary operations
    Binary(BinaryOp, Box<Expression>, Box<Expression>),

    /// Function call
    Function(String, Vec<Expression>),
}

/// Unary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum UnaryOp {
    /// Negation (-)
    Neg,
}

/// Binary operations
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum BinaryOp {
    /// Addition (+)
    Add,

    /// Subtraction (-)
    Sub,

    /// Multiplication (*)
    Mul,

    /// Division (/)
    Div,

    /// Power (** or ^)
    Pow,
}

impl BinaryOp {
    pub(crate) fn apply(self, lhs: f64, rhs: f64) -> f64 {
        match self {
            BinaryOp::Add => lhs + rhs,
            BinaryOp::Sub => lhs - rhs,
            BinaryOp::Mul => lhs * rhs,
            BinaryOp::Div => lhs / rhs,
            BinaryOp::Pow => lhs.powf(rhs),
        }
    }
}

impl Expression {
    /// Parse an expression from a string
    pub fn parse(input: &str) -> ExprResult<Self> {
        match additive(input) {
            Ok((remainder, expr)) => {
                // Make sure the entire input was consumed
                if remainder.trim().is_empty() {
                    Ok(expr)
                } else {
                    Err(ExpressionError::ParseError {
                        message: format!("Unexpected trailing characters: '{}'", remainder.trim()),
                    })
                }
            }
            Err(e) => Err(ExpressionError::ParseError {
                message: format!("{:?}", e),
            }),
        }
    }

    /// Find all free symbols used in the expression, sorted and deduplicated
    pub fn variables(&self) -> Vec<String> {
        let mut vars = Vec::new();
        self.collect_variables(&mut vars);
        vars.sort();
        vars.dedup();
        vars
    }

    fn collect_variables(&self, vars: &mut Vec<String>) {
        match self {
            Self::Number(_) => {}

            Self::Variable(name) => {
                vars.push(name.clone());
            }

            Self::Unary(_, expr) => {
                expr.collect_variables(vars);
            }

            Self::Binary(_, left, right) => {
                left.collect_variables(vars);
                right.collect_variables(vars);
            }

            Self::Function(_, args) => {
                for arg in args {
                    arg.collect_variables(vars);
                }
            }
        }
    }
}

// Parser functions using nom

fn sp(input: &str) -> IResult<&str, &str> {
    multispace0(input)
}

/// Parse an identifier (variable or function name)
fn identifier(input: &str) -> IResult<&str, String> {
    recognize(pair(
        alt((alpha1, tag("_"))),
        many0(alt((alphanumeric1, tag("_")))),
    ))
    .parse(input)
    .map(|(rest, matched)| (rest, matched.to_string()))
}

fn exponent(input: &str) -> IResult<&str, &str> {
    recognize(pair(one_of("eE"), pair(opt(one_of("+-")), digit1))).parse(input)
}

/// Parse an unsigned decimal literal: `2`, `2.`, `2.5`, `.5`, `1e-3`
fn number(input: &str) -> IResult<&str, Expression> {
    let leading = recognize(pair(digit1, pair(opt(pair(char('.'), digit0)), opt(exponent))));
    let fractional = recognize(pair(char('.'), pair(digit1, opt(exponent))));

    map_res(alt((leading, fractional)), |literal: &str| {
        literal.parse::<f64>().map(Expression::Number)
    })
    .parse(input)
}

/// Parse a function call: `name(arg, ...)`
fn function_call(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    let (input, args) = delimited(
        delimited(sp, char('('), sp),
        separated_list1(delimited(sp, char(','), sp), additive),
        preceded(sp, char(')')),
    )
    .parse(input)?;

    Ok((input, Expression::Function(name, args)))
}

/// Parse a symbol, resolving the named constants
fn symbol(input: &str) -> IResult<&str, Expression> {
    let (input, name) = identifier(input)?;
    let expr = match name.as_str() {
        "pi" => Expression::Number(std::f64::consts::PI),
        "E" => Expression::Number(std::f64::consts::E),
        _ => Expression::Variable(name),
    };
    Ok((input, expr))
}

/// Parse a parenthesized expression
fn parens(input: &str) -> IResult<&str, Expression> {
    delimited(pair(char('('), sp), additive, pair(sp, char(')'))).parse(input)
}

fn atom(input: &str) -> IResult<&str, Expression> {
    preceded(sp, alt((number, function_call, parens, symbol))).parse(input)
}

/// Parse a power expression. Right-associative; the exponent may carry a sign.
fn power(input: &str) -> IResult<&str, Expression> {
    let (input, base) = atom(input)?;

    match preceded(sp, alt((tag("**"), tag("^")))).parse(input) {
        Ok((rest, _)) => {
            let (rest, power_of) = unary(rest)?;
            Ok((
                rest,
                Expression::Binary(BinaryOp::Pow, Box::new(base), Box::new(power_of)),
            ))
        }
        Err(nom::Err::Error(_)) => Ok((input, base)),
        Err(e) => Err(e),
    }
}

/// Parse a signed expression. Binds looser than power: `-x**2 == -(x**2)`.
fn unary(input: &str) -> IResult<&str, Expression> {
    let (input, _) = sp(input)?;

    match alt((char('-'), char('+'))).parse(input) {
        Ok((rest, sign)) => {
            let (rest, operand) = unary(rest)?;
            let expr = if sign == '-' {
                Expression::Unary(UnaryOp::Neg, Box::new(operand))
            } else {
                operand
            };
            Ok((rest, expr))
        }
        Err(nom::Err::Error(_)) => power(input),
        Err(e) => Err(e),
    }
}

/// Parse a multiplicative chain, folding to the left
fn multiplicative(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut acc) = unary(input)?;

    loop {
        let op = preceded(
            sp,
            alt((
                value(BinaryOp::Mul, terminated(char('*'), not(char('*')))),
                value(BinaryOp::Div, char('/')),
            )),
        )
        .parse(input);

        match op {
            Ok((rest, op)) => {
                let (rest, rhs) = unary(rest)?;
                acc = Expression::Binary(op, Box::new(acc), Box::new(rhs));
                input = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    Ok((input, acc))
}

/// Parse an additive chain, folding to the left
fn additive(input: &str) -> IResult<&str, Expression> {
    let (mut input, mut acc) = multiplicative(input)?;

    loop {
        let op = preceded(
            sp,
            alt((
                value(BinaryOp::Add, char('+')),
                value(BinaryOp::Sub, char('-')),
            )),
        )
        .parse(input);

        match op {
            Ok((rest, op)) => {
                let (rest, rhs) = multiplicative(rest)?;
                acc = Expression::Binary(op, Box::new(acc), Box::new(rhs));
                input = rest;
            }
            Err(nom::Err::Error(_)) => break,
            Err(e) => return Err(e),
        }
    }

    Ok((input, acc))
}
