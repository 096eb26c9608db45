//! Error types shared by the core modules.

use serde::Serialize;
use thiserror::Error;

/// Failures raised while configuring or scoring a trajectory.
///
/// Divergence of a trace is not an error; it is reported through
/// [`crate::trajectory::Termination::Diverged`].
#[derive(Debug, Clone, PartialEq, Error, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum TraceError {
    #[error("step distance must be finite and non-zero (got {0})")]
    InvalidStep(f64),

    #[error("malformed {axis} range [{min}; {max}]: bounds must be finite and ordered")]
    MalformedRange { axis: char, min: f64, max: f64 },

    #[error("relative deviation is undefined: reference is zero at x = {}", format_xs(.at))]
    UndefinedRelativeDeviation { at: Vec<f64> },

    #[error("reference solution is not finite at x = {}", format_xs(.at))]
    NonFiniteReference { at: Vec<f64> },

    #[error("trajectory contains no points")]
    EmptyTrajectory,

    #[error("initial point must be finite (got ({x}, {y}))")]
    NonFiniteInitial { x: f64, y: f64 },

    #[error("unknown method \"{0}\"; expected one of euler, heun, runge_kutta_4, runge_kutta_4_38, runge_kutta_5")]
    UnknownMethod(String),

    #[error("at least one method must be selected")]
    EmptyMethodList,
}

/// Errors produced while parsing or compiling a text expression.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ExpressionError {
    #[error("unexpected character '{0}' at offset {1}")]
    UnexpectedChar(char, usize),

    #[error("invalid number literal \"{0}\"")]
    InvalidNumber(String),

    #[error("unexpected token {0}")]
    UnexpectedToken(String),

    #[error("unexpected end of expression")]
    UnexpectedEnd,

    #[error("expected ')'")]
    UnclosedParen,

    #[error("unknown variable or parameter: {0}")]
    UnknownSymbol(String),

    #[error("unknown function: {0}")]
    UnknownFunction(String),

    #[error("parameter names and values differ in length ({names} names, {values} values)")]
    ParamMismatch { names: usize, values: usize },
}

fn format_xs(xs: &[f64]) -> String {
    xs.iter()
        .map(|x| format!("{x}"))
        .collect::<Vec<_>>()
        .join(", ")
}
