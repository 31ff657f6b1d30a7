//! Errors raised while compiling and evaluating conditions.

use stormwatch_core::Field;

/// A condition that cannot be compiled. The owning rule is rejected.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ParseError {
    #[error("condition is empty")]
    Empty,

    #[error("unexpected character '{ch}' at position {pos}")]
    UnexpectedChar { ch: char, pos: usize },

    #[error("unexpected {found} at position {pos}, expected {expected}")]
    UnexpectedToken {
        found: String,
        expected: &'static str,
        pos: usize,
    },

    #[error("unexpected end of condition, expected {expected}")]
    UnexpectedEnd { expected: &'static str },

    #[error("unbalanced parentheses")]
    Unbalanced,
}

/// A compiled condition that could not be evaluated on this observation.
///
/// The tick is treated as non-triggering.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum EvalError {
    #[error("unknown field: {0}")]
    UnknownField(String),

    #[error("invalid value '{literal}': {reason}")]
    InvalidLiteral { literal: String, reason: String },

    #[error("observation has no value for {0}")]
    MissingValue(Field),

    #[error(transparent)]
    Parse(#[from] ParseError),
}
