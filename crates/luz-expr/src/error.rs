use thiserror::Error;

use crate::ast::{BinaryOp, ParseError, Rounding};

/// A well-formed expression applied an operation to operands it is not defined for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum EvalError {
    #[error("cannot apply `{op}` to {lhs} and {rhs}", op = .op.as_str())]
    BinaryTypeMismatch {
        op: BinaryOp,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("cannot negate a {operand}")]
    NegateTypeMismatch { operand: &'static str },
    #[error("{func} expects a time, got a {operand}", func = .func.keyword())]
    RoundTypeMismatch {
        func: Rounding,
        operand: &'static str,
    },
    #[error("division by zero")]
    DivisionByZero,
    #[error("integer overflow in `{op}`")]
    Overflow { op: &'static str },
}

/// Failure to evaluate a token body.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("syntax error: {0}")]
    Syntax(#[from] ParseError),
    #[error("evaluation error: {0}")]
    Evaluation(#[from] EvalError),
}

impl ExprError {
    pub fn is_syntax(&self) -> bool {
        matches!(self, ExprError::Syntax(_))
    }
}
