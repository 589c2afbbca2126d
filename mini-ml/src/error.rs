use thiserror::Error;

use crate::{
    ast::{BinOp, TyVar, Type},
    eval::Value,
};

#[derive(Debug, Clone, PartialEq, Error)]
pub enum TypeError {
    #[error("unbound variable: {name}")]
    UnboundVariable { name: String },

    #[error("type mismatch: expected {expected}, found {actual}")]
    UnificationFailure { expected: Type, actual: Type },

    #[error("occurs check failed: cannot construct infinite type {var} = {ty}")]
    InfiniteType { var: TyVar, ty: Type },
}

pub type Result<T, E = TypeError> = std::result::Result<T, E>;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum RuntimeError {
    #[error("unbound variable: {name}")]
    UnboundVariable { name: String },

    #[error("cannot apply a non-function value: {value}")]
    NotAFunction { value: Value },

    #[error("no pattern matches the value {value}")]
    NonExhaustiveMatch { value: Value },

    #[error("expected a boolean condition, found {value}")]
    NotABoolean { value: Value },

    #[error("invalid operands for {op}: {left} and {right}")]
    InvalidOperands { op: BinOp, left: Value, right: Value },

    #[error("integer overflow in {left} {op} {right}")]
    ArithmeticOverflow { op: BinOp, left: i64, right: i64 },

    #[error("recursive binding {name} was used before its definition finished")]
    RecursiveValueNotReady { name: String },
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("syntax error: {message}")]
pub struct SyntaxError {
    pub message: String,
}

impl SyntaxError {
    pub fn new(message: impl Into<String>) -> Self {
        SyntaxError {
            message: message.into(),
        }
    }
}
