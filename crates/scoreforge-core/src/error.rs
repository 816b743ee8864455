//! Error types for the ScoreForge core crate

use thiserror::Error;

use crate::domain::FactId;

/// Failure while evaluating an [`Expr`](crate::Expr) against a tuple.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ExprError {
    #[error("tuple element {index} is out of range for arity {arity}")]
    ElementOutOfRange { index: usize, arity: usize },

    #[error("{class} has no field {field}")]
    FieldOutOfRange { class: String, field: usize },

    #[error("fact {0} is not in the working solution")]
    DanglingFact(FactId),

    #[error("expected a fact reference, found {0}")]
    NotAFact(String),

    #[error("{op} cannot be applied to {found}")]
    TypeMismatch { op: &'static str, found: String },

    #[error("division by zero")]
    DivisionByZero,

    #[error("integer overflow in {0}")]
    Overflow(&'static str),

    /// Raised by user-supplied collectors.
    #[error("{0}")]
    Custom(String),
}

/// Failure in the domain metamodel or the working solution.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DomainError {
    #[error("unknown fact class {0}")]
    UnknownClass(String),

    #[error("class {class} has no field {field}")]
    UnknownField { class: String, field: String },

    #[error("duplicate {kind} name {name}")]
    DuplicateName { kind: &'static str, name: String },

    #[error("{class} expects {expected} fields, got {actual}")]
    FieldCount {
        class: String,
        expected: usize,
        actual: usize,
    },

    #[error("{class}.{field} expects {expected}, got {actual}")]
    FieldType {
        class: String,
        field: String,
        expected: String,
        actual: String,
    },

    #[error("fact {0} is not in the working solution")]
    UnknownFact(FactId),
}

/// Result type alias for expression evaluation.
pub type Result<T> = std::result::Result<T, ExprError>;
