//! ScoreForge Core - shared types for incremental constraint evaluation
//!
//! This crate provides the vocabulary every other ScoreForge crate speaks:
//! - Score types for representing solution quality
//! - Constraint identity (`ConstraintRef`, `ImpactType`)
//! - An explicit domain metamodel (`SolutionDescriptor`) built in code
//! - Runtime values, facts and the working solution that stores them
//! - The expression language used by filters, joiners, mappers and weights

pub mod constraint;
pub mod domain;
pub mod error;
pub mod expr;
pub mod score;
pub mod value;

pub use constraint::{ConstraintRef, ImpactType};
pub use domain::{
    Fact, FactClassDescriptor, FactId, FieldDescriptor, FieldType, SolutionDescriptor,
    WorkingSolution,
};
pub use error::{DomainError, ExprError};
pub use expr::{EvalContext, Expr};
pub use score::{
    HardMediumSoftScore, HardSoftScore, ParseableScore, Score, ScoreLevel, ScoreParseError,
    SimpleScore,
};
pub use value::Value;
