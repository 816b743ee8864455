//! Domain metamodel and the working solution.
//!
//! The metamodel is an explicit value built in code: a
//! [`SolutionDescriptor`] lists fact classes, each with typed fields, some of
//! which are planning variables. The [`WorkingSolution`] stores the facts the
//! engine scores.

mod descriptor;
mod solution;


pub use descriptor::{FactClassDescriptor, FieldDescriptor, FieldType, SolutionDescriptor};
pub use solution::{Fact, FactId, WorkingSolution};
