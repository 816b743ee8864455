//! Incremental constraint scoring for ScoreForge.
//!
//! Constraints are declared as [`Stream`] trees, compiled once into an
//! immutable [`Network`] of nodes (sharing identical sub-streams), and
//! evaluated by a [`Session`] bound to one working solution. Fact changes are
//! queued and applied in one topologically ordered [`Session::flush`], after
//! which the score equals a from-scratch evaluation of the current facts.
//!
//! ```
//! use std::sync::Arc;
//! use scoreforge_core::{Fact, FactClassDescriptor, FieldDescriptor, FieldType, Expr,
//!     SimpleScore, SolutionDescriptor, Value, WorkingSolution};
//! use scoreforge_scoring::{Network, Session, Stream};
//!
//! let mut descriptor = SolutionDescriptor::new("Lessons");
//! let lesson = descriptor
//!     .add_class(FactClassDescriptor::new("Lesson").with_field(FieldDescriptor::new("room", FieldType::Str)))
//!     .unwrap();
//! let descriptor = Arc::new(descriptor);
//!
//! let in_attic = Stream::for_each(lesson)
//!     .filter(Expr::eq(Expr::field(0, 0), Expr::literal("attic")))
//!     .penalize(SimpleScore::ONE)
//!     .as_constraint("Attic");
//! let network = Arc::new(Network::build(descriptor.clone(), [in_attic]).unwrap());
//!
//! let mut session = Session::new(network, WorkingSolution::new(descriptor)).unwrap();
//! let math = session.insert_fact(Fact::new(lesson, vec![Value::str("attic")])).unwrap();
//! assert_eq!(session.calculate_score().unwrap(), SimpleScore::of(-1));
//!
//! session.set_field(math, 0, Value::str("hall")).unwrap();
//! assert_eq!(session.calculate_score().unwrap(), SimpleScore::ZERO);
//! ```

pub mod api;
pub mod director;
pub mod error;
pub mod network;
mod node;
pub mod session;
pub mod stream;
mod tuple;

pub use api::{
    ConstraintAnalysis, ConstraintJustification, ConstraintMatch, ConstraintResult,
    ConstraintWeightOverrides, Indictment, IndictmentMap, ScoreExplanation, WeightProvider,
};
pub use director::{IncrementalScoreDirector, ScoreDirector, SimpleScoreDirector};
pub use error::{EngineError, Result};
pub use network::{Network, NetworkStats, NodeKindTag};
pub use session::Session;
pub use stream::collector::{self, Accumulator, Collector, ConstraintCollector};
pub use stream::joiner::{self, Comparison, Joiner};
pub use stream::{Constraint, ConstraintBuilder, Stream};
pub use tuple::TupleState;
