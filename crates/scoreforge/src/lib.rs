//! ScoreForge - incremental constraint evaluation in Rust.
//!
//! Describe the facts in code, declare constraints as streams, build a
//! network once and score solutions through sessions.
//!
//! # Example
//!
//! ```rust
//! use std::sync::Arc;
//! use scoreforge::prelude::*;
//!
//! let mut descriptor = SolutionDescriptor::new("Timetable");
//! let lesson = descriptor
//!     .add_class(
//!         FactClassDescriptor::new("Lesson")
//!             .with_field(FieldDescriptor::planning_variable("room", FieldType::Str))
//!             .with_field(FieldDescriptor::new("instructor", FieldType::Str)),
//!     )
//!     .unwrap();
//! let descriptor = Arc::new(descriptor);
//!
//! let same_room = Stream::for_each(lesson)
//!     .join(
//!         Stream::for_each(lesson),
//!         [
//!             joiner::equal(Expr::field(0, 0), Expr::field(0, 0)),
//!             joiner::less_than(Expr::field(0, 1), Expr::field(0, 1)),
//!         ],
//!     )
//!     .penalize(HardSoftScore::ONE_HARD)
//!     .as_constraint("Room conflict");
//! let network = Arc::new(Network::build(descriptor.clone(), [same_room]).unwrap());
//!
//! let mut session = Session::new(network, WorkingSolution::new(descriptor)).unwrap();
//! for instructor in ["Ada", "Bo", "Cy"] {
//!     session
//!         .insert_fact(Fact::new(lesson, vec![Value::str("A1"), Value::str(instructor)]))
//!         .unwrap();
//! }
//! assert_eq!(session.calculate_score().unwrap(), HardSoftScore::of(-3, 0));
//! ```

pub mod logging;

// Score types
pub use scoreforge_core::{
    HardMediumSoftScore, HardSoftScore, ParseableScore, Score, ScoreLevel, SimpleScore,
};

// Domain metamodel and expressions
pub use scoreforge_core::{
    ConstraintRef, Expr, Fact, FactClassDescriptor, FactId, FieldDescriptor, FieldType,
    ImpactType, SolutionDescriptor, Value, WorkingSolution,
};

// Constraint streams, networks and sessions
pub use scoreforge_scoring::{
    collector, joiner, Constraint, ConstraintBuilder, EngineError, Network, NetworkStats,
    NodeKindTag, Session, Stream,
};

// Score directors and analysis
pub use scoreforge_scoring::{
    ConstraintAnalysis, ConstraintMatch, ConstraintResult, ConstraintWeightOverrides,
    IncrementalScoreDirector, IndictmentMap, ScoreDirector, ScoreExplanation,
    SimpleScoreDirector, WeightProvider,
};

pub use scoreforge_config::{EngineConfig, EnvironmentMode};

pub mod prelude {
    pub use super::{
        collector, joiner, EngineConfig, Expr, Fact, FactClassDescriptor, FactId,
        FieldDescriptor, FieldType, HardMediumSoftScore, HardSoftScore, Network, Score,
        ScoreDirector, Session, SimpleScore, SolutionDescriptor, Stream, Value,
        WorkingSolution,
    };
}
