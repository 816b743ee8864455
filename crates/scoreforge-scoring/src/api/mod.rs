//! Constraint analysis and runtime weight configuration.

pub mod analysis;
pub mod weight_overrides;


pub use analysis::{
    ConstraintAnalysis, ConstraintJustification, ConstraintMatch, ConstraintResult, Indictment,
    IndictmentMap, ScoreExplanation,
};
pub use weight_overrides::{ConstraintWeightOverrides, WeightProvider};
