//! Score types for representing solution quality
//!
//! All score types are immutable, `Copy`, and compare level by level with the
//! highest priority level first.

#[macro_use]
mod macros;
mod hard_medium_soft;
mod hard_soft;
mod simple;
mod traits;

#[cfg(test)]
mod tests;

pub use hard_medium_soft::HardMediumSoftScore;
pub use hard_soft::HardSoftScore;
pub use simple::SimpleScore;
pub use traits::{ParseableScore, Score, ScoreParseError};

/// Score level representing different constraint priorities
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ScoreLevel {
    /// Hard constraints - must be satisfied for feasibility
    Hard,
    /// Medium constraints - secondary priority
    Medium,
    /// Soft constraints - optimization objectives
    Soft,
}
