//! Score directors: the adapters a solver drives.
//!
//! - [`IncrementalScoreDirector`] - session-backed, with an undo journal
//! - [`SimpleScoreDirector`] - rebuilds the score from scratch (baseline)

mod incremental;
mod simple;
mod traits;


pub use incremental::IncrementalScoreDirector;
pub use simple::SimpleScoreDirector;
pub use traits::ScoreDirector;
