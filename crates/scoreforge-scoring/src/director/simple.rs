//! Score director that recomputes the score from scratch.

use std::sync::Arc;

use scoreforge_core::{FactId, Score, Value, WorkingSolution};

use super::traits::ScoreDirector;
use crate::error::Result;
use crate::network::Network;
use crate::session::Session;

/// Builds a fresh session for every dirty score read.
///
/// Slow but independent of any incremental state, which makes it the
/// reference to check incremental directors against.
pub struct SimpleScoreDirector<Sc: Score> {
    network: Arc<Network<Sc>>,
    working_solution: WorkingSolution,
    cached_score: Option<Sc>,
}

impl<Sc: Score> SimpleScoreDirector<Sc> {
    pub fn new(network: Arc<Network<Sc>>, solution: WorkingSolution) -> Self {
        SimpleScoreDirector {
            network,
            working_solution: solution,
            cached_score: None,
        }
    }

    pub fn into_solution(self) -> WorkingSolution {
        self.working_solution
    }
}

impl<Sc: Score> ScoreDirector<Sc> for SimpleScoreDirector<Sc> {
    fn working_solution(&self) -> &WorkingSolution {
        &self.working_solution
    }

    fn calculate_score(&mut self) -> Result<Sc> {
        if let Some(score) = self.cached_score {
            return Ok(score);
        }
        let session = Session::new(self.network.clone(), self.working_solution.clone())?;
        let score = session.score()?;
        self.cached_score = Some(score);
        Ok(score)
    }

    fn before_variable_changed(&mut self, _fact: FactId, _field: usize) -> Result<()> {
        Ok(())
    }

    fn after_variable_changed(&mut self, _fact: FactId, _field: usize) -> Result<()> {
        self.cached_score = None;
        Ok(())
    }

    fn write_variable(&mut self, fact: FactId, field: usize, value: Value) -> Result<Value> {
        self.cached_score = None;
        Ok(self.working_solution.set_field(fact, field, value)?)
    }
}
