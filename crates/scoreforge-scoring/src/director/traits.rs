// Score director trait definition.

use scoreforge_core::{FactId, Score, Value, WorkingSolution};

use crate::error::Result;

// The score director owns the working solution and keeps its score current.
//
// Callers change a planning variable by bracketing the write with
// `before_variable_changed` and `after_variable_changed`, or by calling
// `change_variable`, which does all three.
pub trait ScoreDirector<Sc: Score> {
    // Returns the working solution.
    fn working_solution(&self) -> &WorkingSolution;

    // Brings the score up to date with every change so far and returns it.
    fn calculate_score(&mut self) -> Result<Sc>;

    // Called before `field` of `fact` is written.
    fn before_variable_changed(&mut self, fact: FactId, field: usize) -> Result<()>;

    // Called after `field` of `fact` was written.
    fn after_variable_changed(&mut self, fact: FactId, field: usize) -> Result<()>;

    // Writes a field without any notification. Returns the previous value.
    fn write_variable(&mut self, fact: FactId, field: usize, value: Value) -> Result<Value>;

    // Writes a field with both notifications.
    fn change_variable(&mut self, fact: FactId, field: usize, value: Value) -> Result<()> {
        self.before_variable_changed(fact, field)?;
        self.write_variable(fact, field, value)?;
        self.after_variable_changed(fact, field)
    }

    // Returns true if scores are computed incrementally.
    fn is_incremental(&self) -> bool {
        false
    }
}
