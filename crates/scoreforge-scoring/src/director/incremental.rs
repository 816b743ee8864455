//! Session-backed score director with an undo journal.

use std::sync::Arc;

use scoreforge_core::{FactId, Score, Value, WorkingSolution};

use super::traits::ScoreDirector;
use crate::api::{IndictmentMap, ScoreExplanation};
use crate::error::Result;
use crate::network::Network;
use crate::session::Session;

/// A variable write, with the value it replaced.
#[derive(Debug, Clone, PartialEq)]
struct Change {
    fact: FactId,
    field: usize,
    old: Value,
}

/// Drives a [`Session`] and journals every variable change so a move can be
/// undone by re-issuing the inverse writes.
///
/// ```
/// use std::sync::Arc;
/// use scoreforge_core::{Expr, Fact, FactClassDescriptor, FieldDescriptor, FieldType,
///     SimpleScore, SolutionDescriptor, Value, WorkingSolution};
/// use scoreforge_scoring::{IncrementalScoreDirector, Network, ScoreDirector, Session, Stream};
///
/// let mut descriptor = SolutionDescriptor::new("Queens");
/// let queen = descriptor
///     .add_class(FactClassDescriptor::new("Queen")
///         .with_field(FieldDescriptor::planning_variable("row", FieldType::Int)))
///     .unwrap();
/// let descriptor = Arc::new(descriptor);
///
/// let top_row = Stream::for_each(queen)
///     .filter(Expr::eq(Expr::field(0, 0), Expr::int(0)))
///     .penalize(SimpleScore::ONE)
///     .as_constraint("Top row");
/// let network = Arc::new(Network::build(descriptor.clone(), [top_row]).unwrap());
///
/// let mut solution = WorkingSolution::new(descriptor);
/// let q = solution.insert(Fact::new(queen, vec![Value::Int(3)])).unwrap();
/// let mut director = IncrementalScoreDirector::new(Session::new(network, solution).unwrap());
///
/// director.change_variable(q, 0, Value::Int(0)).unwrap();
/// assert_eq!(director.calculate_score().unwrap(), SimpleScore::of(-1));
///
/// director.undo_changes().unwrap();
/// assert_eq!(director.calculate_score().unwrap(), SimpleScore::ZERO);
/// ```
pub struct IncrementalScoreDirector<Sc: Score> {
    session: Session<Sc>,
    journal: Vec<Change>,
}

impl<Sc: Score> IncrementalScoreDirector<Sc> {
    pub fn new(session: Session<Sc>) -> Self {
        Self {
            session,
            journal: Vec::with_capacity(16),
        }
    }

    /// Creates a session for `solution` and wraps it.
    pub fn build(network: Arc<Network<Sc>>, solution: WorkingSolution) -> Result<Self> {
        Ok(Self::new(Session::new(network, solution)?))
    }

    pub fn session(&self) -> &Session<Sc> {
        &self.session
    }

    pub fn into_session(self) -> Session<Sc> {
        self.session
    }

    /// Restores every journaled variable, newest first, and flushes the
    /// restoring changes as one batch.
    pub fn undo_changes(&mut self) -> Result<()> {
        while let Some(change) = self.journal.pop() {
            self.session.write_field(change.fact, change.field, change.old)?;
            self.session.update_fact(change.fact, &[change.field])?;
        }
        self.session.flush()
    }

    /// Forgets the journal, keeping the current values.
    pub fn commit(&mut self) {
        self.journal.clear();
    }

    /// Number of journaled variable writes.
    pub fn change_count(&self) -> usize {
        self.journal.len()
    }

    pub fn is_empty(&self) -> bool {
        self.journal.is_empty()
    }

    pub fn explain(&self) -> Result<ScoreExplanation<Sc>> {
        self.session.explain()
    }

    pub fn indictments(&self) -> Result<IndictmentMap<Sc>> {
        self.session.indictments()
    }
}

impl<Sc: Score> ScoreDirector<Sc> for IncrementalScoreDirector<Sc> {
    fn working_solution(&self) -> &WorkingSolution {
        self.session.solution()
    }

    fn calculate_score(&mut self) -> Result<Sc> {
        self.session.calculate_score()
    }

    fn before_variable_changed(&mut self, fact: FactId, field: usize) -> Result<()> {
        let old = self.session.solution().field(fact, field)?.clone();
        self.journal.push(Change { fact, field, old });
        Ok(())
    }

    fn after_variable_changed(&mut self, fact: FactId, field: usize) -> Result<()> {
        self.session.update_fact(fact, &[field])
    }

    fn write_variable(&mut self, fact: FactId, field: usize, value: Value) -> Result<Value> {
        self.session.write_field(fact, field, value)
    }

    fn is_incremental(&self) -> bool {
        true
    }
}
