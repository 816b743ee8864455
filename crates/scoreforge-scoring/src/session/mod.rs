//! Sessions: one network bound to one working solution.
//!
//! A session queues fact changes and applies them in batches. Between
//! flushes the network never sees a half-applied change, and after a flush
//! the score equals what a fresh session over the same facts would report.

mod references;

#[cfg(test)]
mod tests;

use std::sync::Arc;

use scoreforge_config::{EngineConfig, EnvironmentMode};
use scoreforge_core::{Fact, FactId, ParseableScore, Score, Value, WorkingSolution};

use crate::api::{
    ConstraintAnalysis, ConstraintJustification, ConstraintMatch, ConstraintResult,
    ConstraintWeightOverrides, IndictmentMap, ScoreExplanation, WeightProvider,
};
use crate::error::{EngineError, Result};
use crate::network::{Network, NodeId, NodeKind};
use crate::node::{describe_row, ConstraintTotal, NodeState, Op, Propagator, StateKind};
use crate::tuple::{Slot, TupleArena};

use references::ReferenceIndex;

/// A queued fact change, addressed to the ForEach root of the fact's class.
#[derive(Debug, Clone, Copy)]
struct FactEvent {
    op: Op,
    fact: FactId,
    root: NodeId,
}

struct Settings<Sc: Score> {
    mode: EnvironmentMode,
    track_matches: bool,
    capacity: usize,
    weights: Vec<Sc>,
}

/// Incremental score calculation over one working solution.
///
/// Not thread-safe. To score in parallel, clone the working solution and
/// create one session per thread against the same `Arc<Network>`.
pub struct Session<Sc: Score> {
    network: Arc<Network<Sc>>,
    solution: WorkingSolution,
    tuples: TupleArena,
    states: Vec<NodeState>,
    totals: Vec<ConstraintTotal>,
    weights: Vec<Sc>,
    events: Vec<FactEvent>,
    /// Kept only when some expression reads through a reference.
    references: Option<ReferenceIndex>,
    mode: EnvironmentMode,
    track_matches: bool,
    poisoned: bool,
}

impl<Sc: Score> Session<Sc> {
    /// Creates a session with declared weights and no self-checks, then
    /// inserts and flushes every fact already in `solution`.
    pub fn new(network: Arc<Network<Sc>>, solution: WorkingSolution) -> Result<Self> {
        let weights = network.constraints().iter().map(|c| c.weight).collect();
        let settings = Settings {
            mode: EnvironmentMode::Production,
            track_matches: false,
            capacity: EngineConfig::default().event_queue_capacity,
            weights,
        };
        Self::build(network, solution, settings)
    }

    /// Creates a session configured by `config`. Weight overrides must name
    /// constraints of the network.
    pub fn with_config(
        network: Arc<Network<Sc>>,
        solution: WorkingSolution,
        config: &EngineConfig,
    ) -> Result<Self>
    where
        Sc: ParseableScore,
    {
        let overrides = ConstraintWeightOverrides::<Sc>::from_config(config)?;
        if let Some(unknown) = overrides
            .names()
            .find(|name| network.constraint_index(name).is_none())
        {
            return Err(EngineError::UnknownConstraint(unknown.to_string()));
        }
        let weights = resolve_weights(&network, &overrides);
        let settings = Settings {
            mode: config.environment_mode,
            track_matches: config.constraint_match_enabled,
            capacity: config.event_queue_capacity,
            weights,
        };
        Self::build(network, solution, settings)
    }

    fn build(
        network: Arc<Network<Sc>>,
        solution: WorkingSolution,
        settings: Settings<Sc>,
    ) -> Result<Self> {
        if !Arc::ptr_eq(network.descriptor(), solution.descriptor()) {
            return Err(EngineError::Definition {
                stream: network.descriptor().name.to_string(),
                reason: "the working solution uses a different descriptor".to_string(),
            });
        }
        let states = network
            .nodes()
            .iter()
            .map(|def| NodeState::new(def, settings.track_matches))
            .collect();
        let mut session = Session {
            totals: vec![ConstraintTotal::default(); network.constraint_count()],
            states,
            tuples: TupleArena::default(),
            weights: settings.weights,
            events: Vec::with_capacity(settings.capacity.max(solution.len())),
            references: network
                .observed()
                .through_references
                .then(ReferenceIndex::default),
            mode: settings.mode,
            track_matches: settings.track_matches,
            poisoned: false,
            solution,
            network,
        };
        let existing: Vec<(FactId, usize)> = session
            .solution
            .iter()
            .map(|(id, fact)| (id, fact.class))
            .collect();
        for (fact, class) in existing {
            session.enqueue(Op::Insert, fact, class);
        }
        if let Some(references) = &mut session.references {
            for (id, fact) in session.solution.iter() {
                references.insert(id, fact);
            }
        }
        session.flush()?;
        tracing::debug!(
            event = "session_created",
            facts = session.solution.len(),
            tuples = session.tuples.len(),
            score = %session.current_score(),
        );
        Ok(session)
    }

    pub fn network(&self) -> &Arc<Network<Sc>> {
        &self.network
    }

    pub fn solution(&self) -> &WorkingSolution {
        &self.solution
    }

    pub fn environment_mode(&self) -> EnvironmentMode {
        self.mode
    }

    /// Number of fact changes waiting for the next flush.
    pub fn pending_events(&self) -> usize {
        self.events.len()
    }

    /// Tuples currently alive in the network.
    pub fn tuple_count(&self) -> usize {
        self.tuples.len()
    }

    pub fn is_poisoned(&self) -> bool {
        self.poisoned
    }

    // Fact changes. Each one is queued and reaches the network on flush.

    /// Stores a new fact and queues its insertion.
    pub fn insert_fact(&mut self, fact: Fact) -> Result<FactId> {
        self.ensure_usable()?;
        let class = fact.class;
        let id = self.solution.insert(fact)?;
        if let Some(references) = &mut self.references {
            references.insert(id, self.solution.fact(id)?);
        }
        self.enqueue(Op::Insert, id, class);
        Ok(id)
    }

    /// Queues an update for a fact whose `changed` fields were modified in
    /// place. An empty `changed` means any field may have changed. Changes
    /// to fields no constraint reads are dropped. Facts referring to `id`
    /// are updated too when some constraint reads through references.
    pub fn update_fact(&mut self, id: FactId, changed: &[usize]) -> Result<()> {
        self.ensure_usable()?;
        let class = self.solution.fact(id)?.class;
        if self.network.observed().is_relevant(class, changed) {
            self.enqueue(Op::Update, id, class);
        }
        if let Some(references) = &mut self.references {
            references.refresh(id, self.solution.fact(id)?);
            let referrers = references.referrers_of(id);
            self.update_referrers(&referrers)?;
        }
        Ok(())
    }

    /// Writes one field and queues the update. Returns the previous value.
    pub fn set_field(&mut self, id: FactId, field: usize, value: Value) -> Result<Value> {
        let old = self.write_field(id, field, value)?;
        self.update_fact(id, &[field])?;
        Ok(old)
    }

    /// Writes one field without queueing anything.
    pub(crate) fn write_field(&mut self, id: FactId, field: usize, value: Value) -> Result<Value> {
        self.ensure_usable()?;
        Ok(self.solution.set_field(id, field, value)?)
    }

    /// Removes a fact from the solution and queues its retraction. The
    /// returned fact can be inserted again (under a new id) to undo.
    pub fn retract_fact(&mut self, id: FactId) -> Result<Fact> {
        self.ensure_usable()?;
        let fact = self.solution.remove(id)?;
        self.enqueue(Op::Retract, id, fact.class);
        if let Some(references) = &mut self.references {
            references.remove(id);
            let referrers = references.referrers_of(id);
            self.update_referrers(&referrers)?;
        }
        Ok(fact)
    }

    /// Queues updates for facts whose tuples may read a changed fact
    /// through a reference.
    fn update_referrers(&mut self, referrers: &[FactId]) -> Result<()> {
        for &referrer in referrers {
            let class = self.solution.fact(referrer)?.class;
            self.enqueue(Op::Update, referrer, class);
        }
        Ok(())
    }

    fn enqueue(&mut self, op: Op, fact: FactId, class: usize) {
        if let Some(root) = self.network.root(class) {
            self.events.push(FactEvent { op, fact, root });
        }
    }

    /// Applies every queued change as one batch.
    ///
    /// A fault raised while propagating leaves the network half-updated, so
    /// it poisons the session: every later call fails with
    /// [`EngineError::Poisoned`].
    pub fn flush(&mut self) -> Result<()> {
        self.ensure_usable()?;
        let events = self.events.len();
        let outcome = self.propagate().and_then(|()| self.assert_consistent());
        if let Err(err) = outcome {
            if err.is_fatal() {
                self.poisoned = true;
                tracing::warn!(event = "session_poisoned", error = %err);
            }
            return Err(err);
        }
        tracing::trace!(
            event = "flush",
            events,
            tuples = self.tuples.len(),
            score = %self.current_score(),
        );
        Ok(())
    }

    fn propagate(&mut self) -> Result<()> {
        let mut events = std::mem::take(&mut self.events);
        let network = &self.network;
        let mut propagator = Propagator {
            nodes: network.nodes(),
            solution: &self.solution,
            tuples: &mut self.tuples,
            states: &mut self.states,
            totals: &mut self.totals,
        };
        for event in events.drain(..) {
            match event.op {
                Op::Insert => propagator.insert_fact(event.root, event.fact)?,
                Op::Update => propagator.update_fact(event.root, event.fact)?,
                Op::Retract => propagator.retract_fact(event.root, event.fact)?,
            }
        }
        for layer in network.layers() {
            for phase in Op::PHASES {
                for &node in layer {
                    propagator.propagate(node, phase)?;
                }
            }
        }
        self.events = events;
        Ok(())
    }

    fn assert_consistent(&mut self) -> Result<()> {
        if !self.mode.is_asserted() {
            return Ok(());
        }
        let propagator = Propagator {
            nodes: self.network.nodes(),
            solution: &self.solution,
            tuples: &mut self.tuples,
            states: &mut self.states,
            totals: &mut self.totals,
        };
        propagator.check_drained()?;
        if self.mode.is_fully_asserted() {
            let incremental = self.current_score();
            let from_scratch = self.from_scratch_score()?;
            if incremental != from_scratch {
                return Err(EngineError::ScoreCorruption {
                    incremental: incremental.to_string(),
                    from_scratch: from_scratch.to_string(),
                });
            }
        }
        Ok(())
    }

    // Score reads. All of them require a flushed session.

    /// The score of the facts as of the last flush.
    pub fn score(&self) -> Result<Sc> {
        self.ensure_flushed()?;
        Ok(self.current_score())
    }

    /// Flushes, then returns the score.
    pub fn calculate_score(&mut self) -> Result<Sc> {
        self.flush()?;
        Ok(self.current_score())
    }

    /// Scores a fresh session built on a clone of the current solution,
    /// using this session's weights.
    pub fn from_scratch_score(&self) -> Result<Sc> {
        self.ensure_usable()?;
        let settings = Settings {
            mode: EnvironmentMode::Production,
            track_matches: false,
            capacity: self.solution.len(),
            weights: self.weights.clone(),
        };
        Self::build(self.network.clone(), self.solution.clone(), settings)?.score()
    }

    fn current_score(&self) -> Sc {
        (0..self.totals.len()).fold(Sc::zero(), |score, i| score + self.constraint_score(i))
    }

    fn constraint_score(&self, constraint: usize) -> Sc {
        let def = &self.network.constraints()[constraint];
        def.impact_type
            .apply(self.weights[constraint].scale(self.totals[constraint].match_weight))
    }

    /// Changes a constraint's weight. Totals are kept unweighted, so nothing
    /// is re-propagated.
    pub fn set_constraint_weight(&mut self, name: &str, weight: Sc) -> Result<()> {
        self.ensure_usable()?;
        let index = self
            .network
            .constraint_index(name)
            .ok_or_else(|| EngineError::UnknownConstraint(name.to_string()))?;
        self.weights[index] = weight;
        Ok(())
    }

    /// Re-weights every constraint from `provider`, falling back to the
    /// declared weight.
    pub fn apply_weights(&mut self, provider: &impl WeightProvider<Sc>) -> Result<()> {
        self.ensure_usable()?;
        self.weights = resolve_weights(&self.network, provider);
        Ok(())
    }

    pub fn constraint_weight(&self, name: &str) -> Option<Sc> {
        self.network.constraint_index(name).map(|i| self.weights[i])
    }

    /// Score and match count of every constraint, in declaration order.
    pub fn constraint_totals(&self) -> Result<Vec<ConstraintResult<Sc>>> {
        self.ensure_flushed()?;
        Ok(self
            .network
            .constraints()
            .iter()
            .enumerate()
            .map(|(i, def)| ConstraintResult {
                constraint_ref: def.constraint_ref.clone(),
                weight: self.weights[i],
                score: self.constraint_score(i),
                match_count: self.totals[i].match_count,
            })
            .collect())
    }

    /// Per-constraint breakdown with one justification per match. Needs
    /// `constraint_match_enabled`.
    pub fn explain(&self) -> Result<ScoreExplanation<Sc>> {
        self.ensure_flushed()?;
        if !self.track_matches {
            return Err(EngineError::ConstraintMatchDisabled);
        }
        let constraints = self.network.constraints();
        let mut analyses: Vec<ConstraintAnalysis<Sc>> = constraints
            .iter()
            .enumerate()
            .map(|(i, def)| ConstraintAnalysis {
                constraint_ref: def.constraint_ref.clone(),
                weight: self.weights[i],
                score: self.constraint_score(i),
                matches: Vec::new(),
                is_hard: self.weights[i].is_hard(),
            })
            .collect();
        for (i, def) in self.network.nodes().iter().enumerate() {
            let NodeKind::Scorer {
                constraint, slot, ..
            } = def.kind
            else {
                continue;
            };
            let StateKind::Scorer(Some(matched)) = &self.states[i].kind else {
                return Err(EngineError::internal(def.label(), "scorer has no match set"));
            };
            let impact_type = constraints[constraint].impact_type;
            let weight = self.weights[constraint];
            for &id in matched {
                let tuple = self.tuples.get(id)?;
                let Some(Slot::Impact(match_weight)) = tuple.store.get(slot) else {
                    return Err(EngineError::internal(def.label(), "matched tuple has no impact"));
                };
                analyses[constraint].matches.push(ConstraintMatch {
                    constraint_ref: constraints[constraint].constraint_ref.clone(),
                    score: impact_type.apply(weight.scale(*match_weight)),
                    justification: ConstraintJustification::new(
                        tuple.values.to_vec(),
                        describe_row(&tuple.values, &self.solution),
                    ),
                });
            }
        }
        Ok(ScoreExplanation {
            score: self.current_score(),
            constraint_analyses: analyses,
        })
    }

    /// Matches charged to every fact they reference.
    pub fn indictments(&self) -> Result<IndictmentMap<Sc>> {
        let explanation = self.explain()?;
        Ok(IndictmentMap::from_matches(
            explanation
                .constraint_analyses
                .into_iter()
                .flat_map(|a| a.matches),
        ))
    }

    fn ensure_usable(&self) -> Result<()> {
        if self.poisoned {
            Err(EngineError::Poisoned)
        } else {
            Ok(())
        }
    }

    fn ensure_flushed(&self) -> Result<()> {
        self.ensure_usable()?;
        match self.events.len() {
            0 => Ok(()),
            n => Err(EngineError::PendingEvents(n)),
        }
    }
}

fn resolve_weights<Sc: Score>(
    network: &Network<Sc>,
    provider: &impl WeightProvider<Sc>,
) -> Vec<Sc> {
    network
        .constraints()
        .iter()
        .map(|def| {
            provider
                .weight(&def.constraint_ref.name)
                .or_else(|| provider.weight(&def.constraint_ref.full_name()))
                .unwrap_or(def.weight)
        })
        .collect()
}
