//! Node runtime: per-session node state and the propagation protocol.
//!
//! Tuple sources (ForEach, Join, Exists, Group, Map, Flatten, Concat) own a
//! queue of the tuples they emitted but have not yet propagated. A flush
//! walks the network layer by layer, and each layer runs retracts, then
//! updates, then inserts. Children react to a propagated tuple immediately: stateful
//! children only enqueue their own outputs, while filters and scorers act on
//! the parent's tuple in place.

mod exists;
mod filter;
mod group;
pub(crate) mod index;
mod join;
mod map;
mod scorer;


use std::collections::{BTreeSet, HashMap};

use scoreforge_core::{EvalContext, ExprError, FactId, Value, WorkingSolution};

use crate::error::{EngineError, Result};
use crate::network::{Child, NodeDef, NodeId, NodeKind, Side};
use crate::tuple::{Row, Slot, TupleArena, TupleId, TupleState};

use group::GroupEntry;
use index::Index;

/// A lifecycle event delivered to a node, also used as propagation phase.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Op {
    Retract,
    Update,
    Insert,
}

impl Op {
    pub const PHASES: [Op; 3] = [Op::Retract, Op::Update, Op::Insert];
}

/// Raw match-weight total of one constraint.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub(crate) struct ConstraintTotal {
    pub match_weight: i64,
    pub match_count: usize,
}

pub(crate) enum StateKind {
    ForEach(HashMap<FactId, TupleId>),
    /// Filters, maps, flattens and concatenations keep everything in tuple
    /// slots.
    Pass,
    Join { left: Index, right: Index },
    Exists { left: Index, right: Index },
    Group(HashMap<Row, GroupEntry>),
    /// Matched tuples, when constraint match tracking is on.
    Scorer(Option<BTreeSet<TupleId>>),
}

pub(crate) struct NodeState {
    pub queue: Vec<TupleId>,
    pub kind: StateKind,
}

impl NodeState {
    pub fn new(def: &NodeDef, track_matches: bool) -> Self {
        let kind = match def.kind {
            NodeKind::ForEach { .. } => StateKind::ForEach(HashMap::new()),
            NodeKind::Filter { .. }
            | NodeKind::Map { .. }
            | NodeKind::Flatten { .. }
            | NodeKind::Concat { .. } => StateKind::Pass,
            NodeKind::Join(_) => StateKind::Join {
                left: Index::default(),
                right: Index::default(),
            },
            NodeKind::Exists(_) => StateKind::Exists {
                left: Index::default(),
                right: Index::default(),
            },
            NodeKind::Group(_) => StateKind::Group(HashMap::new()),
            NodeKind::Scorer { .. } => StateKind::Scorer(track_matches.then(BTreeSet::new)),
        };
        NodeState {
            queue: Vec::new(),
            kind,
        }
    }
}

/// Mutable view over one session's runtime state for the duration of a
/// flush.
pub(crate) struct Propagator<'a> {
    pub nodes: &'a [NodeDef],
    pub solution: &'a WorkingSolution,
    pub tuples: &'a mut TupleArena,
    pub states: &'a mut [NodeState],
    pub totals: &'a mut [ConstraintTotal],
}

impl<'a> Propagator<'a> {
    // ForEach entry points, driven by the session's fact events.

    pub fn insert_fact(&mut self, root: NodeId, id: FactId) -> Result<()> {
        if self.fact_tuples(root)?.contains_key(&id) {
            return Err(EngineError::internal(
                self.label(root),
                format!("fact {} inserted twice", id),
            ));
        }
        let tuple = self.create(root, Row::from_elem(Value::Fact(id), 1));
        self.fact_tuples(root)?.insert(id, tuple);
        Ok(())
    }

    pub fn update_fact(&mut self, root: NodeId, id: FactId) -> Result<()> {
        let tuple = self.fact_tuple(root, id)?;
        self.mark_updated(root, tuple)
    }

    pub fn retract_fact(&mut self, root: NodeId, id: FactId) -> Result<()> {
        let tuple = self.fact_tuple(root, id)?;
        self.fact_tuples(root)?.remove(&id);
        self.mark_retracted(root, tuple)
    }

    fn fact_tuples(&mut self, root: NodeId) -> Result<&mut HashMap<FactId, TupleId>> {
        let label = self.label(root);
        match &mut self.states[root.0].kind {
            StateKind::ForEach(tuples) => Ok(tuples),
            _ => Err(EngineError::internal(label, "not a ForEach node")),
        }
    }

    fn fact_tuple(&mut self, root: NodeId, id: FactId) -> Result<TupleId> {
        let label = self.label(root);
        self.fact_tuples(root)?
            .get(&id)
            .copied()
            .ok_or_else(|| EngineError::internal(label, format!("fact {} has no tuple", id)))
    }

    /// Propagates one phase of a tuple source's queue to its children.
    pub fn propagate(&mut self, node: NodeId, phase: Op) -> Result<()> {
        let queue = std::mem::take(&mut self.states[node.0].queue);
        let mut pending = Vec::new();
        for id in queue {
            let state = self.tuples.get(id)?.state;
            match (phase, state) {
                (Op::Retract, TupleState::Dying) => {
                    self.forward(node, Op::Retract, id)?;
                    self.tuples.free(id)?;
                }
                (Op::Retract, TupleState::Aborting) => {
                    self.tuples.free(id)?;
                }
                (Op::Update, TupleState::Updating) => {
                    let changed = self.prepare(node, id)?;
                    self.tuples.get_mut(id)?.state = TupleState::Ok;
                    if changed {
                        self.forward(node, Op::Update, id)?;
                    }
                }
                (Op::Insert, TupleState::Creating) => {
                    self.prepare(node, id)?;
                    self.tuples.get_mut(id)?.state = TupleState::Ok;
                    self.forward(node, Op::Insert, id)?;
                }
                (_, TupleState::Ok | TupleState::Dead) => {
                    return Err(EngineError::internal(
                        self.label(node),
                        format!("{:?} tuple found in the queue", state),
                    ));
                }
                _ => pending.push(id),
            }
        }
        self.states[node.0].queue.extend(pending);
        Ok(())
    }

    /// Finalizes a tuple's values before it is propagated. Returns whether
    /// children can observe a change.
    fn prepare(&mut self, node: NodeId, id: TupleId) -> Result<bool> {
        match &self.nodes[node.0].kind {
            NodeKind::Group(def) => self.group_refresh(node, def, id),
            _ => Ok(true),
        }
    }

    fn forward(&mut self, node: NodeId, op: Op, id: TupleId) -> Result<()> {
        let nodes = self.nodes;
        for child in &nodes[node.0].children {
            self.dispatch(*child, op, id)?;
        }
        Ok(())
    }

    fn dispatch(&mut self, child: Child, op: Op, id: TupleId) -> Result<()> {
        let nodes = self.nodes;
        let node = child.node;
        match &nodes[node.0].kind {
            NodeKind::ForEach { .. } => Err(EngineError::internal(
                self.label(node),
                "root node received a tuple",
            )),
            NodeKind::Filter { predicate, slot } => self.filter(node, predicate, *slot, op, id),
            NodeKind::Join(def) => match op {
                Op::Insert => self.join_insert(node, def, child.side, id),
                Op::Update => self.join_update(node, def, child.side, id),
                Op::Retract => self.join_retract(node, def, child.side, id),
            },
            NodeKind::Exists(def) => match (op, child.side) {
                (Op::Insert, Side::Left) => self.exists_insert_left(node, def, id),
                (Op::Update, Side::Left) => self.exists_update_left(node, def, id),
                (Op::Retract, Side::Left) => self.exists_retract_left(node, def, id),
                (Op::Insert, Side::Right) => self.exists_insert_right(node, def, id),
                (Op::Update, Side::Right) => self.exists_update_right(node, def, id),
                (Op::Retract, Side::Right) => self.exists_retract_right(node, def, id),
            },
            NodeKind::Group(def) => match op {
                Op::Insert => self.group_insert(node, def, id),
                Op::Update => self.group_update(node, def, id),
                Op::Retract => self.group_retract(node, def, id),
            },
            NodeKind::Map { mappings, slot } => match op {
                Op::Insert => self.map_insert(node, mappings, *slot, id),
                Op::Update => self.map_update(node, mappings, *slot, id),
                Op::Retract => self.retract_mapped(node, *slot, id),
            },
            NodeKind::Concat {
                left_slot,
                right_slot,
            } => {
                let slot = match child.side {
                    Side::Left => *left_slot,
                    Side::Right => *right_slot,
                };
                match op {
                    Op::Insert => self.concat_insert(node, slot, id),
                    Op::Update => self.concat_update(node, slot, id),
                    Op::Retract => self.retract_mapped(node, slot, id),
                }
            }
            NodeKind::Flatten { collection, slot } => match op {
                Op::Insert => self.flatten_insert(node, collection, *slot, id),
                Op::Update => self.flatten_update(node, collection, *slot, id),
                Op::Retract => self.flatten_retract(node, *slot, id),
            },
            NodeKind::Scorer {
                constraint,
                match_weight,
                slot,
            } => match op {
                Op::Insert => self.score_insert(node, *constraint, match_weight, *slot, id),
                Op::Update => self.score_update(node, *constraint, match_weight, *slot, id),
                Op::Retract => self.score_retract(node, *constraint, *slot, id),
            },
        }
    }

    // Tuple lifecycle helpers.

    fn create(&mut self, node: NodeId, values: Row) -> TupleId {
        debug_assert_eq!(values.len(), self.nodes[node.0].arity, "{}", self.label(node));
        let id = self.tuples.allocate(values, self.nodes[node.0].store_size);
        self.states[node.0].queue.push(id);
        id
    }

    fn mark_updated(&mut self, node: NodeId, id: TupleId) -> Result<()> {
        let tuple = self.tuples.get_mut(id)?;
        match tuple.state {
            TupleState::Ok => {
                tuple.state = TupleState::Updating;
                self.states[node.0].queue.push(id);
                Ok(())
            }
            TupleState::Creating | TupleState::Updating => Ok(()),
            state => Err(EngineError::internal(
                self.label(node),
                format!("update of a {:?} tuple", state),
            )),
        }
    }

    fn mark_retracted(&mut self, node: NodeId, id: TupleId) -> Result<()> {
        let tuple = self.tuples.get_mut(id)?;
        match tuple.state {
            TupleState::Creating => {
                tuple.state = TupleState::Aborting;
                Ok(())
            }
            TupleState::Ok => {
                tuple.state = TupleState::Dying;
                self.states[node.0].queue.push(id);
                Ok(())
            }
            TupleState::Updating => {
                tuple.state = TupleState::Dying;
                Ok(())
            }
            state => Err(EngineError::internal(
                self.label(node),
                format!("retract of a {:?} tuple", state),
            )),
        }
    }

    /// Tuples about to be retracted by their producer. Nodes skip them when
    /// looking for new matches, and their pending retract cleans up the rest.
    fn is_leaving(&self, id: TupleId) -> Result<bool> {
        Ok(matches!(
            self.tuples.get(id)?.state,
            TupleState::Dying | TupleState::Aborting
        ))
    }

    fn set_values(&mut self, id: TupleId, values: Row) -> Result<()> {
        self.tuples.get_mut(id)?.values = values;
        Ok(())
    }

    // Store slots.

    fn slot(&self, node: NodeId, id: TupleId, slot: usize) -> Result<&Slot> {
        self.tuples
            .get(id)?
            .store
            .get(slot)
            .ok_or_else(|| {
                EngineError::internal(
                    self.label(node),
                    format!("store slot {} not allocated", slot),
                )
            })
    }

    fn slot_mut(&mut self, node: NodeId, id: TupleId, slot: usize) -> Result<&mut Slot> {
        let nodes = self.nodes;
        self.tuples
            .get_mut(id)?
            .store
            .get_mut(slot)
            .ok_or_else(|| {
                EngineError::internal(
                    nodes[node.0].label(),
                    format!("store slot {} not allocated", slot),
                )
            })
    }

    fn set_slot(&mut self, node: NodeId, id: TupleId, slot: usize, value: Slot) -> Result<()> {
        *self.slot_mut(node, id, slot)? = value;
        Ok(())
    }

    fn take_slot(&mut self, node: NodeId, id: TupleId, slot: usize) -> Result<Slot> {
        Ok(std::mem::take(self.slot_mut(node, id, slot)?))
    }

    // Evaluation.

    fn label(&self, node: NodeId) -> String {
        self.nodes[node.0].label()
    }

    /// Runs an evaluation against a row, attributing failures to `node`.
    fn evaluate<T>(
        &self,
        node: NodeId,
        values: &[Value],
        f: impl FnOnce(&EvalContext<'_>) -> std::result::Result<T, ExprError>,
    ) -> Result<T> {
        f(&EvalContext::new(values, self.solution))
            .map_err(|source| evaluation_error(&self.nodes[node.0], self.solution, values, source))
    }

    /// Evaluates against a tuple's values.
    fn evaluate_tuple<T>(
        &self,
        node: NodeId,
        id: TupleId,
        f: impl FnOnce(&EvalContext<'_>) -> std::result::Result<T, ExprError>,
    ) -> Result<T> {
        let tuple = self.tuples.get(id)?;
        self.evaluate(node, &tuple.values, f)
    }

    fn values(&self, id: TupleId) -> Result<&Row> {
        Ok(&self.tuples.get(id)?.values)
    }

    /// Left values followed by right values.
    fn combined(&self, left: TupleId, right: TupleId) -> Result<Row> {
        let mut row = self.values(left)?.clone();
        row.extend(self.values(right)?.iter().cloned());
        Ok(row)
    }

    /// Fails if any queue still holds tuples after a complete flush.
    pub fn check_drained(&self) -> Result<()> {
        for (i, state) in self.states.iter().enumerate() {
            if let Some(id) = state.queue.first() {
                return Err(EngineError::internal(
                    self.nodes[i].label(),
                    format!(
                        "{} tuple(s) left in the queue after flush, first {:?}",
                        state.queue.len(),
                        self.tuples.get(*id)?.state
                    ),
                ));
            }
        }
        Ok(())
    }
}

fn unexpected_slot(def: &NodeDef, expected: &str, found: &Slot) -> EngineError {
    EngineError::internal(
        def.label(),
        format!("expected a {} slot, found {:?}", expected, found),
    )
}

pub(crate) fn evaluation_error(
    def: &NodeDef,
    solution: &WorkingSolution,
    values: &[Value],
    source: ExprError,
) -> EngineError {
    EngineError::Evaluation {
        constraints: def.constraints.join(", "),
        node: def.label(),
        tuple: describe_row(values, solution),
        source,
    }
}

/// Row rendering with facts shown as `Class#id`.
pub(crate) fn describe_row(values: &[Value], solution: &WorkingSolution) -> String {
    values
        .iter()
        .map(|v| match v {
            Value::Fact(id) => solution.describe(*id),
            other => other.to_string(),
        })
        .collect::<Vec<_>>()
        .join(", ")
}

/// Whether two rows are indistinguishable to downstream expressions.
/// Rows holding fact references never are, since the facts' fields may have
/// changed underneath.
fn same_row(old: &[Value], new: &[Value]) -> bool {
    old == new && new.iter().all(Value::is_fact_free)
}
