//! Join: pairs left and right tuples through hash/range indexes.

use scoreforge_core::Value;

use super::index::{IndexKey, RangeQuery};
use super::{unexpected_slot, Index, Propagator, StateKind};
use crate::error::{EngineError, Result};
use crate::network::{JoinCondition, JoinDef, NodeId, Side};
use crate::tuple::{Row, Slot, TupleId};

impl Side {
    pub(crate) fn opposite(self) -> Side {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
        }
    }
}

/// `(left, right)` for a tuple arriving on `side` and its partner.
pub(super) fn oriented(side: Side, id: TupleId, partner: TupleId) -> (TupleId, TupleId) {
    match side {
        Side::Left => (id, partner),
        Side::Right => (partner, id),
    }
}

pub(super) fn range_query(
    condition: &JoinCondition,
    side: Side,
    key: &IndexKey,
) -> Option<RangeQuery> {
    condition
        .range
        .as_ref()
        .zip(key.range.as_ref())
        .map(|(range, key)| RangeQuery::new(range, side, key))
}

fn slot_of(def: &JoinDef, side: Side) -> usize {
    match side {
        Side::Left => def.left_slot,
        Side::Right => def.right_slot,
    }
}

impl Propagator<'_> {
    pub(super) fn index_key(
        &self,
        node: NodeId,
        condition: &JoinCondition,
        side: Side,
        id: TupleId,
    ) -> Result<IndexKey> {
        self.evaluate_tuple(node, id, |ctx| condition.key(side, ctx))
    }

    /// Index of the arriving side, then index of the opposite side.
    pub(super) fn sides(
        &mut self,
        node: NodeId,
        side: Side,
    ) -> Result<(&mut Index, &mut Index)> {
        let nodes = self.nodes;
        match &mut self.states[node.0].kind {
            StateKind::Join { left, right } | StateKind::Exists { left, right } => {
                Ok(match side {
                    Side::Left => (left, right),
                    Side::Right => (right, left),
                })
            }
            _ => Err(EngineError::internal(
                nodes[node.0].label(),
                "node has no join indexes",
            )),
        }
    }

    pub(super) fn join_insert(
        &mut self,
        node: NodeId,
        def: &JoinDef,
        side: Side,
        id: TupleId,
    ) -> Result<()> {
        let key = self.index_key(node, &def.condition, side, id)?;
        let query = range_query(&def.condition, side, &key);
        let candidates = {
            let (own, other) = self.sides(node, side)?;
            own.put(&key, id);
            other.lookup(&key.equal, query.as_ref())
        };
        self.set_slot(
            node,
            id,
            slot_of(def, side),
            Slot::JoinSide {
                key,
                outputs: Vec::new(),
            },
        )?;
        for partner in candidates {
            if self.is_leaving(partner)? {
                continue;
            }
            let (left, right) = oriented(side, id, partner);
            let values = self.combined(left, right)?;
            if self.residual_holds(node, &def.condition, &values)? {
                self.link(node, def, left, right, values)?;
            }
        }
        Ok(())
    }

    pub(super) fn join_retract(
        &mut self,
        node: NodeId,
        def: &JoinDef,
        side: Side,
        id: TupleId,
    ) -> Result<()> {
        let (key, outputs) = match self.take_slot(node, id, slot_of(def, side))? {
            Slot::JoinSide { key, outputs } => (key, outputs),
            other => return Err(unexpected_slot(&self.nodes[node.0], "join", &other)),
        };
        if !self.sides(node, side)?.0.remove(&key, id) {
            return Err(EngineError::internal(
                self.label(node),
                "retracted tuple is missing from the join index",
            ));
        }
        let partner_slot = slot_of(def, side.opposite());
        for (out, partner) in outputs {
            self.unlink(node, partner, partner_slot, out)?;
            self.mark_retracted(node, out)?;
        }
        Ok(())
    }

    pub(super) fn join_update(
        &mut self,
        node: NodeId,
        def: &JoinDef,
        side: Side,
        id: TupleId,
    ) -> Result<()> {
        let own_slot = slot_of(def, side);
        let key = self.index_key(node, &def.condition, side, id)?;
        let outputs = match self.slot(node, id, own_slot)? {
            Slot::JoinSide { key: old, outputs } => (*old == key).then(|| outputs.clone()),
            other => return Err(unexpected_slot(&self.nodes[node.0], "join", other)),
        };
        let Some(outputs) = outputs else {
            // Moved to another bucket.
            self.join_retract(node, def, side, id)?;
            return self.join_insert(node, def, side, id);
        };

        let Some(residual) = &def.condition.residual else {
            for (out, partner) in outputs {
                let (left, right) = oriented(side, id, partner);
                let values = self.combined(left, right)?;
                self.set_values(out, values)?;
                self.mark_updated(node, out)?;
            }
            return Ok(());
        };

        let query = range_query(&def.condition, side, &key);
        let candidates = self.sides(node, side)?.1.lookup(&key.equal, query.as_ref());
        for partner in candidates {
            if self.is_leaving(partner)? {
                continue;
            }
            let (left, right) = oriented(side, id, partner);
            let values = self.combined(left, right)?;
            let holds = self.evaluate(node, &values, |ctx| residual.eval_bool(ctx))?;
            let existing = outputs
                .iter()
                .find(|(_, p)| *p == partner)
                .map(|(out, _)| *out);
            match (existing, holds) {
                (Some(out), true) => {
                    self.set_values(out, values)?;
                    self.mark_updated(node, out)?;
                }
                (Some(out), false) => {
                    self.unlink(node, left, def.left_slot, out)?;
                    self.unlink(node, right, def.right_slot, out)?;
                    self.mark_retracted(node, out)?;
                }
                (None, true) => self.link(node, def, left, right, values)?,
                (None, false) => {}
            }
        }
        Ok(())
    }

    pub(super) fn residual_holds(
        &self,
        node: NodeId,
        condition: &JoinCondition,
        values: &[Value],
    ) -> Result<bool> {
        match &condition.residual {
            Some(residual) => self.evaluate(node, values, |ctx| residual.eval_bool(ctx)),
            None => Ok(true),
        }
    }

    fn link(
        &mut self,
        node: NodeId,
        def: &JoinDef,
        left: TupleId,
        right: TupleId,
        values: Row,
    ) -> Result<()> {
        let out = self.create(node, values);
        self.join_outputs(node, left, def.left_slot)?.push((out, right));
        self.join_outputs(node, right, def.right_slot)?.push((out, left));
        Ok(())
    }

    fn unlink(&mut self, node: NodeId, id: TupleId, slot: usize, out: TupleId) -> Result<()> {
        let outputs = self.join_outputs(node, id, slot)?;
        match outputs.iter().position(|(o, _)| *o == out) {
            Some(i) => {
                outputs.swap_remove(i);
                Ok(())
            }
            None => Err(EngineError::internal(
                self.label(node),
                "join output is not linked to its parent",
            )),
        }
    }

    fn join_outputs(
        &mut self,
        node: NodeId,
        id: TupleId,
        slot: usize,
    ) -> Result<&mut Vec<(TupleId, TupleId)>> {
        let nodes = self.nodes;
        match self.slot_mut(node, id, slot)? {
            Slot::JoinSide { outputs, .. } => Ok(outputs),
            other => Err(unexpected_slot(&nodes[node.0], "join", other)),
        }
    }
}
