//! Filter: passes its parent's tuples through while a predicate holds.

use scoreforge_core::Expr;

use super::{unexpected_slot, Op, Propagator};
use crate::error::Result;
use crate::network::NodeId;
use crate::tuple::{Slot, TupleId};

impl Propagator<'_> {
    pub(super) fn filter(
        &mut self,
        node: NodeId,
        predicate: &Expr,
        slot: usize,
        op: Op,
        id: TupleId,
    ) -> Result<()> {
        match op {
            Op::Insert => {
                let passed = self.evaluate_tuple(node, id, |ctx| predicate.eval_bool(ctx))?;
                self.set_slot(node, id, slot, Slot::Passed(passed))?;
                if passed {
                    self.forward(node, Op::Insert, id)?;
                }
                Ok(())
            }
            Op::Update => {
                let was = self.passed(node, id, slot)?;
                let now = self.evaluate_tuple(node, id, |ctx| predicate.eval_bool(ctx))?;
                self.set_slot(node, id, slot, Slot::Passed(now))?;
                match (was, now) {
                    (true, true) => self.forward(node, Op::Update, id),
                    (false, true) => self.forward(node, Op::Insert, id),
                    (true, false) => self.forward(node, Op::Retract, id),
                    (false, false) => Ok(()),
                }
            }
            Op::Retract => {
                if self.passed(node, id, slot)? {
                    self.forward(node, Op::Retract, id)?;
                }
                self.set_slot(node, id, slot, Slot::Empty)
            }
        }
    }

    fn passed(&self, node: NodeId, id: TupleId, slot: usize) -> Result<bool> {
        match self.slot(node, id, slot)? {
            Slot::Passed(passed) => Ok(*passed),
            other => Err(unexpected_slot(&self.nodes[node.0], "filter", other)),
        }
    }
}
