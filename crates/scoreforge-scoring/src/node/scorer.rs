//! Scorer: adds each matching tuple's weight to its constraint's total.

use scoreforge_core::{Expr, ExprError};

use super::{evaluation_error, unexpected_slot, ConstraintTotal, Propagator, StateKind};
use crate::error::{EngineError, Result};
use crate::network::NodeId;
use crate::tuple::{Slot, TupleId};

impl Propagator<'_> {
    pub(super) fn score_insert(
        &mut self,
        node: NodeId,
        constraint: usize,
        match_weight: &Expr,
        slot: usize,
        id: TupleId,
    ) -> Result<()> {
        let weight = self.evaluate_tuple(node, id, |ctx| match_weight.eval_int(ctx))?;
        self.impact(node, constraint, id, None, weight)?;
        self.set_slot(node, id, slot, Slot::Impact(weight))?;
        self.track(node, id, true)
    }

    /// Undoes the stored impact and applies the new one.
    pub(super) fn score_update(
        &mut self,
        node: NodeId,
        constraint: usize,
        match_weight: &Expr,
        slot: usize,
        id: TupleId,
    ) -> Result<()> {
        let old = self.take_impact(node, slot, id)?;
        let weight = self.evaluate_tuple(node, id, |ctx| match_weight.eval_int(ctx))?;
        self.impact(node, constraint, id, Some(old), weight)?;
        self.set_slot(node, id, slot, Slot::Impact(weight))
    }

    pub(super) fn score_retract(
        &mut self,
        node: NodeId,
        constraint: usize,
        slot: usize,
        id: TupleId,
    ) -> Result<()> {
        let old = self.take_impact(node, slot, id)?;
        let label = self.label(node);
        let total = self.total(node, constraint)?;
        match (total.match_weight.checked_sub(old), total.match_count.checked_sub(1)) {
            (Some(weight), Some(count)) => {
                total.match_weight = weight;
                total.match_count = count;
            }
            _ => return Err(EngineError::internal(label, "retract exceeds the constraint total")),
        }
        self.track(node, id, false)
    }

    /// Replaces a tuple's contribution `old` with `new`. A fresh match has no
    /// old contribution and counts as one more match.
    fn impact(
        &mut self,
        node: NodeId,
        constraint: usize,
        id: TupleId,
        old: Option<i64>,
        new: i64,
    ) -> Result<()> {
        let total = *self.total(node, constraint)?;
        let Some(match_weight) = total
            .match_weight
            .checked_sub(old.unwrap_or(0))
            .and_then(|t| t.checked_add(new))
        else {
            let values = self.values(id)?.clone();
            return Err(evaluation_error(
                &self.nodes[node.0],
                self.solution,
                &values,
                ExprError::Overflow("constraint total"),
            ));
        };
        *self.total(node, constraint)? = ConstraintTotal {
            match_weight,
            match_count: total.match_count + usize::from(old.is_none()),
        };
        Ok(())
    }

    fn take_impact(&mut self, node: NodeId, slot: usize, id: TupleId) -> Result<i64> {
        match self.take_slot(node, id, slot)? {
            Slot::Impact(weight) => Ok(weight),
            other => Err(unexpected_slot(&self.nodes[node.0], "scorer", &other)),
        }
    }

    fn total(&mut self, node: NodeId, constraint: usize) -> Result<&mut ConstraintTotal> {
        let nodes = self.nodes;
        self.totals.get_mut(constraint).ok_or_else(|| {
            EngineError::internal(nodes[node.0].label(), format!("no constraint {}", constraint))
        })
    }

    fn track(&mut self, node: NodeId, id: TupleId, matched: bool) -> Result<()> {
        let nodes = self.nodes;
        match &mut self.states[node.0].kind {
            StateKind::Scorer(None) => Ok(()),
            StateKind::Scorer(Some(matches)) => {
                let consistent = if matched {
                    matches.insert(id)
                } else {
                    matches.remove(&id)
                };
                if consistent {
                    Ok(())
                } else {
                    Err(EngineError::internal(
                        nodes[node.0].label(),
                        "match set out of step with the scorer",
                    ))
                }
            }
            _ => Err(EngineError::internal(nodes[node.0].label(), "not a scorer node")),
        }
    }
}
