//! Exists / not-exists: gates left tuples on whether any right tuple
//! matches.
//!
//! Without a residual filter the node only counts matches per left tuple;
//! the index alone decides what matches. With a residual, both sides keep
//! their match lists so a retract or update can undo exactly what was
//! counted.

use super::index::IndexKey;
use super::join::{oriented, range_query};
use super::{unexpected_slot, Propagator};
use crate::error::{EngineError, Result};
use crate::network::{ExistsDef, NodeId, Side};
use crate::tuple::{Slot, TupleId};

impl Propagator<'_> {
    pub(super) fn exists_insert_left(
        &mut self,
        node: NodeId,
        def: &ExistsDef,
        id: TupleId,
    ) -> Result<()> {
        let (key, count, matches) = self.attach_left(node, def, id)?;
        let output = if is_open(def, count) {
            let values = self.values(id)?.clone();
            Some(self.create(node, values))
        } else {
            None
        };
        self.set_slot(
            node,
            id,
            def.left_slot,
            Slot::ExistsLeft {
                key,
                count,
                matches,
                output,
            },
        )
    }

    pub(super) fn exists_retract_left(
        &mut self,
        node: NodeId,
        def: &ExistsDef,
        id: TupleId,
    ) -> Result<()> {
        if let Some(output) = self.detach_left(node, def, id)? {
            self.mark_retracted(node, output)?;
        }
        Ok(())
    }

    pub(super) fn exists_update_left(
        &mut self,
        node: NodeId,
        def: &ExistsDef,
        id: TupleId,
    ) -> Result<()> {
        let key = self.index_key(node, &def.condition, Side::Left, id)?;
        let unchanged = match self.slot(node, id, def.left_slot)? {
            Slot::ExistsLeft { key: old, .. } => *old == key,
            other => return Err(unexpected_slot(&self.nodes[node.0], "exists", other)),
        };

        let (output, open) = if unchanged && def.condition.residual.is_none() {
            match self.slot(node, id, def.left_slot)? {
                Slot::ExistsLeft { output, .. } => (*output, output.is_some()),
                other => return Err(unexpected_slot(&self.nodes[node.0], "exists", other)),
            }
        } else {
            let output = self.detach_left(node, def, id)?;
            let (key, count, matches) = self.attach_left(node, def, id)?;
            self.set_slot(
                node,
                id,
                def.left_slot,
                Slot::ExistsLeft {
                    key,
                    count,
                    matches,
                    output,
                },
            )?;
            (output, is_open(def, count))
        };

        let output = match (output, open) {
            (Some(out), true) => {
                let values = self.values(id)?.clone();
                self.set_values(out, values)?;
                self.mark_updated(node, out)?;
                Some(out)
            }
            (Some(out), false) => {
                self.mark_retracted(node, out)?;
                None
            }
            (None, true) => {
                let values = self.values(id)?.clone();
                Some(self.create(node, values))
            }
            (None, false) => None,
        };
        self.set_output(node, def, id, output)
    }

    pub(super) fn exists_insert_right(
        &mut self,
        node: NodeId,
        def: &ExistsDef,
        id: TupleId,
    ) -> Result<()> {
        let key = self.index_key(node, &def.condition, Side::Right, id)?;
        let query = range_query(&def.condition, Side::Right, &key);
        let candidates = {
            let (own, other) = self.sides(node, Side::Right)?;
            own.put(&key, id);
            other.lookup(&key.equal, query.as_ref())
        };
        let mut matches = Vec::new();
        for left in candidates {
            if def.condition.residual.is_some() {
                if self.is_leaving(left)? {
                    continue;
                }
                let values = self.combined(left, id)?;
                if !self.residual_holds(node, &def.condition, &values)? {
                    continue;
                }
                self.left_matches(node, def, left)?.push(id);
                matches.push(left);
            }
            self.bump(node, def, left, 1)?;
        }
        self.set_slot(node, id, def.right_slot, Slot::ExistsRight { key, matches })
    }

    pub(super) fn exists_retract_right(
        &mut self,
        node: NodeId,
        def: &ExistsDef,
        id: TupleId,
    ) -> Result<()> {
        let (key, matches) = match self.take_slot(node, id, def.right_slot)? {
            Slot::ExistsRight { key, matches } => (key, matches),
            other => return Err(unexpected_slot(&self.nodes[node.0], "exists", &other)),
        };
        if !self.sides(node, Side::Right)?.0.remove(&key, id) {
            return Err(EngineError::internal(
                self.label(node),
                "retracted tuple is missing from the exists index",
            ));
        }
        let lefts = if def.condition.residual.is_some() {
            for &left in &matches {
                if !remove_one(self.left_matches(node, def, left)?, id) {
                    return Err(EngineError::internal(self.label(node), "unpaired exists match"));
                }
            }
            matches
        } else {
            let query = range_query(&def.condition, Side::Right, &key);
            self.sides(node, Side::Right)?.1.lookup(&key.equal, query.as_ref())
        };
        for left in lefts {
            self.bump(node, def, left, -1)?;
        }
        Ok(())
    }

    pub(super) fn exists_update_right(
        &mut self,
        node: NodeId,
        def: &ExistsDef,
        id: TupleId,
    ) -> Result<()> {
        if def.condition.residual.is_none() {
            let key = self.index_key(node, &def.condition, Side::Right, id)?;
            let unchanged = match self.slot(node, id, def.right_slot)? {
                Slot::ExistsRight { key: old, .. } => *old == key,
                other => return Err(unexpected_slot(&self.nodes[node.0], "exists", other)),
            };
            if unchanged {
                return Ok(());
            }
        }
        self.exists_retract_right(node, def, id)?;
        self.exists_insert_right(node, def, id)
    }

    /// Indexes a left tuple and counts its current matches.
    fn attach_left(
        &mut self,
        node: NodeId,
        def: &ExistsDef,
        id: TupleId,
    ) -> Result<(IndexKey, usize, Vec<TupleId>)> {
        let key = self.index_key(node, &def.condition, Side::Left, id)?;
        let query = range_query(&def.condition, Side::Left, &key);
        let candidates = {
            let (own, other) = self.sides(node, Side::Left)?;
            own.put(&key, id);
            other.lookup(&key.equal, query.as_ref())
        };
        if def.condition.residual.is_none() {
            return Ok((key, candidates.len(), Vec::new()));
        }
        let mut matches = Vec::new();
        for right in candidates {
            if self.is_leaving(right)? {
                continue;
            }
            let (l, r) = oriented(Side::Left, id, right);
            let values = self.combined(l, r)?;
            if self.residual_holds(node, &def.condition, &values)? {
                self.right_matches(node, def, right)?.push(id);
                matches.push(right);
            }
        }
        let count = matches.len();
        Ok((key, count, matches))
    }

    /// Removes a left tuple from the index and from its partners' match
    /// lists, returning its output.
    fn detach_left(
        &mut self,
        node: NodeId,
        def: &ExistsDef,
        id: TupleId,
    ) -> Result<Option<TupleId>> {
        let (key, matches, output) = match self.take_slot(node, id, def.left_slot)? {
            Slot::ExistsLeft {
                key,
                matches,
                output,
                ..
            } => (key, matches, output),
            other => return Err(unexpected_slot(&self.nodes[node.0], "exists", &other)),
        };
        if !self.sides(node, Side::Left)?.0.remove(&key, id) {
            return Err(EngineError::internal(
                self.label(node),
                "retracted tuple is missing from the exists index",
            ));
        }
        for right in matches {
            if !remove_one(self.right_matches(node, def, right)?, id) {
                return Err(EngineError::internal(self.label(node), "unpaired exists match"));
            }
        }
        Ok(output)
    }

    /// Adjusts a left tuple's match count and opens or closes its gate when
    /// the count crosses zero.
    fn bump(&mut self, node: NodeId, def: &ExistsDef, left: TupleId, delta: isize) -> Result<()> {
        let nodes = self.nodes;
        let (before, after, output) = match self.slot_mut(node, left, def.left_slot)? {
            Slot::ExistsLeft { count, output, .. } => {
                let before = *count;
                *count = count.checked_add_signed(delta).ok_or_else(|| {
                    EngineError::internal(nodes[node.0].label(), "exists count below zero")
                })?;
                (before, *count, *output)
            }
            other => return Err(unexpected_slot(&nodes[node.0], "exists", other)),
        };
        if is_open(def, before) == is_open(def, after) {
            return Ok(());
        }
        let output = match output {
            Some(out) => {
                self.mark_retracted(node, out)?;
                None
            }
            None => {
                let values = self.values(left)?.clone();
                Some(self.create(node, values))
            }
        };
        self.set_output(node, def, left, output)
    }

    fn set_output(
        &mut self,
        node: NodeId,
        def: &ExistsDef,
        left: TupleId,
        value: Option<TupleId>,
    ) -> Result<()> {
        let nodes = self.nodes;
        match self.slot_mut(node, left, def.left_slot)? {
            Slot::ExistsLeft { output, .. } => {
                *output = value;
                Ok(())
            }
            other => Err(unexpected_slot(&nodes[node.0], "exists", other)),
        }
    }

    fn left_matches(
        &mut self,
        node: NodeId,
        def: &ExistsDef,
        id: TupleId,
    ) -> Result<&mut Vec<TupleId>> {
        let nodes = self.nodes;
        match self.slot_mut(node, id, def.left_slot)? {
            Slot::ExistsLeft { matches, .. } => Ok(matches),
            other => Err(unexpected_slot(&nodes[node.0], "exists", other)),
        }
    }

    fn right_matches(
        &mut self,
        node: NodeId,
        def: &ExistsDef,
        id: TupleId,
    ) -> Result<&mut Vec<TupleId>> {
        let nodes = self.nodes;
        match self.slot_mut(node, id, def.right_slot)? {
            Slot::ExistsRight { matches, .. } => Ok(matches),
            other => Err(unexpected_slot(&nodes[node.0], "exists", other)),
        }
    }
}

fn is_open(def: &ExistsDef, count: usize) -> bool {
    (count > 0) == def.should_exist
}

fn remove_one(list: &mut Vec<TupleId>, id: TupleId) -> bool {
    match list.iter().position(|&t| t == id) {
        Some(i) => {
            list.swap_remove(i);
            true
        }
        None => false,
    }
}
