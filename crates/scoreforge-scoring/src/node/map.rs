//! Map, flatten and concat: derived tuples computed from each input tuple.

use scoreforge_core::{Expr, ExprError, Value};

use super::{same_row, unexpected_slot, Propagator};
use crate::error::Result;
use crate::network::NodeId;
use crate::tuple::{Row, Slot, TupleId};

impl Propagator<'_> {
    pub(super) fn map_insert(
        &mut self,
        node: NodeId,
        mappings: &[Expr],
        slot: usize,
        id: TupleId,
    ) -> Result<()> {
        let values = self.mapped_row(node, mappings, id)?;
        let out = self.create(node, values);
        self.set_slot(node, id, slot, Slot::Mapped(out))
    }

    /// Maps produce exactly one output per input, so an update rewrites the
    /// output in place and keeps its downstream state.
    pub(super) fn map_update(
        &mut self,
        node: NodeId,
        mappings: &[Expr],
        slot: usize,
        id: TupleId,
    ) -> Result<()> {
        let out = match self.slot(node, id, slot)? {
            Slot::Mapped(out) => *out,
            other => return Err(unexpected_slot(&self.nodes[node.0], "map", other)),
        };
        let values = self.mapped_row(node, mappings, id)?;
        if same_row(self.values(out)?, &values) {
            return Ok(());
        }
        self.set_values(out, values)?;
        self.mark_updated(node, out)
    }

    pub(super) fn retract_mapped(&mut self, node: NodeId, slot: usize, id: TupleId) -> Result<()> {
        match self.take_slot(node, id, slot)? {
            Slot::Mapped(out) => self.mark_retracted(node, out),
            other => Err(unexpected_slot(&self.nodes[node.0], "map", &other)),
        }
    }

    fn mapped_row(&self, node: NodeId, mappings: &[Expr], id: TupleId) -> Result<Row> {
        self.evaluate_tuple(node, id, |ctx| {
            mappings
                .iter()
                .map(|m| m.eval(ctx))
                .collect::<std::result::Result<Row, _>>()
        })
    }

    pub(super) fn concat_insert(&mut self, node: NodeId, slot: usize, id: TupleId) -> Result<()> {
        let values = self.padded_row(node, id)?;
        let out = self.create(node, values);
        self.set_slot(node, id, slot, Slot::Mapped(out))
    }

    pub(super) fn concat_update(&mut self, node: NodeId, slot: usize, id: TupleId) -> Result<()> {
        let out = match self.slot(node, id, slot)? {
            Slot::Mapped(out) => *out,
            other => return Err(unexpected_slot(&self.nodes[node.0], "concat", other)),
        };
        let values = self.padded_row(node, id)?;
        if same_row(self.values(out)?, &values) {
            return Ok(());
        }
        self.set_values(out, values)?;
        self.mark_updated(node, out)
    }

    /// The input row, padded with `None` to the node's arity.
    fn padded_row(&self, node: NodeId, id: TupleId) -> Result<Row> {
        let mut values = self.values(id)?.clone();
        values.resize(self.nodes[node.0].arity, Value::None);
        Ok(values)
    }

    pub(super) fn flatten_insert(
        &mut self,
        node: NodeId,
        collection: &Expr,
        slot: usize,
        id: TupleId,
    ) -> Result<()> {
        let items = self.items(node, collection, id)?;
        let prefix = self.values(id)?.clone();
        let outputs = items
            .into_iter()
            .map(|item| {
                let mut values = prefix.clone();
                values.push(item);
                self.create(node, values)
            })
            .collect();
        self.set_slot(node, id, slot, Slot::Flattened(outputs))
    }

    /// Same items in the same order update the outputs in place; anything
    /// else replaces the whole output set.
    pub(super) fn flatten_update(
        &mut self,
        node: NodeId,
        collection: &Expr,
        slot: usize,
        id: TupleId,
    ) -> Result<()> {
        let items = self.items(node, collection, id)?;
        let outputs = match self.slot(node, id, slot)? {
            Slot::Flattened(outputs) => outputs.clone(),
            other => return Err(unexpected_slot(&self.nodes[node.0], "flatten", other)),
        };
        let mut unchanged = outputs.len() == items.len();
        for (out, item) in outputs.iter().zip(&items) {
            unchanged = unchanged && self.values(*out)?.last() == Some(item);
        }
        if !unchanged {
            self.flatten_retract(node, slot, id)?;
            return self.flatten_insert(node, collection, slot, id);
        }
        let prefix = self.values(id)?.clone();
        for (out, item) in outputs.into_iter().zip(items) {
            let mut values = prefix.clone();
            values.push(item);
            self.set_values(out, values)?;
            self.mark_updated(node, out)?;
        }
        Ok(())
    }

    pub(super) fn flatten_retract(&mut self, node: NodeId, slot: usize, id: TupleId) -> Result<()> {
        match self.take_slot(node, id, slot)? {
            Slot::Flattened(outputs) => {
                for out in outputs {
                    self.mark_retracted(node, out)?;
                }
                Ok(())
            }
            other => Err(unexpected_slot(&self.nodes[node.0], "flatten", &other)),
        }
    }

    /// Items of a list-valued expression. `None` flattens to nothing.
    fn items(&self, node: NodeId, collection: &Expr, id: TupleId) -> Result<Vec<Value>> {
        self.evaluate_tuple(node, id, |ctx| match collection.eval(ctx)? {
            Value::List(items) => Ok(items.to_vec()),
            Value::None => Ok(Vec::new()),
            other => Err(ExprError::TypeMismatch {
                op: "flatten_last",
                found: other.kind().to_string(),
            }),
        })
    }
}
