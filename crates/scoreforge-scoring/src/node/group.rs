//! Group: folds tuples into one output tuple per distinct key.
//!
//! An input tuple keeps its key and the values it contributed to each
//! collector in its slot. Retracting replays exactly those values, so a
//! later change to the underlying facts cannot skew the accumulators.

use std::collections::HashMap;

use scoreforge_core::{ExprError, Value};

use super::{evaluation_error, same_row, unexpected_slot, Propagator, StateKind};
use crate::error::{EngineError, Result};
use crate::network::{GroupDef, NodeId};
use crate::stream::collector::{Accumulator, Collector, GroupAccumulator};
use crate::tuple::{Row, Slot, TupleId};

pub(crate) struct GroupEntry {
    output: TupleId,
    size: usize,
    accumulators: Vec<GroupAccumulator>,
}

impl Propagator<'_> {
    pub(super) fn group_insert(&mut self, node: NodeId, def: &GroupDef, id: TupleId) -> Result<()> {
        let (key, contributions) = self.group_inputs(node, def, id)?;
        self.fold_in(node, def, id, &key, &contributions)?;
        self.set_slot(node, id, def.slot, Slot::Grouped { key, contributions })
    }

    pub(super) fn group_retract(
        &mut self,
        node: NodeId,
        def: &GroupDef,
        id: TupleId,
    ) -> Result<()> {
        let (key, contributions) = self.take_grouped(node, def, id)?;
        self.fold_out(node, &key, &contributions)
    }

    pub(super) fn group_update(&mut self, node: NodeId, def: &GroupDef, id: TupleId) -> Result<()> {
        let (key, contributions) = self.group_inputs(node, def, id)?;
        let (old_key, old_contributions) = self.take_grouped(node, def, id)?;
        if old_key == key {
            let input = self.values(id)?.clone();
            let output = {
                let nodes = self.nodes;
                let solution = self.solution;
                let entry = self.group_entry(node, &key)?;
                for ((acc, old), new) in entry
                    .accumulators
                    .iter_mut()
                    .zip(&old_contributions)
                    .zip(&contributions)
                {
                    if !acc.retract(old) {
                        return Err(rejected_retract(nodes[node.0].label(), old));
                    }
                    acc.accumulate(new).map_err(|source| {
                        evaluation_error(&nodes[node.0], solution, &input, source)
                    })?;
                }
                entry.output
            };
            self.mark_updated(node, output)?;
        } else {
            self.fold_out(node, &old_key, &old_contributions)?;
            self.fold_in(node, def, id, &key, &contributions)?;
        }
        self.set_slot(node, id, def.slot, Slot::Grouped { key, contributions })
    }

    /// Recomputes a group output's collector results. Returns whether the
    /// row changed.
    pub(super) fn group_refresh(
        &mut self,
        node: NodeId,
        def: &GroupDef,
        out: TupleId,
    ) -> Result<bool> {
        let old = self.values(out)?.clone();
        let key_len = def.keys.len();
        let results = {
            let entry = self.group_entry(node, &old[..key_len])?;
            entry
                .accumulators
                .iter()
                .map(Accumulator::finish)
                .collect::<std::result::Result<Vec<Value>, ExprError>>()
        };
        let results = results
            .map_err(|source| evaluation_error(&self.nodes[node.0], self.solution, &old, source))?;
        let mut values: Row = old[..key_len].iter().cloned().collect();
        values.extend(results);
        let changed = !same_row(&old, &values);
        self.set_values(out, values)?;
        Ok(changed)
    }

    fn group_inputs(&self, node: NodeId, def: &GroupDef, id: TupleId) -> Result<(Row, Row)> {
        self.evaluate_tuple(node, id, |ctx| {
            let key = def
                .keys
                .iter()
                .map(|k| k.eval(ctx))
                .collect::<std::result::Result<Row, _>>()?;
            let contributions = def
                .collectors
                .iter()
                .map(|c| c.input().map_or(Ok(Value::None), |e| e.eval(ctx)))
                .collect::<std::result::Result<Row, _>>()?;
            Ok((key, contributions))
        })
    }

    fn take_grouped(&mut self, node: NodeId, def: &GroupDef, id: TupleId) -> Result<(Row, Row)> {
        match self.take_slot(node, id, def.slot)? {
            Slot::Grouped { key, contributions } => Ok((key, contributions)),
            other => Err(unexpected_slot(&self.nodes[node.0], "group", &other)),
        }
    }

    fn fold_in(
        &mut self,
        node: NodeId,
        def: &GroupDef,
        id: TupleId,
        key: &Row,
        contributions: &Row,
    ) -> Result<()> {
        let fresh = !self.groups(node)?.contains_key(key.as_slice());
        if fresh {
            let mut values = key.clone();
            values.extend(std::iter::repeat(Value::None).take(def.collectors.len()));
            let output = self.create(node, values);
            let accumulators = def.collectors.iter().map(Collector::create_accumulator).collect();
            self.groups(node)?.insert(
                key.clone(),
                GroupEntry {
                    output,
                    size: 0,
                    accumulators,
                },
            );
        }

        let input = self.values(id)?.clone();
        let output = {
            let nodes = self.nodes;
            let solution = self.solution;
            let entry = self.group_entry(node, key)?;
            for (acc, value) in entry.accumulators.iter_mut().zip(contributions) {
                acc.accumulate(value).map_err(|source| {
                    evaluation_error(&nodes[node.0], solution, &input, source)
                })?;
            }
            entry.size += 1;
            entry.output
        };
        if !fresh {
            self.mark_updated(node, output)?;
        }
        Ok(())
    }

    fn fold_out(&mut self, node: NodeId, key: &[Value], contributions: &[Value]) -> Result<()> {
        let nodes = self.nodes;
        let (output, emptied) = {
            let groups = self.groups(node)?;
            let entry = groups
                .get_mut(key)
                .ok_or_else(|| missing_group(nodes[node.0].label()))?;
            for (acc, value) in entry.accumulators.iter_mut().zip(contributions) {
                if !acc.retract(value) {
                    return Err(rejected_retract(nodes[node.0].label(), value));
                }
            }
            entry.size -= 1;
            let output = entry.output;
            let emptied = entry.size == 0;
            if emptied {
                groups.remove(key);
            }
            (output, emptied)
        };
        if emptied {
            self.mark_retracted(node, output)
        } else {
            self.mark_updated(node, output)
        }
    }

    fn groups(&mut self, node: NodeId) -> Result<&mut HashMap<Row, GroupEntry>> {
        let nodes = self.nodes;
        match &mut self.states[node.0].kind {
            StateKind::Group(groups) => Ok(groups),
            _ => Err(EngineError::internal(nodes[node.0].label(), "node has no groups")),
        }
    }

    fn group_entry(&mut self, node: NodeId, key: &[Value]) -> Result<&mut GroupEntry> {
        let nodes = self.nodes;
        self.groups(node)?
            .get_mut(key)
            .ok_or_else(|| missing_group(nodes[node.0].label()))
    }
}

fn missing_group(node: String) -> EngineError {
    EngineError::internal(node, "tuple refers to a group that does not exist")
}

fn rejected_retract(node: String, value: &Value) -> EngineError {
    EngineError::internal(node, format!("accumulator rejected the retract of {}", value))
}
