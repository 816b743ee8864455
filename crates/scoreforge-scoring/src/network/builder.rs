//! Stream-to-node compilation with node sharing.

use std::collections::{BTreeSet, HashMap};

use smallvec::{smallvec, SmallVec};

use scoreforge_core::{Expr, Score, SolutionDescriptor};

use super::{
    Child, ConstraintDef, ExistsDef, GroupDef, JoinCondition, JoinDef, NetworkStats, NodeDef,
    NodeId, NodeKind, ObservedFields, RangeCondition, Side,
};
use crate::error::{EngineError, Result};
use crate::stream::collector::Collector;
use crate::stream::joiner::Joiner;
use crate::stream::{Constraint, Stream};

/// Class each tuple element was read from, when it is a fact of a known
/// class.
type Origins = Vec<Option<usize>>;

/// Identity of a shareable node: its kind, its parents and its parameters.
/// Children are deliberately not part of it.
#[derive(Debug, PartialEq, Eq, Hash)]
enum NodeKey {
    ForEach(usize),
    Filter(NodeId, Expr),
    Join(NodeId, NodeId, Vec<Joiner>),
    Exists(NodeId, NodeId, Vec<Joiner>, bool),
    Group(NodeId, Vec<Expr>, Vec<Collector>),
    Map(NodeId, Vec<Expr>),
    Flatten(NodeId, Expr),
    Concat(NodeId, NodeId),
}

pub(super) struct Built {
    pub nodes: Vec<NodeDef>,
    pub layers: Vec<Vec<NodeId>>,
    pub roots: Vec<Option<NodeId>>,
    pub observed: ObservedFields,
    pub stats: NetworkStats,
}

pub(super) struct NetworkBuilder<'d> {
    descriptor: &'d SolutionDescriptor,
    nodes: Vec<NodeDef>,
    origins: Vec<Origins>,
    /// Node whose tuples flow out of each node.
    source: Vec<NodeId>,
    shared: HashMap<NodeKey, NodeId>,
    roots: Vec<Option<NodeId>>,
    observed: ObservedFields,
    shared_hits: usize,
    names: BTreeSet<String>,
}

fn definition(stream: &Stream, reason: impl Into<String>) -> EngineError {
    EngineError::Definition {
        stream: stream.to_string(),
        reason: reason.into(),
    }
}

impl<'d> NetworkBuilder<'d> {
    pub fn new(descriptor: &'d SolutionDescriptor) -> Self {
        let classes = descriptor.classes().len();
        Self {
            descriptor,
            nodes: Vec::new(),
            origins: Vec::new(),
            source: Vec::new(),
            shared: HashMap::new(),
            roots: vec![None; classes],
            observed: ObservedFields {
                per_class: vec![BTreeSet::new(); classes],
                untraced: false,
                through_references: false,
            },
            shared_hits: 0,
            names: BTreeSet::new(),
        }
    }

    pub fn add_constraint<Sc: Score>(
        &mut self,
        constraint: Constraint<Sc>,
        index: usize,
    ) -> Result<ConstraintDef<Sc>> {
        let name = constraint.constraint_ref.full_name();
        if !self.names.insert(name.clone()) {
            return Err(definition(
                &constraint.stream,
                format!("duplicate constraint name {}", name),
            ));
        }

        let tip = self.add_stream(&constraint.stream, &name)?;
        let origins = self.origins[tip.0].clone();
        self.use_expr(&constraint.match_weight, &origins, &constraint.stream)?;
        let slot = self.reserve(tip);
        self.push_node(
            NodeKind::Scorer {
                constraint: index,
                match_weight: constraint.match_weight,
                slot,
            },
            smallvec![tip],
            origins,
            &name,
        );

        Ok(ConstraintDef {
            constraint_ref: constraint.constraint_ref,
            impact_type: constraint.impact_type,
            weight: constraint.weight,
        })
    }

    fn add_stream(&mut self, stream: &Stream, name: &str) -> Result<NodeId> {
        match stream {
            Stream::ForEach {
                class,
                include_unassigned,
            } => {
                let descriptor = self.descriptor;
                let class_desc = descriptor
                    .class(*class)
                    .ok_or_else(|| definition(stream, format!("unknown class index {}", class)))?;
                let root = match self.lookup_shared(&NodeKey::ForEach(*class), name) {
                    Some(id) => id,
                    None => {
                        let id = self.push_node(
                            NodeKind::ForEach { class: *class },
                            SmallVec::new(),
                            vec![Some(*class)],
                            name,
                        );
                        self.shared.insert(NodeKey::ForEach(*class), id);
                        self.roots[*class] = Some(id);
                        id
                    }
                };
                let variables: Vec<usize> = class_desc.planning_variables().collect();
                if *include_unassigned || variables.is_empty() {
                    return Ok(root);
                }
                let assigned =
                    Expr::all(variables.into_iter().map(|v| Expr::is_not_none(Expr::field(0, v))));
                self.filter(root, assigned, stream, name)
            }
            Stream::Filter { parent, predicate } => {
                let parent = self.add_stream(parent, name)?;
                self.filter(parent, predicate.clone(), stream, name)
            }
            Stream::Join {
                left,
                right,
                joiners,
            } => {
                let left = self.add_stream(left, name)?;
                let right = self.add_stream(right, name)?;
                let condition = self.join_condition(joiners, left, right, stream)?;
                let key = NodeKey::Join(left, right, joiners.clone());
                if let Some(id) = self.lookup_shared(&key, name) {
                    return Ok(id);
                }
                let left_slot = self.reserve(left);
                let right_slot = self.reserve(right);
                let mut origins = self.origins[left.0].clone();
                origins.extend(self.origins[right.0].iter().copied());
                let id = self.push_node(
                    NodeKind::Join(JoinDef {
                        condition,
                        left_slot,
                        right_slot,
                    }),
                    smallvec![left, right],
                    origins,
                    name,
                );
                self.shared.insert(key, id);
                Ok(id)
            }
            Stream::IfExists {
                left,
                right,
                joiners,
                should_exist,
            } => {
                let left = self.add_stream(left, name)?;
                let right = self.add_stream(right, name)?;
                let condition = self.join_condition(joiners, left, right, stream)?;
                let key = NodeKey::Exists(left, right, joiners.clone(), *should_exist);
                if let Some(id) = self.lookup_shared(&key, name) {
                    return Ok(id);
                }
                let left_slot = self.reserve(left);
                let right_slot = self.reserve(right);
                let origins = self.origins[left.0].clone();
                let id = self.push_node(
                    NodeKind::Exists(ExistsDef {
                        condition,
                        should_exist: *should_exist,
                        left_slot,
                        right_slot,
                    }),
                    smallvec![left, right],
                    origins,
                    name,
                );
                self.shared.insert(key, id);
                Ok(id)
            }
            Stream::GroupBy {
                parent,
                keys,
                collectors,
            } => {
                if keys.is_empty() && collectors.is_empty() {
                    return Err(definition(stream, "groupBy needs a key or a collector"));
                }
                let parent = self.add_stream(parent, name)?;
                let input = self.origins[parent.0].clone();
                for expr in keys.iter().chain(collectors.iter().filter_map(Collector::input)) {
                    self.use_expr(expr, &input, stream)?;
                }
                let key = NodeKey::Group(parent, keys.clone(), collectors.clone());
                if let Some(id) = self.lookup_shared(&key, name) {
                    return Ok(id);
                }
                let slot = self.reserve(parent);
                let mut origins = derived_origins(keys, &input);
                origins.extend(std::iter::repeat(None).take(collectors.len()));
                let id = self.push_node(
                    NodeKind::Group(GroupDef {
                        keys: keys.clone(),
                        collectors: collectors.clone(),
                        slot,
                    }),
                    smallvec![parent],
                    origins,
                    name,
                );
                self.shared.insert(key, id);
                Ok(id)
            }
            Stream::Map { parent, mappings } => {
                if mappings.is_empty() {
                    return Err(definition(stream, "map needs at least one mapping"));
                }
                let parent = self.add_stream(parent, name)?;
                let input = self.origins[parent.0].clone();
                for expr in mappings {
                    self.use_expr(expr, &input, stream)?;
                }
                let key = NodeKey::Map(parent, mappings.clone());
                if let Some(id) = self.lookup_shared(&key, name) {
                    return Ok(id);
                }
                let slot = self.reserve(parent);
                let id = self.push_node(
                    NodeKind::Map {
                        mappings: mappings.clone(),
                        slot,
                    },
                    smallvec![parent],
                    derived_origins(mappings, &input),
                    name,
                );
                self.shared.insert(key, id);
                Ok(id)
            }
            Stream::Concat { left, right } => {
                let left = self.add_stream(left, name)?;
                let right = self.add_stream(right, name)?;
                let key = NodeKey::Concat(left, right);
                if let Some(id) = self.lookup_shared(&key, name) {
                    return Ok(id);
                }
                let left_slot = self.reserve(left);
                let right_slot = self.reserve(right);
                let origins = merged_origins(&self.origins[left.0], &self.origins[right.0]);
                let id = self.push_node(
                    NodeKind::Concat {
                        left_slot,
                        right_slot,
                    },
                    smallvec![left, right],
                    origins,
                    name,
                );
                self.shared.insert(key, id);
                Ok(id)
            }
            Stream::FlattenLast { parent, collection } => {
                let parent = self.add_stream(parent, name)?;
                let mut origins = self.origins[parent.0].clone();
                self.use_expr(collection, &origins, stream)?;
                let key = NodeKey::Flatten(parent, collection.clone());
                if let Some(id) = self.lookup_shared(&key, name) {
                    return Ok(id);
                }
                let slot = self.reserve(parent);
                origins.push(None);
                let id = self.push_node(
                    NodeKind::Flatten {
                        collection: collection.clone(),
                        slot,
                    },
                    smallvec![parent],
                    origins,
                    name,
                );
                self.shared.insert(key, id);
                Ok(id)
            }
        }
    }

    fn filter(
        &mut self,
        parent: NodeId,
        predicate: Expr,
        stream: &Stream,
        name: &str,
    ) -> Result<NodeId> {
        let origins = self.origins[parent.0].clone();
        self.use_expr(&predicate, &origins, stream)?;
        let key = NodeKey::Filter(parent, predicate.clone());
        if let Some(id) = self.lookup_shared(&key, name) {
            return Ok(id);
        }
        let slot = self.reserve(parent);
        let id = self.push_node(
            NodeKind::Filter { predicate, slot },
            smallvec![parent],
            origins,
            name,
        );
        self.shared.insert(key, id);
        Ok(id)
    }

    fn join_condition(
        &mut self,
        joiners: &[Joiner],
        left: NodeId,
        right: NodeId,
        stream: &Stream,
    ) -> Result<JoinCondition> {
        let left_origins = self.origins[left.0].clone();
        let right_origins = self.origins[right.0].clone();
        let left_arity = left_origins.len();
        let mut combined = left_origins.clone();
        combined.extend(right_origins.iter().copied());
        let shift = |e: &Expr| e.map_elements(&|i| i + left_arity);

        let mut condition = JoinCondition::default();
        let mut residual = Vec::new();
        for joiner in joiners {
            match joiner {
                Joiner::Equal { left, right } => {
                    self.use_expr(left, &left_origins, stream)?;
                    self.use_expr(right, &right_origins, stream)?;
                    condition.equal_left.push(left.clone());
                    condition.equal_right.push(right.clone());
                }
                Joiner::Compare { op, left, right } => {
                    self.use_expr(left, &left_origins, stream)?;
                    self.use_expr(right, &right_origins, stream)?;
                    if condition.range.is_none() {
                        condition.range = Some(RangeCondition::Compare {
                            op: *op,
                            left: left.clone(),
                            right: right.clone(),
                        });
                    } else {
                        residual.push(op.to_expr(left.clone(), shift(right)));
                    }
                }
                Joiner::Overlapping {
                    left_start,
                    left_end,
                    right_start,
                    right_end,
                } => {
                    for e in [left_start, left_end] {
                        self.use_expr(e, &left_origins, stream)?;
                    }
                    for e in [right_start, right_end] {
                        self.use_expr(e, &right_origins, stream)?;
                    }
                    if condition.range.is_none() {
                        condition.range = Some(RangeCondition::Overlap {
                            left_start: left_start.clone(),
                            left_end: left_end.clone(),
                            right_start: right_start.clone(),
                            right_end: right_end.clone(),
                        });
                    } else {
                        residual.push(Expr::and(
                            Expr::lt(left_start.clone(), shift(right_end)),
                            Expr::lt(shift(right_start), left_end.clone()),
                        ));
                    }
                }
                Joiner::Filtering(predicate) => {
                    self.use_expr(predicate, &combined, stream)?;
                    residual.push(predicate.clone());
                }
            }
        }
        if !residual.is_empty() {
            condition.residual = Some(Expr::all(residual));
        }
        Ok(condition)
    }

    /// Checks an expression against the input it will be evaluated on and
    /// records the fields it observes.
    fn use_expr(&mut self, expr: &Expr, origins: &[Option<usize>], stream: &Stream) -> Result<()> {
        let needed = expr.required_arity();
        if needed > origins.len() {
            return Err(definition(
                stream,
                format!(
                    "{} reads element {} of a tuple of arity {}",
                    expr,
                    needed - 1,
                    origins.len()
                ),
            ));
        }
        let mut fault = None;
        expr.walk(&mut |e| match e {
            Expr::Field { element, field } => match origins[*element] {
                Some(class) => {
                    let count = self.descriptor.class(class).map_or(0, |c| c.field_count());
                    if *field >= count {
                        fault.get_or_insert(format!(
                            "{} reads field {} of a class with {} field(s)",
                            expr, field, count
                        ));
                    }
                    self.observed.per_class[class].insert(*field);
                }
                None => self.observed.untraced = true,
            },
            Expr::RefField { .. } => {
                self.observed.untraced = true;
                self.observed.through_references = true;
            }
            _ => {}
        });
        match fault {
            Some(reason) => Err(definition(stream, reason)),
            None => Ok(()),
        }
    }

    /// Looks up a shareable node, counting the hit and recording the
    /// constraint on it.
    fn lookup_shared(&mut self, key: &NodeKey, name: &str) -> Option<NodeId> {
        let id = *self.shared.get(key)?;
        self.shared_hits += 1;
        let constraints = &mut self.nodes[id.0].constraints;
        if !constraints.iter().any(|c| c == name) {
            constraints.push(name.to_string());
        }
        Some(id)
    }

    /// Reserves a store slot for a new consumer of `parent`'s tuples.
    fn reserve(&mut self, parent: NodeId) -> usize {
        let source = &mut self.nodes[self.source[parent.0].0];
        let slot = source.store_size;
        source.store_size += 1;
        slot
    }

    fn push_node(
        &mut self,
        kind: NodeKind,
        parents: SmallVec<[NodeId; 2]>,
        origins: Origins,
        name: &str,
    ) -> NodeId {
        let id = NodeId(self.nodes.len());
        let layer = parents
            .iter()
            .map(|p| self.nodes[p.0].layer + 1)
            .max()
            .unwrap_or(0);
        for (i, parent) in parents.iter().enumerate() {
            let side = if i == 0 { Side::Left } else { Side::Right };
            self.nodes[parent.0].children.push(Child { node: id, side });
        }
        let source = if kind.is_tuple_source() {
            id
        } else {
            self.source[parents[0].0]
        };
        self.nodes.push(NodeDef {
            id,
            kind,
            parents,
            layer,
            arity: origins.len(),
            children: Vec::new(),
            store_size: 0,
            constraints: vec![name.to_string()],
        });
        self.origins.push(origins);
        self.source.push(source);
        id
    }

    pub fn finish(self) -> Built {
        let layer_count = self.nodes.iter().map(|n| n.layer + 1).max().unwrap_or(0);
        let mut layers = vec![Vec::new(); layer_count];
        let mut stats = NetworkStats {
            node_count: self.nodes.len(),
            shared_hits: self.shared_hits,
            layer_count,
            ..NetworkStats::default()
        };
        for node in &self.nodes {
            debug_assert!(node.parents.iter().all(|p| self.nodes[p.0].layer < node.layer));
            *stats.by_kind.entry(node.kind.tag()).or_insert(0) += 1;
            if node.kind.is_tuple_source() {
                layers[node.layer].push(node.id);
            }
        }
        Built {
            nodes: self.nodes,
            layers,
            roots: self.roots,
            observed: self.observed,
            stats,
        }
    }
}

/// Origins of computed elements: a bare element reference keeps its
/// origin, anything else is untraced.
fn derived_origins(exprs: &[Expr], input: &[Option<usize>]) -> Origins {
    exprs
        .iter()
        .map(|e| match e {
            Expr::Element(i) => input.get(*i).copied().flatten(),
            _ => None,
        })
        .collect()
}

/// Origins of a concatenation: an element keeps its class only when both
/// sides agree on it. Padding is untraced.
fn merged_origins(left: &[Option<usize>], right: &[Option<usize>]) -> Origins {
    (0..left.len().max(right.len()))
        .map(|i| match (left.get(i), right.get(i)) {
            (Some(l), Some(r)) if l == r => *l,
            _ => None,
        })
        .collect()
}
