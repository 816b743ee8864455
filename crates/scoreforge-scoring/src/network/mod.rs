//! Compiled constraint networks.
//!
//! A [`Network`] is the immutable node graph for one set of constraints. It
//! is built once, shared read-only (usually behind an `Arc`) and evaluated by
//! any number of [`Session`](crate::Session)s.

mod builder;

#[cfg(test)]
mod tests;

use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::sync::Arc;

use smallvec::SmallVec;

use scoreforge_core::{
    ConstraintRef, EvalContext, Expr, ExprError, ImpactType, Score, SolutionDescriptor, Value,
};

use crate::error::Result;
use crate::node::index::IndexKey;
use crate::stream::collector::Collector;
use crate::stream::joiner::Comparison;
use crate::stream::Constraint;

use builder::NetworkBuilder;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct NodeId(pub usize);

/// Input side of a two-parent node. Single-parent nodes use `Left`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub(crate) enum Side {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Child {
    pub node: NodeId,
    pub side: Side,
}

/// Range part of a join condition, used to order index buckets.
#[derive(Debug, Clone)]
pub(crate) enum RangeCondition {
    Compare {
        op: Comparison,
        left: Expr,
        right: Expr,
    },
    Overlap {
        left_start: Expr,
        left_end: Expr,
        right_start: Expr,
        right_end: Expr,
    },
}

/// Joiners of one join or exists node, split by how they are evaluated.
#[derive(Debug, Clone, Default)]
pub(crate) struct JoinCondition {
    pub equal_left: Vec<Expr>,
    pub equal_right: Vec<Expr>,
    pub range: Option<RangeCondition>,
    /// Everything the index cannot answer, over the combined row.
    pub residual: Option<Expr>,
}

impl JoinCondition {
    /// Index position of a tuple entering from `side`.
    pub fn key(
        &self,
        side: Side,
        ctx: &EvalContext<'_>,
    ) -> std::result::Result<IndexKey, ExprError> {
        let equal = match side {
            Side::Left => &self.equal_left,
            Side::Right => &self.equal_right,
        };
        let equal = equal
            .iter()
            .map(|e| e.eval(ctx))
            .collect::<std::result::Result<SmallVec<[Value; 2]>, _>>()?;
        let range = match (&self.range, side) {
            (None, _) => None,
            (Some(RangeCondition::Compare { left, .. }), Side::Left) => {
                Some((left.eval(ctx)?, None))
            }
            (Some(RangeCondition::Compare { right, .. }), Side::Right) => {
                Some((right.eval(ctx)?, None))
            }
            (
                Some(RangeCondition::Overlap {
                    left_start,
                    left_end,
                    ..
                }),
                Side::Left,
            ) => Some((left_start.eval(ctx)?, Some(left_end.eval(ctx)?))),
            (
                Some(RangeCondition::Overlap {
                    right_start,
                    right_end,
                    ..
                }),
                Side::Right,
            ) => Some((right_start.eval(ctx)?, Some(right_end.eval(ctx)?))),
        };
        Ok(IndexKey { equal, range })
    }
}

#[derive(Debug)]
pub(crate) struct JoinDef {
    pub condition: JoinCondition,
    pub left_slot: usize,
    pub right_slot: usize,
}

#[derive(Debug)]
pub(crate) struct ExistsDef {
    pub condition: JoinCondition,
    pub should_exist: bool,
    pub left_slot: usize,
    pub right_slot: usize,
}

#[derive(Debug)]
pub(crate) struct GroupDef {
    pub keys: Vec<Expr>,
    pub collectors: Vec<Collector>,
    pub slot: usize,
}

/// What a node does, with the store slot its input tuples reserve for it.
#[derive(Debug)]
pub(crate) enum NodeKind {
    ForEach { class: usize },
    Filter { predicate: Expr, slot: usize },
    Join(JoinDef),
    Exists(ExistsDef),
    Group(GroupDef),
    Map { mappings: Vec<Expr>, slot: usize },
    Flatten { collection: Expr, slot: usize },
    /// One slot per side, so a stream concatenated with itself keeps both
    /// copies apart.
    Concat { left_slot: usize, right_slot: usize },
    Scorer {
        constraint: usize,
        match_weight: Expr,
        slot: usize,
    },
}

impl NodeKind {
    pub fn tag(&self) -> NodeKindTag {
        match self {
            NodeKind::ForEach { .. } => NodeKindTag::ForEach,
            NodeKind::Filter { .. } => NodeKindTag::Filter,
            NodeKind::Join(_) => NodeKindTag::Join,
            NodeKind::Exists(_) => NodeKindTag::Exists,
            NodeKind::Group(_) => NodeKindTag::Group,
            NodeKind::Map { .. } => NodeKindTag::Map,
            NodeKind::Flatten { .. } => NodeKindTag::Flatten,
            NodeKind::Concat { .. } => NodeKindTag::Concat,
            NodeKind::Scorer { .. } => NodeKindTag::Scorer,
        }
    }

    /// Nodes that allocate their own output tuples. Filters and scorers
    /// work on the tuples of their parent.
    pub fn is_tuple_source(&self) -> bool {
        !matches!(self, NodeKind::Filter { .. } | NodeKind::Scorer { .. })
    }
}

#[derive(Debug)]
pub(crate) struct NodeDef {
    pub id: NodeId,
    pub kind: NodeKind,
    pub parents: SmallVec<[NodeId; 2]>,
    /// Longest path from a root.
    pub layer: usize,
    /// Arity of the tuples this node emits.
    pub arity: usize,
    pub children: Vec<Child>,
    /// Store size of the tuples this node allocates. Zero for pass-through
    /// nodes.
    pub store_size: usize,
    /// Names of the constraints this node serves, for diagnostics.
    pub constraints: Vec<String>,
}

impl NodeDef {
    pub fn label(&self) -> String {
        match self.kind {
            NodeKind::ForEach { class } => format!("ForEach(class {})#{}", class, self.id.0),
            _ => format!("{}#{}", self.kind.tag(), self.id.0),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum NodeKindTag {
    ForEach,
    Filter,
    Join,
    Exists,
    Group,
    Map,
    Flatten,
    Concat,
    Scorer,
}

impl fmt::Display for NodeKindTag {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            NodeKindTag::ForEach => "ForEach",
            NodeKindTag::Filter => "Filter",
            NodeKindTag::Join => "Join",
            NodeKindTag::Exists => "Exists",
            NodeKindTag::Group => "Group",
            NodeKindTag::Map => "Map",
            NodeKindTag::Flatten => "Flatten",
            NodeKindTag::Concat => "Concat",
            NodeKindTag::Scorer => "Scorer",
        };
        f.write_str(name)
    }
}

/// Shape of a built network.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NetworkStats {
    pub node_count: usize,
    /// Stream nodes that resolved to an already built node.
    pub shared_hits: usize,
    pub layer_count: usize,
    pub by_kind: BTreeMap<NodeKindTag, usize>,
}

impl NetworkStats {
    pub fn count(&self, tag: NodeKindTag) -> usize {
        self.by_kind.get(&tag).copied().unwrap_or(0)
    }
}

/// Fields each class's tuples are read through, used to drop updates no
/// node can observe.
#[derive(Debug, Clone, Default)]
pub(crate) struct ObservedFields {
    pub per_class: Vec<BTreeSet<usize>>,
    /// Some field read could not be traced to a class.
    pub untraced: bool,
    /// Some expression reads a field of a fact reached through another
    /// fact's field.
    pub through_references: bool,
}

impl ObservedFields {
    pub fn is_relevant(&self, class: usize, changed: &[usize]) -> bool {
        if changed.is_empty() || self.untraced {
            return true;
        }
        match self.per_class.get(class) {
            Some(fields) => changed.iter().any(|f| fields.contains(f)),
            None => false,
        }
    }
}

#[derive(Debug)]
pub(crate) struct ConstraintDef<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    pub impact_type: ImpactType,
    pub weight: Sc,
}

/// An immutable, topologically layered node graph.
///
/// ```
/// use std::sync::Arc;
/// use scoreforge_core::{Expr, FactClassDescriptor, FieldDescriptor, FieldType, SimpleScore,
///     SolutionDescriptor};
/// use scoreforge_scoring::{Network, NodeKindTag, Stream};
///
/// let mut descriptor = SolutionDescriptor::new("Plan");
/// let task = descriptor
///     .add_class(FactClassDescriptor::new("Task").with_field(FieldDescriptor::new("size", FieldType::Int)))
///     .unwrap();
///
/// let big = Stream::for_each(task).filter(Expr::gt(Expr::field(0, 0), Expr::int(5)));
/// let network = Network::build(
///     Arc::new(descriptor),
///     [
///         big.clone().penalize(SimpleScore::ONE).as_constraint("Big task"),
///         big.reward(SimpleScore::ONE).as_constraint("Big task bonus"),
///     ],
/// )
/// .unwrap();
///
/// assert_eq!(network.stats().count(NodeKindTag::Filter), 1);
/// assert_eq!(network.stats().count(NodeKindTag::Scorer), 2);
/// ```
#[derive(Debug)]
pub struct Network<Sc: Score> {
    descriptor: Arc<SolutionDescriptor>,
    nodes: Vec<NodeDef>,
    /// Tuple sources per layer, in creation order.
    layers: Vec<Vec<NodeId>>,
    /// ForEach root per class, if any constraint reads the class.
    roots: Vec<Option<NodeId>>,
    constraints: Vec<ConstraintDef<Sc>>,
    observed: ObservedFields,
    stats: NetworkStats,
}

impl<Sc: Score> Network<Sc> {
    /// Compiles constraints into a network, sharing structurally equal
    /// sub-streams.
    pub fn build(
        descriptor: Arc<SolutionDescriptor>,
        constraints: impl IntoIterator<Item = Constraint<Sc>>,
    ) -> Result<Self> {
        let mut builder = NetworkBuilder::new(&descriptor);
        let mut defs = Vec::new();
        for constraint in constraints {
            defs.push(builder.add_constraint(constraint, defs.len())?);
        }
        let built = builder.finish();
        tracing::debug!(
            event = "network_built",
            nodes = built.stats.node_count,
            shared = built.stats.shared_hits,
            layers = built.stats.layer_count,
            constraints = defs.len(),
        );
        Ok(Network {
            descriptor,
            nodes: built.nodes,
            layers: built.layers,
            roots: built.roots,
            constraints: defs,
            observed: built.observed,
            stats: built.stats,
        })
    }

    pub fn descriptor(&self) -> &Arc<SolutionDescriptor> {
        &self.descriptor
    }

    pub fn stats(&self) -> &NetworkStats {
        &self.stats
    }

    pub fn constraint_refs(&self) -> impl Iterator<Item = &ConstraintRef> {
        self.constraints.iter().map(|c| &c.constraint_ref)
    }

    pub fn constraint_count(&self) -> usize {
        self.constraints.len()
    }

    /// Whether changing `field` of a `class` fact can affect the score.
    pub fn observes(&self, class: usize, field: usize) -> bool {
        self.observed.is_relevant(class, &[field])
    }

    /// Index of a constraint by name or full name.
    pub fn constraint_index(&self, name: &str) -> Option<usize> {
        self.constraints
            .iter()
            .position(|c| c.constraint_ref.name == name || c.constraint_ref.full_name() == name)
    }

    pub(crate) fn nodes(&self) -> &[NodeDef] {
        &self.nodes
    }

    pub(crate) fn layers(&self) -> &[Vec<NodeId>] {
        &self.layers
    }

    pub(crate) fn root(&self, class: usize) -> Option<NodeId> {
        self.roots.get(class).copied().flatten()
    }

    pub(crate) fn constraints(&self) -> &[ConstraintDef<Sc>] {
        &self.constraints
    }

    pub(crate) fn observed(&self) -> &ObservedFields {
        &self.observed
    }
}
