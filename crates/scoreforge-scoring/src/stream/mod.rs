//! Declarative constraint streams.
//!
//! A [`Stream`] is a tree describing how tuples are produced: start from the
//! facts of one class, then filter, join, gate, group, map, flatten or
//! concatenate. The
//! tree is plain data; [`Network::build`](crate::Network::build) compiles it
//! into nodes, and structurally equal sub-trees compile to the same node.
//! `distinct`, `expand`, `complement` and the `*_other` gates are written in
//! terms of the other operations.
//!
//! ```
//! use scoreforge_core::{Expr, HardSoftScore};
//! use scoreforge_scoring::joiner::equal;
//! use scoreforge_scoring::Stream;
//!
//! const SHIFT: usize = 0;
//! const EMPLOYEE: usize = 1;
//!
//! let overlapping = Stream::for_each(SHIFT)
//!     .join(Stream::for_each(SHIFT), [equal(Expr::field(0, EMPLOYEE), Expr::field(0, EMPLOYEE))])
//!     .filter(Expr::lt(Expr::element(0), Expr::element(1)))
//!     .penalize(HardSoftScore::ONE_HARD)
//!     .as_constraint("Shift conflict");
//!
//! assert_eq!(overlapping.stream.arity(), 2);
//! assert_eq!(overlapping.constraint_ref.name, "Shift conflict");
//! ```

pub mod collector;
pub mod joiner;


use std::fmt;
use std::sync::Arc;

use scoreforge_core::{ConstraintRef, Expr, ImpactType, Score};

use collector::Collector;
use joiner::{equal, filtering, Joiner};

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Stream {
    /// Facts of one class. Unless `include_unassigned` is set, facts with
    /// any planning variable still `None` are left out.
    ForEach {
        class: usize,
        include_unassigned: bool,
    },
    Filter {
        parent: Arc<Stream>,
        predicate: Expr,
    },
    Join {
        left: Arc<Stream>,
        right: Arc<Stream>,
        joiners: Vec<Joiner>,
    },
    /// Passes left tuples through while at least one right tuple matches
    /// (`should_exist`) or while none does.
    IfExists {
        left: Arc<Stream>,
        right: Arc<Stream>,
        joiners: Vec<Joiner>,
        should_exist: bool,
    },
    /// One tuple per distinct key row: keys followed by collector results.
    GroupBy {
        parent: Arc<Stream>,
        keys: Vec<Expr>,
        collectors: Vec<Collector>,
    },
    Map {
        parent: Arc<Stream>,
        mappings: Vec<Expr>,
    },
    /// One tuple per item of a list-valued expression: the parent row with
    /// the item appended.
    FlattenLast {
        parent: Arc<Stream>,
        collection: Expr,
    },
    /// Every tuple of both sides, duplicates kept. The shorter side is
    /// padded with `None` up to the longer side's arity.
    Concat {
        left: Arc<Stream>,
        right: Arc<Stream>,
    },
}

impl Stream {
    pub fn for_each(class: usize) -> Self {
        Stream::ForEach {
            class,
            include_unassigned: false,
        }
    }

    pub fn for_each_including_unassigned(class: usize) -> Self {
        Stream::ForEach {
            class,
            include_unassigned: true,
        }
    }

    pub fn filter(self, predicate: Expr) -> Self {
        Stream::Filter {
            parent: Arc::new(self),
            predicate,
        }
    }

    pub fn join(self, other: Stream, joiners: impl IntoIterator<Item = Joiner>) -> Self {
        Stream::Join {
            left: Arc::new(self),
            right: Arc::new(other),
            joiners: joiners.into_iter().collect(),
        }
    }

    pub fn if_exists(self, other: Stream, joiners: impl IntoIterator<Item = Joiner>) -> Self {
        self.gate(other, joiners, true)
    }

    pub fn if_not_exists(self, other: Stream, joiners: impl IntoIterator<Item = Joiner>) -> Self {
        self.gate(other, joiners, false)
    }

    fn gate(
        self,
        other: Stream,
        joiners: impl IntoIterator<Item = Joiner>,
        should_exist: bool,
    ) -> Self {
        Stream::IfExists {
            left: Arc::new(self),
            right: Arc::new(other),
            joiners: joiners.into_iter().collect(),
            should_exist,
        }
    }

    pub fn group_by(
        self,
        keys: impl IntoIterator<Item = Expr>,
        collectors: impl IntoIterator<Item = Collector>,
    ) -> Self {
        Stream::GroupBy {
            parent: Arc::new(self),
            keys: keys.into_iter().collect(),
            collectors: collectors.into_iter().collect(),
        }
    }

    pub fn map(self, mappings: impl IntoIterator<Item = Expr>) -> Self {
        Stream::Map {
            parent: Arc::new(self),
            mappings: mappings.into_iter().collect(),
        }
    }

    pub fn flatten_last(self, collection: Expr) -> Self {
        Stream::FlattenLast {
            parent: Arc::new(self),
            collection,
        }
    }

    pub fn concat(self, other: Stream) -> Self {
        Stream::Concat {
            left: Arc::new(self),
            right: Arc::new(other),
        }
    }

    /// One tuple per distinct row. Compiles to a group keyed on every
    /// element, so equal rows are counted, not repeated.
    pub fn distinct(self) -> Self {
        let arity = self.arity();
        self.group_by((0..arity).map(Expr::element), Vec::<Collector>::new())
    }

    /// Appends computed elements to every tuple.
    pub fn expand(self, extra: impl IntoIterator<Item = Expr>) -> Self {
        let arity = self.arity();
        self.map((0..arity).map(Expr::element).chain(extra))
    }

    /// Adds the facts of `class` that are not yet the first element of any
    /// tuple, padded with `None` up to this stream's arity.
    pub fn complement(self, class: usize) -> Self {
        let missing = Stream::for_each(class)
            .if_not_exists(self.clone(), [equal(Expr::element(0), Expr::element(0))]);
        self.concat(missing)
    }

    /// Like [`if_exists`](Stream::if_exists) against the facts of `class`,
    /// ignoring the fact that is this tuple's first element.
    pub fn if_exists_other(self, class: usize, joiners: impl IntoIterator<Item = Joiner>) -> Self {
        let joiners = self.other_than_first(joiners);
        self.gate(Stream::for_each(class), joiners, true)
    }

    pub fn if_not_exists_other(
        self,
        class: usize,
        joiners: impl IntoIterator<Item = Joiner>,
    ) -> Self {
        let joiners = self.other_than_first(joiners);
        self.gate(Stream::for_each(class), joiners, false)
    }

    fn other_than_first(&self, joiners: impl IntoIterator<Item = Joiner>) -> Vec<Joiner> {
        let mut joiners: Vec<Joiner> = joiners.into_iter().collect();
        let right = Expr::element(self.arity());
        joiners.push(filtering(Expr::ne(Expr::element(0), right)));
        joiners
    }

    pub fn penalize<Sc: Score>(self, weight: Sc) -> ConstraintBuilder<Sc> {
        ConstraintBuilder::new(self, ImpactType::Penalty, weight)
    }

    pub fn reward<Sc: Score>(self, weight: Sc) -> ConstraintBuilder<Sc> {
        ConstraintBuilder::new(self, ImpactType::Reward, weight)
    }

    /// Number of elements in the tuples this stream produces.
    pub fn arity(&self) -> usize {
        match self {
            Stream::ForEach { .. } => 1,
            Stream::Filter { parent, .. } => parent.arity(),
            Stream::Join { left, right, .. } => left.arity() + right.arity(),
            Stream::IfExists { left, .. } => left.arity(),
            Stream::GroupBy {
                keys, collectors, ..
            } => keys.len() + collectors.len(),
            Stream::Map { mappings, .. } => mappings.len(),
            Stream::FlattenLast { parent, .. } => parent.arity() + 1,
            Stream::Concat { left, right } => left.arity().max(right.arity()),
        }
    }
}

fn write_list<T: fmt::Display>(f: &mut fmt::Formatter<'_>, items: &[T]) -> fmt::Result {
    for (i, item) in items.iter().enumerate() {
        if i > 0 {
            f.write_str(", ")?;
        }
        write!(f, "{}", item)?;
    }
    Ok(())
}

impl fmt::Display for Stream {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Stream::ForEach {
                class,
                include_unassigned: false,
            } => write!(f, "forEach(class {})", class),
            Stream::ForEach { class, .. } => {
                write!(f, "forEachIncludingUnassigned(class {})", class)
            }
            Stream::Filter { parent, predicate } => write!(f, "{}.filter({})", parent, predicate),
            Stream::Join {
                left,
                right,
                joiners,
            } => {
                write!(f, "{}.join({}, [", left, right)?;
                write_list(f, joiners)?;
                f.write_str("])")
            }
            Stream::IfExists {
                left,
                right,
                joiners,
                should_exist,
            } => {
                let op = if *should_exist { "ifExists" } else { "ifNotExists" };
                write!(f, "{}.{}({}, [", left, op, right)?;
                write_list(f, joiners)?;
                f.write_str("])")
            }
            Stream::GroupBy {
                parent,
                keys,
                collectors,
            } => {
                write!(f, "{}.groupBy([", parent)?;
                write_list(f, keys)?;
                f.write_str("], [")?;
                write_list(f, collectors)?;
                f.write_str("])")
            }
            Stream::Map { parent, mappings } => {
                write!(f, "{}.map(", parent)?;
                write_list(f, mappings)?;
                f.write_str(")")
            }
            Stream::FlattenLast { parent, collection } => {
                write!(f, "{}.flattenLast({})", parent, collection)
            }
            Stream::Concat { left, right } => write!(f, "{}.concat({})", left, right),
        }
    }
}

/// A stream with its impact chosen, waiting for a name.
#[derive(Debug, Clone)]
pub struct ConstraintBuilder<Sc: Score> {
    stream: Stream,
    impact_type: ImpactType,
    weight: Sc,
    match_weight: Expr,
}

impl<Sc: Score> ConstraintBuilder<Sc> {
    fn new(stream: Stream, impact_type: ImpactType, weight: Sc) -> Self {
        Self {
            stream,
            impact_type,
            weight,
            match_weight: Expr::int(1),
        }
    }

    /// Integer multiplier of the constraint weight per match. Defaults to 1.
    pub fn with_match_weight(mut self, match_weight: Expr) -> Self {
        self.match_weight = match_weight;
        self
    }

    pub fn as_constraint(self, name: impl Into<String>) -> Constraint<Sc> {
        self.build(ConstraintRef::named(name))
    }

    pub fn as_constraint_in(
        self,
        package: impl Into<String>,
        name: impl Into<String>,
    ) -> Constraint<Sc> {
        self.build(ConstraintRef::new(package, name))
    }

    fn build(self, constraint_ref: ConstraintRef) -> Constraint<Sc> {
        Constraint {
            constraint_ref,
            stream: self.stream,
            impact_type: self.impact_type,
            weight: self.weight,
            match_weight: self.match_weight,
        }
    }
}

/// A named, weighted stream: the unit a network is built from.
#[derive(Debug, Clone)]
pub struct Constraint<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    pub stream: Stream,
    pub impact_type: ImpactType,
    pub weight: Sc,
    pub match_weight: Expr,
}
