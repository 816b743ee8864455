//! Tuples: the rows that flow between nodes.
//!
//! A tuple carries its values, a lifecycle state and a store of slots. Slot
//! indices are fixed when the network is built; each consuming node owns one
//! slot per input side and keeps there whatever it needs to undo or revisit
//! the tuple in O(1).

mod arena;


use smallvec::SmallVec;

use scoreforge_core::Value;

use crate::node::index::IndexKey;

pub(crate) use arena::TupleArena;

/// Values of one tuple. Most constraints use arity four or less.
pub(crate) type Row = SmallVec<[Value; 4]>;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub(crate) struct TupleId {
    index: u32,
    generation: u32,
}

/// Lifecycle of a tuple.
///
/// `Creating`, `Updating` and `Dying` tuples sit in their producer's queue
/// until the next propagation. A tuple created and retracted within the same
/// batch becomes `Aborting` and is dropped without children ever seeing it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TupleState {
    Creating,
    Ok,
    Updating,
    Dying,
    Aborting,
    Dead,
}

impl TupleState {
    /// True for the states a producer still has to propagate.
    pub fn is_dirty(self) -> bool {
        matches!(
            self,
            TupleState::Creating | TupleState::Updating | TupleState::Dying | TupleState::Aborting
        )
    }
}

/// Per-node scratch state kept inside a tuple.
#[derive(Debug, Default)]
pub(crate) enum Slot {
    #[default]
    Empty,
    /// Filter verdict.
    Passed(bool),
    /// Join input: index position and, per output tuple it takes part in,
    /// the partner tuple on the other side.
    JoinSide {
        key: IndexKey,
        outputs: Vec<(TupleId, TupleId)>,
    },
    /// Exists left input. `matches` is only kept when a residual filter
    /// makes the count depend on more than the index.
    ExistsLeft {
        key: IndexKey,
        count: usize,
        matches: Vec<TupleId>,
        output: Option<TupleId>,
    },
    ExistsRight { key: IndexKey, matches: Vec<TupleId> },
    /// Group input: its group and the values it folded into each collector.
    Grouped { key: Row, contributions: Row },
    Mapped(TupleId),
    Flattened(Vec<TupleId>),
    /// Scorer input: the match weight that was added to the constraint total.
    Impact(i64),
}

#[derive(Debug)]
pub(crate) struct Tuple {
    pub values: Row,
    pub state: TupleState,
    pub store: Box<[Slot]>,
}

impl Tuple {
    fn new(values: Row, store_size: usize) -> Self {
        Self {
            values,
            state: TupleState::Creating,
            store: (0..store_size).map(|_| Slot::Empty).collect(),
        }
    }
}
