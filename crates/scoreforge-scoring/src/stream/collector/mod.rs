// Collectors for grouping and aggregating tuples.
//
// A collector reads one input expression per tuple and folds the values into
// an accumulator that must give the same result for any insert/retract
// order. `None` inputs are skipped by every collector except `count`.

mod accumulator;


use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use scoreforge_core::{Expr, ExprError, Value};

pub(crate) use accumulator::GroupAccumulator;

/// A running fold over the values of one group.
///
/// Implementations must be order-independent: any interleaving of
/// `accumulate` and `retract` calls over the same multiset of live values
/// must `finish` with the same result.
pub trait Accumulator: Send {
    fn accumulate(&mut self, value: &Value) -> Result<(), ExprError>;

    /// Removes a value previously passed to `accumulate`. Returns false when
    /// the accumulator never saw the value.
    fn retract(&mut self, value: &Value) -> bool;

    fn finish(&self) -> Result<Value, ExprError>;
}

/// User-defined collector plugged into `group_by` through [`custom`].
pub trait ConstraintCollector: Send + Sync + fmt::Debug {
    fn create_accumulator(&self) -> Box<dyn Accumulator>;

    fn name(&self) -> &str {
        "custom"
    }
}

/// Shared handle to a [`ConstraintCollector`].
///
/// Two handles are equal only when they point at the same collector
/// instance, so cloning a [`Collector`] keeps group nodes shareable while
/// independently created custom collectors never merge.
#[derive(Clone, Debug)]
pub struct CustomCollector(Arc<dyn ConstraintCollector>);

impl CustomCollector {
    pub fn new(collector: impl ConstraintCollector + 'static) -> Self {
        CustomCollector(Arc::new(collector))
    }

    fn addr(&self) -> *const () {
        Arc::as_ptr(&self.0) as *const ()
    }
}

impl PartialEq for CustomCollector {
    fn eq(&self, other: &Self) -> bool {
        self.addr() == other.addr()
    }
}

impl Eq for CustomCollector {}

impl Hash for CustomCollector {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.addr().hash(state);
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Collector {
    Count,
    CountDistinct(Expr),
    /// Integer sum; an empty or all-`None` group sums to 0.
    Sum(Expr),
    /// Integer mean as a float; `None` when no value was collected.
    Average(Expr),
    Min(Expr),
    Max(Expr),
    /// All values in ascending order, duplicates kept.
    ToList(Expr),
    /// Distinct values in ascending order.
    ToSet(Expr),
    Custom {
        input: Expr,
        collector: CustomCollector,
    },
}

pub fn count() -> Collector {
    Collector::Count
}

pub fn count_distinct(input: Expr) -> Collector {
    Collector::CountDistinct(input)
}

pub fn sum(input: Expr) -> Collector {
    Collector::Sum(input)
}

pub fn average(input: Expr) -> Collector {
    Collector::Average(input)
}

pub fn min(input: Expr) -> Collector {
    Collector::Min(input)
}

pub fn max(input: Expr) -> Collector {
    Collector::Max(input)
}

pub fn to_list(input: Expr) -> Collector {
    Collector::ToList(input)
}

pub fn to_set(input: Expr) -> Collector {
    Collector::ToSet(input)
}

pub fn custom(input: Expr, collector: impl ConstraintCollector + 'static) -> Collector {
    Collector::Custom {
        input,
        collector: CustomCollector::new(collector),
    }
}

impl Collector {
    /// The expression evaluated per tuple, if the collector reads one.
    pub fn input(&self) -> Option<&Expr> {
        match self {
            Collector::Count => None,
            Collector::CountDistinct(e)
            | Collector::Sum(e)
            | Collector::Average(e)
            | Collector::Min(e)
            | Collector::Max(e)
            | Collector::ToList(e)
            | Collector::ToSet(e)
            | Collector::Custom { input: e, .. } => Some(e),
        }
    }

    pub(crate) fn create_accumulator(&self) -> GroupAccumulator {
        GroupAccumulator::for_collector(self)
    }

    fn name(&self) -> &str {
        match self {
            Collector::Count => "count",
            Collector::CountDistinct(_) => "count_distinct",
            Collector::Sum(_) => "sum",
            Collector::Average(_) => "average",
            Collector::Min(_) => "min",
            Collector::Max(_) => "max",
            Collector::ToList(_) => "to_list",
            Collector::ToSet(_) => "to_set",
            Collector::Custom { collector, .. } => collector.0.name(),
        }
    }
}

impl fmt::Display for Collector {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.input() {
            Some(input) => write!(f, "{}({})", self.name(), input),
            None => write!(f, "{}()", self.name()),
        }
    }
}
