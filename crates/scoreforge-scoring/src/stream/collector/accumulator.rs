//! Built-in accumulators.

use std::collections::BTreeMap;

use scoreforge_core::{ExprError, Value};

use super::{Accumulator, Collector};

/// Accumulator state of one collector in one group.
///
/// Built-in folds are dispatched statically; only user collectors go through
/// a trait object.
pub(crate) enum GroupAccumulator {
    Count(usize),
    Sum(IntSum),
    Average(IntSum),
    Distinct(Multiset),
    Min(Multiset),
    Max(Multiset),
    List(Multiset),
    Set(Multiset),
    Custom(Box<dyn Accumulator>),
}

impl GroupAccumulator {
    pub(crate) fn for_collector(collector: &Collector) -> Self {
        match collector {
            Collector::Count => GroupAccumulator::Count(0),
            Collector::CountDistinct(_) => GroupAccumulator::Distinct(Multiset::default()),
            Collector::Sum(_) => GroupAccumulator::Sum(IntSum::default()),
            Collector::Average(_) => GroupAccumulator::Average(IntSum::default()),
            Collector::Min(_) => GroupAccumulator::Min(Multiset::default()),
            Collector::Max(_) => GroupAccumulator::Max(Multiset::default()),
            Collector::ToList(_) => GroupAccumulator::List(Multiset::default()),
            Collector::ToSet(_) => GroupAccumulator::Set(Multiset::default()),
            Collector::Custom { collector, .. } => {
                GroupAccumulator::Custom(collector.0.create_accumulator())
            }
        }
    }
}

impl Accumulator for GroupAccumulator {
    fn accumulate(&mut self, value: &Value) -> Result<(), ExprError> {
        match self {
            GroupAccumulator::Count(n) => {
                *n += 1;
                Ok(())
            }
            GroupAccumulator::Custom(acc) => acc.accumulate(value),
            _ if value.is_none() => Ok(()),
            GroupAccumulator::Sum(sum) => sum.add(value, "sum"),
            GroupAccumulator::Average(sum) => sum.add(value, "average"),
            GroupAccumulator::Distinct(set)
            | GroupAccumulator::Min(set)
            | GroupAccumulator::Max(set)
            | GroupAccumulator::List(set)
            | GroupAccumulator::Set(set) => {
                set.insert(value);
                Ok(())
            }
        }
    }

    fn retract(&mut self, value: &Value) -> bool {
        match self {
            GroupAccumulator::Count(n) => match n.checked_sub(1) {
                Some(left) => {
                    *n = left;
                    true
                }
                None => false,
            },
            GroupAccumulator::Custom(acc) => acc.retract(value),
            _ if value.is_none() => true,
            GroupAccumulator::Sum(sum) | GroupAccumulator::Average(sum) => sum.remove(value),
            GroupAccumulator::Distinct(set)
            | GroupAccumulator::Min(set)
            | GroupAccumulator::Max(set)
            | GroupAccumulator::List(set)
            | GroupAccumulator::Set(set) => set.remove(value),
        }
    }

    fn finish(&self) -> Result<Value, ExprError> {
        match self {
            GroupAccumulator::Count(n) => count_value(*n),
            GroupAccumulator::Sum(sum) => i64::try_from(sum.total)
                .map(Value::Int)
                .map_err(|_| ExprError::Overflow("sum")),
            GroupAccumulator::Average(sum) if sum.count == 0 => Ok(Value::None),
            GroupAccumulator::Average(sum) => {
                Ok(Value::Float(sum.total as f64 / sum.count as f64))
            }
            GroupAccumulator::Distinct(set) => count_value(set.counts.len()),
            GroupAccumulator::Min(set) => Ok(set.counts.keys().next().cloned().unwrap_or_default()),
            GroupAccumulator::Max(set) => {
                Ok(set.counts.keys().next_back().cloned().unwrap_or_default())
            }
            GroupAccumulator::List(set) => Ok(Value::list(
                set.counts
                    .iter()
                    .flat_map(|(v, &n)| std::iter::repeat(v.clone()).take(n)),
            )),
            GroupAccumulator::Set(set) => Ok(Value::list(set.counts.keys().cloned())),
            GroupAccumulator::Custom(acc) => acc.finish(),
        }
    }
}

fn count_value(n: usize) -> Result<Value, ExprError> {
    i64::try_from(n)
        .map(Value::Int)
        .map_err(|_| ExprError::Overflow("count"))
}

/// Exact integer total. Widened so that no partial order of additions can
/// overflow where the final result fits.
#[derive(Default)]
pub(crate) struct IntSum {
    total: i128,
    count: usize,
}

impl IntSum {
    fn add(&mut self, value: &Value, op: &'static str) -> Result<(), ExprError> {
        let v = value.as_int().ok_or_else(|| ExprError::TypeMismatch {
            op,
            found: value.kind().to_string(),
        })?;
        self.total += i128::from(v);
        self.count += 1;
        Ok(())
    }

    fn remove(&mut self, value: &Value) -> bool {
        match value.as_int() {
            Some(v) if self.count > 0 => {
                self.total -= i128::from(v);
                self.count -= 1;
                true
            }
            _ => false,
        }
    }
}

/// Value multiset in value order.
#[derive(Default)]
pub(crate) struct Multiset {
    counts: BTreeMap<Value, usize>,
}

impl Multiset {
    fn insert(&mut self, value: &Value) {
        *self.counts.entry(value.clone()).or_insert(0) += 1;
    }

    fn remove(&mut self, value: &Value) -> bool {
        match self.counts.get_mut(value) {
            Some(n) if *n > 1 => {
                *n -= 1;
                true
            }
            Some(_) => {
                self.counts.remove(value);
                true
            }
            None => false,
        }
    }
}
