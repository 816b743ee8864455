//! Join indexes: hash buckets on the `equal` keys, optionally ordered by one
//! range key inside each bucket.

use std::collections::{BTreeMap, HashMap};
use std::ops::Bound;

use smallvec::SmallVec;

use scoreforge_core::Value;

use crate::network::{RangeCondition, Side};
use crate::stream::joiner::Comparison;
use crate::tuple::TupleId;

/// Where a tuple sits in an index.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Default)]
pub(crate) struct IndexKey {
    pub equal: SmallVec<[Value; 2]>,
    /// Range key: the compared value, or an interval start with its end.
    pub range: Option<(Value, Option<Value>)>,
}

/// Bounds on the range key of the opposite side, derived from a lookup key.
#[derive(Debug)]
pub(crate) struct RangeQuery {
    lower: Bound<Value>,
    upper: Bound<Value>,
    /// For intervals: stored ends must lie strictly after this value.
    end_after: Option<Value>,
}

impl RangeQuery {
    /// Range of opposite-side keys that satisfy `condition` for a lookup
    /// coming from `side` with range key `key`.
    pub(crate) fn new(
        condition: &RangeCondition,
        side: Side,
        key: &(Value, Option<Value>),
    ) -> Self {
        let (value, end) = key;
        let v = value.clone();
        match condition {
            RangeCondition::Compare { op, .. } => {
                // Normalize to "opposite key relative to lookup value".
                let (lower, upper) = match (op, side) {
                    (Comparison::LessThan, Side::Left) | (Comparison::GreaterThan, Side::Right) => {
                        (Bound::Excluded(v), Bound::Unbounded)
                    }
                    (Comparison::LessThanOrEqual, Side::Left)
                    | (Comparison::GreaterThanOrEqual, Side::Right) => {
                        (Bound::Included(v), Bound::Unbounded)
                    }
                    (Comparison::GreaterThan, Side::Left) | (Comparison::LessThan, Side::Right) => {
                        (Bound::Unbounded, Bound::Excluded(v))
                    }
                    (Comparison::GreaterThanOrEqual, Side::Left)
                    | (Comparison::LessThanOrEqual, Side::Right) => {
                        (Bound::Unbounded, Bound::Included(v))
                    }
                };
                RangeQuery {
                    lower,
                    upper,
                    end_after: None,
                }
            }
            RangeCondition::Overlap { .. } => RangeQuery {
                lower: Bound::Unbounded,
                upper: match end {
                    Some(end) => Bound::Excluded(end.clone()),
                    None => Bound::Unbounded,
                },
                end_after: Some(v),
            },
        }
    }
}

#[derive(Debug)]
enum Bucket {
    Flat(Vec<TupleId>),
    Ordered(BTreeMap<Value, Vec<(TupleId, Option<Value>)>>),
}

impl Bucket {
    fn is_empty(&self) -> bool {
        match self {
            Bucket::Flat(ids) => ids.is_empty(),
            Bucket::Ordered(map) => map.is_empty(),
        }
    }
}

/// One side of a join or exists node.
#[derive(Debug, Default)]
pub(crate) struct Index {
    buckets: HashMap<SmallVec<[Value; 2]>, Bucket>,
}

impl Index {
    pub fn put(&mut self, key: &IndexKey, id: TupleId) {
        let bucket = self
            .buckets
            .entry(key.equal.clone())
            .or_insert_with(|| match key.range {
                Some(_) => Bucket::Ordered(BTreeMap::new()),
                None => Bucket::Flat(Vec::new()),
            });
        match (bucket, &key.range) {
            (Bucket::Flat(ids), _) => ids.push(id),
            (Bucket::Ordered(map), range) => {
                let (start, end) = range.clone().unwrap_or_default();
                map.entry(start).or_default().push((id, end));
            }
        }
    }

    /// Removes `id` from the position `key`. False if it was not there.
    pub fn remove(&mut self, key: &IndexKey, id: TupleId) -> bool {
        let Some(bucket) = self.buckets.get_mut(&key.equal) else {
            return false;
        };
        let removed = match (&mut *bucket, &key.range) {
            (Bucket::Flat(ids), _) => match ids.iter().position(|&t| t == id) {
                Some(i) => {
                    ids.swap_remove(i);
                    true
                }
                None => false,
            },
            (Bucket::Ordered(map), range) => {
                let none = Value::None;
                let start = range.as_ref().map_or(&none, |(start, _)| start);
                let mut emptied = false;
                let found = match map.get_mut(start) {
                    Some(entries) => match entries.iter().position(|(t, _)| *t == id) {
                        Some(i) => {
                            entries.swap_remove(i);
                            emptied = entries.is_empty();
                            true
                        }
                        None => false,
                    },
                    None => false,
                };
                if emptied {
                    map.remove(start);
                }
                found
            }
        };
        if bucket.is_empty() {
            self.buckets.remove(&key.equal);
        }
        removed
    }

    /// Tuples on this side matching a lookup with the given equal key and
    /// optional range bounds.
    pub fn lookup(&self, equal: &[Value], range: Option<&RangeQuery>) -> Vec<TupleId> {
        let Some(bucket) = self.buckets.get(equal) else {
            return Vec::new();
        };
        match (bucket, range) {
            (Bucket::Flat(ids), _) => ids.clone(),
            (Bucket::Ordered(map), None) => map
                .values()
                .flat_map(|entries| entries.iter().map(|(id, _)| *id))
                .collect(),
            (Bucket::Ordered(map), Some(query)) => map
                .range((query.lower.clone(), query.upper.clone()))
                .flat_map(|(_, entries)| entries.iter())
                .filter(|(_, end)| match (&query.end_after, end) {
                    (Some(after), Some(end)) => end > after,
                    (Some(_), None) => false,
                    (None, _) => true,
                })
                .map(|(id, _)| *id)
                .collect(),
        }
    }
}
