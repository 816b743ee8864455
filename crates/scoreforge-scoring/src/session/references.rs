//! Reverse fact references.
//!
//! An expression that reads a field through a reference (`shift.employee ->
//! skills`) depends on a fact that is not an element of its tuple. The index
//! maps every fact to the facts whose fields point at it, so a change to the
//! target can be turned into updates of the tuples built from its referrers.

use std::collections::{BTreeSet, HashMap};

use smallvec::SmallVec;

use scoreforge_core::{Fact, FactId, Value};

type Targets = SmallVec<[FactId; 2]>;

#[derive(Debug, Default, Clone)]
pub(crate) struct ReferenceIndex {
    targets: HashMap<FactId, Targets>,
    referrers: HashMap<FactId, BTreeSet<FactId>>,
}

impl ReferenceIndex {
    /// Records the references held by a newly stored fact.
    pub fn insert(&mut self, id: FactId, fact: &Fact) {
        let targets = targets_of(fact);
        for target in &targets {
            self.referrers.entry(*target).or_default().insert(id);
        }
        if !targets.is_empty() {
            self.targets.insert(id, targets);
        }
    }

    /// Forgets the references held by `id`. References pointing at `id`
    /// stay until their holders change.
    pub fn remove(&mut self, id: FactId) {
        for target in self.targets.remove(&id).unwrap_or_default() {
            if let Some(referrers) = self.referrers.get_mut(&target) {
                referrers.remove(&id);
                if referrers.is_empty() {
                    self.referrers.remove(&target);
                }
            }
        }
    }

    /// Re-reads the references of a fact whose fields changed.
    pub fn refresh(&mut self, id: FactId, fact: &Fact) {
        self.remove(id);
        self.insert(id, fact);
    }

    /// Facts that reach `id` through one or more references, nearest
    /// first. `id` itself is never part of the result.
    pub fn referrers_of(&self, id: FactId) -> Vec<FactId> {
        let mut seen = BTreeSet::from([id]);
        let mut found = Vec::new();
        let mut next = 0;
        let mut frontier = id;
        loop {
            for &referrer in self.referrers.get(&frontier).into_iter().flatten() {
                if seen.insert(referrer) {
                    found.push(referrer);
                }
            }
            match found.get(next) {
                Some(&referrer) => {
                    frontier = referrer;
                    next += 1;
                }
                None => return found,
            }
        }
    }
}

/// Facts referenced by a fact's fields, directly or as list items.
fn targets_of(fact: &Fact) -> Targets {
    let mut targets = Targets::new();
    for value in &fact.fields {
        match value {
            Value::Fact(target) => targets.push(*target),
            Value::List(items) => targets.extend(items.iter().filter_map(|item| match item {
                Value::Fact(target) => Some(*target),
                _ => None,
            })),
            _ => {}
        }
    }
    targets.sort();
    targets.dedup();
    targets
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ids(n: u64) -> Vec<FactId> {
        (0..n).map(FactId::new).collect()
    }

    fn pointing_at(targets: &[FactId]) -> Fact {
        Fact::new(0, targets.iter().map(|&t| Value::Fact(t)).collect())
    }

    #[test]
    fn test_referrers_follow_chains() {
        let f = ids(4);
        let mut index = ReferenceIndex::default();
        // 1 -> 0, 2 -> 1, 3 -> [0, 1] as a list.
        index.insert(f[1], &pointing_at(&[f[0]]));
        index.insert(f[2], &pointing_at(&[f[1]]));
        index.insert(
            f[3],
            &Fact::new(0, vec![Value::list([Value::Fact(f[0]), Value::Fact(f[1])])]),
        );

        assert_eq!(index.referrers_of(f[0]), vec![f[1], f[3], f[2]]);
        assert_eq!(index.referrers_of(f[2]), Vec::<FactId>::new());
    }

    #[test]
    fn test_refresh_moves_a_reference() {
        let f = ids(3);
        let mut index = ReferenceIndex::default();
        index.insert(f[2], &pointing_at(&[f[0]]));
        index.refresh(f[2], &pointing_at(&[f[1]]));

        assert!(index.referrers_of(f[0]).is_empty());
        assert_eq!(index.referrers_of(f[1]), vec![f[2]]);

        index.remove(f[2]);
        assert!(index.referrers_of(f[1]).is_empty());
    }

    #[test]
    fn test_cycles_terminate() {
        let f = ids(2);
        let mut index = ReferenceIndex::default();
        index.insert(f[0], &pointing_at(&[f[1]]));
        index.insert(f[1], &pointing_at(&[f[0]]));
        assert_eq!(index.referrers_of(f[0]), vec![f[1]]);
    }
}
