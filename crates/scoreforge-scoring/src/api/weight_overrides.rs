// Runtime constraint weights.
//
// Overrides replace the weight a constraint was declared with, by name,
// without rebuilding the network.

use std::collections::BTreeMap;
use std::fmt;

use scoreforge_config::EngineConfig;
use scoreforge_core::{ParseableScore, Score};

use crate::error::{EngineError, Result};

// Weights keyed by constraint name or full name.
#[derive(Clone, PartialEq, Eq)]
pub struct ConstraintWeightOverrides<Sc: Score> {
    weights: BTreeMap<String, Sc>,
}

impl<Sc: Score> fmt::Debug for ConstraintWeightOverrides<Sc> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_map().entries(self.weights.iter()).finish()
    }
}

impl<Sc: Score> Default for ConstraintWeightOverrides<Sc> {
    fn default() -> Self {
        Self::new()
    }
}

impl<Sc: Score> ConstraintWeightOverrides<Sc> {
    pub fn new() -> Self {
        Self {
            weights: BTreeMap::new(),
        }
    }

    pub fn from_pairs<I, N>(iter: I) -> Self
    where
        I: IntoIterator<Item = (N, Sc)>,
        N: Into<String>,
    {
        Self {
            weights: iter.into_iter().map(|(n, w)| (n.into(), w)).collect(),
        }
    }

    // Parses the `constraint_weights` table of an engine config.
    pub fn from_config(config: &EngineConfig) -> Result<Self>
    where
        Sc: ParseableScore,
    {
        let mut overrides = Self::new();
        for (name, text) in &config.constraint_weights {
            let weight = Sc::parse(text).map_err(|source| EngineError::InvalidWeight {
                constraint: name.clone(),
                source,
            })?;
            overrides.put(name.clone(), weight);
        }
        Ok(overrides)
    }

    pub fn put<N: Into<String>>(&mut self, name: N, weight: Sc) {
        self.weights.insert(name.into(), weight);
    }

    pub fn remove(&mut self, name: &str) -> Option<Sc> {
        self.weights.remove(name)
    }

    pub fn get(&self, name: &str) -> Option<Sc> {
        self.weights.get(name).copied()
    }

    pub fn get_or_default(&self, name: &str, default: Sc) -> Sc {
        self.get(name).unwrap_or(default)
    }

    pub fn names(&self) -> impl Iterator<Item = &str> {
        self.weights.keys().map(String::as_str)
    }

    pub fn len(&self) -> usize {
        self.weights.len()
    }

    pub fn is_empty(&self) -> bool {
        self.weights.is_empty()
    }
}

// Source of runtime weights, looked up by constraint name.
pub trait WeightProvider<Sc: Score>: Send + Sync {
    fn weight(&self, name: &str) -> Option<Sc>;

    fn weight_or_default(&self, name: &str, default: Sc) -> Sc {
        self.weight(name).unwrap_or(default)
    }
}

impl<Sc: Score> WeightProvider<Sc> for ConstraintWeightOverrides<Sc> {
    fn weight(&self, name: &str) -> Option<Sc> {
        self.get(name)
    }
}

impl<Sc, F> WeightProvider<Sc> for F
where
    Sc: Score,
    F: Fn(&str) -> Option<Sc> + Send + Sync,
{
    fn weight(&self, name: &str) -> Option<Sc> {
        self(name)
    }
}
