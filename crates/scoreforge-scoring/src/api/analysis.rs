//! Score analysis types: per-constraint breakdowns and fact indictments.

use std::collections::HashMap;

use scoreforge_core::{ConstraintRef, FactId, Score, Value};

/// Why a constraint matched: the matched tuple and the facts it involves.
#[derive(Debug, Clone, PartialEq)]
pub struct ConstraintJustification {
    /// Values of the matched tuple.
    pub values: Vec<Value>,
    /// Facts referenced by those values, in first-seen order.
    pub facts: Vec<FactId>,
    /// Human-readable rendering of the tuple.
    pub description: String,
}

impl ConstraintJustification {
    pub fn new(values: Vec<Value>, description: String) -> Self {
        let mut facts = Vec::new();
        for value in &values {
            value.for_each_fact(&mut |id| {
                if !facts.contains(&id) {
                    facts.push(id);
                }
            });
        }
        Self {
            values,
            facts,
            description,
        }
    }
}

/// One match of one constraint.
#[derive(Debug, Clone)]
pub struct ConstraintMatch<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    /// Score impact of this match.
    pub score: Sc,
    pub justification: ConstraintJustification,
}

/// Score and match count of one constraint.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConstraintResult<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    pub weight: Sc,
    pub score: Sc,
    pub match_count: usize,
}

/// Per-constraint breakdown in a score explanation.
#[derive(Debug, Clone)]
pub struct ConstraintAnalysis<Sc: Score> {
    pub constraint_ref: ConstraintRef,
    /// Constraint weight (score per unit of match weight).
    pub weight: Sc,
    pub score: Sc,
    pub matches: Vec<ConstraintMatch<Sc>>,
    pub is_hard: bool,
}

impl<Sc: Score> ConstraintAnalysis<Sc> {
    pub fn match_count(&self) -> usize {
        self.matches.len()
    }

    pub fn name(&self) -> &str {
        &self.constraint_ref.name
    }
}

/// Complete score explanation with per-constraint breakdown.
#[derive(Debug, Clone)]
pub struct ScoreExplanation<Sc: Score> {
    pub score: Sc,
    pub constraint_analyses: Vec<ConstraintAnalysis<Sc>>,
}

impl<Sc: Score> ScoreExplanation<Sc> {
    pub fn total_match_count(&self) -> usize {
        self.constraint_analyses.iter().map(|a| a.match_count()).sum()
    }

    /// Constraints that currently affect the score.
    pub fn non_zero_constraints(&self) -> Vec<&ConstraintAnalysis<Sc>> {
        self.constraint_analyses
            .iter()
            .filter(|a| a.score != Sc::zero())
            .collect()
    }

    pub fn all_matches(&self) -> Vec<&ConstraintMatch<Sc>> {
        self.constraint_analyses
            .iter()
            .flat_map(|a| &a.matches)
            .collect()
    }

    pub fn analysis(&self, name: &str) -> Option<&ConstraintAnalysis<Sc>> {
        self.constraint_analyses
            .iter()
            .find(|a| a.constraint_ref.name == name || a.constraint_ref.full_name() == name)
    }
}

/// How one fact impacts the score.
#[derive(Debug, Clone)]
pub struct Indictment<Sc: Score> {
    pub fact: FactId,
    pub score: Sc,
    /// Matches involving the fact, grouped by constraint.
    pub constraint_matches: HashMap<ConstraintRef, Vec<ConstraintMatch<Sc>>>,
}

impl<Sc: Score> Indictment<Sc> {
    pub fn new(fact: FactId) -> Self {
        Self {
            fact,
            score: Sc::zero(),
            constraint_matches: HashMap::new(),
        }
    }

    pub fn add_match(&mut self, constraint_match: ConstraintMatch<Sc>) {
        self.score = self.score + constraint_match.score;
        self.constraint_matches
            .entry(constraint_match.constraint_ref.clone())
            .or_default()
            .push(constraint_match);
    }

    pub fn match_count(&self) -> usize {
        self.constraint_matches.values().map(Vec::len).sum()
    }

    pub fn violated_constraints(&self) -> Vec<&ConstraintRef> {
        self.constraint_matches.keys().collect()
    }
}

/// Indictments keyed by fact.
#[derive(Debug, Clone)]
pub struct IndictmentMap<Sc: Score> {
    pub indictments: HashMap<FactId, Indictment<Sc>>,
}

impl<Sc: Score> IndictmentMap<Sc> {
    pub fn new() -> Self {
        Self {
            indictments: HashMap::new(),
        }
    }

    /// Charges every match to each fact its justification references.
    pub fn from_matches(matches: impl IntoIterator<Item = ConstraintMatch<Sc>>) -> Self {
        let mut map = Self::new();
        for m in matches {
            for &fact in &m.justification.facts {
                map.indictments
                    .entry(fact)
                    .or_insert_with(|| Indictment::new(fact))
                    .add_match(m.clone());
            }
        }
        map
    }

    pub fn get(&self, fact: FactId) -> Option<&Indictment<Sc>> {
        self.indictments.get(&fact)
    }

    pub fn facts(&self) -> impl Iterator<Item = FactId> + '_ {
        self.indictments.keys().copied()
    }

    /// Facts sorted by score impact, worst first; ties by id.
    pub fn worst_facts(&self) -> Vec<FactId> {
        let mut facts: Vec<FactId> = self.facts().collect();
        facts.sort_by(|a, b| {
            self.indictments[a]
                .score
                .cmp(&self.indictments[b].score)
                .then(a.cmp(b))
        });
        facts
    }

    pub fn len(&self) -> usize {
        self.indictments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.indictments.is_empty()
    }
}

impl<Sc: Score> Default for IndictmentMap<Sc> {
    fn default() -> Self {
        Self::new()
    }
}
