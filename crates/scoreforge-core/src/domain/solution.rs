//! Facts and the working solution that stores them.

use std::fmt;
use std::sync::Arc;

use super::descriptor::SolutionDescriptor;
use crate::error::DomainError;
use crate::value::Value;

/// Identity of a fact within a working solution.
///
/// Ids are handed out in increasing order and never reused, so an id stays
/// meaningful across clones of the solution.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
#[cfg_attr(feature = "serde", derive(serde::Serialize, serde::Deserialize))]
pub struct FactId(u64);

impl FactId {
    pub const fn new(raw: u64) -> Self {
        FactId(raw)
    }

    pub const fn raw(self) -> u64 {
        self.0
    }

    fn index(self) -> usize {
        self.0 as usize
    }
}

impl fmt::Display for FactId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// A problem fact or planning entity.
#[derive(Debug, Clone, PartialEq)]
pub struct Fact {
    /// Index of the fact's class in the [`SolutionDescriptor`].
    pub class: usize,
    pub fields: Vec<Value>,
}

impl Fact {
    pub fn new(class: usize, fields: Vec<Value>) -> Self {
        Self { class, fields }
    }

    pub fn field(&self, index: usize) -> Option<&Value> {
        self.fields.get(index)
    }
}

/// The mutable fact store a session scores.
///
/// Cloning is structural: the clone owns copies of every fact and shares the
/// descriptor.
#[derive(Debug, Clone)]
pub struct WorkingSolution {
    descriptor: Arc<SolutionDescriptor>,
    facts: Vec<Option<Fact>>,
    live: usize,
}

impl WorkingSolution {
    pub fn new(descriptor: Arc<SolutionDescriptor>) -> Self {
        Self {
            descriptor,
            facts: Vec::new(),
            live: 0,
        }
    }

    pub fn descriptor(&self) -> &Arc<SolutionDescriptor> {
        &self.descriptor
    }

    /// Validates and stores a fact, returning its new id.
    pub fn insert(&mut self, fact: Fact) -> Result<FactId, DomainError> {
        self.descriptor.class_checked(fact.class)?.validate(&fact.fields)?;
        let id = FactId(self.facts.len() as u64);
        self.facts.push(Some(fact));
        self.live += 1;
        Ok(id)
    }

    pub fn get(&self, id: FactId) -> Option<&Fact> {
        self.facts.get(id.index()).and_then(Option::as_ref)
    }

    pub fn fact(&self, id: FactId) -> Result<&Fact, DomainError> {
        self.get(id).ok_or(DomainError::UnknownFact(id))
    }

    pub fn contains(&self, id: FactId) -> bool {
        self.get(id).is_some()
    }

    pub fn field(&self, id: FactId, field: usize) -> Result<&Value, DomainError> {
        let fact = self.fact(id)?;
        fact.fields.get(field).ok_or_else(|| DomainError::UnknownField {
            class: self.class_name(fact.class).to_string(),
            field: field.to_string(),
        })
    }

    /// Writes a field and returns the previous value.
    pub fn set_field(
        &mut self,
        id: FactId,
        field: usize,
        value: Value,
    ) -> Result<Value, DomainError> {
        let class = self.fact(id)?.class;
        self.descriptor
            .class_checked(class)?
            .validate_field(field, &value)?;
        let fact = self
            .facts
            .get_mut(id.index())
            .and_then(Option::as_mut)
            .ok_or(DomainError::UnknownFact(id))?;
        Ok(std::mem::replace(&mut fact.fields[field], value))
    }

    /// Removes a fact, returning it.
    pub fn remove(&mut self, id: FactId) -> Result<Fact, DomainError> {
        let fact = self
            .facts
            .get_mut(id.index())
            .and_then(Option::take)
            .ok_or(DomainError::UnknownFact(id))?;
        self.live -= 1;
        Ok(fact)
    }

    pub fn len(&self) -> usize {
        self.live
    }

    pub fn is_empty(&self) -> bool {
        self.live == 0
    }

    /// Live facts in id order.
    pub fn iter(&self) -> impl Iterator<Item = (FactId, &Fact)> {
        self.facts
            .iter()
            .enumerate()
            .filter_map(|(i, f)| f.as_ref().map(|f| (FactId(i as u64), f)))
    }

    pub fn facts_of(&self, class: usize) -> impl Iterator<Item = (FactId, &Fact)> {
        self.iter().filter(move |(_, f)| f.class == class)
    }

    /// `Class#id` form used in diagnostics.
    pub fn describe(&self, id: FactId) -> String {
        match self.get(id) {
            Some(fact) => format!("{}{}", self.class_name(fact.class), id),
            None => id.to_string(),
        }
    }

    fn class_name(&self, class: usize) -> &str {
        self.descriptor.class(class).map_or("?", |c| &c.name)
    }
}
