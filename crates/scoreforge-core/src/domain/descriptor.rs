//! Descriptor types for fact classes and their fields.

use std::sync::Arc;

use crate::error::DomainError;
use crate::value::Value;

/// Declared type of a field. `Value::None` is accepted for every type.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    Any,
    Bool,
    Int,
    Float,
    Str,
    /// Reference to another fact.
    Fact,
    List,
}

impl FieldType {
    /// Returns true if `value` may be stored in a field of this type.
    pub fn accepts(self, value: &Value) -> bool {
        matches!(
            (self, value),
            (_, Value::None)
                | (FieldType::Any, _)
                | (FieldType::Bool, Value::Bool(_))
                | (FieldType::Int, Value::Int(_))
                | (FieldType::Float, Value::Float(_))
                | (FieldType::Str, Value::Str(_))
                | (FieldType::Fact, Value::Fact(_))
                | (FieldType::List, Value::List(_))
        )
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldDescriptor {
    pub name: Arc<str>,
    pub field_type: FieldType,
    /// Planning variables are the fields a solver changes. A fact whose
    /// planning variable holds `Value::None` is unassigned.
    pub planning_variable: bool,
}

impl FieldDescriptor {
    pub fn new(name: impl Into<Arc<str>>, field_type: FieldType) -> Self {
        Self {
            name: name.into(),
            field_type,
            planning_variable: false,
        }
    }

    pub fn planning_variable(name: impl Into<Arc<str>>, field_type: FieldType) -> Self {
        Self {
            planning_variable: true,
            ..Self::new(name, field_type)
        }
    }
}

/// Describes one class of facts: its name and ordered fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FactClassDescriptor {
    pub name: Arc<str>,
    pub fields: Vec<FieldDescriptor>,
}

impl FactClassDescriptor {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            fields: Vec::new(),
        }
    }

    /// Builder-style field append.
    pub fn with_field(mut self, field: FieldDescriptor) -> Self {
        self.fields.push(field);
        self
    }

    pub fn field_index(&self, name: &str) -> Option<usize> {
        self.fields.iter().position(|f| &*f.name == name)
    }

    pub fn field_count(&self) -> usize {
        self.fields.len()
    }

    /// Indices of the planning variable fields.
    pub fn planning_variables(&self) -> impl Iterator<Item = usize> + '_ {
        self.fields
            .iter()
            .enumerate()
            .filter(|(_, f)| f.planning_variable)
            .map(|(i, _)| i)
    }

    /// Checks a field vector against the declared fields.
    pub fn validate(&self, values: &[Value]) -> Result<(), DomainError> {
        if values.len() != self.fields.len() {
            return Err(DomainError::FieldCount {
                class: self.name.to_string(),
                expected: self.fields.len(),
                actual: values.len(),
            });
        }
        for (index, value) in values.iter().enumerate() {
            self.validate_field(index, value)?;
        }
        Ok(())
    }

    pub fn validate_field(&self, index: usize, value: &Value) -> Result<(), DomainError> {
        let field = self.fields.get(index).ok_or_else(|| DomainError::UnknownField {
            class: self.name.to_string(),
            field: index.to_string(),
        })?;
        if field.field_type.accepts(value) {
            Ok(())
        } else {
            Err(DomainError::FieldType {
                class: self.name.to_string(),
                field: field.name.to_string(),
                expected: format!("{:?}", field.field_type).to_lowercase(),
                actual: value.kind().to_string(),
            })
        }
    }
}

/// The metamodel of a planning problem.
///
/// ```
/// use scoreforge_core::{FactClassDescriptor, FieldDescriptor, FieldType, SolutionDescriptor};
///
/// let mut descriptor = SolutionDescriptor::new("Schedule");
/// let employee = descriptor
///     .add_class(FactClassDescriptor::new("Employee").with_field(FieldDescriptor::new("name", FieldType::Str)))
///     .unwrap();
/// assert_eq!(descriptor.class_index("Employee"), Some(employee));
/// assert!(descriptor.add_class(FactClassDescriptor::new("Employee")).is_err());
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SolutionDescriptor {
    pub name: Arc<str>,
    classes: Vec<FactClassDescriptor>,
}

impl SolutionDescriptor {
    pub fn new(name: impl Into<Arc<str>>) -> Self {
        Self {
            name: name.into(),
            classes: Vec::new(),
        }
    }

    /// Registers a class and returns its index.
    pub fn add_class(&mut self, class: FactClassDescriptor) -> Result<usize, DomainError> {
        if self.class_index(&class.name).is_some() {
            return Err(DomainError::DuplicateName {
                kind: "class",
                name: class.name.to_string(),
            });
        }
        for (i, field) in class.fields.iter().enumerate() {
            if class.fields[..i].iter().any(|f| f.name == field.name) {
                return Err(DomainError::DuplicateName {
                    kind: "field",
                    name: format!("{}.{}", class.name, field.name),
                });
            }
        }
        self.classes.push(class);
        Ok(self.classes.len() - 1)
    }

    pub fn class_index(&self, name: &str) -> Option<usize> {
        self.classes.iter().position(|c| &*c.name == name)
    }

    pub fn class(&self, index: usize) -> Option<&FactClassDescriptor> {
        self.classes.get(index)
    }

    /// Like [`class`](Self::class) but with an error for unknown indices.
    pub fn class_checked(&self, index: usize) -> Result<&FactClassDescriptor, DomainError> {
        self.classes
            .get(index)
            .ok_or_else(|| DomainError::UnknownClass(index.to_string()))
    }

    pub fn classes(&self) -> &[FactClassDescriptor] {
        &self.classes
    }

    /// Resolves `class.field` by name.
    pub fn field_index(&self, class: &str, field: &str) -> Result<(usize, usize), DomainError> {
        let class_idx = self
            .class_index(class)
            .ok_or_else(|| DomainError::UnknownClass(class.to_string()))?;
        let field_idx =
            self.classes[class_idx]
                .field_index(field)
                .ok_or_else(|| DomainError::UnknownField {
                    class: class.to_string(),
                    field: field.to_string(),
                })?;
        Ok((class_idx, field_idx))
    }
}
