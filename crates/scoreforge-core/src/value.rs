//! Runtime values carried by facts and tuples.

use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use crate::domain::FactId;

/// A value stored in a fact field or a tuple element.
///
/// `Value` has a total order so it can key hash maps and ordered indexes:
/// variants order by kind first (`None < Bool < Int < Float < Str < Fact <
/// List`), floats by [`f64::total_cmp`]. `Int` and `Float` never compare
/// equal to each other.
#[derive(Debug, Clone, Default)]
pub enum Value {
    /// No value; an unassigned planning variable holds this.
    #[default]
    None,
    Bool(bool),
    Int(i64),
    Float(f64),
    Str(Arc<str>),
    /// Reference to a fact in the working solution.
    Fact(FactId),
    List(Arc<[Value]>),
}

impl Value {
    pub fn str(s: impl AsRef<str>) -> Self {
        Value::Str(Arc::from(s.as_ref()))
    }

    pub fn list(items: impl IntoIterator<Item = Value>) -> Self {
        Value::List(items.into_iter().collect())
    }

    pub fn is_none(&self) -> bool {
        matches!(self, Value::None)
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self {
            Value::Bool(v) => Some(*v),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i64> {
        match self {
            Value::Int(v) => Some(*v),
            _ => None,
        }
    }

    /// Numeric view; integers widen to `f64`.
    pub fn as_float(&self) -> Option<f64> {
        match self {
            Value::Float(v) => Some(*v),
            Value::Int(v) => Some(*v as f64),
            _ => None,
        }
    }

    pub fn as_str(&self) -> Option<&str> {
        match self {
            Value::Str(s) => Some(s),
            _ => None,
        }
    }

    pub fn as_fact(&self) -> Option<FactId> {
        match self {
            Value::Fact(id) => Some(*id),
            _ => None,
        }
    }

    pub fn as_list(&self) -> Option<&[Value]> {
        match self {
            Value::List(items) => Some(items),
            _ => None,
        }
    }

    /// Short name of the variant, used in error messages.
    pub fn kind(&self) -> &'static str {
        match self {
            Value::None => "none",
            Value::Bool(_) => "bool",
            Value::Int(_) => "int",
            Value::Float(_) => "float",
            Value::Str(_) => "string",
            Value::Fact(_) => "fact",
            Value::List(_) => "list",
        }
    }

    /// True when the value mentions no fact, directly or inside a list.
    ///
    /// Downstream expressions may read fields of referenced facts, so only
    /// fact-free values can be compared to decide that nothing changed.
    pub fn is_fact_free(&self) -> bool {
        match self {
            Value::Fact(_) => false,
            Value::List(items) => items.iter().all(Value::is_fact_free),
            _ => true,
        }
    }

    /// Visits every fact reference in this value.
    pub fn for_each_fact(&self, f: &mut impl FnMut(FactId)) {
        match self {
            Value::Fact(id) => f(*id),
            Value::List(items) => items.iter().for_each(|v| v.for_each_fact(f)),
            _ => {}
        }
    }

    fn rank(&self) -> u8 {
        match self {
            Value::None => 0,
            Value::Bool(_) => 1,
            Value::Int(_) => 2,
            Value::Float(_) => 3,
            Value::Str(_) => 4,
            Value::Fact(_) => 5,
            Value::List(_) => 6,
        }
    }
}

impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        self.cmp(other) == Ordering::Equal
    }
}

impl Eq for Value {}

impl PartialOrd for Value {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Value {
    fn cmp(&self, other: &Self) -> Ordering {
        match (self, other) {
            (Value::None, Value::None) => Ordering::Equal,
            (Value::Bool(a), Value::Bool(b)) => a.cmp(b),
            (Value::Int(a), Value::Int(b)) => a.cmp(b),
            (Value::Float(a), Value::Float(b)) => a.total_cmp(b),
            (Value::Str(a), Value::Str(b)) => a.cmp(b),
            (Value::Fact(a), Value::Fact(b)) => a.cmp(b),
            (Value::List(a), Value::List(b)) => a.iter().cmp(b.iter()),
            _ => self.rank().cmp(&other.rank()),
        }
    }
}

impl Hash for Value {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.rank().hash(state);
        match self {
            Value::None => {}
            Value::Bool(v) => v.hash(state),
            Value::Int(v) => v.hash(state),
            Value::Float(v) => v.to_bits().hash(state),
            Value::Str(v) => v.hash(state),
            Value::Fact(v) => v.hash(state),
            Value::List(v) => v.hash(state),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::None => f.write_str("none"),
            Value::Bool(v) => write!(f, "{}", v),
            Value::Int(v) => write!(f, "{}", v),
            Value::Float(v) => write!(f, "{}", v),
            Value::Str(v) => write!(f, "{:?}", v),
            Value::Fact(id) => write!(f, "{}", id),
            Value::List(items) => {
                f.write_str("[")?;
                for (i, item) in items.iter().enumerate() {
                    if i > 0 {
                        f.write_str(", ")?;
                    }
                    write!(f, "{}", item)?;
                }
                f.write_str("]")
            }
        }
    }
}

impl From<bool> for Value {
    fn from(v: bool) -> Self {
        Value::Bool(v)
    }
}

impl From<i64> for Value {
    fn from(v: i64) -> Self {
        Value::Int(v)
    }
}

impl From<i32> for Value {
    fn from(v: i32) -> Self {
        Value::Int(v.into())
    }
}

impl From<f64> for Value {
    fn from(v: f64) -> Self {
        Value::Float(v)
    }
}

impl From<&str> for Value {
    fn from(v: &str) -> Self {
        Value::str(v)
    }
}

impl From<FactId> for Value {
    fn from(v: FactId) -> Self {
        Value::Fact(v)
    }
}

impl<T: Into<Value>> From<Option<T>> for Value {
    fn from(v: Option<T>) -> Self {
        v.map_or(Value::None, Into::into)
    }
}

#[cfg(test)]
mod tests {
    use std::collections::hash_map::DefaultHasher;

    use super::*;

    fn hash_of(v: &Value) -> u64 {
        let mut h = DefaultHasher::new();
        v.hash(&mut h);
        h.finish()
    }

    #[test]
    fn test_kinds_order_before_contents() {
        assert!(Value::None < Value::Bool(false));
        assert!(Value::Int(i64::MAX) < Value::Float(f64::MIN));
        assert!(Value::str("z") < Value::Fact(FactId::new(0)));
    }

    #[test]
    fn test_int_and_float_are_distinct() {
        assert_ne!(Value::Int(1), Value::Float(1.0));
    }

    #[test]
    fn test_float_equality_is_bitwise() {
        assert_eq!(Value::Float(f64::NAN), Value::Float(f64::NAN));
        assert_eq!(hash_of(&Value::Float(0.5)), hash_of(&Value::Float(0.5)));
    }

    #[test]
    fn test_lists_compare_lexicographically() {
        let a = Value::list([Value::Int(1), Value::Int(2)]);
        let b = Value::list([Value::Int(1), Value::Int(3)]);
        assert!(a < b);
        let same = Value::list(vec![Value::Int(1), Value::Int(2)]);
        assert_eq!(a, same);
        assert_eq!(hash_of(&a), hash_of(&same));
    }

    #[test]
    fn test_fact_free() {
        assert!(Value::list([Value::Int(1), Value::str("a")]).is_fact_free());
        assert!(!Value::list([Value::Fact(FactId::new(3))]).is_fact_free());
    }

    #[test]
    fn test_display() {
        let v = Value::list([Value::Int(1), Value::str("x"), Value::None]);
        assert_eq!(v.to_string(), "[1, \"x\", none]");
    }
}
