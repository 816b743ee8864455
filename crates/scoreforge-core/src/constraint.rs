//! Constraint identity and impact direction.

use std::fmt;

use crate::score::Score;

/// Reference to a constraint for identification.
///
/// # Example
///
/// ```
/// use scoreforge_core::ConstraintRef;
///
/// let cr = ConstraintRef::new("scheduling", "NoOverlap");
/// assert_eq!(cr.full_name(), "scheduling/NoOverlap");
/// assert_eq!(ConstraintRef::named("Simple").to_string(), "Simple");
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ConstraintRef {
    /// Package/module containing the constraint.
    pub package: String,
    /// Name of the constraint.
    pub name: String,
}

impl ConstraintRef {
    pub fn new(package: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            package: package.into(),
            name: name.into(),
        }
    }

    /// A constraint without a package.
    pub fn named(name: impl Into<String>) -> Self {
        Self::new("", name)
    }

    /// Returns the fully qualified name.
    pub fn full_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for ConstraintRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.package.is_empty() {
            f.write_str(&self.name)
        } else {
            write!(f, "{}/{}", self.package, self.name)
        }
    }
}

/// Direction in which a constraint moves the score.
///
/// ```
/// use scoreforge_core::{ImpactType, SimpleScore};
///
/// let weight = SimpleScore::of(3);
/// assert_eq!(ImpactType::Penalty.apply(weight), SimpleScore::of(-3));
/// assert_eq!(ImpactType::Reward.apply(weight), SimpleScore::of(3));
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ImpactType {
    /// Penalize (subtract from score).
    Penalty,
    /// Reward (add to score).
    Reward,
}

impl ImpactType {
    /// Signs an unsigned impact.
    pub fn apply<Sc: Score>(self, impact: Sc) -> Sc {
        match self {
            ImpactType::Penalty => -impact,
            ImpactType::Reward => impact,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::HardSoftScore;

    #[test]
    fn test_full_name_with_package() {
        let cr = ConstraintRef::new("my.package", "TestConstraint");
        assert_eq!(cr.full_name(), "my.package/TestConstraint");
    }

    #[test]
    fn test_impact_sign() {
        let w = HardSoftScore::of(1, 2);
        assert_eq!(ImpactType::Penalty.apply(w), HardSoftScore::of(-1, -2));
        assert_eq!(ImpactType::Reward.apply(w), w);
    }
}
