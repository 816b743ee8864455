//! Joiners: matching conditions between the two sides of a join or an
//! exists gate.
//!
//! Left expressions read the left tuple, right expressions read the right
//! tuple (element 0 is the first element of that side). `filtering` reads the
//! combined row, left elements first.
//!
//! ```
//! use scoreforge_core::Expr;
//! use scoreforge_scoring::joiner::{equal, less_than};
//!
//! // Same employee, and the left shift starts before the right one.
//! let joiners = vec![
//!     equal(Expr::field(0, 1), Expr::field(0, 1)),
//!     less_than(Expr::field(0, 0), Expr::field(0, 0)),
//! ];
//! assert_eq!(joiners.len(), 2);
//! ```

use std::fmt;

use scoreforge_core::Expr;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Comparison {
    LessThan,
    LessThanOrEqual,
    GreaterThan,
    GreaterThanOrEqual,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::LessThan => "<",
            Comparison::LessThanOrEqual => "<=",
            Comparison::GreaterThan => ">",
            Comparison::GreaterThanOrEqual => ">=",
        }
    }

    // `left op right` as an expression over a combined row.
    pub(crate) fn to_expr(self, left: Expr, right: Expr) -> Expr {
        match self {
            Comparison::LessThan => Expr::lt(left, right),
            Comparison::LessThanOrEqual => Expr::le(left, right),
            Comparison::GreaterThan => Expr::gt(left, right),
            Comparison::GreaterThanOrEqual => Expr::ge(left, right),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Joiner {
    // Hash-indexed equality of a left key and a right key.
    Equal { left: Expr, right: Expr },
    // `left op right`, ordered by the value order of the keys.
    Compare {
        op: Comparison,
        left: Expr,
        right: Expr,
    },
    // Half-open intervals `[start, end)` that intersect.
    Overlapping {
        left_start: Expr,
        left_end: Expr,
        right_start: Expr,
        right_end: Expr,
    },
    // Arbitrary predicate over the combined row.
    Filtering(Expr),
}

pub fn equal(left: Expr, right: Expr) -> Joiner {
    Joiner::Equal { left, right }
}

pub fn less_than(left: Expr, right: Expr) -> Joiner {
    Joiner::Compare {
        op: Comparison::LessThan,
        left,
        right,
    }
}

pub fn less_than_or_equal(left: Expr, right: Expr) -> Joiner {
    Joiner::Compare {
        op: Comparison::LessThanOrEqual,
        left,
        right,
    }
}

pub fn greater_than(left: Expr, right: Expr) -> Joiner {
    Joiner::Compare {
        op: Comparison::GreaterThan,
        left,
        right,
    }
}

pub fn greater_than_or_equal(left: Expr, right: Expr) -> Joiner {
    Joiner::Compare {
        op: Comparison::GreaterThanOrEqual,
        left,
        right,
    }
}

pub fn overlapping(left_start: Expr, left_end: Expr, right_start: Expr, right_end: Expr) -> Joiner {
    Joiner::Overlapping {
        left_start,
        left_end,
        right_start,
        right_end,
    }
}

pub fn filtering(predicate: Expr) -> Joiner {
    Joiner::Filtering(predicate)
}

impl fmt::Display for Joiner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Joiner::Equal { left, right } => write!(f, "equal({}, {})", left, right),
            Joiner::Compare { op, left, right } => {
                write!(f, "{} {} {}", left, op.symbol(), right)
            }
            Joiner::Overlapping {
                left_start,
                left_end,
                right_start,
                right_end,
            } => write!(
                f,
                "overlapping([{}, {}), [{}, {}))",
                left_start, left_end, right_start, right_end
            ),
            Joiner::Filtering(e) => write!(f, "filtering({})", e),
        }
    }
}
