//! Expression trees evaluated against tuples.
//!
//! Every node parameter in a constraint network (filter predicates, joiner
//! keys, group keys, collector inputs, mappings, match weights) is an
//! [`Expr`]. Expressions are plain data: they hash and compare structurally,
//! which is what lets the network builder share identical nodes.

mod eval;


use std::fmt;
use std::ops::{Add, Div, Mul, Neg, Not, Sub};

pub use eval::EvalContext;

use crate::value::Value;

#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub enum Expr {
    Literal(Value),
    /// The tuple element at this position.
    Element(usize),
    /// A field of the fact held by a tuple element.
    Field {
        element: usize,
        field: usize,
    },
    /// A field of the fact the inner expression refers to. A `None`
    /// reference yields `None`.
    RefField {
        target: Box<Expr>,
        field: usize,
    },
    Eq(Box<Expr>, Box<Expr>),
    Ne(Box<Expr>, Box<Expr>),
    Lt(Box<Expr>, Box<Expr>),
    Le(Box<Expr>, Box<Expr>),
    Gt(Box<Expr>, Box<Expr>),
    Ge(Box<Expr>, Box<Expr>),
    And(Box<Expr>, Box<Expr>),
    Or(Box<Expr>, Box<Expr>),
    Not(Box<Expr>),
    Add(Box<Expr>, Box<Expr>),
    Sub(Box<Expr>, Box<Expr>),
    Mul(Box<Expr>, Box<Expr>),
    Div(Box<Expr>, Box<Expr>),
    Mod(Box<Expr>, Box<Expr>),
    Neg(Box<Expr>),
    Abs(Box<Expr>),
    Min(Box<Expr>, Box<Expr>),
    Max(Box<Expr>, Box<Expr>),
    /// List (or string) containment.
    Contains(Box<Expr>, Box<Expr>),
    Len(Box<Expr>),
    IsNone(Box<Expr>),
    IsNotNone(Box<Expr>),
    If {
        cond: Box<Expr>,
        then_expr: Box<Expr>,
        else_expr: Box<Expr>,
    },
}

impl Expr {
    pub fn literal(value: impl Into<Value>) -> Self {
        Expr::Literal(value.into())
    }

    pub fn int(value: i64) -> Self {
        Expr::Literal(Value::Int(value))
    }

    pub fn bool(value: bool) -> Self {
        Expr::Literal(Value::Bool(value))
    }

    pub fn element(index: usize) -> Self {
        Expr::Element(index)
    }

    pub fn field(element: usize, field: usize) -> Self {
        Expr::Field { element, field }
    }

    pub fn ref_field(target: Expr, field: usize) -> Self {
        Expr::RefField {
            target: Box::new(target),
            field,
        }
    }

    pub fn eq(left: Expr, right: Expr) -> Self {
        Expr::Eq(Box::new(left), Box::new(right))
    }

    pub fn ne(left: Expr, right: Expr) -> Self {
        Expr::Ne(Box::new(left), Box::new(right))
    }

    pub fn lt(left: Expr, right: Expr) -> Self {
        Expr::Lt(Box::new(left), Box::new(right))
    }

    pub fn le(left: Expr, right: Expr) -> Self {
        Expr::Le(Box::new(left), Box::new(right))
    }

    pub fn gt(left: Expr, right: Expr) -> Self {
        Expr::Gt(Box::new(left), Box::new(right))
    }

    pub fn ge(left: Expr, right: Expr) -> Self {
        Expr::Ge(Box::new(left), Box::new(right))
    }

    pub fn and(left: Expr, right: Expr) -> Self {
        Expr::And(Box::new(left), Box::new(right))
    }

    pub fn or(left: Expr, right: Expr) -> Self {
        Expr::Or(Box::new(left), Box::new(right))
    }

    /// Conjunction of every predicate; `true` when empty.
    pub fn all(predicates: impl IntoIterator<Item = Expr>) -> Self {
        predicates
            .into_iter()
            .reduce(Expr::and)
            .unwrap_or(Expr::bool(true))
    }

    pub fn modulo(left: Expr, right: Expr) -> Self {
        Expr::Mod(Box::new(left), Box::new(right))
    }

    pub fn abs(expr: Expr) -> Self {
        Expr::Abs(Box::new(expr))
    }

    pub fn min(left: Expr, right: Expr) -> Self {
        Expr::Min(Box::new(left), Box::new(right))
    }

    pub fn max(left: Expr, right: Expr) -> Self {
        Expr::Max(Box::new(left), Box::new(right))
    }

    pub fn contains(collection: Expr, value: Expr) -> Self {
        Expr::Contains(Box::new(collection), Box::new(value))
    }

    pub fn len(collection: Expr) -> Self {
        Expr::Len(Box::new(collection))
    }

    pub fn is_none(expr: Expr) -> Self {
        Expr::IsNone(Box::new(expr))
    }

    pub fn is_not_none(expr: Expr) -> Self {
        Expr::IsNotNone(Box::new(expr))
    }

    pub fn if_then_else(cond: Expr, then_expr: Expr, else_expr: Expr) -> Self {
        Expr::If {
            cond: Box::new(cond),
            then_expr: Box::new(then_expr),
            else_expr: Box::new(else_expr),
        }
    }

    /// Visits this expression and every sub-expression, parents first.
    pub fn walk<'a>(&'a self, f: &mut impl FnMut(&'a Expr)) {
        f(self);
        match self {
            Expr::Literal(_) | Expr::Element(_) | Expr::Field { .. } => {}
            Expr::RefField { target, .. } => target.walk(f),
            Expr::Not(e)
            | Expr::Neg(e)
            | Expr::Abs(e)
            | Expr::Len(e)
            | Expr::IsNone(e)
            | Expr::IsNotNone(e) => e.walk(f),
            Expr::Eq(l, r)
            | Expr::Ne(l, r)
            | Expr::Lt(l, r)
            | Expr::Le(l, r)
            | Expr::Gt(l, r)
            | Expr::Ge(l, r)
            | Expr::And(l, r)
            | Expr::Or(l, r)
            | Expr::Add(l, r)
            | Expr::Sub(l, r)
            | Expr::Mul(l, r)
            | Expr::Div(l, r)
            | Expr::Mod(l, r)
            | Expr::Min(l, r)
            | Expr::Max(l, r)
            | Expr::Contains(l, r) => {
                l.walk(f);
                r.walk(f);
            }
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => {
                cond.walk(f);
                then_expr.walk(f);
                else_expr.walk(f);
            }
        }
    }

    /// Number of tuple elements this expression needs, i.e. one past the
    /// highest element index it reads.
    pub fn required_arity(&self) -> usize {
        let mut arity = 0;
        self.walk(&mut |e| match e {
            Expr::Element(i) | Expr::Field { element: i, .. } => arity = arity.max(i + 1),
            _ => {}
        });
        arity
    }

    /// Rewrites every element index with `f`, e.g. to re-base a right-hand
    /// joiner expression onto a combined tuple.
    pub fn map_elements(&self, f: &impl Fn(usize) -> usize) -> Expr {
        let bin = |l: &Expr, r: &Expr| (Box::new(l.map_elements(f)), Box::new(r.map_elements(f)));
        match self {
            Expr::Literal(v) => Expr::Literal(v.clone()),
            Expr::Element(i) => Expr::Element(f(*i)),
            Expr::Field { element, field } => Expr::Field {
                element: f(*element),
                field: *field,
            },
            Expr::RefField { target, field } => Expr::RefField {
                target: Box::new(target.map_elements(f)),
                field: *field,
            },
            Expr::Eq(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Eq(l, r)
            }
            Expr::Ne(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Ne(l, r)
            }
            Expr::Lt(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Lt(l, r)
            }
            Expr::Le(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Le(l, r)
            }
            Expr::Gt(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Gt(l, r)
            }
            Expr::Ge(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Ge(l, r)
            }
            Expr::And(l, r) => {
                let (l, r) = bin(l, r);
                Expr::And(l, r)
            }
            Expr::Or(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Or(l, r)
            }
            Expr::Add(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Add(l, r)
            }
            Expr::Sub(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Sub(l, r)
            }
            Expr::Mul(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Mul(l, r)
            }
            Expr::Div(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Div(l, r)
            }
            Expr::Mod(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Mod(l, r)
            }
            Expr::Min(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Min(l, r)
            }
            Expr::Max(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Max(l, r)
            }
            Expr::Contains(l, r) => {
                let (l, r) = bin(l, r);
                Expr::Contains(l, r)
            }
            Expr::Not(e) => Expr::Not(Box::new(e.map_elements(f))),
            Expr::Neg(e) => Expr::Neg(Box::new(e.map_elements(f))),
            Expr::Abs(e) => Expr::Abs(Box::new(e.map_elements(f))),
            Expr::Len(e) => Expr::Len(Box::new(e.map_elements(f))),
            Expr::IsNone(e) => Expr::IsNone(Box::new(e.map_elements(f))),
            Expr::IsNotNone(e) => Expr::IsNotNone(Box::new(e.map_elements(f))),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => Expr::If {
                cond: Box::new(cond.map_elements(f)),
                then_expr: Box::new(then_expr.map_elements(f)),
                else_expr: Box::new(else_expr.map_elements(f)),
            },
        }
    }
}

impl fmt::Display for Expr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fn bin(f: &mut fmt::Formatter<'_>, l: &Expr, op: &str, r: &Expr) -> fmt::Result {
            write!(f, "({} {} {})", l, op, r)
        }

        match self {
            Expr::Literal(v) => write!(f, "{}", v),
            Expr::Element(i) => write!(f, "${}", i),
            Expr::Field { element, field } => write!(f, "${}.{}", element, field),
            Expr::RefField { target, field } => write!(f, "{}->{}", target, field),
            Expr::Eq(l, r) => bin(f, l, "==", r),
            Expr::Ne(l, r) => bin(f, l, "!=", r),
            Expr::Lt(l, r) => bin(f, l, "<", r),
            Expr::Le(l, r) => bin(f, l, "<=", r),
            Expr::Gt(l, r) => bin(f, l, ">", r),
            Expr::Ge(l, r) => bin(f, l, ">=", r),
            Expr::And(l, r) => bin(f, l, "&&", r),
            Expr::Or(l, r) => bin(f, l, "||", r),
            Expr::Add(l, r) => bin(f, l, "+", r),
            Expr::Sub(l, r) => bin(f, l, "-", r),
            Expr::Mul(l, r) => bin(f, l, "*", r),
            Expr::Div(l, r) => bin(f, l, "/", r),
            Expr::Mod(l, r) => bin(f, l, "%", r),
            Expr::Not(e) => write!(f, "!{}", e),
            Expr::Neg(e) => write!(f, "-{}", e),
            Expr::Abs(e) => write!(f, "abs({})", e),
            Expr::Min(l, r) => write!(f, "min({}, {})", l, r),
            Expr::Max(l, r) => write!(f, "max({}, {})", l, r),
            Expr::Contains(l, r) => write!(f, "contains({}, {})", l, r),
            Expr::Len(e) => write!(f, "len({})", e),
            Expr::IsNone(e) => write!(f, "is_none({})", e),
            Expr::IsNotNone(e) => write!(f, "is_not_none({})", e),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => write!(f, "if {} then {} else {}", cond, then_expr, else_expr),
        }
    }
}

impl Not for Expr {
    type Output = Expr;

    fn not(self) -> Self::Output {
        Expr::Not(Box::new(self))
    }
}

impl Add for Expr {
    type Output = Expr;

    fn add(self, rhs: Self) -> Self::Output {
        Expr::Add(Box::new(self), Box::new(rhs))
    }
}

impl Sub for Expr {
    type Output = Expr;

    fn sub(self, rhs: Self) -> Self::Output {
        Expr::Sub(Box::new(self), Box::new(rhs))
    }
}

impl Mul for Expr {
    type Output = Expr;

    fn mul(self, rhs: Self) -> Self::Output {
        Expr::Mul(Box::new(self), Box::new(rhs))
    }
}

impl Div for Expr {
    type Output = Expr;

    fn div(self, rhs: Self) -> Self::Output {
        Expr::Div(Box::new(self), Box::new(rhs))
    }
}

impl Neg for Expr {
    type Output = Expr;

    fn neg(self) -> Self::Output {
        Expr::Neg(Box::new(self))
    }
}
