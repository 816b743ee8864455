//! Expression evaluation.

use std::cmp::Ordering;

use super::Expr;
use crate::domain::WorkingSolution;
use crate::error::{ExprError, Result};
use crate::value::Value;

/// What an expression is evaluated against: one tuple row and the solution
/// its fact references point into.
#[derive(Clone, Copy)]
pub struct EvalContext<'a> {
    pub values: &'a [Value],
    pub solution: &'a WorkingSolution,
}

impl<'a> EvalContext<'a> {
    pub fn new(values: &'a [Value], solution: &'a WorkingSolution) -> Self {
        Self { values, solution }
    }

    fn element(&self, index: usize) -> Result<&'a Value> {
        self.values.get(index).ok_or(ExprError::ElementOutOfRange {
            index,
            arity: self.values.len(),
        })
    }

    fn deref_field(&self, target: &Value, field: usize) -> Result<Value> {
        let id = match target {
            Value::None => return Ok(Value::None),
            Value::Fact(id) => *id,
            other => return Err(ExprError::NotAFact(other.to_string())),
        };
        let fact = self
            .solution
            .get(id)
            .ok_or(ExprError::DanglingFact(id))?;
        fact.fields
            .get(field)
            .cloned()
            .ok_or_else(|| ExprError::FieldOutOfRange {
                class: self.solution.describe(id),
                field,
            })
    }
}

impl Expr {
    /// Evaluates this expression.
    ///
    /// ```
    /// use std::sync::Arc;
    /// use scoreforge_core::{EvalContext, Expr, SolutionDescriptor, Value, WorkingSolution};
    ///
    /// let solution = WorkingSolution::new(Arc::new(SolutionDescriptor::new("Empty")));
    /// let row = [Value::Int(4), Value::Int(6)];
    /// let sum = Expr::element(0) + Expr::element(1);
    /// assert_eq!(sum.eval(&EvalContext::new(&row, &solution)), Ok(Value::Int(10)));
    /// ```
    pub fn eval(&self, ctx: &EvalContext<'_>) -> Result<Value> {
        match self {
            Expr::Literal(v) => Ok(v.clone()),
            Expr::Element(i) => ctx.element(*i).cloned(),
            Expr::Field { element, field } => ctx.deref_field(ctx.element(*element)?, *field),
            Expr::RefField { target, field } => ctx.deref_field(&target.eval(ctx)?, *field),

            Expr::Eq(l, r) => Ok(Value::Bool(l.eval(ctx)? == r.eval(ctx)?)),
            Expr::Ne(l, r) => Ok(Value::Bool(l.eval(ctx)? != r.eval(ctx)?)),
            Expr::Lt(l, r) => ordered("<", l, r, ctx, Ordering::is_lt),
            Expr::Le(l, r) => ordered("<=", l, r, ctx, Ordering::is_le),
            Expr::Gt(l, r) => ordered(">", l, r, ctx, Ordering::is_gt),
            Expr::Ge(l, r) => ordered(">=", l, r, ctx, Ordering::is_ge),

            Expr::And(l, r) => Ok(Value::Bool(l.eval_bool(ctx)? && r.eval_bool(ctx)?)),
            Expr::Or(l, r) => Ok(Value::Bool(l.eval_bool(ctx)? || r.eval_bool(ctx)?)),
            Expr::Not(e) => Ok(Value::Bool(!e.eval_bool(ctx)?)),

            Expr::Add(l, r) => arithmetic("+", l, r, ctx, i64::checked_add, |a, b| Some(a + b)),
            Expr::Sub(l, r) => arithmetic("-", l, r, ctx, i64::checked_sub, |a, b| Some(a - b)),
            Expr::Mul(l, r) => arithmetic("*", l, r, ctx, i64::checked_mul, |a, b| Some(a * b)),
            Expr::Div(l, r) => {
                let (a, b) = (l.eval(ctx)?, r.eval(ctx)?);
                if is_zero(&b) {
                    return Err(ExprError::DivisionByZero);
                }
                numeric("/", a, b, i64::checked_div, |a, b| Some(a / b))
            }
            Expr::Mod(l, r) => {
                let (a, b) = (l.eval(ctx)?, r.eval(ctx)?);
                if is_zero(&b) {
                    return Err(ExprError::DivisionByZero);
                }
                numeric("%", a, b, i64::checked_rem_euclid, |a, b| Some(a.rem_euclid(b)))
            }
            Expr::Neg(e) => match e.eval(ctx)? {
                Value::Int(v) => v.checked_neg().map(Value::Int).ok_or(ExprError::Overflow("-")),
                Value::Float(v) => Ok(Value::Float(-v)),
                other => Err(mismatch("-", &other)),
            },
            Expr::Abs(e) => match e.eval(ctx)? {
                Value::Int(v) => v.checked_abs().map(Value::Int).ok_or(ExprError::Overflow("abs")),
                Value::Float(v) => Ok(Value::Float(v.abs())),
                other => Err(mismatch("abs", &other)),
            },
            Expr::Min(l, r) => {
                let (a, b) = (l.eval(ctx)?, r.eval(ctx)?);
                Ok(if compare("min", &a, &b)?.is_le() { a } else { b })
            }
            Expr::Max(l, r) => {
                let (a, b) = (l.eval(ctx)?, r.eval(ctx)?);
                Ok(if compare("max", &a, &b)?.is_ge() { a } else { b })
            }

            Expr::Contains(c, v) => {
                let needle = v.eval(ctx)?;
                match c.eval(ctx)? {
                    Value::List(items) => Ok(Value::Bool(items.contains(&needle))),
                    Value::Str(s) => match needle {
                        Value::Str(n) => Ok(Value::Bool(s.contains(&*n))),
                        other => Err(mismatch("contains", &other)),
                    },
                    Value::None => Ok(Value::Bool(false)),
                    other => Err(mismatch("contains", &other)),
                }
            }
            Expr::Len(e) => match e.eval(ctx)? {
                Value::List(items) => Ok(Value::Int(items.len() as i64)),
                Value::Str(s) => Ok(Value::Int(s.chars().count() as i64)),
                Value::None => Ok(Value::Int(0)),
                other => Err(mismatch("len", &other)),
            },
            Expr::IsNone(e) => Ok(Value::Bool(e.eval(ctx)?.is_none())),
            Expr::IsNotNone(e) => Ok(Value::Bool(!e.eval(ctx)?.is_none())),
            Expr::If {
                cond,
                then_expr,
                else_expr,
            } => {
                if cond.eval_bool(ctx)? {
                    then_expr.eval(ctx)
                } else {
                    else_expr.eval(ctx)
                }
            }
        }
    }

    pub fn eval_bool(&self, ctx: &EvalContext<'_>) -> Result<bool> {
        match self.eval(ctx)? {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch("a predicate", &other)),
        }
    }

    pub fn eval_int(&self, ctx: &EvalContext<'_>) -> Result<i64> {
        match self.eval(ctx)? {
            Value::Int(v) => Ok(v),
            other => Err(mismatch("an integer context", &other)),
        }
    }
}

/// Orders two values for comparison operators. Integers and floats compare
/// numerically with each other; otherwise both sides must be the same kind.
pub(crate) fn compare(op: &'static str, a: &Value, b: &Value) -> Result<Ordering> {
    match (a, b) {
        (Value::Int(x), Value::Float(y)) => Ok((*x as f64).total_cmp(y)),
        (Value::Float(x), Value::Int(y)) => Ok(x.total_cmp(&(*y as f64))),
        (Value::None, _) | (_, Value::None) => Err(ExprError::TypeMismatch {
            op,
            found: "none".to_string(),
        }),
        _ if std::mem::discriminant(a) == std::mem::discriminant(b) => Ok(a.cmp(b)),
        _ => Err(ExprError::TypeMismatch {
            op,
            found: format!("{} and {}", a.kind(), b.kind()),
        }),
    }
}

fn ordered(
    op: &'static str,
    l: &Expr,
    r: &Expr,
    ctx: &EvalContext<'_>,
    test: fn(Ordering) -> bool,
) -> Result<Value> {
    let (a, b) = (l.eval(ctx)?, r.eval(ctx)?);
    Ok(Value::Bool(test(compare(op, &a, &b)?)))
}

fn arithmetic(
    op: &'static str,
    l: &Expr,
    r: &Expr,
    ctx: &EvalContext<'_>,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> Option<f64>,
) -> Result<Value> {
    numeric(op, l.eval(ctx)?, r.eval(ctx)?, int_op, float_op)
}

fn numeric(
    op: &'static str,
    a: Value,
    b: Value,
    int_op: fn(i64, i64) -> Option<i64>,
    float_op: fn(f64, f64) -> Option<f64>,
) -> Result<Value> {
    match (&a, &b) {
        (Value::Int(x), Value::Int(y)) => int_op(*x, *y)
            .map(Value::Int)
            .ok_or(ExprError::Overflow(op)),
        _ => match (a.as_float(), b.as_float()) {
            (Some(x), Some(y)) => float_op(x, y)
                .map(Value::Float)
                .ok_or(ExprError::Overflow(op)),
            _ => Err(ExprError::TypeMismatch {
                op,
                found: format!("{} and {}", a.kind(), b.kind()),
            }),
        },
    }
}

fn is_zero(v: &Value) -> bool {
    match v {
        Value::Int(0) => true,
        Value::Float(f) => *f == 0.0,
        _ => false,
    }
}

fn mismatch(op: &'static str, found: &Value) -> ExprError {
    ExprError::TypeMismatch {
        op,
        found: found.kind().to_string(),
    }
}
