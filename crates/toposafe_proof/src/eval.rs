//! Static interval evaluation (§4.5.3 "bound propagation... via interval
//! arithmetic", Design Note §9 "Interval arithmetic module").
//!
//! An expression's declared-type bounds are already stamped by
//! `toposafe-typeck` (`Expr::mtype().bounds`). This module only adds what
//! typeck cannot know: a bare variable's bound narrows further when a
//! single-variable relational fact (`x < 10`, `assert`ed or inferred) is
//! currently in scope. Everything else recurses structurally through the
//! same operator-to-`Interval`-method mapping typeck already uses, so an
//! obligation like `x + 1 <= 255` can be checked by comparing
//! `eval_bounds(x + 1)` against `u8`'s native range.

use num_bigint::BigInt;
use toposafe_ast::{AssocOp, BinaryOp, Expr, ExprKind};
use toposafe_base::{IntBound, Interval, Symbol};

use crate::facts::FactSet;

pub fn eval_bounds(e: &Expr<'_>, facts: &FactSet<'_>) -> Interval {
    let stamped = e.mtype().map(|m| m.bounds).unwrap_or_else(Interval::unbounded);
    match &e.kind {
        ExprKind::Ident(name) => tighten(*name, stamped, facts),
        ExprKind::Unary(toposafe_ast::UnaryOp::Neg, operand) => eval_bounds(operand, facts).negate(),
        ExprKind::Binary(op, a, b) => {
            let ba = eval_bounds(a, facts);
            let bb = eval_bounds(b, facts);
            match op {
                BinaryOp::Sub => ba.sub(&bb),
                BinaryOp::Div => ba.div(&bb),
                BinaryOp::Rem => ba.rem(&bb),
                BinaryOp::Shl => ba.shl(&bb),
                BinaryOp::Shr => ba.shr(&bb),
                _ => stamped,
            }
        }
        ExprKind::Associative(op, items) => {
            let mut iter = items.iter().map(|e| eval_bounds(e, facts));
            let first = match iter.next() {
                Some(b) => b,
                None => return stamped,
            };
            iter.fold(first, |acc, b| match op {
                AssocOp::Add => acc.add(&b),
                AssocOp::Mul => acc.mul(&b),
                AssocOp::BitAnd => acc.bitand(&b),
                AssocOp::BitOr => acc.bitor(&b),
                AssocOp::BitXor => acc.bitxor(&b),
                AssocOp::LogAnd | AssocOp::LogOr => acc,
            })
        }
        _ => stamped,
    }
}

fn mirrored(op: BinaryOp) -> BinaryOp {
    match op {
        BinaryOp::Lt => BinaryOp::Gt,
        BinaryOp::Gt => BinaryOp::Lt,
        BinaryOp::Le => BinaryOp::Ge,
        BinaryOp::Ge => BinaryOp::Le,
        other => other,
    }
}

fn is_ident(e: &Expr<'_>, name: Symbol) -> bool {
    matches!(&e.kind, ExprKind::Ident(n) if *n == name)
}

/// If `fact` relates `name` to a constant, returns `(op, value)` in the
/// normalised form "`name` `op` `value`" (mirroring the operator when the
/// variable was the right-hand operand).
fn relation_const(fact: &Expr<'_>, name: Symbol) -> Option<(BinaryOp, BigInt)> {
    if let ExprKind::Binary(op, a, b) = &fact.kind {
        if is_ident(a, name) {
            if let Some(v) = b.const_value() {
                return Some((*op, v));
            }
        }
        if is_ident(b, name) {
            if let Some(v) = a.const_value() {
                return Some((mirrored(*op), v));
            }
        }
    }
    None
}

fn tighten(name: Symbol, bounds: Interval, facts: &FactSet<'_>) -> Interval {
    let mut lo = bounds.lo.clone();
    let mut hi = bounds.hi.clone();
    for fact in facts.iter() {
        if let Some((op, v)) = relation_const(fact, name) {
            match op {
                BinaryOp::Lt => hi = hi.min(IntBound::finite(v - BigInt::from(1u8))),
                BinaryOp::Le => hi = hi.min(IntBound::finite(v)),
                BinaryOp::Eq => {
                    lo = lo.max(IntBound::finite(v.clone()));
                    hi = hi.min(IntBound::finite(v));
                }
                BinaryOp::Gt => lo = lo.max(IntBound::finite(v + BigInt::from(1u8))),
                BinaryOp::Ge => lo = lo.max(IntBound::finite(v)),
                _ => {}
            }
        }
    }
    // Contradictory facts (unreachable code under the current branch)
    // would make `lo > hi`; fall back to the untightened bound rather
    // than build an invalid `Interval`.
    if lo <= hi {
        Interval::new(lo, hi)
    } else {
        bounds
    }
}
