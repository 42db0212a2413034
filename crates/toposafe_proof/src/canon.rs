//! Structural comparison, canonicalisation, and negation of facts (§3.4,
//! §4.5.2, §4.5.3, Design Note §9 item 3: "structurally equal expressions
//! differing only in... associative-argument order should be
//! canonicalised before fact equality").
//!
//! `Expr::structural_eq` (toposafe-ast) already gives raw, order-sensitive
//! equality. This module builds a canonical string key on top of it so
//! `a + b` and `b + a` hash to the same fact, and provides the
//! `not`-folding `negate` helper used when an `if`'s `else` branch starts
//! from the condition's negation.

use toposafe_ast::{AstArena, BinaryOp, Expr, ExprKind, UnaryOp};
use toposafe_base::Symbol;
use toposafe_lexer::TokenMap;

/// A deterministic string key for `e`, identical for any two expressions
/// that are equal up to commutative reordering of `Associative` operands
/// and of `==`/`!=` comparison sides. Used as the fact set's hash key
/// (Design Note §9 "a structural hash gives O(1) expected add/lookup").
pub fn key(e: &Expr<'_>, map: &TokenMap) -> String {
    let mut out = String::new();
    write_key(e, map, &mut out);
    out
}

fn write_key(e: &Expr<'_>, map: &TokenMap, out: &mut String) {
    match &e.kind {
        ExprKind::IntLiteral(n) => out.push_str(&n.to_string()),
        ExprKind::BoolLiteral(b) => out.push_str(if *b { "true" } else { "false" }),
        ExprKind::Ident(s) => out.push_str(map.resolve(*s)),
        ExprKind::Qualified(base, field) => {
            out.push_str(map.resolve(*base));
            out.push('.');
            out.push_str(map.resolve(*field));
        }
        ExprKind::Unary(op, operand) => {
            out.push_str(op.text());
            write_key(operand, map, out);
        }
        ExprKind::Binary(op, a, b) if matches!(op, BinaryOp::Eq | BinaryOp::Ne) => {
            let ka = sub_key(a, map);
            let kb = sub_key(b, map);
            let (first, second) = if ka <= kb { (ka, kb) } else { (kb, ka) };
            out.push('(');
            out.push_str(&first);
            out.push_str(op.text());
            out.push_str(&second);
            out.push(')');
        }
        ExprKind::Binary(op, a, b) => {
            out.push('(');
            write_key(a, map, out);
            out.push_str(op.text());
            write_key(b, map, out);
            out.push(')');
        }
        ExprKind::Associative(op, items) => {
            let mut parts: Vec<String> = items.iter().map(|e| sub_key(e, map)).collect();
            parts.sort();
            out.push('(');
            out.push_str(&parts.join(op.text()));
            out.push(')');
        }
        ExprKind::Call { callee, args, coroutine } => {
            write_key(callee, map, out);
            if *coroutine {
                out.push('?');
            }
            out.push('(');
            for (i, a) in args.iter().enumerate() {
                if i > 0 {
                    out.push(',');
                }
                out.push_str(map.resolve(a.name));
                out.push(':');
                write_key(a.value, map, out);
            }
            out.push(')');
        }
        ExprKind::Index { base, index } => {
            write_key(base, map, out);
            out.push('[');
            write_key(index, map, out);
            out.push(']');
        }
        ExprKind::Slice { base, lo, hi } => {
            write_key(base, map, out);
            out.push('[');
            if let Some(lo) = lo {
                write_key(lo, map, out);
            }
            out.push_str("..=");
            if let Some(hi) = hi {
                write_key(hi, map, out);
            }
            out.push(']');
        }
        ExprKind::Selector { base, field } => {
            write_key(base, map, out);
            out.push('.');
            out.push_str(map.resolve(*field));
        }
        ExprKind::Cast { operand, ty } => {
            write_key(operand, map, out);
            out.push_str(" as ");
            out.push_str(&toposafe_ast::pp_type(ty, map));
        }
    }
}

fn sub_key(e: &Expr<'_>, map: &TokenMap) -> String {
    let mut s = String::new();
    write_key(e, map, &mut s);
    s
}

/// `true` if `e` mentions the lvalue rooted at `name` anywhere in its
/// tree — as a bare identifier, as the base of a qualified/selector/index
/// chain, or nested inside any operand (§4.5.2 "remove every fact that
/// syntactically mentions `x`").
pub fn mentions(e: &Expr<'_>, name: Symbol) -> bool {
    match &e.kind {
        ExprKind::IntLiteral(_) | ExprKind::BoolLiteral(_) => false,
        ExprKind::Ident(n) => *n == name,
        ExprKind::Qualified(base, _) => *base == name,
        ExprKind::Unary(_, a) => mentions(a, name),
        ExprKind::Binary(_, a, b) => mentions(a, name) || mentions(b, name),
        ExprKind::Associative(_, items) => items.iter().any(|e| mentions(e, name)),
        ExprKind::Call { callee, args, .. } => {
            mentions(callee, name) || args.iter().any(|a| mentions(a.value, name))
        }
        ExprKind::Index { base, index } => mentions(base, name) || mentions(index, name),
        ExprKind::Slice { base, lo, hi } => {
            mentions(base, name)
                || lo.is_some_and(|e| mentions(e, name))
                || hi.is_some_and(|e| mentions(e, name))
        }
        ExprKind::Selector { base, .. } => mentions(base, name),
        ExprKind::Cast { operand, .. } => mentions(operand, name),
    }
}

/// Structural, trivial negation (§4.5.2, §4.5.3: "the checker knows `not
/// E` structurally; it does not perform general theorem proving"):
/// comparisons flip to their negated operator, `not E` unwraps to `E`,
/// boolean literals flip, and anything else is wrapped in `not (...)`.
pub fn negate<'a>(arena: &'a AstArena, e: &'a Expr<'a>) -> &'a Expr<'a> {
    match &e.kind {
        ExprKind::Unary(UnaryOp::Not, inner) => inner,
        ExprKind::BoolLiteral(b) => arena.alloc(Expr::new(e.span, ExprKind::BoolLiteral(!b))),
        ExprKind::Binary(op, a, b) if op.is_comparison() => {
            let negated_op = op.negated().expect("comparison operators always have a negation");
            arena.alloc(Expr::new(e.span, ExprKind::Binary(negated_op, a, b)))
        }
        _ => arena.alloc(Expr::new(e.span, ExprKind::Unary(UnaryOp::Not, e))),
    }
}

/// `true` when `e` is the literal `false` — used for the dead-branch rule
/// (§8.3 "Dead-code branch: `if false { assert false }` is accepted
/// because the branch body is unreachable").
pub fn is_literal_false(e: &Expr<'_>) -> bool {
    matches!(e.kind, ExprKind::BoolLiteral(false))
}
