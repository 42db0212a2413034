//! Deterministic expression/type pretty-printer (§6.5, §8.2).
//!
//! `parse(pp(e)) == e` (modulo node identity) is a testable invariant:
//! every non-atomic subexpression is parenthesized on the way out,
//! because the grammar is flat-precedence (§4.3) and would otherwise
//! re-associate differently on the way back in. Spacing,
//! parenthesization, and the `..=` range form are normative — this is
//! not a cosmetic formatter, it is the canonical serialization the round
//! trip is checked against.

use toposafe_lexer::TokenMap;

use crate::expr::{Expr, ExprKind};
use crate::types::{BaseType, StreamKind, TypeExpr, TypeKind};

/// `true` for expression shapes that never need parenthesizing as a
/// sub-operand: they are already self-delimiting (a trailing `)`/`]`/
/// identifier, not an infix chain).
fn is_atom(e: &Expr<'_>) -> bool {
    matches!(
        e.kind,
        ExprKind::IntLiteral(_)
            | ExprKind::BoolLiteral(_)
            | ExprKind::Ident(_)
            | ExprKind::Qualified(..)
            | ExprKind::Call { .. }
            | ExprKind::Index { .. }
            | ExprKind::Slice { .. }
            | ExprKind::Selector { .. }
            | ExprKind::Cast { .. }
    )
}

fn pp_operand(e: &Expr<'_>, map: &TokenMap, out: &mut String) {
    if is_atom(e) {
        pp_expr_into(e, map, out);
    } else {
        out.push('(');
        pp_expr_into(e, map, out);
        out.push(')');
    }
}

/// Pretty-prints an expression to its normative source form.
pub fn pp_expr(e: &Expr<'_>, map: &TokenMap) -> String {
    let mut out = String::new();
    pp_expr_into(e, map, &mut out);
    out
}

fn pp_expr_into(e: &Expr<'_>, map: &TokenMap, out: &mut String) {
    match &e.kind {
        ExprKind::IntLiteral(n) => out.push_str(&n.to_string()),
        ExprKind::BoolLiteral(b) => out.push_str(if *b { "true" } else { "false" }),
        ExprKind::Ident(sym) => out.push_str(map.resolve(*sym)),
        ExprKind::Qualified(pkg, name) => {
            out.push_str(map.resolve(*pkg));
            out.push('.');
            out.push_str(map.resolve(*name));
        }
        ExprKind::Unary(op, operand) => {
            out.push_str(op.text());
            pp_operand(operand, map, out);
        }
        ExprKind::Binary(op, lhs, rhs) => {
            pp_operand(lhs, map, out);
            out.push(' ');
            out.push_str(op.text());
            out.push(' ');
            pp_operand(rhs, map, out);
        }
        ExprKind::Associative(op, operands) => {
            for (i, operand) in operands.iter().enumerate() {
                if i > 0 {
                    out.push(' ');
                    out.push_str(op.text());
                    out.push(' ');
                }
                pp_operand(operand, map, out);
            }
        }
        ExprKind::Call { callee, args, coroutine } => {
            pp_operand(callee, map, out);
            if *coroutine {
                out.push('?');
            }
            out.push('(');
            for (i, arg) in args.iter().enumerate() {
                if i > 0 {
                    out.push_str(", ");
                }
                out.push_str(map.resolve(arg.name));
                out.push_str(": ");
                pp_expr_into(arg.value, map, out);
            }
            out.push(')');
        }
        ExprKind::Index { base, index } => {
            pp_operand(base, map, out);
            out.push('[');
            pp_expr_into(index, map, out);
            out.push(']');
        }
        ExprKind::Slice { base, lo, hi } => {
            pp_operand(base, map, out);
            out.push('[');
            if let Some(lo) = lo {
                pp_expr_into(lo, map, out);
                out.push(' ');
            }
            out.push_str("..=");
            if let Some(hi) = hi {
                out.push(' ');
                pp_expr_into(hi, map, out);
            }
            out.push(']');
        }
        ExprKind::Selector { base, field } => {
            pp_operand(base, map, out);
            out.push('.');
            out.push_str(map.resolve(*field));
        }
        ExprKind::Cast { operand, ty } => {
            pp_operand(operand, map, out);
            out.push_str(" as ");
            pp_type_into(ty, map, out);
        }
    }
}

/// Pretty-prints a type expression to its normative source form:
/// `x as T`, `T[lo ..= hi]`, `array[N] T`, `ptr T`, `slice T`.
pub fn pp_type(t: &TypeExpr<'_>, map: &TokenMap) -> String {
    let mut out = String::new();
    pp_type_into(t, map, &mut out);
    out
}

fn base_text(b: BaseType) -> &'static str {
    b.text()
}

fn stream_text(kind: StreamKind) -> &'static str {
    match kind {
        StreamKind::Bytes => "reader",
        StreamKind::Tokens => "reader[token]",
    }
}

fn pp_type_into(t: &TypeExpr<'_>, map: &TokenMap, out: &mut String) {
    match &t.kind {
        TypeKind::Base(b) => out.push_str(base_text(*b)),
        TypeKind::Ideal => out.push('\u{2124}'),
        TypeKind::Array { size, elem } => {
            out.push_str("array[");
            pp_expr_into(size, map, out);
            out.push_str("] ");
            pp_type_into(elem, map, out);
        }
        TypeKind::Ptr(inner) => {
            out.push_str("ptr ");
            pp_type_into(inner, map, out);
        }
        TypeKind::Nptr(inner) => {
            out.push_str("nptr ");
            pp_type_into(inner, map, out);
        }
        TypeKind::Slice(inner) => {
            out.push_str("slice ");
            pp_type_into(inner, map, out);
        }
        TypeKind::Reader(kind) => out.push_str(stream_text(*kind)),
        TypeKind::Writer(kind) => {
            out.push_str("writer");
            if matches!(kind, StreamKind::Tokens) {
                out.push_str("[token]");
            }
        }
        TypeKind::Struct(name) => out.push_str(map.resolve(*name)),
        TypeKind::Refined { base, lo, hi } => {
            pp_type_into(base, map, out);
            out.push('[');
            if let Some(lo) = lo {
                pp_expr_into(lo, map, out);
                out.push(' ');
            }
            out.push_str("..=");
            if let Some(hi) = hi {
                out.push(' ');
                pp_expr_into(hi, map, out);
            }
            out.push(']');
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use num_bigint::BigInt;
    use toposafe_base::Span;

    use crate::expr::{AssocOp, BinaryOp};

    #[test]
    fn associative_chain_has_no_parens() {
        let mut map = TokenMap::new();
        let x = map.intern("x");
        let y = map.intern("y");
        let z = map.intern("z");
        let ex = Expr::new(Span::default(), ExprKind::Ident(x));
        let ey = Expr::new(Span::default(), ExprKind::Ident(y));
        let ez = Expr::new(Span::default(), ExprKind::Ident(z));
        let operands: Vec<&Expr> = vec![&ex, &ey, &ez];
        let sum = Expr::new(
            Span::default(),
            ExprKind::Associative(AssocOp::Add, &operands),
        );
        assert_eq!(pp_expr(&sum, &map), "x + y + z");
    }

    #[test]
    fn nested_associative_inside_binary_is_parenthesized() {
        let mut map = TokenMap::new();
        let a = map.intern("a");
        let b = map.intern("b");
        let c = map.intern("c");
        let ea = Expr::new(Span::default(), ExprKind::Ident(a));
        let eb = Expr::new(Span::default(), ExprKind::Ident(b));
        let ec = Expr::new(Span::default(), ExprKind::Ident(c));
        let operands: Vec<&Expr> = vec![&ea, &eb];
        let sum = Expr::new(
            Span::default(),
            ExprKind::Associative(AssocOp::Add, &operands),
        );
        let diff = Expr::new(
            Span::default(),
            ExprKind::Binary(BinaryOp::Sub, &sum, &ec),
        );
        assert_eq!(pp_expr(&diff, &map), "(a + b) - c");
    }

    #[test]
    fn cast_prints_as_form() {
        let mut map = TokenMap::new();
        let x = map.intern("x");
        let ex = Expr::new(Span::default(), ExprKind::Ident(x));
        let ty = TypeExpr::new(Span::default(), TypeKind::Base(BaseType::U8));
        let cast = Expr::new(
            Span::default(),
            ExprKind::Cast { operand: &ex, ty: &ty },
        );
        assert_eq!(pp_expr(&cast, &map), "x as u8");
    }

    #[test]
    fn refined_type_one_sided_lower() {
        let map = TokenMap::new();
        let base = TypeExpr::new(Span::default(), TypeKind::Base(BaseType::U32));
        let lo = Expr::new(Span::default(), ExprKind::IntLiteral(BigInt::from(0)));
        let refined = TypeExpr::new(
            Span::default(),
            TypeKind::Refined { base: &base, lo: Some(&lo), hi: None },
        );
        assert_eq!(pp_type(&refined, &map), "u32[0 ..=]");
    }

    #[test]
    fn array_type_reads_left_to_right() {
        let map = TokenMap::new();
        let elem = TypeExpr::new(Span::default(), TypeKind::Base(BaseType::U8));
        let size = Expr::new(Span::default(), ExprKind::IntLiteral(BigInt::from(4)));
        let arr = TypeExpr::new(
            Span::default(),
            TypeKind::Array { size: &size, elem: &elem },
        );
        let ptr = TypeExpr::new(Span::default(), TypeKind::Ptr(&arr));
        assert_eq!(pp_type(&ptr, &map), "ptr array[4] u8");
    }
}
