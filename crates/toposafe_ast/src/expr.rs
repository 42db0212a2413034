//! Expression nodes (§3.2 `Expr`).
//!
//! Per Design Note §9 ("avoid replicating the overloaded-slot design"),
//! this is a genuine sum type rather than a uniform record: one
//! [`ExprKind`] variant per concrete
//! expression shape, with the handful of attributes the type checker and
//! proof checker stamp onto every node (`MType`, `ConstValue`,
//! `GlobalIdent`, `Impure`, `Suspendible`) lifted to common fields on
//! [`Expr`] itself, since every variant needs all five.
//!
//! Associative operators (`+ * & | ^ and or`) are flattened into a single
//! [`ExprKind::Associative`] node at parse time (§4.3): `a + b + c` is one
//! node with three operands, never nested `Binary` nodes. Non-associative
//! binary operators (`- / % << >> == != < <= > >=`) use
//! [`ExprKind::Binary`]. `+`/`-` additionally disambiguate unary vs.
//! binary from the previous token (§4.3); the disambiguated form is baked
//! into which `UnaryOp`/`AssocOp`/`BinaryOp` variant is chosen, so there is
//! no separate "is this unary" flag to consult downstream.

use std::cell::{Cell, RefCell};

use num_bigint::BigInt;
use toposafe_base::{Span, Symbol};

use crate::types::{ConstSlot, MType, TypeExpr, TypeSlot};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
    Not,
    Neg,
    Pos,
}

impl UnaryOp {
    pub const fn text(self) -> &'static str {
        match self {
            UnaryOp::Not => "not ",
            UnaryOp::Neg => "-",
            UnaryOp::Pos => "+",
        }
    }
}

/// Non-associative binary operators.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
    Sub,
    Div,
    Rem,
    Shl,
    Shr,
    Eq,
    Ne,
    Lt,
    Le,
    Gt,
    Ge,
}

impl BinaryOp {
    pub const fn text(self) -> &'static str {
        match self {
            BinaryOp::Sub => "-",
            BinaryOp::Div => "/",
            BinaryOp::Rem => "%",
            BinaryOp::Shl => "<<",
            BinaryOp::Shr => ">>",
            BinaryOp::Eq => "==",
            BinaryOp::Ne => "!=",
            BinaryOp::Lt => "<",
            BinaryOp::Le => "<=",
            BinaryOp::Gt => ">",
            BinaryOp::Ge => ">=",
        }
    }

    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::Eq | BinaryOp::Ne | BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge
        )
    }

    /// The negated comparison, used by the proof checker's "trivial
    /// negation of `<` to `>=`" automatic inference rule (§4.5.3).
    pub fn negated(self) -> Option<BinaryOp> {
        Some(match self {
            BinaryOp::Eq => BinaryOp::Ne,
            BinaryOp::Ne => BinaryOp::Eq,
            BinaryOp::Lt => BinaryOp::Ge,
            BinaryOp::Ge => BinaryOp::Lt,
            BinaryOp::Le => BinaryOp::Gt,
            BinaryOp::Gt => BinaryOp::Le,
            _ => return None,
        })
    }
}

/// Associative operators: may chain unparenthesized (§4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssocOp {
    Add,
    Mul,
    BitAnd,
    BitOr,
    BitXor,
    LogAnd,
    LogOr,
}

impl AssocOp {
    pub const fn text(self) -> &'static str {
        match self {
            AssocOp::Add => "+",
            AssocOp::Mul => "*",
            AssocOp::BitAnd => "&",
            AssocOp::BitOr => "|",
            AssocOp::BitXor => "^",
            AssocOp::LogAnd => "and",
            AssocOp::LogOr => "or",
        }
    }

    /// `true` for `&`/`|`/`^`, which require unsigned operands (§4.4.1).
    pub fn is_bitwise(self) -> bool {
        matches!(self, AssocOp::BitAnd | AssocOp::BitOr | AssocOp::BitXor)
    }

    pub fn is_logical(self) -> bool {
        matches!(self, AssocOp::LogAnd | AssocOp::LogOr)
    }

    /// Canonicalisation commutes operand order for these operators before
    /// structural fact comparison (§3.4, §4.5.3); all seven associative
    /// operators are in fact commutative.
    pub fn is_commutative(self) -> bool {
        true
    }
}

/// A named call argument `name: value` (§3.2 `Arg`, §4.3 "call-argument
/// keywords required").
#[derive(Debug)]
pub struct Arg<'a> {
    pub name: Symbol,
    pub value: &'a Expr<'a>,
    pub span: Span,
}

/// An expression node: common derived-attribute slots plus a
/// variant-specific [`ExprKind`].
#[derive(Debug)]
pub struct Expr<'a> {
    pub span: Span,
    pub kind: ExprKind<'a>,
    /// Filled by the type checker (§4.4.1); `None` until then.
    pub mtype: TypeSlot<'a>,
    /// Filled by the type checker when every operand is a compile-time
    /// constant (§3.2 "ConstValue").
    pub const_value: ConstSlot,
    /// `true` if this expression denotes (or is built entirely from)
    /// file-scope constants/statuses, independent of any local/parameter.
    pub global_ident: Cell<bool>,
    /// Propagated from children: `true` if evaluating this expression may
    /// call an impure (`!`) function.
    pub impure: Cell<bool>,
    /// Propagated from children: `true` if evaluating this expression may
    /// call a coroutine (`?`) function.
    pub suspendible: Cell<bool>,
}

#[derive(Debug)]
pub enum ExprKind<'a> {
    IntLiteral(BigInt),
    BoolLiteral(bool),
    /// A single (unqualified) identifier: local, parameter, global const,
    /// status, or function name.
    Ident(Symbol),
    /// `pkg.name` — a package-qualified identifier (§3.1).
    Qualified(Symbol, Symbol),
    Unary(UnaryOp, &'a Expr<'a>),
    Binary(BinaryOp, &'a Expr<'a>, &'a Expr<'a>),
    Associative(AssocOp, &'a [&'a Expr<'a>]),
    Call {
        callee: &'a Expr<'a>,
        args: &'a [Arg<'a>],
        /// `true` for `f?(...)` coroutine-call syntax (§4.4.1).
        coroutine: bool,
    },
    Index {
        base: &'a Expr<'a>,
        index: &'a Expr<'a>,
    },
    Slice {
        base: &'a Expr<'a>,
        lo: Option<&'a Expr<'a>>,
        hi: Option<&'a Expr<'a>>,
    },
    Selector {
        base: &'a Expr<'a>,
        field: Symbol,
    },
    Cast {
        operand: &'a Expr<'a>,
        ty: &'a TypeExpr<'a>,
    },
}

impl<'a> Expr<'a> {
    pub fn new(span: Span, kind: ExprKind<'a>) -> Self {
        Expr {
            span,
            kind,
            mtype: RefCell::new(None),
            const_value: RefCell::new(None),
            global_ident: Cell::new(false),
            impure: Cell::new(false),
            suspendible: Cell::new(false),
        }
    }

    pub fn mtype(&self) -> Option<MType<'a>> {
        self.mtype.borrow().clone()
    }

    pub fn set_mtype(&self, mtype: MType<'a>) {
        *self.mtype.borrow_mut() = Some(mtype);
    }

    pub fn const_value(&self) -> Option<BigInt> {
        self.const_value.borrow().clone()
    }

    pub fn set_const_value(&self, value: BigInt) {
        *self.const_value.borrow_mut() = Some(value);
    }

    /// Structural equality (§3.4 `Expr.Eq`): compares `kind` recursively,
    /// ignoring span and every derived attribute. This is the raw
    /// equality; canonicalisation (constant folding, commutativity) is a
    /// separate, proof-checker-level concern (§3.4, §4.5.3) applied
    /// before calling this.
    pub fn structural_eq(&self, other: &Expr<'a>) -> bool {
        self.kind.structural_eq(&other.kind)
    }
}

impl<'a> ExprKind<'a> {
    pub fn structural_eq(&self, other: &ExprKind<'a>) -> bool {
        use ExprKind::*;
        match (self, other) {
            (IntLiteral(a), IntLiteral(b)) => a == b,
            (BoolLiteral(a), BoolLiteral(b)) => a == b,
            (Ident(a), Ident(b)) => a == b,
            (Qualified(a0, a1), Qualified(b0, b1)) => a0 == b0 && a1 == b1,
            (Unary(op_a, a), Unary(op_b, b)) => op_a == op_b && a.structural_eq(b),
            (Binary(op_a, a0, a1), Binary(op_b, b0, b1)) => {
                op_a == op_b && a0.structural_eq(b0) && a1.structural_eq(b1)
            }
            (Associative(op_a, a), Associative(op_b, b)) => {
                op_a == op_b
                    && a.len() == b.len()
                    && a.iter().zip(b.iter()).all(|(x, y)| x.structural_eq(y))
            }
            (
                Call { callee: ca, args: aa, coroutine: coa },
                Call { callee: cb, args: ab, coroutine: cob },
            ) => {
                coa == cob
                    && ca.structural_eq(cb)
                    && aa.len() == ab.len()
                    && aa.iter().zip(ab.iter()).all(|(x, y)| {
                        x.name == y.name && x.value.structural_eq(y.value)
                    })
            }
            (
                Index { base: ba, index: ia },
                Index { base: bb, index: ib },
            ) => ba.structural_eq(bb) && ia.structural_eq(ib),
            (
                Slice { base: ba, lo: la, hi: ha },
                Slice { base: bb, lo: lb, hi: hb },
            ) => {
                ba.structural_eq(bb)
                    && opt_eq(la, lb)
                    && opt_eq(ha, hb)
            }
            (
                Selector { base: ba, field: fa },
                Selector { base: bb, field: fb },
            ) => ba.structural_eq(bb) && fa == fb,
            (
                Cast { operand: oa, ty: ta },
                Cast { operand: ob, ty: tb },
            ) => oa.structural_eq(ob) && ta.structural_eq(tb),
            _ => false,
        }
    }
}

fn opt_eq<'a>(a: &Option<&'a Expr<'a>>, b: &Option<&'a Expr<'a>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x.structural_eq(y),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toposafe_base::Span;

    fn ident(sym: Symbol) -> Expr<'static> {
        Expr::new(Span::default(), ExprKind::Ident(sym))
    }

    #[test]
    fn same_identifier_is_structurally_equal() {
        let a = ident(Symbol::EMPTY);
        let b = ident(Symbol::EMPTY);
        assert!(a.structural_eq(&b));
    }

    #[test]
    fn int_literal_compares_by_value_not_span() {
        let a = Expr::new(Span::new(0, 1), ExprKind::IntLiteral(BigInt::from(5)));
        let b = Expr::new(Span::new(9, 10), ExprKind::IntLiteral(BigInt::from(5)));
        assert!(a.structural_eq(&b));
    }

    #[test]
    fn different_literals_are_not_equal() {
        let a = Expr::new(Span::default(), ExprKind::IntLiteral(BigInt::from(5)));
        let b = Expr::new(Span::default(), ExprKind::IntLiteral(BigInt::from(6)));
        assert!(!a.structural_eq(&b));
    }

    #[test]
    fn mtype_slot_starts_empty() {
        let e = ident(Symbol::EMPTY);
        assert!(e.mtype().is_none());
    }
}
