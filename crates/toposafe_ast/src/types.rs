//! Type expressions (§3.3, §3.2 `TypeExpr`).
//!
//! A [`TypeExpr`] is read left-to-right, matching §4.3's "types read
//! left-to-right" parser rule: `ptr [N] T` is a pointer to an N-element
//! array of `T`, built as `TypeKind::Ptr(&TypeExpr::Array { .. })`.
//! Refinement bounds (`T[lo ..= hi]`) wrap any base integer type and carry
//! their own span so a failed-to-discharge assignment obligation can point
//! at the declared bound, not just the whole type.

use std::cell::RefCell;

use num_bigint::BigInt;
use toposafe_base::{Interval, Span, Symbol};

use crate::expr::Expr;

/// The eight primitive integer types plus `bool` and `status`, exactly
/// §3.3's primitive list.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BaseType {
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Bool,
    Status,
}

impl BaseType {
    pub const fn text(self) -> &'static str {
        match self {
            BaseType::U8 => "u8",
            BaseType::U16 => "u16",
            BaseType::U32 => "u32",
            BaseType::U64 => "u64",
            BaseType::I8 => "i8",
            BaseType::I16 => "i16",
            BaseType::I32 => "i32",
            BaseType::I64 => "i64",
            BaseType::Bool => "bool",
            BaseType::Status => "status",
        }
    }

    pub fn is_numeric(self) -> bool {
        !matches!(self, BaseType::Bool | BaseType::Status)
    }

    pub fn is_signed(self) -> bool {
        matches!(
            self,
            BaseType::I8 | BaseType::I16 | BaseType::I32 | BaseType::I64
        )
    }

    pub fn width_bits(self) -> Option<u32> {
        match self {
            BaseType::U8 | BaseType::I8 => Some(8),
            BaseType::U16 | BaseType::I16 => Some(16),
            BaseType::U32 | BaseType::I32 => Some(32),
            BaseType::U64 | BaseType::I64 => Some(64),
            BaseType::Bool | BaseType::Status => None,
        }
    }

    /// `TypeBounds(T)` of §3.3: the full representable range of the
    /// unrefined base type.
    pub fn native_bounds(self) -> Interval {
        match self.width_bits() {
            Some(w) if self.is_signed() => {
                let half = BigInt::from(1u8) << (w - 1);
                Interval::new(
                    toposafe_base::IntBound::finite(-&half),
                    toposafe_base::IntBound::finite(half - BigInt::from(1u8)),
                )
            }
            Some(w) => Interval::new(
                toposafe_base::IntBound::finite(BigInt::from(0u8)),
                toposafe_base::IntBound::finite((BigInt::from(1u8) << w) - BigInt::from(1u8)),
            ),
            None => Interval::unbounded(),
        }
    }
}

/// Whether a `reader`/`writer` I/O stream operates over raw bytes or over
/// an already-tokenized stream (§3.3 "reader/writer of bytes or tokens").
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum StreamKind {
    Bytes,
    Tokens,
}

/// A type expression, carrying its own span for diagnostics (§3.1
/// ambient addition, SPEC_FULL §3.1).
#[derive(Debug)]
pub struct TypeExpr<'a> {
    pub span: Span,
    pub kind: TypeKind<'a>,
}

#[derive(Debug)]
pub enum TypeKind<'a> {
    Base(BaseType),
    /// The ideal (unbounded) integer type ℤ, the ambient type of literals
    /// and of arithmetic inside assertions. Never appears in source
    /// syntax; only the type checker manufactures it.
    Ideal,
    Array {
        size: &'a Expr<'a>,
        elem: &'a TypeExpr<'a>,
    },
    Ptr(&'a TypeExpr<'a>),
    Nptr(&'a TypeExpr<'a>),
    Slice(&'a TypeExpr<'a>),
    Reader(StreamKind),
    Writer(StreamKind),
    /// A reference to a user-declared struct by name; resolved to the
    /// declaration by the type checker.
    Struct(Symbol),
    /// `T[lo ..= hi]`; either bound may be omitted (one-sided form).
    Refined {
        base: &'a TypeExpr<'a>,
        lo: Option<&'a Expr<'a>>,
        hi: Option<&'a Expr<'a>>,
    },
}

impl<'a> TypeExpr<'a> {
    pub fn new(span: Span, kind: TypeKind<'a>) -> Self {
        TypeExpr { span, kind }
    }

    pub fn is_refined(&self) -> bool {
        matches!(self.kind, TypeKind::Refined { .. })
    }

    /// Strips a `Refined` wrapper down to its base type, following §3.3's
    /// `EqIgnoringRefinements`.
    pub fn unrefined(&'a self) -> &'a TypeExpr<'a> {
        match &self.kind {
            TypeKind::Refined { base, .. } => base.unrefined(),
            _ => self,
        }
    }

    /// Structural equality including refinement bounds, per §3.3: "Two
    /// types are equal iff their decorators, names, and (array or
    /// refinement) bounds match structurally."
    pub fn structural_eq(&self, other: &TypeExpr<'a>) -> bool {
        match (&self.kind, &other.kind) {
            (TypeKind::Base(a), TypeKind::Base(b)) => a == b,
            (TypeKind::Ideal, TypeKind::Ideal) => true,
            (
                TypeKind::Array { size: sa, elem: ea },
                TypeKind::Array { size: sb, elem: eb },
            ) => sa.structural_eq(sb) && ea.structural_eq(eb),
            (TypeKind::Ptr(a), TypeKind::Ptr(b)) => a.structural_eq(b),
            (TypeKind::Nptr(a), TypeKind::Nptr(b)) => a.structural_eq(b),
            (TypeKind::Slice(a), TypeKind::Slice(b)) => a.structural_eq(b),
            (TypeKind::Reader(a), TypeKind::Reader(b)) => a == b,
            (TypeKind::Writer(a), TypeKind::Writer(b)) => a == b,
            (TypeKind::Struct(a), TypeKind::Struct(b)) => a == b,
            (
                TypeKind::Refined { base: ba, lo: la, hi: ha },
                TypeKind::Refined { base: bb, lo: lb, hi: hb },
            ) => {
                ba.structural_eq(bb)
                    && opt_expr_eq(la, lb)
                    && opt_expr_eq(ha, hb)
            }
            _ => false,
        }
    }

    /// `EqIgnoringRefinements` (§3.3): structural equality that strips
    /// both sides' `Refined` wrappers before comparing.
    pub fn eq_ignoring_refinements(&'a self, other: &'a TypeExpr<'a>) -> bool {
        self.unrefined().structural_eq(other.unrefined())
    }
}

fn opt_expr_eq<'a>(a: &Option<&'a Expr<'a>>, b: &Option<&'a Expr<'a>>) -> bool {
    match (a, b) {
        (None, None) => true,
        (Some(x), Some(y)) => x.structural_eq(y),
        _ => false,
    }
}

/// The checker's canonical, fully-realised type for an expression (§3.2
/// "MType"): a structural type together with the numeric bounds it
/// carries (an implicit fact per §4.5.3, unused/full for non-numeric
/// types).
#[derive(Debug, Clone)]
pub struct MType<'a> {
    pub ty: &'a TypeExpr<'a>,
    pub bounds: Interval,
}

impl<'a> MType<'a> {
    pub fn new(ty: &'a TypeExpr<'a>, bounds: Interval) -> Self {
        MType { ty, bounds }
    }

    pub fn is_numeric(&self) -> bool {
        match &self.ty.kind {
            TypeKind::Base(b) => b.is_numeric(),
            TypeKind::Ideal => true,
            TypeKind::Refined { base, .. } => matches!(
                &base.kind,
                TypeKind::Base(b) if b.is_numeric()
            ) || matches!(&base.kind, TypeKind::Ideal),
            _ => false,
        }
    }
}

/// A `RefCell`-guarded derived attribute slot, shared by every expression
/// node (§3.2: "Per-expression derived attributes filled by the type
/// checker"). Plain `Cell`/`RefCell` rather than an external side table:
/// nodes are arena-allocated and shared by reference, so stamping a
/// derived attribute after the fact needs interior mutability regardless
/// of representation.
pub type TypeSlot<'a> = RefCell<Option<MType<'a>>>;
pub type ConstSlot = RefCell<Option<BigInt>>;
