//! Declared-type validation and static bound computation (§3.3, §4.4.1).
//!
//! [`check_type`] walks a [`TypeExpr`] validating every `Struct` name it
//! mentions resolves, and returns the static [`Interval`] a value of that
//! type is known to lie in ahead of any runtime fact. For most shapes that
//! is just the base type's native range; a `Refined` bound whose `lo`/`hi`
//! expression is itself compile-time constant narrows it. A bound that
//! depends on a parameter or local (common for length-prefixed arrays in
//! this DSL, e.g. `u32[0 ..= n]`) cannot be folded here — it falls back to
//! the base type's native range, which is sound; the proof checker (not
//! this crate) tracks the symbolic relationship via facts.

use toposafe_ast::{AstArena, BaseType, TypeExpr, TypeKind};
use toposafe_base::{IntBound, Interval};
use toposafe_lexer::TokenMap;

use crate::env::{GlobalEnv, LocalScope};
use crate::error::{Result, TypeError};
use crate::expr::infer_expr;

pub fn check_type<'a>(
    ty: &'a TypeExpr<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<Interval> {
    match &ty.kind {
        TypeKind::Base(b) => Ok(b.native_bounds()),
        TypeKind::Ideal => Ok(Interval::unbounded()),
        TypeKind::Array { size, elem } => {
            infer_expr(size, genv, scope, arena, map)?;
            check_type(elem, genv, scope, arena, map)?;
            Ok(Interval::unbounded())
        }
        TypeKind::Ptr(inner) | TypeKind::Nptr(inner) | TypeKind::Slice(inner) => {
            check_type(inner, genv, scope, arena, map)?;
            Ok(Interval::unbounded())
        }
        TypeKind::Reader(_) | TypeKind::Writer(_) => Ok(Interval::unbounded()),
        TypeKind::Struct(name) => {
            if genv.structs.contains_key(name) {
                Ok(Interval::unbounded())
            } else {
                Err(TypeError::UnknownType { name: map.resolve(*name).to_string(), span: ty.span })
            }
        }
        TypeKind::Refined { base, lo, hi } => {
            let base_bounds = check_type(base, genv, scope, arena, map)?;
            let lo_bound = match lo {
                Some(e) => {
                    infer_expr(e, genv, scope, arena, map)?;
                    const_bound(e).unwrap_or_else(|| base_bounds.lo.clone())
                }
                None => base_bounds.lo.clone(),
            };
            let hi_bound = match hi {
                Some(e) => {
                    infer_expr(e, genv, scope, arena, map)?;
                    const_bound(e).unwrap_or_else(|| base_bounds.hi.clone())
                }
                None => base_bounds.hi.clone(),
            };
            if lo_bound <= hi_bound {
                Ok(Interval::new(lo_bound, hi_bound))
            } else {
                Ok(base_bounds)
            }
        }
    }
}

fn const_bound(e: &toposafe_ast::Expr<'_>) -> Option<IntBound> {
    e.const_value().map(IntBound::Finite)
}

/// `MType::is_numeric` restricted to a `BaseType`, used when the type
/// checker needs to name "numeric"/"unsigned" in a diagnostic.
pub fn is_unsigned_base(b: BaseType) -> bool {
    !b.is_signed()
}

pub fn alloc_base<'a>(arena: &'a AstArena, span: toposafe_base::Span, b: BaseType) -> &'a TypeExpr<'a> {
    arena.alloc(TypeExpr::new(span, TypeKind::Base(b)))
}

pub fn alloc_ideal<'a>(arena: &'a AstArena, span: toposafe_base::Span) -> &'a TypeExpr<'a> {
    arena.alloc(TypeExpr::new(span, TypeKind::Ideal))
}
