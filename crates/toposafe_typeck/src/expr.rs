//! Expression type inference and constant folding (§4.4.1).
//!
//! [`infer_expr`] walks an [`Expr`] bottom-up, stamping its `mtype` slot
//! with the resulting [`MType`], its `const_value` slot when every operand
//! folds to a literal, and the `global_ident`/`impure`/`suspendible` flags
//! the proof checker consumes later (§9 Open Question 1's aliasing rule).
//! It never mutates the fact set — that is the proof checker's concern —
//! it only establishes that an expression is well-typed and what its
//! static numeric envelope is.

use num_bigint::BigInt;

use toposafe_ast::{
    Arg, AssocOp, AstArena, BaseType, BinaryOp, Expr, ExprKind, MType, TypeExpr, TypeKind, UnaryOp,
};
use toposafe_base::{Interval, Span, Symbol};
use toposafe_lexer::TokenMap;

use crate::env::{GlobalEnv, LocalScope};
use crate::error::{Result, TypeError};
use crate::types::{alloc_base, check_type};

/// Infers and stamps the type of `expr`, returning it for the caller's own
/// use (e.g. checking an assignment's RHS against its LHS).
pub fn infer_expr<'a>(
    expr: &'a Expr<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    let mtype = infer_kind(expr, genv, scope, arena, map)?;
    expr.set_mtype(mtype.clone());
    Ok(mtype)
}

fn infer_kind<'a>(
    expr: &'a Expr<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    match &expr.kind {
        ExprKind::IntLiteral(n) => {
            expr.set_const_value(n.clone());
            expr.global_ident.set(true);
            Ok(MType::new(alloc_ideal_here(arena, expr.span), Interval::point(n.clone())))
        }
        ExprKind::BoolLiteral(_) => {
            expr.global_ident.set(true);
            Ok(MType::new(alloc_base(arena, expr.span, BaseType::Bool), Interval::unbounded()))
        }
        ExprKind::Ident(name) => infer_ident(expr, *name, genv, scope, arena, map),
        ExprKind::Qualified(base, field) => {
            infer_qualified_value(expr, *base, *field, genv, scope, arena, map)
        }
        ExprKind::Unary(op, operand) => infer_unary(expr, *op, operand, genv, scope, arena, map),
        ExprKind::Binary(op, a, b) => infer_binary(expr, *op, a, b, genv, scope, arena, map),
        ExprKind::Associative(op, items) => infer_assoc(expr, *op, items, genv, scope, arena, map),
        ExprKind::Call { callee, args, coroutine } => {
            infer_call(expr, callee, args, *coroutine, genv, scope, arena, map)
        }
        ExprKind::Index { base, index } => infer_index(expr, base, index, genv, scope, arena, map),
        ExprKind::Slice { base, lo, hi } => infer_slice(expr, base, *lo, *hi, genv, scope, arena, map),
        ExprKind::Selector { base, field } => infer_selector(expr, base, *field, genv, scope, arena, map),
        ExprKind::Cast { operand, ty } => infer_cast(expr, operand, ty, genv, scope, arena, map),
    }
}

fn alloc_ideal_here<'a>(arena: &'a AstArena, span: Span) -> &'a TypeExpr<'a> {
    arena.alloc(TypeExpr::new(span, TypeKind::Ideal))
}

/// Resolves a bare identifier to the value it names: a local/parameter, a
/// global const, or a status. Function names are never first-class values
/// in this DSL (only callable in `Call.callee` position, handled there).
fn resolve_value<'a>(
    name: Symbol,
    genv: &GlobalEnv<'a>,
    scope: &LocalScope<'a>,
    arena: &'a AstArena,
) -> Option<(MType<'a>, bool)> {
    if let Some(mtype) = scope.lookup(name) {
        return Some((mtype, false));
    }
    if let Some(c) = genv.consts.get(&name) {
        return Some((MType::new(c.ty, Interval::unbounded()), true));
    }
    if genv.statuses.contains_key(&name) {
        return Some((
            MType::new(alloc_base(arena, Span::default(), BaseType::Status), Interval::unbounded()),
            true,
        ));
    }
    None
}

fn infer_ident<'a>(
    expr: &'a Expr<'a>,
    name: Symbol,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    match resolve_value(name, genv, scope, arena) {
        Some((mtype, is_global)) => {
            expr.global_ident.set(is_global);
            Ok(mtype)
        }
        None => Err(TypeError::UnknownIdentifier { name: map.resolve(name).to_string(), span: expr.span }),
    }
}

/// `pkg.name`: reinterpreted per §4.4.1 as either a struct-field selector
/// on an already-bound value named `pkg`, or an opaque external reference
/// when `pkg` names a `use`d package instead (no cross-file symbol table
/// exists for this single-file check, so that case is trusted rather than
/// verified — see DESIGN.md).
fn infer_qualified_value<'a>(
    expr: &'a Expr<'a>,
    base: Symbol,
    field: Symbol,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    if let Some((base_mtype, is_global)) = resolve_value(base, genv, scope, arena) {
        let result = select_struct_field(&base_mtype, field, expr.span, genv, scope, arena, map)?;
        expr.global_ident.set(is_global);
        return Ok(result);
    }
    if genv.known_packages.contains(&base) {
        expr.global_ident.set(true);
        return Ok(MType::new(alloc_ideal_here(arena, expr.span), Interval::unbounded()));
    }
    Err(TypeError::UnknownIdentifier { name: map.resolve(base).to_string(), span: expr.span })
}

fn select_struct_field<'a>(
    base: &MType<'a>,
    field: Symbol,
    span: Span,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    let struct_name = match &base.ty.kind {
        TypeKind::Struct(name) => *name,
        _ => return Err(TypeError::NotAStruct { span }),
    };
    let s = genv.structs.get(&struct_name).ok_or(TypeError::NotAStruct { span })?;
    let f = s
        .fields
        .iter()
        .find(|f| f.name == field)
        .ok_or_else(|| TypeError::UnknownField { name: map.resolve(field).to_string(), span })?;
    let bounds = check_type(f.ty, genv, scope, arena, map)?;
    Ok(MType::new(f.ty, bounds))
}

fn infer_unary<'a>(
    expr: &'a Expr<'a>,
    op: UnaryOp,
    operand: &'a Expr<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    let m = infer_expr(operand, genv, scope, arena, map)?;
    propagate_flags(expr, &[operand]);
    match op {
        UnaryOp::Not => {
            require_bool(&m, operand.span)?;
            Ok(MType::new(alloc_base(arena, expr.span, BaseType::Bool), Interval::unbounded()))
        }
        UnaryOp::Neg => {
            require_numeric(&m, operand.span)?;
            if let Some(v) = operand.const_value() {
                expr.set_const_value(-v);
            }
            Ok(MType::new(m.ty, m.bounds.negate()))
        }
        UnaryOp::Pos => {
            require_numeric(&m, operand.span)?;
            if let Some(v) = operand.const_value() {
                expr.set_const_value(v);
            }
            Ok(m)
        }
    }
}

fn infer_binary<'a>(
    expr: &'a Expr<'a>,
    op: BinaryOp,
    a: &'a Expr<'a>,
    b: &'a Expr<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    let ma = infer_expr(a, genv, scope, arena, map)?;
    let mb = infer_expr(b, genv, scope, arena, map)?;
    propagate_flags(expr, &[a, b]);

    if matches!(op, BinaryOp::Eq | BinaryOp::Ne)
        && matches!(ma.ty.kind, TypeKind::Base(BaseType::Bool))
        && matches!(mb.ty.kind, TypeKind::Base(BaseType::Bool))
    {
        return Ok(MType::new(alloc_base(arena, expr.span, BaseType::Bool), Interval::unbounded()));
    }

    require_numeric(&ma, a.span)?;
    require_numeric(&mb, b.span)?;
    let unified = unify_numeric(&ma, &mb, expr.span)?;

    let result = match op {
        BinaryOp::Sub => MType::new(unified, ma.bounds.sub(&mb.bounds)),
        BinaryOp::Div => MType::new(unified, ma.bounds.div(&mb.bounds)),
        BinaryOp::Rem => MType::new(unified, ma.bounds.rem(&mb.bounds)),
        BinaryOp::Shl => MType::new(ma.ty, ma.bounds.shl(&mb.bounds)),
        BinaryOp::Shr => MType::new(ma.ty, ma.bounds.shr(&mb.bounds)),
        BinaryOp::Eq
        | BinaryOp::Ne
        | BinaryOp::Lt
        | BinaryOp::Le
        | BinaryOp::Gt
        | BinaryOp::Ge => MType::new(alloc_base(arena, expr.span, BaseType::Bool), Interval::unbounded()),
    };

    if let (Some(va), Some(vb)) = (a.const_value(), b.const_value()) {
        if let Some(folded) = fold_binary(op, &va, &vb) {
            expr.set_const_value(folded);
        }
    }

    Ok(result)
}

fn fold_binary(op: BinaryOp, a: &BigInt, b: &BigInt) -> Option<BigInt> {
    use num_traits::Zero;
    Some(match op {
        BinaryOp::Sub => a - b,
        BinaryOp::Div if !b.is_zero() => a / b,
        BinaryOp::Rem if !b.is_zero() => a % b,
        _ => return None,
    })
}

fn infer_assoc<'a>(
    expr: &'a Expr<'a>,
    op: AssocOp,
    items: &'a [&'a Expr<'a>],
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    let mtypes: Vec<MType<'a>> = items
        .iter()
        .map(|e| infer_expr(e, genv, scope, arena, map))
        .collect::<Result<_>>()?;
    propagate_flags(expr, items);

    if op.is_logical() {
        for (e, m) in items.iter().zip(mtypes.iter()) {
            require_bool(m, e.span)?;
        }
        return Ok(MType::new(alloc_base(arena, expr.span, BaseType::Bool), Interval::unbounded()));
    }

    for (e, m) in items.iter().zip(mtypes.iter()) {
        require_numeric(m, e.span)?;
    }
    if op.is_bitwise() {
        for (e, m) in items.iter().zip(mtypes.iter()) {
            require_unsigned(m, e.span)?;
        }
    }

    let mut acc_ty = mtypes[0].ty;
    let mut acc_bounds = mtypes[0].bounds.clone();
    for m in &mtypes[1..] {
        acc_ty = unify_numeric(&MType::new(acc_ty, acc_bounds.clone()), m, expr.span)?;
        acc_bounds = match op {
            AssocOp::Add => acc_bounds.add(&m.bounds),
            AssocOp::Mul => acc_bounds.mul(&m.bounds),
            AssocOp::BitAnd => acc_bounds.bitand(&m.bounds),
            AssocOp::BitOr => acc_bounds.bitor(&m.bounds),
            AssocOp::BitXor => acc_bounds.bitxor(&m.bounds),
            AssocOp::LogAnd | AssocOp::LogOr => unreachable!("handled above"),
        };
    }

    if let Some(folded) = fold_assoc(op, items) {
        expr.set_const_value(folded);
    }

    Ok(MType::new(acc_ty, acc_bounds))
}

fn fold_assoc(op: AssocOp, items: &[&Expr<'_>]) -> Option<BigInt> {
    let mut values = Vec::with_capacity(items.len());
    for e in items {
        values.push(e.const_value()?);
    }
    let mut iter = values.into_iter();
    let mut acc = iter.next()?;
    for v in iter {
        acc = match op {
            AssocOp::Add => acc + v,
            AssocOp::Mul => acc * v,
            AssocOp::BitAnd => acc & v,
            AssocOp::BitOr => acc | v,
            AssocOp::BitXor => acc ^ v,
            AssocOp::LogAnd | AssocOp::LogOr => return None,
        };
    }
    Some(acc)
}

fn infer_call<'a>(
    expr: &'a Expr<'a>,
    callee: &'a Expr<'a>,
    args: &'a [Arg<'a>],
    coroutine: bool,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    let func = resolve_callee(callee, genv, scope, arena, map)?;

    if func.suspendible != coroutine {
        return Err(TypeError::CoroutineSyntaxMismatch { span: expr.span });
    }

    let mut seen = std::collections::HashSet::new();
    for arg in args {
        if !seen.insert(arg.name) {
            return Err(TypeError::DuplicateArgument {
                name: map.resolve(arg.name).to_string(),
                span: arg.span,
            });
        }
        let param = func
            .in_params
            .iter()
            .find(|p| p.name == arg.name)
            .ok_or_else(|| TypeError::UnknownArgument {
                name: map.resolve(arg.name).to_string(),
                span: arg.span,
            })?;
        let value_mtype = infer_expr(arg.value, genv, scope, arena, map)?;
        check_assignable(&value_mtype, param.ty, arg.span, map)?;
    }
    for param in func.in_params {
        if !seen.contains(&param.name) {
            return Err(TypeError::MissingArgument {
                name: map.resolve(param.name).to_string(),
                span: expr.span,
            });
        }
    }

    expr.impure.set(expr.impure.get() || func.impure);
    expr.suspendible.set(expr.suspendible.get() || func.suspendible);

    match func.out_params.first() {
        Some(out) => {
            let bounds = check_type(out.ty, genv, scope, arena, map)?;
            Ok(MType::new(out.ty, bounds))
        }
        None => Ok(MType::new(alloc_base(arena, expr.span, BaseType::Bool), Interval::unbounded())),
    }
}

fn resolve_callee<'a>(
    callee: &'a Expr<'a>,
    genv: &GlobalEnv<'a>,
    scope: &LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<&'a toposafe_ast::Func<'a>> {
    match &callee.kind {
        ExprKind::Ident(name) => genv
            .lookup_func(None, *name)
            .ok_or(TypeError::NotCallable { span: callee.span }),
        ExprKind::Qualified(base, name) => {
            if resolve_value(*base, genv, scope, arena).is_some() {
                return Err(TypeError::NotCallable { span: callee.span });
            }
            genv.lookup_func(Some(*base), *name)
                .or_else(|| genv.lookup_func(None, *name))
                .ok_or(TypeError::NotCallable { span: callee.span })
        }
        ExprKind::Selector { base: _, field } => {
            genv.funcs
                .values()
                .find(|f| f.receiver.is_some() && f.name == *field)
                .copied()
                .ok_or(TypeError::NotCallable { span: callee.span })
        }
        _ => Err(TypeError::NotCallable { span: callee.span }),
    }
}

fn infer_index<'a>(
    expr: &'a Expr<'a>,
    base: &'a Expr<'a>,
    index: &'a Expr<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    let mbase = infer_expr(base, genv, scope, arena, map)?;
    let midx = infer_expr(index, genv, scope, arena, map)?;
    propagate_flags(expr, &[base, index]);
    require_numeric(&midx, index.span)?;
    element_type(&mbase, expr.span, genv, scope, arena, map)
}

fn infer_slice<'a>(
    expr: &'a Expr<'a>,
    base: &'a Expr<'a>,
    lo: Option<&'a Expr<'a>>,
    hi: Option<&'a Expr<'a>>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    let mbase = infer_expr(base, genv, scope, arena, map)?;
    let mut flagged = vec![base];
    if let Some(lo) = lo {
        let m = infer_expr(lo, genv, scope, arena, map)?;
        require_numeric(&m, lo.span)?;
        flagged.push(lo);
    }
    if let Some(hi) = hi {
        let m = infer_expr(hi, genv, scope, arena, map)?;
        require_numeric(&m, hi.span)?;
        flagged.push(hi);
    }
    propagate_flags(expr, &flagged);
    let elem = element_type(&mbase, expr.span, genv, scope, arena, map)?;
    let slice_ty = arena.alloc(TypeExpr::new(expr.span, TypeKind::Slice(elem.ty)));
    Ok(MType::new(slice_ty, Interval::unbounded()))
}

fn element_type<'a>(
    base: &MType<'a>,
    span: Span,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    let inner = match &base.ty.kind {
        TypeKind::Array { elem, .. } => *elem,
        TypeKind::Slice(elem) => *elem,
        TypeKind::Ptr(inner) | TypeKind::Nptr(inner) => match &inner.kind {
            TypeKind::Array { elem, .. } => *elem,
            TypeKind::Slice(elem) => *elem,
            _ => return Err(TypeError::NotIndexable { span }),
        },
        _ => return Err(TypeError::NotIndexable { span }),
    };
    let bounds = check_type(inner, genv, scope, arena, map)?;
    Ok(MType::new(inner, bounds))
}

fn infer_selector<'a>(
    expr: &'a Expr<'a>,
    base: &'a Expr<'a>,
    field: Symbol,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    let mbase = infer_expr(base, genv, scope, arena, map)?;
    propagate_flags(expr, &[base]);
    let struct_name = match &mbase.ty.kind {
        TypeKind::Struct(name) => *name,
        _ => return Err(TypeError::NotAStruct { span: expr.span }),
    };
    let s = genv.structs.get(&struct_name).ok_or(TypeError::NotAStruct { span: expr.span })?;
    let f = s
        .fields
        .iter()
        .find(|f| f.name == field)
        .ok_or_else(|| TypeError::UnknownField { name: map.resolve(field).to_string(), span: expr.span })?;
    let bounds = check_type(f.ty, genv, scope, arena, map)?;
    Ok(MType::new(f.ty, bounds))
}

fn infer_cast<'a>(
    expr: &'a Expr<'a>,
    operand: &'a Expr<'a>,
    ty: &'a TypeExpr<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<MType<'a>> {
    let moperand = infer_expr(operand, genv, scope, arena, map)?;
    propagate_flags(expr, &[operand]);
    require_numeric(&moperand, operand.span)?;
    let bounds = check_type(ty, genv, scope, arena, map)?;
    let target_numeric = matches!(
        ty.unrefined().kind,
        TypeKind::Base(b) if b.is_numeric()
    ) || matches!(ty.unrefined().kind, TypeKind::Ideal);
    if !target_numeric {
        return Err(TypeError::TypeMismatch {
            expected: "a numeric cast target".to_string(),
            found: format!("{:?}", ty.kind),
            span: ty.span,
        });
    }
    Ok(MType::new(ty, bounds))
}

fn propagate_flags<'a>(expr: &Expr<'a>, children: &[&Expr<'a>]) {
    let mut global = true;
    let mut impure = false;
    let mut suspendible = false;
    for c in children {
        global &= c.global_ident.get();
        impure |= c.impure.get();
        suspendible |= c.suspendible.get();
    }
    expr.global_ident.set(global && !children.is_empty());
    expr.impure.set(expr.impure.get() || impure);
    expr.suspendible.set(expr.suspendible.get() || suspendible);
}

fn require_bool(m: &MType<'_>, span: Span) -> Result<()> {
    if matches!(m.ty.kind, TypeKind::Base(BaseType::Bool)) {
        Ok(())
    } else {
        Err(TypeError::TypeMismatch { expected: "bool".to_string(), found: format!("{:?}", m.ty.kind), span })
    }
}

fn require_numeric(m: &MType<'_>, span: Span) -> Result<()> {
    if m.is_numeric() {
        Ok(())
    } else {
        Err(TypeError::TypeMismatch {
            expected: "a numeric type".to_string(),
            found: format!("{:?}", m.ty.kind),
            span,
        })
    }
}

fn require_unsigned(m: &MType<'_>, span: Span) -> Result<()> {
    let unsigned = match &m.ty.kind {
        TypeKind::Base(b) => !b.is_signed(),
        TypeKind::Ideal => m.bounds.is_non_negative() || m.bounds == Interval::unbounded(),
        TypeKind::Refined { base, .. } => match &base.kind {
            TypeKind::Base(b) => !b.is_signed(),
            _ => true,
        },
        _ => false,
    };
    if unsigned {
        Ok(())
    } else {
        Err(TypeError::BitwiseRequiresUnsigned { span })
    }
}

/// Unifies two numeric operand types per §4.4.1: the ideal type ℤ (from an
/// untyped literal or constant expression) unifies with any concrete
/// numeric type; two concrete types must match ignoring refinement.
fn unify_numeric<'a>(a: &MType<'a>, b: &MType<'a>, span: Span) -> Result<&'a TypeExpr<'a>> {
    let a_ideal = matches!(a.ty.kind, TypeKind::Ideal);
    let b_ideal = matches!(b.ty.kind, TypeKind::Ideal);
    if a_ideal && !b_ideal {
        return Ok(b.ty);
    }
    if b_ideal && !a_ideal {
        return Ok(a.ty);
    }
    if a_ideal && b_ideal {
        return Ok(a.ty);
    }
    if a.ty.eq_ignoring_refinements(b.ty) {
        Ok(a.ty)
    } else {
        Err(TypeError::TypeMismatch {
            expected: format!("{:?}", a.ty.kind),
            found: format!("{:?}", b.ty.kind),
            span,
        })
    }
}

/// Assignment/argument-passing compatibility (§4.4.1, §4.5.1): the value's
/// type must unify with the target's declared type the same way two
/// operands of a numeric operator do. Non-numeric target types (struct,
/// pointer, slice, reader/writer) require exact structural equality.
pub fn check_assignable<'a>(
    value: &MType<'a>,
    target: &'a TypeExpr<'a>,
    span: Span,
    map: &TokenMap,
) -> Result<()> {
    let _ = map;
    if value.is_numeric() && matches!(target.kind, TypeKind::Base(_) | TypeKind::Ideal | TypeKind::Refined { .. })
    {
        if matches!(value.ty.kind, TypeKind::Ideal) || value.ty.eq_ignoring_refinements(target) {
            return Ok(());
        }
        return Err(TypeError::TypeMismatch {
            expected: format!("{:?}", target.kind),
            found: format!("{:?}", value.ty.kind),
            span,
        });
    }
    if value.ty.structural_eq(target) {
        Ok(())
    } else {
        Err(TypeError::TypeMismatch {
            expected: format!("{:?}", target.kind),
            found: format!("{:?}", value.ty.kind),
            span,
        })
    }
}
