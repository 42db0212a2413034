//! The obligation-discharge walk (§4.5): one pass per function body,
//! maintaining a [`FactSet`] exactly as §4.5.2 evolves it and checking
//! every obligation from §4.5.1's table as each expression is visited.
//!
//! This module does not re-derive names or types — every `MType` it
//! reads was already stamped by `toposafe-typeck`; it only adds the
//! fact-set-dependent reasoning typeck explicitly defers (types.rs: "the
//! proof checker... tracks the symbolic relationship via facts").

use std::collections::HashSet;

use num_bigint::BigInt;
use toposafe_ast::{
    Arg, Assign, AssignOp, AstArena, BinaryOp, Block, ElseBranch, Expr, ExprKind, File, Func, If,
    IOBind, Jump, JumpKind, Return, Stmt, StmtKind, TypeExpr, TypeKind, UnaryOp, Var, While,
};
use toposafe_base::{IntBound, Interval, Span, Symbol};
use toposafe_lexer::TokenMap;
use toposafe_typeck::GlobalEnv;

use crate::canon;
use crate::error::{ProofError, Result};
use crate::eval;
use crate::facts::FactSet;
use crate::rules;

struct CheckCtx<'a, 'm> {
    genv: &'m GlobalEnv<'a>,
    arena: &'a AstArena,
    map: &'m TokenMap,
    func: &'a Func<'a>,
}

/// Lexical scope tracking for §4.5.5's resumable-variable analysis: the
/// proof checker needs to know every *declared* local's type at a
/// suspension point, which `Expr::mtype` alone cannot answer (it only
/// describes expressions actually written at that point).
struct Scope<'a> {
    frames: Vec<Vec<(Symbol, &'a TypeExpr<'a>)>>,
}

impl<'a> Scope<'a> {
    fn new() -> Self {
        Scope { frames: vec![Vec::new()] }
    }

    fn push(&mut self) {
        self.frames.push(Vec::new());
    }

    fn pop(&mut self) {
        self.frames.pop();
    }

    fn declare(&mut self, name: Symbol, ty: &'a TypeExpr<'a>) {
        self.frames.last_mut().expect("at least one scope frame").push((name, ty));
    }

    fn all_live(&self) -> impl Iterator<Item = (Symbol, &'a TypeExpr<'a>)> + '_ {
        self.frames.iter().flatten().copied()
    }
}

/// Checks every function in `file`, stamping `resumable_vars`/`proved` on
/// each (§5, §6.2 "code generation never reruns the proof checker").
pub fn check_file<'a>(file: &File<'a>, genv: &GlobalEnv<'a>, arena: &'a AstArena, map: &TokenMap) -> Result<()> {
    for func in file.funcs.iter() {
        check_func(*func, genv, arena, map)?;
    }
    Ok(())
}

fn block_terminates(block: Block<'_>) -> bool {
    block.last().is_some_and(|s| s.terminates())
}

fn check_func<'a>(func: &'a Func<'a>, genv: &GlobalEnv<'a>, arena: &'a AstArena, map: &TokenMap) -> Result<()> {
    let ctx = CheckCtx { genv, arena, map, func };
    let mut scope = Scope::new();
    for p in func.in_params.iter().chain(func.out_params.iter()) {
        scope.declare(p.name, p.ty);
    }

    // A function's own `pre` is assumed at entry (there is no caller
    // context in a single-function check to discharge it against); each
    // actual call site's obligation is instead the per-argument
    // refinement check in `check_call_arg_obligations`. `post` is an
    // obligation, checked at every `return` and at fall-through.
    let mut facts = FactSet::new();
    for a in func.pre {
        facts.insert(a.expr, map);
    }

    let mut resumable = Vec::new();
    let after = check_block(func.body, &ctx, facts, &mut scope, &mut resumable)?;
    if !block_terminates(func.body) {
        for a in func.post {
            discharge_assert(a, &after, &ctx)?;
        }
    }

    *func.resumable_vars.borrow_mut() = resumable;
    func.proved.set(true);
    Ok(())
}

fn check_block<'a>(
    block: Block<'a>,
    ctx: &CheckCtx<'a, '_>,
    facts: FactSet<'a>,
    scope: &mut Scope<'a>,
    resumable: &mut Vec<Symbol>,
) -> Result<FactSet<'a>> {
    scope.push();
    let mut facts = facts;
    for stmt in block {
        facts = check_stmt(stmt, ctx, facts, scope, resumable)?;
        if stmt.terminates() {
            break;
        }
    }
    scope.pop();
    Ok(facts)
}

fn check_stmt<'a>(
    stmt: &'a Stmt<'a>,
    ctx: &CheckCtx<'a, '_>,
    mut facts: FactSet<'a>,
    scope: &mut Scope<'a>,
    resumable: &mut Vec<Symbol>,
) -> Result<FactSet<'a>> {
    // §8.3 "Dead-code branch": once the current facts contain the
    // literal `false`, every statement from here on is unreachable and
    // every obligation within it is vacuously discharged.
    if facts.iter().any(canon::is_literal_false) {
        return Ok(facts);
    }

    match &stmt.kind {
        StmtKind::Var(var) => check_var(var, ctx, facts, scope, resumable),
        StmtKind::Assign(assign) => check_assign(assign, ctx, facts, scope, resumable),
        StmtKind::Expr(e) => {
            let e: &'a Expr<'a> = *e;
            let suspended = check_expr_obligations(e, &facts, ctx, scope, resumable)?;
            maybe_impure_forget(e, &mut facts, ctx);
            Ok(if suspended { FactSet::new() } else { facts })
        }
        StmtKind::If(if_stmt) => check_if(if_stmt, ctx, facts, scope, resumable),
        StmtKind::While(w) => check_while(*w, &facts, ctx, scope, resumable),
        StmtKind::Jump(j) => {
            check_jump(j, &facts, ctx)?;
            Ok(facts)
        }
        StmtKind::Return(ret) => {
            check_return(ret, &facts, ctx, scope, resumable)?;
            Ok(facts)
        }
        StmtKind::Assert(a) => {
            discharge_assert(a, &facts, ctx)?;
            facts.insert(a.expr, ctx.map);
            Ok(facts)
        }
        StmtKind::IOBind(io) => check_io_bind(io, ctx, facts, scope, resumable),
    }
}

fn check_var<'a>(
    var: &'a Var<'a>,
    ctx: &CheckCtx<'a, '_>,
    facts: FactSet<'a>,
    scope: &mut Scope<'a>,
    resumable: &mut Vec<Symbol>,
) -> Result<FactSet<'a>> {
    let mut suspended = false;
    if let Some(init) = var.init {
        suspended = check_expr_obligations(init, &facts, ctx, scope, resumable)?;
        check_refined_assignment(init, var.ty, &facts, ctx)?;
    }
    scope.declare(var.name, var.ty);
    let mut facts = if suspended { FactSet::new() } else { facts };

    // A fresh `var name ty = init` is, for fact purposes, exactly an
    // assignment to a brand-new name (§4.5.2's assignment rule): the name
    // cannot yet appear in `init` (it is not in scope until this point),
    // so the equality always holds.
    if let Some(init) = var.init {
        if !suspended && !canon::mentions(init, var.name) {
            let ident = ctx.arena.alloc(Expr::new(var.span, ExprKind::Ident(var.name)));
            let eq = ctx.arena.alloc(Expr::new(var.span, ExprKind::Binary(BinaryOp::Eq, ident, init)));
            facts.insert(eq, ctx.map);
        }
    }
    Ok(facts)
}

fn lvalue_root(e: &Expr<'_>) -> Option<Symbol> {
    match &e.kind {
        ExprKind::Ident(n) => Some(*n),
        ExprKind::Qualified(base, _) => Some(*base),
        ExprKind::Selector { base, .. } => lvalue_root(base),
        ExprKind::Index { base, .. } => lvalue_root(base),
        ExprKind::Slice { base, .. } => lvalue_root(base),
        _ => None,
    }
}

fn check_assign<'a>(
    assign: &'a Assign<'a>,
    ctx: &CheckCtx<'a, '_>,
    facts: FactSet<'a>,
    scope: &mut Scope<'a>,
    resumable: &mut Vec<Symbol>,
) -> Result<FactSet<'a>> {
    let mut suspended = check_expr_obligations(assign.target, &facts, ctx, scope, resumable)?;
    suspended |= check_expr_obligations(assign.value, &facts, ctx, scope, resumable)?;

    let compound_result = if assign.op == AssignOp::Assign {
        if let Some(m) = assign.target.mtype() {
            check_refined_assignment(assign.value, m.ty, &facts, ctx)?;
        }
        None
    } else {
        Some(check_compound_assign_obligation(assign, &facts, ctx)?)
    };

    let mut facts = if suspended { FactSet::new() } else { facts };

    // §4.5.2 assignment rule: `x op= e` is "equivalent to `x = x op e`
    // for fact purposes" — since that synthesized RHS always mentions
    // `x`, a compound assignment never yields a substitute equality
    // fact, only a forget; the already-range-checked result interval is
    // recorded instead, as the tightest bound facts the checker can
    // still state about the new value. A plain `x = e` adds `x == e`
    // when `e` does not mention `x` (and only for a bare-identifier
    // target, where the equality is unambiguous).
    if let Some(root) = lvalue_root(assign.target) {
        facts.forget(root);
        if assign.op == AssignOp::Assign {
            if matches!(assign.target.kind, ExprKind::Ident(_)) && !canon::mentions(assign.value, root) {
                let eq = ctx.arena.alloc(Expr::new(assign.span, ExprKind::Binary(BinaryOp::Eq, assign.target, assign.value)));
                facts.insert(eq, ctx.map);
            }
        } else if let Some(result) = compound_result {
            if matches!(assign.target.kind, ExprKind::Ident(_)) {
                insert_bound_facts(&mut facts, assign.target, &result, ctx);
            }
        }
    }
    Ok(facts)
}

/// Records `target >= lo` and/or `target <= hi` for whichever endpoints of
/// `bounds` are finite, as facts usable by [`eval::tighten`]'s
/// single-variable relational-constant scan.
fn insert_bound_facts<'a>(facts: &mut FactSet<'a>, target: &'a Expr<'a>, bounds: &Interval, ctx: &CheckCtx<'a, '_>) {
    if let IntBound::Finite(v) = &bounds.lo {
        let lit = ctx.arena.alloc(Expr::new(target.span, ExprKind::IntLiteral(v.clone())));
        let fact = ctx.arena.alloc(Expr::new(target.span, ExprKind::Binary(BinaryOp::Ge, target, lit)));
        facts.insert(fact, ctx.map);
    }
    if let IntBound::Finite(v) = &bounds.hi {
        let lit = ctx.arena.alloc(Expr::new(target.span, ExprKind::IntLiteral(v.clone())));
        let fact = ctx.arena.alloc(Expr::new(target.span, ExprKind::Binary(BinaryOp::Le, target, lit)));
        facts.insert(fact, ctx.map);
    }
}

fn check_if<'a>(
    if_stmt: &'a If<'a>,
    ctx: &CheckCtx<'a, '_>,
    facts: FactSet<'a>,
    scope: &mut Scope<'a>,
    resumable: &mut Vec<Symbol>,
) -> Result<FactSet<'a>> {
    let suspended = check_expr_obligations(if_stmt.cond, &facts, ctx, scope, resumable)?;
    let base = if suspended { FactSet::new() } else { facts };

    let mut then_facts = base.clone();
    then_facts.insert(if_stmt.cond, ctx.map);
    let then_out = check_block(if_stmt.then_branch, ctx, then_facts, scope, resumable)?;
    let then_terms = block_terminates(if_stmt.then_branch);

    let (else_out, else_terms) = match &if_stmt.else_branch {
        Some(ElseBranch::ElseIf(inner)) => {
            let mut else_facts = base.clone();
            else_facts.insert(canon::negate(ctx.arena, if_stmt.cond), ctx.map);
            let out = check_if(inner, ctx, else_facts, scope, resumable)?;
            (out, inner.terminates())
        }
        Some(ElseBranch::Block(block)) => {
            let mut else_facts = base.clone();
            else_facts.insert(canon::negate(ctx.arena, if_stmt.cond), ctx.map);
            let out = check_block(block, ctx, else_facts, scope, resumable)?;
            (out, block_terminates(block))
        }
        None => {
            let mut else_facts = base.clone();
            else_facts.insert(canon::negate(ctx.arena, if_stmt.cond), ctx.map);
            (else_facts, false)
        }
    };

    Ok(match (then_terms, else_terms) {
        (true, true) => FactSet::new(),
        (true, false) => else_out,
        (false, true) => then_out,
        (false, false) => FactSet::intersect(&then_out, &else_out),
    })
}

fn check_while<'a>(
    w: &'a While<'a>,
    facts_in: &FactSet<'a>,
    ctx: &CheckCtx<'a, '_>,
    scope: &mut Scope<'a>,
    resumable: &mut Vec<Symbol>,
) -> Result<FactSet<'a>> {
    for a in w.pre {
        discharge_assert(a, facts_in, ctx)?;
    }
    for a in w.inv {
        discharge_assert(a, facts_in, ctx)?;
    }

    let mut entry = FactSet::new();
    for a in w.pre.iter().chain(w.inv.iter()) {
        entry.insert(a.expr, ctx.map);
    }
    entry.insert(w.cond, ctx.map);

    let facts_after_body = check_block(w.body, ctx, entry, scope, resumable)?;

    if !block_terminates(w.body) {
        for a in w.pre {
            discharge_assert(a, &facts_after_body, ctx)?;
        }
        for a in w.inv {
            discharge_assert(a, &facts_after_body, ctx)?;
        }

        let mut exit_check = facts_after_body.clone();
        exit_check.insert(canon::negate(ctx.arena, w.cond), ctx.map);
        for a in w.inv {
            discharge_assert(a, &exit_check, ctx)?;
        }
        for a in w.post {
            discharge_assert(a, &exit_check, ctx)?;
        }
    }

    let mut after = FactSet::new();
    for a in w.inv.iter().chain(w.post.iter()) {
        after.insert(a.expr, ctx.map);
    }
    if !w.has_break.get() {
        after.insert(canon::negate(ctx.arena, w.cond), ctx.map);
    }
    Ok(after)
}

fn check_jump<'a>(j: &'a Jump<'a>, facts: &FactSet<'a>, ctx: &CheckCtx<'a, '_>) -> Result<()> {
    let w = j
        .target
        .get()
        .ok_or_else(|| ProofError::Internal { message: "unresolved jump target reached the proof checker".to_string() })?;
    match j.kind {
        JumpKind::Break => {
            for a in w.inv {
                discharge_assert(a, facts, ctx)?;
            }
            for a in w.post {
                discharge_assert(a, facts, ctx)?;
            }
        }
        JumpKind::Continue => {
            for a in w.pre {
                discharge_assert(a, facts, ctx)?;
            }
            for a in w.inv {
                discharge_assert(a, facts, ctx)?;
            }
        }
    }
    Ok(())
}

fn check_return<'a>(
    ret: &'a Return<'a>,
    facts: &FactSet<'a>,
    ctx: &CheckCtx<'a, '_>,
    scope: &mut Scope<'a>,
    resumable: &mut Vec<Symbol>,
) -> Result<()> {
    if let Some(value) = ret.value {
        check_expr_obligations(value, facts, ctx, scope, resumable)?;
        if let Some(out) = ctx.func.out_params.first() {
            check_refined_assignment(value, out.ty, facts, ctx)?;
        }
    }
    for a in ctx.func.post {
        discharge_assert(a, facts, ctx)?;
    }
    Ok(())
}

fn check_io_bind<'a>(
    io: &'a IOBind<'a>,
    ctx: &CheckCtx<'a, '_>,
    facts: FactSet<'a>,
    scope: &mut Scope<'a>,
    resumable: &mut Vec<Symbol>,
) -> Result<FactSet<'a>> {
    let suspended = check_expr_obligations(io.value, &facts, ctx, scope, resumable)?;
    let facts = if suspended { FactSet::new() } else { facts };
    scope.push();
    if let Some(m) = io.value.mtype() {
        scope.declare(io.alias, m.ty);
    }
    let facts = check_block(io.body, ctx, facts, scope, resumable)?;
    scope.pop();
    Ok(facts)
}

fn discharge_assert<'a>(a: &'a toposafe_ast::Assert<'a>, facts: &FactSet<'a>, ctx: &CheckCtx<'a, '_>) -> Result<()> {
    if trivially_true(a.expr, facts) || facts.contains(a.expr, ctx.map) {
        return Ok(());
    }
    if let Some(via) = a.via {
        return rules::discharge(via.rule, via.subs, a.expr, facts, ctx.arena, ctx.map, a.span);
    }
    Err(ProofError::AssertionUnproved {
        expr: toposafe_ast::pp_expr(a.expr, ctx.map),
        span: a.span,
        facts: facts.describe(ctx.map),
    })
}

fn trivially_true(e: &Expr<'_>, facts: &FactSet<'_>) -> bool {
    match &e.kind {
        ExprKind::BoolLiteral(b) => *b,
        ExprKind::Binary(op, a, b) if op.is_comparison() => {
            let ba = eval::eval_bounds(a, facts);
            let bb = eval::eval_bounds(b, facts);
            match op {
                BinaryOp::Lt => ba.hi < bb.lo,
                BinaryOp::Le => ba.hi <= bb.lo,
                BinaryOp::Gt => ba.lo > bb.hi,
                BinaryOp::Ge => ba.lo >= bb.hi,
                BinaryOp::Eq => matches!((ba.as_point(), bb.as_point()), (Some(x), Some(y)) if x == y),
                BinaryOp::Ne => ba.hi < bb.lo || bb.hi < ba.lo,
                _ => false,
            }
        }
        ExprKind::Associative(op, items) if op.is_logical() => match op {
            toposafe_ast::AssocOp::LogAnd => items.iter().all(|it| trivially_true(it, facts)),
            toposafe_ast::AssocOp::LogOr => items.iter().any(|it| trivially_true(it, facts)),
            _ => false,
        },
        ExprKind::Unary(UnaryOp::Not, inner) => !trivially_true_or_false_unknown(inner, facts),
        _ => false,
    }
}

/// `not E` is trivially true only when `E` is trivially *false*, which
/// (being the mirror of "trivially true") this checker does not attempt
/// to establish beyond the literal-`false` and disjoint-range cases
/// already covered by [`trivially_true`] on `E`'s negation.
fn trivially_true_or_false_unknown(e: &Expr<'_>, facts: &FactSet<'_>) -> bool {
    trivially_true(e, facts)
}

fn declared_bounds(ty: &TypeExpr<'_>) -> Interval {
    match &ty.kind {
        TypeKind::Base(b) => b.native_bounds(),
        TypeKind::Ideal => Interval::unbounded(),
        TypeKind::Refined { base, lo, hi } => {
            let base_bounds = declared_bounds(base);
            let lo_bound = lo.and_then(|e| e.const_value()).map(IntBound::Finite).unwrap_or_else(|| base_bounds.lo.clone());
            let hi_bound = hi.and_then(|e| e.const_value()).map(IntBound::Finite).unwrap_or_else(|| base_bounds.hi.clone());
            if lo_bound <= hi_bound {
                Interval::new(lo_bound, hi_bound)
            } else {
                base_bounds
            }
        }
        _ => Interval::unbounded(),
    }
}

fn check_fits<'a>(
    result: Interval,
    target: &'a TypeExpr<'a>,
    e: &'a Expr<'a>,
    ctx: &CheckCtx<'a, '_>,
    facts: &FactSet<'a>,
) -> Result<()> {
    if matches!(target.kind, TypeKind::Ideal) {
        return Ok(());
    }
    let bound = declared_bounds(target);
    if result.is_subset_of(&bound) {
        return Ok(());
    }
    Err(ProofError::BoundsObligationUnproved {
        obligation: format!("{} within {}", toposafe_ast::pp_expr(e, ctx.map), toposafe_ast::pp_type(target, ctx.map)),
        span: e.span,
        facts: facts.describe(ctx.map),
    })
}

fn check_nonzero<'a>(value: &'a Expr<'a>, bounds: Interval, facts: &FactSet<'a>, ctx: &CheckCtx<'a, '_>) -> Result<()> {
    if !bounds.may_contain_zero() {
        return Ok(());
    }
    let zero = ctx.arena.alloc(Expr::new(value.span, ExprKind::IntLiteral(BigInt::from(0u8))));
    let nz = ctx.arena.alloc(Expr::new(value.span, ExprKind::Binary(BinaryOp::Ne, value, zero)));
    if facts.contains(nz, ctx.map) {
        return Ok(());
    }
    Err(ProofError::BoundsObligationUnproved {
        obligation: format!("{} != 0", toposafe_ast::pp_expr(value, ctx.map)),
        span: value.span,
        facts: facts.describe(ctx.map),
    })
}

fn check_shift_range<'a>(
    k: &'a Expr<'a>,
    k_bounds: &Interval,
    target: &'a TypeExpr<'a>,
    ctx: &CheckCtx<'a, '_>,
    facts: &FactSet<'a>,
) -> Result<()> {
    if !k_bounds.is_non_negative() {
        return Err(ProofError::BoundsObligationUnproved {
            obligation: format!("0 <= {}", toposafe_ast::pp_expr(k, ctx.map)),
            span: k.span,
            facts: facts.describe(ctx.map),
        });
    }
    if let TypeKind::Base(b) = &target.kind {
        if let Some(width) = b.width_bits() {
            let max_shift = IntBound::finite(BigInt::from(width) - BigInt::from(1u8));
            if k_bounds.hi > max_shift {
                return Err(ProofError::BoundsObligationUnproved {
                    obligation: format!("{} < {width}", toposafe_ast::pp_expr(k, ctx.map)),
                    span: k.span,
                    facts: facts.describe(ctx.map),
                });
            }
        }
    }
    Ok(())
}

fn check_refined_assignment<'a>(value: &'a Expr<'a>, target_ty: &'a TypeExpr<'a>, facts: &FactSet<'a>, ctx: &CheckCtx<'a, '_>) -> Result<()> {
    if matches!(target_ty.kind, TypeKind::Refined { .. }) {
        let bounds = eval::eval_bounds(value, facts);
        check_fits(bounds, target_ty, value, ctx, facts)?;
    }
    Ok(())
}

fn check_compound_assign_obligation<'a>(assign: &'a Assign<'a>, facts: &FactSet<'a>, ctx: &CheckCtx<'a, '_>) -> Result<Interval> {
    let target = match assign.target.mtype() {
        Some(m) => m.ty,
        None => return Ok(Interval::unbounded()),
    };
    let bt = eval::eval_bounds(assign.target, facts);
    let bv = eval::eval_bounds(assign.value, facts);
    let result = match assign.op {
        AssignOp::AddEq => bt.add(&bv),
        AssignOp::SubEq => bt.sub(&bv),
        AssignOp::MulEq => bt.mul(&bv),
        AssignOp::DivEq => {
            check_nonzero(assign.value, bv.clone(), facts, ctx)?;
            bt.div(&bv)
        }
        AssignOp::RemEq => {
            check_nonzero(assign.value, bv.clone(), facts, ctx)?;
            bt.rem(&bv)
        }
        AssignOp::AndEq => bt.bitand(&bv),
        AssignOp::OrEq => bt.bitor(&bv),
        AssignOp::XorEq => bt.bitxor(&bv),
        AssignOp::ShlEq => {
            check_shift_range(assign.value, &bv, target, ctx, facts)?;
            bt.shl(&bv)
        }
        AssignOp::ShrEq => {
            check_shift_range(assign.value, &bv, target, ctx, facts)?;
            bt.shr(&bv)
        }
        AssignOp::Assign => unreachable!("plain assignment handled by check_refined_assignment"),
    };
    check_fits(result.clone(), target, assign.target, ctx, facts)?;
    Ok(result)
}

fn resolve_callee<'a>(callee: &'a Expr<'a>, ctx: &CheckCtx<'a, '_>) -> Option<&'a Func<'a>> {
    match &callee.kind {
        ExprKind::Ident(name) => ctx.genv.lookup_func(None, *name),
        ExprKind::Qualified(base, name) => {
            ctx.genv.lookup_func(Some(*base), *name).or_else(|| ctx.genv.lookup_func(None, *name))
        }
        ExprKind::Selector { field, .. } => {
            ctx.genv.funcs.values().find(|f| f.receiver.is_some() && f.name == *field).copied()
        }
        _ => None,
    }
}

fn check_call_arg_obligations<'a>(args: &'a [Arg<'a>], callee: &'a Expr<'a>, facts: &FactSet<'a>, ctx: &CheckCtx<'a, '_>) -> Result<()> {
    let func = match resolve_callee(callee, ctx) {
        Some(f) => f,
        None => return Ok(()),
    };
    for arg in args {
        if let Some(param) = func.in_params.iter().find(|p| p.name == arg.name) {
            let bounds = eval::eval_bounds(arg.value, facts);
            check_fits(bounds, param.ty, arg.value, ctx, facts)?;
        }
    }
    Ok(())
}

/// §4.5.2 impure-call rule: args whose declared type is `ptr`/`nptr`/a
/// slice/`reader`/`writer` are reachable through that argument; an
/// unresolved callee (no cross-file symbol table, §9 Non-goals) is
/// treated conservatively as reaching every one of its arguments.
fn reachable_names<'a>(args: &'a [Arg<'a>], callee: &'a Expr<'a>, ctx: &CheckCtx<'a, '_>) -> Vec<Symbol> {
    let mut names = Vec::new();
    if let ExprKind::Selector { base, .. } = &callee.kind {
        if let Some(r) = lvalue_root(base) {
            names.push(r);
        }
    }
    let func = resolve_callee(callee, ctx);
    for arg in args {
        let is_ref_like = func
            .and_then(|f| f.in_params.iter().find(|p| p.name == arg.name))
            .map(|p| {
                matches!(
                    p.ty.unrefined().kind,
                    TypeKind::Ptr(_) | TypeKind::Nptr(_) | TypeKind::Slice(_) | TypeKind::Reader(_) | TypeKind::Writer(_)
                )
            })
            .unwrap_or(true);
        if is_ref_like {
            if let Some(r) = lvalue_root(arg.value) {
                names.push(r);
            }
        }
    }
    names
}

fn maybe_impure_forget<'a>(e: &'a Expr<'a>, facts: &mut FactSet<'a>, ctx: &CheckCtx<'a, '_>) {
    if let ExprKind::Call { callee, args, coroutine } = &e.kind {
        let impure = resolve_callee(callee, ctx).map(|f| f.impure).unwrap_or(false);
        if impure || *coroutine {
            let names = reachable_names(args, callee, ctx);
            facts.forget_all(&names);
        }
    }
}

fn is_resumable_type(ty: &TypeExpr<'_>, genv: &GlobalEnv<'_>) -> bool {
    match &ty.kind {
        TypeKind::Base(_) | TypeKind::Ideal => true,
        TypeKind::Refined { base, .. } => is_resumable_type(base, genv),
        TypeKind::Struct(name) => genv.structs.get(name).is_some_and(|s| s.fields.iter().all(|f| is_resumable_type(f.ty, genv))),
        TypeKind::Ptr(_) | TypeKind::Nptr(_) | TypeKind::Array { .. } | TypeKind::Slice(_) | TypeKind::Reader(_) | TypeKind::Writer(_) => false,
    }
}

fn check_suspension<'a>(span: Span, ctx: &CheckCtx<'a, '_>, scope: &Scope<'a>, resumable: &mut Vec<Symbol>) -> Result<()> {
    if !ctx.func.suspendible {
        return Err(ProofError::SuspendOutsideCoroutine { span });
    }
    let mut seen: HashSet<Symbol> = resumable.iter().copied().collect();
    for (name, ty) in scope.all_live() {
        if is_resumable_type(ty, ctx.genv) {
            if seen.insert(name) {
                resumable.push(name);
            }
        } else {
            return Err(ProofError::PointerResumableAcrossSuspension { name: ctx.map.resolve(name).to_string(), span });
        }
    }
    Ok(())
}

fn array_size<'a>(ty: &'a TypeExpr<'a>) -> Option<&'a Expr<'a>> {
    match &ty.kind {
        TypeKind::Array { size, .. } => Some(size),
        TypeKind::Ptr(inner) | TypeKind::Nptr(inner) => array_size(inner),
        _ => None,
    }
}

fn check_index_obligation<'a>(base: &'a Expr<'a>, index: &'a Expr<'a>, facts: &FactSet<'a>, ctx: &CheckCtx<'a, '_>) -> Result<()> {
    let base_ty = match base.mtype() {
        Some(m) => m.ty,
        None => return Ok(()),
    };
    let size = match array_size(base_ty) {
        Some(s) => s,
        None => return Ok(()),
    };
    let idx_bounds = eval::eval_bounds(index, facts);
    if !idx_bounds.is_non_negative() {
        return Err(ProofError::BoundsObligationUnproved {
            obligation: format!("0 <= {}", toposafe_ast::pp_expr(index, ctx.map)),
            span: index.span,
            facts: facts.describe(ctx.map),
        });
    }
    let size_bounds = eval::eval_bounds(size, facts);
    if idx_bounds.hi < size_bounds.lo {
        return Ok(());
    }
    let lt_fact = ctx.arena.alloc(Expr::new(index.span, ExprKind::Binary(BinaryOp::Lt, index, size)));
    if facts.contains(lt_fact, ctx.map) {
        return Ok(());
    }
    Err(ProofError::BoundsObligationUnproved {
        obligation: format!("{} < {}", toposafe_ast::pp_expr(index, ctx.map), toposafe_ast::pp_expr(size, ctx.map)),
        span: index.span,
        facts: facts.describe(ctx.map),
    })
}

fn check_slice_obligation<'a>(
    base: &'a Expr<'a>,
    lo: Option<&'a Expr<'a>>,
    hi: Option<&'a Expr<'a>>,
    facts: &FactSet<'a>,
    ctx: &CheckCtx<'a, '_>,
) -> Result<()> {
    let base_ty = base.mtype().map(|m| m.ty);
    let size = base_ty.and_then(array_size);

    if let Some(lo_e) = lo {
        let b = eval::eval_bounds(lo_e, facts);
        if !b.is_non_negative() {
            return Err(ProofError::BoundsObligationUnproved {
                obligation: format!("0 <= {}", toposafe_ast::pp_expr(lo_e, ctx.map)),
                span: lo_e.span,
                facts: facts.describe(ctx.map),
            });
        }
    }
    if let (Some(lo_e), Some(hi_e)) = (lo, hi) {
        let bl = eval::eval_bounds(lo_e, facts);
        let bh = eval::eval_bounds(hi_e, facts);
        if bl.hi > bh.lo {
            let le_fact = ctx.arena.alloc(Expr::new(lo_e.span, ExprKind::Binary(BinaryOp::Le, lo_e, hi_e)));
            if !facts.contains(le_fact, ctx.map) {
                return Err(ProofError::BoundsObligationUnproved {
                    obligation: format!("{} <= {}", toposafe_ast::pp_expr(lo_e, ctx.map), toposafe_ast::pp_expr(hi_e, ctx.map)),
                    span: lo_e.span,
                    facts: facts.describe(ctx.map),
                });
            }
        }
    }
    if let (Some(hi_e), Some(size_e)) = (hi, size) {
        let bh = eval::eval_bounds(hi_e, facts);
        let bs = eval::eval_bounds(size_e, facts);
        if bh.hi > bs.lo {
            let le_fact = ctx.arena.alloc(Expr::new(hi_e.span, ExprKind::Binary(BinaryOp::Le, hi_e, size_e)));
            if !facts.contains(le_fact, ctx.map) {
                return Err(ProofError::BoundsObligationUnproved {
                    obligation: format!("{} <= {}", toposafe_ast::pp_expr(hi_e, ctx.map), toposafe_ast::pp_expr(size_e, ctx.map)),
                    span: hi_e.span,
                    facts: facts.describe(ctx.map),
                });
            }
        }
    }
    Ok(())
}

fn check_cast_obligation<'a>(operand: &'a Expr<'a>, ty: &'a TypeExpr<'a>, facts: &FactSet<'a>, ctx: &CheckCtx<'a, '_>) -> Result<()> {
    if matches!(ty.unrefined().kind, TypeKind::Ideal) {
        return Ok(());
    }
    let bounds = eval::eval_bounds(operand, facts);
    check_fits(bounds, ty, operand, ctx, facts)
}

fn check_binary_obligation<'a>(
    e: &'a Expr<'a>,
    op: BinaryOp,
    a: &'a Expr<'a>,
    b: &'a Expr<'a>,
    facts: &FactSet<'a>,
    ctx: &CheckCtx<'a, '_>,
) -> Result<()> {
    if op.is_comparison() {
        return Ok(());
    }
    let target = match e.mtype() {
        Some(m) => m.ty,
        None => return Ok(()),
    };
    let ba = eval::eval_bounds(a, facts);
    let bb = eval::eval_bounds(b, facts);
    let result = match op {
        BinaryOp::Sub => ba.sub(&bb),
        BinaryOp::Div => {
            check_nonzero(b, bb.clone(), facts, ctx)?;
            ba.div(&bb)
        }
        BinaryOp::Rem => {
            check_nonzero(b, bb.clone(), facts, ctx)?;
            ba.rem(&bb)
        }
        BinaryOp::Shl => {
            check_shift_range(b, &bb, target, ctx, facts)?;
            ba.shl(&bb)
        }
        BinaryOp::Shr => {
            check_shift_range(b, &bb, target, ctx, facts)?;
            ba.shr(&bb)
        }
        _ => return Ok(()),
    };
    check_fits(result, target, e, ctx, facts)
}

fn check_assoc_obligation<'a>(
    e: &'a Expr<'a>,
    op: toposafe_ast::AssocOp,
    items: &'a [&'a Expr<'a>],
    facts: &FactSet<'a>,
    ctx: &CheckCtx<'a, '_>,
) -> Result<()> {
    if op.is_logical() || items.is_empty() {
        return Ok(());
    }
    let target = match e.mtype() {
        Some(m) => m.ty,
        None => return Ok(()),
    };
    let mut acc = eval::eval_bounds(items[0], facts);
    for it in &items[1..] {
        let b = eval::eval_bounds(it, facts);
        acc = match op {
            toposafe_ast::AssocOp::Add => acc.add(&b),
            toposafe_ast::AssocOp::Mul => acc.mul(&b),
            toposafe_ast::AssocOp::BitAnd => acc.bitand(&b),
            toposafe_ast::AssocOp::BitOr => acc.bitor(&b),
            toposafe_ast::AssocOp::BitXor => acc.bitxor(&b),
            toposafe_ast::AssocOp::LogAnd | toposafe_ast::AssocOp::LogOr => acc,
        };
    }
    check_fits(acc, target, e, ctx, facts)
}

/// Walks `e` post-order, checking every obligation §4.5.1 attaches to a
/// node it visits, and returns whether a suspension call (`f?(...)`) was
/// encountered anywhere within it (§4.5.5: the caller wipes the fact set
/// once the enclosing statement finishes).
fn check_expr_obligations<'a>(
    e: &'a Expr<'a>,
    facts: &FactSet<'a>,
    ctx: &CheckCtx<'a, '_>,
    scope: &Scope<'a>,
    resumable: &mut Vec<Symbol>,
) -> Result<bool> {
    let mut suspended = false;
    match &e.kind {
        ExprKind::IntLiteral(_) | ExprKind::BoolLiteral(_) | ExprKind::Ident(_) | ExprKind::Qualified(..) => {}
        ExprKind::Unary(op, a) => {
            suspended |= check_expr_obligations(a, facts, ctx, scope, resumable)?;
            if *op == UnaryOp::Neg {
                if let Some(m) = e.mtype() {
                    let result = eval::eval_bounds(a, facts).negate();
                    check_fits(result, m.ty, e, ctx, facts)?;
                }
            }
        }
        ExprKind::Binary(op, a, b) => {
            suspended |= check_expr_obligations(a, facts, ctx, scope, resumable)?;
            suspended |= check_expr_obligations(b, facts, ctx, scope, resumable)?;
            check_binary_obligation(e, *op, a, b, facts, ctx)?;
        }
        ExprKind::Associative(op, items) => {
            for it in items.iter() {
                suspended |= check_expr_obligations(it, facts, ctx, scope, resumable)?;
            }
            check_assoc_obligation(e, *op, items, facts, ctx)?;
        }
        ExprKind::Call { callee, args, coroutine } => {
            suspended |= check_expr_obligations(callee, facts, ctx, scope, resumable)?;
            for a in args.iter() {
                suspended |= check_expr_obligations(a.value, facts, ctx, scope, resumable)?;
            }
            check_call_arg_obligations(args, callee, facts, ctx)?;
            if *coroutine {
                check_suspension(e.span, ctx, scope, resumable)?;
                suspended = true;
            }
        }
        ExprKind::Index { base, index } => {
            suspended |= check_expr_obligations(base, facts, ctx, scope, resumable)?;
            suspended |= check_expr_obligations(index, facts, ctx, scope, resumable)?;
            check_index_obligation(base, index, facts, ctx)?;
        }
        ExprKind::Slice { base, lo, hi } => {
            suspended |= check_expr_obligations(base, facts, ctx, scope, resumable)?;
            if let Some(lo) = lo {
                suspended |= check_expr_obligations(lo, facts, ctx, scope, resumable)?;
            }
            if let Some(hi) = hi {
                suspended |= check_expr_obligations(hi, facts, ctx, scope, resumable)?;
            }
            check_slice_obligation(base, *lo, *hi, facts, ctx)?;
        }
        ExprKind::Selector { base, .. } => {
            suspended |= check_expr_obligations(base, facts, ctx, scope, resumable)?;
        }
        ExprKind::Cast { operand, ty } => {
            suspended |= check_expr_obligations(operand, facts, ctx, scope, resumable)?;
            check_cast_obligation(operand, ty, facts, ctx)?;
        }
    }
    Ok(suspended)
}
