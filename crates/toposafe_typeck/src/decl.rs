//! Declaration- and statement-level checking (§4.4.1, §4.4.2): function
//! signatures, struct/const/status declarations, and the per-statement
//! walk that stamps an `MType` onto every expression in a function body.
//!
//! This module does not discharge any arithmetic/assertion proof
//! obligation — it only establishes that every expression is well-typed
//! and every name resolves. Obligation discharge is `toposafe-proof`'s
//! job, run as a separate pass over the same, now fully MType-stamped,
//! tree.

use toposafe_ast::{
    Assert, Assign, AssignOp, AstArena, BaseType, Block, ElseBranch, File, Func, If, IOBind,
    MType, Return, Stmt, StmtKind, TypeKind, Var, While,
};
use toposafe_base::Span;
use toposafe_lexer::TokenMap;

use crate::env::{GlobalEnv, LocalScope};
use crate::error::{Result, TypeError};
use crate::expr::{check_assignable, infer_expr};
use crate::types::check_type;

/// Checks an entire file: every struct field type, const, status, and
/// function signature + body. Returns the first error encountered; the
/// type checker does not attempt to recover and continue past one (§7).
pub fn check_file<'a>(file: &File<'a>, arena: &'a AstArena, map: &TokenMap) -> Result<GlobalEnv<'a>> {
    let genv = GlobalEnv::build(file, map)?;

    for s in file.structs.iter() {
        let mut scope = LocalScope::new();
        for f in s.fields {
            check_type(f.ty, &genv, &mut scope, arena, map)?;
        }
    }

    for c in file.consts.iter() {
        let mut scope = LocalScope::new();
        check_type(c.ty, &genv, &mut scope, arena, map)?;
        let value_mtype = infer_expr(c.value, &genv, &mut scope, arena, map)?;
        check_assignable(&value_mtype, c.ty, c.span, map)?;
    }

    for func in file.funcs.iter() {
        check_func(func, &genv, arena, map)?;
    }

    Ok(genv)
}

fn check_func<'a>(
    func: &'a Func<'a>,
    genv: &GlobalEnv<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<()> {
    let mut scope = LocalScope::new();

    for p in func.in_params.iter().chain(func.out_params.iter()) {
        if scope.lookup(p.name).is_some() {
            return Err(TypeError::DuplicateDeclaration {
                name: map.resolve(p.name).to_string(),
                first: p.span,
                second: p.span,
            });
        }
        let bounds = check_type(p.ty, genv, &mut scope, arena, map)?;
        scope.declare(p.name, MType::new(p.ty, bounds));
    }

    for a in func.pre {
        check_assert(a, genv, &mut scope, arena, map)?;
    }
    for a in func.post {
        check_assert(a, genv, &mut scope, arena, map)?;
    }

    check_block(func.body, func, genv, &mut scope, arena, map)?;
    Ok(())
}

fn check_block<'a>(
    block: Block<'a>,
    func: &'a Func<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<()> {
    scope.push();
    for stmt in block {
        check_stmt(stmt, func, genv, scope, arena, map)?;
    }
    scope.pop();
    Ok(())
}

fn check_stmt<'a>(
    stmt: &'a Stmt<'a>,
    func: &'a Func<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<()> {
    match &stmt.kind {
        StmtKind::Var(var) => check_var(var, genv, scope, arena, map),
        StmtKind::Assign(assign) => check_assign(assign, genv, scope, arena, map),
        StmtKind::Expr(e) => infer_expr(e, genv, scope, arena, map).map(|_| ()),
        StmtKind::If(if_stmt) => check_if(if_stmt, func, genv, scope, arena, map),
        StmtKind::While(w) => check_while(w, func, genv, scope, arena, map),
        StmtKind::Jump(_) => Ok(()),
        StmtKind::Return(ret) => check_return(ret, func, genv, scope, arena, map),
        StmtKind::Assert(a) => check_assert(a, genv, scope, arena, map),
        StmtKind::IOBind(io) => check_io_bind(io, func, genv, scope, arena, map),
    }
}

fn check_var<'a>(
    var: &'a Var<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<()> {
    let bounds = check_type(var.ty, genv, scope, arena, map)?;
    if let Some(init) = var.init {
        let init_mtype = infer_expr(init, genv, scope, arena, map)?;
        check_assignable(&init_mtype, var.ty, var.span, map)?;
    }
    scope.declare(var.name, MType::new(var.ty, bounds));
    Ok(())
}

fn check_assign<'a>(
    assign: &'a Assign<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<()> {
    let target_mtype = infer_expr(assign.target, genv, scope, arena, map)?;
    let value_mtype = infer_expr(assign.value, genv, scope, arena, map)?;
    if assign.op == AssignOp::Assign {
        check_assignable(&value_mtype, target_mtype.ty, assign.span, map)?;
    } else if !target_mtype.is_numeric() || !value_mtype.is_numeric() {
        return Err(TypeError::TypeMismatch {
            expected: "a numeric type".to_string(),
            found: format!("{:?}", target_mtype.ty.kind),
            span: assign.span,
        });
    }
    Ok(())
}

fn check_if<'a>(
    if_stmt: &'a If<'a>,
    func: &'a Func<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<()> {
    let cond_mtype = infer_expr(if_stmt.cond, genv, scope, arena, map)?;
    require_bool_stmt(&cond_mtype, if_stmt.span)?;
    check_block(if_stmt.then_branch, func, genv, scope, arena, map)?;
    match &if_stmt.else_branch {
        Some(ElseBranch::ElseIf(inner)) => check_if(inner, func, genv, scope, arena, map),
        Some(ElseBranch::Block(block)) => check_block(block, func, genv, scope, arena, map),
        None => Ok(()),
    }
}

fn check_while<'a>(
    w: &'a While<'a>,
    func: &'a Func<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<()> {
    scope.push();
    let cond_mtype = infer_expr(w.cond, genv, scope, arena, map)?;
    require_bool_stmt(&cond_mtype, w.span)?;
    for a in w.pre {
        check_assert(a, genv, scope, arena, map)?;
    }
    for a in w.inv {
        check_assert(a, genv, scope, arena, map)?;
    }
    for a in w.post {
        check_assert(a, genv, scope, arena, map)?;
    }
    for stmt in w.body {
        check_stmt(stmt, func, genv, scope, arena, map)?;
    }
    scope.pop();
    Ok(())
}

fn check_return<'a>(
    ret: &'a Return<'a>,
    func: &'a Func<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<()> {
    match (ret.value, func.out_params.first()) {
        (Some(value), Some(out)) => {
            let value_mtype = infer_expr(value, genv, scope, arena, map)?;
            check_assignable(&value_mtype, out.ty, ret.span, map)?;
        }
        (Some(value), None) => {
            infer_expr(value, genv, scope, arena, map)?;
        }
        (None, _) => {}
    }
    if let Some(status) = ret.status {
        if !genv.statuses.contains_key(&status) {
            return Err(TypeError::UnknownIdentifier {
                name: map.resolve(status).to_string(),
                span: ret.span,
            });
        }
    }
    Ok(())
}

fn check_assert<'a>(
    assert: &'a Assert<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<()> {
    let mtype = infer_expr(assert.expr, genv, scope, arena, map)?;
    require_bool_stmt(&mtype, assert.span)?;
    if let Some(via) = assert.via {
        for sub in via.subs {
            infer_expr(sub.value, genv, scope, arena, map)?;
        }
    }
    Ok(())
}

fn check_io_bind<'a>(
    io: &'a IOBind<'a>,
    func: &'a Func<'a>,
    genv: &GlobalEnv<'a>,
    scope: &mut LocalScope<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
) -> Result<()> {
    let value_mtype = infer_expr(io.value, genv, scope, arena, map)?;
    match &value_mtype.ty.kind {
        TypeKind::Reader(_) | TypeKind::Writer(_) => {}
        _ => {
            return Err(TypeError::TypeMismatch {
                expected: "a reader or writer".to_string(),
                found: format!("{:?}", value_mtype.ty.kind),
                span: io.span,
            })
        }
    }
    scope.push();
    scope.declare(io.alias, value_mtype);
    for stmt in io.body {
        check_stmt(stmt, func, genv, scope, arena, map)?;
    }
    scope.pop();
    Ok(())
}

fn require_bool_stmt(m: &MType<'_>, span: Span) -> Result<()> {
    if matches!(m.ty.kind, TypeKind::Base(BaseType::Bool)) {
        Ok(())
    } else {
        Err(TypeError::TypeMismatch {
            expected: "bool".to_string(),
            found: format!("{:?}", m.ty.kind),
            span,
        })
    }
}
