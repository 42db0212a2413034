//! Post-parse passes that need whole-function or whole-file context the
//! single left-to-right grammar walk doesn't have yet (§4.3): binding
//! `break`/`continue` to their enclosing loop, and putting struct
//! declarations into dependency order.

use std::collections::HashMap;

use toposafe_ast::{
    ElseBranch, File, If, JumpKind, Stmt, StmtKind, Struct, TypeExpr, TypeKind, While,
};
use toposafe_base::Symbol;
use toposafe_lexer::TokenMap;

use crate::error::{ParseError, Result};

/// Walks every function body in `file`, binding each `Jump` to its
/// enclosing `While` (by label if given, otherwise the innermost loop)
/// and stamping that loop's `has_break`/`has_continue` flags (§4.3, used
/// by the proof checker's loop-exit fact rule, §4.5.2).
pub fn resolve_jumps<'a>(file: &File<'a>, map: &TokenMap) -> Result<()> {
    for func in file.funcs {
        let mut stack: Vec<&'a While<'a>> = Vec::new();
        resolve_block(func.body, &mut stack, map)?;
    }
    Ok(())
}

fn resolve_block<'a>(
    stmts: &[Stmt<'a>],
    stack: &mut Vec<&'a While<'a>>,
    map: &TokenMap,
) -> Result<()> {
    for stmt in stmts {
        resolve_stmt(stmt, stack, map)?;
    }
    Ok(())
}

fn resolve_stmt<'a>(
    stmt: &Stmt<'a>,
    stack: &mut Vec<&'a While<'a>>,
    map: &TokenMap,
) -> Result<()> {
    match &stmt.kind {
        StmtKind::If(if_stmt) => resolve_if(if_stmt, stack, map),
        StmtKind::While(w) => {
            stack.push(w);
            let result = resolve_block(w.body, stack, map);
            stack.pop();
            result
        }
        StmtKind::IOBind(io) => resolve_block(io.body, stack, map),
        StmtKind::Jump(jump) => {
            let target = match jump.label {
                Some(label) => stack.iter().rev().find(|w| w.label == Some(label)).copied(),
                None => stack.last().copied(),
            };
            match target {
                Some(w) => {
                    jump.target.set(Some(w));
                    match jump.kind {
                        JumpKind::Break => w.has_break.set(true),
                        JumpKind::Continue => w.has_continue.set(true),
                    }
                    Ok(())
                }
                None if jump.label.is_some() => Err(ParseError::UnresolvedJumpLabel {
                    label: map.resolve(jump.label.unwrap()).to_string(),
                    span: stmt.span,
                }),
                None => Err(ParseError::JumpOutsideLoop { span: stmt.span }),
            }
        }
        StmtKind::Var(_) | StmtKind::Assign(_) | StmtKind::Expr(_) | StmtKind::Return(_)
        | StmtKind::Assert(_) => Ok(()),
    }
}

fn resolve_if<'a>(
    if_stmt: &If<'a>,
    stack: &mut Vec<&'a While<'a>>,
    map: &TokenMap,
) -> Result<()> {
    resolve_block(if_stmt.then_branch, stack, map)?;
    match &if_stmt.else_branch {
        Some(ElseBranch::ElseIf(inner)) => resolve_if(inner, stack, map),
        Some(ElseBranch::Block(block)) => resolve_block(block, stack, map),
        None => Ok(()),
    }
}

/// Reorders `file.structs` into dependency order in place: for every
/// struct `S` with a field whose innermost type names struct `T`, `T`
/// precedes `S` in the result (§4.3, §8.1). Fails with `StructCycle` if
/// the dependency graph has one.
pub fn topo_sort_structs<'a>(file: &mut File<'a>, map: &TokenMap) -> Result<()> {
    let index_by_name: HashMap<Symbol, usize> = file
        .structs
        .iter()
        .enumerate()
        .map(|(i, s)| (s.name, i))
        .collect();

    let n = file.structs.len();
    let mut deps: Vec<Vec<usize>> = vec![Vec::new(); n];
    for (i, s) in file.structs.iter().enumerate() {
        for field in s.fields {
            collect_struct_refs(field.ty, &index_by_name, &mut deps[i]);
        }
    }

    let mut state = vec![0u8; n]; // 0 = unvisited, 1 = in progress, 2 = done
    let mut order = Vec::with_capacity(n);

    for start in 0..n {
        if state[start] == 0 {
            visit(start, &deps, &mut state, &mut order, file.structs[start], map)?;
        }
    }

    file.structs = order.into_iter().map(|i| file.structs[i]).collect();
    Ok(())
}

fn visit<'a>(
    node: usize,
    deps: &[Vec<usize>],
    state: &mut [u8],
    order: &mut Vec<usize>,
    owner: &Struct<'a>,
    map: &TokenMap,
) -> Result<()> {
    state[node] = 1;
    for &dep in &deps[node] {
        match state[dep] {
            0 => visit(dep, deps, state, order, owner, map)?,
            1 => {
                return Err(ParseError::StructCycle {
                    name: map.resolve(owner.name).to_string(),
                    span: owner.span,
                })
            }
            _ => {}
        }
    }
    state[node] = 2;
    order.push(node);
    Ok(())
}

fn collect_struct_refs(
    ty: &TypeExpr<'_>,
    index_by_name: &HashMap<Symbol, usize>,
    out: &mut Vec<usize>,
) {
    match &ty.kind {
        TypeKind::Struct(name) => {
            if let Some(&idx) = index_by_name.get(name) {
                out.push(idx);
            }
        }
        TypeKind::Array { elem, .. } => collect_struct_refs(elem, index_by_name, out),
        TypeKind::Ptr(inner) | TypeKind::Nptr(inner) | TypeKind::Slice(inner) => {
            collect_struct_refs(inner, index_by_name, out)
        }
        TypeKind::Refined { base, .. } => collect_struct_refs(base, index_by_name, out),
        TypeKind::Base(_) | TypeKind::Ideal | TypeKind::Reader(_) | TypeKind::Writer(_) => {}
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use toposafe_lexer::lex;
    use toposafe_ast::AstArena;

    fn parse(src: &str) -> (File<'static>, toposafe_lexer::TokenMap) {
        let (tokens, map) = lex(src).expect("lex ok");
        let arena: &'static AstArena = Box::leak(Box::new(AstArena::new()));
        let file = crate::parser::parse_file(&tokens, &map, arena, "test.dsl").expect("parses");
        (file, map)
    }

    #[test]
    fn break_binds_to_innermost_loop() {
        let (file, map) = parse(
            r#"
            pri func t.f() {
                while true {
                    break
                }
            }
            "#,
        );
        resolve_jumps(&file, &map).expect("resolves");
        let body = file.funcs[0].body;
        match &body[0].kind {
            StmtKind::While(w) => assert!(w.has_break.get()),
            other => panic!("expected while, got {other:?}"),
        }
    }

    #[test]
    fn labeled_break_binds_to_named_loop() {
        let (file, map) = parse(
            r#"
            pri func t.f() {
                while :outer true {
                    while true {
                        break:outer
                    }
                }
            }
            "#,
        );
        resolve_jumps(&file, &map).expect("resolves");
        let body = file.funcs[0].body;
        match &body[0].kind {
            StmtKind::While(outer) => assert!(outer.has_break.get()),
            other => panic!("expected while, got {other:?}"),
        }
    }

    #[test]
    fn break_outside_loop_is_rejected() {
        let (file, map) = parse(
            r#"
            pri func t.f() {
                break
            }
            "#,
        );
        let err = resolve_jumps(&file, &map).unwrap_err();
        assert!(matches!(err, ParseError::JumpOutsideLoop { .. }));
    }

    #[test]
    fn structs_are_reordered_by_dependency() {
        let (mut file, map) = parse(
            r#"
            pub struct b {
                inner a
            }
            pub struct a {
                x u32
            }
            "#,
        );
        topo_sort_structs(&mut file, &map).expect("no cycle");
        assert_eq!(map.resolve(file.structs[0].name), "a");
        assert_eq!(map.resolve(file.structs[1].name), "b");
    }
}
