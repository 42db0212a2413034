//! The fixed, versioned `via` rule catalogue (§4.5.4; Design Note §9
//! Open Question 2: "the full list of built-in `via` rules is not fixed
//! in the source beyond a handful of examples; implementers should
//! publish a versioned rule catalogue and treat it as part of the ABI
//! the DSL standard library depends on"). This is catalogue version 1.
//!
//! Only `"a < b: a < c; c <= b"` is pinned by the spec text itself
//! (§8.4 Scenario E); the remaining entries round out the same
//! transitivity/substitution family through `<`/`<=`/`==` that a
//! bounds-checking standard library would plausibly reach for, without
//! attempting a general first-order prover — each rule is a hand-written
//! structural match rather than an interpreted pattern language, since
//! the catalogue is meant to be closed and reviewable, not extensible at
//! runtime (§4.5.4 "reject an unknown rule name").

use std::collections::HashMap;

use toposafe_ast::{AstArena, BinaryOp, Expr, ExprKind, ViaSub};
use toposafe_base::{Span, Symbol};
use toposafe_lexer::TokenMap;

use crate::error::{ProofError, Result};
use crate::facts::FactSet;

/// The `via`-supplied substitution, keyed by the meta-variable's interned
/// name (§4.3 `ViaSub`).
pub type Substitution<'a> = HashMap<Symbol, &'a Expr<'a>>;

struct RuleSpec {
    name: &'static str,
    goal_op: BinaryOp,
    free_vars: &'static [&'static str],
}

const CATALOGUE: &[RuleSpec] = &[
    RuleSpec { name: "a < b: a < c; c <= b", goal_op: BinaryOp::Lt, free_vars: &["c"] },
    RuleSpec { name: "a < b: a <= c; c < b", goal_op: BinaryOp::Lt, free_vars: &["c"] },
    RuleSpec { name: "a <= b: a <= c; c <= b", goal_op: BinaryOp::Le, free_vars: &["c"] },
    RuleSpec { name: "a <= b: a == c; c <= b", goal_op: BinaryOp::Le, free_vars: &["c"] },
    RuleSpec { name: "a >= b: b <= a", goal_op: BinaryOp::Ge, free_vars: &[] },
    RuleSpec { name: "a != b: a < b or b < a", goal_op: BinaryOp::Ne, free_vars: &[] },
];

fn find_sub<'a>(subs: &Substitution<'a>, name: &str, map: &TokenMap) -> Option<&'a Expr<'a>> {
    subs.iter().find(|(sym, _)| map.resolve(**sym) == name).map(|(_, e)| *e)
}

fn check_premise<'a>(
    premise: &'a Expr<'a>,
    facts: &FactSet<'a>,
    rule: &str,
    map: &TokenMap,
    span: Span,
) -> Result<()> {
    if facts.contains(premise, map) {
        Ok(())
    } else {
        Err(ProofError::UnmetPremise {
            premise: toposafe_ast::pp_expr(premise, map),
            rule: rule.to_string(),
            span,
        })
    }
}

/// Discharges `goal` via the named rule, given the `via(...)` free
/// meta-variable substitutions and the fact set in scope at the `assert`
/// (§4.5.4). `goal`'s own top-level operands (`a`, `b`) are taken from
/// the goal expression itself, never from the substitution — only the
/// rule's *free* meta-variables (those not already bound by the goal's
/// shape) may be substituted.
pub fn discharge<'a>(
    rule_name: Symbol,
    subs_list: &'a [ViaSub<'a>],
    goal: &'a Expr<'a>,
    facts: &FactSet<'a>,
    arena: &'a AstArena,
    map: &TokenMap,
    span: Span,
) -> Result<()> {
    let rule_name_str = map.resolve(rule_name);
    let spec = CATALOGUE
        .iter()
        .find(|r| r.name == rule_name_str)
        .ok_or_else(|| ProofError::UnknownRule { name: rule_name_str.to_string(), span })?;

    let (op, a, b) = match &goal.kind {
        ExprKind::Binary(op, a, b) => (*op, *a, *b),
        _ => {
            return Err(ProofError::UnmetPremise {
                premise: format!("goal must be a binary comparison for rule '{}'", spec.name),
                rule: spec.name.to_string(),
                span,
            })
        }
    };
    if op != spec.goal_op {
        return Err(ProofError::UnmetPremise {
            premise: format!("goal operator must be '{}' for rule '{}'", spec.goal_op.text(), spec.name),
            rule: spec.name.to_string(),
            span,
        });
    }

    let mut subs: Substitution<'a> = HashMap::new();
    for sub in subs_list {
        subs.insert(sub.meta_var, sub.value);
    }
    for free in spec.free_vars {
        if find_sub(&subs, free, map).is_none() {
            return Err(ProofError::MissingRuleSubstitution {
                meta_var: (*free).to_string(),
                rule: spec.name.to_string(),
                span,
            });
        }
    }

    match spec.name {
        "a < b: a < c; c <= b" => {
            let c = find_sub(&subs, "c", map).expect("checked above");
            check_premise(arena.alloc(Expr::new(span, ExprKind::Binary(BinaryOp::Lt, a, c))), facts, spec.name, map, span)?;
            check_premise(arena.alloc(Expr::new(span, ExprKind::Binary(BinaryOp::Le, c, b))), facts, spec.name, map, span)
        }
        "a < b: a <= c; c < b" => {
            let c = find_sub(&subs, "c", map).expect("checked above");
            check_premise(arena.alloc(Expr::new(span, ExprKind::Binary(BinaryOp::Le, a, c))), facts, spec.name, map, span)?;
            check_premise(arena.alloc(Expr::new(span, ExprKind::Binary(BinaryOp::Lt, c, b))), facts, spec.name, map, span)
        }
        "a <= b: a <= c; c <= b" => {
            let c = find_sub(&subs, "c", map).expect("checked above");
            check_premise(arena.alloc(Expr::new(span, ExprKind::Binary(BinaryOp::Le, a, c))), facts, spec.name, map, span)?;
            check_premise(arena.alloc(Expr::new(span, ExprKind::Binary(BinaryOp::Le, c, b))), facts, spec.name, map, span)
        }
        "a <= b: a == c; c <= b" => {
            let c = find_sub(&subs, "c", map).expect("checked above");
            check_premise(arena.alloc(Expr::new(span, ExprKind::Binary(BinaryOp::Eq, a, c))), facts, spec.name, map, span)?;
            check_premise(arena.alloc(Expr::new(span, ExprKind::Binary(BinaryOp::Le, c, b))), facts, spec.name, map, span)
        }
        "a >= b: b <= a" => {
            check_premise(arena.alloc(Expr::new(span, ExprKind::Binary(BinaryOp::Le, b, a))), facts, spec.name, map, span)
        }
        "a != b: a < b or b < a" => {
            let lt1 = arena.alloc(Expr::new(span, ExprKind::Binary(BinaryOp::Lt, a, b)));
            let lt2 = arena.alloc(Expr::new(span, ExprKind::Binary(BinaryOp::Lt, b, a)));
            if facts.contains(lt1, map) || facts.contains(lt2, map) {
                Ok(())
            } else {
                Err(ProofError::UnmetPremise {
                    premise: format!(
                        "{} or {}",
                        toposafe_ast::pp_expr(lt1, map),
                        toposafe_ast::pp_expr(lt2, map)
                    ),
                    rule: spec.name.to_string(),
                    span,
                })
            }
        }
        other => unreachable!("rule '{other}' listed in CATALOGUE but not implemented"),
    }
}
