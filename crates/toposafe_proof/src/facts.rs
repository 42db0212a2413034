//! The fact set (§3.4, §4.5.2): "a set-of-canonicalised-expressions keyed
//! by a structural hash" (Design Note §9). A [`FactSet`] is immutable by
//! convention — every evolution rule in §4.5.2 builds a new set from the
//! old one rather than mutating it in place, which is what lets branch
//! merge (`if`/`else` intersection) and loop back-edges reason about two
//! or more fact sets side by side without aliasing surprises.
//!
//! Facts are `&'a Expr<'a>` nodes drawn from the same per-file arena the
//! rest of the checked tree lives in: a fact is just a boolean expression
//! known to hold, so reusing `Expr` rather than inventing a parallel term
//! type keeps `pp_expr`/structural equality/canonicalisation in one place
//! (Design Note §9 "Uniform node record vs tagged union" argues the
//! reverse for the *source* AST; the same argument favours reuse here,
//! since a fact genuinely is an expression, not a distinct sort).

use std::collections::HashMap;

use toposafe_ast::Expr;
use toposafe_base::Symbol;
use toposafe_lexer::TokenMap;

use crate::canon;

#[derive(Clone, Default)]
pub struct FactSet<'a> {
    by_key: HashMap<String, &'a Expr<'a>>,
}

impl<'a> FactSet<'a> {
    pub fn new() -> Self {
        FactSet { by_key: HashMap::new() }
    }

    pub fn len(&self) -> usize {
        self.by_key.len()
    }

    pub fn is_empty(&self) -> bool {
        self.by_key.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &'a Expr<'a>> + '_ {
        self.by_key.values().copied()
    }

    /// Adds `fact`, canonicalised, returning the (possibly unchanged) set.
    pub fn insert(&mut self, fact: &'a Expr<'a>, map: &TokenMap) {
        self.by_key.insert(canon::key(fact, map), fact);
    }

    pub fn contains(&self, fact: &Expr<'_>, map: &TokenMap) -> bool {
        self.by_key.contains_key(&canon::key(fact, map))
    }

    /// §4.5.2 assignment rule: drop every fact mentioning `name`.
    pub fn forget(&mut self, name: Symbol) {
        self.by_key.retain(|_, f| !canon::mentions(f, name));
    }

    /// §4.5.2 impure-call rule: drop every fact mentioning any of
    /// `names` (the conservative aliasing set, §9 Open Question 1).
    pub fn forget_all(&mut self, names: &[Symbol]) {
        self.by_key.retain(|_, f| !names.iter().any(|n| canon::mentions(f, n)));
    }

    /// Structural intersection of two fact sets (§4.5.2 "the outgoing
    /// fact set is the intersection... of the facts leaving A and leaving
    /// B"): a fact survives only if both sides know it, keyed
    /// canonically so argument order never causes a spurious miss.
    pub fn intersect(a: &FactSet<'a>, b: &FactSet<'a>) -> FactSet<'a> {
        let mut out = HashMap::new();
        for (k, v) in a.by_key.iter() {
            if b.by_key.contains_key(k) {
                out.insert(k.clone(), *v);
            }
        }
        FactSet { by_key: out }
    }

    /// Human-readable listing for a diagnostic (§4.5.6), in a stable
    /// (sorted) order so repeated runs produce byte-identical output.
    pub fn describe(&self, map: &TokenMap) -> Vec<String> {
        let mut out: Vec<String> = self.iter().map(|f| toposafe_ast::pp_expr(f, map)).collect();
        out.sort();
        out
    }
}
