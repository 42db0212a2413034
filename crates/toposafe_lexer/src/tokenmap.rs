//! The interned token map: a thin wrapper over [`toposafe_base::Interner`]
//! that pre-populates every keyword and special built-in identifier at
//! construction time, so they always receive the same low, stable symbol
//! ids regardless of what a given source file happens to mention first.
//!
//! Per §3.1/§4.1, the builtin id space occupies a fixed, contiguous prefix
//! of the interner: anything with `Symbol::index() < TokenMap::BUILTINS_END`
//! is a keyword, base type, or special identifier, never a user name.

use std::collections::HashMap;

use toposafe_base::{Interner, Symbol};

use crate::token::Keyword;

/// Interns source identifiers and pre-populates the builtin id range.
pub struct TokenMap {
    interner: Interner,
    keywords: HashMap<Symbol, Keyword>,
    builtins_end: usize,
    args: Symbol,
    this: Symbol,
    suspension: Symbol,
    true_lit: Symbol,
    false_lit: Symbol,
}

impl TokenMap {
    pub fn new() -> Self {
        let mut interner = Interner::new();
        let mut keywords = HashMap::with_capacity(Keyword::ALL.len());

        for &kw in Keyword::ALL {
            let sym = interner.intern(kw.text());
            keywords.insert(sym, kw);
        }

        let args = interner.intern("args");
        let this = interner.intern("this");
        let suspension = interner.intern("suspension");
        // `true`/`false` are not in the keyword glossary (a gap the
        // grammar needs closed, since `bool` is a base type with no other
        // way to write a literal): treated as pre-interned special
        // identifiers, the same mechanism as `args`/`this`/`suspension`,
        // rather than new reserved words.
        let true_lit = interner.intern("true");
        let false_lit = interner.intern("false");

        let builtins_end = interner.len();

        TokenMap {
            interner,
            keywords,
            builtins_end,
            args,
            this,
            suspension,
            true_lit,
            false_lit,
        }
    }

    /// Interns `s`, returning its (possibly newly assigned) symbol.
    pub fn intern(&mut self, s: &str) -> Symbol {
        self.interner.intern(s)
    }

    /// Resolves a symbol back to its text.
    pub fn resolve(&self, sym: Symbol) -> &str {
        self.interner.resolve(sym)
    }

    /// Looks up an existing symbol without interning.
    pub fn lookup(&self, s: &str) -> Option<Symbol> {
        self.interner.lookup(s)
    }

    /// If `sym` names a reserved keyword, returns it.
    pub fn keyword_for(&self, sym: Symbol) -> Option<Keyword> {
        self.keywords.get(&sym).copied()
    }

    /// `true` if `sym` was pre-populated at construction (a keyword, base
    /// type, or special identifier) rather than interned from user source.
    pub fn is_builtin(&self, sym: Symbol) -> bool {
        sym.index() < self.builtins_end
    }

    pub fn args_symbol(&self) -> Symbol {
        self.args
    }

    pub fn this_symbol(&self) -> Symbol {
        self.this
    }

    pub fn suspension_symbol(&self) -> Symbol {
        self.suspension
    }

    pub fn true_symbol(&self) -> Symbol {
        self.true_lit
    }

    pub fn false_symbol(&self) -> Symbol {
        self.false_lit
    }

    /// `Some(true/false)` if `sym` is the special `true`/`false` literal
    /// identifier, `None` for every other identifier.
    pub fn bool_literal(&self, sym: Symbol) -> Option<bool> {
        if sym == self.true_lit {
            Some(true)
        } else if sym == self.false_lit {
            Some(false)
        } else {
            None
        }
    }
}

impl Default for TokenMap {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keywords_are_builtin() {
        let map = TokenMap::new();
        let sym = map.lookup("func").unwrap();
        assert!(map.is_builtin(sym));
        assert_eq!(map.keyword_for(sym), Some(Keyword::Func));
    }

    #[test]
    fn user_identifier_is_not_builtin() {
        let mut map = TokenMap::new();
        let sym = map.intern("frobnicate");
        assert!(!map.is_builtin(sym));
        assert_eq!(map.keyword_for(sym), None);
    }

    #[test]
    fn special_identifiers_are_stable_and_builtin() {
        let map = TokenMap::new();
        assert!(map.is_builtin(map.args_symbol()));
        assert!(map.is_builtin(map.this_symbol()));
        assert!(map.is_builtin(map.suspension_symbol()));
    }

    #[test]
    fn repeated_construction_assigns_same_builtin_ids() {
        let a = TokenMap::new();
        let b = TokenMap::new();
        assert_eq!(
            a.lookup("while").unwrap().index(),
            b.lookup("while").unwrap().index()
        );
    }
}
