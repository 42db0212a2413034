//! Name resolution tables: the file-scope registries (§4.4.1 "globals are
//! visible everywhere in the file") and the nested local-scope stack a
//! function body walk pushes/pops as it enters/leaves blocks.

use std::collections::HashMap;

use toposafe_ast::{Const, File, Func, MType, Status, Struct};
use toposafe_base::Symbol;
use toposafe_lexer::TokenMap;

use crate::error::{Result, TypeError};

/// File-scope declarations, keyed for O(1) lookup during checking.
pub struct GlobalEnv<'a> {
    pub structs: HashMap<Symbol, &'a Struct<'a>>,
    pub consts: HashMap<Symbol, &'a Const<'a>>,
    pub statuses: HashMap<Symbol, &'a Status>,
    /// Keyed by `(receiver, name)`; free functions have `receiver: None`.
    pub funcs: HashMap<(Option<Symbol>, Symbol), &'a Func<'a>>,
    /// Last path segment of every `use "..."` declaration, the alias a
    /// `pkg.name` qualified identifier refers to (§6.1). Cross-file symbol
    /// tables are out of scope for a single-file check (§9 Non-goals:
    /// "no linker"); a resolved package qualifies as an opaque external
    /// reference rather than one this crate can type fully.
    pub known_packages: std::collections::HashSet<Symbol>,
}

impl<'a> GlobalEnv<'a> {
    pub fn build(file: &File<'a>, map: &TokenMap) -> Result<Self> {
        let mut structs = HashMap::new();
        for s in file.structs.iter() {
            if let Some(prev) = structs.insert(s.name, *s) {
                return Err(TypeError::DuplicateDeclaration {
                    name: map.resolve(s.name).to_string(),
                    first: prev.span,
                    second: s.span,
                });
            }
        }
        let mut consts = HashMap::new();
        for c in file.consts.iter() {
            if let Some(prev) = consts.insert(c.name, *c) {
                return Err(TypeError::DuplicateDeclaration {
                    name: map.resolve(c.name).to_string(),
                    first: prev.span,
                    second: c.span,
                });
            }
        }
        let mut statuses = HashMap::new();
        for s in file.statuses.iter() {
            if let Some(prev) = statuses.insert(s.name, *s) {
                return Err(TypeError::DuplicateDeclaration {
                    name: map.resolve(s.name).to_string(),
                    first: prev.span,
                    second: s.span,
                });
            }
        }
        let mut funcs = HashMap::new();
        for f in file.funcs.iter() {
            let key = (f.receiver, f.name);
            if let Some(prev) = funcs.insert(key, *f) {
                return Err(TypeError::DuplicateDeclaration {
                    name: map.resolve(f.name).to_string(),
                    first: prev.span,
                    second: f.span,
                });
            }
        }
        let known_packages = file.uses.iter().map(|u| u.path).collect();
        Ok(GlobalEnv { structs, consts, statuses, funcs, known_packages })
    }

    pub fn lookup_func(&self, receiver: Option<Symbol>, name: Symbol) -> Option<&'a Func<'a>> {
        self.funcs.get(&(receiver, name)).copied()
    }
}

/// A stack of lexical scopes for locals and parameters, innermost last.
/// Pushed on function entry and on every block that introduces new
/// bindings (`if`/`while`/`io` bodies in this DSL do not shadow — only
/// `var` declarations add bindings — but the stack still models block
/// exit cleanly for nested `var`s with the same name in sibling blocks).
pub struct LocalScope<'a> {
    frames: Vec<HashMap<Symbol, MType<'a>>>,
}

impl<'a> LocalScope<'a> {
    pub fn new() -> Self {
        LocalScope { frames: vec![HashMap::new()] }
    }

    pub fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    pub fn pop(&mut self) {
        self.frames.pop();
    }

    pub fn declare(&mut self, name: Symbol, mtype: MType<'a>) {
        self.frames.last_mut().expect("at least one scope frame").insert(name, mtype);
    }

    pub fn lookup(&self, name: Symbol) -> Option<MType<'a>> {
        self.frames.iter().rev().find_map(|f| f.get(&name).cloned())
    }
}

impl<'a> Default for LocalScope<'a> {
    fn default() -> Self {
        Self::new()
    }
}
