//! Declaration-level nodes (§3.2: `Func`, `Status`, `Struct`, `Const`,
//! `Use`/`PackageID`/`File`).

use std::cell::Cell;

use toposafe_base::{Span, Symbol};

use crate::expr::Expr;
use crate::stmt::{Assert, Field, Stmt};
use crate::types::TypeExpr;

/// `func [receiver.]name[!|?](in) out { body }` (§3.2 `Func`, §4.3
/// "function purity markers").
#[derive(Debug)]
pub struct Func<'a> {
    pub public: bool,
    /// Trailing `!`: may write to parameters/observable state (§4.3).
    pub impure: bool,
    /// Trailing `?`: a coroutine that may suspend at `f?(...)` calls
    /// (§4.3, §4.5.5). At most one of `impure`/`suspendible` is set.
    pub suspendible: bool,
    /// The struct this method is declared on (`t.f`), if any.
    pub receiver: Option<Symbol>,
    pub name: Symbol,
    pub in_params: &'a [Field<'a>],
    pub out_params: &'a [Field<'a>],
    pub pre: &'a [Assert<'a>],
    pub post: &'a [Assert<'a>],
    pub body: &'a [Stmt<'a>],
    /// Stamped by the proof checker (§4.5.5): every primitive-typed local
    /// live across some suspension point in this function.
    pub resumable_vars: std::cell::RefCell<Vec<Symbol>>,
    /// Stamped once the proof checker has fully discharged every
    /// obligation in this function's body (§6.2: code generation "never
    /// reruns the proof checker; it relies on the stamped flags").
    pub proved: Cell<bool>,
    pub span: Span,
}

impl<'a> Func<'a> {
    pub fn qualified_name(&self) -> (Option<Symbol>, Symbol) {
        (self.receiver, self.name)
    }
}

/// A declared error/suspension constant (§3.2 `Status`, §6.1 `status`
/// keyword, glossary's `error`/`suspension` special names).
#[derive(Debug)]
pub struct Status {
    pub public: bool,
    pub name: Symbol,
    pub span: Span,
}

/// `struct name { fields }` (§3.2 `Struct`).
///
/// `suspendible` marks a struct containing resumable coroutine state, not
/// a function property — a struct itself never pauses, but §4.5.5's
/// resumable-variable set may reference struct-typed locals whose fields
/// are all primitive.
#[derive(Debug)]
pub struct Struct<'a> {
    pub public: bool,
    pub name: Symbol,
    pub fields: &'a [Field<'a>],
    pub suspendible: bool,
    pub span: Span,
}

/// A global, typed constant (§3.2 `Const`).
#[derive(Debug)]
pub struct Const<'a> {
    pub public: bool,
    pub name: Symbol,
    pub ty: &'a TypeExpr<'a>,
    pub value: &'a Expr<'a>,
    pub span: Span,
}

/// `use "path"` (§3.2, §6.1).
#[derive(Debug)]
pub struct Use {
    pub path: Symbol,
    pub span: Span,
}

/// `packageid "hex-literal"` (§6.1).
#[derive(Debug)]
pub struct PackageId {
    pub hex: Symbol,
    pub span: Span,
}

/// Any top-level declaration, for uniform iteration over a file's body.
#[derive(Debug, Clone, Copy)]
pub enum Decl<'a> {
    Func(&'a Func<'a>),
    Struct(&'a Struct<'a>),
    Const(&'a Const<'a>),
    Status(&'a Status),
}

/// A fully-parsed source file (§3.2 `File`, §6.1).
///
/// `structs` is reordered in place by the parser's post-pass into
/// topological order (§4.3, §8.1): for every struct `S` and field `f`
/// whose innermost type is struct `T`, `T` precedes `S`.
#[derive(Debug)]
pub struct File<'a> {
    /// Logical filename used in diagnostics (§6.3), not necessarily a
    /// real filesystem path.
    pub name: String,
    pub package_id: Option<PackageId>,
    pub uses: &'a [Use],
    pub structs: Vec<&'a Struct<'a>>,
    pub consts: &'a [&'a Const<'a>],
    pub statuses: &'a [&'a Status],
    pub funcs: &'a [&'a Func<'a>],
}

impl<'a> File<'a> {
    pub fn decls(&self) -> impl Iterator<Item = Decl<'a>> + '_ {
        self.structs
            .iter()
            .map(|s| Decl::Struct(*s))
            .chain(self.consts.iter().map(|c| Decl::Const(*c)))
            .chain(self.statuses.iter().map(|s| Decl::Status(*s)))
            .chain(self.funcs.iter().map(|f| Decl::Func(*f)))
    }
}
