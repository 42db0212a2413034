//! Type-checking failure modes (§7 "Name error", "Type error").
//!
//! The type checker reports two of the nine error kinds in §7:
//! unresolved/duplicate names (kind 3) and type mismatches (kind 4). Both
//! live in one enum here: one error type per crate rather than one per
//! concern (`ParseError` in `toposafe-parser` similarly folds several
//! §7 kinds together).

use toposafe_base::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeError {
    /// An identifier that resolves to no local, parameter, field, global
    /// const, status, or function (§4.4.1 "Identifiers").
    UnknownIdentifier { name: String, span: Span },
    /// Two declarations at the same scope share a name.
    DuplicateDeclaration { name: String, first: Span, second: Span },
    /// `x.f` where `x` is not a struct or package value.
    NotAStruct { span: Span },
    /// `x.f` where `f` names no field of `x`'s struct type.
    UnknownField { name: String, span: Span },
    /// `pkg.name` where `pkg` names no known package.
    UnknownPackage { name: String, span: Span },
    /// `not x` / unary `+`/`-` on a non-bool / non-numeric operand.
    WrongOperandKind { op: String, expected: &'static str, span: Span },
    /// Binary arithmetic/compare/bitwise/logical operands mismatched or
    /// of the wrong sort (§4.4.1).
    TypeMismatch { expected: String, found: String, span: Span },
    /// `&`/`|`/`^` applied to a signed operand (§4.4.1 "Bitwise").
    BitwiseRequiresUnsigned { span: Span },
    /// `a[i]` / `a[i ..= j]` where `a` is not array/slice.
    NotIndexable { span: Span },
    /// `f(...)` where `f` does not resolve to a function.
    NotCallable { span: Span },
    /// A formal parameter was supplied more than once, or not at all.
    MissingArgument { name: String, span: Span },
    DuplicateArgument { name: String, span: Span },
    UnknownArgument { name: String, span: Span },
    /// Arity mismatch beyond what `Missing`/`DuplicateArgument` already
    /// describe (kept for diagnostics that count rather than name).
    WrongArity { expected: usize, found: usize, span: Span },
    /// `f?(...)` outside of a `?`-suffixed function is a grammar-level
    /// legality question the type checker still needs to answer before
    /// the proof checker can assume `Suspendible` propagation is sound
    /// (the proof checker re-checks and reports this as a Coroutine
    /// error per §7; the type checker's copy guards §4.4.1's "allowed
    /// only from a `?`-suffixed function").
    CoroutineCallOutsideCoroutine { span: Span },
    /// `f?(...)` where `f` is not declared suspendible, or a plain `f(...)`
    /// call of a suspendible `f` (§4.4.1 requires the call-site marker to
    /// match the callee's declaration).
    CoroutineSyntaxMismatch { span: Span },
    /// A cast, cyclic const, or struct field whose declared type cannot
    /// be resolved at all (struct cycles are caught earlier by the
    /// parser's topo-sort; this covers a type naming an unknown struct).
    UnknownType { name: String, span: Span },
}

impl std::fmt::Display for TypeError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TypeError::UnknownIdentifier { name, span } => {
                write!(f, "unknown identifier '{name}' at {span:?}")
            }
            TypeError::DuplicateDeclaration { name, first, second } => {
                write!(f, "'{name}' declared twice, at {first:?} and {second:?}")
            }
            TypeError::NotAStruct { span } => {
                write!(f, "selector base is not a struct or package at {span:?}")
            }
            TypeError::UnknownField { name, span } => {
                write!(f, "no field '{name}' at {span:?}")
            }
            TypeError::UnknownPackage { name, span } => {
                write!(f, "unknown package '{name}' at {span:?}")
            }
            TypeError::WrongOperandKind { op, expected, span } => {
                write!(f, "'{op}' requires a {expected} operand at {span:?}")
            }
            TypeError::TypeMismatch { expected, found, span } => {
                write!(f, "expected {expected}, found {found} at {span:?}")
            }
            TypeError::BitwiseRequiresUnsigned { span } => {
                write!(f, "bitwise operators require unsigned operands at {span:?}")
            }
            TypeError::NotIndexable { span } => {
                write!(f, "not an array or slice at {span:?}")
            }
            TypeError::NotCallable { span } => {
                write!(f, "not a function at {span:?}")
            }
            TypeError::MissingArgument { name, span } => {
                write!(f, "missing argument '{name}' at {span:?}")
            }
            TypeError::DuplicateArgument { name, span } => {
                write!(f, "argument '{name}' supplied more than once at {span:?}")
            }
            TypeError::UnknownArgument { name, span } => {
                write!(f, "'{name}' is not a parameter of this function at {span:?}")
            }
            TypeError::WrongArity { expected, found, span } => {
                write!(f, "expected {expected} argument(s), found {found} at {span:?}")
            }
            TypeError::CoroutineCallOutsideCoroutine { span } => {
                write!(f, "coroutine call outside of a '?'-suffixed function at {span:?}")
            }
            TypeError::CoroutineSyntaxMismatch { span } => {
                write!(f, "call-site '?' marker does not match callee's declaration at {span:?}")
            }
            TypeError::UnknownType { name, span } => {
                write!(f, "unknown type '{name}' at {span:?}")
            }
        }
    }
}

impl std::error::Error for TypeError {}

pub type Result<T> = std::result::Result<T, TypeError>;
