//! The `Diagnostic` wire format (§6.4, §7) shared by every phase.
//!
//! Each crate upstream keeps its own `Result<T, E>` (`LexError`,
//! `ParseError`, `TypeError`, `ProofError`) implementing `std::error::Error`
//! via a manual `Display`. `toposafe-driver` converts each into a
//! `Diagnostic` at the phase boundary, which is the one place that needs
//! a uniform type to aggregate and render.

use toposafe_base::{LineIndex, Span};
use toposafe_lexer::LexError;
use toposafe_parser::ParseError;
use toposafe_proof::ProofError;
use toposafe_typeck::TypeError;

/// §7's nine error kinds, minus "Internal error" (kind 9), which never
/// becomes a `Diagnostic` — it is reported separately via
/// [`crate::CompileError::Internal`] and short-circuits normal collection.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DiagnosticKind {
    Lex,
    Parse,
    Name,
    Type,
    Bounds,
    Assertion,
    Coroutine,
    Topology,
}

impl DiagnosticKind {
    pub fn text(&self) -> &'static str {
        match self {
            DiagnosticKind::Lex => "lex error",
            DiagnosticKind::Parse => "parse error",
            DiagnosticKind::Name => "name error",
            DiagnosticKind::Type => "type error",
            DiagnosticKind::Bounds => "bounds error",
            DiagnosticKind::Assertion => "assertion error",
            DiagnosticKind::Coroutine => "coroutine error",
            DiagnosticKind::Topology => "topology error",
        }
    }
}

/// Every diagnostic this pipeline emits is user-facing and terminal (§7:
/// "nothing is silently recovered"); there is currently no non-fatal
/// warning kind to distinguish it from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Severity {
    Error,
}

impl Severity {
    pub fn text(&self) -> &'static str {
        match self {
            Severity::Error => "error",
        }
    }
}

/// One diagnostic (§6.4): a file-relative location, its kind and
/// severity, a message, and — for a bounds/assertion failure — the facts
/// known at that point (§4.5.6).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Diagnostic {
    pub file: String,
    pub span: Span,
    pub line: usize,
    pub severity: Severity,
    pub kind: DiagnosticKind,
    pub message: String,
    pub facts: Vec<String>,
}

impl Diagnostic {
    fn new(file: &str, lines: &LineIndex, span: Span, kind: DiagnosticKind, message: String) -> Self {
        Diagnostic {
            file: file.to_string(),
            span,
            line: lines.line_at(span.start),
            severity: Severity::Error,
            kind,
            message,
            facts: Vec::new(),
        }
    }

    fn with_facts(mut self, facts: Vec<String>) -> Self {
        self.facts = facts;
        self
    }
}

pub fn from_lex_error(file: &str, lines: &LineIndex, e: LexError) -> Diagnostic {
    let span = match e {
        LexError::InvalidByte { span, .. }
        | LexError::UnterminatedString { span }
        | LexError::UnterminatedComment { span }
        | LexError::EmptyDigitSequence { span }
        | LexError::InvalidUnicodeEscape { span }
        | LexError::InvalidEscape { span } => span,
    };
    Diagnostic::new(file, lines, span, DiagnosticKind::Lex, e.to_string())
}

pub fn from_parse_error(file: &str, lines: &LineIndex, e: ParseError) -> Diagnostic {
    let (span, kind) = match e {
        ParseError::StructCycle { span, .. } | ParseError::UnresolvedJumpLabel { span, .. } | ParseError::JumpOutsideLoop { span } => {
            (span, DiagnosticKind::Topology)
        }
        ParseError::UnexpectedToken { span, .. }
        | ParseError::MissingDelimiter { span, .. }
        | ParseError::InvalidGrammar { span, .. }
        | ParseError::ExprDepthExceeded { span }
        | ParseError::TypeExprDepthExceeded { span }
        | ParseError::BodyDepthExceeded { span }
        | ParseError::AmbiguousPrecedence { span }
        | ParseError::PositionalArgument { span }
        | ParseError::AssertionOutOfOrder { span }
        | ParseError::MultiplePurityMarkers { span } => (span, DiagnosticKind::Parse),
    };
    Diagnostic::new(file, lines, span, kind, e.to_string())
}

pub fn from_type_error(file: &str, lines: &LineIndex, e: TypeError) -> Diagnostic {
    let (span, kind) = match &e {
        TypeError::UnknownIdentifier { span, .. }
        | TypeError::DuplicateDeclaration { second: span, .. }
        | TypeError::UnknownField { span, .. }
        | TypeError::UnknownPackage { span, .. }
        | TypeError::UnknownType { span, .. } => (*span, DiagnosticKind::Name),
        TypeError::NotAStruct { span }
        | TypeError::WrongOperandKind { span, .. }
        | TypeError::TypeMismatch { span, .. }
        | TypeError::BitwiseRequiresUnsigned { span }
        | TypeError::NotIndexable { span }
        | TypeError::NotCallable { span }
        | TypeError::MissingArgument { span, .. }
        | TypeError::DuplicateArgument { span, .. }
        | TypeError::UnknownArgument { span, .. }
        | TypeError::WrongArity { span, .. } => (*span, DiagnosticKind::Type),
        TypeError::CoroutineCallOutsideCoroutine { span } | TypeError::CoroutineSyntaxMismatch { span } => {
            (*span, DiagnosticKind::Coroutine)
        }
    };
    Diagnostic::new(file, lines, span, kind, e.to_string())
}

/// Converts a `ProofError` into the outcome it implies: every variant but
/// `Internal` becomes a normal `Diagnostic`; `Internal` has no span and
/// is returned as `Err` so the caller can route it to
/// [`crate::CompileError::Internal`] instead of normal collection (§7
/// "internal errors abort immediately").
pub fn from_proof_error(file: &str, lines: &LineIndex, e: ProofError) -> Result<Diagnostic, String> {
    let span = match e.span() {
        Some(span) => span,
        None => {
            return match e {
                ProofError::Internal { message } => Err(message),
                _ => unreachable!("every non-Internal ProofError variant has a span"),
            }
        }
    };
    let kind = match &e {
        ProofError::BoundsObligationUnproved { .. } => DiagnosticKind::Bounds,
        ProofError::AssertionUnproved { .. }
        | ProofError::UnknownRule { .. }
        | ProofError::MissingRuleSubstitution { .. }
        | ProofError::UnmetPremise { .. } => DiagnosticKind::Assertion,
        ProofError::SuspendOutsideCoroutine { .. } | ProofError::PointerResumableAcrossSuspension { .. } => {
            DiagnosticKind::Coroutine
        }
        ProofError::Internal { .. } => unreachable!("handled above"),
    };
    let facts = match &e {
        ProofError::BoundsObligationUnproved { facts, .. } | ProofError::AssertionUnproved { facts, .. } => facts.clone(),
        _ => Vec::new(),
    };
    Ok(Diagnostic::new(file, lines, span, kind, e.to_string()).with_facts(facts))
}
