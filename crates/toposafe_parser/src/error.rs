//! Parse-time failure modes (§4.3, §7 "Parse error").

use toposafe_base::Span;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ParseError {
    UnexpectedToken {
        expected: String,
        found: String,
        span: Span,
    },
    MissingDelimiter {
        delimiter: &'static str,
        span: Span,
    },
    InvalidGrammar {
        message: String,
        span: Span,
    },
    /// `MaxExprDepth = 255` exceeded (§4.3).
    ExprDepthExceeded { span: Span },
    /// `MaxTypeExprDepth = 63` exceeded (§4.3).
    TypeExprDepthExceeded { span: Span },
    /// `MaxBodyDepth = 255` exceeded (§4.3).
    BodyDepthExceeded { span: Span },
    /// `a * b + c` without parentheses: two distinct non-associative or
    /// mismatched operators chained without disambiguating parens (§4.3
    /// "flat precedence").
    AmbiguousPrecedence { span: Span },
    /// Positional call argument (`f(x)` instead of `f(name: x)`, §4.3).
    PositionalArgument { span: Span },
    /// `assert`/`pre`/`inv`/`post` out of the fixed `pre, inv, post` order
    /// on a `func` or `while` (§4.3).
    AssertionOutOfOrder { span: Span },
    /// More than one of `!`/`?` on a function name (§4.3).
    MultiplePurityMarkers { span: Span },
    /// A cyclic struct field-type dependency (§4.3 post-parse pass, §7
    /// "Topology error").
    StructCycle { name: String, span: Span },
    /// `break`/`continue` whose label matches no enclosing `while` (§7
    /// "Topology error": "jump with no matching target label").
    UnresolvedJumpLabel { label: String, span: Span },
    /// `break`/`continue` outside of any loop.
    JumpOutsideLoop { span: Span },
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ParseError::UnexpectedToken { expected, found, span } => {
                write!(f, "expected {expected}, found {found} at {span:?}")
            }
            ParseError::MissingDelimiter { delimiter, span } => {
                write!(f, "missing '{delimiter}' at {span:?}")
            }
            ParseError::InvalidGrammar { message, span } => {
                write!(f, "{message} at {span:?}")
            }
            ParseError::ExprDepthExceeded { span } => {
                write!(f, "expression nesting exceeds MaxExprDepth (255) at {span:?}")
            }
            ParseError::TypeExprDepthExceeded { span } => {
                write!(f, "type nesting exceeds MaxTypeExprDepth (63) at {span:?}")
            }
            ParseError::BodyDepthExceeded { span } => {
                write!(f, "body nesting exceeds MaxBodyDepth (255) at {span:?}")
            }
            ParseError::AmbiguousPrecedence { span } => {
                write!(f, "mixed operators require explicit parentheses at {span:?}")
            }
            ParseError::PositionalArgument { span } => {
                write!(f, "call arguments require 'name: value' form at {span:?}")
            }
            ParseError::AssertionOutOfOrder { span } => {
                write!(f, "assertions must appear in order pre, inv, post at {span:?}")
            }
            ParseError::MultiplePurityMarkers { span } => {
                write!(f, "at most one of '!' or '?' is allowed on a function name at {span:?}")
            }
            ParseError::StructCycle { name, span } => {
                write!(f, "cyclic struct dependency involving '{name}' at {span:?}")
            }
            ParseError::UnresolvedJumpLabel { label, span } => {
                write!(f, "no enclosing loop labeled '{label}' at {span:?}")
            }
            ParseError::JumpOutsideLoop { span } => {
                write!(f, "break/continue outside of any loop at {span:?}")
            }
        }
    }
}

impl std::error::Error for ParseError {}

pub type Result<T> = std::result::Result<T, ParseError>;
