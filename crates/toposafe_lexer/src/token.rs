//! Token types for the toposafe lexer and parser.
//!
//! A [`Token`] pairs a [`TokenKind`] tag with a stable interned [`Symbol`]
//! (the raw source lexeme) and a [`Span`]. Operator tokens additionally
//! carry static [`TokenFlags`] used by the parser to decide unary/binary
//! disambiguation, associativity chaining, and bracket matching without
//! re-deriving that information from the grammar at every call site.

use bitflags::bitflags;
use num_bigint::BigInt;
use toposafe_base::{Span, Symbol};

bitflags! {
    /// Static properties of an operator token, consulted by the parser.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    pub struct TokenFlags: u16 {
        /// May appear as a prefix unary operator (`-x`, `not x`).
        const UNARY_OP       = 0b0000_0001;
        /// May appear as an infix binary operator (`a - b`).
        const BINARY_OP      = 0b0000_0010;
        /// May chain unparenthesized in an associative run (`a + b + c`).
        const ASSOCIATIVE_OP = 0b0000_0100;
        /// Opens a bracketed group (`(`, `[`, `{`).
        const OPEN           = 0b0000_1000;
        /// Closes a bracketed group (`)`, `]`, `}`).
        const CLOSE          = 0b0001_0000;
        /// Binds tightly to the token on its left (postfix-like: `)`, `]`, `,`).
        const TIGHT_LEFT     = 0b0010_0000;
        /// Binds tightly to the token on its right (prefix-like: `(`, `[`, unary ops).
        const TIGHT_RIGHT    = 0b0100_0000;
    }
}

/// The closed set of reserved words. Base type names and operator words
/// (`and`, `or`, `not`, `as`) are keywords too: they can never be used as
/// identifiers.
///
/// `Const` and `PackageId` are not in the glossary's keyword listing but
/// are required by §3.2 (`Const` node) and §6.1 (`packageid "hex"`
/// declaration); they are added here to close that gap. `Io` closes the
/// same gap for §3.2's `IOBind` node, which names no surface keyword.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Keyword {
    Array,
    Assert,
    Break,
    Const,
    Continue,
    Else,
    Error,
    Func,
    Io,
    If,
    Inv,
    Nptr,
    PackageId,
    Post,
    Pre,
    Pri,
    Ptr,
    Pub,
    Reader,
    Return,
    Slice,
    Status,
    Struct,
    Use,
    Var,
    Via,
    While,
    Writer,
    // Operator words
    And,
    Or,
    Not,
    As,
    // Base types
    U8,
    U16,
    U32,
    U64,
    I8,
    I16,
    I32,
    I64,
    Bool,
}

impl Keyword {
    /// The exact source spelling, used both by the lexer's keyword table
    /// and by the pretty-printer.
    pub const fn text(self) -> &'static str {
        match self {
            Keyword::Array => "array",
            Keyword::Assert => "assert",
            Keyword::Break => "break",
            Keyword::Const => "const",
            Keyword::Continue => "continue",
            Keyword::Else => "else",
            Keyword::Error => "error",
            Keyword::Func => "func",
            Keyword::Io => "io",
            Keyword::If => "if",
            Keyword::Inv => "inv",
            Keyword::Nptr => "nptr",
            Keyword::PackageId => "packageid",
            Keyword::Post => "post",
            Keyword::Pre => "pre",
            Keyword::Pri => "pri",
            Keyword::Ptr => "ptr",
            Keyword::Pub => "pub",
            Keyword::Reader => "reader",
            Keyword::Return => "return",
            Keyword::Slice => "slice",
            Keyword::Status => "status",
            Keyword::Struct => "struct",
            Keyword::Use => "use",
            Keyword::Var => "var",
            Keyword::Via => "via",
            Keyword::While => "while",
            Keyword::Writer => "writer",
            Keyword::And => "and",
            Keyword::Or => "or",
            Keyword::Not => "not",
            Keyword::As => "as",
            Keyword::U8 => "u8",
            Keyword::U16 => "u16",
            Keyword::U32 => "u32",
            Keyword::U64 => "u64",
            Keyword::I8 => "i8",
            Keyword::I16 => "i16",
            Keyword::I32 => "i32",
            Keyword::I64 => "i64",
            Keyword::Bool => "bool",
        }
    }

    /// All keywords, in the order their builtin ids are assigned.
    pub const ALL: &'static [Keyword] = &[
        Keyword::Array,
        Keyword::Assert,
        Keyword::Break,
        Keyword::Const,
        Keyword::Continue,
        Keyword::Else,
        Keyword::Error,
        Keyword::Func,
        Keyword::Io,
        Keyword::If,
        Keyword::Inv,
        Keyword::Nptr,
        Keyword::PackageId,
        Keyword::Post,
        Keyword::Pre,
        Keyword::Pri,
        Keyword::Ptr,
        Keyword::Pub,
        Keyword::Reader,
        Keyword::Return,
        Keyword::Slice,
        Keyword::Status,
        Keyword::Struct,
        Keyword::Use,
        Keyword::Var,
        Keyword::Via,
        Keyword::While,
        Keyword::Writer,
        Keyword::And,
        Keyword::Or,
        Keyword::Not,
        Keyword::As,
        Keyword::U8,
        Keyword::U16,
        Keyword::U32,
        Keyword::U64,
        Keyword::I8,
        Keyword::I16,
        Keyword::I32,
        Keyword::I64,
        Keyword::Bool,
    ];

    /// `true` for `u8 .. i64`.
    pub fn is_base_type(self) -> bool {
        matches!(
            self,
            Keyword::U8
                | Keyword::U16
                | Keyword::U32
                | Keyword::U64
                | Keyword::I8
                | Keyword::I16
                | Keyword::I32
                | Keyword::I64
        )
    }

    pub fn from_text(s: &str) -> Option<Keyword> {
        Keyword::ALL.iter().copied().find(|k| k.text() == s)
    }
}

/// Operators recognized by the lexer. Unary/binary disambiguation of `+`
/// and `-` happens in the parser (§4.3); the lexer always emits the plain
/// `Plus`/`Minus` variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Operator {
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Amp,
    Pipe,
    Caret,
    Shl,
    Shr,
    Eq,
    EqEq,
    NotEq,
    Lt,
    LtEq,
    Gt,
    GtEq,
    Range,   // `..`
    RangeEq, // `..=`
    Bang,    // impure-function suffix `!`
    Question, // coroutine-function suffix `?`
    PlusEq,
    MinusEq,
    StarEq,
    SlashEq,
    PercentEq,
    AmpEq,
    PipeEq,
    CaretEq,
    ShlEq,
    ShrEq,
}

impl Operator {
    pub const fn text(self) -> &'static str {
        match self {
            Operator::Plus => "+",
            Operator::Minus => "-",
            Operator::Star => "*",
            Operator::Slash => "/",
            Operator::Percent => "%",
            Operator::Amp => "&",
            Operator::Pipe => "|",
            Operator::Caret => "^",
            Operator::Shl => "<<",
            Operator::Shr => ">>",
            Operator::Eq => "=",
            Operator::EqEq => "==",
            Operator::NotEq => "!=",
            Operator::Lt => "<",
            Operator::LtEq => "<=",
            Operator::Gt => ">",
            Operator::GtEq => ">=",
            Operator::Range => "..",
            Operator::RangeEq => "..=",
            Operator::Bang => "!",
            Operator::Question => "?",
            Operator::PlusEq => "+=",
            Operator::MinusEq => "-=",
            Operator::StarEq => "*=",
            Operator::SlashEq => "/=",
            Operator::PercentEq => "%=",
            Operator::AmpEq => "&=",
            Operator::PipeEq => "|=",
            Operator::CaretEq => "^=",
            Operator::ShlEq => "<<=",
            Operator::ShrEq => ">>=",
        }
    }

    /// Static flags consulted by the parser (§4.1, §4.3).
    pub fn flags(self) -> TokenFlags {
        use Operator::*;
        match self {
            Plus | Minus => {
                TokenFlags::UNARY_OP | TokenFlags::BINARY_OP | TokenFlags::ASSOCIATIVE_OP
            }
            Star | Amp | Pipe | Caret => {
                TokenFlags::BINARY_OP | TokenFlags::ASSOCIATIVE_OP
            }
            Slash | Percent | Shl | Shr | EqEq | NotEq | Lt | LtEq | Gt | GtEq => {
                TokenFlags::BINARY_OP
            }
            Bang | Question => TokenFlags::TIGHT_LEFT,
            _ => TokenFlags::empty(),
        }
    }

    /// Compound-assignment operators map back to their base binary operator
    /// for fact-set purposes (`x op= e` is `x = x op e`, §4.5.2).
    pub fn compound_base(self) -> Option<Operator> {
        use Operator::*;
        Some(match self {
            PlusEq => Plus,
            MinusEq => Minus,
            StarEq => Star,
            SlashEq => Slash,
            PercentEq => Percent,
            AmpEq => Amp,
            PipeEq => Pipe,
            CaretEq => Caret,
            ShlEq => Shl,
            ShrEq => Shr,
            _ => return None,
        })
    }
}

/// Non-operator punctuation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Punct {
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Comma,
    Colon,
    Semicolon,
    Dot,
}

impl Punct {
    pub const fn text(self) -> &'static str {
        match self {
            Punct::LParen => "(",
            Punct::RParen => ")",
            Punct::LBracket => "[",
            Punct::RBracket => "]",
            Punct::LBrace => "{",
            Punct::RBrace => "}",
            Punct::Comma => ",",
            Punct::Colon => ":",
            Punct::Semicolon => ";",
            Punct::Dot => ".",
        }
    }

    pub fn flags(self) -> TokenFlags {
        match self {
            Punct::LParen | Punct::LBracket | Punct::LBrace => {
                TokenFlags::OPEN | TokenFlags::TIGHT_RIGHT
            }
            Punct::RParen | Punct::RBracket | Punct::RBrace => {
                TokenFlags::CLOSE | TokenFlags::TIGHT_LEFT
            }
            Punct::Comma | Punct::Semicolon => TokenFlags::TIGHT_LEFT,
            Punct::Colon | Punct::Dot => TokenFlags::empty(),
        }
    }
}

/// The kind of a token, carrying any data the lexer already resolved
/// (the literal's arbitrary-precision value, the decoded string content,
/// or the closed keyword/operator/punctuation variant).
#[derive(Debug, Clone)]
pub enum TokenKind {
    /// A `[A-Za-z_][A-Za-z0-9_]*` identifier that is not a keyword.
    Identifier,
    Keyword(Keyword),
    /// Arbitrary-precision integer literal (decimal, `0x`, or `0b`).
    IntLiteral(BigInt),
    /// Decoded string literal content (escapes already processed).
    StringLiteral(Symbol),
    Operator(Operator),
    Punct(Punct),
    /// A `///` doc comment, retained as trivia (§4.0 ambient addition).
    /// Never consumed by grammar rules; attached to the following
    /// declaration's span by the parser.
    DocComment(Symbol),
    Eof,
}

/// A single lexical token: its kind, the interned raw source lexeme, and
/// its source span.
#[derive(Debug, Clone)]
pub struct Token {
    pub kind: TokenKind,
    /// Interned raw lexeme text. For string literals this is the raw
    /// (un-decoded) source text including quotes; the decoded value lives
    /// in `TokenKind::StringLiteral`.
    pub lexeme: Symbol,
    pub span: Span,
}

impl Token {
    pub fn new(kind: TokenKind, lexeme: Symbol, span: Span) -> Self {
        Token { kind, lexeme, span }
    }

    /// Static parser-relevant flags for this token, or empty for tokens
    /// with no operator/bracket role (identifiers, literals, keywords that
    /// aren't `and`/`or`/`not`).
    pub fn flags(&self) -> TokenFlags {
        match &self.kind {
            TokenKind::Operator(op) => op.flags(),
            TokenKind::Punct(p) => p.flags(),
            TokenKind::Keyword(Keyword::And) | TokenKind::Keyword(Keyword::Or) => {
                TokenFlags::BINARY_OP | TokenFlags::ASSOCIATIVE_OP
            }
            TokenKind::Keyword(Keyword::Not) => TokenFlags::UNARY_OP,
            _ => TokenFlags::empty(),
        }
    }

    /// `true` if this token can terminate a statement, triggering the
    /// automatic-semicolon-insertion rule of §4.2 (identifier, literal, or
    /// close bracket).
    pub fn can_end_statement(&self) -> bool {
        match &self.kind {
            TokenKind::Identifier | TokenKind::IntLiteral(_) | TokenKind::StringLiteral(_) => {
                true
            }
            TokenKind::Keyword(k) => k.is_base_type() || matches!(k, Keyword::Bool),
            TokenKind::Punct(p) => p.flags().contains(TokenFlags::CLOSE),
            _ => false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn keyword_text_round_trips_from_text() {
        for &kw in Keyword::ALL {
            assert_eq!(Keyword::from_text(kw.text()), Some(kw));
        }
    }

    #[test]
    fn plus_is_unary_binary_and_associative() {
        let flags = Operator::Plus.flags();
        assert!(flags.contains(TokenFlags::UNARY_OP));
        assert!(flags.contains(TokenFlags::BINARY_OP));
        assert!(flags.contains(TokenFlags::ASSOCIATIVE_OP));
    }

    #[test]
    fn slash_is_binary_only() {
        let flags = Operator::Slash.flags();
        assert!(flags.contains(TokenFlags::BINARY_OP));
        assert!(!flags.contains(TokenFlags::ASSOCIATIVE_OP));
        assert!(!flags.contains(TokenFlags::UNARY_OP));
    }

    #[test]
    fn compound_assign_maps_to_base_operator() {
        assert_eq!(Operator::PlusEq.compound_base(), Some(Operator::Plus));
        assert_eq!(Operator::Plus.compound_base(), None);
    }

    #[test]
    fn open_close_brackets_are_tight() {
        assert!(Punct::LParen.flags().contains(TokenFlags::TIGHT_RIGHT));
        assert!(Punct::RParen.flags().contains(TokenFlags::TIGHT_LEFT));
    }
}
