//! Byte-stream lexer (§4.2).
//!
//! Produces a flat [`Vec<Token>`] terminated by [`TokenKind::Eof`]. Two
//! pieces of non-local state ride along with the simple scan: automatic
//! semicolon insertion at end-of-line, and bracket depth (insertion is
//! suppressed inside `(...)`/`[...]` so call arguments and index
//! expressions can wrap lines freely, matching `//` and `/* */` comments
//! being plain trivia rather than tokens).

use num_bigint::BigInt;
use toposafe_base::Span;

use crate::token::{Keyword, Operator, Punct, Token, TokenKind};
use crate::tokenmap::TokenMap;

/// Failure modes from §4.2: everything the lexer itself can reject before
/// a single token reaches the parser.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LexError {
    InvalidByte { byte: u8, span: Span },
    UnterminatedString { span: Span },
    UnterminatedComment { span: Span },
    /// `0x` or `0b` with no digits following, per §4.2.
    EmptyDigitSequence { span: Span },
    /// `\xHH` or `\u{...}` escape that does not name a valid Unicode
    /// scalar value.
    InvalidUnicodeEscape { span: Span },
    InvalidEscape { span: Span },
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LexError::InvalidByte { byte, span } => {
                write!(f, "invalid byte 0x{byte:02x} at {span:?}")
            }
            LexError::UnterminatedString { span } => {
                write!(f, "unterminated string literal starting at {span:?}")
            }
            LexError::UnterminatedComment { span } => {
                write!(f, "unterminated block comment starting at {span:?}")
            }
            LexError::EmptyDigitSequence { span } => {
                write!(f, "numeric literal with no digits at {span:?}")
            }
            LexError::InvalidUnicodeEscape { span } => {
                write!(f, "escape does not name a valid Unicode scalar value at {span:?}")
            }
            LexError::InvalidEscape { span } => {
                write!(f, "unrecognized escape sequence at {span:?}")
            }
        }
    }
}

impl std::error::Error for LexError {}

pub type Result<T> = std::result::Result<T, LexError>;

pub struct Lexer<'a> {
    src: &'a [u8],
    pos: usize,
    tokens: Vec<Token>,
    /// Depth of open `(` / `[` nesting; semicolon insertion is suppressed
    /// while this is nonzero.
    paren_depth: i32,
}

impl<'a> Lexer<'a> {
    pub fn new(src: &'a str) -> Self {
        Lexer {
            src: src.as_bytes(),
            pos: 0,
            tokens: Vec::new(),
            paren_depth: 0,
        }
    }

    /// Lexes the whole input, interning identifiers, keywords, and string
    /// contents into `map`.
    pub fn lex(mut self, map: &mut TokenMap) -> Result<Vec<Token>> {
        loop {
            let inserted_semi = self.skip_trivia_and_maybe_insert_semicolon(map);
            if inserted_semi {
                continue;
            }
            if self.pos >= self.src.len() {
                break;
            }
            self.lex_one(map)?;
        }
        let eof_span = Span::new(self.src.len(), self.src.len());
        self.tokens
            .push(Token::new(TokenKind::Eof, toposafe_base::Symbol::EMPTY, eof_span));
        Ok(self.tokens)
    }

    fn peek(&self) -> Option<u8> {
        self.src.get(self.pos).copied()
    }

    fn peek_at(&self, offset: usize) -> Option<u8> {
        self.src.get(self.pos + offset).copied()
    }

    fn bump(&mut self) -> Option<u8> {
        let b = self.peek()?;
        self.pos += 1;
        Some(b)
    }

    /// Consumes whitespace and comments. If a newline is crossed after a
    /// token that can end a statement (and we are not inside `()`/`[]`),
    /// pushes a synthetic `;` token and returns `true` so the caller
    /// re-enters the trivia-skipping loop (a line can be followed by more
    /// blank lines/comments before the next real token).
    fn skip_trivia_and_maybe_insert_semicolon(&mut self, map: &mut TokenMap) -> bool {
        let mut saw_newline = false;
        loop {
            match self.peek() {
                Some(b' ') | Some(b'\t') | Some(b'\r') => {
                    self.pos += 1;
                }
                Some(b'\n') => {
                    saw_newline = true;
                    self.pos += 1;
                }
                Some(b'/') if self.peek_at(1) == Some(b'/') => {
                    if self.peek_at(2) == Some(b'/') {
                        // `///` doc comment: retained as trivia token.
                        let start = self.pos;
                        self.pos += 3;
                        while let Some(b) = self.peek() {
                            if b == b'\n' {
                                break;
                            }
                            self.pos += 1;
                        }
                        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
                        let sym = map.intern(text);
                        self.tokens.push(Token::new(
                            TokenKind::DocComment(sym),
                            sym,
                            Span::new(start, self.pos),
                        ));
                        continue;
                    }
                    while let Some(b) = self.peek() {
                        if b == b'\n' {
                            break;
                        }
                        self.pos += 1;
                    }
                }
                Some(b'/') if self.peek_at(1) == Some(b'*') => {
                    self.pos += 2;
                    loop {
                        match self.peek() {
                            None => break,
                            Some(b'*') if self.peek_at(1) == Some(b'/') => {
                                self.pos += 2;
                                break;
                            }
                            _ => self.pos += 1,
                        }
                    }
                }
                _ => break,
            }

            if saw_newline && self.paren_depth == 0 {
                if let Some(last) = self.tokens.last() {
                    if last.can_end_statement() {
                        let pos = self.pos;
                        self.tokens.push(Token::new(
                            TokenKind::Punct(Punct::Semicolon),
                            toposafe_base::Symbol::EMPTY,
                            Span::new(pos, pos),
                        ));
                        return true;
                    }
                }
                saw_newline = false;
            }
        }
        false
    }

    fn lex_one(&mut self, map: &mut TokenMap) -> Result<()> {
        let start = self.pos;
        let b = self.peek().expect("lex_one called at EOF");

        if b.is_ascii_digit() {
            return self.lex_number(map, start);
        }
        if b == b'"' {
            return self.lex_string(map, start);
        }
        if b == b'_' || b.is_ascii_alphabetic() {
            return self.lex_identifier_or_keyword(map, start);
        }

        self.lex_operator_or_punct(start)
    }

    fn lex_identifier_or_keyword(&mut self, map: &mut TokenMap, start: usize) -> Result<()> {
        while let Some(b) = self.peek() {
            if b == b'_' || b.is_ascii_alphanumeric() {
                self.pos += 1;
            } else {
                break;
            }
        }
        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        let sym = map.intern(text);
        let span = Span::new(start, self.pos);
        let kind = match map.keyword_for(sym) {
            Some(kw) => TokenKind::Keyword(kw),
            None => TokenKind::Identifier,
        };
        self.tokens.push(Token::new(kind, sym, span));
        Ok(())
    }

    fn lex_number(&mut self, map: &mut TokenMap, start: usize) -> Result<()> {
        let radix_prefix = if self.peek() == Some(b'0') {
            match self.peek_at(1) {
                Some(b'x') | Some(b'X') => Some(16),
                Some(b'b') | Some(b'B') => Some(2),
                _ => None,
            }
        } else {
            None
        };

        let digits_start;
        let radix = if let Some(r) = radix_prefix {
            self.pos += 2;
            digits_start = self.pos;
            r
        } else {
            digits_start = self.pos;
            10
        };

        let mut digit_count = 0usize;
        while let Some(b) = self.peek() {
            if b == b'_' {
                self.pos += 1;
                continue;
            }
            let is_digit = match radix {
                16 => b.is_ascii_hexdigit(),
                2 => b == b'0' || b == b'1',
                _ => b.is_ascii_digit(),
            };
            if is_digit {
                digit_count += 1;
                self.pos += 1;
            } else {
                break;
            }
        }

        let span = Span::new(start, self.pos);
        if digit_count == 0 {
            return Err(LexError::EmptyDigitSequence { span });
        }

        let digits: String = std::str::from_utf8(&self.src[digits_start..self.pos])
            .unwrap()
            .chars()
            .filter(|&c| c != '_')
            .collect();
        let value = BigInt::parse_bytes(digits.as_bytes(), radix as u32)
            .expect("validated digit sequence must parse");

        let text = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        let lexeme = map.intern(text);
        self.tokens
            .push(Token::new(TokenKind::IntLiteral(value), lexeme, span));
        Ok(())
    }

    fn lex_string(&mut self, map: &mut TokenMap, start: usize) -> Result<()> {
        self.pos += 1; // opening quote
        let mut decoded = String::new();
        loop {
            match self.bump() {
                None | Some(b'\n') => {
                    return Err(LexError::UnterminatedString {
                        span: Span::new(start, self.pos),
                    });
                }
                Some(b'"') => break,
                Some(b'\\') => {
                    let esc_start = self.pos - 1;
                    match self.bump() {
                        Some(b'n') => decoded.push('\n'),
                        Some(b't') => decoded.push('\t'),
                        Some(b'r') => decoded.push('\r'),
                        Some(b'0') => decoded.push('\0'),
                        Some(b'\\') => decoded.push('\\'),
                        Some(b'"') => decoded.push('"'),
                        Some(b'x') => {
                            let hi = self.bump();
                            let lo = self.bump();
                            let span = Span::new(esc_start, self.pos);
                            let (Some(hi), Some(lo)) = (hi, lo) else {
                                return Err(LexError::InvalidEscape { span });
                            };
                            let byte = (hex_digit(hi).ok_or(LexError::InvalidEscape { span })?
                                << 4)
                                | hex_digit(lo).ok_or(LexError::InvalidEscape { span })?;
                            match char::from_u32(byte as u32) {
                                Some(c) => decoded.push(c),
                                None => return Err(LexError::InvalidUnicodeEscape { span }),
                            }
                        }
                        Some(b'u') => {
                            let span_start = esc_start;
                            if self.bump() != Some(b'{') {
                                return Err(LexError::InvalidEscape {
                                    span: Span::new(span_start, self.pos),
                                });
                            }
                            let mut code: u32 = 0;
                            let mut saw_digit = false;
                            loop {
                                match self.peek() {
                                    Some(b'}') => {
                                        self.pos += 1;
                                        break;
                                    }
                                    Some(b) => match hex_digit(b) {
                                        Some(d) => {
                                            code = code * 16 + d as u32;
                                            saw_digit = true;
                                            self.pos += 1;
                                        }
                                        None => {
                                            return Err(LexError::InvalidEscape {
                                                span: Span::new(span_start, self.pos),
                                            })
                                        }
                                    },
                                    None => {
                                        return Err(LexError::UnterminatedString {
                                            span: Span::new(start, self.pos),
                                        })
                                    }
                                }
                            }
                            let span = Span::new(span_start, self.pos);
                            if !saw_digit {
                                return Err(LexError::InvalidEscape { span });
                            }
                            match char::from_u32(code) {
                                Some(c) => decoded.push(c),
                                None => return Err(LexError::InvalidUnicodeEscape { span }),
                            }
                        }
                        _ => {
                            return Err(LexError::InvalidEscape {
                                span: Span::new(esc_start, self.pos),
                            })
                        }
                    }
                }
                Some(b) if b.is_ascii() => decoded.push(b as char),
                Some(_) => {
                    // Re-decode this and any following continuation bytes as
                    // a UTF-8 scalar; the source is guaranteed valid UTF-8
                    // by the driver before lexing begins.
                    let rest = std::str::from_utf8(&self.src[self.pos - 1..]).unwrap_or("");
                    if let Some(c) = rest.chars().next() {
                        decoded.push(c);
                        self.pos += c.len_utf8() - 1;
                    }
                }
            }
        }
        let span = Span::new(start, self.pos);
        let raw = std::str::from_utf8(&self.src[start..self.pos]).unwrap();
        let lexeme = map.intern(raw);
        let value_sym = map.intern(&decoded);
        self.tokens
            .push(Token::new(TokenKind::StringLiteral(value_sym), lexeme, span));
        Ok(())
    }

    fn lex_operator_or_punct(&mut self, start: usize) -> Result<()> {
        // Longest-match-first: 3-byte, then 2-byte, then 1-byte operators.
        const THREE: &[(&[u8], Operator)] = &[(b"..=", Operator::RangeEq)];
        const TWO: &[(&[u8], Operator)] = &[
            (b"==", Operator::EqEq),
            (b"!=", Operator::NotEq),
            (b"<=", Operator::LtEq),
            (b">=", Operator::GtEq),
            (b"<<", Operator::Shl),
            (b">>", Operator::Shr),
            (b"..", Operator::Range),
            (b"+=", Operator::PlusEq),
            (b"-=", Operator::MinusEq),
            (b"*=", Operator::StarEq),
            (b"/=", Operator::SlashEq),
            (b"%=", Operator::PercentEq),
            (b"&=", Operator::AmpEq),
            (b"|=", Operator::PipeEq),
            (b"^=", Operator::CaretEq),
        ];

        let remaining = &self.src[self.pos..];
        for &(pat, op) in THREE {
            if remaining.starts_with(pat) {
                self.pos += pat.len();
                return self.push_operator(start, op);
            }
        }
        // `<<=` / `>>=` need 2-then-1 checked after the plain 2-byte forms
        // fail, since `<<`/`>>` are themselves valid 2-byte operators.
        if remaining.starts_with(b"<<=") {
            self.pos += 3;
            return self.push_operator(start, Operator::ShlEq);
        }
        if remaining.starts_with(b">>=") {
            self.pos += 3;
            return self.push_operator(start, Operator::ShrEq);
        }
        for &(pat, op) in TWO {
            if remaining.starts_with(pat) {
                self.pos += pat.len();
                return self.push_operator(start, op);
            }
        }

        let b = self.bump().unwrap();
        let op = match b {
            b'+' => Some(Operator::Plus),
            b'-' => Some(Operator::Minus),
            b'*' => Some(Operator::Star),
            b'/' => Some(Operator::Slash),
            b'%' => Some(Operator::Percent),
            b'&' => Some(Operator::Amp),
            b'|' => Some(Operator::Pipe),
            b'^' => Some(Operator::Caret),
            b'=' => Some(Operator::Eq),
            b'<' => Some(Operator::Lt),
            b'>' => Some(Operator::Gt),
            b'!' => Some(Operator::Bang),
            b'?' => Some(Operator::Question),
            _ => None,
        };
        if let Some(op) = op {
            return self.push_operator(start, op);
        }

        let punct = match b {
            b'(' => Some(Punct::LParen),
            b')' => Some(Punct::RParen),
            b'[' => Some(Punct::LBracket),
            b']' => Some(Punct::RBracket),
            b'{' => Some(Punct::LBrace),
            b'}' => Some(Punct::RBrace),
            b',' => Some(Punct::Comma),
            b':' => Some(Punct::Colon),
            b';' => Some(Punct::Semicolon),
            b'.' => Some(Punct::Dot),
            _ => None,
        };
        if let Some(p) = punct {
            match p {
                Punct::LParen | Punct::LBracket => self.paren_depth += 1,
                Punct::RParen | Punct::RBracket => self.paren_depth -= 1,
                _ => {}
            }
            let span = Span::new(start, self.pos);
            self.tokens.push(Token::new(
                TokenKind::Punct(p),
                toposafe_base::Symbol::EMPTY,
                span,
            ));
            return Ok(());
        }

        Err(LexError::InvalidByte {
            byte: b,
            span: Span::new(start, self.pos),
        })
    }

    fn push_operator(&mut self, start: usize, op: Operator) -> Result<()> {
        let span = Span::new(start, self.pos);
        self.tokens.push(Token::new(
            TokenKind::Operator(op),
            toposafe_base::Symbol::EMPTY,
            span,
        ));
        Ok(())
    }
}

fn hex_digit(b: u8) -> Option<u8> {
    match b {
        b'0'..=b'9' => Some(b - b'0'),
        b'a'..=b'f' => Some(b - b'a' + 10),
        b'A'..=b'F' => Some(b - b'A' + 10),
        _ => None,
    }
}

/// Convenience entry point: lexes `src` against a fresh [`TokenMap`].
pub fn lex(src: &str) -> Result<(Vec<Token>, TokenMap)> {
    let mut map = TokenMap::new();
    let tokens = Lexer::new(src).lex(&mut map)?;
    Ok((tokens, map))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(src: &str) -> Vec<TokenKind> {
        let (tokens, _map) = lex(src).expect("lex should succeed");
        tokens.into_iter().map(|t| t.kind).collect()
    }

    #[test]
    fn lexes_simple_assignment() {
        let ks = kinds("var x u8 = 5");
        assert!(matches!(ks[0], TokenKind::Keyword(Keyword::Var)));
        assert!(matches!(ks[1], TokenKind::Identifier));
        assert!(matches!(ks[2], TokenKind::Keyword(Keyword::U8)));
        assert!(matches!(ks[3], TokenKind::Operator(Operator::Eq)));
        assert!(matches!(ks[4], TokenKind::IntLiteral(_)));
    }

    #[test]
    fn inserts_semicolon_at_end_of_line() {
        let ks = kinds("x = 1\ny = 2");
        let semis = ks
            .iter()
            .filter(|k| matches!(k, TokenKind::Punct(Punct::Semicolon)))
            .count();
        assert_eq!(semis, 1);
    }

    #[test]
    fn no_semicolon_inserted_inside_parens() {
        let ks = kinds("foo(\n  1,\n  2\n)");
        let semis = ks
            .iter()
            .filter(|k| matches!(k, TokenKind::Punct(Punct::Semicolon)))
            .count();
        assert_eq!(semis, 0);
    }

    #[test]
    fn hex_and_binary_literals_parse_arbitrary_precision() {
        let ks = kinds("0xFF_FF 0b1010 123456789012345678901234567890");
        match &ks[0] {
            TokenKind::IntLiteral(v) => assert_eq!(*v, BigInt::from(0xFFFFu32)),
            other => panic!("expected int literal, got {other:?}"),
        }
        match &ks[1] {
            TokenKind::IntLiteral(v) => assert_eq!(*v, BigInt::from(0b1010u32)),
            other => panic!("expected int literal, got {other:?}"),
        }
        match &ks[2] {
            TokenKind::IntLiteral(v) => {
                assert_eq!(v.to_string(), "123456789012345678901234567890")
            }
            other => panic!("expected int literal, got {other:?}"),
        }
    }

    #[test]
    fn empty_hex_digit_sequence_is_an_error() {
        let err = lex("0x").unwrap_err();
        assert!(matches!(err, LexError::EmptyDigitSequence { .. }));
    }

    #[test]
    fn string_literal_decodes_escapes() {
        let (tokens, map) = lex(r#""a\nb\t\"c""#).unwrap();
        match &tokens[0].kind {
            TokenKind::StringLiteral(sym) => assert_eq!(map.resolve(*sym), "a\nb\t\"c"),
            other => panic!("expected string literal, got {other:?}"),
        }
    }

    #[test]
    fn unterminated_string_is_an_error() {
        let err = lex("\"abc").unwrap_err();
        assert!(matches!(err, LexError::UnterminatedString { .. }));
    }

    #[test]
    fn line_comment_and_doc_comment_are_distinguished() {
        let (tokens, map) = lex("// plain\nfoo\n/// documented\nvar").unwrap();
        assert!(!tokens
            .iter()
            .any(|t| matches!(&t.kind, TokenKind::DocComment(s) if map.resolve(*s).starts_with("// plain"))));
        assert!(tokens
            .iter()
            .any(|t| matches!(&t.kind, TokenKind::DocComment(s) if map.resolve(*s).starts_with("/// documented"))));
    }

    #[test]
    fn longest_match_prefers_range_eq_over_range() {
        let ks = kinds("0..=5");
        assert!(matches!(ks[1], TokenKind::Operator(Operator::RangeEq)));
    }

    #[test]
    fn shift_assign_is_distinguished_from_shift() {
        let ks = kinds("x <<= 1");
        assert!(matches!(ks[1], TokenKind::Operator(Operator::ShlEq)));
    }
}
