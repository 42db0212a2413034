//! # toposafe-lexer
//!
//! Byte-stream lexer and token map for the toposafe DSL.
//!
//! [`lexer::lex`] turns UTF-8 source text into a flat, EOF-terminated
//! token stream plus the [`tokenmap::TokenMap`] that interned it. Keywords,
//! base types, and a handful of special identifiers (`args`, `this`,
//! `suspension`) are pre-populated in the token map so they always occupy
//! the same low, stable symbol range (`TokenMap::is_builtin`), independent
//! of what a given file interns first.

pub mod lexer;
pub mod token;
pub mod tokenmap;

pub use lexer::{lex, LexError, Lexer};
pub use token::{Keyword, Operator, Punct, Token, TokenFlags, TokenKind};
pub use tokenmap::TokenMap;
