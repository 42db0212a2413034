//! # toposafe-parser
//!
//! Recursive-descent parser: turns a [`toposafe_lexer`] token stream into
//! a [`toposafe_ast::File`]. The grammar enforces flat operator
//! precedence, associative-chain flattening, named call arguments, and
//! the nesting-depth limits of §4.3; it performs no name resolution and
//! no type checking.
//!
//! [`parse`] runs the grammar pass and both post-parse passes (jump
//! resolution, struct dependency ordering) in one call, which is what
//! every caller outside this crate's own tests wants.

pub mod error;
pub mod parser;
pub mod resolve;

pub use error::ParseError;
pub use parser::DepthLimits;

use toposafe_ast::{AstArena, File};
use toposafe_lexer::{Token, TokenMap};

/// Parses a complete token stream into a fully post-processed `File`:
/// grammar, then jump resolution, then struct topological ordering.
pub fn parse<'a>(
    tokens: &[Token],
    map: &TokenMap,
    arena: &'a AstArena,
    file_name: &str,
) -> error::Result<File<'a>> {
    parse_with_limits(tokens, map, arena, file_name, DepthLimits::default())
}

/// Same as [`parse`], with nesting-depth ceilings overriding the §4.3
/// defaults (`toposafe-driver`'s `CompileOptions`, §4.0.1).
pub fn parse_with_limits<'a>(
    tokens: &[Token],
    map: &TokenMap,
    arena: &'a AstArena,
    file_name: &str,
    limits: DepthLimits,
) -> error::Result<File<'a>> {
    let mut file = parser::parse_file_with_limits(tokens, map, arena, file_name, limits)?;
    resolve::resolve_jumps(&file, map)?;
    resolve::topo_sort_structs(&mut file, map)?;
    Ok(file)
}
