//! # toposafe-typeck
//!
//! Name resolution and `MType`/`ConstValue` inference for the toposafe
//! DSL (§4.4.1). Consumes a [`toposafe_ast::File`] already produced by
//! [`toposafe_parser::parse`] and stamps every expression's `mtype`,
//! `const_value`, `global_ident`, `impure`, and `suspendible` slots in
//! place, returning the resolved [`env::GlobalEnv`] for the proof checker
//! to reuse (so it does not have to rebuild the same symbol tables).
//!
//! This crate performs no arithmetic/assertion proof obligation discharge
//! — see `toposafe-proof` for that pass, which runs strictly after this
//! one on the same tree.

pub mod decl;
pub mod env;
pub mod error;
pub mod expr;
pub mod types;

pub use env::GlobalEnv;
pub use error::TypeError;

use toposafe_ast::{AstArena, File};
use toposafe_lexer::TokenMap;

/// Type-checks a complete file, returning its resolved global environment
/// on success.
pub fn check<'a>(file: &File<'a>, arena: &'a AstArena, map: &TokenMap) -> error::Result<GlobalEnv<'a>> {
    decl::check_file(file, arena, map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use toposafe_ast::AstArena;
    use toposafe_lexer::lex;

    fn check_source(src: &str) -> error::Result<GlobalEnv<'static>> {
        let (tokens, map) = lex(src).expect("lex ok");
        let arena: &'static AstArena = Box::leak(Box::new(AstArena::new()));
        let file = toposafe_parser::parse(&tokens, &map, arena, "test.dsl").expect("parses");
        let file: &'static toposafe_ast::File<'static> = Box::leak(Box::new(file));
        check(file, arena, &map)
    }

    #[test]
    fn accepts_a_simple_pure_function() {
        let result = check_source(
            r#"
            pub func add(a u32, b u32) (out u32) {
                out = a + b
                return out
            }
            "#,
        );
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn rejects_unknown_identifier() {
        let result = check_source(
            r#"
            pub func f() (out u32) {
                out = missing
                return out
            }
            "#,
        );
        assert!(matches!(result, Err(TypeError::UnknownIdentifier { .. })));
    }

    #[test]
    fn rejects_type_mismatch_in_assignment() {
        let result = check_source(
            r#"
            pub func f() (out bool) {
                var x u32 = 1
                out = x
                return out
            }
            "#,
        );
        assert!(matches!(result, Err(TypeError::TypeMismatch { .. })));
    }

    #[test]
    fn accepts_struct_field_selection() {
        let result = check_source(
            r#"
            pub struct point {
                x u32
                y u32
            }
            pub func f(p point) (out u32) {
                out = p.x
                return out
            }
            "#,
        );
        assert!(result.is_ok(), "{result:?}");
    }

    #[test]
    fn rejects_bitwise_on_signed_operands() {
        let result = check_source(
            r#"
            pub func f(a i32, b i32) (out i32) {
                out = a & b
                return out
            }
            "#,
        );
        assert!(matches!(result, Err(TypeError::BitwiseRequiresUnsigned { .. })));
    }

    #[test]
    fn rejects_missing_call_argument() {
        let result = check_source(
            r#"
            func helper(a u32) (out u32) {
                return a
            }
            pub func f() (out u32) {
                out = helper()
                return out
            }
            "#,
        );
        assert!(matches!(result, Err(TypeError::MissingArgument { .. })));
    }

    #[test]
    fn rejects_coroutine_call_without_marker() {
        let result = check_source(
            r#"
            func step?() (out u32) {
                return 0
            }
            pub func f() (out u32) {
                out = step()
                return out
            }
            "#,
        );
        assert!(matches!(result, Err(TypeError::CoroutineSyntaxMismatch { .. })));
    }
}
