//! # toposafe-proof
//!
//! Obligation discharge over a type-checked [`toposafe_ast::File`] (§4.5).
//! Consumes the `MType`/`ConstValue` slots `toposafe-typeck` already
//! stamped and the [`toposafe_typeck::GlobalEnv`] it resolved, walks every
//! function body once maintaining a fact set per §4.5.2, and discharges
//! every arithmetic/cast/index/assertion obligation per §4.5.1 against it.
//!
//! On success, every [`toposafe_ast::Func`] has `proved` set and
//! `resumable_vars` filled in (§4.5.5, §6.2): code generation downstream
//! never re-derives either.

pub mod canon;
pub mod checker;
pub mod error;
pub mod eval;
pub mod facts;
pub mod rules;

pub use error::{ProofError, Result};
pub use facts::FactSet;

use toposafe_ast::{AstArena, File};
use toposafe_lexer::TokenMap;
use toposafe_typeck::GlobalEnv;

/// Discharges every obligation in `file`, given the `GlobalEnv` `toposafe-typeck`
/// already resolved for it.
pub fn check<'a>(file: &File<'a>, genv: &GlobalEnv<'a>, arena: &'a AstArena, map: &TokenMap) -> Result<()> {
    checker::check_file(file, genv, arena, map)
}

#[cfg(test)]
mod tests {
    use super::*;
    use toposafe_ast::AstArena;
    use toposafe_lexer::lex;

    fn check_source(src: &str) -> Result<()> {
        let (tokens, map) = lex(src).expect("lex ok");
        let arena: &'static AstArena = Box::leak(Box::new(AstArena::new()));
        let file = toposafe_parser::parse(&tokens, &map, arena, "test.dsl").expect("parses");
        let file: &'static File<'static> = Box::leak(Box::new(file));
        let genv = toposafe_typeck::check(file, arena, &map).expect("type-checks");
        let genv: &'static GlobalEnv<'static> = Box::leak(Box::new(genv));
        check(file, genv, arena, &map)
    }

    /// §8.4 Scenario A: a trivial fact carries through a bounded increment.
    #[test]
    fn scenario_a_trivial_proof_works() {
        let result = check_source(
            r#"
            pri func t.f() {
                var x u8 = 3
                assert x < 10
                x += 1
            }
            "#,
        );
        assert!(result.is_ok(), "{result:?}");
    }

    /// §8.4 Scenario B: no fact bounds `x` below 255, so `x += 1` overflows.
    #[test]
    fn scenario_b_overflow_rejected() {
        let result = check_source(
            r#"
            pri func t.f() {
                var x u8 = 255
                x += 1
            }
            "#,
        );
        assert!(matches!(result, Err(ProofError::BoundsObligationUnproved { .. })), "{result:?}");
    }

    /// §8.4 Scenario C: `x / y` with no `y != 0` fact in scope.
    #[test]
    fn scenario_c_divide_by_zero_rejected() {
        let result = check_source(
            r#"
            pri func t.f(y u32) {
                var x u32 = 10
                x = x / y
            }
            "#,
        );
        assert!(matches!(result, Err(ProofError::BoundsObligationUnproved { .. })), "{result:?}");
    }

    /// §8.4 Scenario C, accepted half: the same division proved safe by an
    /// explicit `assert y != 0` beforehand (§8.3 "with `assert y != 0`:
    /// accepted").
    #[test]
    fn scenario_c_divide_accepted_with_nonzero_assertion() {
        let result = check_source(
            r#"
            pri func t.f(y u32) {
                var x u32 = 10
                assert y != 0
                x = x / y
            }
            "#,
        );
        assert!(result.is_ok(), "{result:?}");
    }

    /// §8.4 Scenario D: the loop invariant carries `i <= 10` through every
    /// iteration, and `post i == 10` becomes a fact on exit.
    #[test]
    fn scenario_d_loop_with_invariant() {
        let result = check_source(
            r#"
            pri func t.f() {
                var i u32 = 0
                while i < 10, inv i <= 10, post i == 10 {
                    i += 1
                }
                assert i == 10
            }
            "#,
        );
        assert!(result.is_ok(), "{result:?}");
    }

    /// §8.4 Scenario E: `a < b` discharged from `a < c`/`c <= b` via the
    /// pinned transitivity rule rather than structural containment.
    #[test]
    fn scenario_e_via_transitivity() {
        let result = check_source(
            r#"
            pri func t.f(a u32, b u32, c u32) {
                assert a < c
                assert c <= b
                assert a < b via "a < b: a < c; c <= b"(c: c)
            }
            "#,
        );
        assert!(result.is_ok(), "{result:?}");
    }

    /// An unknown `via` rule name is rejected rather than silently ignored
    /// (§4.5.4 "reject an unknown rule name").
    #[test]
    fn via_rule_with_unknown_name_is_rejected() {
        let result = check_source(
            r#"
            pri func t.f(a u32, b u32, c u32) {
                assert a < c
                assert c <= b
                assert a < b via "not a real rule"(c: c)
            }
            "#,
        );
        assert!(matches!(result, Err(ProofError::UnknownRule { .. })), "{result:?}");
    }

    /// §8.4 Scenario F: a coroutine call wipes the fact set, so a fact
    /// established before suspension does not survive to after it.
    #[test]
    fn scenario_f_coroutine_resumption_strips_facts() {
        let result = check_source(
            r#"
            func read_u8?() (out u8) {
                return 0
            }
            pri func t.f?() {
                var x u32 = 5
                read_u8?()
                assert x == 5
            }
            "#,
        );
        assert!(matches!(result, Err(ProofError::AssertionUnproved { .. })), "{result:?}");
    }

    /// A suspension call in a function not itself declared `?` is rejected
    /// independently of any fact-set reasoning (§4.5.5, §7).
    #[test]
    fn suspension_outside_coroutine_is_rejected() {
        let result = check_source(
            r#"
            func read_u8?() (out u8) {
                return 0
            }
            pri func t.f() {
                read_u8?()
            }
            "#,
        );
        assert!(matches!(result, Err(ProofError::SuspendOutsideCoroutine { .. })), "{result:?}");
    }

    /// §8.3 "Dead-code branch": an unreachable `assert false` inside
    /// `if false { ... }` is accepted.
    #[test]
    fn dead_code_branch_is_accepted() {
        let result = check_source(
            r#"
            pri func t.f() {
                if false {
                    assert false
                }
            }
            "#,
        );
        assert!(result.is_ok(), "{result:?}");
    }

    /// §8.3 "Cast from `u32` to `u8` without range proof: rejected; after
    /// `assert x < 256`: accepted."
    #[test]
    fn cast_without_range_proof_is_rejected() {
        let result = check_source(
            r#"
            pri func t.f(x u32) {
                var y u8 = x as u8
            }
            "#,
        );
        assert!(matches!(result, Err(ProofError::BoundsObligationUnproved { .. })), "{result:?}");
    }

    #[test]
    fn cast_accepted_after_range_assertion() {
        let result = check_source(
            r#"
            pri func t.f(x u32) {
                assert x < 256
                var y u8 = x as u8
            }
            "#,
        );
        assert!(result.is_ok(), "{result:?}");
    }
}
