//! Pipeline configuration (§4.0.1).

use toposafe_parser::DepthLimits;

/// Controls nesting-depth ceilings, error propagation, and the `via`
/// rule catalogue version enforced for a compilation (§4.0.1, §4.5.4
/// Open Question 2, §5 `parallel_lex`).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CompileOptions {
    pub max_expr_depth: usize,
    pub max_type_depth: usize,
    pub max_body_depth: usize,
    /// Whether `compile_files` stops dispatching further files once one
    /// has produced a diagnostic, rather than compiling every file and
    /// reporting all of their results. Each individual phase inside a
    /// single file's pipeline is fail-fast regardless of this flag — the
    /// lexer, parser, type checker, and proof checker each short-circuit
    /// on their first error, so this only governs cross-file batching.
    pub stop_at_first_error: bool,
    /// The `via` rule catalogue version this compilation enforces (§4.5.4
    /// Open Question 2). `toposafe-proof`'s catalogue is currently fixed
    /// at version 1; this field is read but not yet branched on, pending
    /// a second catalogue version.
    pub via_rule_catalogue_version: u32,
    /// Lex and parse every input file concurrently via a `std::thread::scope`
    /// fan-out before the single-threaded, `use`-dependency-ordered
    /// typeck/proof pass (§5). Defaults to `false` so single-file and
    /// test runs stay deterministic.
    pub parallel_lex: bool,
}

impl CompileOptions {
    pub fn depth_limits(&self) -> DepthLimits {
        DepthLimits {
            max_expr_depth: self.max_expr_depth,
            max_type_depth: self.max_type_depth,
            max_body_depth: self.max_body_depth,
        }
    }
}

impl Default for CompileOptions {
    fn default() -> Self {
        let defaults = DepthLimits::default();
        CompileOptions {
            max_expr_depth: defaults.max_expr_depth,
            max_type_depth: defaults.max_type_depth,
            max_body_depth: defaults.max_body_depth,
            stop_at_first_error: true,
            via_rule_catalogue_version: 1,
            parallel_lex: false,
        }
    }
}
