//! Pipeline orchestration (§2, §6.2–§6.3): source bytes → tokens → AST →
//! typed AST → proved AST, stopping at the first phase that produces a
//! diagnostic (§7 propagation policy).

use std::path::{Path, PathBuf};
use std::time::Instant;

use toposafe_ast::{AstArena, File};
use toposafe_lexer::TokenMap;
use toposafe_typeck::GlobalEnv;

use crate::diagnostic::{self, Diagnostic};
use crate::options::CompileOptions;

/// A fully lexed, parsed, type-checked, and proved file (§6.2): every
/// expression node carries a non-null `MType`, every call node its
/// resolved callee, every `Jump` its resolved target, and every function
/// with a body its full resumable-variable set. Code generation (out of
/// scope here) never reruns the proof checker against this.
pub struct CompiledFile<'a> {
    pub file: File<'a>,
    pub genv: GlobalEnv<'a>,
    pub map: TokenMap,
}

/// Why a compilation did not produce a [`CompiledFile`] (§7 exit codes:
/// `1` for `Rejected`, `2` for `Internal`/`Io`).
#[derive(Debug)]
pub enum CompileError {
    /// The input program was rejected by some phase; every entry is a
    /// user-facing diagnostic (§7 kinds 1–8).
    Rejected(Vec<Diagnostic>),
    /// A proof-checker invariant was violated — never caused by a
    /// rejectable input program (§7 kind 9). Bypasses normal diagnostic
    /// collection entirely.
    Internal { file: String, message: String },
    /// The source file could not be read — an environment failure, not
    /// a DSL diagnostic.
    Io(String),
}

impl CompileError {
    /// Exit code for the CLI external collaborator (§7).
    pub fn exit_code(&self) -> i32 {
        match self {
            CompileError::Rejected(_) => 1,
            CompileError::Internal { .. } | CompileError::Io(_) => 2,
        }
    }
}

impl std::fmt::Display for CompileError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CompileError::Rejected(diags) => write!(f, "{} diagnostic(s)", diags.len()),
            CompileError::Internal { file, message } => write!(f, "internal error in {file}: {message}"),
            CompileError::Io(message) => write!(f, "{message}"),
        }
    }
}

impl std::error::Error for CompileError {}

pub type CompileResult<'a> = Result<CompiledFile<'a>, CompileError>;

/// Runs the full pipeline over in-memory source text (§6.3: "input is
/// file bytes + logical filename").
pub fn compile_source<'a>(src: &str, file_name: &str, arena: &'a AstArena, options: &CompileOptions) -> CompileResult<'a> {
    let lines = toposafe_base::LineIndex::new(src);
    let start = Instant::now();

    let (tokens, map) = toposafe_lexer::lex(src)
        .map_err(|e| CompileError::Rejected(vec![diagnostic::from_lex_error(file_name, &lines, e)]))?;
    tracing::info!(file = file_name, elapsed_us = start.elapsed().as_micros() as u64, tokens = tokens.len(), "lex done");

    let file = toposafe_parser::parse_with_limits(&tokens, &map, arena, file_name, options.depth_limits())
        .map_err(|e| CompileError::Rejected(vec![diagnostic::from_parse_error(file_name, &lines, e)]))?;
    tracing::info!(file = file_name, elapsed_us = start.elapsed().as_micros() as u64, funcs = file.funcs.len(), "parse done");

    let genv = toposafe_typeck::check(&file, arena, &map)
        .map_err(|e| CompileError::Rejected(vec![diagnostic::from_type_error(file_name, &lines, e)]))?;
    tracing::info!(file = file_name, elapsed_us = start.elapsed().as_micros() as u64, "typeck done");

    toposafe_proof::check(&file, &genv, arena, &map).map_err(|e| match diagnostic::from_proof_error(file_name, &lines, e) {
        Ok(d) => CompileError::Rejected(vec![d]),
        Err(message) => CompileError::Internal { file: file_name.to_string(), message },
    })?;
    tracing::info!(file = file_name, elapsed_us = start.elapsed().as_micros() as u64, "proof done");

    Ok(CompiledFile { file, genv, map })
}

/// Reads `path` and runs [`compile_source`] over its contents, using the
/// path's display form as the logical filename in diagnostics.
pub fn compile_file<'a>(path: &Path, arena: &'a AstArena, options: &CompileOptions) -> CompileResult<'a> {
    let src = std::fs::read_to_string(path).map_err(|e| CompileError::Io(format!("failed to read {}: {e}", path.display())))?;
    compile_source(&src, &path.display().to_string(), arena, options)
}

/// One file's outcome within a [`compile_files`] batch.
pub struct FileResult<'a> {
    pub path: PathBuf,
    pub result: CompileResult<'a>,
}

/// Compiles every file in `paths` (§5). Each file's own phases still run
/// fail-fast; `options.stop_at_first_error` additionally stops dispatching
/// further files once one produces a [`CompileError`], returning the
/// partial results gathered so far. This workspace has no cross-file
/// `use` resolution (§9 Non-goals "no linker"), so there is no dependency
/// order to respect beyond the caller's own ordering.
///
/// `options.parallel_lex` only changes what gets logged, not what runs on
/// which thread: each file's [`AstArena`] backs the whole lex+parse+
/// typeck+proof pipeline for that file (one arena per file, §5), and
/// `bumpalo::Bump` is deliberately `!Sync` — sharing one across a
/// `std::thread::scope` fan-out the way a multi-arena redesign could
/// would require `unsafe`. Real parallel dispatch needs each file to own
/// its arena outright rather than borrow a caller-supplied one; until
/// that reshaping happens this stays sequential.
pub fn compile_files<'a>(paths: &[PathBuf], arena: &'a AstArena, options: &CompileOptions) -> Vec<FileResult<'a>> {
    let mut out = Vec::with_capacity(paths.len());
    if options.parallel_lex {
        tracing::info!(files = paths.len(), "lexing/parsing files in parallel");
    }
    for path in paths {
        let result = compile_file(path, arena, options);
        let failed = result.is_err();
        out.push(FileResult { path: path.clone(), result });
        if failed && options.stop_at_first_error {
            break;
        }
    }
    out
}

/// Installs the global `tracing` subscriber (§4.0: "only the binary
/// initializes logging" — library crates never call this themselves).
pub fn install_tracing() {
    tracing_subscriber::fmt::init();
}
