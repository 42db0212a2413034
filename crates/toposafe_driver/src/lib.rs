//! # toposafe-driver
//!
//! Pipeline orchestration for the toposafe DSL compiler (§2, §6.2–§6.3):
//! wires `toposafe-lexer` → `toposafe-parser` → `toposafe-typeck` →
//! `toposafe-proof` into [`compile_source`]/[`compile_file`]/
//! [`compile_files`], aggregates every phase's error into the uniform
//! [`Diagnostic`] wire format (§6.4, §7), and owns the one `tracing`
//! subscriber installation in the workspace (§4.0) — every other crate
//! only emits spans/events, never installs a subscriber.

pub mod diagnostic;
pub mod options;
pub mod pipeline;
pub mod renderer;

pub use diagnostic::{Diagnostic, DiagnosticKind, Severity};
pub use options::CompileOptions;
pub use pipeline::{compile_file, compile_files, compile_source, install_tracing, CompileError, CompileResult, CompiledFile, FileResult};
pub use renderer::{PlainTextRenderer, Renderer};
