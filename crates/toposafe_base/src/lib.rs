#![cfg_attr(docsrs, feature(doc_cfg))]

//! # toposafe-base
//!
//! Pure structural atoms for the toposafe compiler.
//!
//! This crate provides the foundational types used throughout every other
//! `toposafe-*` crate:
//!
//! - [`Arena`] — Bump allocation for stable AST references
//! - [`Interner`]/[`Symbol`] — String interning for O(1) equality
//! - [`Span`] — Source location tracking
//! - [`SpannedError`]/[`Result`] — Errors with source positions
//! - [`LineIndex`] — Byte offset to line number lookup for diagnostics
//! - [`Interval`]/[`IntBound`] — Arbitrary-precision interval arithmetic
//!
//! # Design Principles
//!
//! This crate has **no knowledge of the DSL's grammar or type system**. It
//! provides only generic, reusable infrastructure that higher-level crates
//! build upon.
//!
//! # Example
//!
//! ```
//! use toposafe_base::{Arena, Interner, Span};
//!
//! let arena: Arena<&str> = Arena::new();
//! let mut interner = Interner::new();
//!
//! let hello = interner.intern("hello");
//! let span = Span::new(0, 5);
//!
//! let allocated = arena.alloc("hello");
//! assert_eq!(*allocated, "hello");
//! ```

pub mod arena;
pub mod intern;
pub mod interval;
pub mod linemap;
pub mod span;
pub mod error;

pub use arena::Arena;
pub use intern::{Interner, Symbol, SymbolEq};
pub use interval::{IntBound, Interval};
pub use linemap::LineIndex;
pub use span::Span;
pub use error::{SpannedError, Result};
