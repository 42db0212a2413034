//! # toposafe-ast
//!
//! AST node types for the toposafe DSL (§3.2), plus the deterministic
//! expression/type pretty-printer (§6.5).
//!
//! Every node kind is a genuine sum type (`ExprKind`, `TypeKind`,
//! `StmtKind`, `Decl`) rather than a uniform overloaded-slot record — see
//! Design Note §9. Nodes are arena-allocated (one [`AstArena`] per
//! source file, §5); cross-file references go by qualified
//! [`toposafe_base::Symbol`], never by raw pointer into another file's
//! arena.
//!
//! [`Expr`] carries the five derived attributes the type/proof checkers
//! stamp on (§3.2): `MType`, `ConstValue`, `GlobalIdent`, `Impure`,
//! `Suspendible`. [`stmt::Jump::target`] and [`stmt::While::has_break`]/
//! [`stmt::While::has_continue`] are the other post-parse-pass stamps
//! (§4.3, §8.1).

pub mod arena;
pub mod decl;
pub mod expr;
pub mod pretty;
pub mod stmt;
pub mod types;

pub use arena::AstArena;
pub use decl::{Const, Decl, File, Func, PackageId, Status, Struct, Use};
pub use expr::{Arg, AssocOp, BinaryOp, Expr, ExprKind, UnaryOp};
pub use pretty::{pp_expr, pp_type};
pub use stmt::{
    Assert, AssertKind, Assign, AssignOp, Block, ElseBranch, Field, IOBind, If, Jump, JumpKind,
    Return, Stmt, StmtKind, Var, Via, ViaSub, While,
};
pub use types::{BaseType, ConstSlot, MType, StreamKind, TypeExpr, TypeKind, TypeSlot};
