//! Per-file bump arena for heterogeneous AST node kinds.
//!
//! [`toposafe_base::Arena`] is typed to a single `T` per instance, which
//! fits a token interner but not a tree that mixes `Expr`, `TypeExpr`,
//! `Arg`, `Var`, and statement nodes. [`AstArena`] wraps the same
//! underlying `bumpalo::Bump` with a generic-per-call `alloc`, so one
//! arena backs an entire file's node tree (§5: "one arena per source
//! file"). Dropping or resetting the arena invalidates every reference
//! into it at once.

use bumpalo::Bump;

pub struct AstArena {
    bump: Bump,
}

impl AstArena {
    pub fn new() -> Self {
        AstArena { bump: Bump::new() }
    }

    pub fn alloc<T>(&self, value: T) -> &T {
        self.bump.alloc(value)
    }

    pub fn alloc_slice<T, I>(&self, items: I) -> &[T]
    where
        I: IntoIterator<Item = T>,
        I::IntoIter: ExactSizeIterator,
    {
        self.bump.alloc_slice_fill_iter(items)
    }

    pub fn reset(&mut self) {
        self.bump.reset();
    }
}

impl Default for AstArena {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allocates_mixed_types_from_one_arena() {
        let arena = AstArena::new();
        let a: &i32 = arena.alloc(1);
        let b: &str = arena.alloc_slice("hi".bytes().map(|c| c as char).collect::<Vec<_>>())
            .iter()
            .collect::<String>()
            .leak();
        assert_eq!(*a, 1);
        assert_eq!(b, "hi");
    }
}
