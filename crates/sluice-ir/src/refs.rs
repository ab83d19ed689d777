//! Entity references for the statement arena.
//!
//! Each ref type is a thin `u32` wrapper providing type-safe indexing
//! into `PrimaryMap` storage in `IrContext`.

use cranelift_entity::entity_impl;
use std::fmt;

/// Reference to a statement in the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StmtRef(u32);
entity_impl!(StmtRef, "stmt");

/// Reference to a block (ordered statement list) in the arena.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct BlockRef(u32);
entity_impl!(BlockRef, "block");

/// Entry point of a tree walk: either a whole block or a single statement
/// together with everything nested below it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum IrNode {
    Block(BlockRef),
    Stmt(StmtRef),
}

impl From<BlockRef> for IrNode {
    fn from(block: BlockRef) -> Self {
        IrNode::Block(block)
    }
}

impl From<StmtRef> for IrNode {
    fn from(stmt: StmtRef) -> Self {
        IrNode::Stmt(stmt)
    }
}

impl fmt::Display for IrNode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            IrNode::Block(block) => write!(f, "{block}"),
            IrNode::Stmt(stmt) => write!(f, "{stmt}"),
        }
    }
}
