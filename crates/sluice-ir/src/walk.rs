//! Recursive statement traversal.
//!
//! Pre-order: a statement is handed to the callback before any of its
//! child blocks, and child blocks are visited in the order
//! [`StmtKind::child_blocks`](crate::stmt::StmtKind::child_blocks) returns.

use std::ops::ControlFlow;

use crate::context::IrContext;
use crate::refs::{BlockRef, IrNode, StmtRef};

/// Controls whether to descend into children during a walk.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum WalkAction {
    /// Continue walking and descend into child blocks.
    Advance,
    /// Skip the child blocks of the current statement.
    Skip,
}

/// Walk every statement reachable from `node`.
pub fn walk_node<B>(
    ctx: &IrContext,
    node: IrNode,
    f: &mut dyn FnMut(StmtRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match node {
        IrNode::Block(block) => walk_block(ctx, block, f),
        IrNode::Stmt(stmt) => walk_stmt(ctx, stmt, f),
    }
}

/// Walk all statements in a block recursively.
pub fn walk_block<B>(
    ctx: &IrContext,
    block: BlockRef,
    f: &mut dyn FnMut(StmtRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    for &stmt in ctx.block_stmts(block) {
        walk_stmt(ctx, stmt, f)?;
    }
    ControlFlow::Continue(())
}

/// Walk a statement and its child blocks recursively.
pub fn walk_stmt<B>(
    ctx: &IrContext,
    stmt: StmtRef,
    f: &mut dyn FnMut(StmtRef) -> ControlFlow<B, WalkAction>,
) -> ControlFlow<B, ()> {
    match f(stmt) {
        ControlFlow::Break(b) => return ControlFlow::Break(b),
        ControlFlow::Continue(WalkAction::Skip) => return ControlFlow::Continue(()),
        ControlFlow::Continue(WalkAction::Advance) => {}
    }
    for block in ctx.kind(stmt).child_blocks() {
        walk_block(ctx, block, f)?;
    }
    ControlFlow::Continue(())
}

/// Collect every statement reachable from `node` in visit order.
pub fn collect_stmts(ctx: &IrContext, node: IrNode) -> Vec<StmtRef> {
    let mut out = Vec::new();
    let _ = walk_node::<()>(ctx, node, &mut |stmt| {
        out.push(stmt);
        ControlFlow::Continue(WalkAction::Advance)
    });
    out
}
