//! Ownership and usage-index validation.
//!
//! Three kinds of checks over the tree reachable from a root node:
//!
//! 1. **Ownership**: every statement's `parent_block` names the block that
//!    actually holds it, every child block's `parent_stmt` names its
//!    container, and no statement is reachable twice.
//! 2. **Stale usages**: no operand refers to an erased statement, or to a
//!    live one that no block holds.
//! 3. **Usage-index consistency**: the index stored in `IrContext` matches
//!    the actual operands in both directions.

use std::collections::HashSet;
use std::fmt;

use crate::context::IrContext;
use crate::refs::{BlockRef, IrNode, StmtRef};

// ============================================================================
// Error types
// ============================================================================

/// Broken ownership back-link or duplicated statement.
pub struct OwnershipError {
    pub message: String,
}

/// An operand that refers to an erased statement.
pub struct StaleUsageError {
    pub user: StmtRef,
    /// Mnemonic of the reading statement (e.g. "binary").
    pub user_kind: &'static str,
    pub operand_index: usize,
    pub target: StmtRef,
}

/// An operand that refers to a live statement outside every block.
pub struct DetachedUsageError {
    pub user: StmtRef,
    pub operand_index: usize,
    pub target: StmtRef,
}

/// Describes a usage-index inconsistency.
pub struct UseChainError {
    pub message: String,
}

impl fmt::Display for OwnershipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for OwnershipError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for StaleUsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operand #{} of {} ({}) references erased {}",
            self.operand_index, self.user_kind, self.user, self.target,
        )
    }
}

impl fmt::Debug for StaleUsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for DetachedUsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "operand #{} of {} reads {}, which is not attached to any block",
            self.operand_index, self.user, self.target,
        )
    }
}

impl fmt::Debug for DetachedUsageError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl fmt::Display for UseChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.message)
    }
}

impl fmt::Debug for UseChainError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

/// Result of validation.
#[derive(Default)]
pub struct ValidationResult {
    pub ownership_errors: Vec<OwnershipError>,
    pub stale_errors: Vec<StaleUsageError>,
    pub detached_errors: Vec<DetachedUsageError>,
    pub use_chain_errors: Vec<UseChainError>,
}

impl ValidationResult {
    pub fn is_ok(&self) -> bool {
        self.ownership_errors.is_empty()
            && self.stale_errors.is_empty()
            && self.detached_errors.is_empty()
            && self.use_chain_errors.is_empty()
    }

    pub fn error_count(&self) -> usize {
        self.ownership_errors.len()
            + self.stale_errors.len()
            + self.detached_errors.len()
            + self.use_chain_errors.len()
    }
}

impl fmt::Display for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_ok() {
            return write!(f, "validation passed");
        }
        if !self.ownership_errors.is_empty() {
            writeln!(f, "{} ownership error(s) found:", self.ownership_errors.len())?;
            for err in &self.ownership_errors {
                writeln!(f, "  - {}", err)?;
            }
        }
        if !self.stale_errors.is_empty() {
            writeln!(f, "{} stale usage(s) found:", self.stale_errors.len())?;
            for err in &self.stale_errors {
                writeln!(f, "  - {}", err)?;
            }
        }
        if !self.detached_errors.is_empty() {
            writeln!(f, "{} detached usage(s) found:", self.detached_errors.len())?;
            for err in &self.detached_errors {
                writeln!(f, "  - {}", err)?;
            }
        }
        if !self.use_chain_errors.is_empty() {
            writeln!(
                f,
                "{} use-chain error(s) found:",
                self.use_chain_errors.len()
            )?;
            for err in &self.use_chain_errors {
                writeln!(f, "  - {}", err)?;
            }
        }
        Ok(())
    }
}

impl fmt::Debug for ValidationResult {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

// ============================================================================
// Ownership
// ============================================================================

/// Check parent back-links for everything reachable from `root`.
pub fn validate_ownership(ctx: &IrContext, root: IrNode) -> ValidationResult {
    let mut errors = Vec::new();
    let mut seen = HashSet::new();
    match root {
        IrNode::Block(block) => check_block_ownership(ctx, block, &mut seen, &mut errors),
        IrNode::Stmt(stmt) => check_stmt_ownership(ctx, stmt, &mut seen, &mut errors),
    }
    ValidationResult {
        ownership_errors: errors,
        ..Default::default()
    }
}

fn check_block_ownership(
    ctx: &IrContext,
    block: BlockRef,
    seen: &mut HashSet<StmtRef>,
    errors: &mut Vec<OwnershipError>,
) {
    for &stmt in ctx.block_stmts(block) {
        let parent = ctx.stmt(stmt).parent_block;
        if parent != Some(block) {
            errors.push(OwnershipError {
                message: format!("{stmt} is listed in {block} but its parent is {parent:?}"),
            });
        }
        check_stmt_ownership(ctx, stmt, seen, errors);
    }
}

fn check_stmt_ownership(
    ctx: &IrContext,
    stmt: StmtRef,
    seen: &mut HashSet<StmtRef>,
    errors: &mut Vec<OwnershipError>,
) {
    if !seen.insert(stmt) {
        errors.push(OwnershipError {
            message: format!("{stmt} is reachable more than once"),
        });
        return;
    }
    if ctx.is_erased(stmt) {
        errors.push(OwnershipError {
            message: format!("erased {stmt} is still reachable"),
        });
    }
    for block in ctx.kind(stmt).child_blocks() {
        let owner = ctx.block(block).parent_stmt;
        if owner != Some(stmt) {
            errors.push(OwnershipError {
                message: format!("{block} is a child of {stmt} but its owner is {owner:?}"),
            });
        }
        check_block_ownership(ctx, block, seen, errors);
    }
}

// ============================================================================
// Usages
// ============================================================================

/// Check operands against erased or detached statements and the usage
/// index against actual operands.
///
/// A statement root may be detached itself; operands reading it are fine.
pub fn validate_usages(ctx: &IrContext, root: IrNode) -> ValidationResult {
    let mut stale_errors = Vec::new();
    let mut detached_errors = Vec::new();
    let mut use_chain_errors = Vec::new();

    let reachable = crate::walk::collect_stmts(ctx, root);

    // Direction 1: actual operand → usage-index entry must exist
    for &stmt in &reachable {
        for (idx, operand) in ctx.stmt_operands(stmt).into_iter().enumerate() {
            if ctx.is_erased(operand) {
                stale_errors.push(StaleUsageError {
                    user: stmt,
                    user_kind: ctx.kind(stmt).name(),
                    operand_index: idx,
                    target: operand,
                });
            } else if ctx.stmt(operand).parent_block.is_none() && root != IrNode::Stmt(operand) {
                detached_errors.push(DetachedUsageError {
                    user: stmt,
                    operand_index: idx,
                    target: operand,
                });
            }
            let found = ctx
                .uses(operand)
                .iter()
                .any(|u| u.user == stmt && u.operand_index == idx as u32);
            if !found {
                use_chain_errors.push(UseChainError {
                    message: format!(
                        "operand #{idx} of {stmt} reads {operand} but no usage entry exists",
                    ),
                });
            }
        }
    }

    // Direction 2: usage-index entry → actual operand must exist
    for &stmt in &reachable {
        for u in ctx.uses(stmt) {
            let actual = ctx.stmt_operands(u.user).get(u.operand_index as usize).copied();
            if ctx.is_erased(u.user) || actual != Some(stmt) {
                use_chain_errors.push(UseChainError {
                    message: format!(
                        "usage entry for {stmt} claims operand #{} of {}, which reads {actual:?}",
                        u.operand_index, u.user,
                    ),
                });
            }
        }
    }

    ValidationResult {
        stale_errors,
        detached_errors,
        use_chain_errors,
        ..Default::default()
    }
}

/// Run every check and combine the results.
pub fn validate_all(ctx: &IrContext, root: IrNode) -> ValidationResult {
    let ownership = validate_ownership(ctx, root);
    let usages = validate_usages(ctx, root);
    ValidationResult {
        ownership_errors: ownership.ownership_errors,
        stale_errors: usages.stale_errors,
        detached_errors: usages.detached_errors,
        use_chain_errors: usages.use_chain_errors,
    }
}

/// Debug-only validation that panics on any error.
///
/// Only runs under `cfg!(debug_assertions)`. Useful as a checkpoint after
/// rewrite passes.
pub fn debug_assert_valid(ctx: &IrContext, root: IrNode, pass_name: &str) {
    if !cfg!(debug_assertions) {
        return;
    }
    let result = validate_all(ctx, root);
    if !result.is_ok() {
        panic!("IR validation failed after `{}`:\n{}", pass_name, result);
    }
}

// ============================================================================
// Tests
// ============================================================================
