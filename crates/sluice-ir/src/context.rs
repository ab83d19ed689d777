//! IrContext: arena storage for statements and blocks.
//!
//! All statements and blocks live in `PrimaryMap`s owned by `IrContext`.
//! Ownership is expressed through back-links: a statement records the
//! block holding it, a block records the container statement owning it.
//! The usage index (statement → users) is maintained on every mutation.

use cranelift_entity::{PrimaryMap, SecondaryMap};
use smallvec::SmallVec;
use tracing::trace;

use crate::refs::{BlockRef, StmtRef};
use crate::stmt::{DataType, StmtKind};

// ============================================================================
// Usage index
// ============================================================================

/// A single use of a statement: which statement reads it, at which operand index.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Use {
    pub user: StmtRef,
    pub operand_index: u32,
}

// ============================================================================
// Entity data types
// ============================================================================

/// Data for a single statement in the arena.
#[derive(Debug)]
pub struct StmtData {
    pub kind: StmtKind,
    pub ty: DataType,
    pub parent_block: Option<BlockRef>,
}

/// Data for a block.
#[derive(Debug, Default)]
pub struct BlockData {
    pub stmts: SmallVec<[StmtRef; 4]>,
    /// Container statement owning this block; `None` for a root block
    /// or a block detached for transfer.
    pub parent_stmt: Option<StmtRef>,
}

// ============================================================================
// IrContext
// ============================================================================

/// Arena-based mutable IR context.
///
/// Statements are never freed from the arena; erasing one leaves a
/// tombstone so stale references can be detected by validation.
#[derive(Default)]
pub struct IrContext {
    stmts: PrimaryMap<StmtRef, StmtData>,
    blocks: PrimaryMap<BlockRef, BlockData>,

    /// Usage index: for each statement, the statements reading it.
    uses: SecondaryMap<StmtRef, SmallVec<[Use; 2]>>,
    erased: SecondaryMap<StmtRef, bool>,
}

impl IrContext {
    /// Create a new empty IR context.
    pub fn new() -> Self {
        Self::default()
    }

    // ========================================================================
    // Statement
    // ========================================================================

    /// Create a detached statement.
    ///
    /// Operands are registered in the usage index and every child block of
    /// a container kind is back-linked to the new statement.
    ///
    /// # Panics
    ///
    /// Panics if an operand has been erased, or if a child block already
    /// belongs to another statement.
    pub fn create_stmt(&mut self, kind: StmtKind, ty: DataType) -> StmtRef {
        let operands = kind.operands();
        for &operand in &operands {
            assert!(
                !self.erased[operand],
                "create_stmt: operand {operand} has been erased",
            );
        }
        let children = kind.child_blocks();

        let stmt = self.stmts.push(StmtData {
            kind,
            ty,
            parent_block: None,
        });

        for &block in &children {
            if let Some(existing) = self.blocks[block].parent_stmt {
                panic!(
                    "create_stmt: {block} already belongs to {existing}; \
                     detach it before handing it to {stmt}",
                );
            }
            self.blocks[block].parent_stmt = Some(stmt);
        }

        for (idx, &operand) in operands.iter().enumerate() {
            self.uses[operand].push(Use {
                user: stmt,
                operand_index: idx as u32,
            });
        }

        stmt
    }

    /// Get immutable reference to statement data.
    pub fn stmt(&self, stmt: StmtRef) -> &StmtData {
        &self.stmts[stmt]
    }

    pub fn kind(&self, stmt: StmtRef) -> &StmtKind {
        &self.stmts[stmt].kind
    }

    pub fn stmt_ty(&self, stmt: StmtRef) -> DataType {
        self.stmts[stmt].ty
    }

    /// Operands of a statement in operand-index order.
    pub fn stmt_operands(&self, stmt: StmtRef) -> SmallVec<[StmtRef; 4]> {
        self.stmts[stmt].kind.operands()
    }

    pub fn is_erased(&self, stmt: StmtRef) -> bool {
        self.erased[stmt]
    }

    /// Number of statements ever allocated, erased ones included.
    pub fn num_stmts(&self) -> usize {
        self.stmts.len()
    }

    /// Erase a detached statement.
    ///
    /// Drops its operand uses, marks it erased, and discards every child
    /// block it still owns together with the statements inside. Blocks
    /// previously released with [`detach_block`](Self::detach_block) are
    /// left alone.
    ///
    /// # Panics
    ///
    /// Panics if the statement is still attached to a block, or if anything
    /// outside the erased subtree still reads a statement being erased.
    pub fn erase_stmt(&mut self, stmt: StmtRef) {
        assert!(
            self.stmts[stmt].parent_block.is_none(),
            "erase_stmt: {stmt} is still attached to {:?}; remove it from its block first",
            self.stmts[stmt].parent_block,
        );

        let mut doomed = Vec::new();
        self.collect_owned_subtree(stmt, &mut doomed);

        for &s in &doomed {
            let operands = self.stmts[s].kind.operands();
            for (idx, &operand) in operands.iter().enumerate() {
                self.uses[operand].retain(|u| !(u.user == s && u.operand_index == idx as u32));
            }
        }

        for &s in &doomed {
            assert!(
                self.uses[s].is_empty(),
                "erase_stmt: {s} still has {} use(s) outside the erased subtree; \
                 replace all usages before erasing",
                self.uses[s].len(),
            );
            self.erased[s] = true;
            self.stmts[s].parent_block = None;
        }

        trace!(%stmt, discarded = doomed.len() - 1, "erased statement");
    }

    /// `stmt` followed by every statement in child blocks it still owns,
    /// recursively. This is what [`erase_stmt`](Self::erase_stmt) discards.
    pub fn owned_subtree(&self, stmt: StmtRef) -> Vec<StmtRef> {
        let mut out = Vec::new();
        self.collect_owned_subtree(stmt, &mut out);
        out
    }

    /// Whether `block` holds `stmt` or encloses it through container
    /// statements.
    pub fn encloses(&self, block: BlockRef, stmt: StmtRef) -> bool {
        let mut current = self.stmts[stmt].parent_block;
        while let Some(b) = current {
            if b == block {
                return true;
            }
            current = self.blocks[b]
                .parent_stmt
                .and_then(|owner| self.stmts[owner].parent_block);
        }
        false
    }

    fn collect_owned_subtree(&self, stmt: StmtRef, out: &mut Vec<StmtRef>) {
        out.push(stmt);
        for block in self.stmts[stmt].kind.child_blocks() {
            if self.blocks[block].parent_stmt != Some(stmt) {
                continue;
            }
            for &child in &self.blocks[block].stmts {
                self.collect_owned_subtree(child, out);
            }
        }
    }

    // ========================================================================
    // Block
    // ========================================================================

    /// Create a new, empty, unowned block.
    pub fn create_block(&mut self) -> BlockRef {
        self.blocks.push(BlockData::default())
    }

    /// Get immutable reference to block data.
    pub fn block(&self, block: BlockRef) -> &BlockData {
        &self.blocks[block]
    }

    pub fn block_stmts(&self, block: BlockRef) -> &[StmtRef] {
        &self.blocks[block].stmts
    }

    /// Append a statement to the end of a block.
    ///
    /// # Panics
    ///
    /// Panics if the statement is erased or already belongs to a block.
    pub fn push_stmt(&mut self, block: BlockRef, stmt: StmtRef) {
        self.assert_insertable("push_stmt", stmt);
        self.stmts[stmt].parent_block = Some(block);
        self.blocks[block].stmts.push(stmt);
    }

    /// Insert a statement before `before` in the given block.
    ///
    /// # Panics
    ///
    /// Panics if the statement is erased or already belongs to a block, or
    /// if `before` is not in the block.
    pub fn insert_stmt_before(&mut self, block: BlockRef, before: StmtRef, stmt: StmtRef) {
        self.assert_insertable("insert_stmt_before", stmt);
        let pos = self
            .position_in_block(block, before)
            .expect("insert_stmt_before: `before` statement not found in block");
        self.blocks[block].stmts.insert(pos, stmt);
        self.stmts[stmt].parent_block = Some(block);
    }

    /// Remove a statement from a block (does not erase the statement).
    ///
    /// Only clears the statement's `parent_block` if it matches the given block.
    pub fn remove_stmt_from_block(&mut self, block: BlockRef, stmt: StmtRef) {
        self.blocks[block].stmts.retain(|s| *s != stmt);
        if self.stmts[stmt].parent_block == Some(block) {
            self.stmts[stmt].parent_block = None;
        }
    }

    pub fn position_in_block(&self, block: BlockRef, stmt: StmtRef) -> Option<usize> {
        self.blocks[block].stmts.iter().position(|&s| s == stmt)
    }

    /// Release a block from the container owning it and return the former
    /// owner.
    ///
    /// This is how a replacement takes over a body: detach it from the old
    /// container, then name it in the new container's kind. A detached block
    /// is not discarded when its former owner is erased.
    pub fn detach_block(&mut self, block: BlockRef) -> Option<StmtRef> {
        self.blocks[block].parent_stmt.take()
    }

    fn assert_insertable(&self, what: &str, stmt: StmtRef) {
        assert!(!self.erased[stmt], "{what}: {stmt} has been erased");
        assert!(
            self.stmts[stmt].parent_block.is_none(),
            "{what}: {stmt} already belongs to {:?}; remove it from the old block first",
            self.stmts[stmt].parent_block,
        );
    }

    // ========================================================================
    // Usage index
    // ========================================================================

    /// Get all uses of a statement.
    pub fn uses(&self, stmt: StmtRef) -> &[Use] {
        &self.uses[stmt]
    }

    /// Check if a statement has any uses.
    pub fn has_uses(&self, stmt: StmtRef) -> bool {
        !self.uses[stmt].is_empty()
    }

    /// Replace all uses of `old` with `new` in all statements.
    ///
    /// Walks only `old`'s use list; updates both operand slots and the
    /// usage index.
    pub fn replace_all_usages(&mut self, old: StmtRef, new: StmtRef) {
        if old == new {
            return;
        }
        let old_uses = std::mem::take(&mut self.uses[old]);

        for u in &old_uses {
            let slot = self.stmts[u.user]
                .kind
                .operand_mut(u.operand_index as usize)
                .expect("usage index points at a missing operand slot");
            debug_assert_eq!(*slot, old);
            *slot = new;

            self.uses[new].push(*u);
        }
    }

    // ========================================================================
    // Replacement
    // ========================================================================

    /// Replace `old` with the detached statement `new`.
    ///
    /// Usages are redirected before anything moves, then `new` takes `old`'s
    /// position in its block and `old` is erased together with any child
    /// block it still owns.
    ///
    /// # Panics
    ///
    /// Panics if `new` is attached, erased, or identical to `old`, or if it
    /// reads `old` or anything in a body erased with `old`.
    pub fn replace_stmt(&mut self, old: StmtRef, new: StmtRef) {
        assert_ne!(old, new, "replace_stmt: cannot replace {old} with itself");
        self.assert_insertable("replace_stmt", new);
        let doomed = self.owned_subtree(old);
        if let Some(read) = self
            .stmt_operands(new)
            .into_iter()
            .find(|operand| doomed.contains(operand))
        {
            panic!("replace_stmt: replacement {new} reads {read}, which is erased with {old}");
        }

        let parent_block = self.stmts[old].parent_block;

        self.replace_all_usages(old, new);

        if let Some(block) = parent_block {
            let pos = self
                .position_in_block(block, old)
                .expect("replace_stmt: statement not found in its parent block");
            self.blocks[block].stmts[pos] = new;
            self.stmts[new].parent_block = Some(block);
            self.stmts[old].parent_block = None;
        }

        self.erase_stmt(old);
    }
}
