//! Predicate-driven statement replacement.
//!
//! Finds statements matching a predicate anywhere below a root node and
//! substitutes a freshly generated statement for each, one at a time, until
//! a full traversal finds nothing left to replace.
//!
//! # Algorithm
//!
//! Each traversal is a read-only pre-order walk that stops at the first
//! match (`ControlFlow::Break`). The engine then:
//!
//! 1. asks the generator for a detached replacement,
//! 2. redirects every usage of the matched statement to the replacement,
//! 3. swaps the replacement into the matched statement's block slot and
//!    erases the matched statement (with any child block it still owns),
//! 4. starts over from the original root.
//!
//! A traversal therefore either sees no match and ends the run, or performs
//! exactly one mutation. Worst case is O(replacements × tree size).
//!
//! # Moving bodies
//!
//! A generator that wants the replacement to keep the matched container's
//! body detaches it with [`IrContext::detach_block`] and names it in the new
//! kind. Bodies left attached are discarded with the matched statement.
//!
//! # Termination
//!
//! Unbounded by default: the predicate/generator pair must converge. Set
//! [`ReplaceConfig::max_restarts`] to turn a runaway rule into
//! [`ReplaceError::NonConvergent`].

use std::marker::PhantomData;
use std::ops::ControlFlow;

use tracing::{debug, debug_span, trace, warn};

use crate::context::IrContext;
use crate::error::{BoxError, ReplaceError};
use crate::refs::{IrNode, StmtRef};
use crate::walk::{self, WalkAction};

/// Configuration for statement replacement.
#[derive(Debug, Clone, Copy, Default)]
pub struct ReplaceConfig {
    /// Maximum number of replacements before reporting non-convergence.
    /// `None` (the default) never gives up.
    pub max_restarts: Option<usize>,
}

/// Result of a successful replacement run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ReplaceResult {
    /// Statements replaced, which is also the number of restarts.
    pub replacements: usize,
    /// Full or aborted traversals performed, the final clean one included.
    pub traversals: usize,
    /// Root of the final traversal. Differs from the input only when the
    /// input was a statement that got replaced.
    pub root: IrNode,
}

/// Reusable predicate/generator pair.
pub struct StatementReplacer<P, G, E> {
    predicate: P,
    generator: G,
    config: ReplaceConfig,
    _error: PhantomData<fn() -> E>,
}

impl<P, G, E> StatementReplacer<P, G, E>
where
    P: FnMut(&IrContext, StmtRef) -> bool,
    G: FnMut(&mut IrContext) -> Result<StmtRef, E>,
    E: Into<BoxError>,
{
    pub fn new(predicate: P, generator: G) -> Self {
        Self {
            predicate,
            generator,
            config: ReplaceConfig::default(),
            _error: PhantomData,
        }
    }

    pub fn with_config(mut self, config: ReplaceConfig) -> Self {
        self.config = config;
        self
    }

    /// Bound the number of replacements (see [`ReplaceConfig::max_restarts`]).
    pub fn with_max_restarts(mut self, n: usize) -> Self {
        self.config.max_restarts = Some(n);
        self
    }

    pub fn config(&self) -> &ReplaceConfig {
        &self.config
    }

    /// Replace until no statement reachable from `root` matches.
    ///
    /// If `root` is a statement and gets replaced itself, later traversals
    /// start from its replacement.
    pub fn run(
        &mut self,
        ctx: &mut IrContext,
        root: impl Into<IrNode>,
    ) -> Result<ReplaceResult, ReplaceError> {
        let mut root = root.into();
        let _span = debug_span!("replace_statements", %root).entered();

        let mut replacements = 0;
        let mut traversals = 0;

        loop {
            traversals += 1;
            let Some(stmt) = self.find_match(ctx, root) else {
                debug!(replacements, traversals, "reached fixed point");
                return Ok(ReplaceResult {
                    replacements,
                    traversals,
                    root,
                });
            };

            if let Some(limit) = self.config.max_restarts {
                if replacements >= limit {
                    warn!(%stmt, limit, "rewrite did not converge");
                    return Err(ReplaceError::NonConvergent { limit, stmt });
                }
            }

            trace!(%stmt, kind = ctx.kind(stmt).name(), "statement matched");

            let replacement = (self.generator)(ctx).map_err(|e| ReplaceError::Generator {
                stmt,
                source: e.into(),
            })?;
            check_replacement(ctx, stmt, replacement)?;

            ctx.replace_stmt(stmt, replacement);
            replacements += 1;
            trace!(%stmt, %replacement, "statement replaced");

            if root == IrNode::Stmt(stmt) {
                root = IrNode::Stmt(replacement);
            }
        }
    }

    /// One traversal: the first matching statement in pre-order, if any.
    fn find_match(&mut self, ctx: &IrContext, root: IrNode) -> Option<StmtRef> {
        let predicate = &mut self.predicate;
        match walk::walk_node(ctx, root, &mut |stmt| {
            if predicate(ctx, stmt) {
                ControlFlow::Break(stmt)
            } else {
                ControlFlow::Continue(WalkAction::Advance)
            }
        }) {
            ControlFlow::Break(stmt) => Some(stmt),
            ControlFlow::Continue(()) => None,
        }
    }
}

/// Replace every statement below `root` matching `predicate` with one
/// produced by `generator`, until none match.
///
/// The generator is called exactly once per match and never otherwise. Its
/// errors abort the run immediately; replacements already made stay.
pub fn replace_statements<P, G, E>(
    ctx: &mut IrContext,
    root: impl Into<IrNode>,
    predicate: P,
    generator: G,
) -> Result<ReplaceResult, ReplaceError>
where
    P: FnMut(&IrContext, StmtRef) -> bool,
    G: FnMut(&mut IrContext) -> Result<StmtRef, E>,
    E: Into<BoxError>,
{
    StatementReplacer::new(predicate, generator).run(ctx, root)
}

fn check_replacement(
    ctx: &IrContext,
    stmt: StmtRef,
    replacement: StmtRef,
) -> Result<(), ReplaceError> {
    let reason = if replacement == stmt {
        "generator returned the matched statement"
    } else if ctx.is_erased(replacement) {
        "replacement has been erased"
    } else if ctx.stmt(replacement).parent_block.is_some() {
        "replacement already belongs to a block"
    } else if ctx.stmt_operands(replacement).contains(&stmt) {
        "replacement reads the statement it replaces"
    } else if reads_discarded_body(ctx, stmt, replacement) {
        "replacement reads a statement in a discarded body"
    } else if ctx
        .kind(replacement)
        .child_blocks()
        .into_iter()
        .any(|block| ctx.encloses(block, stmt))
    {
        "replacement owns a block enclosing the matched statement"
    } else {
        return Ok(());
    };
    Err(ReplaceError::InvalidReplacement {
        stmt,
        replacement,
        reason,
    })
}

/// Whether `replacement` reads anything erased together with `stmt`.
fn reads_discarded_body(ctx: &IrContext, stmt: StmtRef, replacement: StmtRef) -> bool {
    if !ctx.kind(stmt).is_container() {
        return false;
    }
    let doomed = ctx.owned_subtree(stmt);
    ctx.stmt_operands(replacement)
        .iter()
        .any(|operand| doomed.contains(operand))
}
