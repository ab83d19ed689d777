//! Rewrite pass pipeline.
//!
//! A pipeline is an ordered list of [`RewritePass`]es, each a named
//! predicate/generator pair driven to a fixed point by the statement
//! replacement engine:
//!
//! ```text
//! IR tree
//!     │
//!     ▼
//! pass 1 ─► replace until fixed point ─► (validate)
//!     │
//!     ▼
//! pass 2 ─► ...
//!     │
//!     ▼
//! PipelineReport (per-pass counts)
//! ```
//!
//! ## Diagnostics
//!
//! A failing pass stops the pipeline. The resulting [`PassError`] names the
//! pass and carries the printed form of the statement being replaced, since
//! the statement handle alone is meaningless once the caller's context is
//! gone.

use derive_more::Display;
use tracing::{debug, info_span};

use sluice_ir::printer::print_stmt;
use sluice_ir::validation::validate_all;
use sluice_ir::{
    BoxError, IrContext, IrNode, ReplaceError, ReplaceResult, StatementReplacer, StmtRef,
};

// =============================================================================
// Passes
// =============================================================================

type Predicate = Box<dyn FnMut(&IrContext, StmtRef) -> bool>;
type Generator = Box<dyn FnMut(&mut IrContext) -> Result<StmtRef, BoxError>>;

/// A named single-statement rewrite rule.
pub struct RewritePass {
    name: String,
    predicate: Predicate,
    generator: Generator,
    max_restarts: Option<usize>,
}

impl RewritePass {
    pub fn new<P, G, E>(name: impl Into<String>, predicate: P, mut generator: G) -> Self
    where
        P: FnMut(&IrContext, StmtRef) -> bool + 'static,
        G: FnMut(&mut IrContext) -> Result<StmtRef, E> + 'static,
        E: Into<BoxError>,
    {
        Self {
            name: name.into(),
            predicate: Box::new(predicate),
            generator: Box::new(move |ctx| generator(ctx).map_err(Into::into)),
            max_restarts: None,
        }
    }

    /// Bound this pass's replacements, overriding the pipeline default.
    pub fn with_max_restarts(mut self, n: usize) -> Self {
        self.max_restarts = Some(n);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn max_restarts(&self) -> Option<usize> {
        self.max_restarts
    }

    /// Run this pass alone to a fixed point.
    pub fn run(
        &mut self,
        ctx: &mut IrContext,
        root: impl Into<IrNode>,
    ) -> Result<ReplaceResult, ReplaceError> {
        self.run_bounded(ctx, root.into(), self.max_restarts)
    }

    fn run_bounded(
        &mut self,
        ctx: &mut IrContext,
        root: IrNode,
        max_restarts: Option<usize>,
    ) -> Result<ReplaceResult, ReplaceError> {
        let mut replacer = StatementReplacer::new(&mut *self.predicate, &mut *self.generator);
        if let Some(n) = max_restarts {
            replacer = replacer.with_max_restarts(n);
        }
        replacer.run(ctx, root)
    }
}

// =============================================================================
// Pipeline
// =============================================================================

/// Pipeline-wide settings.
#[derive(Debug, Clone, Copy)]
pub struct PipelineConfig {
    /// Validate ownership and usages after every pass.
    pub verify_each: bool,
    /// Replacement bound for passes that don't set their own.
    pub max_restarts: Option<usize>,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            verify_each: cfg!(debug_assertions),
            max_restarts: None,
        }
    }
}

impl PipelineConfig {
    pub fn with_verify_each(mut self, verify_each: bool) -> Self {
        self.verify_each = verify_each;
        self
    }

    pub fn with_max_restarts(mut self, n: usize) -> Self {
        self.max_restarts = Some(n);
        self
    }
}

/// Outcome of a single pass within a pipeline run.
#[derive(Debug, Clone)]
pub struct PassReport {
    pub name: String,
    pub result: ReplaceResult,
}

#[derive(Debug, Clone, Default)]
pub struct PipelineReport {
    pub passes: Vec<PassReport>,
}

impl PipelineReport {
    pub fn total_replacements(&self) -> usize {
        self.passes.iter().map(|p| p.result.replacements).sum()
    }

    /// Result of the first pass named `name`.
    pub fn get(&self, name: &str) -> Option<&ReplaceResult> {
        self.passes
            .iter()
            .find(|p| p.name == name)
            .map(|p| &p.result)
    }
}

/// Runs rewrite passes in order over one tree.
#[derive(Default)]
pub struct PassManager {
    passes: Vec<RewritePass>,
    config: PipelineConfig,
}

impl PassManager {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: PipelineConfig) -> Self {
        Self {
            passes: Vec::new(),
            config,
        }
    }

    pub fn add_pass(&mut self, pass: RewritePass) -> &mut Self {
        self.passes.push(pass);
        self
    }

    pub fn config(&self) -> &PipelineConfig {
        &self.config
    }

    pub fn pass_names(&self) -> impl Iterator<Item = &str> {
        self.passes.iter().map(RewritePass::name)
    }

    /// Run every pass in order, stopping at the first failure.
    pub fn run(
        &mut self,
        ctx: &mut IrContext,
        root: impl Into<IrNode>,
    ) -> Result<PipelineReport, PassError> {
        let mut root = root.into();
        let mut report = PipelineReport::default();

        for pass in &mut self.passes {
            let _span = info_span!("pass", name = %pass.name).entered();

            let bound = pass.max_restarts.or(self.config.max_restarts);
            let result = pass
                .run_bounded(ctx, root, bound)
                .map_err(|err| PassError::replace(&pass.name, ctx, err))?;
            root = result.root;

            if self.config.verify_each {
                let validation = validate_all(ctx, root);
                if !validation.is_ok() {
                    return Err(PassError {
                        pass: pass.name.clone(),
                        kind: PassErrorKind::Validation {
                            report: validation.to_string(),
                        },
                    });
                }
            }

            debug!(
                replacements = result.replacements,
                traversals = result.traversals,
                "pass finished"
            );
            report.passes.push(PassReport {
                name: pass.name.clone(),
                result,
            });
        }

        Ok(report)
    }
}

// =============================================================================
// Errors
// =============================================================================

#[derive(Display, Debug)]
#[display("pass `{pass}` failed: {kind}")]
pub struct PassError {
    pub pass: String,
    pub kind: PassErrorKind,
}

#[derive(Display, Debug)]
pub enum PassErrorKind {
    /// The replacement engine failed on `stmt_text`.
    #[display("{source}\n  at: {stmt_text}")]
    Replace {
        source: ReplaceError,
        stmt_text: String,
    },

    /// The tree was malformed after the pass finished.
    #[display("IR validation failed:\n{report}")]
    Validation { report: String },
}

impl PassError {
    fn replace(pass: &str, ctx: &IrContext, source: ReplaceError) -> Self {
        let stmt_text = print_stmt(ctx, source.stmt()).trim_end().to_owned();
        PassError {
            pass: pass.to_owned(),
            kind: PassErrorKind::Replace { source, stmt_text },
        }
    }

    /// The statement the engine was replacing, if the pass failed there.
    pub fn stmt(&self) -> Option<StmtRef> {
        match &self.kind {
            PassErrorKind::Replace { source, .. } => Some(source.stmt()),
            PassErrorKind::Validation { .. } => None,
        }
    }
}

impl std::error::Error for PassError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match &self.kind {
            PassErrorKind::Replace { source, .. } => Some(source),
            PassErrorKind::Validation { .. } => None,
        }
    }
}
