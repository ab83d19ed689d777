//! Statement rewriting for a compute-kernel IR.
//!
//! The IR and the replacement engine live in [`sluice_ir`]; the GPU backend
//! boundary lives in [`sluice_gpu`]. This crate strings rewrite passes into a
//! pipeline with per-pass diagnostics.

pub mod pipeline;

pub use pipeline::{
    PassError, PassErrorKind, PassManager, PassReport, PipelineConfig, PipelineReport,
    RewritePass,
};
pub use sluice_gpu as gpu;
pub use sluice_ir as ir;
