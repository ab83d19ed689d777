//! In-place IR transformations.
//!
//! Transformations mutate `IrContext` directly and keep the usage index
//! current through RAUW, so callers never rebuild the tree.

pub mod statement_replace;

pub use statement_replace::{
    ReplaceConfig, ReplaceResult, StatementReplacer, replace_statements,
};
