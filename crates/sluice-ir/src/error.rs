//! Error types for IR rewriting.

use derive_more::Display;

use crate::refs::StmtRef;

/// Error type accepted from caller-supplied generators.
pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Display, Debug)]
pub enum ReplaceError {
    /// The generator could not synthesize a replacement.
    #[display("generator failed while replacing {stmt}: {source}")]
    Generator { stmt: StmtRef, source: BoxError },

    /// A configured restart bound was exhausted with matches remaining.
    #[display("no fixed point after {limit} replacement(s): {stmt} still matches")]
    NonConvergent { limit: usize, stmt: StmtRef },

    /// The generator returned a statement that cannot take the matched
    /// statement's place.
    #[display("invalid replacement {replacement} for {stmt}: {reason}")]
    InvalidReplacement {
        stmt: StmtRef,
        replacement: StmtRef,
        reason: &'static str,
    },
}

impl ReplaceError {
    /// The matched statement the engine was working on when it failed.
    pub fn stmt(&self) -> StmtRef {
        match self {
            ReplaceError::Generator { stmt, .. }
            | ReplaceError::NonConvergent { stmt, .. }
            | ReplaceError::InvalidReplacement { stmt, .. } => *stmt,
        }
    }
}

impl std::error::Error for ReplaceError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            ReplaceError::Generator { source, .. } => Some(&**source),
            _ => None,
        }
    }
}
