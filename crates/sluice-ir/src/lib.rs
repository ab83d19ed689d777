//! Arena IR for compute kernels and the statement-replacement engine.
//!
//! Statements and blocks live in an [`IrContext`]; everything else refers to
//! them through `Copy` handles ([`StmtRef`], [`BlockRef`]). Ownership is
//! expressed with parent back-links, and every operand read is mirrored in a
//! usage index so a statement can be swapped out without leaving dangling
//! references behind.
//!
//! ```
//! use sluice_ir::{BoxError, IrBuilder, IrContext, StmtKind, ConstValue, DataType};
//! use sluice_ir::transforms::replace_statements;
//!
//! let mut ctx = IrContext::new();
//! let mut b = IrBuilder::root(&mut ctx);
//! let root = b.block();
//! let c = b.const_i32(1);
//! b.print(c);
//!
//! let result = replace_statements(
//!     &mut ctx,
//!     root,
//!     |ctx, s| ctx.kind(s) == &StmtKind::Const(ConstValue::Int(1)),
//!     |ctx| {
//!         let kind = StmtKind::Const(ConstValue::Int(2));
//!         Ok::<_, BoxError>(ctx.create_stmt(kind, DataType::I32))
//!     },
//! )
//! .unwrap();
//! assert_eq!(result.replacements, 1);
//! ```

pub mod builder;
pub mod context;
pub mod error;
pub mod printer;
pub mod refs;
pub mod stmt;
pub mod transforms;
pub mod validation;
pub mod walk;

pub use builder::IrBuilder;
pub use context::{BlockData, IrContext, StmtData, Use};
pub use error::{BoxError, ReplaceError};
pub use refs::{BlockRef, IrNode, StmtRef};
pub use stmt::{BinaryOp, ConstValue, DataType, StmtKind, UnaryOp};
pub use transforms::{ReplaceConfig, ReplaceResult, StatementReplacer, replace_statements};
pub use walk::WalkAction;
