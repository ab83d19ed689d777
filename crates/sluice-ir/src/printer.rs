//! Text format printer.
//!
//! Statements are numbered `%0, %1, ...` in visit order. Operands that have
//! not been numbered yet (erased, or outside the printed tree) print as `%?`.
//!
//! ```text
//! %0 = const 0 : i32
//! %1 = const 10 : i32
//! %2 = range_for %0, %1 {
//!   %3 = loop_index %2, 0 : i32
//!   %4 = print %3
//! }
//! ```

use std::collections::HashMap;
use std::fmt::{self, Write};

use crate::context::IrContext;
use crate::refs::{BlockRef, IrNode, StmtRef};
use crate::stmt::{DataType, StmtKind};

struct PrintState<'a> {
    ctx: &'a IrContext,
    names: HashMap<StmtRef, usize>,
    next: usize,
}

impl<'a> PrintState<'a> {
    fn new(ctx: &'a IrContext) -> Self {
        Self {
            ctx,
            names: HashMap::new(),
            next: 0,
        }
    }

    fn assign(&mut self, stmt: StmtRef) -> usize {
        let n = self.next;
        self.next += 1;
        self.names.insert(stmt, n);
        n
    }

    fn write_ref(&self, f: &mut impl Write, stmt: StmtRef) -> fmt::Result {
        match self.names.get(&stmt) {
            Some(n) if !self.ctx.is_erased(stmt) => write!(f, "%{n}"),
            _ => f.write_str("%?"),
        }
    }

    fn write_refs(&self, f: &mut impl Write, stmts: &[StmtRef]) -> fmt::Result {
        for (i, &s) in stmts.iter().enumerate() {
            if i > 0 {
                f.write_str(", ")?;
            }
            self.write_ref(f, s)?;
        }
        Ok(())
    }
}

// ============================================================================
// Public API
// ============================================================================

/// Print a block and everything nested in it.
pub fn print_block(ctx: &IrContext, block: BlockRef) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    write_block(&mut state, &mut out, block, 0).expect("fmt::Write to String never fails");
    out
}

/// Print a single statement (with its child blocks).
pub fn print_stmt(ctx: &IrContext, stmt: StmtRef) -> String {
    let mut state = PrintState::new(ctx);
    let mut out = String::new();
    write_stmt(&mut state, &mut out, stmt, 0).expect("fmt::Write to String never fails");
    out
}

pub fn print_node(ctx: &IrContext, node: IrNode) -> String {
    match node {
        IrNode::Block(block) => print_block(ctx, block),
        IrNode::Stmt(stmt) => print_stmt(ctx, stmt),
    }
}

// ============================================================================
// Statement printing
// ============================================================================

fn write_block(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    block: BlockRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    for &stmt in ctx.block_stmts(block) {
        write_stmt(state, f, stmt, indent)?;
    }
    Ok(())
}

fn write_stmt(
    state: &mut PrintState<'_>,
    f: &mut impl Write,
    stmt: StmtRef,
    indent: usize,
) -> fmt::Result {
    let ctx = state.ctx;
    let data = ctx.stmt(stmt);
    let n = state.assign(stmt);

    write!(f, "{:indent$}%{n} = ", "", indent = indent * 2)?;

    match &data.kind {
        StmtKind::Const(value) => write!(f, "const {value}")?,
        StmtKind::Unary { op, operand } => {
            write!(f, "{op} ")?;
            state.write_ref(f, *operand)?;
        }
        StmtKind::Binary { op, lhs, rhs } => {
            write!(f, "{op} ")?;
            state.write_refs(f, &[*lhs, *rhs])?;
        }
        StmtKind::GlobalPtr { snode, indices } => {
            write!(f, "global_ptr @{snode}[")?;
            state.write_refs(f, indices)?;
            f.write_char(']')?;
        }
        StmtKind::LoopIndex { loop_stmt, index } => {
            f.write_str("loop_index ")?;
            state.write_ref(f, *loop_stmt)?;
            write!(f, ", {index}")?;
        }
        StmtKind::StructFor { snode, .. } => write!(f, "struct_for @{snode}")?,
        kind => {
            f.write_str(kind.name())?;
            let operands = kind.operands();
            if !operands.is_empty() {
                f.write_char(' ')?;
                state.write_refs(f, &operands)?;
            }
        }
    }

    if data.ty != DataType::Void {
        write!(f, " : {}", data.ty)?;
    }

    let children = data.kind.child_blocks();
    if children.is_empty() {
        return f.write_char('\n');
    }

    f.write_str(" {\n")?;
    for (i, &block) in children.iter().enumerate() {
        if i > 0 {
            writeln!(f, "{:indent$}}} else {{", "", indent = indent * 2)?;
        }
        write_block(state, f, block, indent + 1)?;
    }
    writeln!(f, "{:indent$}}}", "", indent = indent * 2)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::IrBuilder;
    use crate::stmt::BinaryOp;

    #[test]
    fn prints_nested_containers() {
        let mut ctx = IrContext::new();
        let mut b = IrBuilder::root(&mut ctx);
        let root = b.block();
        let zero = b.const_i32(0);
        let ten = b.const_i32(10);
        b.range_for(zero, ten, |b, lp| {
            let i = b.loop_index(lp, 0);
            let five = b.const_i32(5);
            let lt = b.binary(BinaryOp::CmpLt, i, five);
            b.if_else(
                lt,
                |b| {
                    b.print(i);
                },
                |b| {
                    let p = b.global_ptr("x", [i], DataType::F32);
                    let v = b.const_f32(1.0);
                    b.global_store(p, v);
                },
            );
        });

        insta::assert_snapshot!(print_block(&ctx, root), @r"
        %0 = const 0 : i32
        %1 = const 10 : i32
        %2 = range_for %0, %1 {
          %3 = loop_index %2, 0 : i32
          %4 = const 5 : i32
          %5 = cmp_lt %3, %4 : i1
          %6 = if %5 {
            %7 = print %3
          } else {
            %8 = global_ptr @x[%3] : f32
            %9 = const 1.0 : f32
            %10 = global_store %8, %9
          }
        }
        ");
    }

    #[test]
    fn unnumbered_operand_prints_placeholder() {
        let mut ctx = IrContext::new();
        let mut b = IrBuilder::root(&mut ctx);
        let outside = b.const_i32(1);
        let lp = b.while_(|b, _| {
            b.print(outside);
        });

        insta::assert_snapshot!(print_stmt(&ctx, lp), @r"
        %0 = while {
          %1 = print %?
        }
        ");
    }
}
