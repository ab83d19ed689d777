//! Block builder for constructing statements in place.
//!
//! Every helper creates the statement and appends it to the builder's
//! block. Container helpers create their body blocks first, attach the
//! container, then hand a nested builder to the closure filling the body,
//! so statements inside the body can refer to the container (loop indices).

use crate::context::IrContext;
use crate::refs::{BlockRef, StmtRef};
use crate::stmt::{BinaryOp, ConstValue, DataType, StmtKind, UnaryOp};

pub struct IrBuilder<'a> {
    ctx: &'a mut IrContext,
    block: BlockRef,
}

impl<'a> IrBuilder<'a> {
    pub fn new(ctx: &'a mut IrContext, block: BlockRef) -> Self {
        Self { ctx, block }
    }

    /// Start a fresh root block.
    pub fn root(ctx: &'a mut IrContext) -> Self {
        let block = ctx.create_block();
        Self { ctx, block }
    }

    pub fn block(&self) -> BlockRef {
        self.block
    }

    pub fn ctx(&mut self) -> &mut IrContext {
        &mut *self.ctx
    }

    /// Create a statement of the given kind and append it.
    pub fn push(&mut self, kind: StmtKind, ty: DataType) -> StmtRef {
        let stmt = self.ctx.create_stmt(kind, ty);
        self.ctx.push_stmt(self.block, stmt);
        stmt
    }

    // === Leaves ===

    pub fn const_i32(&mut self, value: i32) -> StmtRef {
        self.push(StmtKind::Const(ConstValue::Int(value.into())), DataType::I32)
    }

    pub fn const_f32(&mut self, value: f32) -> StmtRef {
        self.push(
            StmtKind::Const(ConstValue::float(value.into())),
            DataType::F32,
        )
    }

    pub fn const_bool(&mut self, value: bool) -> StmtRef {
        self.push(StmtKind::Const(ConstValue::Bool(value)), DataType::I1)
    }

    pub fn unary(&mut self, op: UnaryOp, operand: StmtRef) -> StmtRef {
        let ty = match op {
            UnaryOp::Cast(ty) => ty,
            UnaryOp::Not if self.ctx.stmt_ty(operand) == DataType::I1 => DataType::I1,
            _ => self.ctx.stmt_ty(operand),
        };
        self.push(StmtKind::Unary { op, operand }, ty)
    }

    pub fn binary(&mut self, op: BinaryOp, lhs: StmtRef, rhs: StmtRef) -> StmtRef {
        let ty = if op.is_comparison() {
            DataType::I1
        } else {
            self.ctx.stmt_ty(lhs)
        };
        self.push(StmtKind::Binary { op, lhs, rhs }, ty)
    }

    pub fn alloca(&mut self, ty: DataType) -> StmtRef {
        self.push(StmtKind::Alloca, ty)
    }

    pub fn local_load(&mut self, ptr: StmtRef) -> StmtRef {
        let ty = self.ctx.stmt_ty(ptr);
        self.push(StmtKind::LocalLoad { ptr }, ty)
    }

    pub fn local_store(&mut self, ptr: StmtRef, value: StmtRef) -> StmtRef {
        self.push(StmtKind::LocalStore { ptr, value }, DataType::Void)
    }

    pub fn global_ptr(
        &mut self,
        snode: impl Into<String>,
        indices: impl IntoIterator<Item = StmtRef>,
        ty: DataType,
    ) -> StmtRef {
        self.push(
            StmtKind::GlobalPtr {
                snode: snode.into(),
                indices: indices.into_iter().collect(),
            },
            ty,
        )
    }

    pub fn global_load(&mut self, ptr: StmtRef) -> StmtRef {
        let ty = self.ctx.stmt_ty(ptr);
        self.push(StmtKind::GlobalLoad { ptr }, ty)
    }

    pub fn global_store(&mut self, ptr: StmtRef, value: StmtRef) -> StmtRef {
        self.push(StmtKind::GlobalStore { ptr, value }, DataType::Void)
    }

    pub fn loop_index(&mut self, loop_stmt: StmtRef, index: u32) -> StmtRef {
        self.push(StmtKind::LoopIndex { loop_stmt, index }, DataType::I32)
    }

    pub fn while_control(&mut self, mask: StmtRef, cond: StmtRef) -> StmtRef {
        self.push(StmtKind::WhileControl { mask, cond }, DataType::Void)
    }

    pub fn print(&mut self, value: StmtRef) -> StmtRef {
        self.push(StmtKind::Print { value }, DataType::Void)
    }

    // === Containers ===

    pub fn if_(&mut self, cond: StmtRef, then_f: impl FnOnce(&mut IrBuilder<'_>)) -> StmtRef {
        let then_body = self.ctx.create_block();
        let stmt = self.push(
            StmtKind::If {
                cond,
                then_body,
                else_body: None,
            },
            DataType::Void,
        );
        then_f(&mut IrBuilder::new(&mut *self.ctx, then_body));
        stmt
    }

    pub fn if_else(
        &mut self,
        cond: StmtRef,
        then_f: impl FnOnce(&mut IrBuilder<'_>),
        else_f: impl FnOnce(&mut IrBuilder<'_>),
    ) -> StmtRef {
        let then_body = self.ctx.create_block();
        let else_body = self.ctx.create_block();
        let stmt = self.push(
            StmtKind::If {
                cond,
                then_body,
                else_body: Some(else_body),
            },
            DataType::Void,
        );
        then_f(&mut IrBuilder::new(&mut *self.ctx, then_body));
        else_f(&mut IrBuilder::new(&mut *self.ctx, else_body));
        stmt
    }

    pub fn while_(&mut self, body_f: impl FnOnce(&mut IrBuilder<'_>, StmtRef)) -> StmtRef {
        let body = self.ctx.create_block();
        let stmt = self.push(StmtKind::While { body }, DataType::Void);
        body_f(&mut IrBuilder::new(&mut *self.ctx, body), stmt);
        stmt
    }

    pub fn range_for(
        &mut self,
        begin: StmtRef,
        end: StmtRef,
        body_f: impl FnOnce(&mut IrBuilder<'_>, StmtRef),
    ) -> StmtRef {
        let body = self.ctx.create_block();
        let stmt = self.push(StmtKind::RangeFor { begin, end, body }, DataType::Void);
        body_f(&mut IrBuilder::new(&mut *self.ctx, body), stmt);
        stmt
    }

    pub fn struct_for(
        &mut self,
        snode: impl Into<String>,
        body_f: impl FnOnce(&mut IrBuilder<'_>, StmtRef),
    ) -> StmtRef {
        let body = self.ctx.create_block();
        let stmt = self.push(
            StmtKind::StructFor {
                snode: snode.into(),
                body,
            },
            DataType::Void,
        );
        body_f(&mut IrBuilder::new(&mut *self.ctx, body), stmt);
        stmt
    }
}
