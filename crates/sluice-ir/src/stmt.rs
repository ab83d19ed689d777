//! Statement kinds, scalar types and constants.
//!
//! `StmtKind` is a closed variant. Traversal and rewriting only ever ask a
//! kind three things: which statements it reads (`operands`), which blocks
//! it owns (`child_blocks`), and how to redirect one operand slot
//! (`operand_mut`). New kinds are added here, never in the walkers.

use std::fmt;

use smallvec::{SmallVec, smallvec};

use crate::refs::{BlockRef, StmtRef};

/// Scalar type produced by a statement.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum DataType {
    #[default]
    Void,
    I1,
    I32,
    I64,
    F32,
    F64,
}

impl DataType {
    pub fn is_float(self) -> bool {
        matches!(self, DataType::F32 | DataType::F64)
    }
}

impl fmt::Display for DataType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            DataType::Void => "void",
            DataType::I1 => "i1",
            DataType::I32 => "i32",
            DataType::I64 => "i64",
            DataType::F32 => "f32",
            DataType::F64 => "f64",
        })
    }
}

/// Constant payload. Floats are stored as raw `f64` bits so the kind
/// stays `Eq + Hash`.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum ConstValue {
    Bool(bool),
    Int(i64),
    FloatBits(u64),
}

impl ConstValue {
    pub fn float(value: f64) -> Self {
        ConstValue::FloatBits(value.to_bits())
    }
}

impl fmt::Display for ConstValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ConstValue::Bool(b) => write!(f, "{b}"),
            ConstValue::Int(n) => write!(f, "{n}"),
            ConstValue::FloatBits(bits) => write!(f, "{:?}", f64::from_bits(*bits)),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum UnaryOp {
    Neg,
    Not,
    Sqrt,
    Cast(DataType),
}

impl fmt::Display for UnaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            UnaryOp::Neg => f.write_str("neg"),
            UnaryOp::Not => f.write_str("not"),
            UnaryOp::Sqrt => f.write_str("sqrt"),
            UnaryOp::Cast(ty) => write!(f, "cast<{ty}>"),
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum BinaryOp {
    Add,
    Sub,
    Mul,
    Div,
    Mod,
    Max,
    Min,
    BitAnd,
    BitOr,
    CmpLt,
    CmpLe,
    CmpGt,
    CmpGe,
    CmpEq,
    CmpNe,
}

impl BinaryOp {
    pub fn is_comparison(self) -> bool {
        matches!(
            self,
            BinaryOp::CmpLt
                | BinaryOp::CmpLe
                | BinaryOp::CmpGt
                | BinaryOp::CmpGe
                | BinaryOp::CmpEq
                | BinaryOp::CmpNe
        )
    }
}

impl fmt::Display for BinaryOp {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            BinaryOp::Add => "add",
            BinaryOp::Sub => "sub",
            BinaryOp::Mul => "mul",
            BinaryOp::Div => "div",
            BinaryOp::Mod => "mod",
            BinaryOp::Max => "max",
            BinaryOp::Min => "min",
            BinaryOp::BitAnd => "bit_and",
            BinaryOp::BitOr => "bit_or",
            BinaryOp::CmpLt => "cmp_lt",
            BinaryOp::CmpLe => "cmp_le",
            BinaryOp::CmpGt => "cmp_gt",
            BinaryOp::CmpGe => "cmp_ge",
            BinaryOp::CmpEq => "cmp_eq",
            BinaryOp::CmpNe => "cmp_ne",
        })
    }
}

/// The closed set of statement kinds.
#[derive(Clone, Debug, PartialEq, Eq, Hash)]
pub enum StmtKind {
    Const(ConstValue),
    Unary {
        op: UnaryOp,
        operand: StmtRef,
    },
    Binary {
        op: BinaryOp,
        lhs: StmtRef,
        rhs: StmtRef,
    },
    /// Stack slot for a local variable.
    Alloca,
    LocalLoad {
        ptr: StmtRef,
    },
    LocalStore {
        ptr: StmtRef,
        value: StmtRef,
    },
    /// Address of an element of a global data structure node.
    GlobalPtr {
        snode: String,
        indices: SmallVec<[StmtRef; 4]>,
    },
    GlobalLoad {
        ptr: StmtRef,
    },
    GlobalStore {
        ptr: StmtRef,
        value: StmtRef,
    },
    /// Current induction value of an enclosing loop.
    LoopIndex {
        loop_stmt: StmtRef,
        index: u32,
    },
    /// Clears the active lanes of an enclosing `while` where `cond` is false.
    WhileControl {
        mask: StmtRef,
        cond: StmtRef,
    },
    Print {
        value: StmtRef,
    },

    // === Containers ===
    If {
        cond: StmtRef,
        then_body: BlockRef,
        else_body: Option<BlockRef>,
    },
    While {
        body: BlockRef,
    },
    RangeFor {
        begin: StmtRef,
        end: StmtRef,
        body: BlockRef,
    },
    StructFor {
        snode: String,
        body: BlockRef,
    },
}

impl StmtKind {
    /// Short mnemonic used by the printer and diagnostics.
    pub fn name(&self) -> &'static str {
        match self {
            StmtKind::Const(_) => "const",
            StmtKind::Unary { .. } => "unary",
            StmtKind::Binary { .. } => "binary",
            StmtKind::Alloca => "alloca",
            StmtKind::LocalLoad { .. } => "local_load",
            StmtKind::LocalStore { .. } => "local_store",
            StmtKind::GlobalPtr { .. } => "global_ptr",
            StmtKind::GlobalLoad { .. } => "global_load",
            StmtKind::GlobalStore { .. } => "global_store",
            StmtKind::LoopIndex { .. } => "loop_index",
            StmtKind::WhileControl { .. } => "while_control",
            StmtKind::Print { .. } => "print",
            StmtKind::If { .. } => "if",
            StmtKind::While { .. } => "while",
            StmtKind::RangeFor { .. } => "range_for",
            StmtKind::StructFor { .. } => "struct_for",
        }
    }

    /// Statements read by this one, in operand-index order.
    pub fn operands(&self) -> SmallVec<[StmtRef; 4]> {
        match self {
            StmtKind::Const(_)
            | StmtKind::Alloca
            | StmtKind::While { .. }
            | StmtKind::StructFor { .. } => SmallVec::new(),
            StmtKind::Unary { operand: x, .. }
            | StmtKind::LocalLoad { ptr: x }
            | StmtKind::GlobalLoad { ptr: x }
            | StmtKind::LoopIndex { loop_stmt: x, .. }
            | StmtKind::Print { value: x }
            | StmtKind::If { cond: x, .. } => smallvec![*x],
            StmtKind::Binary { lhs: a, rhs: b, .. }
            | StmtKind::LocalStore { ptr: a, value: b }
            | StmtKind::GlobalStore { ptr: a, value: b }
            | StmtKind::WhileControl { mask: a, cond: b }
            | StmtKind::RangeFor { begin: a, end: b, .. } => smallvec![*a, *b],
            StmtKind::GlobalPtr { indices, .. } => indices.clone(),
        }
    }

    /// Mutable access to the operand slot at `index`.
    pub fn operand_mut(&mut self, index: usize) -> Option<&mut StmtRef> {
        match self {
            StmtKind::Const(_)
            | StmtKind::Alloca
            | StmtKind::While { .. }
            | StmtKind::StructFor { .. } => None,
            StmtKind::Unary { operand: x, .. }
            | StmtKind::LocalLoad { ptr: x }
            | StmtKind::GlobalLoad { ptr: x }
            | StmtKind::LoopIndex { loop_stmt: x, .. }
            | StmtKind::Print { value: x }
            | StmtKind::If { cond: x, .. } => (index == 0).then_some(x),
            StmtKind::Binary { lhs: a, rhs: b, .. }
            | StmtKind::LocalStore { ptr: a, value: b }
            | StmtKind::GlobalStore { ptr: a, value: b }
            | StmtKind::WhileControl { mask: a, cond: b }
            | StmtKind::RangeFor { begin: a, end: b, .. } => match index {
                0 => Some(a),
                1 => Some(b),
                _ => None,
            },
            StmtKind::GlobalPtr { indices, .. } => indices.get_mut(index),
        }
    }

    /// Blocks owned by this statement, in traversal order
    /// (then-branch before else-branch).
    pub fn child_blocks(&self) -> SmallVec<[BlockRef; 2]> {
        match self {
            StmtKind::If {
                then_body,
                else_body,
                ..
            } => {
                let mut blocks = smallvec![*then_body];
                blocks.extend(*else_body);
                blocks
            }
            StmtKind::While { body }
            | StmtKind::RangeFor { body, .. }
            | StmtKind::StructFor { body, .. } => smallvec![*body],
            _ => SmallVec::new(),
        }
    }

    pub fn is_container(&self) -> bool {
        matches!(
            self,
            StmtKind::If { .. }
                | StmtKind::While { .. }
                | StmtKind::RangeFor { .. }
                | StmtKind::StructFor { .. }
        )
    }
}
