//! Pass pipeline tests: multi-pass runs, diagnostics, and log output.

mod common;

use std::cell::Cell;
use std::rc::Rc;

use common::{LogBuffer, assert_valid, init_tracing};
use sluice::ir::printer::print_block;
use sluice::ir::{
    BinaryOp, BlockRef, BoxError, ConstValue, DataType, IrBuilder, IrContext, StmtKind, StmtRef,
};
use sluice::{PassErrorKind, PassManager, PipelineConfig, RewritePass};

/// Folds `add`/`mul` of two integer constants.
fn const_fold_pass() -> RewritePass {
    let folded = Rc::new(Cell::new(None));
    let found = folded.clone();
    RewritePass::new(
        "const-fold",
        move |ctx: &IrContext, s: StmtRef| {
            let StmtKind::Binary { op, lhs, rhs } = *ctx.kind(s) else {
                return false;
            };
            let (StmtKind::Const(ConstValue::Int(a)), StmtKind::Const(ConstValue::Int(b))) =
                (ctx.kind(lhs), ctx.kind(rhs))
            else {
                return false;
            };
            let value = match op {
                BinaryOp::Add => a.wrapping_add(*b),
                BinaryOp::Mul => a.wrapping_mul(*b),
                _ => return false,
            };
            found.set(Some(value));
            true
        },
        move |ctx: &mut IrContext| -> Result<StmtRef, BoxError> {
            let value = folded.take().ok_or("fold value missing")?;
            Ok(ctx.create_stmt(StmtKind::Const(ConstValue::Int(value)), DataType::I32))
        },
    )
}

/// `print((2 + 3) * 4)`
fn build_arith(ctx: &mut IrContext) -> BlockRef {
    let mut b = IrBuilder::root(ctx);
    let two = b.const_i32(2);
    let three = b.const_i32(3);
    let sum = b.binary(BinaryOp::Add, two, three);
    let four = b.const_i32(4);
    let product = b.binary(BinaryOp::Mul, sum, four);
    b.print(product);
    b.block()
}

#[test]
fn test_const_fold_reaches_fixed_point() {
    init_tracing();
    let mut ctx = IrContext::new();
    let root = build_arith(&mut ctx);

    let mut pm = PassManager::with_config(PipelineConfig::default().with_verify_each(true));
    pm.add_pass(const_fold_pass());
    let report = pm.run(&mut ctx, root).unwrap();

    let fold = report.get("const-fold").unwrap();
    assert_eq!(fold.replacements, 2);
    assert_eq!(fold.traversals, 3);
    insta::assert_snapshot!(print_block(&ctx, root), @r"
    %0 = const 2 : i32
    %1 = const 3 : i32
    %2 = const 5 : i32
    %3 = const 4 : i32
    %4 = const 20 : i32
    %5 = print %4
    ");
    assert_valid(&ctx, root);
}

#[test]
fn test_later_pass_sees_earlier_rewrites() {
    let mut ctx = IrContext::new();
    let root = build_arith(&mut ctx);

    let mut pm = PassManager::new();
    pm.add_pass(const_fold_pass()).add_pass(RewritePass::new(
        "drop-print",
        |ctx: &IrContext, s: StmtRef| matches!(ctx.kind(s), StmtKind::Print { .. }),
        |ctx: &mut IrContext| Ok::<_, BoxError>(ctx.create_stmt(StmtKind::Alloca, DataType::I32)),
    ));

    let report = pm.run(&mut ctx, root).unwrap();
    assert_eq!(report.total_replacements(), 3);
    assert_eq!(report.passes.len(), 2);
    let last = *ctx.block_stmts(root).last().unwrap();
    assert_eq!(ctx.kind(last), &StmtKind::Alloca);
    assert_valid(&ctx, root);
}

#[test]
fn test_broken_ownership_is_reported_after_pass() {
    let mut ctx = IrContext::new();
    let mut b = IrBuilder::root(&mut ctx);
    let root = b.block();
    let lp = b.while_(|b, _| {
        b.const_i32(0);
    });
    b.const_i32(1);
    let body = ctx.kind(lp).child_blocks()[0];

    let mut pm = PassManager::with_config(PipelineConfig::default().with_verify_each(true));
    pm.add_pass(RewritePass::new(
        "steal-body",
        |ctx: &IrContext, s: StmtRef| ctx.kind(s) == &StmtKind::Const(ConstValue::Int(1)),
        move |ctx: &mut IrContext| {
            // Released but never handed to a new owner.
            ctx.detach_block(body);
            Ok::<_, BoxError>(ctx.create_stmt(StmtKind::Const(ConstValue::Int(2)), DataType::I32))
        },
    ));

    let err = pm.run(&mut ctx, root).unwrap_err();
    assert_eq!(err.pass, "steal-body");
    assert_eq!(err.stmt(), None);
    let PassErrorKind::Validation { report } = &err.kind else {
        panic!("expected a validation failure, got {err}");
    };
    assert!(report.contains("but its owner is None"), "{report}");
}

#[test]
fn test_engine_events_are_logged_under_pass_span() {
    let logs = LogBuffer::default();
    let writer = logs.clone();
    let subscriber = tracing_subscriber::fmt()
        .with_writer(move || writer.clone())
        .with_max_level(tracing::Level::TRACE)
        .with_ansi(false)
        .finish();

    let mut ctx = IrContext::new();
    let root = build_arith(&mut ctx);
    let mut pm = PassManager::new();
    pm.add_pass(const_fold_pass());

    tracing::subscriber::with_default(subscriber, || pm.run(&mut ctx, root)).unwrap();

    let output = logs.contents();
    assert!(output.contains("pass{name=const-fold}"), "{output}");
    assert!(output.contains("statement matched"), "{output}");
    assert!(output.contains("reached fixed point"), "{output}");
    assert!(output.contains("pass finished"), "{output}");
}
