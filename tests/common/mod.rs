//! Common test utilities for integration tests.

use std::io::Write;
use std::sync::{Arc, Mutex};

use sluice::ir::validation::validate_all;
use sluice::ir::{BinaryOp, BlockRef, DataType, IrBuilder, IrContext, IrNode};

/// Route engine logs to the test harness. Safe to call from every test.
#[allow(dead_code)]
pub fn init_tracing() {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_test_writer()
        .try_init();
}

/// In-memory log sink for asserting on emitted events.
#[derive(Clone, Default)]
#[allow(dead_code)]
pub struct LogBuffer(Arc<Mutex<Vec<u8>>>);

#[allow(dead_code)]
impl LogBuffer {
    pub fn contents(&self) -> String {
        let bytes = self.0.lock().expect("log buffer poisoned");
        String::from_utf8_lossy(&bytes).into_owned()
    }
}

impl Write for LogBuffer {
    fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
        self.0.lock().expect("log buffer poisoned").extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> std::io::Result<()> {
        Ok(())
    }
}

#[allow(dead_code)]
pub fn assert_valid(ctx: &IrContext, root: BlockRef) {
    let result = validate_all(ctx, IrNode::Block(root));
    assert!(result.is_ok(), "{result}");
}

/// ```text
/// i = 0; s = 0
/// while i < 10 { s += i; i += 1 }
/// x[0] = s
/// ```
#[allow(dead_code)]
pub fn build_sum_loop(ctx: &mut IrContext) -> BlockRef {
    let mut b = IrBuilder::root(ctx);
    let i = b.alloca(DataType::I32);
    let s = b.alloca(DataType::I32);
    let mask = b.alloca(DataType::I32);
    let zero = b.const_i32(0);
    b.local_store(i, zero);
    b.local_store(s, zero);
    b.while_(|b, _| {
        let iv = b.local_load(i);
        let ten = b.const_i32(10);
        let cond = b.binary(BinaryOp::CmpLt, iv, ten);
        b.while_control(mask, cond);
        let sv = b.local_load(s);
        let sum = b.binary(BinaryOp::Add, sv, iv);
        b.local_store(s, sum);
        let one = b.const_i32(1);
        let next = b.binary(BinaryOp::Add, iv, one);
        b.local_store(i, next);
    });
    let idx = b.const_i32(0);
    let ptr = b.global_ptr("x", [idx], DataType::I32);
    let total = b.local_load(s);
    b.global_store(ptr, total);
    b.block()
}
