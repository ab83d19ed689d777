//! GPU execution backend boundary.
//!
//! The vendor driver sits behind [`DeviceDriver`]. [`GpuContext`] is the
//! single per-process owner of the driver and of every module loaded through
//! it; callers hold only [`ModuleHandle`] and [`FunctionHandle`] values.

pub mod context;
pub mod driver;
pub mod error;

pub use context::{FunctionHandle, GpuContext, ModuleHandle};
pub use driver::{DeviceDriver, LaunchDims};
pub use error::{BoxError, GpuError};
