//! Vendor driver seam.

/// Grid and block dimensions of a one-dimensional launch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LaunchDims {
    pub grid_dim: u32,
    pub block_dim: u32,
}

impl LaunchDims {
    pub fn new(grid_dim: u32, block_dim: u32) -> Self {
        Self {
            grid_dim,
            block_dim,
        }
    }
}

/// Operations a device driver provides to [`GpuContext`](crate::GpuContext).
///
/// Implementations wrap raw driver objects; `Module` and `Function` are
/// whatever the driver uses to name a loaded module and a resolved kernel.
pub trait DeviceDriver {
    type Module;
    type Function;
    type Error: std::error::Error + Send + Sync + 'static;

    /// Compile textual device assembly into a loaded module.
    fn load_module(&mut self, assembly: &str) -> Result<Self::Module, Self::Error>;

    /// Resolve a named entry point in a loaded module.
    fn get_function(
        &mut self,
        module: &Self::Module,
        name: &str,
    ) -> Result<Self::Function, Self::Error>;

    /// Enqueue a kernel launch. Completion is not awaited.
    ///
    /// # Safety
    ///
    /// `args` must point to the flattened argument buffer the kernel expects
    /// and stay valid until the kernel has consumed it.
    unsafe fn launch(
        &mut self,
        function: &Self::Function,
        args: *mut u8,
        dims: LaunchDims,
    ) -> Result<(), Self::Error>;

    /// Release a module. Functions resolved from it become invalid.
    fn unload_module(&mut self, module: Self::Module) -> Result<(), Self::Error>;
}
