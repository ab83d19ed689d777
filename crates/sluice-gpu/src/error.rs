//! Error types for the GPU backend boundary.

use derive_more::Display;

use crate::context::{FunctionHandle, ModuleHandle};

pub type BoxError = Box<dyn std::error::Error + Send + Sync + 'static>;

#[derive(Display, Debug)]
pub enum GpuError {
    /// The driver rejected the device assembly.
    #[display("failed to compile device module: {source}")]
    Compile { source: BoxError },

    /// The module has no entry point with the requested name.
    #[display("entry point `{name}` not found in {module}: {source}")]
    MissingFunction {
        module: ModuleHandle,
        name: String,
        source: BoxError,
    },

    #[display("failed to launch `{name}`: {source}")]
    Launch { name: String, source: BoxError },

    #[display("failed to unload {module}: {source}")]
    Unload {
        module: ModuleHandle,
        source: BoxError,
    },

    /// The handle was never issued by this context or its module is gone.
    #[display("{_0} is not loaded")]
    UnknownModule(ModuleHandle),

    #[display("{_0} is not a resolved function")]
    UnknownFunction(FunctionHandle),
}

impl std::error::Error for GpuError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            GpuError::Compile { source }
            | GpuError::MissingFunction { source, .. }
            | GpuError::Launch { source, .. }
            | GpuError::Unload { source, .. } => Some(&**source),
            GpuError::UnknownModule(_) | GpuError::UnknownFunction(_) => None,
        }
    }
}
