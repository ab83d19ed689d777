//! Process-wide GPU context.

use cranelift_entity::{PrimaryMap, entity_impl};
use tracing::{debug, trace, warn};

use crate::driver::{DeviceDriver, LaunchDims};
use crate::error::GpuError;

/// A module loaded through a [`GpuContext`].
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModuleHandle(u32);
entity_impl!(ModuleHandle, "module");

/// A kernel entry point resolved from a loaded module.
#[derive(Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FunctionHandle(u32);
entity_impl!(FunctionHandle, "func");

struct FunctionEntry<F> {
    module: ModuleHandle,
    name: String,
    raw: F,
}

/// Owns a device driver and every module loaded through it.
///
/// Modules stay loaded for the lifetime of the context unless released with
/// [`unload`](Self::unload); whatever is left is unloaded on drop.
pub struct GpuContext<D: DeviceDriver> {
    driver: D,
    /// `None` once unloaded. Slots are never reused.
    modules: PrimaryMap<ModuleHandle, Option<D::Module>>,
    functions: PrimaryMap<FunctionHandle, FunctionEntry<D::Function>>,
}

impl<D: DeviceDriver> GpuContext<D> {
    pub fn new(driver: D) -> Self {
        Self {
            driver,
            modules: PrimaryMap::new(),
            functions: PrimaryMap::new(),
        }
    }

    pub fn driver(&self) -> &D {
        &self.driver
    }

    /// Compile device assembly and keep the module loaded.
    pub fn compile(&mut self, assembly: &str) -> Result<ModuleHandle, GpuError> {
        let raw = self
            .driver
            .load_module(assembly)
            .map_err(|e| GpuError::Compile { source: e.into() })?;
        let module = self.modules.push(Some(raw));
        debug!(%module, bytes = assembly.len(), "loaded device module");
        Ok(module)
    }

    /// Resolve `name` in `module` to a launchable function.
    pub fn get_function(
        &mut self,
        module: ModuleHandle,
        name: &str,
    ) -> Result<FunctionHandle, GpuError> {
        let raw_module = self
            .modules
            .get(module)
            .and_then(Option::as_ref)
            .ok_or(GpuError::UnknownModule(module))?;
        let raw = self
            .driver
            .get_function(raw_module, name)
            .map_err(|e| GpuError::MissingFunction {
                module,
                name: name.to_owned(),
                source: e.into(),
            })?;
        let func = self.functions.push(FunctionEntry {
            module,
            name: name.to_owned(),
            raw,
        });
        trace!(%module, %func, name, "resolved entry point");
        Ok(func)
    }

    /// Launch a resolved function. Returns once the launch is enqueued.
    ///
    /// # Safety
    ///
    /// `args` must point to the flattened argument buffer the kernel expects
    /// and stay valid until the kernel has consumed it.
    pub unsafe fn launch(
        &mut self,
        func: FunctionHandle,
        args: *mut u8,
        dims: LaunchDims,
    ) -> Result<(), GpuError> {
        let entry = self
            .functions
            .get(func)
            .ok_or(GpuError::UnknownFunction(func))?;
        if !self.is_loaded(entry.module) {
            return Err(GpuError::UnknownModule(entry.module));
        }
        trace!(
            name = %entry.name,
            grid_dim = dims.grid_dim,
            block_dim = dims.block_dim,
            "launching kernel"
        );
        unsafe { self.driver.launch(&entry.raw, args, dims) }.map_err(|e| GpuError::Launch {
            name: entry.name.clone(),
            source: e.into(),
        })
    }

    /// Unload a module early. Functions resolved from it can no longer be
    /// launched.
    pub fn unload(&mut self, module: ModuleHandle) -> Result<(), GpuError> {
        let raw = self
            .modules
            .get_mut(module)
            .and_then(Option::take)
            .ok_or(GpuError::UnknownModule(module))?;
        self.driver
            .unload_module(raw)
            .map_err(|e| GpuError::Unload {
                module,
                source: e.into(),
            })?;
        debug!(%module, "unloaded device module");
        Ok(())
    }

    pub fn is_loaded(&self, module: ModuleHandle) -> bool {
        matches!(self.modules.get(module), Some(Some(_)))
    }

    /// Number of modules currently loaded.
    pub fn loaded_modules(&self) -> usize {
        self.modules.values().filter(|m| m.is_some()).count()
    }
}

impl<D: DeviceDriver> Drop for GpuContext<D> {
    fn drop(&mut self) {
        let remaining: Vec<_> = self
            .modules
            .iter_mut()
            .rev()
            .filter_map(|(handle, slot)| slot.take().map(|raw| (handle, raw)))
            .collect();
        for (module, raw) in remaining {
            if let Err(err) = self.driver.unload_module(raw) {
                warn!(%module, %err, "failed to unload device module at teardown");
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::RefCell;
    use std::rc::Rc;

    #[derive(Debug, derive_more::Display)]
    #[display("mock driver: {_0}")]
    struct MockError(String);

    impl std::error::Error for MockError {}

    /// Records every driver call; modules are numbered in load order.
    #[derive(Default, Clone)]
    struct MockDriver {
        log: Rc<RefCell<Vec<String>>>,
        next: u32,
    }

    impl DeviceDriver for MockDriver {
        type Module = u32;
        type Function = String;
        type Error = MockError;

        fn load_module(&mut self, assembly: &str) -> Result<u32, MockError> {
            if assembly.is_empty() {
                return Err(MockError("empty assembly".into()));
            }
            let id = self.next;
            self.next += 1;
            self.log.borrow_mut().push(format!("load {id}"));
            Ok(id)
        }

        fn get_function(&mut self, module: &u32, name: &str) -> Result<String, MockError> {
            if name.starts_with("kernel") {
                Ok(format!("{module}:{name}"))
            } else {
                Err(MockError(format!("no symbol {name}")))
            }
        }

        unsafe fn launch(
            &mut self,
            function: &String,
            _args: *mut u8,
            dims: LaunchDims,
        ) -> Result<(), MockError> {
            self.log.borrow_mut().push(format!(
                "launch {function} <<<{}, {}>>>",
                dims.grid_dim, dims.block_dim
            ));
            Ok(())
        }

        fn unload_module(&mut self, module: u32) -> Result<(), MockError> {
            self.log.borrow_mut().push(format!("unload {module}"));
            Ok(())
        }
    }

    #[test]
    fn compile_resolve_launch() {
        let driver = MockDriver::default();
        let log = driver.log.clone();
        let mut gpu = GpuContext::new(driver);

        let module = gpu.compile(".entry kernel_0").unwrap();
        let func = gpu.get_function(module, "kernel_0").unwrap();
        let mut args = [0u8; 16];
        unsafe { gpu.launch(func, args.as_mut_ptr(), LaunchDims::new(4, 128)) }.unwrap();

        assert_eq!(
            *log.borrow(),
            vec!["load 0".to_owned(), "launch 0:kernel_0 <<<4, 128>>>".to_owned()]
        );
    }

    #[test]
    fn drop_unloads_remaining_modules() {
        let driver = MockDriver::default();
        let log = driver.log.clone();
        {
            let mut gpu = GpuContext::new(driver);
            let a = gpu.compile("a").unwrap();
            gpu.compile("b").unwrap();
            gpu.compile("c").unwrap();
            gpu.unload(a).unwrap();
            assert_eq!(gpu.loaded_modules(), 2);
        }
        assert_eq!(
            *log.borrow(),
            vec!["load 0", "load 1", "load 2", "unload 0", "unload 2", "unload 1"]
        );
    }

    #[test]
    fn compile_error_carries_driver_message() {
        let mut gpu = GpuContext::new(MockDriver::default());
        let err = gpu.compile("").unwrap_err();
        assert!(matches!(err, GpuError::Compile { .. }));
        assert_eq!(
            err.to_string(),
            "failed to compile device module: mock driver: empty assembly"
        );
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn missing_entry_point() {
        let mut gpu = GpuContext::new(MockDriver::default());
        let module = gpu.compile("x").unwrap();
        let err = gpu.get_function(module, "main").unwrap_err();
        assert_eq!(
            err.to_string(),
            "entry point `main` not found in module0: mock driver: no symbol main"
        );
    }

    #[test]
    fn unloaded_module_rejects_launch() {
        let mut gpu = GpuContext::new(MockDriver::default());
        let module = gpu.compile("x").unwrap();
        let func = gpu.get_function(module, "kernel").unwrap();
        gpu.unload(module).unwrap();

        assert!(!gpu.is_loaded(module));
        let err = unsafe { gpu.launch(func, std::ptr::null_mut(), LaunchDims::new(1, 1)) }
            .unwrap_err();
        assert!(matches!(err, GpuError::UnknownModule(m) if m == module));
        assert!(matches!(
            gpu.get_function(module, "kernel"),
            Err(GpuError::UnknownModule(_))
        ));
        assert!(matches!(gpu.unload(module), Err(GpuError::UnknownModule(_))));
    }
}
