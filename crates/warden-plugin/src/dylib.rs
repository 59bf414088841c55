//! Engines backed by a dynamically loaded module.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use libloading::Library;
use tracing::debug;
use warden_core::{FileReadFn, InspectedRequest};

use crate::abi::{self, EvalRequestFn, RawRequest, WardenStr};
use crate::engine::EvalEngine;
use crate::error::{PluginError, PluginResult};
use crate::loader::ModuleLoader;

/// An engine whose entry point follows the C ABI in [`crate::abi`].
pub struct DylibEngine {
    entry: EvalRequestFn,
    path: PathBuf,
    // Keeps the module mapped for as long as `entry` may be called.
    _library: Option<Library>,
}

impl DylibEngine {
    /// Wraps an entry point that is linked into the process.
    ///
    /// # Safety
    ///
    /// `entry` must honor the contract documented in [`crate::abi`].
    pub unsafe fn from_entry(entry: EvalRequestFn) -> Self {
        Self {
            entry,
            path: PathBuf::from("<static>"),
            _library: None,
        }
    }

    /// Returns the path the module was loaded from.
    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl fmt::Debug for DylibEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DylibEngine")
            .field("path", &self.path)
            .finish_non_exhaustive()
    }
}

impl EvalEngine for DylibEngine {
    fn name(&self) -> &str {
        self.path.to_str().unwrap_or("dylib")
    }

    fn evaluate(
        &self,
        request_id: &str,
        rules: &str,
        request: &dyn InspectedRequest,
        read_file: FileReadFn,
    ) -> bool {
        let mut raw = RawRequest::new(request, read_file);
        let view = raw.as_raw();

        // `raw` and `view` outlive the call; the module must not retain them.
        unsafe {
            (self.entry)(
                WardenStr::new(request_id),
                WardenStr::new(rules),
                &view,
                abi::read_body,
            )
        }
    }
}

/// [`ModuleLoader`] that opens shared objects with the platform loader.
#[derive(Debug, Clone, Copy, Default)]
pub struct DylibLoader;

impl DylibLoader {
    /// Creates a new loader.
    pub const fn new() -> Self {
        Self
    }
}

#[cfg(unix)]
fn open(path: &Path) -> Result<Library, libloading::Error> {
    use libloading::os::unix::{Library as UnixLibrary, RTLD_LOCAL, RTLD_NOW};

    // Resolve every symbol up front so a broken module fails here and not
    // in the middle of a request.
    unsafe { UnixLibrary::open(Some(path), RTLD_NOW | RTLD_LOCAL) }.map(Library::from)
}

#[cfg(not(unix))]
fn open(path: &Path) -> Result<Library, libloading::Error> {
    unsafe { Library::new(path) }
}

impl ModuleLoader for DylibLoader {
    fn load(&self, path: &Path, symbol: &str) -> PluginResult<Arc<dyn EvalEngine>> {
        debug!(path = %path.display(), symbol, "opening engine module");

        let library = open(path).map_err(|e| PluginError::module_load(path, e.to_string()))?;

        let entry = unsafe { library.get::<EvalRequestFn>(symbol.as_bytes()) }
            .map(|sym| *sym)
            .map_err(|e| PluginError::symbol_resolve(path, symbol, e.to_string()))?;

        Ok(Arc::new(DylibEngine {
            entry,
            path: path.to_path_buf(),
            _library: Some(library),
        }))
    }
}
