//! Module resolution and the process-wide plugin handle.

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, OnceLock};

use parking_lot::Mutex;
use tracing::{debug, error, info, instrument};
use warden_telemetry::metrics::record_plugin_load;

use crate::config::PluginConfig;
use crate::dylib::DylibLoader;
use crate::engine::EvalEngine;
use crate::error::{PluginError, PluginResult};

/// Mechanism that turns a module path and symbol name into an engine.
///
/// The production implementation is [`DylibLoader`]; tests substitute
/// their own to simulate missing or late-arriving modules.
pub trait ModuleLoader: Send + Sync + fmt::Debug {
    /// Loads the module at `path` and resolves `symbol` in it.
    fn load(&self, path: &Path, symbol: &str) -> PluginResult<Arc<dyn EvalEngine>>;
}

/// Applies the module resolution policy.
///
/// The module is looked up under its filename in the working directory
/// first. If no such file exists the bare filename is handed to the loader,
/// which then searches the platform's standard library path.
#[derive(Debug, Clone)]
pub struct PluginLoader {
    config: PluginConfig,
    modules: Arc<dyn ModuleLoader>,
}

impl PluginLoader {
    /// Creates a loader that opens real shared objects.
    pub fn new(config: PluginConfig) -> Self {
        Self::with_module_loader(config, Arc::new(DylibLoader::new()))
    }

    /// Creates a loader with a custom loading mechanism.
    pub fn with_module_loader(config: PluginConfig, modules: Arc<dyn ModuleLoader>) -> Self {
        Self { config, modules }
    }

    /// Returns the loader configuration.
    pub fn config(&self) -> &PluginConfig {
        &self.config
    }

    /// Returns the path the next load attempt will use.
    pub fn candidate_path(&self) -> PathBuf {
        let local = self.config.local_dir().join(&self.config.module_name);
        if local.is_file() {
            local
        } else {
            PathBuf::from(&self.config.module_name)
        }
    }

    /// Loads the module and resolves the entry point.
    pub fn load(&self) -> PluginResult<Arc<dyn EvalEngine>> {
        let path = self.candidate_path();
        debug!(path = %path.display(), "resolving engine module");
        self.modules.load(&path, &self.config.symbol)
    }
}

/// Process-wide handle to the evaluation engine.
///
/// The handle starts unresolved. The first successful [`resolve`](Self::resolve)
/// caches the engine for the remaining lifetime of the handle; it is never
/// reloaded or cleared. A failed attempt caches nothing, so a module that
/// appears later is picked up by the next request.
///
/// Concurrent first calls are serialized: exactly one caller loads the
/// module and the others observe its result.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use warden_plugin::{FnEngine, PluginHandle};
///
/// let handle = PluginHandle::preloaded(Arc::new(FnEngine::new("allow", |_, _, _| true)));
/// assert!(handle.is_resolved());
/// assert!(handle.resolve().is_ok());
/// ```
pub struct PluginHandle {
    loader: Option<PluginLoader>,
    engine: OnceLock<Arc<dyn EvalEngine>>,
    load_lock: Mutex<()>,
    load_attempts: AtomicU64,
}

impl PluginHandle {
    /// Creates an unresolved handle.
    pub fn new(loader: PluginLoader) -> Self {
        Self {
            loader: Some(loader),
            engine: OnceLock::new(),
            load_lock: Mutex::new(()),
            load_attempts: AtomicU64::new(0),
        }
    }

    /// Creates a handle that is already resolved to `engine`.
    pub fn preloaded(engine: Arc<dyn EvalEngine>) -> Self {
        let handle = Self {
            loader: None,
            engine: OnceLock::new(),
            load_lock: Mutex::new(()),
            load_attempts: AtomicU64::new(0),
        };
        let _ = handle.engine.set(engine);
        handle
    }

    /// Returns the engine, loading it first if necessary.
    #[instrument(skip(self), level = "debug")]
    pub fn resolve(&self) -> PluginResult<Arc<dyn EvalEngine>> {
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }

        let _guard = self.load_lock.lock();
        if let Some(engine) = self.engine.get() {
            return Ok(Arc::clone(engine));
        }

        let Some(loader) = &self.loader else {
            return Err(PluginError::Execution("no module loader configured".to_string()));
        };

        self.load_attempts.fetch_add(1, Ordering::Relaxed);
        match loader.load() {
            Ok(engine) => {
                info!(engine = engine.name(), "evaluation engine loaded");
                record_plugin_load(true);
                Ok(Arc::clone(self.engine.get_or_init(|| engine)))
            }
            Err(e) => {
                error!(error = %e, "failed to load evaluation engine");
                record_plugin_load(false);
                Err(e)
            }
        }
    }

    /// Returns true once an engine has been resolved.
    pub fn is_resolved(&self) -> bool {
        self.engine.get().is_some()
    }

    /// Returns how many times the module loader has been invoked.
    pub fn load_attempts(&self) -> u64 {
        self.load_attempts.load(Ordering::Relaxed)
    }
}

impl fmt::Debug for PluginHandle {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PluginHandle")
            .field("resolved", &self.is_resolved())
            .field("load_attempts", &self.load_attempts())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::engine::FnEngine;
    use std::sync::atomic::AtomicBool;

    /// Loader whose module "appears" when `available` is flipped.
    #[derive(Debug, Default)]
    struct SwitchLoader {
        available: AtomicBool,
        calls: AtomicU64,
        last_path: Mutex<Option<PathBuf>>,
    }

    impl ModuleLoader for SwitchLoader {
        fn load(&self, path: &Path, symbol: &str) -> PluginResult<Arc<dyn EvalEngine>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            *self.last_path.lock() = Some(path.to_path_buf());
            if self.available.load(Ordering::SeqCst) {
                Ok(Arc::new(FnEngine::new("switch", |_, _, _| true)))
            } else {
                Err(PluginError::module_load(path, format!("{symbol}: no such file")))
            }
        }
    }

    fn handle_with(loader: Arc<SwitchLoader>, dir: &Path) -> PluginHandle {
        let config = PluginConfig::default().with_working_dir(dir);
        PluginHandle::new(PluginLoader::with_module_loader(config, loader))
    }

    #[test]
    fn test_candidate_prefers_working_directory() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("wardenengine.so"), b"").unwrap();

        let config = PluginConfig::default().with_working_dir(dir.path());
        let loader = PluginLoader::with_module_loader(config, Arc::new(SwitchLoader::default()));
        assert_eq!(loader.candidate_path(), dir.path().join("wardenengine.so"));
    }

    #[test]
    fn test_candidate_falls_back_to_search_path() {
        let dir = tempfile::tempdir().unwrap();

        let config = PluginConfig::default().with_working_dir(dir.path());
        let loader = PluginLoader::with_module_loader(config, Arc::new(SwitchLoader::default()));
        assert_eq!(loader.candidate_path(), PathBuf::from("wardenengine.so"));
    }

    #[test]
    fn test_resolve_caches_success() {
        let dir = tempfile::tempdir().unwrap();
        let modules = Arc::new(SwitchLoader::default());
        modules.available.store(true, Ordering::SeqCst);
        let handle = handle_with(Arc::clone(&modules), dir.path());

        let first = handle.resolve().unwrap();
        let second = handle.resolve().unwrap();

        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(modules.calls.load(Ordering::SeqCst), 1);
        assert_eq!(handle.load_attempts(), 1);
    }

    #[test]
    fn test_failure_is_not_cached() {
        let dir = tempfile::tempdir().unwrap();
        let modules = Arc::new(SwitchLoader::default());
        let handle = handle_with(Arc::clone(&modules), dir.path());

        assert!(handle.resolve().is_err());
        assert!(handle.resolve().is_err());
        assert!(!handle.is_resolved());

        modules.available.store(true, Ordering::SeqCst);
        assert!(handle.resolve().is_ok());
        assert!(handle.is_resolved());
        assert_eq!(modules.calls.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn test_failure_uses_bare_name_when_no_local_file() {
        let dir = tempfile::tempdir().unwrap();
        let modules = Arc::new(SwitchLoader::default());
        let handle = handle_with(Arc::clone(&modules), dir.path());

        let _ = handle.resolve();
        assert_eq!(
            modules.last_path.lock().clone(),
            Some(PathBuf::from("wardenengine.so"))
        );
    }

    #[test]
    fn test_concurrent_cold_start_loads_once() {
        let dir = tempfile::tempdir().unwrap();
        let modules = Arc::new(SwitchLoader::default());
        modules.available.store(true, Ordering::SeqCst);
        let handle = Arc::new(handle_with(Arc::clone(&modules), dir.path()));

        let threads: Vec<_> = (0..8)
            .map(|_| {
                let handle = Arc::clone(&handle);
                std::thread::spawn(move || handle.resolve().is_ok())
            })
            .collect();

        for t in threads {
            assert!(t.join().unwrap());
        }
        assert_eq!(modules.calls.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn test_preloaded_never_loads() {
        let handle = PluginHandle::preloaded(Arc::new(FnEngine::new("static", |_, _, _| false)));
        assert!(handle.resolve().is_ok());
        assert_eq!(handle.load_attempts(), 0);
    }
}
