//! Error types for the plugin crate.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for plugin operations.
pub type PluginResult<T> = Result<T, PluginError>;

/// Errors that can occur while resolving or invoking the evaluation engine.
#[derive(Debug, Clone, Error)]
#[non_exhaustive]
pub enum PluginError {
    /// The dynamic module could not be loaded.
    #[error("failed to load module {path}: {message}")]
    ModuleLoad {
        /// Path handed to the dynamic loader.
        path: PathBuf,
        /// Loader diagnostic.
        message: String,
    },

    /// The module was loaded but the entry point was not found.
    #[error("failed to resolve symbol {symbol} in {path}: {message}")]
    SymbolResolve {
        /// Path of the loaded module.
        path: PathBuf,
        /// Symbol name that was looked up.
        symbol: String,
        /// Loader diagnostic.
        message: String,
    },

    /// The evaluation could not be executed.
    #[error("evaluation failed: {0}")]
    Execution(String),
}

impl PluginError {
    /// Create a module load error.
    pub fn module_load(path: impl Into<PathBuf>, message: impl Into<String>) -> Self {
        Self::ModuleLoad {
            path: path.into(),
            message: message.into(),
        }
    }

    /// Create a symbol resolution error.
    pub fn symbol_resolve(
        path: impl Into<PathBuf>,
        symbol: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self::SymbolResolve {
            path: path.into(),
            symbol: symbol.into(),
            message: message.into(),
        }
    }

    /// Check if this error happened while resolving the engine.
    ///
    /// Resolution errors are retried on the next request.
    pub const fn is_resolution(&self) -> bool {
        matches!(self, Self::ModuleLoad { .. } | Self::SymbolResolve { .. })
    }
}
