//! Configuration for plugin resolution.

use std::path::{Path, PathBuf};

/// Default module filename.
pub const DEFAULT_MODULE_NAME: &str = "wardenengine.so";

/// Default entry point symbol.
pub const DEFAULT_SYMBOL: &str = "WardenEvalRequest";

/// Configuration for the plugin loader.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PluginConfig {
    /// Filename of the module, looked up in the working directory first and
    /// then on the platform search path.
    pub module_name: String,
    /// Name of the exported entry point.
    pub symbol: String,
    /// Directory searched before the platform search path.
    ///
    /// `None` means the process working directory at load time.
    pub working_dir: Option<PathBuf>,
}

impl Default for PluginConfig {
    fn default() -> Self {
        Self {
            module_name: DEFAULT_MODULE_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            working_dir: None,
        }
    }
}

impl PluginConfig {
    /// Create a new configuration with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the module filename.
    pub fn with_module_name(mut self, name: impl Into<String>) -> Self {
        self.module_name = name.into();
        self
    }

    /// Set the entry point symbol.
    pub fn with_symbol(mut self, symbol: impl Into<String>) -> Self {
        self.symbol = symbol.into();
        self
    }

    /// Set the directory searched before the platform search path.
    pub fn with_working_dir(mut self, dir: impl AsRef<Path>) -> Self {
        self.working_dir = Some(dir.as_ref().to_path_buf());
        self
    }

    /// Returns the directory searched first.
    pub fn local_dir(&self) -> PathBuf {
        self.working_dir
            .clone()
            .or_else(|| std::env::current_dir().ok())
            .unwrap_or_else(|| PathBuf::from("."))
    }
}
