//! The root configuration type.

use serde::{Deserialize, Serialize};
use warden_telemetry::LogConfig;

use crate::error::{ConfigError, ConfigResult};
use crate::schema::{
    ExecutionMode, ExecutionSettings, LogFormatSetting, LogSettings, PluginSettings, RouteSettings,
};
use crate::scope::ScopeTree;

/// Complete Warden configuration.
///
/// Every section is optional in a file; missing sections and fields take
/// their defaults. Unknown fields are rejected.
///
/// # Example
///
/// ```
/// use warden_config::WardenConfig;
///
/// let config = WardenConfig::default();
/// assert_eq!(config.plugin.module_name, "wardenengine.so");
/// assert!(!config.plugin.preload);
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct WardenConfig {
    /// Engine module resolution.
    pub plugin: PluginSettings,

    /// Evaluation scheduling.
    pub execution: ExecutionSettings,

    /// Logging.
    pub logging: LogSettings,

    /// Rule sets per URI prefix.
    pub routes: RouteSettings,
}

impl WardenConfig {
    /// A preset for local development: pretty debug logs with locations.
    pub fn development() -> Self {
        Self {
            logging: LogSettings {
                level: "debug".to_string(),
                format: LogFormatSetting::Pretty,
                file_line_info: true,
                thread_ids: true,
                ..LogSettings::default()
            },
            ..Self::default()
        }
    }

    /// Checks values that parse but cannot work.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::InvalidValue` naming the first offending field.
    pub fn validate(&self) -> ConfigResult<()> {
        if self.plugin.module_name.trim().is_empty() {
            return Err(ConfigError::invalid_value(
                "plugin.module_name",
                "must not be empty",
            ));
        }
        if self.plugin.symbol.trim().is_empty() {
            return Err(ConfigError::invalid_value("plugin.symbol", "must not be empty"));
        }
        if self.execution.strategy == ExecutionMode::Pool && self.execution.max_concurrent == 0 {
            return Err(ConfigError::invalid_value(
                "execution.max_concurrent",
                "must be at least 1 when strategy is 'pool'",
            ));
        }
        self.log_config()
            .env_filter()
            .map_err(|e| ConfigError::invalid_value("logging.level", e.to_string()))?;
        ScopeTree::from_settings(&self.routes)?;
        Ok(())
    }

    /// Logging configuration for `warden_telemetry::init_logging`.
    pub fn log_config(&self) -> LogConfig {
        self.logging.to_log_config()
    }

    /// The route scope tree.
    ///
    /// # Errors
    ///
    /// Fails for the same location prefixes [`validate`](Self::validate)
    /// rejects.
    pub fn scope_tree(&self) -> ConfigResult<ScopeTree> {
        ScopeTree::from_settings(&self.routes)
    }
}
