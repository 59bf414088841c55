//! Configuration section types.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use warden_plugin::config::{DEFAULT_MODULE_NAME, DEFAULT_SYMBOL};
use warden_plugin::{ExecutionStrategy, InvokerConfig, PluginConfig};
use warden_telemetry::{LogConfig, LogFormat};

/// Where the evaluation engine comes from.
///
/// ```toml
/// [plugin]
/// module_name = "wardenengine.so"
/// symbol = "WardenEvalRequest"
/// working_dir = "/var/lib/warden"
/// preload = true
/// ```
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct PluginSettings {
    /// Module filename.
    pub module_name: String,

    /// Exported entry point.
    pub symbol: String,

    /// Directory searched before the platform search path.
    pub working_dir: Option<PathBuf>,

    /// Resolve the engine at startup instead of on the first inspected request.
    pub preload: bool,
}

impl Default for PluginSettings {
    fn default() -> Self {
        Self {
            module_name: DEFAULT_MODULE_NAME.to_string(),
            symbol: DEFAULT_SYMBOL.to_string(),
            working_dir: None,
            preload: false,
        }
    }
}

impl PluginSettings {
    /// Converts to the loader configuration.
    pub fn to_plugin_config(&self) -> PluginConfig {
        let config = PluginConfig::new()
            .with_module_name(&self.module_name)
            .with_symbol(&self.symbol);
        match &self.working_dir {
            Some(dir) => config.with_working_dir(dir),
            None => config,
        }
    }
}

/// How evaluations are scheduled.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum ExecutionMode {
    /// On the calling thread.
    #[default]
    Inline,
    /// On the blocking pool, bounded by `max_concurrent`.
    Pool,
}

/// Evaluation scheduling.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct ExecutionSettings {
    /// Execution mode.
    pub strategy: ExecutionMode,

    /// Evaluations in flight at once when `strategy = "pool"`.
    pub max_concurrent: usize,

    /// Evaluations slower than this many milliseconds are logged at warn.
    pub slow_eval_warn_ms: u64,
}

impl Default for ExecutionSettings {
    fn default() -> Self {
        Self {
            strategy: ExecutionMode::Inline,
            max_concurrent: 4,
            slow_eval_warn_ms: 100,
        }
    }
}

impl ExecutionSettings {
    /// Converts to the invoker configuration.
    pub fn to_invoker_config(&self) -> InvokerConfig {
        let strategy = match self.strategy {
            ExecutionMode::Inline => ExecutionStrategy::Inline,
            ExecutionMode::Pool => ExecutionStrategy::Pool {
                max_concurrent: self.max_concurrent,
            },
        };
        InvokerConfig::default()
            .with_strategy(strategy)
            .with_slow_eval_warn(Duration::from_millis(self.slow_eval_warn_ms))
    }
}

/// Log output format.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogFormatSetting {
    /// One JSON object per line.
    #[default]
    Json,
    /// Human-readable.
    Pretty,
}

/// Logging.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct LogSettings {
    /// Install a subscriber.
    pub enabled: bool,

    /// Filter directives.
    pub level: String,

    /// Output format.
    pub format: LogFormatSetting,

    /// Include file and line.
    pub file_line_info: bool,

    /// Include thread ids.
    pub thread_ids: bool,
}

impl Default for LogSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            level: "info".to_string(),
            format: LogFormatSetting::Json,
            file_line_info: false,
            thread_ids: false,
        }
    }
}

impl LogSettings {
    /// Converts to the telemetry configuration.
    pub fn to_log_config(&self) -> LogConfig {
        LogConfig {
            enabled: self.enabled,
            level: self.level.clone(),
            format: match self.format {
                LogFormatSetting::Json => LogFormat::Json,
                LogFormatSetting::Pretty => LogFormat::Pretty,
            },
            file_line_info: self.file_line_info,
            thread_ids: self.thread_ids,
        }
    }
}

/// Rule sets per URI prefix.
///
/// `rules` applies to the server as a whole. Each location inherits from the
/// longest other location whose prefix it extends, or from the server when
/// there is none. An explicit empty string disables inspection for that
/// location and everything below it that does not set its own value.
///
/// ```toml
/// [routes]
/// rules = "crs.conf"
///
/// [[routes.locations]]
/// prefix = "/static"
/// rules = ""
///
/// [[routes.locations]]
/// prefix = "/api"
/// ```
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(default, deny_unknown_fields)]
pub struct RouteSettings {
    /// Server-wide rule set. Unset means disabled.
    pub rules: Option<String>,

    /// Per-location overrides.
    pub locations: Vec<LocationSettings>,
}

/// One location block.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(deny_unknown_fields)]
pub struct LocationSettings {
    /// URI prefix, starting with `/`.
    pub prefix: String,

    /// Rule set. Unset inherits.
    #[serde(default)]
    pub rules: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_plugin_settings_conversion() {
        let settings = PluginSettings {
            module_name: "engine.so".to_string(),
            symbol: "Eval".to_string(),
            working_dir: Some(PathBuf::from("/opt/warden")),
            preload: true,
        };
        let config = settings.to_plugin_config();
        assert_eq!(config.module_name, "engine.so");
        assert_eq!(config.symbol, "Eval");
        assert_eq!(config.local_dir(), PathBuf::from("/opt/warden"));
    }

    #[test]
    fn test_execution_settings_conversion() {
        let inline = ExecutionSettings::default().to_invoker_config();
        assert_eq!(inline.strategy, ExecutionStrategy::Inline);
        assert_eq!(inline.slow_eval_warn, Duration::from_millis(100));

        let pool = ExecutionSettings {
            strategy: ExecutionMode::Pool,
            max_concurrent: 8,
            slow_eval_warn_ms: 25,
        }
        .to_invoker_config();
        assert_eq!(pool.strategy, ExecutionStrategy::Pool { max_concurrent: 8 });
        assert_eq!(pool.slow_eval_warn, Duration::from_millis(25));
    }

    #[test]
    fn test_log_settings_conversion() {
        let settings = LogSettings {
            format: LogFormatSetting::Pretty,
            level: "debug".to_string(),
            ..Default::default()
        };
        let config = settings.to_log_config();
        assert_eq!(config.format, LogFormat::Pretty);
        assert_eq!(config.level, "debug");
        assert!(config.enabled);
    }

    #[test]
    fn test_location_rules_default_to_unset() {
        let location: LocationSettings = toml::from_str(r#"prefix = "/api""#).unwrap();
        assert_eq!(location.rules, None);
    }
}
