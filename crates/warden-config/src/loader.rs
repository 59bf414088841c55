//! Layered configuration loading.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use crate::config::WardenConfig;
use crate::error::{ConfigError, ConfigResult};
use crate::schema::{ExecutionMode, LogFormatSetting};

/// Default prefix for environment overrides.
pub const DEFAULT_ENV_PREFIX: &str = "WARDEN";

/// Loads configuration in layers, later layers overriding earlier ones:
///
/// 1. Defaults
/// 2. A TOML or JSON file, chosen by extension
/// 3. `PREFIX__SECTION__KEY` environment variables
///
/// # Example
///
/// ```no_run
/// use warden_config::ConfigLoader;
///
/// # fn main() -> Result<(), warden_config::ConfigError> {
/// let config = ConfigLoader::new()
///     .with_file("/etc/warden/warden.toml")?
///     .with_env_prefix("WARDEN")
///     .load()?;
/// # Ok(())
/// # }
/// ```
#[derive(Debug, Default)]
pub struct ConfigLoader {
    config: WardenConfig,
    env_prefix: Option<String>,
}

impl ConfigLoader {
    /// Creates a loader holding the defaults.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts from the development preset.
    #[must_use]
    pub fn with_development(mut self) -> Self {
        self.config = WardenConfig::development();
        self
    }

    /// Replaces the current configuration with the contents of a file.
    ///
    /// # Errors
    ///
    /// Fails if the file is missing, unreadable, has an extension other
    /// than `.toml` or `.json`, or does not parse.
    pub fn with_file<P: AsRef<Path>>(mut self, path: P) -> ConfigResult<Self> {
        let path = path.as_ref();
        if !path.exists() {
            return Err(ConfigError::file_not_found(path));
        }
        let content = fs::read_to_string(path).map_err(|e| ConfigError::read_error(path, e))?;

        let format = path
            .extension()
            .and_then(|e| e.to_str())
            .map(str::to_lowercase)
            .unwrap_or_default();
        self.config = parse(&content, &format)?;
        Ok(self)
    }

    /// Like [`with_file`](Self::with_file), but a missing file is not an error.
    ///
    /// # Errors
    ///
    /// Fails if the file exists but cannot be loaded.
    pub fn with_optional_file<P: AsRef<Path>>(self, path: P) -> ConfigResult<Self> {
        if path.as_ref().exists() {
            self.with_file(path)
        } else {
            Ok(self)
        }
    }

    /// Replaces the current configuration with `content` in `format`
    /// (`"toml"` or `"json"`).
    ///
    /// # Errors
    ///
    /// Fails for other formats or content that does not parse.
    pub fn with_string(mut self, content: &str, format: &str) -> ConfigResult<Self> {
        self.config = parse(content, &format.to_lowercase())?;
        Ok(self)
    }

    /// Enables environment overrides with `prefix`.
    #[must_use]
    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = Some(prefix.to_uppercase());
        self
    }

    /// Applies environment overrides and validates.
    ///
    /// # Errors
    ///
    /// Fails if an override does not parse or validation fails.
    pub fn load(mut self) -> ConfigResult<WardenConfig> {
        if let Some(prefix) = self.env_prefix.take() {
            let vars: Vec<(String, String)> = env::vars()
                .filter(|(k, _)| k.starts_with(prefix.as_str()))
                .collect();
            self.apply_env_vars(&prefix, vars)?;
        }
        self.config.validate()?;
        Ok(self.config)
    }

    /// Returns the configuration without overrides or validation.
    #[must_use]
    pub fn load_unvalidated(self) -> WardenConfig {
        self.config
    }

    fn apply_env_vars<I>(&mut self, prefix: &str, vars: I) -> ConfigResult<()>
    where
        I: IntoIterator<Item = (String, String)>,
    {
        for (key, value) in vars {
            self.apply_env_var(&key, &value, prefix)?;
        }
        Ok(())
    }

    fn apply_env_var(&mut self, key: &str, value: &str, prefix: &str) -> ConfigResult<()> {
        let Some(rest) = key.strip_prefix(prefix).and_then(|k| k.strip_prefix("__")) else {
            return Ok(());
        };
        let parts: Vec<&str> = rest.split("__").collect();

        match parts.as_slice() {
            ["PLUGIN", "MODULE_NAME"] => self.config.plugin.module_name = value.to_string(),
            ["PLUGIN", "SYMBOL"] => self.config.plugin.symbol = value.to_string(),
            ["PLUGIN", "WORKING_DIR"] => {
                self.config.plugin.working_dir =
                    (!value.is_empty()).then(|| PathBuf::from(value));
            }
            ["PLUGIN", "PRELOAD"] => self.config.plugin.preload = parse_bool(key, value)?,

            ["EXECUTION", "STRATEGY"] => {
                self.config.execution.strategy = match value.to_lowercase().as_str() {
                    "inline" => ExecutionMode::Inline,
                    "pool" => ExecutionMode::Pool,
                    _ => return Err(ConfigError::env_parse(key, "expected 'inline' or 'pool'")),
                };
            }
            ["EXECUTION", "MAX_CONCURRENT"] => {
                self.config.execution.max_concurrent = parse_number(key, value)?;
            }
            ["EXECUTION", "SLOW_EVAL_WARN_MS"] => {
                self.config.execution.slow_eval_warn_ms = parse_number(key, value)?;
            }

            ["LOGGING", "ENABLED"] => self.config.logging.enabled = parse_bool(key, value)?,
            ["LOGGING", "LEVEL"] => self.config.logging.level = value.to_string(),
            ["LOGGING", "FORMAT"] => {
                self.config.logging.format = match value.to_lowercase().as_str() {
                    "json" => LogFormatSetting::Json,
                    "pretty" => LogFormatSetting::Pretty,
                    _ => return Err(ConfigError::env_parse(key, "expected 'json' or 'pretty'")),
                };
            }
            ["LOGGING", "FILE_LINE_INFO"] => {
                self.config.logging.file_line_info = parse_bool(key, value)?;
            }
            ["LOGGING", "THREAD_IDS"] => self.config.logging.thread_ids = parse_bool(key, value)?,

            // Locations are list-shaped and only come from files.
            ["ROUTES", "RULES"] => self.config.routes.rules = Some(value.to_string()),

            _ => {}
        }
        Ok(())
    }
}

fn parse(content: &str, format: &str) -> ConfigResult<WardenConfig> {
    match format {
        "toml" => Ok(toml::from_str(content)?),
        "json" => Ok(serde_json::from_str(content)?),
        other => Err(ConfigError::unsupported_format(other)),
    }
}

fn parse_bool(key: &str, value: &str) -> ConfigResult<bool> {
    match value.to_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Ok(true),
        "false" | "0" | "no" | "off" => Ok(false),
        _ => Err(ConfigError::env_parse(key, "expected boolean")),
    }
}

fn parse_number<T: std::str::FromStr>(key: &str, value: &str) -> ConfigResult<T> {
    value
        .parse()
        .map_err(|_| ConfigError::env_parse(key, "expected non-negative integer"))
}
