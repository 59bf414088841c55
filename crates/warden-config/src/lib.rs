//! Typed configuration for Warden.
//!
//! - TOML and JSON files, strict about unknown fields
//! - `WARDEN__SECTION__KEY` environment overrides
//! - Route scopes: a server-wide rule set with per-location overrides,
//!   inherited down the prefix tree (see [`ScopeTree`])
//!
//! # Configuration File Format
//!
//! ```toml
//! [plugin]
//! module_name = "wardenengine.so"
//! symbol = "WardenEvalRequest"
//! preload = false
//!
//! [execution]
//! strategy = "inline"      # or "pool"
//! max_concurrent = 4
//! slow_eval_warn_ms = 100
//!
//! [logging]
//! level = "info"
//! format = "json"
//!
//! [routes]
//! rules = "/etc/warden/crs.conf"
//!
//! [[routes.locations]]
//! prefix = "/static"
//! rules = ""
//! ```

mod config;
mod error;
mod loader;
mod schema;
mod scope;

pub use config::WardenConfig;
pub use error::{ConfigError, ConfigResult};
pub use loader::{ConfigLoader, DEFAULT_ENV_PREFIX};
pub use schema::{
    ExecutionMode, ExecutionSettings, LocationSettings, LogFormatSetting, LogSettings,
    PluginSettings, RouteSettings,
};
pub use scope::{normalize_path, ScopeConfig, ScopeId, ScopeTree};
