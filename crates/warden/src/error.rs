//! Facade error type.

use thiserror::Error;
use warden_config::ConfigError;
use warden_plugin::PluginError;
use warden_telemetry::TelemetryError;

/// Errors raised while assembling Warden from configuration.
#[derive(Error, Debug)]
pub enum WardenError {
    /// The configuration did not load or validate.
    #[error(transparent)]
    Config(#[from] ConfigError),

    /// The engine could not be preloaded.
    #[error("engine preload failed: {0}")]
    Preload(#[from] PluginError),

    /// Logging could not be installed.
    #[error(transparent)]
    Telemetry(#[from] TelemetryError),
}

/// Result type for facade operations.
pub type WardenResult<T> = Result<T, WardenError>;
