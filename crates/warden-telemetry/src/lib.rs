//! Logging and metrics for Warden.
//!
//! - **Logging**: [`init_logging`] installs a `tracing-subscriber` registry
//!   with an `EnvFilter` and JSON or pretty output.
//! - **Metrics**: recording functions over the `metrics` facade. No exporter
//!   is installed here; the embedding process installs its own recorder, and
//!   without one every recording call is a no-op.
//!
//! # Standard Metrics
//!
//! | Metric | Type | Labels | Description |
//! |--------|------|--------|-------------|
//! | `warden_requests_total` | Counter | `outcome` | Interceptor decisions |
//! | `warden_plugin_loads_total` | Counter | `result` | Engine load attempts |
//! | `warden_evaluation_duration_seconds` | Histogram | `verdict` | Engine call latency |
//! | `warden_pending_bodies` | Gauge | - | Requests suspended on body reads |
//!
//! # Example
//!
//! ```rust,ignore
//! use warden_telemetry::{init_logging, LogConfig};
//!
//! init_logging(&LogConfig::development())?;
//! tracing::info!(request_id = "abc", "inspection enabled");
//! ```

#![warn(missing_docs)]

pub mod error;
pub mod logging;
pub mod metrics;

pub use error::TelemetryError;
pub use logging::{init_logging, LogConfig, LogFormat};

/// Result type for telemetry operations.
pub type TelemetryResult<T> = Result<T, TelemetryError>;
