//! # Warden
//!
//! In-process HTTP request inspection. Requests whose route has a rule set
//! are handed, with their complete body, to an evaluation engine loaded from
//! a dynamic module; a `false` answer rejects the request with `403`.
//!
//! Two integration points share one engine:
//!
//! - [`interceptor`] for hosts with a phase pipeline and asynchronous body
//!   reads (the request is suspended until the body is buffered)
//! - [`middleware`] for async servers that already hold the whole body
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use warden::prelude::*;
//!
//! let config = ConfigLoader::new()
//!     .with_optional_file("warden.toml")?
//!     .with_env_prefix(DEFAULT_ENV_PREFIX)
//!     .load()?;
//! warden::init_logging(&config)?;
//!
//! let warden = Warden::from_config(config)?;
//! let chain = Chain::builder().stage(warden.inspection()).build();
//! ```

#![doc(html_root_url = "https://docs.rs/warden/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod error;
mod runtime;

pub use error::{WardenError, WardenResult};
pub use runtime::{Warden, WardenBuilder};

pub use warden_config as config;
pub use warden_core as core;
pub use warden_interceptor as interceptor;
pub use warden_middleware as middleware;
pub use warden_plugin as plugin;
pub use warden_telemetry as telemetry;

/// Installs the global log subscriber described by `config.logging`.
///
/// # Errors
///
/// Fails if a subscriber is already installed or the level does not parse.
pub fn init_logging(config: &warden_config::WardenConfig) -> WardenResult<()> {
    warden_telemetry::init_logging(&config.log_config())?;
    Ok(())
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::{Warden, WardenError, WardenResult};

    pub use warden_config::{ConfigLoader, WardenConfig, DEFAULT_ENV_PREFIX};
    pub use warden_core::{InspectedRequest, PhaseOutcome, RouteConfig, Verdict};
    pub use warden_interceptor::{BodyHost, HostRequest, Phase, PhaseInterceptor};
    pub use warden_middleware::{Chain, InspectionMiddleware, MiddlewareContext};
    pub use warden_plugin::{EvalEngine, EvaluationInvoker, PluginHandle};
}
