//! # Warden Plugin
//!
//! Lazy loading of the evaluation engine from a dynamic module, and dispatch
//! of evaluation calls to it.
//!
//! ## Overview
//!
//! ```text
//!   PhaseInterceptor
//!         │ resolve()
//!   ┌─────▼──────────┐  first success   ┌──────────────────┐
//!   │  PluginHandle  │ ───────────────▶ │ Arc<dyn EvalEngine>
//!   │ (once, cached) │                  └────────┬─────────┘
//!   └─────┬──────────┘                           │
//!         │ load()                               │ evaluate()
//!   ┌─────▼──────────┐                  ┌────────▼─────────┐
//!   │  PluginLoader  │                  │EvaluationInvoker │
//!   │ ./module, then │                  │ inline | pool    │
//!   │ search path    │                  └──────────────────┘
//!   └────────────────┘
//! ```
//!
//! - [`PluginHandle`] caches the first successfully resolved engine for the
//!   lifetime of the process. Failures are not cached: the next call retries.
//! - [`PluginLoader`] applies the module resolution policy (working
//!   directory first, then the platform search path) and delegates the
//!   mechanism to a [`ModuleLoader`].
//! - [`DylibLoader`] is the production [`ModuleLoader`], resolving one C ABI
//!   symbol (see [`abi`]).
//! - [`EvaluationInvoker`] runs evaluations inline or on a bounded worker pool.
//!
//! ## Safety
//!
//! Loading a module runs its initializers and calling its entry point
//! executes foreign code. The module is trusted: it must export the entry
//! point with exactly the [`abi::EvalRequestFn`] signature and must not keep
//! any pointer it receives beyond the call. All `unsafe` code in this crate
//! lives in [`abi`] and [`dylib`].

#![doc(html_root_url = "https://docs.rs/warden-plugin/0.1.0")]
#![warn(missing_docs)]

pub mod abi;
pub mod config;
pub mod dylib;
pub mod engine;
pub mod error;
pub mod invoker;
pub mod loader;

pub use config::PluginConfig;
pub use dylib::{DylibEngine, DylibLoader};
pub use engine::{EvalEngine, FnEngine};
pub use error::{PluginError, PluginResult};
pub use invoker::{EvaluationInvoker, ExecutionStrategy, InvokerConfig};
pub use loader::{ModuleLoader, PluginHandle, PluginLoader};
