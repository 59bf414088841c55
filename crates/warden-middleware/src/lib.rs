//! # Warden Middleware
//!
//! Async adapter for servers that hand over fully buffered requests.
//!
//! Where `warden-interceptor` plugs into a host's phase pipeline and may have
//! to wait for the body, this crate sits in an ordinary async middleware
//! chain. The body is collected up front, so evaluation never suspends and can
//! run on tokio's blocking pool when the engine is slow.
//!
//! ```text
//! Request → [stage] → Inspection → [stage] → Handler
//!                         │
//!                         └─ 403 / 500 short-circuit
//! ```
//!
//! ## Example
//!
//! ```ignore
//! use std::sync::Arc;
//! use warden_core::RouteConfig;
//! use warden_middleware::{Chain, InspectionMiddleware, MiddlewareContext};
//! use warden_plugin::{EvaluationInvoker, PluginConfig, PluginHandle, PluginLoader};
//!
//! let plugin = Arc::new(PluginHandle::new(PluginLoader::new(PluginConfig::default())));
//! let chain = Chain::builder()
//!     .stage(InspectionMiddleware::new(
//!         plugin,
//!         EvaluationInvoker::default(),
//!         RouteConfig::new("crs.conf"),
//!     ))
//!     .build();
//!
//! let response = chain
//!     .process(MiddlewareContext::new(), request, |_ctx, req| Box::pin(serve(req)))
//!     .await;
//! ```

#![forbid(unsafe_code)]

pub mod chain;
pub mod context;
pub mod inspection;
pub mod middleware;
pub mod types;

pub use chain::{BoxedMiddleware, Chain, ChainBuilder};
pub use context::MiddlewareContext;
pub use inspection::{InspectionMiddleware, RouteResolver};
pub use middleware::{BoxFuture, Middleware, Next};
pub use types::{Request, Response, ResponseExt, REQUEST_ID_HEADER};
