//! # Warden Test
//!
//! Test utilities for Warden: a simulated host server that drives the
//! interceptor the way a single-threaded, event-driven web server does.
//!
//! ## Key Features
//!
//! - **Phase pipeline**: requests run through a [`PhasePipeline`] with the
//!   interceptor at its registration phase and a content handler after it.
//! - **Deferred body reads**: bodies arrive later, from a delivery queue the
//!   test drains explicitly, or synchronously inside the read call.
//! - **Pending references**: the host's per-request reference count is
//!   tracked so tests can assert a request is neither leaked nor
//!   finalized twice.
//! - **Engine fakes**: [`RecordingEngine`] and [`SwitchableLoader`] stand in
//!   for a real engine module.
//!
//! ## Example
//!
//! ```ignore
//! use warden_test::{RecordingEngine, SimHost, SimRequest};
//!
//! let engine = RecordingEngine::allowing();
//! let host = SimHost::new(interceptor_for(&engine));
//!
//! let request = SimRequest::post("/login").rules("crs.conf").body("user=alice").build();
//! host.submit(&request);
//! assert!(request.status().is_none());
//!
//! host.deliver_all();
//! assert_eq!(request.status(), Some(http::StatusCode::OK));
//! ```
//!
//! [`PhasePipeline`]: warden_interceptor::PhasePipeline

#![doc(html_root_url = "https://docs.rs/warden-test/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod engine;
mod host;
mod request;

pub use engine::{Evaluation, RecordingEngine, SwitchableLoader};
pub use host::{ContentHandler, HostStats, SimHost};
pub use request::{SimRequest, SimRequestBuilder};
