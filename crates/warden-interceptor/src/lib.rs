//! # Warden Interceptor
//!
//! The per-request entry point a host server calls from its request
//! pipeline, and the controller that suspends the pipeline until the request
//! body is buffered.
//!
//! ## Request flow
//!
//! ```text
//! host pipeline ──▶ PhaseInterceptor::handle
//!                     │ 1. rules empty / sub-request ──▶ Declined
//!                     │ 2. PluginHandle::resolve      ──▶ Reject(500) on failure
//!                     │ 3. BodyAcquisitionController
//!                     │      Ready ─┐  Pending ──▶ Done ····┐
//!                     │             │  Failed  ──▶ Reject(status)
//!                     │ 4. EvaluationInvoker            │
//!                     ▼             ▼                       │
//!          Allow ──▶ Declined   Deny ──▶ Reject(403)        │
//!                                                           │
//! host body read completes ──▶ ContinuationToken::resume ◀──┘
//!                                finalize_pending (once)
//!                                run_phases (from the start)
//! ```
//!
//! The host side is abstracted by [`HostRequest`] and [`BodyHost`].
//! [`PhasePipeline`] is a reference implementation of the host's phase loop
//! for embedders that do not have one.

#![doc(html_root_url = "https://docs.rs/warden-interceptor/0.1.0")]
#![warn(missing_docs)]

pub mod body;
pub mod continuation;
pub mod host;
pub mod interceptor;
pub mod phase;
pub mod pipeline;

pub use body::{Acquisition, BodyAcquisitionController};
pub use continuation::ContinuationToken;
pub use host::{BodyHost, HostRequest, ReadyRequest};
pub use interceptor::PhaseInterceptor;
pub use phase::Phase;
pub use pipeline::{PhaseHandler, PhasePipeline, PhasePipelineBuilder, PipelineRun};
