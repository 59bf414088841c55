//! # Warden Core
//!
//! Core types shared by every Warden crate.
//!
//! This crate provides the foundational types used throughout Warden:
//!
//! - [`Verdict`] - Outcome of one evaluation (allow, deny, load error)
//! - [`PhaseOutcome`] - What a phase handler tells the host pipeline to do next
//! - [`RouteConfig`] - The per-route rule set identifier (empty disables inspection)
//! - [`RequestBody`] / [`BodyReader`] - Buffered request bodies, in memory or spilled to disk
//! - [`InspectedRequest`] - Read-only view of a request handed to evaluation engines

#![doc(html_root_url = "https://docs.rs/warden-core/0.1.0")]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

mod body;
mod error;
mod request;
mod route;
mod verdict;

pub use body::{read_file_at, BodyReader, FileReadFn, RequestBody, TempFileBody};
pub use error::{BodyError, BodyResult};
pub use request::{Header, InspectedRequest, RequestSnapshot};
pub use route::RouteConfig;
pub use verdict::{PhaseOutcome, Verdict};
