//! Metric recording functions.
//!
//! Everything here goes through the `metrics` facade and is a no-op until
//! the embedding process installs a recorder. Call [`describe_metrics`] once
//! after installing one to register help texts.

use metrics::{counter, describe_counter, describe_gauge, describe_histogram, gauge, histogram};
use std::time::Duration;

/// Metric names.
pub mod names {
    /// Interceptor decisions, labelled by `outcome`.
    pub const REQUESTS_TOTAL: &str = "warden_requests_total";

    /// Engine load attempts, labelled by `result`.
    pub const PLUGIN_LOADS_TOTAL: &str = "warden_plugin_loads_total";

    /// Engine call latency, labelled by `verdict`.
    pub const EVALUATION_DURATION_SECONDS: &str = "warden_evaluation_duration_seconds";

    /// Requests currently suspended on a body read.
    pub const PENDING_BODIES: &str = "warden_pending_bodies";
}

/// Registers descriptions for all Warden metrics.
pub fn describe_metrics() {
    describe_counter!(names::REQUESTS_TOTAL, "Requests handled by the interceptor by outcome");
    describe_counter!(names::PLUGIN_LOADS_TOTAL, "Evaluation engine load attempts by result");
    describe_histogram!(
        names::EVALUATION_DURATION_SECONDS,
        "Evaluation engine call duration in seconds"
    );
    describe_gauge!(names::PENDING_BODIES, "Requests waiting for the host to buffer the body");
}

/// Records one interceptor decision (e.g., "declined", "suspended", "rejected").
pub fn record_outcome(outcome: &'static str) {
    counter!(names::REQUESTS_TOTAL, "outcome" => outcome).increment(1);
}

/// Records an engine load attempt.
pub fn record_plugin_load(success: bool) {
    let result = if success { "success" } else { "failure" };
    counter!(names::PLUGIN_LOADS_TOTAL, "result" => result).increment(1);
}

/// Records one engine call.
pub fn record_evaluation(verdict: &'static str, duration: Duration) {
    histogram!(names::EVALUATION_DURATION_SECONDS, "verdict" => verdict)
        .record(duration.as_secs_f64());
}

/// Tracks one suspended request in the pending-bodies gauge.
///
/// The gauge is incremented on creation and decremented on drop, so a
/// request that is torn down without resuming is still accounted for.
#[derive(Debug)]
pub struct PendingBodyGuard {
    _private: (),
}

impl PendingBodyGuard {
    /// Creates a new guard and increments the gauge.
    #[must_use]
    pub fn new() -> Self {
        gauge!(names::PENDING_BODIES).increment(1.0);
        Self { _private: () }
    }
}

impl Default for PendingBodyGuard {
    fn default() -> Self {
        Self::new()
    }
}

impl Drop for PendingBodyGuard {
    fn drop(&mut self) {
        gauge!(names::PENDING_BODIES).decrement(1.0);
    }
}
