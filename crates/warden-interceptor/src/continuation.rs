//! Resumption of a request suspended on a body read.

use std::fmt;

use tracing::debug;
use warden_telemetry::metrics::PendingBodyGuard;

use crate::host::{BodyHost, HostRequest};

/// Permission to resume one suspended request.
///
/// Created by the body acquisition controller when it hands a read to the
/// host. The token cannot be cloned and [`resume`](Self::resume) consumes
/// it, so a suspension is resumed at most once. Dropping the token without
/// resuming leaves the request suspended; hosts do that only when the
/// request is being torn down.
#[must_use = "a suspended request only continues when its token is resumed"]
pub struct ContinuationToken {
    request_id: String,
    _pending: PendingBodyGuard,
}

impl ContinuationToken {
    pub(crate) fn new(request_id: &str) -> Self {
        Self {
            request_id: request_id.to_string(),
            _pending: PendingBodyGuard::new(),
        }
    }

    /// Identifier of the request this token belongs to.
    pub fn request_id(&self) -> &str {
        &self.request_id
    }

    /// Resumes the suspended request once its body is buffered.
    ///
    /// Releases the host's pending-operation reference exactly once, then
    /// runs the request's phase pipeline from its first phase. The
    /// interceptor is re-entered from the top and finds the body present.
    pub fn resume<H: BodyHost>(self, host: &H, request: &H::Request) {
        debug!(request_id = %request.request_id(), "request body buffered, resuming phases");
        host.finalize_pending(request);
        drop(self);
        host.run_phases(request);
    }
}

impl fmt::Debug for ContinuationToken {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ContinuationToken")
            .field("request_id", &self.request_id)
            .finish_non_exhaustive()
    }
}
