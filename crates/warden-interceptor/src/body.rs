//! Body acquisition: make sure the body is buffered before evaluation.

use http::StatusCode;
use tracing::{debug, warn};
use warden_core::RequestBody;

use crate::continuation::ContinuationToken;
use crate::host::{BodyHost, HostRequest};

/// Result of [`BodyAcquisitionController::acquire`].
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Acquisition<'r> {
    /// The body is buffered and can be evaluated now.
    Ready(&'r RequestBody),
    /// A read was handed to the host. The request resumes through its
    /// [`ContinuationToken`] once the body is buffered.
    Pending,
    /// The host could not read the body; the request ends with this status.
    ///
    /// Host statuses of 300 and above are kept; anything lower becomes 500.
    Failed(StatusCode),
}

/// Guarantees the request body is buffered before evaluation proceeds.
#[derive(Debug, Clone, Copy, Default)]
pub struct BodyAcquisitionController;

impl BodyAcquisitionController {
    /// Creates a controller.
    pub const fn new() -> Self {
        Self
    }

    /// Returns the buffered body, or starts a host read and suspends.
    pub fn acquire<'r, H: BodyHost>(&self, host: &H, request: &'r H::Request) -> Acquisition<'r> {
        if let Some(body) = request.body() {
            return Acquisition::Ready(body);
        }

        let token = ContinuationToken::new(request.request_id());
        match host.read_body(request, token) {
            Ok(()) => {
                debug!(request_id = %request.request_id(), "request suspended until body is buffered");
                Acquisition::Pending
            }
            Err(e) => {
                warn!(request_id = %request.request_id(), error = %e, "request body read failed");
                Acquisition::Failed(failure_status(e.status()))
            }
        }
    }
}

// Only an error status can end the request; lower host codes become 500.
fn failure_status(status: StatusCode) -> StatusCode {
    if status.as_u16() >= 300 {
        status
    } else {
        StatusCode::INTERNAL_SERVER_ERROR
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_failure_status_threshold() {
        assert_eq!(failure_status(StatusCode::PAYLOAD_TOO_LARGE), StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(failure_status(StatusCode::MULTIPLE_CHOICES), StatusCode::MULTIPLE_CHOICES);
        assert_eq!(failure_status(StatusCode::OK), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure_status(StatusCode::NO_CONTENT), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(failure_status(StatusCode::CONTINUE), StatusCode::INTERNAL_SERVER_ERROR);
    }
}
