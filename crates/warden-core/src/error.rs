//! Error types for request body handling.

use http::StatusCode;
use thiserror::Error;

/// Result type for body operations.
pub type BodyResult<T> = Result<T, BodyError>;

/// Errors that can occur while acquiring or reading a request body.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum BodyError {
    /// The host failed to read the body and produced a final status.
    ///
    /// The status is passed to the client unchanged.
    #[error("host failed to read request body (status {0})")]
    Host(StatusCode),

    /// The file-read capability returned an error code.
    #[error("error code {0} while reading request body")]
    ReadFailed(isize),

    /// IO error while reading a spilled body.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl BodyError {
    /// Returns the status the client should observe for this error.
    #[must_use]
    pub const fn status(&self) -> StatusCode {
        match self {
            Self::Host(status) => *status,
            Self::ReadFailed(_) | Self::Io(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_status_is_verbatim() {
        let err = BodyError::Host(StatusCode::PAYLOAD_TOO_LARGE);
        assert_eq!(err.status(), StatusCode::PAYLOAD_TOO_LARGE);
        assert!(err.to_string().contains("413"));
    }

    #[test]
    fn test_read_failure_maps_to_server_error() {
        let err = BodyError::ReadFailed(-1);
        assert_eq!(err.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(err.to_string(), "error code -1 while reading request body");
    }
}
