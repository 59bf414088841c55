//! The host server seen from the interceptor.

use warden_core::{BodyError, Header, InspectedRequest, RequestBody, RouteConfig};

use crate::continuation::ContinuationToken;

/// A request owned by the host server.
///
/// The interceptor only borrows it for one pipeline invocation.
pub trait HostRequest {
    /// Request identifier, empty when the host has none.
    fn request_id(&self) -> &str;

    /// Returns false for sub-requests and internal redirects.
    fn is_main(&self) -> bool;

    /// The buffered body, or `None` while it has not been read.
    fn body(&self) -> Option<&RequestBody>;

    /// Rule set configured for the request's location.
    fn route_config(&self) -> &RouteConfig;

    /// Request method as received.
    fn method(&self) -> &[u8];

    /// Unparsed request URI as received.
    fn uri(&self) -> &[u8];

    /// Request headers in arrival order.
    fn headers(&self) -> &[Header];
}

/// The host facilities the body acquisition controller relies on.
pub trait BodyHost {
    /// The host's request type.
    type Request: HostRequest;

    /// Starts reading the request body.
    ///
    /// The host takes one pending-operation reference on the request, and
    /// once the body is buffered it calls [`ContinuationToken::resume`].
    /// Completion may happen before this method returns.
    ///
    /// # Errors
    ///
    /// Returns `BodyError::Host` carrying the final status when the read
    /// cannot start or fails outright. The token is dropped in that case.
    fn read_body(&self, request: &Self::Request, token: ContinuationToken) -> Result<(), BodyError>;

    /// Releases the pending-operation reference taken by [`read_body`](Self::read_body).
    fn finalize_pending(&self, request: &Self::Request);

    /// Runs the request's phase pipeline from its first phase.
    fn run_phases(&self, request: &Self::Request);
}

/// A host request whose body is buffered, seen as an [`InspectedRequest`].
#[derive(Debug)]
pub struct ReadyRequest<'r, R: ?Sized> {
    request: &'r R,
    body: &'r RequestBody,
}

impl<'r, R: HostRequest + ?Sized> ReadyRequest<'r, R> {
    /// Pairs a request with its buffered body.
    pub fn new(request: &'r R, body: &'r RequestBody) -> Self {
        Self { request, body }
    }
}

impl<R: HostRequest + ?Sized> InspectedRequest for ReadyRequest<'_, R> {
    fn method(&self) -> &[u8] {
        self.request.method()
    }

    fn uri(&self) -> &[u8] {
        self.request.uri()
    }

    fn headers(&self) -> &[Header] {
        self.request.headers()
    }

    fn body(&self) -> &RequestBody {
        self.body
    }
}
