//! Read-only request views handed to evaluation engines.
//!
//! Method, URI and headers are kept as the bytes the client sent. Nothing
//! here decodes or validates them, so an engine inspects exactly what the
//! backend will receive.

use bytes::Bytes;

use crate::body::RequestBody;

/// A single request header.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Header {
    /// Header name as received.
    pub name: Bytes,
    /// Header value as received.
    pub value: Bytes,
}

impl Header {
    /// Creates a header pair, copying the given bytes.
    pub fn new(name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        Self {
            name: Bytes::copy_from_slice(name.as_ref()),
            value: Bytes::copy_from_slice(value.as_ref()),
        }
    }
}

/// A request whose body has been fully buffered and can be evaluated.
///
/// Engines only ever see requests through this trait; they never own the
/// host's request.
pub trait InspectedRequest {
    /// The request method (e.g. `GET`).
    fn method(&self) -> &[u8];

    /// The unparsed request URI, including the query string.
    fn uri(&self) -> &[u8];

    /// Request headers in arrival order.
    fn headers(&self) -> &[Header];

    /// The buffered request body.
    fn body(&self) -> &RequestBody;
}

/// An owned [`InspectedRequest`].
///
/// # Example
///
/// ```
/// use warden_core::{InspectedRequest, RequestBody, RequestSnapshot};
///
/// let request = RequestSnapshot::new("POST", "/login")
///     .with_header("content-type", "application/x-www-form-urlencoded")
///     .with_body(RequestBody::from_bytes("user=alice"));
///
/// assert_eq!(request.method(), b"POST");
/// assert_eq!(request.body().len(), 10);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RequestSnapshot {
    method: Bytes,
    uri: Bytes,
    headers: Vec<Header>,
    body: RequestBody,
}

impl RequestSnapshot {
    /// Creates a snapshot with no headers and an empty body.
    pub fn new(method: impl AsRef<[u8]>, uri: impl AsRef<[u8]>) -> Self {
        Self {
            method: Bytes::copy_from_slice(method.as_ref()),
            uri: Bytes::copy_from_slice(uri.as_ref()),
            headers: Vec::new(),
            body: RequestBody::Empty,
        }
    }

    /// Appends a header.
    #[must_use]
    pub fn with_header(mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Sets the body.
    #[must_use]
    pub fn with_body(mut self, body: RequestBody) -> Self {
        self.body = body;
        self
    }

    /// Returns the first header value with the given name, ignoring ASCII case.
    #[must_use]
    pub fn header(&self, name: &str) -> Option<&[u8]> {
        self.headers
            .iter()
            .find(|h| h.name.eq_ignore_ascii_case(name.as_bytes()))
            .map(|h| h.value.as_ref())
    }
}

impl InspectedRequest for RequestSnapshot {
    fn method(&self) -> &[u8] {
        &self.method
    }

    fn uri(&self) -> &[u8] {
        &self.uri
    }

    fn headers(&self) -> &[Header] {
        &self.headers
    }

    fn body(&self) -> &RequestBody {
        &self.body
    }
}
