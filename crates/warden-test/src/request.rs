//! Simulated host requests.

use std::cell::{Cell, OnceCell, RefCell};
use std::path::PathBuf;
use std::rc::{Rc, Weak};

use bytes::Bytes;
use http::StatusCode;
use warden_core::{Header, RequestBody, RouteConfig, TempFileBody};
use warden_interceptor::HostRequest;

/// A request owned by a [`SimHost`](crate::SimHost).
///
/// Interior mutability stands in for the host mutating its own request
/// structure while the interceptor holds a shared borrow.
#[derive(Debug)]
pub struct SimRequest {
    this: Weak<SimRequest>,
    request_id: String,
    main: bool,
    method: String,
    uri: String,
    headers: Vec<Header>,
    rules: RouteConfig,
    body: OnceCell<RequestBody>,
    incoming: RefCell<Option<RequestBody>>,
    read_failure: Option<StatusCode>,
    pending: Cell<u32>,
    status: Cell<Option<StatusCode>>,
    finalizations: Cell<u32>,
    content_runs: Cell<u32>,
}

impl SimRequest {
    /// Starts building a GET request.
    pub fn get(uri: impl Into<String>) -> SimRequestBuilder {
        SimRequestBuilder::new("GET", uri)
    }

    /// Starts building a POST request.
    pub fn post(uri: impl Into<String>) -> SimRequestBuilder {
        SimRequestBuilder::new("POST", uri)
    }

    /// Final status, `None` while the request is in flight.
    pub fn status(&self) -> Option<StatusCode> {
        self.status.get()
    }

    /// Outstanding host references. Zero once the request is closed.
    pub fn pending_refs(&self) -> u32 {
        self.pending.get()
    }

    /// How many times the host finalized the request.
    pub fn finalizations(&self) -> u32 {
        self.finalizations.get()
    }

    /// How many times the content phase ran.
    pub fn content_runs(&self) -> u32 {
        self.content_runs.get()
    }

    /// Returns true once the body is buffered.
    pub fn body_buffered(&self) -> bool {
        self.body.get().is_some()
    }

    pub(crate) fn handle(&self) -> Option<Rc<SimRequest>> {
        self.this.upgrade()
    }

    pub(crate) fn read_failure(&self) -> Option<StatusCode> {
        self.read_failure
    }

    pub(crate) fn acquire_ref(&self) {
        self.pending.set(self.pending.get() + 1);
    }

    pub(crate) fn release_ref(&self) {
        self.pending.set(self.pending.get().saturating_sub(1));
    }

    pub(crate) fn buffer_body(&self) {
        let body = self.incoming.borrow_mut().take().unwrap_or_default();
        let _ = self.body.set(body);
    }

    pub(crate) fn record_content_run(&self) {
        self.content_runs.set(self.content_runs.get() + 1);
    }

    pub(crate) fn finalize(&self, status: StatusCode) {
        self.finalizations.set(self.finalizations.get() + 1);
        if self.status.get().is_none() {
            self.status.set(Some(status));
        }
        self.release_ref();
    }
}

impl HostRequest for SimRequest {
    fn request_id(&self) -> &str {
        &self.request_id
    }

    fn is_main(&self) -> bool {
        self.main
    }

    fn body(&self) -> Option<&RequestBody> {
        self.body.get()
    }

    fn route_config(&self) -> &RouteConfig {
        &self.rules
    }

    fn method(&self) -> &[u8] {
        self.method.as_bytes()
    }

    fn uri(&self) -> &[u8] {
        self.uri.as_bytes()
    }

    fn headers(&self) -> &[Header] {
        &self.headers
    }
}

/// Builder for [`SimRequest`].
#[must_use]
#[derive(Debug)]
pub struct SimRequestBuilder {
    request_id: String,
    main: bool,
    method: String,
    uri: String,
    headers: Vec<Header>,
    rules: RouteConfig,
    incoming: RequestBody,
    buffered: bool,
    read_failure: Option<StatusCode>,
}

impl SimRequestBuilder {
    /// Creates a builder for a top-level request without inspection rules.
    pub fn new(method: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            request_id: String::new(),
            main: true,
            method: method.into(),
            uri: uri.into(),
            headers: Vec::new(),
            rules: RouteConfig::disabled(),
            incoming: RequestBody::Empty,
            buffered: false,
            read_failure: None,
        }
    }

    /// Sets the request identifier.
    pub fn request_id(mut self, id: impl Into<String>) -> Self {
        self.request_id = id.into();
        self
    }

    /// Appends a header. Name and value may hold any bytes.
    pub fn header(mut self, name: impl AsRef<[u8]>, value: impl AsRef<[u8]>) -> Self {
        self.headers.push(Header::new(name, value));
        self
    }

    /// Sets the rule set of the request's location.
    pub fn rules(mut self, rules: impl Into<RouteConfig>) -> Self {
        self.rules = rules.into();
        self
    }

    /// Marks the request as a sub-request.
    pub fn subrequest(mut self) -> Self {
        self.main = false;
        self
    }

    /// Sets the body the client sends. It is buffered on the host's first read.
    pub fn body(mut self, body: impl Into<Bytes>) -> Self {
        self.incoming = RequestBody::from_bytes(body);
        self
    }

    /// Sets a body that arrives as a chain of buffers.
    pub fn body_chunks<I, B>(mut self, chunks: I) -> Self
    where
        I: IntoIterator<Item = B>,
        B: Into<Bytes>,
    {
        self.incoming = RequestBody::InMemory(chunks.into_iter().map(Into::into).collect());
        self
    }

    /// Sets a body the host spilled to a temporary file.
    pub fn spilled_body(mut self, path: impl Into<PathBuf>, len: u64) -> Self {
        self.incoming = RequestBody::TempFile(TempFileBody::new(path, len));
        self
    }

    /// Marks the body as already buffered when the request is submitted.
    pub fn buffered(mut self) -> Self {
        self.buffered = true;
        self
    }

    /// Makes the host's body read fail with `status`.
    pub fn read_failure(mut self, status: StatusCode) -> Self {
        self.read_failure = Some(status);
        self
    }

    /// Builds the request.
    pub fn build(self) -> Rc<SimRequest> {
        let body = OnceCell::new();
        let incoming = if self.buffered {
            let _ = body.set(self.incoming);
            None
        } else {
            Some(self.incoming)
        };

        Rc::new_cyclic(|this| SimRequest {
            this: this.clone(),
            request_id: self.request_id,
            main: self.main,
            method: self.method,
            uri: self.uri,
            headers: self.headers,
            rules: self.rules,
            body,
            incoming: RefCell::new(incoming),
            read_failure: self.read_failure,
            pending: Cell::new(0),
            status: Cell::new(None),
            finalizations: Cell::new(0),
            content_runs: Cell::new(0),
        })
    }
}
