//! C ABI of the evaluation engine module.
//!
//! All types in this module use `#[repr(C)]` so that an engine built with any
//! toolchain can be loaded. The module exports one function with the
//! [`EvalRequestFn`] signature:
//!
//! ```c
//! bool WardenEvalRequest(warden_str request_id,
//!                        warden_str rules,
//!                        const warden_request *request,
//!                        warden_read_fn read_body);
//! ```
//!
//! Every pointer is borrowed for the duration of the call only. Strings are
//! not NUL-terminated. Method, URI and headers carry the client's bytes
//! unchanged and need not be UTF-8. The body is read sequentially by calling `read_body`
//! with the request's opaque `body` cursor until it returns `0`; a negative
//! return value reports a read error.
//!
//! [`RawRequest`] builds these structures on the host side, and
//! [`EngineRequest`] is the safe view an engine written in Rust uses on the
//! module side.

use std::ffi::c_void;
use std::io::{self, Read};
use std::marker::PhantomData;
use std::{ptr, slice};

use warden_core::{BodyReader, FileReadFn, InspectedRequest};

/// Borrowed string: pointer plus length, not NUL-terminated.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct WardenStr {
    /// First byte, may be null when `len` is zero.
    pub data: *const u8,
    /// Length in bytes.
    pub len: usize,
}

impl WardenStr {
    /// Borrows a Rust string.
    pub fn new(s: &str) -> Self {
        Self::from_bytes(s.as_bytes())
    }

    /// Borrows raw bytes, which need not be UTF-8.
    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.as_ptr(),
            len: bytes.len(),
        }
    }

    /// The empty string.
    pub const fn empty() -> Self {
        Self {
            data: ptr::null(),
            len: 0,
        }
    }

    /// Views the raw bytes.
    ///
    /// # Safety
    ///
    /// `data` must point to `len` readable bytes that stay valid for `'a`.
    pub unsafe fn as_bytes<'a>(self) -> &'a [u8] {
        if self.data.is_null() || self.len == 0 {
            return &[];
        }
        slice::from_raw_parts(self.data, self.len)
    }

    /// Views the string as `&str`.
    ///
    /// Returns `None` if the bytes are not UTF-8.
    ///
    /// # Safety
    ///
    /// Same as [`as_bytes`](Self::as_bytes).
    pub unsafe fn as_str<'a>(self) -> Option<&'a str> {
        std::str::from_utf8(self.as_bytes()).ok()
    }
}

/// One request header.
#[repr(C)]
#[derive(Debug, Clone, Copy)]
pub struct WardenHeader {
    /// Header name.
    pub name: WardenStr,
    /// Header value.
    pub value: WardenStr,
}

/// The request handed to the engine.
#[repr(C)]
#[derive(Debug)]
pub struct WardenRequest {
    /// Request method.
    pub method: WardenStr,
    /// Unparsed request URI.
    pub uri: WardenStr,
    /// Header array.
    pub headers: *const WardenHeader,
    /// Number of entries in `headers`.
    pub headers_len: usize,
    /// Total body length in bytes.
    pub body_len: u64,
    /// Opaque body cursor, passed back to the read function.
    pub body: *mut c_void,
}

/// Reads up to `len` bytes of the body into `buf`.
///
/// Returns the number of bytes read, `0` at end of body, or a negative value
/// on error.
pub type WardenReadFn = unsafe extern "C" fn(body: *mut c_void, buf: *mut u8, len: usize) -> isize;

/// Signature of the exported entry point. Returns `true` to allow.
pub type EvalRequestFn = unsafe extern "C" fn(
    request_id: WardenStr,
    rules: WardenStr,
    request: *const WardenRequest,
    read_body: WardenReadFn,
) -> bool;

/// Host-side implementation of [`WardenReadFn`] over a [`BodyReader`].
///
/// # Safety
///
/// `body` must be the cursor of a live [`RawRequest`] and `buf` must point
/// to `len` writable bytes.
pub unsafe extern "C" fn read_body(body: *mut c_void, buf: *mut u8, len: usize) -> isize {
    if body.is_null() {
        return -1;
    }
    if len == 0 {
        return 0;
    }
    if buf.is_null() {
        return -1;
    }

    let reader = &mut *body.cast::<BodyReader<'_>>();
    let out = slice::from_raw_parts_mut(buf, len);
    match reader.read(out) {
        Ok(n) => isize::try_from(n).unwrap_or(isize::MAX),
        Err(_) => -1,
    }
}

/// Host-side owner of everything a [`WardenRequest`] points into.
///
/// The borrowed request outlives the raw structures, so the pointers stay
/// valid for as long as this value is alive and not moved.
pub struct RawRequest<'a> {
    headers: Vec<WardenHeader>,
    reader: Box<BodyReader<'a>>,
    request: &'a dyn InspectedRequest,
}

impl<'a> RawRequest<'a> {
    /// Prepares `request` for a call across the C ABI.
    pub fn new(request: &'a dyn InspectedRequest, read_file: FileReadFn) -> Self {
        let headers = request
            .headers()
            .iter()
            .map(|h| WardenHeader {
                name: WardenStr::from_bytes(&h.name),
                value: WardenStr::from_bytes(&h.value),
            })
            .collect();

        Self {
            headers,
            reader: Box::new(request.body().reader_with(read_file)),
            request,
        }
    }

    /// Returns the C view of the request.
    ///
    /// The returned value borrows `self` mutably through its body cursor.
    pub fn as_raw(&mut self) -> WardenRequest {
        WardenRequest {
            method: WardenStr::from_bytes(self.request.method()),
            uri: WardenStr::from_bytes(self.request.uri()),
            headers: self.headers.as_ptr(),
            headers_len: self.headers.len(),
            body_len: self.request.body().len(),
            body: (&mut *self.reader as *mut BodyReader<'a>).cast::<c_void>(),
        }
    }
}

/// Module-side safe view of a [`WardenRequest`].
///
/// # Example
///
/// ```no_run
/// use std::io::Read;
/// use warden_plugin::abi::{EngineRequest, WardenReadFn, WardenRequest, WardenStr};
///
/// #[no_mangle]
/// pub unsafe extern "C" fn WardenEvalRequest(
///     _request_id: WardenStr,
///     _rules: WardenStr,
///     request: *const WardenRequest,
///     read_body: WardenReadFn,
/// ) -> bool {
///     let Some(request) = EngineRequest::from_raw(request, read_body) else {
///         return false;
///     };
///     let mut body = Vec::new();
///     request.body().read_to_end(&mut body).is_ok() && !body.starts_with(b"DROP")
/// }
/// ```
#[derive(Debug, Clone, Copy)]
pub struct EngineRequest<'a> {
    raw: &'a WardenRequest,
    read_body: WardenReadFn,
}

impl<'a> EngineRequest<'a> {
    /// Wraps the pointers received by the entry point.
    ///
    /// Returns `None` if `raw` is null.
    ///
    /// # Safety
    ///
    /// `raw` must be the request pointer received by the entry point and the
    /// view must not outlive the call.
    pub unsafe fn from_raw(raw: *const WardenRequest, read_body: WardenReadFn) -> Option<Self> {
        raw.as_ref().map(|raw| Self { raw, read_body })
    }

    /// Request method bytes as the client sent them.
    pub fn method(&self) -> &'a [u8] {
        unsafe { self.raw.method.as_bytes() }
    }

    /// Request URI bytes as the client sent them.
    pub fn uri(&self) -> &'a [u8] {
        unsafe { self.raw.uri.as_bytes() }
    }

    /// Headers as raw name/value pairs, in arrival order.
    pub fn headers(&self) -> impl Iterator<Item = (&'a [u8], &'a [u8])> + 'a {
        let headers: &'a [WardenHeader] = if self.raw.headers.is_null() {
            &[]
        } else {
            unsafe { slice::from_raw_parts(self.raw.headers, self.raw.headers_len) }
        };
        headers
            .iter()
            .map(|h| unsafe { (h.name.as_bytes(), h.value.as_bytes()) })
    }

    /// Total body length in bytes.
    pub fn body_len(&self) -> u64 {
        self.raw.body_len
    }

    /// Returns a reader that pulls the body through the host's read function.
    pub fn body(&self) -> EngineBody<'a> {
        EngineBody {
            cursor: self.raw.body,
            read_body: self.read_body,
            _request: PhantomData,
        }
    }
}

/// Module-side body stream. See [`EngineRequest::body`].
#[derive(Debug)]
pub struct EngineBody<'a> {
    cursor: *mut c_void,
    read_body: WardenReadFn,
    _request: PhantomData<&'a WardenRequest>,
}

impl Read for EngineBody<'_> {
    fn read(&mut self, buf: &mut [u8]) -> io::Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        let n = unsafe { (self.read_body)(self.cursor, buf.as_mut_ptr(), buf.len()) };
        usize::try_from(n)
            .map_err(|_| io::Error::other(format!("error code {n} while reading request body")))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use warden_core::{read_file_at, RequestBody, RequestSnapshot};

    unsafe extern "C" fn inspect(
        request_id: WardenStr,
        rules: WardenStr,
        request: *const WardenRequest,
        read: WardenReadFn,
    ) -> bool {
        let Some(request) = EngineRequest::from_raw(request, read) else {
            return false;
        };
        let mut body = String::new();
        if request.body().read_to_string(&mut body).is_err() {
            return false;
        }

        request_id.as_str() == Some("req-7")
            && rules.as_str() == Some("crs.conf")
            && request.method() == b"POST"
            && request.uri() == b"/submit?x=1"
            && request.headers().any(|(k, v)| k == b"host" && v == b"example.com")
            && request.body_len() == 8
            && body == "a=1&b=22"
    }

    #[test]
    fn test_round_trip_through_c_abi() {
        let request = RequestSnapshot::new("POST", "/submit?x=1")
            .with_header("host", "example.com")
            .with_body(RequestBody::InMemory(vec!["a=1".into(), "&b=22".into()]));

        let mut raw = RawRequest::new(&request, read_file_at);
        let view = raw.as_raw();
        let allowed = unsafe {
            inspect(
                WardenStr::new("req-7"),
                WardenStr::new("crs.conf"),
                &view,
                read_body,
            )
        };
        assert!(allowed);
    }

    unsafe extern "C" fn exact_bytes(
        _request_id: WardenStr,
        _rules: WardenStr,
        request: *const WardenRequest,
        read: WardenReadFn,
    ) -> bool {
        let Some(request) = EngineRequest::from_raw(request, read) else {
            return false;
        };
        let headers: Vec<_> = request.headers().collect();

        request.method() == b"G\xffT"
            && request.uri() == b"/p\xe9th"
            && headers.len() == 2
            && headers[0] == (&b"x-tag"[..], &b"\xc0\xbcscript\xc0\xbe"[..])
            && headers[1] == (&b"x-\xfe"[..], &b"ok"[..])
    }

    #[test]
    fn test_non_utf8_fields_cross_the_abi_unchanged() {
        let request = RequestSnapshot::new(b"G\xffT", b"/p\xe9th")
            .with_header("x-tag", b"\xc0\xbcscript\xc0\xbe")
            .with_header(b"x-\xfe", "ok");

        let mut raw = RawRequest::new(&request, read_file_at);
        let view = raw.as_raw();
        let allowed = unsafe { exact_bytes(WardenStr::empty(), WardenStr::empty(), &view, read_body) };
        assert!(allowed);
    }

    #[test]
    fn test_empty_str() {
        assert_eq!(unsafe { WardenStr::empty().as_str() }, Some(""));
    }

    #[test]
    fn test_invalid_utf8_is_rejected() {
        let bytes = [0xff_u8, 0xfe];
        let s = WardenStr {
            data: bytes.as_ptr(),
            len: bytes.len(),
        };
        assert_eq!(unsafe { s.as_str() }, None);
    }

    #[test]
    fn test_read_body_null_cursor() {
        let mut buf = [0u8; 4];
        assert_eq!(unsafe { read_body(ptr::null_mut(), buf.as_mut_ptr(), 4) }, -1);
    }
}
