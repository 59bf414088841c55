//! Evaluation engine module used by the `warden-plugin` integration tests.
//!
//! Denies a request when any of these hold:
//! - the rule set is `deny-all`
//! - the method is `DELETE`
//! - the URI starts with `/blocked`
//! - a header value contains the bytes `C0 BC`
//! - the body contains `attack`
//! - fewer or more body bytes arrive than `body_len` announces
//!
//! The layout below mirrors `warden_plugin::abi` field for field.

use std::ffi::c_void;
use std::slice;

#[repr(C)]
#[derive(Clone, Copy)]
pub struct WardenStr {
    data: *const u8,
    len: usize,
}

impl WardenStr {
    unsafe fn bytes<'a>(self) -> &'a [u8] {
        if self.data.is_null() || self.len == 0 {
            &[]
        } else {
            slice::from_raw_parts(self.data, self.len)
        }
    }
}

#[repr(C)]
#[derive(Clone, Copy)]
pub struct WardenHeader {
    name: WardenStr,
    value: WardenStr,
}

#[repr(C)]
pub struct WardenRequest {
    method: WardenStr,
    uri: WardenStr,
    headers: *const WardenHeader,
    headers_len: usize,
    body_len: u64,
    body: *mut c_void,
}

pub type WardenReadFn = unsafe extern "C" fn(body: *mut c_void, buf: *mut u8, len: usize) -> isize;

fn contains(haystack: &[u8], needle: &[u8]) -> bool {
    haystack.windows(needle.len()).any(|w| w == needle)
}

/// Reads the whole body in small steps, `None` on a read error.
unsafe fn read_body(request: &WardenRequest, read: WardenReadFn) -> Option<Vec<u8>> {
    let mut body = Vec::new();
    let mut buf = [0u8; 16];
    loop {
        let n = read(request.body, buf.as_mut_ptr(), buf.len());
        match usize::try_from(n) {
            Ok(0) => return Some(body),
            Ok(n) => body.extend_from_slice(&buf[..n]),
            Err(_) => return None,
        }
    }
}

#[no_mangle]
pub unsafe extern "C" fn WardenEvalRequest(
    _request_id: WardenStr,
    rules: WardenStr,
    request: *const WardenRequest,
    read: WardenReadFn,
) -> bool {
    let Some(request) = request.as_ref() else {
        return false;
    };
    if rules.bytes() == b"deny-all"
        || request.method.bytes() == b"DELETE"
        || request.uri.bytes().starts_with(b"/blocked")
    {
        return false;
    }

    let headers = if request.headers.is_null() {
        &[][..]
    } else {
        slice::from_raw_parts(request.headers, request.headers_len)
    };
    if headers.iter().any(|h| contains(h.value.bytes(), b"\xc0\xbc")) {
        return false;
    }

    match read_body(request, read) {
        Some(body) => body.len() as u64 == request.body_len && !contains(&body, b"attack"),
        None => false,
    }
}
