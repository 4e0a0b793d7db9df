//! `#[repr(C)]` types for the FFI boundary.
//!
//! # Design
//! Requests handed to the host's transport callback are borrowed: the
//! library owns every string and releases them once the callback returns.
//! Responses are filled in by the host and only read. Results travel back
//! as one `FfiResult` envelope whose payload is a JSON C string.

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;

use roger_core::{AdapterError, ApiError, HttpMethod, HttpRequest, HttpResponse, OptionSession, Transport};
use tracing::debug;

/// Host function that performs one HTTP round-trip.
///
/// Must fill `response` and return 0, or return non-zero when no response
/// was received. `response->body` stays owned by the host and must remain
/// valid until the callback's caller has copied it, i.e. until the next
/// callback invocation or the end of the current `rr_*` call.
pub type FfiTransportFn =
    extern "C" fn(user_data: *mut c_void, request: *const FfiHttpRequest, response: *mut FfiHttpResponse) -> i32;

/// Opaque handle to a session: credentials, host transport and the
/// workspace column cache. C callers receive a pointer to this and pass it
/// back into every FFI function.
pub struct FfiSession {
    pub(crate) inner: OptionSession<CallbackTransport>,
}

// ---------------------------------------------------------------------------
// Request types
// ---------------------------------------------------------------------------

/// HTTP method as a C enum.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiHttpMethod {
    Get = 0,
    Post = 1,
    Patch = 2,
    Delete = 3,
}

impl From<HttpMethod> for FfiHttpMethod {
    fn from(m: HttpMethod) -> Self {
        match m {
            HttpMethod::Get => FfiHttpMethod::Get,
            HttpMethod::Post => FfiHttpMethod::Post,
            HttpMethod::Patch => FfiHttpMethod::Patch,
            HttpMethod::Delete => FfiHttpMethod::Delete,
        }
    }
}

/// A single HTTP header as a key-value pair of C strings.
#[repr(C)]
pub struct FfiHeader {
    pub key: *mut c_char,
    pub value: *mut c_char,
}

/// An HTTP request described as C-compatible plain data.
///
/// Only valid for the duration of the transport callback. `body` is null
/// when the request has none.
#[repr(C)]
pub struct FfiHttpRequest {
    pub method: FfiHttpMethod,
    pub url: *mut c_char,
    pub headers: *mut FfiHeader,
    pub headers_len: u32,
    pub body: *mut c_char,
}

fn c_string(s: String) -> Result<*mut c_char, ApiError> {
    CString::new(s)
        .map(CString::into_raw)
        .map_err(|_| ApiError::Transport("request contains an interior NUL byte".to_string()))
}

impl FfiHttpRequest {
    /// Convert a core `HttpRequest`. Strings are released on drop.
    pub(crate) fn from_core(req: &HttpRequest) -> Result<Self, ApiError> {
        // Build the struct first so a failure half-way is still cleaned up.
        let mut ffi = FfiHttpRequest {
            method: req.method.into(),
            url: std::ptr::null_mut(),
            headers: std::ptr::null_mut(),
            headers_len: 0,
            body: std::ptr::null_mut(),
        };
        ffi.url = c_string(req.url.clone())?;
        if let Some(body) = &req.body {
            ffi.body = c_string(body.clone())?;
        }

        let mut headers = Vec::with_capacity(req.headers.len());
        for (k, v) in &req.headers {
            match (c_string(k.clone()), c_string(v.clone())) {
                (Ok(key), Ok(value)) => headers.push(FfiHeader { key, value }),
                (key, value) => {
                    let err = ApiError::Transport(format!("header {k} contains an interior NUL byte"));
                    for ptr in [key, value].into_iter().flatten() {
                        drop(unsafe { CString::from_raw(ptr) });
                    }
                    free_headers(headers);
                    return Err(err);
                }
            }
        }
        if !headers.is_empty() {
            ffi.headers_len = headers.len() as u32;
            ffi.headers = Box::into_raw(headers.into_boxed_slice()) as *mut FfiHeader;
        }
        Ok(ffi)
    }
}

fn free_headers(headers: Vec<FfiHeader>) {
    for h in headers {
        if !h.key.is_null() {
            drop(unsafe { CString::from_raw(h.key) });
        }
        if !h.value.is_null() {
            drop(unsafe { CString::from_raw(h.value) });
        }
    }
}

impl Drop for FfiHttpRequest {
    fn drop(&mut self) {
        if !self.url.is_null() {
            drop(unsafe { CString::from_raw(self.url) });
        }
        if !self.body.is_null() {
            drop(unsafe { CString::from_raw(self.body) });
        }
        if !self.headers.is_null() && self.headers_len > 0 {
            let len = self.headers_len as usize;
            let slice = std::ptr::slice_from_raw_parts_mut(self.headers, len);
            let headers = unsafe { Box::from_raw(slice) };
            free_headers(headers.into_vec());
        }
    }
}

// ---------------------------------------------------------------------------
// Response input (host-provided, not freed by us)
// ---------------------------------------------------------------------------

/// An HTTP response described as C-compatible plain data.
///
/// The host fills this in from its transport callback. A null `body` is
/// read as empty. The FFI layer reads but does not free these fields.
#[repr(C)]
pub struct FfiHttpResponse {
    pub status: u16,
    pub body: *const c_char,
}

/// `Transport` that forwards every request to the host callback.
pub(crate) struct CallbackTransport {
    pub(crate) callback: FfiTransportFn,
    pub(crate) user_data: *mut c_void,
}

impl Transport for CallbackTransport {
    fn send(&self, request: &HttpRequest) -> Result<HttpResponse, ApiError> {
        let ffi_request = FfiHttpRequest::from_core(request)?;
        let mut response = FfiHttpResponse {
            status: 0,
            body: std::ptr::null(),
        };
        let code = (self.callback)(self.user_data, &ffi_request, &mut response);
        if code != 0 {
            return Err(ApiError::Transport(format!("host transport returned {code}")));
        }
        let body = if response.body.is_null() {
            String::new()
        } else {
            unsafe { CStr::from_ptr(response.body) }.to_string_lossy().into_owned()
        };
        debug!(status = response.status, "host transport answered");
        Ok(HttpResponse {
            status: response.status,
            headers: Vec::new(),
            body,
        })
    }
}

// ---------------------------------------------------------------------------
// Result types
// ---------------------------------------------------------------------------

/// Error codes returned in `FfiResult`.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FfiErrorCode {
    Ok = 0,
    /// A row or loader was configured wrongly (unknown resource, missing id, ...).
    Configuration = 1,
    /// The API or the host transport reported a failure.
    Request = 2,
    /// The JSON passed in could not be parsed.
    InvalidJson = 3,
    Panic = 4,
    NullArg = 5,
}

/// Result envelope for every session operation.
///
/// On success `error_code` is `Ok`, `error_message` is null, and `json`
/// holds the payload. On failure `json` is null, `error_message` is a
/// human-readable C string, and `item_index` names the failing row (or is
/// -1 when the failure is not tied to a row).
#[repr(C)]
pub struct FfiResult {
    pub error_code: FfiErrorCode,
    pub error_message: *mut c_char,
    pub item_index: i64,
    pub json: *mut c_char,
}

/// Lossy C string: interior NULs are stripped rather than failing.
pub(crate) fn to_c_string(s: String) -> *mut c_char {
    let cleaned = if s.contains('\0') { s.replace('\0', "") } else { s };
    CString::new(cleaned).unwrap_or_default().into_raw()
}

impl FfiResult {
    fn boxed(error_code: FfiErrorCode, error_message: Option<String>, item_index: i64, json: Option<String>) -> *mut Self {
        Box::into_raw(Box::new(FfiResult {
            error_code,
            error_message: error_message.map_or(std::ptr::null_mut(), to_c_string),
            item_index,
            json: json.map_or(std::ptr::null_mut(), to_c_string),
        }))
    }

    /// Build a success result carrying `payload` serialized as JSON.
    pub(crate) fn ok<T: serde::Serialize + ?Sized>(payload: &T) -> *mut Self {
        match serde_json::to_string(payload) {
            Ok(json) => Self::boxed(FfiErrorCode::Ok, None, -1, Some(json)),
            Err(e) => Self::boxed(FfiErrorCode::InvalidJson, Some(e.to_string()), -1, None),
        }
    }

    /// Build an error result from an `AdapterError`.
    pub(crate) fn from_error(err: &AdapterError, item_index: Option<usize>) -> *mut Self {
        let code = if err.is_configuration() {
            FfiErrorCode::Configuration
        } else {
            FfiErrorCode::Request
        };
        let index = item_index.map_or(-1, |i| i as i64);
        Self::boxed(code, Some(err.to_string()), index, None)
    }

    pub(crate) fn invalid_json(what: &str, err: serde_json::Error) -> *mut Self {
        Self::boxed(FfiErrorCode::InvalidJson, Some(format!("invalid {what}: {err}")), -1, None)
    }

    /// Build an error result for a null argument.
    pub(crate) fn null_arg(name: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::NullArg, Some(format!("null argument: {name}")), -1, None)
    }

    /// Build an error result for a caught panic.
    pub(crate) fn panic(msg: &str) -> *mut Self {
        Self::boxed(FfiErrorCode::Panic, Some(msg.to_string()), -1, None)
    }
}
