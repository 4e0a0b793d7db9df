//! C-ABI wrapper around `roger-core`.
//!
//! # Overview
//! Lets a workflow host written in any language with a C FFI run CRM rows,
//! load selector options and check credentials. The host supplies a transport
//! callback; the library builds each request, hands it to the callback and
//! interprets the answer.
//!
//! # Design
//! - Every `extern "C"` function wraps its body in `catch_unwind` so panics
//!   never cross the FFI boundary.
//! - Rows, parameters and results cross as JSON C strings, so the C surface
//!   stays small while the core keeps its typed model.
//! - A session owns the credentials, the transport and the workspace column
//!   cache; option loads on the same session share that cache.
//! - The C caller owns all returned pointers and must call the matching
//!   `rr_free_*` function to release them.

pub mod types;

use std::ffi::{c_void, CStr, CString};
use std::os::raw::c_char;
use std::panic::{catch_unwind, AssertUnwindSafe};

use roger_core::credentials::DEFAULT_BASE_URL;
use roger_core::{
    AdapterError, CredentialStatus, Credentials, Dispatcher, ExecutionSettings, InputRow,
    Operation, OptionLoader, OptionSession, Resource, RogerClient,
};
use serde_json::{json, Map, Value};
use tracing::{debug, warn};

use types::*;

fn read_string(ptr: *const c_char) -> String {
    unsafe { CStr::from_ptr(ptr) }.to_string_lossy().into_owned()
}

fn new_session(credentials: Credentials, transport: FfiTransportFn, user_data: *mut c_void) -> *mut FfiSession {
    debug!(base_url = %credentials.api_base_url, "session created");
    let transport = CallbackTransport {
        callback: transport,
        user_data,
    };
    let inner = OptionSession::new(RogerClient::new(credentials), transport);
    Box::into_raw(Box::new(FfiSession { inner }))
}

// ---------------------------------------------------------------------------
// Session lifecycle
// ---------------------------------------------------------------------------

/// Create a session for `api_key`.
///
/// `api_base_url` may be null, in which case the public API URL is used.
/// `user_data` is passed back untouched to every `transport` call.
/// Returns null if `api_key` or `transport` is null, or on internal panic.
/// The caller must free the returned pointer with `rr_session_free`.
#[unsafe(no_mangle)]
pub extern "C" fn rr_session_new(
    api_key: *const c_char,
    api_base_url: *const c_char,
    transport: Option<FfiTransportFn>,
    user_data: *mut c_void,
) -> *mut FfiSession {
    catch_unwind(|| {
        let Some(transport) = transport else {
            return std::ptr::null_mut();
        };
        if api_key.is_null() {
            return std::ptr::null_mut();
        }
        let base_url = if api_base_url.is_null() {
            DEFAULT_BASE_URL.to_string()
        } else {
            read_string(api_base_url)
        };
        new_session(Credentials::new(read_string(api_key), &base_url), transport, user_data)
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Create a session from `ROGERROGER_API_KEY` and the optional
/// `ROGERROGER_API_BASE_URL`.
///
/// Returns null if `transport` is null or the environment holds no usable key.
#[unsafe(no_mangle)]
pub extern "C" fn rr_session_from_env(transport: Option<FfiTransportFn>, user_data: *mut c_void) -> *mut FfiSession {
    catch_unwind(|| {
        let Some(transport) = transport else {
            return std::ptr::null_mut();
        };
        match Credentials::from_env() {
            Ok(credentials) => new_session(credentials, transport, user_data),
            Err(e) => {
                warn!(error = %e, "no credentials in environment");
                std::ptr::null_mut()
            }
        }
    })
    .unwrap_or(std::ptr::null_mut())
}

/// Free a session created by `rr_session_new`. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rr_session_free(session: *mut FfiSession) {
    if !session.is_null() {
        let _ = catch_unwind(AssertUnwindSafe(|| {
            drop(unsafe { Box::from_raw(session) });
        }));
    }
}

// ---------------------------------------------------------------------------
// Session operations
// ---------------------------------------------------------------------------

/// Run rows through the session.
///
/// `rows_json` is a JSON array of `{"parameters": {...}, "json": {...}}`.
/// On success `json` holds an array of `{"json": {...}, "pairedItem": n}`.
/// When `continue_on_fail` is false the first failing row aborts the run and
/// its index is reported in `item_index`.
#[unsafe(no_mangle)]
pub extern "C" fn rr_execute(
    session: *const FfiSession,
    rows_json: *const c_char,
    continue_on_fail: bool,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if session.is_null() {
            return FfiResult::null_arg("session");
        }
        if rows_json.is_null() {
            return FfiResult::null_arg("rows_json");
        }
        let session = unsafe { &*session };
        let rows: Vec<InputRow> = match serde_json::from_str(&read_string(rows_json)) {
            Ok(rows) => rows,
            Err(e) => return FfiResult::invalid_json("rows_json", e),
        };
        let dispatcher = Dispatcher::new(session.inner.client(), session.inner.transport());
        match dispatcher.execute(&rows, ExecutionSettings { continue_on_fail }) {
            Ok(records) => FfiResult::ok(&records),
            Err(e) => FfiResult::from_error(&e.source, Some(e.item_index)),
        }
    }))
    .unwrap_or_else(|_| {
        warn!("panic in rr_execute");
        FfiResult::panic("panic in rr_execute")
    })
}

/// Run the option loader named `loader_name` (e.g. `getPeople`).
///
/// `parameters_json` is the current row's parameter object, or null; only
/// `getColumns` reads it. On success `json` holds `[{"name", "value"}]`.
#[unsafe(no_mangle)]
pub extern "C" fn rr_load_options(
    session: *mut FfiSession,
    loader_name: *const c_char,
    parameters_json: *const c_char,
) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if session.is_null() {
            return FfiResult::null_arg("session");
        }
        if loader_name.is_null() {
            return FfiResult::null_arg("loader_name");
        }
        let session = unsafe { &mut *session };
        let loader: OptionLoader = match read_string(loader_name).parse() {
            Ok(loader) => loader,
            Err(e) => return FfiResult::from_error(&e, None),
        };
        let parameters = if parameters_json.is_null() {
            Value::Null
        } else {
            match serde_json::from_str(&read_string(parameters_json)) {
                Ok(parameters) => parameters,
                Err(e) => return FfiResult::invalid_json("parameters_json", e),
            }
        };
        match session.inner.load(loader, &parameters) {
            Ok(options) => FfiResult::ok(&options),
            Err(e) => FfiResult::from_error(&e, None),
        }
    }))
    .unwrap_or_else(|_| {
        warn!("panic in rr_load_options");
        FfiResult::panic("panic in rr_load_options")
    })
}

/// Check the session's credentials.
///
/// A completed check yields `{"status": "OK"}` or
/// `{"status": "Error", "message": "..."}`; only a failed exchange is an error.
#[unsafe(no_mangle)]
pub extern "C" fn rr_test_credentials(session: *const FfiSession) -> *mut FfiResult {
    catch_unwind(AssertUnwindSafe(|| {
        if session.is_null() {
            return FfiResult::null_arg("session");
        }
        let session = unsafe { &*session };
        match session.inner.client().test_credentials(session.inner.transport()) {
            Ok(CredentialStatus::Valid) => FfiResult::ok(&json!({"status": "OK"})),
            Ok(CredentialStatus::Invalid { message }) => {
                FfiResult::ok(&json!({"status": "Error", "message": message}))
            }
            Err(source) => FfiResult::from_error(
                &AdapterError::Request {
                    action: "test credentials".to_string(),
                    source,
                },
                None,
            ),
        }
    }))
    .unwrap_or_else(|_| {
        warn!("panic in rr_test_credentials");
        FfiResult::panic("panic in rr_test_credentials")
    })
}

/// Describe the selectors: `{"resources": [...], "operations": {resource: [...]}}`.
///
/// Returns null on internal panic. Free with `rr_free_string`.
#[unsafe(no_mangle)]
pub extern "C" fn rr_describe() -> *mut c_char {
    catch_unwind(|| {
        let operations: Map<String, Value> = Resource::ALL
            .iter()
            .map(|r| (r.as_str().to_string(), json!(Operation::catalog(*r))))
            .collect();
        let description = json!({
            "resources": Resource::selectable(),
            "operations": operations,
        });
        to_c_string(description.to_string())
    })
    .unwrap_or(std::ptr::null_mut())
}

// ---------------------------------------------------------------------------
// Free functions
// ---------------------------------------------------------------------------

/// Free an `FfiResult` returned by any session operation. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rr_free_result(result: *mut FfiResult) {
    if result.is_null() {
        return;
    }
    let _ = catch_unwind(|| {
        let result = unsafe { Box::from_raw(result) };
        if !result.error_message.is_null() {
            drop(unsafe { CString::from_raw(result.error_message) });
        }
        if !result.json.is_null() {
            drop(unsafe { CString::from_raw(result.json) });
        }
    });
}

/// Free a C string allocated by this library. Safe to call with null.
#[unsafe(no_mangle)]
pub extern "C" fn rr_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = catch_unwind(|| {
            drop(unsafe { CString::from_raw(s) });
        });
    }
}

// ---------------------------------------------------------------------------
// Unit tests
// ---------------------------------------------------------------------------
