//! FFI bindings for the PCOS decision support core
//!
//! This module provides C-compatible functions for driving sessions from a UI
//! host. All functions use C strings (null-terminated) and return allocated
//! memory that must be freed by the caller using `cdss_free_string`.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::ptr;

use crate::config::CdssConfig;
use crate::error::CdssError;
use crate::pipeline::{assess_answers_json, CdssPipeline, Session};
use crate::types::RawAnswers;

// Thread-local storage for the last error message
thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Set the last error message
fn set_last_error(msg: &str) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = CString::new(msg).ok();
    });
}

/// Record a pipeline error as "CODE: message"
fn set_cdss_error(err: &CdssError) {
    set_last_error(&format!("{}: {err}", err.code()));
}

/// Clear the last error message
fn clear_last_error() {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = None;
    });
}

/// Helper to convert C string to Rust string
unsafe fn cstr_to_string(ptr: *const c_char) -> Option<String> {
    if ptr.is_null() {
        return None;
    }
    CStr::from_ptr(ptr).to_str().ok().map(|s| s.to_string())
}

/// Helper to convert Rust string to C string (caller must free)
fn string_to_cstr(s: &str) -> *mut c_char {
    match CString::new(s) {
        Ok(cstr) => cstr.into_raw(),
        Err(_) => ptr::null_mut(),
    }
}

/// Return the string or record the error and return NULL
fn result_to_cstr(result: Result<String, CdssError>) -> *mut c_char {
    match result {
        Ok(s) => string_to_cstr(&s),
        Err(e) => {
            set_cdss_error(&e);
            ptr::null_mut()
        }
    }
}

// ============================================================================
// Pipeline API
// ============================================================================

/// Opaque handle to a loaded pipeline
pub struct CdssPipelineHandle {
    pipeline: CdssPipeline,
}

/// Load artifacts and create a pipeline.
///
/// # Safety
/// - `config_json` must be a valid null-terminated C string or NULL; NULL uses
///   the default configuration (artifacts under `./artifacts`).
/// - Must be freed with `cdss_pipeline_free`.
/// - Returns NULL on error; call `cdss_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cdss_pipeline_new(config_json: *const c_char) -> *mut CdssPipelineHandle {
    clear_last_error();

    let config = if config_json.is_null() {
        CdssConfig::default()
    } else {
        let json_str = match cstr_to_string(config_json) {
            Some(s) => s,
            None => {
                set_last_error("Invalid config string pointer");
                return ptr::null_mut();
            }
        };
        match CdssConfig::from_json_str(&json_str) {
            Ok(config) => config,
            Err(e) => {
                set_cdss_error(&e);
                return ptr::null_mut();
            }
        }
    };

    match CdssPipeline::from_config(config) {
        Ok(pipeline) => Box::into_raw(Box::new(CdssPipelineHandle { pipeline })),
        Err(e) => {
            set_cdss_error(&e);
            ptr::null_mut()
        }
    }
}

/// Free a pipeline. Sessions created from it stay valid.
///
/// # Safety
/// - `pipeline` must be a valid pointer returned by `cdss_pipeline_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn cdss_pipeline_free(pipeline: *mut CdssPipelineHandle) {
    if !pipeline.is_null() {
        drop(Box::from_raw(pipeline));
    }
}

/// Assess a JSON object of answers without any session state.
///
/// # Safety
/// - `pipeline` must be a valid pointer returned by `cdss_pipeline_new`.
/// - `answers_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cdss_free_string`.
/// - Returns NULL on error; call `cdss_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cdss_assess(
    pipeline: *const CdssPipelineHandle,
    answers_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if pipeline.is_null() {
        set_last_error("Null pipeline pointer");
        return ptr::null_mut();
    }
    let handle = &*pipeline;

    let json_str = match cstr_to_string(answers_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid answers string pointer");
            return ptr::null_mut();
        }
    };

    result_to_cstr(assess_answers_json(&handle.pipeline, &json_str))
}

// ============================================================================
// Session API
// ============================================================================

/// Opaque handle to one user session
pub struct CdssSessionHandle {
    session: Session,
}

/// Start a session on a pipeline.
///
/// # Safety
/// - `pipeline` must be a valid pointer returned by `cdss_pipeline_new`.
/// - Must be freed with `cdss_session_free`.
/// - Returns NULL on error.
#[no_mangle]
pub unsafe extern "C" fn cdss_session_new(
    pipeline: *const CdssPipelineHandle,
) -> *mut CdssSessionHandle {
    clear_last_error();

    if pipeline.is_null() {
        set_last_error("Null pipeline pointer");
        return ptr::null_mut();
    }
    let handle = &*pipeline;

    let session = Session::new(handle.pipeline.clone());
    Box::into_raw(Box::new(CdssSessionHandle { session }))
}

/// Free a session.
///
/// # Safety
/// - `session` must be a valid pointer returned by `cdss_session_new`, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn cdss_session_free(session: *mut CdssSessionHandle) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Predict from a JSON object of answers and remember the result for
/// `cdss_session_explain_*`.
///
/// Returns `{"label": ..., "probability": ..., "summary": ...}`.
///
/// # Safety
/// - `session` must be a valid pointer returned by `cdss_session_new`.
/// - `answers_json` must be a valid null-terminated C string.
/// - Returns a newly allocated string that must be freed with `cdss_free_string`.
/// - Returns NULL on error; call `cdss_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cdss_session_predict(
    session: *mut CdssSessionHandle,
    answers_json: *const c_char,
) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &mut *session;

    let json_str = match cstr_to_string(answers_json) {
        Some(s) => s,
        None => {
            set_last_error("Invalid answers string pointer");
            return ptr::null_mut();
        }
    };

    let result = serde_json::from_str::<RawAnswers>(&json_str)
        .map_err(CdssError::from)
        .and_then(|answers| handle.session.predict(&answers))
        .map(|prediction| {
            serde_json::json!({
                "label": prediction.label,
                "probability": prediction.probability,
                "summary": prediction.summary(),
            })
            .to_string()
        });
    result_to_cstr(result)
}

/// Explain the session's last prediction as a self-contained HTML fragment.
///
/// # Safety
/// - `session` must be a valid pointer returned by `cdss_session_new`.
/// - Returns a newly allocated string that must be freed with `cdss_free_string`.
/// - Returns NULL on error (including no prior prediction); call
///   `cdss_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cdss_session_explain_html(session: *const CdssSessionHandle) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &*session;

    result_to_cstr(handle.session.explain_html())
}

/// Explain the session's last prediction as JSON.
///
/// # Safety
/// - `session` must be a valid pointer returned by `cdss_session_new`.
/// - Returns a newly allocated string that must be freed with `cdss_free_string`.
/// - Returns NULL on error; call `cdss_last_error` to get the error message.
#[no_mangle]
pub unsafe extern "C" fn cdss_session_explain_json(session: *const CdssSessionHandle) -> *mut c_char {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return ptr::null_mut();
    }
    let handle = &*session;

    let result = handle.session.explain().and_then(|explanation| {
        handle
            .session
            .pipeline()
            .renderer()
            .render_json(&explanation)
    });
    result_to_cstr(result)
}

/// Forget the session's last prediction.
///
/// # Safety
/// - `session` must be a valid pointer returned by `cdss_session_new`.
/// - Returns 0 on success, -1 on a NULL session.
#[no_mangle]
pub unsafe extern "C" fn cdss_session_reset(session: *mut CdssSessionHandle) -> i32 {
    clear_last_error();

    if session.is_null() {
        set_last_error("Null session pointer");
        return -1;
    }
    (*session).session.reset();
    0
}

// ============================================================================
// Memory Management
// ============================================================================

/// Free a string returned by cdss functions.
///
/// # Safety
/// - `ptr` must be a valid pointer returned by a cdss function, or NULL.
/// - After calling this function, the pointer is invalid.
#[no_mangle]
pub unsafe extern "C" fn cdss_free_string(ptr: *mut c_char) {
    if !ptr.is_null() {
        drop(CString::from_raw(ptr));
    }
}

// ============================================================================
// Error Handling
// ============================================================================

/// Get the last error message.
///
/// # Safety
/// - Returns a pointer to a thread-local error string.
/// - The returned pointer is valid until the next cdss function call on this thread.
/// - Do NOT free the returned pointer.
/// - Returns NULL if no error occurred.
#[no_mangle]
pub unsafe extern "C" fn cdss_last_error() -> *const c_char {
    LAST_ERROR.with(|e| match &*e.borrow() {
        Some(cstr) => cstr.as_ptr(),
        None => ptr::null(),
    })
}

// ============================================================================
// Version Information
// ============================================================================

/// Get the library version.
///
/// # Safety
/// - Returns a pointer to a static string. Do NOT free.
#[no_mangle]
pub unsafe extern "C" fn cdss_version() -> *const c_char {
    static VERSION: &[u8] = concat!(env!("CARGO_PKG_VERSION"), "\0").as_bytes();
    VERSION.as_ptr() as *const c_char
}
