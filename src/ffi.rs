//! C FFI bindings for u-eda.
//!
//! Exposes the full analysis pipeline through a C-compatible interface:
//! CSV text and a JSON configuration go in, the JSON-encoded
//! [`AnalysisResult`](crate::pipeline::AnalysisResult) comes out.
//!
//! - **Owned strings**: results are heap `char*` released with `eda_free_string`
//! - **Null on failure**: the reason is available from `eda_last_error()`
//! - **Thread-local error message**, valid until the next call on the thread
//! - **`catch_unwind`**: panics never cross the FFI boundary
//!
//! # Safety
//!
//! Null pointer arguments are rejected with an error message, never
//! dereferenced.

use std::cell::RefCell;
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::panic;
use std::ptr;

use crate::csv_parser::CsvParser;
use crate::pipeline::run_full_analysis;

// ── Error handling ────────────────────────────────────────────────────

thread_local! {
    static LAST_ERROR: RefCell<Option<CString>> = const { RefCell::new(None) };
}

fn set_last_error(msg: &str) {
    LAST_ERROR.with(|cell| {
        // Interior NULs would make CString::new fail and drop the message.
        *cell.borrow_mut() = CString::new(msg.replace('\0', " ")).ok();
    });
}

fn clear_last_error() {
    LAST_ERROR.with(|cell| {
        *cell.borrow_mut() = None;
    });
}

/// Returns the last error message, or null if no error.
/// The returned string is valid until the next FFI call on this thread.
///
/// # Safety
/// The caller must not free the returned pointer.
#[no_mangle]
pub extern "C" fn eda_last_error() -> *const c_char {
    LAST_ERROR.with(|cell| {
        let borrow = cell.borrow();
        match borrow.as_ref() {
            Some(cstr) => cstr.as_ptr(),
            None => ptr::null(),
        }
    })
}

/// Clears the last error message.
#[no_mangle]
pub extern "C" fn eda_clear_error() {
    clear_last_error();
}

/// Borrows a C string argument as UTF-8.
///
/// # Safety
/// `ptr` must be null or a valid null-terminated string that outlives `'a`.
unsafe fn str_arg<'a>(ptr: *const c_char, name: &str) -> Result<&'a str, String> {
    if ptr.is_null() {
        return Err(format!("null {name} pointer"));
    }
    unsafe { CStr::from_ptr(ptr) }
        .to_str()
        .map_err(|e| format!("invalid UTF-8 in {name}: {e}"))
}

fn analyze(csv: &str, delimiter: u8, config_json: &str) -> Result<CString, String> {
    let df = CsvParser::new()
        .delimiter(delimiter)
        .parse_str(csv)
        .map_err(|e| e.to_string())?;
    let result = run_full_analysis(&df, config_json).map_err(|e| e.to_string())?;
    let json = result.to_json().map_err(|e| e.to_string())?;
    CString::new(json).map_err(|e| format!("result contains NUL byte: {e}"))
}

// ── Analysis ──────────────────────────────────────────────────────────

/// Runs the full analysis on comma-separated data.
///
/// Returns the JSON-encoded result, or null on failure (see
/// `eda_last_error`).
///
/// # Safety
/// - `csv_data` and `config_json` must be valid null-terminated UTF-8 strings.
/// - The returned string must be freed with `eda_free_string`.
#[no_mangle]
pub unsafe extern "C" fn eda_run_analysis(
    csv_data: *const c_char,
    config_json: *const c_char,
) -> *mut c_char {
    unsafe { eda_run_analysis_delimited(csv_data, b',' as c_char, config_json) }
}

/// Runs the full analysis on data with a custom field delimiter.
///
/// # Safety
/// Same contract as `eda_run_analysis`.
#[no_mangle]
pub unsafe extern "C" fn eda_run_analysis_delimited(
    csv_data: *const c_char,
    delimiter: c_char,
    config_json: *const c_char,
) -> *mut c_char {
    let result = panic::catch_unwind(|| {
        clear_last_error();
        let csv = unsafe { str_arg(csv_data, "csv_data") }?;
        let config = unsafe { str_arg(config_json, "config_json") }?;
        analyze(csv, delimiter as u8, config)
    });

    match result {
        Ok(Ok(json)) => json.into_raw(),
        Ok(Err(msg)) => {
            set_last_error(&msg);
            ptr::null_mut()
        }
        Err(_) => {
            set_last_error("panic in eda_run_analysis");
            ptr::null_mut()
        }
    }
}

/// Frees a string returned by `eda_run_analysis`.
///
/// # Safety
/// `s` must have been returned by a u-eda FFI function, or be null.
#[no_mangle]
pub unsafe extern "C" fn eda_free_string(s: *mut c_char) {
    if !s.is_null() {
        let _ = unsafe { CString::from_raw(s) };
    }
}

// ── Version ──────────────────────────────────────────────────────────

/// Returns the version string of u-eda.
///
/// # Safety
/// The returned string is a static string literal. Do not free it.
#[no_mangle]
pub extern "C" fn eda_version() -> *const c_char {
    c"0.1.0".as_ptr()
}

// ── Tests ─────────────────────────────────────────────────────────────

#[cfg(test)]
mod tests {
    use super::*;

    fn csv_text() -> String {
        let mut csv = String::from("x;y\n");
        for i in 0..25 {
            let x = i as f64 * 0.2;
            csv.push_str(&format!("{};{}\n", x, 1.5 * x + (x * 3.1).sin() * 0.1));
        }
        csv
    }

    fn last_error() -> String {
        let p = eda_last_error();
        assert!(!p.is_null());
        unsafe { CStr::from_ptr(p) }.to_str().unwrap().to_string()
    }

    #[test]
    fn ffi_version() {
        let v = eda_version();
        let s = unsafe { CStr::from_ptr(v) }.to_str().unwrap();
        assert_eq!(s, env!("CARGO_PKG_VERSION"));
    }

    #[test]
    fn ffi_error_lifecycle() {
        eda_clear_error();
        assert!(eda_last_error().is_null());

        set_last_error("test error");
        assert_eq!(last_error(), "test error");

        eda_clear_error();
        assert!(eda_last_error().is_null());
    }

    #[test]
    fn ffi_run_analysis_roundtrip() {
        let csv = CString::new(csv_text().replace(';', ",")).unwrap();
        let config = CString::new(r#"{"selectedIVs":["x"],"selectedDVs":["y"]}"#).unwrap();

        let out = unsafe { eda_run_analysis(csv.as_ptr(), config.as_ptr()) };
        assert!(!out.is_null());
        let json = unsafe { CStr::from_ptr(out) }.to_str().unwrap().to_string();
        unsafe { eda_free_string(out) };

        let value: serde_json::Value = serde_json::from_str(&json).unwrap();
        assert_eq!(value["metadata"]["original_rows"], 25);
        assert!(value["report_html"].as_str().unwrap().contains("<details"));
    }

    #[test]
    fn ffi_custom_delimiter() {
        let csv = CString::new(csv_text()).unwrap();
        let config = CString::new(r#"{"selectedIVs":["x"],"selectedDVs":["y"]}"#).unwrap();
        let out =
            unsafe { eda_run_analysis_delimited(csv.as_ptr(), b';' as c_char, config.as_ptr()) };
        assert!(!out.is_null());
        unsafe { eda_free_string(out) };
    }

    #[test]
    fn ffi_null_ptr() {
        let config = CString::new("{}").unwrap();
        let out = unsafe { eda_run_analysis(ptr::null(), config.as_ptr()) };
        assert!(out.is_null());
        assert_eq!(last_error(), "null csv_data pointer");
    }

    #[test]
    fn ffi_analysis_error_is_reported() {
        let csv = CString::new("x,y\n1,2\n2,4\n").unwrap();
        let config = CString::new(r#"{"selectedIVs":["z"],"selectedDVs":["y"]}"#).unwrap();
        let out = unsafe { eda_run_analysis(csv.as_ptr(), config.as_ptr()) };
        assert!(out.is_null());
        assert_eq!(last_error(), "column 'z' not found");
    }

    #[test]
    fn ffi_free_null_is_noop() {
        unsafe { eda_free_string(ptr::null_mut()) };
    }
}
