//! C FFI bindings for sku-core
//!
//! This crate provides a C-compatible API so a native upload UI can hand a
//! set of files to the merge engine and read back the status log, the
//! merged table and the serialized output.

use sku_core::{Error, MergeConfig, MergeOutcome, StatusEntry};
use std::ffi::{CStr, CString};
use std::os::raw::c_char;
use std::path::PathBuf;
use std::ptr;

/// Opaque handle to the result of a merge
pub struct FfiMergeResult {
    statuses: Vec<StatusEntry>,
    /// `None` when no source was left to merge
    outcome: Option<MergeOutcome>,
}

fn to_c_string(s: &str) -> *mut c_char {
    CString::new(s).map(|s| s.into_raw()).unwrap_or(ptr::null_mut())
}

/// Merge the files at `paths`
///
/// `config_json` may be null to use the default settings.
///
/// # Safety
/// - `paths` must be a valid pointer to an array of `count` C strings
/// - `config_json` must be null or a valid C string
/// - Returns null if any path is null or not UTF-8, or the config is invalid
/// - Files that cannot be read show up as decode errors in the status log;
///   a batch with no valid sources still returns a handle, see
///   `sku_result_is_empty`
#[no_mangle]
pub unsafe extern "C" fn sku_merge_paths(
    paths: *const *const c_char,
    count: usize,
    config_json: *const c_char,
) -> *mut FfiMergeResult {
    if paths.is_null() {
        return ptr::null_mut();
    }

    let mut input_paths: Vec<PathBuf> = Vec::with_capacity(count);
    for i in 0..count {
        let path = *paths.add(i);
        if path.is_null() {
            return ptr::null_mut();
        }
        match CStr::from_ptr(path).to_str() {
            Ok(s) => input_paths.push(PathBuf::from(s)),
            Err(_) => return ptr::null_mut(),
        }
    }

    let config = if config_json.is_null() {
        MergeConfig::default()
    } else {
        let json = match CStr::from_ptr(config_json).to_str() {
            Ok(s) => s,
            Err(_) => return ptr::null_mut(),
        };
        match serde_json::from_str::<MergeConfig>(json) {
            Ok(c) => c,
            Err(_) => return ptr::null_mut(),
        }
    };

    let sources = match sku_core::collect_sources(&input_paths) {
        Ok(s) => s,
        Err(_) => return ptr::null_mut(),
    };

    let result = match sku_core::run(&sources, &config) {
        Ok(outcome) => FfiMergeResult {
            statuses: outcome.statuses.clone(),
            outcome: Some(outcome),
        },
        Err(Error::EmptyMergeSet { statuses }) => FfiMergeResult {
            statuses,
            outcome: None,
        },
        Err(_) => return ptr::null_mut(),
    };

    Box::into_raw(Box::new(result))
}

/// Free a merge result
///
/// # Safety
/// - `result` must be a valid pointer returned by `sku_merge_paths` or null
#[no_mangle]
pub unsafe extern "C" fn sku_free_result(result: *mut FfiMergeResult) {
    if !result.is_null() {
        drop(Box::from_raw(result));
    }
}

/// Whether the batch ended with no valid sources to merge
///
/// # Safety
/// - `result` must be a valid pointer returned by `sku_merge_paths`
#[no_mangle]
pub unsafe extern "C" fn sku_result_is_empty(result: *const FfiMergeResult) -> bool {
    if result.is_null() {
        return true;
    }
    (*result).outcome.is_none()
}

/// Get the number of status log entries
///
/// # Safety
/// - `result` must be a valid pointer returned by `sku_merge_paths`
#[no_mangle]
pub unsafe extern "C" fn sku_result_status_count(result: *const FfiMergeResult) -> usize {
    if result.is_null() {
        return 0;
    }
    (*result).statuses.len()
}

/// Get the source name of a status entry
///
/// # Safety
/// - `result` must be a valid pointer returned by `sku_merge_paths`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `sku_free_string`
#[no_mangle]
pub unsafe extern "C" fn sku_result_status_source(
    result: *const FfiMergeResult,
    index: usize,
) -> *mut c_char {
    if result.is_null() {
        return ptr::null_mut();
    }

    (&(*result).statuses)
        .get(index)
        .map(|s| to_c_string(&s.source))
        .unwrap_or(ptr::null_mut())
}

/// Get the outcome of a status entry as display text
///
/// # Safety
/// - `result` must be a valid pointer returned by `sku_merge_paths`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `sku_free_string`
#[no_mangle]
pub unsafe extern "C" fn sku_result_status_outcome(
    result: *const FfiMergeResult,
    index: usize,
) -> *mut c_char {
    if result.is_null() {
        return ptr::null_mut();
    }

    (&(*result).statuses)
        .get(index)
        .map(|s| to_c_string(&s.outcome.to_string()))
        .unwrap_or(ptr::null_mut())
}

/// Get the row count of the merged table
///
/// # Safety
/// - `result` must be a valid pointer returned by `sku_merge_paths`
#[no_mangle]
pub unsafe extern "C" fn sku_result_row_count(result: *const FfiMergeResult) -> usize {
    if result.is_null() {
        return 0;
    }
    (*result)
        .outcome
        .as_ref()
        .map(|o| o.merged.row_count())
        .unwrap_or(0)
}

/// Get the column count of the merged table
///
/// # Safety
/// - `result` must be a valid pointer returned by `sku_merge_paths`
#[no_mangle]
pub unsafe extern "C" fn sku_result_col_count(result: *const FfiMergeResult) -> usize {
    if result.is_null() {
        return 0;
    }
    (*result)
        .outcome
        .as_ref()
        .map(|o| o.merged.column_count())
        .unwrap_or(0)
}

/// Get a merged column name by index
///
/// # Safety
/// - `result` must be a valid pointer returned by `sku_merge_paths`
/// - Returns null if index is out of bounds
/// - Caller must free the returned string with `sku_free_string`
#[no_mangle]
pub unsafe extern "C" fn sku_result_col_name(
    result: *const FfiMergeResult,
    index: usize,
) -> *mut c_char {
    if result.is_null() {
        return ptr::null_mut();
    }

    (*result)
        .outcome
        .as_ref()
        .and_then(|o| o.merged.columns.get(index))
        .map(|c| to_c_string(&c.name))
        .unwrap_or(ptr::null_mut())
}

/// Get a merged cell value as a string (missing values are empty strings)
///
/// # Safety
/// - `result` must be a valid pointer returned by `sku_merge_paths`
/// - Returns null if row or col is out of bounds
/// - Caller must free the returned string with `sku_free_string`
#[no_mangle]
pub unsafe extern "C" fn sku_result_cell(
    result: *const FfiMergeResult,
    row: usize,
    col: usize,
) -> *mut c_char {
    if result.is_null() {
        return ptr::null_mut();
    }

    (*result)
        .outcome
        .as_ref()
        .and_then(|o| o.merged.rows.get(row))
        .and_then(|r| r.cells.get(col))
        .map(|c| to_c_string(&c.to_string_value()))
        .unwrap_or(ptr::null_mut())
}

/// Get the output format tag ("csv" or "xlsx")
///
/// # Safety
/// - `result` must be a valid pointer returned by `sku_merge_paths`
/// - Returns null when nothing was merged
/// - Caller must free the returned string with `sku_free_string`
#[no_mangle]
pub unsafe extern "C" fn sku_result_output_format(result: *const FfiMergeResult) -> *mut c_char {
    if result.is_null() {
        return ptr::null_mut();
    }

    (*result)
        .outcome
        .as_ref()
        .map(|o| to_c_string(o.output_format().extension()))
        .unwrap_or(ptr::null_mut())
}

/// Borrow the serialized output bytes
///
/// # Safety
/// - `result` must be a valid pointer returned by `sku_merge_paths`
/// - `len` must be a valid pointer; it receives the byte count
/// - The returned buffer lives as long as `result` and must not be freed
#[no_mangle]
pub unsafe extern "C" fn sku_result_output_bytes(
    result: *const FfiMergeResult,
    len: *mut usize,
) -> *const u8 {
    if result.is_null() || len.is_null() {
        return ptr::null();
    }

    match (*result).outcome.as_ref() {
        Some(o) => {
            *len = o.output.bytes.len();
            o.output.bytes.as_ptr()
        }
        None => {
            *len = 0;
            ptr::null()
        }
    }
}

/// Free a string returned by other FFI functions
///
/// # Safety
/// - `s` must be a valid pointer returned by a sku_* function or null
#[no_mangle]
pub unsafe extern "C" fn sku_free_string(s: *mut c_char) {
    if !s.is_null() {
        drop(CString::from_raw(s));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    unsafe fn take_string(s: *mut c_char) -> String {
        assert!(!s.is_null());
        let owned = CStr::from_ptr(s).to_str().unwrap().to_string();
        sku_free_string(s);
        owned
    }

    #[test]
    fn test_merge_paths_round_trip() {
        let dir = tempfile::tempdir().unwrap();
        let x = dir.path().join("X.csv");
        let y = dir.path().join("Y.csv");
        fs::write(&x, "Product Code,Price\n1,10\n2,20\n").unwrap();
        fs::write(&y, "Product Code,Color\n2,red\n3,blue\n").unwrap();

        let paths: Vec<CString> = [&x, &y]
            .iter()
            .map(|p| CString::new(p.to_str().unwrap()).unwrap())
            .collect();
        let ptrs: Vec<*const c_char> = paths.iter().map(|p| p.as_ptr()).collect();

        unsafe {
            let result = sku_merge_paths(ptrs.as_ptr(), ptrs.len(), ptr::null());
            assert!(!result.is_null());
            assert!(!sku_result_is_empty(result));

            assert_eq!(sku_result_status_count(result), 2);
            assert_eq!(take_string(sku_result_status_source(result, 0)), "X.csv");
            assert_eq!(take_string(sku_result_status_outcome(result, 1)), "loaded");

            assert_eq!(sku_result_row_count(result), 3);
            assert_eq!(sku_result_col_count(result), 3);
            assert_eq!(take_string(sku_result_col_name(result, 2)), "Y.csv_Color");
            assert_eq!(take_string(sku_result_cell(result, 1, 2)), "red");
            assert_eq!(take_string(sku_result_cell(result, 0, 2)), "");

            assert_eq!(take_string(sku_result_output_format(result)), "xlsx");
            let mut len = 0usize;
            let bytes = sku_result_output_bytes(result, &mut len);
            assert!(!bytes.is_null());
            assert!(len > 0);

            sku_free_result(result);
        }
    }

    #[test]
    fn test_merge_paths_with_no_valid_source() {
        let dir = tempfile::tempdir().unwrap();
        let z = dir.path().join("Z.csv");
        fs::write(&z, "SKU,Weight\n1,5\n").unwrap();

        let path = CString::new(z.to_str().unwrap()).unwrap();
        let ptrs = [path.as_ptr()];
        let config = CString::new(r#"{"merge_size_threshold": 10}"#).unwrap();

        unsafe {
            let result = sku_merge_paths(ptrs.as_ptr(), 1, config.as_ptr());
            assert!(!result.is_null());
            assert!(sku_result_is_empty(result));
            assert_eq!(
                take_string(sku_result_status_outcome(result, 0)),
                "missing key column"
            );
            assert!(sku_result_output_format(result).is_null());
            sku_free_result(result);
        }
    }

    #[test]
    fn test_null_path_returns_null() {
        let dir = tempfile::tempdir().unwrap();
        let x = dir.path().join("X.csv");
        fs::write(&x, "Product Code,Price\n1,10\n").unwrap();

        let path = CString::new(x.to_str().unwrap()).unwrap();
        let ptrs = [path.as_ptr(), ptr::null()];
        unsafe {
            let result = sku_merge_paths(ptrs.as_ptr(), ptrs.len(), ptr::null());
            assert!(result.is_null());
        }
    }

    #[test]
    fn test_non_utf8_path_returns_null() {
        let dir = tempfile::tempdir().unwrap();
        let x = dir.path().join("X.csv");
        fs::write(&x, "Product Code,Price\n1,10\n").unwrap();

        let good = CString::new(x.to_str().unwrap()).unwrap();
        let bad = CString::new(vec![0xff, 0xfe, b'a']).unwrap();
        let ptrs = [good.as_ptr(), bad.as_ptr()];
        unsafe {
            assert!(sku_merge_paths(ptrs.as_ptr(), ptrs.len(), ptr::null()).is_null());
        }
    }

    #[test]
    fn test_missing_file_is_decode_error_status() {
        let dir = tempfile::tempdir().unwrap();
        let x = dir.path().join("X.csv");
        fs::write(&x, "Product Code,Price\n1,10\n").unwrap();
        let gone = dir.path().join("gone.csv");

        let paths: Vec<CString> = [&gone, &x]
            .iter()
            .map(|p| CString::new(p.to_str().unwrap()).unwrap())
            .collect();
        let ptrs: Vec<*const c_char> = paths.iter().map(|p| p.as_ptr()).collect();

        unsafe {
            let result = sku_merge_paths(ptrs.as_ptr(), ptrs.len(), ptr::null());
            assert!(!result.is_null());
            assert!(!sku_result_is_empty(result));
            assert_eq!(take_string(sku_result_status_source(result, 0)), "gone.csv");
            assert!(take_string(sku_result_status_outcome(result, 0)).starts_with("decode error"));
            assert_eq!(sku_result_row_count(result), 1);
            sku_free_result(result);
        }
    }

    #[test]
    fn test_invalid_config_returns_null() {
        let config = CString::new("{not json").unwrap();
        let ptrs: [*const c_char; 0] = [];
        unsafe {
            let result = sku_merge_paths(ptrs.as_ptr(), 0, config.as_ptr());
            assert!(result.is_null());
        }
    }
}
