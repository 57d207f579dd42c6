//! C ABI for embedders
//!
//! Thin wrappers over `ValueStack`. Errors never unwind across the boundary:
//! a failing call returns a sentinel (`-1`, `false` or null) and records the
//! error in the thread-local last-error slot, readable with
//! `valstack_get_error` / `valstack_take_error`.
//!
//! Every call that takes a stack checks that it runs on the thread that
//! created the stack and fails with a `LogicError` otherwise.

use crate::error::{
    StackError, cache_error_cstring, clear_last_error, has_last_error, last_error_kind,
    last_error_message, set_last_error, take_last_error,
};
use crate::stack::ValueStack;
use std::ffi::{CStr, CString, c_char, c_void};
use std::ptr;

/// Resolve a raw stack handle, checking null and thread ownership
///
/// # Safety
/// `stack` must be null or a pointer returned by `valstack_new` that has not
/// been freed.
unsafe fn stack_mut<'a>(stack: *mut ValueStack) -> Result<&'a mut ValueStack, StackError> {
    let stack = unsafe { stack.as_mut() }.ok_or(StackError::NullStack)?;
    stack.check_owner()?;
    Ok(stack)
}

fn index_or_record(result: Result<usize, StackError>) -> isize {
    match result {
        Ok(idx) => idx as isize,
        Err(e) => {
            set_last_error(e);
            -1
        }
    }
}

/// Allocate a new value stack
///
/// The caller owns the stack and must release it with `valstack_free` on the
/// same thread.
#[unsafe(no_mangle)]
pub extern "C" fn valstack_new() -> *mut ValueStack {
    Box::into_raw(Box::new(ValueStack::new()))
}

/// Free a value stack and every value on it
///
/// # Safety
/// The pointer must have been returned by `valstack_new` and not freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_free(stack: *mut ValueStack) {
    if stack.is_null() {
        return;
    }
    if let Err(e) = unsafe { stack_mut(stack) } {
        set_last_error(e);
        return;
    }
    unsafe {
        drop(Box::from_raw(stack));
    }
}

/// Number of live slots, or -1 on error
///
/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_get_top(stack: *mut ValueStack) -> isize {
    index_or_record(unsafe { stack_mut(stack) }.map(|s| s.top()))
}

/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_push_undefined(stack: *mut ValueStack) -> isize {
    index_or_record(unsafe { stack_mut(stack) }.and_then(|s| s.push_undefined()))
}

/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_push_null(stack: *mut ValueStack) -> isize {
    index_or_record(unsafe { stack_mut(stack) }.and_then(|s| s.push_null()))
}

/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_push_boolean(stack: *mut ValueStack, value: bool) -> isize {
    index_or_record(unsafe { stack_mut(stack) }.and_then(|s| s.push_boolean(value)))
}

/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_push_number(stack: *mut ValueStack, value: f64) -> isize {
    index_or_record(unsafe { stack_mut(stack) }.and_then(|s| s.push_number(value)))
}

/// Push a copy of a NUL-terminated string (invalid UTF-8 is replaced)
///
/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`; `value` must
/// be null or a valid NUL-terminated string.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_push_string(stack: *mut ValueStack, value: *const c_char) -> isize {
    let result = unsafe { stack_mut(stack) }.and_then(|s| {
        if value.is_null() {
            return s.push_null();
        }
        let text = unsafe { CStr::from_ptr(value) }.to_string_lossy();
        s.push_string(&text)
    });
    index_or_record(result)
}

/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_push_object(stack: *mut ValueStack) -> isize {
    index_or_record(unsafe { stack_mut(stack) }.and_then(|s| s.push_object()))
}

/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_push_fixed_buffer(stack: *mut ValueStack, size: usize) -> isize {
    index_or_record(unsafe { stack_mut(stack) }.and_then(|s| s.push_fixed_buffer(size)))
}

/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_push_dynamic_buffer(
    stack: *mut ValueStack,
    size: usize,
) -> isize {
    index_or_record(unsafe { stack_mut(stack) }.and_then(|s| s.push_dynamic_buffer(size)))
}

/// Pop and release the top value
///
/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_pop(stack: *mut ValueStack) -> bool {
    match unsafe { stack_mut(stack) }.and_then(|s| s.pop()) {
        Ok(_) => true,
        Err(e) => {
            set_last_error(e);
            false
        }
    }
}

/// Get the buffer stored at `index`
///
/// Writes the byte length to `out_size` (if non-null) and returns the start
/// of the buffer. When the length is 0 (not a buffer, or an empty buffer)
/// the returned pointer is unspecified and must not be used; this
/// implementation returns null. On a range error the length is 0, null is
/// returned, and the error is recorded.
///
/// The pointer stays valid until the stack is next mutated.
///
/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`; `out_size`
/// must be null or valid for writes.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_get_buffer(
    stack: *mut ValueStack,
    index: isize,
    out_size: *mut usize,
) -> *mut c_void {
    let (ptr, len) = match unsafe { stack_mut(stack) }.and_then(|s| s.get_buffer_mut(index)) {
        Ok(bytes) if !bytes.is_empty() => (bytes.as_mut_ptr() as *mut c_void, bytes.len()),
        Ok(_) => (ptr::null_mut(), 0),
        Err(e) => {
            set_last_error(e);
            (ptr::null_mut(), 0)
        }
    };
    if !out_size.is_null() {
        unsafe {
            *out_size = len;
        }
    }
    ptr
}

/// Dump the stack to a newly allocated C string
///
/// Free the result with `valstack_string_free`. Returns null only for a
/// null or foreign-thread stack.
///
/// # Safety
/// `stack` must be null or a live pointer from `valstack_new`.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_dump_context(stack: *mut ValueStack) -> *mut c_char {
    match unsafe { stack_mut(stack) } {
        // Dump output is printable ASCII, so it never contains NUL
        Ok(s) => CString::new(s.dump_context())
            .map(CString::into_raw)
            .unwrap_or(ptr::null_mut()),
        Err(e) => {
            set_last_error(e);
            ptr::null_mut()
        }
    }
}

/// Free a string returned by `valstack_dump_context`
///
/// # Safety
/// `s` must be null or a pointer returned by `valstack_dump_context` that
/// has not been freed.
#[unsafe(no_mangle)]
pub unsafe extern "C" fn valstack_string_free(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}

/// Check if there's a pending error
#[unsafe(no_mangle)]
pub extern "C" fn valstack_has_error() -> bool {
    has_last_error()
}

/// Kind of the pending error (see `ErrorKind`), or 0 if none
///
/// One of 1 (range), 2 (type) or 3 (logic). Allocation failure panics
/// instead of being recorded, so 4 never appears.
#[unsafe(no_mangle)]
pub extern "C" fn valstack_error_kind() -> i32 {
    last_error_kind().map_or(0, |kind| kind as i32)
}

/// Get the pending error message as a C string pointer
///
/// Returns null if no error is pending.
///
/// # WARNING: Pointer Lifetime
/// The returned pointer is only valid until the next call that sets, gets,
/// takes or clears the error. Copy the string immediately to keep it.
#[unsafe(no_mangle)]
pub extern "C" fn valstack_get_error() -> *const c_char {
    match last_error_message() {
        Some(msg) => cache_error_cstring(msg),
        None => ptr::null(),
    }
}

/// Take (and clear) the pending error, returning it as a C string
///
/// Returns null if no error is pending. Same pointer lifetime as
/// `valstack_get_error`.
#[unsafe(no_mangle)]
pub extern "C" fn valstack_take_error() -> *const c_char {
    match take_last_error() {
        Some(err) => cache_error_cstring(err.to_string()),
        None => ptr::null(),
    }
}

/// Clear any pending error
#[unsafe(no_mangle)]
pub extern "C" fn valstack_clear_error() {
    clear_last_error();
}
