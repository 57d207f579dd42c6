//! Stack Error Handling
//!
//! `StackError` is the error type of every fallible stack operation. Each
//! variant belongs to one `ErrorKind`, which is what embedders branch on.
//!
//! The C ABI cannot return a `Result`, so it records the last error in
//! thread-local storage instead:
//! ```ignore
//! let ptr = valstack_get_buffer(stack, 99, &mut len);
//! if valstack_has_error() {
//!     let msg = valstack_take_error();
//!     // Handle error...
//! }
//! ```
//!
//! Allocation failure is not represented here. It is fatal and panics at the
//! point of failure.

use std::cell::RefCell;
use std::ffi::CString;
use std::fmt;

/// Error category, stable across variants
#[repr(i32)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ErrorKind {
    /// An index or depth outside the valid range
    Range = 1,
    /// A slot holds a value of the wrong kind for the operation
    Type = 2,
    /// API misuse (wrong thread, null handle)
    Logic = 3,
    /// Allocator exhaustion
    ///
    /// Names the fatal condition in logs and panic messages. No `StackError`
    /// has this kind, so `valstack_error_kind` never returns 4.
    Allocation = 4,
}

impl fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            ErrorKind::Range => "RangeError",
            ErrorKind::Type => "TypeError",
            ErrorKind::Logic => "LogicError",
            ErrorKind::Allocation => "AllocationFailure",
        };
        f.write_str(name)
    }
}

/// Error raised by stack operations
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StackError {
    /// Index does not resolve to a slot in `[0, top)`
    IndexOutOfRange { index: isize, top: usize },
    /// Push would exceed the configured depth bound
    StackOverflow { limit: usize },
    /// Pop from an empty stack
    StackUnderflow,
    /// Slot is required to hold a buffer but does not
    NotABuffer { index: usize },
    /// Slot is required to hold a resizable buffer but does not
    NotADynamicBuffer { index: usize },
    /// Stack used from a thread other than the one that created it
    WrongThread,
    /// Null stack handle passed across the C ABI
    NullStack,
}

impl StackError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            StackError::IndexOutOfRange { .. }
            | StackError::StackOverflow { .. }
            | StackError::StackUnderflow => ErrorKind::Range,
            StackError::NotABuffer { .. } | StackError::NotADynamicBuffer { .. } => {
                ErrorKind::Type
            }
            StackError::WrongThread | StackError::NullStack => ErrorKind::Logic,
        }
    }
}

impl fmt::Display for StackError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            StackError::IndexOutOfRange { index, top } => {
                write!(f, "{}: invalid stack index {} (top={})", self.kind(), index, top)
            }
            StackError::StackOverflow { limit } => {
                write!(f, "{}: value stack limit {} reached", self.kind(), limit)
            }
            StackError::StackUnderflow => write!(f, "{}: pop from empty stack", self.kind()),
            StackError::NotABuffer { index } => {
                write!(f, "{}: value at index {} is not a buffer", self.kind(), index)
            }
            StackError::NotADynamicBuffer { index } => write!(
                f,
                "{}: value at index {} is not a dynamic buffer",
                self.kind(),
                index
            ),
            StackError::WrongThread => {
                write!(f, "{}: stack used outside its owning thread", self.kind())
            }
            StackError::NullStack => write!(f, "{}: null stack handle", self.kind()),
        }
    }
}

impl std::error::Error for StackError {}

thread_local! {
    /// Thread-local storage for the last error raised through the C ABI
    static LAST_ERROR: RefCell<Option<StackError>> = const { RefCell::new(None) };

    /// Cached C string for FFI access (avoids allocation on every get)
    static ERROR_CSTRING: RefCell<Option<CString>> = const { RefCell::new(None) };
}

/// Record an error as the last error of this thread
///
/// Note: This clears any cached CString to prevent stale pointer access.
pub fn set_last_error(err: StackError) {
    ERROR_CSTRING.with(|cs| *cs.borrow_mut() = None);
    LAST_ERROR.with(|e| *e.borrow_mut() = Some(err));
}

/// Take (and clear) the last error of this thread
pub fn take_last_error() -> Option<StackError> {
    LAST_ERROR.with(|e| e.borrow_mut().take())
}

/// Kind of the pending error, if any
pub fn last_error_kind() -> Option<ErrorKind> {
    LAST_ERROR.with(|e| e.borrow().as_ref().map(StackError::kind))
}

pub fn has_last_error() -> bool {
    LAST_ERROR.with(|e| e.borrow().is_some())
}

pub fn clear_last_error() {
    LAST_ERROR.with(|e| *e.borrow_mut() = None);
    ERROR_CSTRING.with(|e| *e.borrow_mut() = None);
}

/// Cache `msg` as a C string and return a pointer into the cache
///
/// Error messages never contain NUL bytes; a failed conversion yields null.
pub(crate) fn cache_error_cstring(msg: String) -> *const std::ffi::c_char {
    match CString::new(msg) {
        Ok(cstring) => ERROR_CSTRING.with(|cs| {
            let ptr = cstring.as_ptr();
            *cs.borrow_mut() = Some(cstring);
            ptr
        }),
        Err(_) => std::ptr::null(),
    }
}

/// Message of the pending error without clearing it
pub(crate) fn last_error_message() -> Option<String> {
    LAST_ERROR.with(|e| e.borrow().as_ref().map(|err| err.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_set_and_take_error() {
        clear_last_error();
        assert!(!has_last_error());

        set_last_error(StackError::StackUnderflow);
        assert!(has_last_error());
        assert_eq!(last_error_kind(), Some(ErrorKind::Range));

        let error = take_last_error();
        assert_eq!(error, Some(StackError::StackUnderflow));
        assert!(!has_last_error());
    }

    #[test]
    fn test_clear_error() {
        set_last_error(StackError::WrongThread);
        assert!(has_last_error());

        clear_last_error();
        assert!(!has_last_error());
        assert!(take_last_error().is_none());
    }

    #[test]
    fn test_error_kinds() {
        assert_eq!(
            StackError::IndexOutOfRange { index: 5, top: 2 }.kind(),
            ErrorKind::Range
        );
        assert_eq!(StackError::StackOverflow { limit: 8 }.kind(), ErrorKind::Range);
        assert_eq!(StackError::NotABuffer { index: 0 }.kind(), ErrorKind::Type);
        assert_eq!(StackError::NotADynamicBuffer { index: 0 }.kind(), ErrorKind::Type);
        assert_eq!(StackError::NullStack.kind(), ErrorKind::Logic);
    }

    #[test]
    fn test_allocation_is_never_recorded() {
        let all = [
            StackError::IndexOutOfRange { index: 0, top: 0 },
            StackError::StackOverflow { limit: 1 },
            StackError::StackUnderflow,
            StackError::NotABuffer { index: 0 },
            StackError::NotADynamicBuffer { index: 0 },
            StackError::WrongThread,
            StackError::NullStack,
        ];
        assert!(all.iter().all(|e| e.kind() != ErrorKind::Allocation));
        assert_eq!(ErrorKind::Allocation.to_string(), "AllocationFailure");
    }

    #[test]
    fn test_display_names_kind() {
        let msg = StackError::IndexOutOfRange { index: -13, top: 12 }.to_string();
        assert_eq!(msg, "RangeError: invalid stack index -13 (top=12)");
    }
}
