//! Buffer values and the typed buffer accessor
//!
//! Two buffer kinds exist:
//! - `FixedBuffer`: size fixed at creation (`Box<[u8]>`)
//! - `DynamicBuffer`: resizable (`Vec<u8>`), may be empty
//!
//! ## Pointer contract
//!
//! `get_buffer` never fails because a slot holds something other than a
//! buffer. "No bytes here" is expressed purely through a zero length:
//!
//! | slot                     | `len()` | `as_ptr()`     |
//! |--------------------------|---------|----------------|
//! | not a buffer             | 0       | unspecified    |
//! | buffer, zero length      | 0       | unspecified    |
//! | buffer, length `L > 0`   | `L`     | non-null       |
//!
//! When the length is 0 the pointer must not be dereferenced or compared
//! against anything. The returned `BufferView` borrows the stack, so the
//! stack cannot be mutated while a view is alive.

use crate::error::StackError;
use crate::stack::ValueStack;
use crate::value::Value;
use tracing::trace;

/// Which buffer variant a slot holds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum BufferKind {
    Fixed,
    Dynamic,
}

/// Byte region whose size never changes after creation
#[derive(Debug, Clone)]
pub struct FixedBuffer {
    data: Box<[u8]>,
}

impl FixedBuffer {
    /// Zero-filled buffer of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size].into_boxed_slice(),
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self { data: bytes.into() }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Resizable byte region
///
/// An empty `DynamicBuffer` holds no allocation; its storage pointer is
/// dangling and only meaningful together with a nonzero length.
#[derive(Debug, Clone)]
pub struct DynamicBuffer {
    data: Vec<u8>,
}

impl DynamicBuffer {
    /// Zero-filled buffer of `size` bytes
    pub fn new(size: usize) -> Self {
        Self {
            data: vec![0u8; size],
        }
    }

    pub fn from_bytes(bytes: &[u8]) -> Self {
        Self {
            data: bytes.to_vec(),
        }
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.data.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn capacity(&self) -> usize {
        self.data.capacity()
    }

    /// Resize in place; new bytes are zero-filled
    ///
    /// Shrinking to zero releases the allocation.
    pub fn resize(&mut self, new_len: usize) {
        self.data.resize(new_len, 0);
        if new_len == 0 {
            self.data.shrink_to_fit();
        }
    }

    #[inline]
    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    #[inline]
    pub fn as_mut_slice(&mut self) -> &mut [u8] {
        &mut self.data
    }
}

/// Borrowed, read-only view of a slot's buffer bytes
#[derive(Debug, Clone, Copy)]
pub struct BufferView<'a> {
    bytes: &'a [u8],
    kind: Option<BufferKind>,
}

impl<'a> BufferView<'a> {
    const NONE: BufferView<'static> = BufferView {
        bytes: &[],
        kind: None,
    };

    /// Start of the byte region; unspecified when `len() == 0`
    #[inline]
    pub fn as_ptr(&self) -> *const u8 {
        self.bytes.as_ptr()
    }

    #[inline]
    pub fn len(&self) -> usize {
        self.bytes.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.bytes.is_empty()
    }

    #[inline]
    pub fn as_bytes(&self) -> &'a [u8] {
        self.bytes
    }

    /// Buffer variant, or `None` when the slot is not a buffer
    #[inline]
    pub fn kind(&self) -> Option<BufferKind> {
        self.kind
    }
}

impl ValueStack {
    /// Get the buffer bytes stored at `index`
    ///
    /// Non-buffer values and empty buffers both yield a zero-length view.
    /// Only an index outside `[0, top)` is an error.
    pub fn get_buffer(&self, index: isize) -> Result<BufferView<'_>, StackError> {
        let value = self.get(index)?;
        let view = match value.buffer_bytes() {
            Some((bytes, kind)) => BufferView {
                bytes,
                kind: Some(kind),
            },
            None => BufferView::NONE,
        };
        Ok(view)
    }

    /// Mutable counterpart of `get_buffer`
    ///
    /// Non-buffer values yield an empty slice.
    pub fn get_buffer_mut(&mut self, index: isize) -> Result<&mut [u8], StackError> {
        let value = self.get_mut(index)?;
        Ok(value.buffer_bytes_mut().unwrap_or_default())
    }

    /// Like `get_buffer`, but a non-buffer value is a type error
    pub fn require_buffer(&self, index: isize) -> Result<BufferView<'_>, StackError> {
        let idx = self.require_index(index)?;
        let view = self.get_buffer(index)?;
        if view.kind().is_none() {
            return Err(StackError::NotABuffer { index: idx });
        }
        Ok(view)
    }

    /// Resize the dynamic buffer at `index`
    ///
    /// Returns the resized bytes. Fixed buffers and other values fail with a
    /// type error.
    pub fn resize_buffer(&mut self, index: isize, new_len: usize) -> Result<&mut [u8], StackError> {
        let idx = self.require_index(index)?;
        match self.get_mut(index)? {
            Value::DynamicBuffer(buf) => {
                trace!(index = idx, old_len = buf.len(), new_len, "resize dynamic buffer");
                buf.resize(new_len);
                Ok(buf.as_mut_slice())
            }
            _ => Err(StackError::NotADynamicBuffer { index: idx }),
        }
    }
}

/// Free-function form of [`ValueStack::get_buffer`]
pub fn get_buffer(stack: &ValueStack, index: isize) -> Result<BufferView<'_>, StackError> {
    stack.get_buffer(index)
}
