//! Value Stack
//!
//! An ordered, owning sequence of `Value` slots confined to the thread that
//! created it.
//!
//! ## Indexing
//!
//! ```text
//! absolute:   0     1     2    ...   top-1
//!          ┌─────┬─────┬─────┬─────┬─────┐
//!          │ v0  │ v1  │ v2  │ ... │ vN  │
//!          └─────┴─────┴─────┴─────┴─────┘
//! relative: -top               ...    -1
//! ```
//!
//! Non-negative indices are absolute; negative indices count down from the
//! top. Anything that does not land in `[0, top)` is a range error.
//!
//! ## Identity
//!
//! Every stack gets a `StackId` when it is created. Diagnostics print the id
//! instead of a memory address, so the handle stays the same for the life of
//! the stack and never depends on where it lives.

use crate::buffer::{DynamicBuffer, FixedBuffer};
use crate::error::StackError;
use crate::value::Value;
use serde::Deserialize;
use std::fmt;
use std::sync::atomic::{AtomicU64, Ordering};
use std::thread::{self, ThreadId};
use tracing::trace;

/// Default bound on the number of live slots
pub const DEFAULT_MAX_DEPTH: usize = 1_000_000;

/// Default number of slots preallocated for a new stack
pub const DEFAULT_STACK_CAPACITY: usize = 64;

/// Upper bound on slots preallocated up front, whatever the config asks for
pub const MAX_INITIAL_CAPACITY: usize = 1 << 16;

static NEXT_STACK_ID: AtomicU64 = AtomicU64::new(1);

/// Process-unique identifier of a stack instance
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct StackId(u64);

impl StackId {
    fn next() -> Self {
        StackId(NEXT_STACK_ID.fetch_add(1, Ordering::Relaxed))
    }

    pub fn as_u64(self) -> u64 {
        self.0
    }
}

impl fmt::Display for StackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "#{}", self.0)
    }
}

/// Stack sizing
#[derive(Debug, Clone, Copy, Deserialize)]
#[serde(default)]
pub struct StackConfig {
    /// Maximum number of live slots
    pub max_depth: usize,
    /// Slots reserved up front, capped at `MAX_INITIAL_CAPACITY`
    pub initial_capacity: usize,
}

impl Default for StackConfig {
    fn default() -> Self {
        Self {
            max_depth: DEFAULT_MAX_DEPTH,
            initial_capacity: DEFAULT_STACK_CAPACITY,
        }
    }
}

/// The value stack
///
/// Holds `Rc`-shared values, so it is neither `Send` nor `Sync`; safe code
/// can only ever touch it from its owning thread.
pub struct ValueStack {
    id: StackId,
    owner: ThreadId,
    values: Vec<Value>,
    max_depth: usize,
}

impl ValueStack {
    pub fn new() -> Self {
        Self::with_config(StackConfig::default())
    }

    pub fn with_config(config: StackConfig) -> Self {
        let capacity = config
            .initial_capacity
            .min(config.max_depth)
            .min(MAX_INITIAL_CAPACITY);
        let stack = ValueStack {
            id: StackId::next(),
            owner: thread::current().id(),
            values: Vec::with_capacity(capacity),
            max_depth: config.max_depth,
        };
        trace!(stack = %stack.id, max_depth = stack.max_depth, "created value stack");
        stack
    }

    #[inline]
    pub fn id(&self) -> StackId {
        self.id
    }

    /// Thread that created this stack
    pub fn owner(&self) -> ThreadId {
        self.owner
    }

    /// Fail with a logic error unless called on the owning thread
    pub fn check_owner(&self) -> Result<(), StackError> {
        if thread::current().id() == self.owner {
            Ok(())
        } else {
            Err(StackError::WrongThread)
        }
    }

    /// Number of live slots
    #[inline]
    pub fn top(&self) -> usize {
        self.values.len()
    }

    #[inline]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn max_depth(&self) -> usize {
        self.max_depth
    }

    /// All live slots, bottom first
    #[inline]
    pub fn values(&self) -> &[Value] {
        &self.values
    }

    /// Resolve an absolute or top-relative index to an absolute one
    #[inline]
    pub fn normalize_index(&self, index: isize) -> Option<usize> {
        let top = self.values.len();
        if index < 0 {
            top.checked_sub(index.unsigned_abs())
        } else {
            let idx = index as usize;
            (idx < top).then_some(idx)
        }
    }

    /// Like `normalize_index`, but out-of-range is a `RangeError`
    pub fn require_index(&self, index: isize) -> Result<usize, StackError> {
        self.normalize_index(index)
            .ok_or(StackError::IndexOutOfRange {
                index,
                top: self.values.len(),
            })
    }

    pub fn get(&self, index: isize) -> Result<&Value, StackError> {
        let idx = self.require_index(index)?;
        Ok(&self.values[idx])
    }

    pub fn get_mut(&mut self, index: isize) -> Result<&mut Value, StackError> {
        let idx = self.require_index(index)?;
        Ok(&mut self.values[idx])
    }

    /// Push a value, returning the index of the new slot
    pub fn push(&mut self, value: Value) -> Result<usize, StackError> {
        if self.values.len() >= self.max_depth {
            return Err(StackError::StackOverflow {
                limit: self.max_depth,
            });
        }
        self.values.push(value);
        Ok(self.values.len() - 1)
    }

    pub fn push_undefined(&mut self) -> Result<usize, StackError> {
        self.push(Value::Undefined)
    }

    pub fn push_null(&mut self) -> Result<usize, StackError> {
        self.push(Value::Null)
    }

    pub fn push_boolean(&mut self, b: bool) -> Result<usize, StackError> {
        self.push(Value::Boolean(b))
    }

    pub fn push_number(&mut self, n: f64) -> Result<usize, StackError> {
        self.push(Value::Number(n))
    }

    pub fn push_int(&mut self, n: i32) -> Result<usize, StackError> {
        self.push(Value::Number(n as f64))
    }

    pub fn push_string(&mut self, s: &str) -> Result<usize, StackError> {
        self.push(Value::string(s))
    }

    /// Push an empty object
    pub fn push_object(&mut self) -> Result<usize, StackError> {
        self.push(Value::object())
    }

    /// Push an empty array
    pub fn push_array(&mut self) -> Result<usize, StackError> {
        self.push(Value::array(Vec::new()))
    }

    pub fn push_function(&mut self, name: &str) -> Result<usize, StackError> {
        self.push(Value::function(name))
    }

    /// Push a zero-filled fixed buffer
    pub fn push_fixed_buffer(&mut self, size: usize) -> Result<usize, StackError> {
        self.push(Value::FixedBuffer(FixedBuffer::new(size)))
    }

    /// Push a zero-filled dynamic buffer
    pub fn push_dynamic_buffer(&mut self, size: usize) -> Result<usize, StackError> {
        self.push(Value::DynamicBuffer(DynamicBuffer::new(size)))
    }

    /// Pop the top value
    pub fn pop(&mut self) -> Result<Value, StackError> {
        self.values.pop().ok_or(StackError::StackUnderflow)
    }

    /// Pop and drop `n` values
    pub fn pop_n(&mut self, n: usize) -> Result<(), StackError> {
        if n > self.values.len() {
            return Err(StackError::StackUnderflow);
        }
        let new_top = self.values.len() - n;
        self.values.truncate(new_top);
        Ok(())
    }

    /// Push a copy of the value at `index`
    pub fn dup(&mut self, index: isize) -> Result<usize, StackError> {
        let value = self.get(index)?.clone();
        self.push(value)
    }

    /// Truncate to `new_top` slots or pad with `undefined` up to it
    pub fn set_top(&mut self, new_top: usize) -> Result<(), StackError> {
        if new_top > self.max_depth {
            return Err(StackError::StackOverflow {
                limit: self.max_depth,
            });
        }
        trace!(stack = %self.id, old_top = self.values.len(), new_top, "set top");
        self.values.resize(new_top, Value::Undefined);
        Ok(())
    }

    /// Drop every value
    pub fn clear(&mut self) {
        self.values.clear();
    }
}

impl Default for ValueStack {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Debug for ValueStack {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ValueStack")
            .field("id", &self.id)
            .field("top", &self.values.len())
            .field("values", &self.values)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::ErrorKind;

    #[test]
    fn test_stack_basic_operations() {
        let mut stack = ValueStack::new();

        assert!(stack.is_empty());
        assert_eq!(stack.top(), 0);

        assert_eq!(stack.push_int(10).unwrap(), 0);
        assert_eq!(stack.push_int(20).unwrap(), 1);
        assert_eq!(stack.push_int(30).unwrap(), 2);
        assert_eq!(stack.top(), 3);

        assert_eq!(stack.pop().unwrap(), Value::Number(30.0));
        assert_eq!(stack.pop().unwrap(), Value::Number(20.0));
        assert_eq!(stack.pop().unwrap(), Value::Number(10.0));
        assert!(stack.is_empty());
        assert_eq!(stack.pop().unwrap_err(), StackError::StackUnderflow);
    }

    #[test]
    fn test_normalize_index() {
        let mut stack = ValueStack::new();
        for i in 0..3 {
            stack.push_int(i).unwrap();
        }

        assert_eq!(stack.normalize_index(0), Some(0));
        assert_eq!(stack.normalize_index(2), Some(2));
        assert_eq!(stack.normalize_index(3), None);
        assert_eq!(stack.normalize_index(-1), Some(2));
        assert_eq!(stack.normalize_index(-3), Some(0));
        assert_eq!(stack.normalize_index(-4), None);
        assert_eq!(stack.normalize_index(isize::MIN), None);
        assert_eq!(stack.normalize_index(isize::MAX), None);
    }

    #[test]
    fn test_empty_stack_has_no_valid_index() {
        let stack = ValueStack::new();
        assert_eq!(stack.normalize_index(0), None);
        assert_eq!(stack.normalize_index(-1), None);
        assert_eq!(stack.get(0).unwrap_err().kind(), ErrorKind::Range);
    }

    #[test]
    fn test_depth_limit() {
        let mut stack = ValueStack::with_config(StackConfig {
            max_depth: 2,
            initial_capacity: 2,
        });
        stack.push_null().unwrap();
        stack.push_null().unwrap();

        let err = stack.push_null().unwrap_err();
        assert_eq!(err, StackError::StackOverflow { limit: 2 });
        assert_eq!(err.kind(), ErrorKind::Range);
        assert_eq!(stack.top(), 2);
    }

    #[test]
    fn test_huge_config_capacity_is_capped() {
        let mut stack = ValueStack::with_config(StackConfig {
            max_depth: usize::MAX,
            initial_capacity: usize::MAX - 1,
        });
        assert!(stack.values.capacity() <= MAX_INITIAL_CAPACITY);
        assert_eq!(stack.max_depth(), usize::MAX);

        stack.push_null().unwrap();
        assert_eq!(stack.top(), 1);
    }

    #[test]
    fn test_dup_and_pop_n() {
        let mut stack = ValueStack::new();
        stack.push_string("a").unwrap();
        stack.push_object().unwrap();

        stack.dup(0).unwrap();
        stack.dup(-2).unwrap();
        assert_eq!(stack.top(), 4);
        assert_eq!(stack.get(2).unwrap(), &Value::string("a"));
        assert_eq!(stack.get(3).unwrap(), stack.get(1).unwrap());

        stack.pop_n(3).unwrap();
        assert_eq!(stack.top(), 1);
        assert_eq!(stack.pop_n(2).unwrap_err(), StackError::StackUnderflow);
    }

    #[test]
    fn test_set_top() {
        let mut stack = ValueStack::new();
        stack.push_int(1).unwrap();

        stack.set_top(3).unwrap();
        assert_eq!(stack.top(), 3);
        assert_eq!(stack.get(-1).unwrap(), &Value::Undefined);

        stack.set_top(0).unwrap();
        assert!(stack.is_empty());
    }

    #[test]
    fn test_ids_are_unique() {
        let a = ValueStack::new();
        let b = ValueStack::new();
        assert_ne!(a.id(), b.id());
        assert!(b.id() > a.id());
        assert_eq!(a.id().to_string(), format!("#{}", a.id().as_u64()));
    }

    #[test]
    fn test_owner_thread() {
        let stack = ValueStack::new();
        assert!(stack.check_owner().is_ok());
        assert_eq!(stack.owner(), std::thread::current().id());
    }
}
