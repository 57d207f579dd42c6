//! Tagged values
//!
//! `Value` is what a stack slot holds. The kind set is closed: scalars are
//! stored inline, strings and objects are reference-shared, and buffers own
//! their storage outright.
//!
//! Objects are reference counted, so a cyclic object graph is not freed when
//! its last slot is popped; the cycle keeps itself (and any buffers inside
//! it) alive. Call `Value::break_cycles` before dropping such a graph.

use crate::buffer::{BufferKind, DynamicBuffer, FixedBuffer};
use std::cell::RefCell;
use std::collections::HashSet;
use std::fmt;
use std::rc::Rc;

/// Shared handle to a heap object
pub type ObjectRef = Rc<RefCell<HeapObject>>;

/// Kind tag of a `Value`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ValueKind {
    Undefined,
    Null,
    Boolean,
    Number,
    String,
    Object,
    FixedBuffer,
    DynamicBuffer,
}

impl ValueKind {
    pub fn name(self) -> &'static str {
        match self {
            ValueKind::Undefined => "undefined",
            ValueKind::Null => "null",
            ValueKind::Boolean => "boolean",
            ValueKind::Number => "number",
            ValueKind::String => "string",
            ValueKind::Object => "object",
            ValueKind::FixedBuffer => "fixed-buffer",
            ValueKind::DynamicBuffer => "dynamic-buffer",
        }
    }

    pub fn is_buffer(self) -> bool {
        matches!(self, ValueKind::FixedBuffer | ValueKind::DynamicBuffer)
    }
}

impl fmt::Display for ValueKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Object class
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ObjectClass {
    Object,
    Array,
    /// Callable; has no data representation
    Function,
}

/// Heap object: ordered array items plus ordered named properties
///
/// Properties keep insertion order so diagnostics are deterministic.
#[derive(Debug)]
pub struct HeapObject {
    pub class: ObjectClass,
    /// Function name (functions only)
    pub name: Option<Rc<str>>,
    /// Array items (arrays only)
    pub items: Vec<Value>,
    pub props: Vec<(Rc<str>, Value)>,
}

impl HeapObject {
    pub fn new(class: ObjectClass) -> Self {
        Self {
            class,
            name: None,
            items: Vec::new(),
            props: Vec::new(),
        }
    }

    /// Set a named property, replacing an existing one with the same key
    pub fn put(&mut self, key: &str, value: Value) {
        match self.props.iter_mut().find(|(k, _)| &**k == key) {
            Some((_, slot)) => *slot = value,
            None => self.props.push((Rc::from(key), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&Value> {
        self.props
            .iter()
            .find(|(k, _)| &**k == key)
            .map(|(_, v)| v)
    }
}

/// Value: one stack slot
///
/// Cloning shares strings and objects by reference and copies buffer bytes,
/// since buffer storage belongs to exactly one slot.
#[derive(Clone, Default)]
pub enum Value {
    #[default]
    Undefined,
    Null,
    Boolean(bool),
    /// IEEE 754 double
    Number(f64),
    String(Rc<str>),
    Object(ObjectRef),
    FixedBuffer(FixedBuffer),
    DynamicBuffer(DynamicBuffer),
}

impl Value {
    pub fn string(s: &str) -> Self {
        Value::String(Rc::from(s))
    }

    /// Empty plain object
    pub fn object() -> Self {
        Value::Object(Rc::new(RefCell::new(HeapObject::new(ObjectClass::Object))))
    }

    pub fn array(items: Vec<Value>) -> Self {
        let mut obj = HeapObject::new(ObjectClass::Array);
        obj.items = items;
        Value::Object(Rc::new(RefCell::new(obj)))
    }

    pub fn function(name: &str) -> Self {
        let mut obj = HeapObject::new(ObjectClass::Function);
        obj.name = Some(Rc::from(name));
        Value::Object(Rc::new(RefCell::new(obj)))
    }

    pub fn kind(&self) -> ValueKind {
        match self {
            Value::Undefined => ValueKind::Undefined,
            Value::Null => ValueKind::Null,
            Value::Boolean(_) => ValueKind::Boolean,
            Value::Number(_) => ValueKind::Number,
            Value::String(_) => ValueKind::String,
            Value::Object(_) => ValueKind::Object,
            Value::FixedBuffer(_) => ValueKind::FixedBuffer,
            Value::DynamicBuffer(_) => ValueKind::DynamicBuffer,
        }
    }

    pub fn is_buffer(&self) -> bool {
        self.kind().is_buffer()
    }

    /// Buffer bytes and buffer kind, or `None` for non-buffer values
    pub fn buffer_bytes(&self) -> Option<(&[u8], BufferKind)> {
        match self {
            Value::FixedBuffer(b) => Some((b.as_slice(), BufferKind::Fixed)),
            Value::DynamicBuffer(b) => Some((b.as_slice(), BufferKind::Dynamic)),
            _ => None,
        }
    }

    pub fn buffer_bytes_mut(&mut self) -> Option<&mut [u8]> {
        match self {
            Value::FixedBuffer(b) => Some(b.as_mut_slice()),
            Value::DynamicBuffer(b) => Some(b.as_mut_slice()),
            _ => None,
        }
    }

    pub fn as_object(&self) -> Option<&ObjectRef> {
        match self {
            Value::Object(obj) => Some(obj),
            _ => None,
        }
    }

    /// Set a property on an object value; returns false for non-objects
    pub fn put_prop(&self, key: &str, value: Value) -> bool {
        match self {
            Value::Object(obj) => {
                obj.borrow_mut().put(key, value);
                true
            }
            _ => false,
        }
    }

    /// Empty every object reachable from this value
    ///
    /// Clears the items and properties of each reachable object, which breaks
    /// any reference cycle so the graph is released once the remaining
    /// handles drop. Objects shared with other values are emptied too.
    /// Objects currently borrowed are skipped.
    pub fn break_cycles(&self) {
        let mut seen: HashSet<*const RefCell<HeapObject>> = HashSet::new();
        let mut pending: Vec<ObjectRef> = self.as_object().cloned().into_iter().collect();
        let mut detached: Vec<Value> = Vec::new();

        while let Some(obj) = pending.pop() {
            if !seen.insert(Rc::as_ptr(&obj)) {
                continue;
            }
            let Ok(mut inner) = obj.try_borrow_mut() else {
                continue;
            };
            let items = std::mem::take(&mut inner.items);
            let props = std::mem::take(&mut inner.props);
            drop(inner);

            for value in items.into_iter().chain(props.into_iter().map(|(_, v)| v)) {
                if let Value::Object(child) = &value {
                    pending.push(Rc::clone(child));
                }
                detached.push(value);
            }
        }
    }

    /// Append an array item; returns false for non-objects
    pub fn push_item(&self, value: Value) -> bool {
        match self {
            Value::Object(obj) => {
                obj.borrow_mut().items.push(value);
                true
            }
            _ => false,
        }
    }
}

// Objects compare by identity, everything else by content
impl PartialEq for Value {
    fn eq(&self, other: &Self) -> bool {
        match (self, other) {
            (Value::Undefined, Value::Undefined) | (Value::Null, Value::Null) => true,
            (Value::Boolean(a), Value::Boolean(b)) => a == b,
            (Value::Number(a), Value::Number(b)) => a == b,
            (Value::String(a), Value::String(b)) => a == b,
            (Value::Object(a), Value::Object(b)) => Rc::ptr_eq(a, b),
            (Value::FixedBuffer(a), Value::FixedBuffer(b)) => a.as_slice() == b.as_slice(),
            (Value::DynamicBuffer(a), Value::DynamicBuffer(b)) => a.as_slice() == b.as_slice(),
            _ => false,
        }
    }
}

// Does not descend into objects, so cyclic graphs are safe to print
impl fmt::Debug for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Undefined => write!(f, "Undefined"),
            Value::Null => write!(f, "Null"),
            Value::Boolean(b) => write!(f, "Boolean({})", b),
            Value::Number(n) => write!(f, "Number({})", n),
            Value::String(s) => write!(f, "String({:?})", s),
            Value::Object(obj) => match obj.try_borrow() {
                Ok(o) => write!(f, "Object({:?}, {:p})", o.class, Rc::as_ptr(obj)),
                Err(_) => write!(f, "Object(<borrowed>, {:p})", Rc::as_ptr(obj)),
            },
            Value::FixedBuffer(b) => write!(f, "FixedBuffer(len={})", b.len()),
            Value::DynamicBuffer(b) => write!(f, "DynamicBuffer(len={})", b.len()),
        }
    }
}

impl From<bool> for Value {
    fn from(b: bool) -> Self {
        Value::Boolean(b)
    }
}

impl From<f64> for Value {
    fn from(n: f64) -> Self {
        Value::Number(n)
    }
}

impl From<i32> for Value {
    fn from(n: i32) -> Self {
        Value::Number(n as f64)
    }
}

impl From<&str> for Value {
    fn from(s: &str) -> Self {
        Value::string(s)
    }
}
