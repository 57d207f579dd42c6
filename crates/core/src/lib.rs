//! valstack core: the value stack of an embeddable script engine
//!
//! Native host code manipulates a bounded, per-thread stack of tagged values.
//! This crate provides that stack together with the two operations embedders
//! lean on most:
//!
//! - `get_buffer`: typed extraction of the bytes in a buffer slot
//! - `dump_context`: a one-line, never-failing diagnostic snapshot
//!
//! Key design principles:
//! - Value: a closed enum of kinds (undefined, null, boolean, number, string,
//!   object, fixed buffer, dynamic buffer)
//! - Buffers own their bytes; accessors lend borrowed views
//! - Stacks are thread-confined and identified by a `StackId`, never by address
//!
//! # Modules
//!
//! - `value`: `Value` enum and heap objects
//! - `buffer`: buffer storage and the buffer accessor
//! - `stack`: `ValueStack`, indexing and push/pop
//! - `jsonx`: extended JSON encoding with placeholders for non-data values
//! - `debug`: stack dumps
//! - `report`: structured (JSON) stack reports
//! - `error`: error types and thread-local last-error state
//! - `ffi`: C ABI

pub mod buffer;
pub mod debug;
pub mod error;
pub mod ffi;
pub mod jsonx;
pub mod report;
pub mod stack;
pub mod value;

// Re-export key types and functions
pub use buffer::{BufferKind, BufferView, DynamicBuffer, FixedBuffer, get_buffer};
pub use debug::{DEFAULT_LABEL, DumpConfig, dump_context};
pub use error::{ErrorKind, StackError};
pub use jsonx::{JsonxConfig, stringify, stringify_values};
pub use report::{EntryReport, StackReport};
pub use stack::{StackConfig, StackId, ValueStack};
pub use value::{HeapObject, ObjectClass, ObjectRef, Value, ValueKind};

// Error handling
pub use error::{clear_last_error, has_last_error, set_last_error, take_last_error};
