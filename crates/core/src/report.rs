//! Structured stack reports
//!
//! A `StackReport` is the machine-readable counterpart of `dump_context`:
//! one entry per slot with its kind, buffer length and JSONX text. With the
//! `report-json` feature (enabled by default) it serializes to JSON for log
//! pipelines.

use crate::jsonx::{self, JsonxConfig};
use crate::stack::ValueStack;
use serde::Serialize;

/// One slot of a stack report
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EntryReport {
    pub index: usize,
    pub kind: &'static str,
    /// Byte length, present only for buffers
    #[serde(skip_serializing_if = "Option::is_none")]
    pub buffer_len: Option<usize>,
    /// JSONX encoding of the value
    pub text: String,
}

/// Snapshot of a whole stack
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StackReport {
    pub id: u64,
    pub top: usize,
    pub entries: Vec<EntryReport>,
}

impl ValueStack {
    /// Build a report using the default JSONX configuration
    pub fn report(&self) -> StackReport {
        self.report_with(&JsonxConfig::compact())
    }

    pub fn report_with(&self, config: &JsonxConfig) -> StackReport {
        let entries = self
            .values()
            .iter()
            .enumerate()
            .map(|(index, value)| EntryReport {
                index,
                kind: value.kind().name(),
                buffer_len: value.buffer_bytes().map(|(bytes, _)| bytes.len()),
                text: jsonx::stringify(value, config),
            })
            .collect();

        StackReport {
            id: self.id().as_u64(),
            top: self.top(),
            entries,
        }
    }
}

#[cfg(feature = "report-json")]
impl StackReport {
    /// Compact JSON
    pub fn to_json(&self) -> String {
        serde_json::to_string(self).unwrap_or_else(|_| "{}".to_string())
    }

    pub fn to_json_pretty(&self) -> String {
        serde_json::to_string_pretty(self).unwrap_or_else(|_| "{}".to_string())
    }
}
