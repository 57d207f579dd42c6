//! Stack dumps for debugging
//!
//! `dump_context` renders the whole stack as one ASCII line:
//!
//! ```text
//! ctx #7: top=3, stack=[undefined,"foo",{_buf:true}]
//! ```
//!
//! The dump never fails because of what is on the stack; values JSON cannot
//! express are written as JSONX placeholders. It only reads the stack, so
//! `top` and every slot are the same before and after the call.

use crate::error::ErrorKind;
use crate::jsonx::{self, JsonxConfig};
use crate::stack::ValueStack;
use serde::Deserialize;
use std::collections::TryReserveError;
use tracing::{debug, error};

/// Label written before the stack handle
pub const DEFAULT_LABEL: &str = "ctx";

/// Configuration for stack dumps
///
/// `jsonx.ascii_only` is ignored: dump output is always ASCII.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct DumpConfig {
    pub label: String,
    pub jsonx: JsonxConfig,
}

impl Default for DumpConfig {
    fn default() -> Self {
        Self {
            label: DEFAULT_LABEL.to_string(),
            jsonx: JsonxConfig::compact(),
        }
    }
}

impl DumpConfig {
    pub fn with_label(label: impl Into<String>) -> Self {
        Self {
            label: label.into(),
            ..Self::default()
        }
    }
}

impl ValueStack {
    /// Dump the stack with the default configuration
    pub fn dump_context(&self) -> String {
        self.dump_context_with(&DumpConfig::default())
    }

    /// Dump the stack as `<label> #<id>: top=<N>, stack=<jsonx>`
    ///
    /// Panics if the output cannot be allocated.
    pub fn dump_context_with(&self, config: &DumpConfig) -> String {
        let top = self.top();
        // Dumps go into log lines: ASCII regardless of `config.jsonx`
        let jsonx = JsonxConfig {
            ascii_only: true,
            ..config.jsonx.clone()
        };
        let serialized = jsonx::stringify_values(self.values(), &jsonx);

        let label = printable_label(&config.label);
        let handle = self.id().to_string();
        let top_str = top.to_string();

        let mut out = String::new();
        let needed = label.len() + handle.len() + top_str.len() + serialized.len() + 16;
        if let Err(e) = out.try_reserve_exact(needed) {
            allocation_failure(needed, e);
        }
        out.push_str(&label);
        out.push(' ');
        out.push_str(&handle);
        out.push_str(": top=");
        out.push_str(&top_str);
        out.push_str(", stack=");
        out.push_str(&serialized);

        debug!(stack = %self.id(), top, len = out.len(), "dumped value stack");
        out
    }
}

/// Free-function form of [`ValueStack::dump_context`]
pub fn dump_context(stack: &ValueStack) -> String {
    stack.dump_context()
}

/// Keep the label within printable ASCII
fn printable_label(label: &str) -> String {
    label
        .chars()
        .map(|c| if (' '..='~').contains(&c) { c } else { '?' })
        .collect()
}

fn allocation_failure(bytes: usize, err: TryReserveError) -> ! {
    let kind = ErrorKind::Allocation;
    error!(bytes, %err, %kind, "dump_context: allocation failure");
    panic!("{}: dump_context failed to allocate {} bytes: {}", kind, bytes, err);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_dump_empty_stack() {
        let stack = ValueStack::new();
        let expected = format!("ctx {}: top=0, stack=[]", stack.id());
        assert_eq!(stack.dump_context(), expected);
    }

    #[test]
    fn test_dump_scalars() {
        let mut stack = ValueStack::new();
        stack.push_undefined().unwrap();
        stack.push_null().unwrap();
        stack.push_boolean(true).unwrap();
        stack.push_string("foo").unwrap();
        stack.push_int(123).unwrap();

        let expected = format!(
            "ctx {}: top=5, stack=[undefined,null,true,\"foo\",123]",
            stack.id()
        );
        assert_eq!(stack.dump_context(), expected);
    }

    #[test]
    fn test_dump_custom_label() {
        let mut stack = ValueStack::new();
        stack.push_null().unwrap();

        let config = DumpConfig::with_label("vm\u{1}");
        let out = stack.dump_context_with(&config);
        assert!(out.starts_with("vm? #"), "{}", out);
        assert!(out.ends_with(": top=1, stack=[null]"), "{}", out);
    }

    #[test]
    fn test_dump_buffer_hex() {
        let mut stack = ValueStack::new();
        stack.push_fixed_buffer(2).unwrap();

        let config = DumpConfig {
            jsonx: JsonxConfig::with_buffer_hex(),
            ..DumpConfig::default()
        };
        assert!(stack.dump_context_with(&config).ends_with("stack=[|0000|]"));
        assert!(stack.dump_context().ends_with("stack=[{_buf:true}]"));
    }

    #[test]
    fn test_dump_stays_ascii_when_config_allows_unicode() {
        let mut stack = ValueStack::new();
        stack.push_string("\u{85}日本").unwrap();

        let config = DumpConfig {
            jsonx: JsonxConfig {
                ascii_only: false,
                ..JsonxConfig::default()
            },
            ..DumpConfig::default()
        };
        let out = stack.dump_context_with(&config);
        assert!(out.is_ascii(), "{}", out);
        assert!(out.ends_with(r#"stack=["\x85\u65e5\u672c"]"#), "{}", out);
    }

    #[test]
    fn test_printable_label() {
        assert_eq!(printable_label("ctx"), "ctx");
        assert_eq!(printable_label("ç\n"), "??");
    }
}
