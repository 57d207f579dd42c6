//! valstack CLI support
//!
//! Turns command-line value literals into a `ValueStack` and formats the
//! buffer-accessor report. Kept in a library so the parsing rules can be
//! tested without spawning the binary.
//!
//! # Value literals
//!
//! | literal              | value                        |
//! |----------------------|------------------------------|
//! | `undefined`, `null`  | the scalar                   |
//! | `true`, `false`      | boolean                      |
//! | `123`, `-1.5`, `NaN` | number                       |
//! | `"text"`, `str:text` | string (no escape handling)  |
//! | `{}` / `[]`          | empty object / empty array   |
//! | `fn:name`            | function object              |
//! | `fixed:N`            | zero-filled fixed buffer     |
//! | `dynamic:N`          | zero-filled dynamic buffer   |

use serde::Deserialize;
use std::path::Path;
use tracing::debug;
use valstack_core::{DumpConfig, DynamicBuffer, FixedBuffer, StackConfig, Value, ValueStack};

/// The twelve-value stack used when no literals are given
pub const CANONICAL_FIXTURE: &[&str] = &[
    "undefined",
    "null",
    "true",
    "false",
    "\"\"",
    "\"foo\"",
    "123",
    "{}",
    "fixed:0",
    "fixed:1024",
    "dynamic:0",
    "dynamic:2048",
];

/// Settings loaded from a TOML file
///
/// ```toml
/// [dump]
/// label = "vm"
///
/// [dump.jsonx]
/// buffer_hex = true
///
/// [stack]
/// max_depth = 256
/// ```
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(default)]
pub struct CliConfig {
    pub dump: DumpConfig,
    pub stack: StackConfig,
}

impl CliConfig {
    pub fn from_toml(toml_str: &str) -> Result<Self, String> {
        toml::from_str(toml_str).map_err(|e| format!("Failed to parse config: {}", e))
    }

    pub fn load(path: &Path) -> Result<Self, String> {
        let text = std::fs::read_to_string(path)
            .map_err(|e| format!("Failed to read config {}: {}", path.display(), e))?;
        let config = Self::from_toml(&text)?;
        debug!(path = %path.display(), "loaded config");
        Ok(config)
    }
}

/// Parse one value literal
pub fn parse_value(literal: &str) -> Result<Value, String> {
    let value = match literal {
        "undefined" => Value::Undefined,
        "null" => Value::Null,
        "true" => Value::Boolean(true),
        "false" => Value::Boolean(false),
        "{}" => Value::object(),
        "[]" => Value::array(Vec::new()),
        "NaN" => Value::Number(f64::NAN),
        "Infinity" => Value::Number(f64::INFINITY),
        "-Infinity" => Value::Number(f64::NEG_INFINITY),
        _ => {
            if let Some(text) = literal
                .strip_prefix('"')
                .and_then(|rest| rest.strip_suffix('"'))
            {
                Value::string(text)
            } else if let Some(text) = literal.strip_prefix("str:") {
                Value::string(text)
            } else if let Some(name) = literal.strip_prefix("fn:") {
                Value::function(name)
            } else if let Some(size) = literal.strip_prefix("fixed:") {
                Value::FixedBuffer(FixedBuffer::new(parse_size(literal, size)?))
            } else if let Some(size) = literal.strip_prefix("dynamic:") {
                Value::DynamicBuffer(DynamicBuffer::new(parse_size(literal, size)?))
            } else if let Ok(n) = literal.parse::<f64>() {
                Value::Number(n)
            } else {
                return Err(format!("Unrecognized value literal: {}", literal));
            }
        }
    };
    Ok(value)
}

fn parse_size(literal: &str, size: &str) -> Result<usize, String> {
    size.parse::<usize>()
        .map_err(|e| format!("Invalid buffer size in '{}': {}", literal, e))
}

/// Build a stack from literals, falling back to the canonical fixture
pub fn build_stack<S: AsRef<str>>(literals: &[S], config: StackConfig) -> Result<ValueStack, String> {
    let mut stack = ValueStack::with_config(config);
    let mut push = |literal: &str| -> Result<(), String> {
        let value = parse_value(literal)?;
        stack.push(value).map_err(|e| e.to_string())?;
        Ok(())
    };

    if literals.is_empty() {
        for &literal in CANONICAL_FIXTURE {
            push(literal)?;
        }
    } else {
        for literal in literals {
            push(literal.as_ref())?;
        }
    }
    Ok(stack)
}

/// One line per slot describing what `get_buffer` returns
///
/// The pointer is only reported when the length is nonzero; for zero-length
/// results it carries no meaning.
pub fn buffer_lines(stack: &ValueStack) -> Result<Vec<String>, String> {
    let mut lines = Vec::with_capacity(stack.top() + 1);
    lines.push(format!("top: {}", stack.top()));
    for i in 0..stack.top() {
        let view = stack.get_buffer(i as isize).map_err(|e| e.to_string())?;
        if view.is_empty() {
            lines.push(format!("index {}: length 0", i));
        } else {
            lines.push(format!(
                "index {}: length {}, ptr-is-NULL {}",
                i,
                view.len(),
                if view.as_ptr().is_null() { 1 } else { 0 }
            ));
        }
    }
    Ok(lines)
}

#[cfg(test)]
mod tests {
    use super::*;
    use valstack_core::ValueKind;

    #[test]
    fn test_parse_scalars() {
        assert_eq!(parse_value("undefined").unwrap(), Value::Undefined);
        assert_eq!(parse_value("null").unwrap(), Value::Null);
        assert_eq!(parse_value("true").unwrap(), Value::Boolean(true));
        assert_eq!(parse_value("123").unwrap(), Value::Number(123.0));
        assert_eq!(parse_value("-0.5").unwrap(), Value::Number(-0.5));
        assert_eq!(parse_value("-Infinity").unwrap(), Value::Number(f64::NEG_INFINITY));
    }

    #[test]
    fn test_parse_strings() {
        assert_eq!(parse_value("\"\"").unwrap(), Value::string(""));
        assert_eq!(parse_value("\"foo\"").unwrap(), Value::string("foo"));
        assert_eq!(parse_value("str:a b").unwrap(), Value::string("a b"));
    }

    #[test]
    fn test_parse_objects_and_buffers() {
        assert_eq!(parse_value("{}").unwrap().kind(), ValueKind::Object);
        assert_eq!(parse_value("fn:main").unwrap().kind(), ValueKind::Object);

        let fixed = parse_value("fixed:16").unwrap();
        assert_eq!(fixed.kind(), ValueKind::FixedBuffer);
        assert_eq!(fixed.buffer_bytes().unwrap().0.len(), 16);

        let dynamic = parse_value("dynamic:0").unwrap();
        assert_eq!(dynamic.kind(), ValueKind::DynamicBuffer);
    }

    #[test]
    fn test_parse_errors() {
        assert!(parse_value("bogus").unwrap_err().contains("Unrecognized"));
        assert!(parse_value("fixed:-1").unwrap_err().contains("Invalid buffer size"));
        assert!(parse_value("\"unterminated").is_err());
    }

    #[test]
    fn test_canonical_buffer_lines() {
        let stack = build_stack::<&str>(&[], StackConfig::default()).unwrap();
        let lines = buffer_lines(&stack).unwrap();

        assert_eq!(lines[0], "top: 12");
        assert_eq!(lines[9], "index 8: length 0");
        assert_eq!(lines[10], "index 9: length 1024, ptr-is-NULL 0");
        assert_eq!(lines[11], "index 10: length 0");
        assert_eq!(lines[12], "index 11: length 2048, ptr-is-NULL 0");
    }

    #[test]
    fn test_build_stack_respects_depth() {
        let config = StackConfig {
            max_depth: 1,
            ..StackConfig::default()
        };
        let err = build_stack(&["1", "2"], config).unwrap_err();
        assert!(err.starts_with("RangeError"), "{}", err);
    }
}
