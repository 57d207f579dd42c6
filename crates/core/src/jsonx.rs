//! Extended JSON (JSONX) encoding
//!
//! A JSON dialect for diagnostics. Encoding is total: any `Value` graph
//! produces output, and values JSON cannot express are written as fixed
//! tokens instead of failing.
//!
//! # Format
//!
//! - `undefined`, `null`, `true`, `false`
//! - Numbers: `123`, `-0.5`, `1e+21`, `NaN`, `Infinity`, `-Infinity`
//! - Strings: `"foo"` with escapes (`\n`, `\xHH`, `\uHHHH`, `\UHHHHHHHH`)
//! - Arrays: `[1,2,3]`
//! - Objects: `{foo:1,"not ident":2}` (identifier keys unquoted)
//! - Placeholders:
//!   - `{_func:true}`  function
//!   - `{_buf:true}`   buffer (or `|0a0b|` with `buffer_hex`)
//!   - `{_cycle:true}` object already being encoded
//!   - `{_depth:true}` nesting deeper than `max_depth`
//!   - `{_busy:true}`  object currently mutably borrowed
//!
//! With `ascii_only` (the default) output never contains bytes above 0x7e,
//! so it can be embedded in any log line.

use crate::value::{HeapObject, ObjectClass, ObjectRef, Value};
use serde::Deserialize;
use std::cell::RefCell;
use std::fmt::Write;
use std::rc::Rc;
use tracing::trace;

pub const FUNCTION_PLACEHOLDER: &str = "{_func:true}";
pub const BUFFER_PLACEHOLDER: &str = "{_buf:true}";
pub const CYCLE_PLACEHOLDER: &str = "{_cycle:true}";
pub const DEPTH_PLACEHOLDER: &str = "{_depth:true}";
pub const BUSY_PLACEHOLDER: &str = "{_busy:true}";

/// Default nesting limit for objects and arrays
pub const DEFAULT_MAX_DEPTH: usize = 64;

/// Configuration for JSONX output
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default)]
pub struct JsonxConfig {
    /// Escape every non-ASCII code point
    pub ascii_only: bool,
    /// Write identifier-like object keys without quotes
    pub avoid_key_quotes: bool,
    /// Write buffer contents as `|hex|` instead of a placeholder
    pub buffer_hex: bool,
    /// Objects nested deeper than this become a placeholder
    pub max_depth: usize,
}

impl Default for JsonxConfig {
    fn default() -> Self {
        Self {
            ascii_only: true,
            avoid_key_quotes: true,
            buffer_hex: false,
            max_depth: DEFAULT_MAX_DEPTH,
        }
    }
}

impl JsonxConfig {
    /// The configuration used for stack dumps
    pub fn compact() -> Self {
        Self::default()
    }

    /// Same as `compact`, but buffers show their bytes
    pub fn with_buffer_hex() -> Self {
        Self {
            buffer_hex: true,
            ..Self::default()
        }
    }
}

/// Encode a single value
pub fn stringify(value: &Value, config: &JsonxConfig) -> String {
    let mut enc = Encoder::new(config);
    enc.value(value, 0);
    enc.finish()
}

/// Encode a sequence of values as one array
pub fn stringify_values(values: &[Value], config: &JsonxConfig) -> String {
    let mut enc = Encoder::new(config);
    enc.items(values, 0);
    enc.finish()
}

struct Encoder<'c> {
    config: &'c JsonxConfig,
    buf: String,
    /// Objects on the current encoding path
    active: Vec<*const RefCell<HeapObject>>,
    placeholders: usize,
}

impl<'c> Encoder<'c> {
    fn new(config: &'c JsonxConfig) -> Self {
        Self {
            config,
            buf: String::new(),
            active: Vec::new(),
            placeholders: 0,
        }
    }

    fn finish(self) -> String {
        if self.placeholders > 0 {
            trace!(count = self.placeholders, "substituted jsonx placeholders");
        }
        self.buf
    }

    fn placeholder(&mut self, token: &str) {
        self.placeholders += 1;
        self.buf.push_str(token);
    }

    fn value(&mut self, value: &Value, depth: usize) {
        match value {
            Value::Undefined => self.buf.push_str("undefined"),
            Value::Null => self.buf.push_str("null"),
            Value::Boolean(b) => self.buf.push_str(if *b { "true" } else { "false" }),
            Value::Number(n) => format_number(*n, &mut self.buf),
            Value::String(s) => format_string(s, self.config.ascii_only, &mut self.buf),
            Value::Object(obj) => self.object(obj, depth),
            Value::FixedBuffer(b) => self.buffer(b.as_slice()),
            Value::DynamicBuffer(b) => self.buffer(b.as_slice()),
        }
    }

    fn buffer(&mut self, bytes: &[u8]) {
        if self.config.buffer_hex {
            self.buf.push('|');
            self.buf.push_str(&hex::encode(bytes));
            self.buf.push('|');
        } else {
            self.placeholder(BUFFER_PLACEHOLDER);
        }
    }

    fn object(&mut self, obj: &ObjectRef, depth: usize) {
        let ptr = Rc::as_ptr(obj);
        if self.active.contains(&ptr) {
            return self.placeholder(CYCLE_PLACEHOLDER);
        }
        if depth >= self.config.max_depth {
            return self.placeholder(DEPTH_PLACEHOLDER);
        }
        let Ok(inner) = obj.try_borrow() else {
            return self.placeholder(BUSY_PLACEHOLDER);
        };

        self.active.push(ptr);
        match inner.class {
            ObjectClass::Function => self.placeholder(FUNCTION_PLACEHOLDER),
            ObjectClass::Array => self.items(&inner.items, depth + 1),
            ObjectClass::Object => self.props(&inner.props, depth + 1),
        }
        self.active.pop();
    }

    fn items(&mut self, items: &[Value], depth: usize) {
        self.buf.push('[');
        for (i, item) in items.iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            self.value(item, depth);
        }
        self.buf.push(']');
    }

    fn props(&mut self, props: &[(Rc<str>, Value)], depth: usize) {
        self.buf.push('{');
        for (i, (key, value)) in props.iter().enumerate() {
            if i > 0 {
                self.buf.push(',');
            }
            if self.config.avoid_key_quotes && is_identifier(key) {
                self.buf.push_str(key);
            } else {
                format_string(key, self.config.ascii_only, &mut self.buf);
            }
            self.buf.push(':');
            self.value(value, depth);
        }
        self.buf.push('}');
    }
}

/// ASCII identifier: `[A-Za-z_$][A-Za-z0-9_$]*`
fn is_identifier(key: &str) -> bool {
    let mut chars = key.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' || c == '$' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '$')
}

/// Format a number the way script engines print them
fn format_number(n: f64, buf: &mut String) {
    if n.is_nan() {
        buf.push_str("NaN");
    } else if n.is_infinite() {
        buf.push_str(if n > 0.0 { "Infinity" } else { "-Infinity" });
    } else {
        let abs = n.abs();
        if abs != 0.0 && !(1e-6..1e21).contains(&abs) {
            // 1e21 -> "1e+21", 1e-7 stays "1e-7"
            let s = format!("{:e}", n);
            match s.split_once('e') {
                Some((mantissa, exp)) if !exp.starts_with('-') => {
                    buf.push_str(mantissa);
                    buf.push_str("e+");
                    buf.push_str(exp);
                }
                _ => buf.push_str(&s),
            }
        } else {
            let _ = write!(buf, "{}", n);
        }
    }
}

/// Format a string with quotes and escaping
fn format_string(s: &str, ascii_only: bool, buf: &mut String) {
    buf.push('"');
    for c in s.chars() {
        match c {
            '"' => buf.push_str("\\\""),
            '\\' => buf.push_str("\\\\"),
            '\n' => buf.push_str("\\n"),
            '\r' => buf.push_str("\\r"),
            '\t' => buf.push_str("\\t"),
            '\x08' => buf.push_str("\\b"),
            '\x0C' => buf.push_str("\\f"),
            c if (c as u32) < 0x20 || c == '\x7f' => {
                let _ = write!(buf, "\\x{:02x}", c as u32);
            }
            '\u{2028}' | '\u{2029}' => {
                let _ = write!(buf, "\\u{:04x}", c as u32);
            }
            c if ascii_only && !c.is_ascii() => {
                let cp = c as u32;
                let _ = if cp < 0x100 {
                    write!(buf, "\\x{:02x}", cp)
                } else if cp < 0x10000 {
                    write!(buf, "\\u{:04x}", cp)
                } else {
                    write!(buf, "\\U{:08x}", cp)
                };
            }
            c => buf.push(c),
        }
    }
    buf.push('"');
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::buffer::{DynamicBuffer, FixedBuffer};

    fn enc(v: &Value) -> String {
        stringify(v, &JsonxConfig::default())
    }

    #[test]
    fn test_scalars() {
        assert_eq!(enc(&Value::Undefined), "undefined");
        assert_eq!(enc(&Value::Null), "null");
        assert_eq!(enc(&Value::Boolean(true)), "true");
        assert_eq!(enc(&Value::Boolean(false)), "false");
    }

    #[test]
    fn test_numbers() {
        assert_eq!(enc(&Value::Number(123.0)), "123");
        assert_eq!(enc(&Value::Number(-2.5)), "-2.5");
        assert_eq!(enc(&Value::Number(0.0)), "0");
        assert_eq!(enc(&Value::Number(1e21)), "1e+21");
        assert_eq!(enc(&Value::Number(1e-7)), "1e-7");
        assert_eq!(enc(&Value::Number(f64::NAN)), "NaN");
        assert_eq!(enc(&Value::Number(f64::INFINITY)), "Infinity");
        assert_eq!(enc(&Value::Number(f64::NEG_INFINITY)), "-Infinity");
    }

    #[test]
    fn test_string_escaping() {
        assert_eq!(enc(&Value::string("")), r#""""#);
        assert_eq!(enc(&Value::string("say \"hi\"")), r#""say \"hi\"""#);
        assert_eq!(enc(&Value::string("a\nb\\c")), r#""a\nb\\c""#);
        assert_eq!(enc(&Value::string("\u{1}")), r#""\x01""#);
    }

    #[test]
    fn test_string_ascii_only() {
        assert_eq!(enc(&Value::string("é")), r#""\xe9""#);
        assert_eq!(enc(&Value::string("€")), r#""\u20ac""#);
        assert_eq!(enc(&Value::string("😀")), r#""\U0001f600""#);

        let raw = JsonxConfig {
            ascii_only: false,
            ..JsonxConfig::default()
        };
        assert_eq!(stringify(&Value::string("é"), &raw), "\"é\"");
    }

    #[test]
    fn test_output_is_printable_ascii() {
        let v = Value::array(vec![
            Value::string("tab\there \u{0} nul \u{7f} del ünï \u{2028}"),
            Value::string("\u{10ffff}"),
        ]);
        let out = enc(&v);
        assert!(out.bytes().all(|b| (0x20..0x7f).contains(&b)), "{}", out);
    }

    #[test]
    fn test_object_keys() {
        let obj = Value::object();
        obj.put_prop("foo", Value::from(1));
        obj.put_prop("$bar_2", Value::Null);
        obj.put_prop("not ident", Value::from(true));
        obj.put_prop("9lives", Value::Undefined);
        assert_eq!(
            enc(&obj),
            r#"{foo:1,$bar_2:null,"not ident":true,"9lives":undefined}"#
        );

        let quoted = JsonxConfig {
            avoid_key_quotes: false,
            ..JsonxConfig::default()
        };
        assert_eq!(
            stringify(&obj, &quoted),
            r#"{"foo":1,"$bar_2":null,"not ident":true,"9lives":undefined}"#
        );
    }

    #[test]
    fn test_empty_containers() {
        assert_eq!(enc(&Value::object()), "{}");
        assert_eq!(enc(&Value::array(vec![])), "[]");
        assert_eq!(stringify_values(&[], &JsonxConfig::default()), "[]");
    }

    #[test]
    fn test_function_placeholder() {
        let v = Value::array(vec![Value::function("print"), Value::from(1)]);
        assert_eq!(enc(&v), "[{_func:true},1]");
    }

    #[test]
    fn test_buffers() {
        let fixed = Value::FixedBuffer(FixedBuffer::from_bytes(&[0xde, 0xad]));
        let empty = Value::DynamicBuffer(DynamicBuffer::new(0));
        assert_eq!(enc(&fixed), BUFFER_PLACEHOLDER);
        assert_eq!(enc(&empty), BUFFER_PLACEHOLDER);

        let hex = JsonxConfig::with_buffer_hex();
        assert_eq!(stringify(&fixed, &hex), "|dead|");
        assert_eq!(stringify(&empty, &hex), "||");
    }

    #[test]
    fn test_cycle_placeholder() {
        let obj = Value::object();
        obj.put_prop("me", obj.clone());
        assert_eq!(enc(&obj), "{me:{_cycle:true}}");

        obj.break_cycles();
    }

    #[test]
    fn test_shared_object_is_not_a_cycle() {
        let shared = Value::object();
        shared.put_prop("x", Value::from(1));
        let v = Value::array(vec![shared.clone(), shared]);
        assert_eq!(enc(&v), "[{x:1},{x:1}]");
    }

    #[test]
    fn test_depth_placeholder() {
        let config = JsonxConfig {
            max_depth: 2,
            ..JsonxConfig::default()
        };
        let v = Value::array(vec![Value::array(vec![Value::array(vec![])])]);
        assert_eq!(stringify(&v, &config), "[[{_depth:true}]]");
    }

    #[test]
    fn test_busy_placeholder() {
        let obj = Value::object();
        let _guard = obj.as_object().unwrap().borrow_mut();
        assert_eq!(enc(&obj), BUSY_PLACEHOLDER);
    }

    #[test]
    fn test_is_identifier() {
        assert!(is_identifier("a"));
        assert!(is_identifier("_x9"));
        assert!(is_identifier("$"));
        assert!(!is_identifier(""));
        assert!(!is_identifier("1a"));
        assert!(!is_identifier("a-b"));
        assert!(!is_identifier("ключ"));
    }
}
