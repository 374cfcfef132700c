//! Webhook payload handling.
//!
//! The request body doubles as the email body: it is parsed, checked for
//! "truthiness" and re-serialized with sorted keys in the compact-but-spaced
//! layout GitHub users are used to reading (`{"a": 1, "b": 2}`).

use std::io;

use serde::Serialize;
use serde_json::ser::Formatter;
use serde_json::{Map, Value};

/// Prefix for every relayed email subject.
pub const SUBJECT_PREFIX: &str = "[Github Webhook] ";

/// Parse the raw body as JSON.
///
/// Numbers keep the text they were sent with (serde_json's
/// `arbitrary_precision`), so integers wider than 64 bits survive intact.
///
/// Returns `None` when the body is not JSON or when the parsed value is
/// falsy (`null`, `false`, `0`, `""`, `[]`, `{}`).
pub fn parse_payload(raw: &[u8]) -> Option<Value> {
    let value: Value = serde_json::from_slice(raw).ok()?;
    is_truthy(&value).then_some(value)
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().map(|f| f != 0.0).unwrap_or(true),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

/// Email subject for a given `X-GitHub-Event` value.
pub fn subject_for(event: Option<&str>) -> String {
    format!("{}{}", SUBJECT_PREFIX, event.unwrap_or_default())
}

/// Render `value` with object keys sorted at every level.
pub fn render_sorted(value: &Value) -> Result<String, serde_json::Error> {
    let sorted = sort_keys(value);

    let mut buf = Vec::new();
    let mut ser = serde_json::Serializer::with_formatter(&mut buf, SpacedAsciiFormatter);
    sorted.serialize(&mut ser)?;

    String::from_utf8(buf)
        .map_err(|e| serde_json::Error::io(io::Error::new(io::ErrorKind::InvalidData, e)))
}

// Rebuilt explicitly so the order holds even if `preserve_order` gets
// enabled on serde_json somewhere in the dependency graph.
fn sort_keys(value: &Value) -> Value {
    match value {
        Value::Object(map) => {
            let mut entries: Vec<(&String, &Value)> = map.iter().collect();
            entries.sort_by(|a, b| a.0.cmp(b.0));

            let mut sorted = Map::new();
            for (key, inner) in entries {
                sorted.insert(key.clone(), sort_keys(inner));
            }
            Value::Object(sorted)
        }
        Value::Array(items) => Value::Array(items.iter().map(sort_keys).collect()),
        other => other.clone(),
    }
}

/// `", "` / `": "` separators and `\uXXXX` escapes for anything non-ASCII.
struct SpacedAsciiFormatter;

impl Formatter for SpacedAsciiFormatter {
    fn begin_array_value<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_key<W>(&mut self, writer: &mut W, first: bool) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if first {
            Ok(())
        } else {
            writer.write_all(b", ")
        }
    }

    fn begin_object_value<W>(&mut self, writer: &mut W) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        writer.write_all(b": ")
    }

    fn write_string_fragment<W>(&mut self, writer: &mut W, fragment: &str) -> io::Result<()>
    where
        W: ?Sized + io::Write,
    {
        if fragment.is_ascii() {
            return writer.write_all(fragment.as_bytes());
        }

        let mut units = [0u16; 2];
        for ch in fragment.chars() {
            if ch.is_ascii() {
                writer.write_all(&[ch as u8])?;
            } else {
                for unit in ch.encode_utf16(&mut units) {
                    write!(writer, "\\u{:04x}", unit)?;
                }
            }
        }
        Ok(())
    }
}
