//! Compact JSON output.
//!
//! Only live nodes are written. Object members without a readable key are
//! skipped, doubles use six significant digits (`%.6g`), and string bytes are
//! escaped but otherwise copied verbatim without UTF-8 validation.

use std::io::Write as _;

use crate::arena::Storage;
use crate::cursor::Cursor;
use crate::node::{NodeId, Payload};
use crate::tree::Tree;

/// Formats `value` the way C's `%.6g` does. `None` for NaN and infinities,
/// which JSON cannot represent.
pub fn format_double(value: f64) -> Option<String> {
    if !value.is_finite() {
        return None;
    }
    if value == 0.0 {
        return Some(if value.is_sign_negative() { "-0" } else { "0" }.to_owned());
    }
    let scientific = format!("{value:.5e}");
    let (mantissa, exponent) = scientific.split_once('e')?;
    let exponent: i32 = exponent.parse().ok()?;
    if !(-4..6).contains(&exponent) {
        let sign = if exponent < 0 { '-' } else { '+' };
        return Some(format!(
            "{}e{sign}{:02}",
            trim_fraction(mantissa),
            exponent.unsigned_abs()
        ));
    }
    let decimals = (5 - exponent) as usize;
    let fixed = format!("{value:.decimals$}");
    Some(trim_fraction(&fixed).to_owned())
}

fn trim_fraction(digits: &str) -> &str {
    if digits.contains('.') {
        digits.trim_end_matches('0').trim_end_matches('.')
    } else {
        digits
    }
}

const HEX: &[u8; 16] = b"0123456789abcdef";

fn write_escaped(out: &mut Vec<u8>, bytes: &[u8]) {
    out.push(b'"');
    for &byte in bytes {
        match byte {
            b'"' => out.extend_from_slice(b"\\\""),
            b'\\' => out.extend_from_slice(b"\\\\"),
            0x08 => out.extend_from_slice(b"\\b"),
            0x0c => out.extend_from_slice(b"\\f"),
            b'\n' => out.extend_from_slice(b"\\n"),
            b'\r' => out.extend_from_slice(b"\\r"),
            b'\t' => out.extend_from_slice(b"\\t"),
            0x00..=0x1f => {
                out.extend_from_slice(b"\\u00");
                out.push(HEX[(byte >> 4) as usize]);
                out.push(HEX[(byte & 0x0f) as usize]);
            }
            _ => out.push(byte),
        }
    }
    out.push(b'"');
}

struct JsonWriter<'t, 'o, S> {
    tree: &'t Tree<S>,
    out: &'o mut Vec<u8>,
}

impl<S: Storage> JsonWriter<'_, '_, S> {
    fn write_node(&mut self, id: NodeId) -> bool {
        let tree = self.tree;
        let Some(record) = tree.record(id) else {
            return false;
        };
        match record.payload {
            Payload::Null => self.out.extend_from_slice(b"null"),
            Payload::Bool(true) => self.out.extend_from_slice(b"true"),
            Payload::Bool(false) => self.out.extend_from_slice(b"false"),
            Payload::Int(n) => {
                let _ = write!(self.out, "{n}");
            }
            Payload::Double(n) => match format_double(n) {
                Some(text) => self.out.extend_from_slice(text.as_bytes()),
                None => self.out.extend_from_slice(b"null"),
            },
            Payload::Str(slot) => {
                let bytes = tree.key_bytes(slot).unwrap_or_default();
                write_escaped(self.out, bytes);
            }
            Payload::Object => {
                self.out.push(b'{');
                let mut first = true;
                for child in tree.live_children(id) {
                    let Some(key) = tree.record(child).and_then(|r| tree.key_bytes(r.key)) else {
                        continue;
                    };
                    if !first {
                        self.out.push(b',');
                    }
                    first = false;
                    write_escaped(self.out, key);
                    self.out.push(b':');
                    if !self.write_node(child) {
                        return false;
                    }
                }
                self.out.push(b'}');
            }
            Payload::Array => {
                self.out.push(b'[');
                for (i, child) in tree.live_children(id).enumerate() {
                    if i > 0 {
                        self.out.push(b',');
                    }
                    if !self.write_node(child) {
                        return false;
                    }
                }
                self.out.push(b']');
            }
        }
        true
    }
}

impl<S: Storage> Tree<S> {
    /// Replaces `out` with the JSON text of the whole tree. On failure `out`
    /// is left empty and `false` is returned.
    pub fn to_json(&self, out: &mut Vec<u8>) -> bool {
        self.emit(NodeId::ROOT, self.is_valid(), out)
    }

    /// Replaces `out` with the JSON text of the node at `cursor`.
    pub fn subtree_to_json(&self, cursor: &Cursor, out: &mut Vec<u8>) -> bool {
        match self.resolve_existing(cursor) {
            Ok(id) => self.emit(id, true, out),
            Err(_) => self.emit(NodeId::ROOT, false, out),
        }
    }

    fn emit(&self, id: NodeId, ok: bool, out: &mut Vec<u8>) -> bool {
        out.clear();
        if !ok || self.live_record(id).is_err() {
            return false;
        }
        let written = JsonWriter { tree: self, out: &mut *out }.write_node(id);
        if !written {
            out.clear();
        }
        written
    }

    /// The whole tree as a `String`; invalid UTF-8 in stored strings is
    /// replaced with U+FFFD.
    pub fn to_json_string(&self) -> Option<String> {
        let mut out = Vec::new();
        self.to_json(&mut out)
            .then(|| String::from_utf8_lossy(&out).into_owned())
    }

    /// The whole tree as a [`serde_json::Value`], keeping member order.
    #[cfg(feature = "json-value")]
    pub fn to_json_value(&self) -> Option<serde_json::Value> {
        if !self.is_valid() {
            return None;
        }
        self.node_to_value(NodeId::ROOT)
    }

    #[cfg(feature = "json-value")]
    fn node_to_value(&self, id: NodeId) -> Option<serde_json::Value> {
        use serde_json::Value as Json;

        let record = self.live_record(id).ok()?;
        let value = match record.payload {
            Payload::Null => Json::Null,
            Payload::Bool(b) => Json::Bool(b),
            Payload::Int(n) => Json::from(n),
            Payload::Double(n) => serde_json::Number::from_f64(n).map_or(Json::Null, Json::Number),
            Payload::Str(slot) => {
                Json::String(String::from_utf8_lossy(self.key_bytes(slot).unwrap_or_default()).into_owned())
            }
            Payload::Object => {
                let mut map = serde_json::Map::new();
                for child in self.live_children(id) {
                    let Some(key) = self.record(child).and_then(|r| self.key_bytes(r.key)) else {
                        continue;
                    };
                    map.insert(String::from_utf8_lossy(key).into_owned(), self.node_to_value(child)?);
                }
                Json::Object(map)
            }
            Payload::Array => Json::Array(
                self.live_children(id)
                    .map(|child| self.node_to_value(child))
                    .collect::<Option<Vec<_>>>()?,
            ),
        };
        Some(value)
    }
}
