//! JSON export: render persisted frames for inspection.
//!
//! Decodes every frame of a persisted stream with recorded type references
//! left untouched (no registry needed) and renders each as JSON:
//!
//! ```text
//! settings.bin → export_json() → [{"$type": "Settings", "$module": "Acat.Bci", ...}]
//!   → write_json_lines() → one frame per line
//! ```

use std::io::Write;

use serde_json::{json, Map};

use crate::codec::{decode_frames, DecodeLimits, Verbatim};
use crate::model::Value;
use crate::Result;

/// Decode every frame of `input` and render each one as JSON.
pub fn export_json(input: &[u8], limits: DecodeLimits) -> Result<Vec<serde_json::Value>> {
    let frames = decode_frames(input, &Verbatim, limits)?;
    Ok(frames.iter().map(value_to_json).collect())
}

/// Write one JSON document per frame.
pub fn write_json_lines(input: &[u8], limits: DecodeLimits, writer: &mut dyn Write) -> Result<usize> {
    let docs = export_json(input, limits)?;
    for doc in &docs {
        writeln!(writer, "{doc}")?;
    }
    Ok(docs.len())
}

/// Render a value as JSON.
///
/// Records become objects with `$type` and `$module` keys ahead of their
/// fields; bytes become arrays of numbers; timestamps become RFC 3339.
pub fn value_to_json(value: &Value) -> serde_json::Value {
    match value {
        Value::Null => serde_json::Value::Null,
        Value::Bool(b) => json!(b),
        Value::Int(i) => json!(i),
        Value::UInt(u) => json!(u),
        // Non-finite floats have no JSON form and render as null.
        Value::Float(f) => json!(f),
        Value::String(s) => json!(s),
        Value::Bytes(b) => json!(b),
        Value::List(items) => serde_json::Value::Array(items.iter().map(value_to_json).collect()),
        Value::Map(m) => serde_json::Value::Object(
            m.iter().map(|(k, v)| (k.clone(), value_to_json(v))).collect(),
        ),
        Value::Record(r) => {
            let mut obj = Map::new();
            obj.insert("$type".into(), json!(r.type_ref.type_name));
            obj.insert("$module".into(), json!(r.type_ref.module));
            for (k, v) in r.fields() {
                obj.insert(k.to_string(), value_to_json(v));
            }
            serde_json::Value::Object(obj)
        }
        Value::DateTime(dt) => json!(dt.to_rfc3339()),
    }
}
