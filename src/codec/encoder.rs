//! Frame encoder: `Value` → bytes.

use bytes::{BufMut, BytesMut};
use hashbrown::HashMap;

use super::format::{Tag, MAGIC, VERSION};
use crate::model::{Record, TypeRef, Value};
use crate::{Error, Result};

/// Encode `value` as one complete frame.
///
/// The body is encoded first so that the type table can list exactly the
/// distinct record types it references, in first-seen (pre-order) order.
/// The root record, if any, is always entry 0.
pub fn encode_frame(value: &Value) -> Result<Vec<u8>> {
    let mut enc = Encoder::default();
    enc.value(value)?;

    let mut out = BytesMut::with_capacity(enc.body.len() + 64);
    out.put_slice(&MAGIC);
    out.put_u8(VERSION);
    out.put_u32_le(len_u32(enc.types.len(), "type table")?);
    for t in &enc.types {
        put_str(&mut out, &t.type_name)?;
        put_str(&mut out, &t.module)?;
    }
    out.put_slice(&enc.body);
    Ok(out.to_vec())
}

#[derive(Default)]
struct Encoder {
    types: Vec<TypeRef>,
    index: HashMap<TypeRef, u32>,
    body: BytesMut,
}

impl Encoder {
    fn type_index(&mut self, type_ref: &TypeRef) -> Result<u32> {
        if let Some(&idx) = self.index.get(type_ref) {
            return Ok(idx);
        }
        if type_ref.type_name.is_empty() {
            return Err(Error::EncodeError(format!(
                "record in module `{}` has an empty type name",
                type_ref.module
            )));
        }
        let idx = len_u32(self.types.len(), "type table")?;
        self.types.push(type_ref.clone());
        self.index.insert(type_ref.clone(), idx);
        Ok(idx)
    }

    fn value(&mut self, value: &Value) -> Result<()> {
        match value {
            Value::Null => self.body.put_u8(Tag::Null as u8),
            Value::Bool(b) => {
                self.body.put_u8(Tag::Bool as u8);
                self.body.put_u8(u8::from(*b));
            }
            Value::Int(i) => {
                self.body.put_u8(Tag::Int as u8);
                self.body.put_i64_le(*i);
            }
            Value::UInt(u) => {
                self.body.put_u8(Tag::UInt as u8);
                self.body.put_u64_le(*u);
            }
            Value::Float(f) => {
                self.body.put_u8(Tag::Float as u8);
                self.body.put_f64_le(*f);
            }
            Value::String(s) => {
                self.body.put_u8(Tag::String as u8);
                put_str(&mut self.body, s)?;
            }
            Value::Bytes(b) => {
                self.body.put_u8(Tag::Bytes as u8);
                self.body.put_u32_le(len_u32(b.len(), "byte string")?);
                self.body.put_slice(b);
            }
            Value::List(items) => {
                self.body.put_u8(Tag::List as u8);
                self.body.put_u32_le(len_u32(items.len(), "list")?);
                for item in items {
                    self.value(item)?;
                }
            }
            Value::Map(m) => {
                self.body.put_u8(Tag::Map as u8);
                self.body.put_u32_le(len_u32(m.len(), "map")?);
                for (k, v) in m {
                    put_str(&mut self.body, k)?;
                    self.value(v)?;
                }
            }
            Value::Record(r) => self.record(r)?,
            Value::DateTime(dt) => {
                self.body.put_u8(Tag::DateTime as u8);
                self.body.put_i64_le(dt.timestamp());
                self.body.put_u32_le(dt.timestamp_subsec_nanos());
            }
        }
        Ok(())
    }

    fn record(&mut self, record: &Record) -> Result<()> {
        // Index assigned before descending: parents precede children.
        let idx = self.type_index(&record.type_ref)?;
        self.body.put_u8(Tag::Record as u8);
        self.body.put_u32_le(idx);
        self.body.put_u32_le(len_u32(record.len(), "record")?);
        for (name, v) in record.fields() {
            put_str(&mut self.body, name)?;
            self.value(v)?;
        }
        Ok(())
    }
}

fn len_u32(len: usize, what: &str) -> Result<u32> {
    u32::try_from(len).map_err(|_| {
        Error::EncodeError(format!("{what} length {len} exceeds the u32 length prefix"))
    })
}

fn put_str(out: &mut BytesMut, s: &str) -> Result<()> {
    out.put_u32_le(len_u32(s.len(), "string")?);
    out.put_slice(s.as_bytes());
    Ok(())
}
