//! Frame decoder: bytes → `Value`.
//!
//! Decoding is header-first. The type table is read and every entry is
//! bound through a [`TypeBinder`] before any field data is touched, so an
//! unresolvable type fails the frame without materializing anything.
//!
//! Every read is bounds-checked; running out of input at any offset is a
//! `DecodeError`, never a partially filled value.

use std::collections::BTreeMap;

use bytes::Buf;
use chrono::DateTime;

use super::format::{DecodeLimits, Tag, HEADER_LEN, MAGIC, VERSION};
use super::TypeBinder;
use crate::model::{Record, TypeRef, Value};
use crate::{Error, Result};

/// Reads consecutive frames from an in-memory byte stream.
pub struct FrameReader<'a, B: TypeBinder + ?Sized> {
    buf: &'a [u8],
    total: usize,
    binder: &'a B,
    limits: DecodeLimits,
}

impl<'a, B: TypeBinder + ?Sized> FrameReader<'a, B> {
    pub fn new(input: &'a [u8], binder: &'a B, limits: DecodeLimits) -> Self {
        Self {
            buf: input,
            total: input.len(),
            binder,
            limits,
        }
    }

    /// Absolute offset of the next unread byte.
    pub fn offset(&self) -> usize {
        self.total - self.buf.remaining()
    }

    pub fn is_empty(&self) -> bool {
        !self.buf.has_remaining()
    }

    /// Decode the next frame.
    pub fn read_frame(&mut self) -> Result<Value> {
        let start = self.offset();
        let magic = self.take(MAGIC.len())?;
        if magic != MAGIC {
            return Err(self.error_at(start, format!("bad magic {magic:02x?}")));
        }
        let version = self.u8()?;
        if version != VERSION {
            return Err(self.error_at(start + HEADER_LEN - 1, format!(
                "unsupported format version {version} (expected {VERSION})"
            )));
        }

        let count = self.u32()? as usize;
        let mut types = Vec::with_capacity(count.min(self.buf.remaining() / 8));
        for _ in 0..count {
            let type_name = self.string()?;
            let module = self.string()?;
            types.push(self.binder.bind(&TypeRef::new(type_name, module))?);
        }

        let value = self.value(&types, 0)?;
        tracing::trace!(start, end = self.offset(), types = types.len(), "decoded frame");
        Ok(value)
    }

    // ========================================================================
    // Values
    // ========================================================================

    fn value(&mut self, types: &[TypeRef], depth: usize) -> Result<Value> {
        let at = self.offset();
        if depth > self.limits.max_depth {
            return Err(self.error_at(at, format!(
                "nesting deeper than {} levels", self.limits.max_depth
            )));
        }

        let byte = self.u8()?;
        let tag = Tag::from_byte(byte)
            .ok_or_else(|| self.error_at(at, format!("unknown value tag 0x{byte:02x}")))?;

        Ok(match tag {
            Tag::Null => Value::Null,
            Tag::Bool => match self.u8()? {
                0 => Value::Bool(false),
                1 => Value::Bool(true),
                other => return Err(self.error_at(at + 1, format!("invalid bool byte {other}"))),
            },
            Tag::Int => {
                self.need(8)?;
                Value::Int(self.buf.get_i64_le())
            }
            Tag::UInt => {
                self.need(8)?;
                Value::UInt(self.buf.get_u64_le())
            }
            Tag::Float => {
                self.need(8)?;
                Value::Float(self.buf.get_f64_le())
            }
            Tag::String => Value::String(self.string()?),
            Tag::Bytes => {
                let len = self.u32()? as usize;
                Value::Bytes(self.take(len)?.to_vec())
            }
            Tag::List => {
                let count = self.u32()? as usize;
                let mut items = Vec::with_capacity(count.min(self.buf.remaining()));
                for _ in 0..count {
                    items.push(self.value(types, depth + 1)?);
                }
                Value::List(items)
            }
            Tag::Map => {
                let count = self.u32()? as usize;
                let mut map = BTreeMap::new();
                for _ in 0..count {
                    let key_at = self.offset();
                    let key = self.string()?;
                    if map.last_key_value().is_some_and(|(last, _)| *last >= key) {
                        return Err(self.error_at(key_at, format!(
                            "map key `{key}` is duplicated or out of order"
                        )));
                    }
                    let v = self.value(types, depth + 1)?;
                    map.insert(key, v);
                }
                Value::Map(map)
            }
            Tag::Record => {
                let idx_at = self.offset();
                let idx = self.u32()? as usize;
                let type_ref = types.get(idx).cloned().ok_or_else(|| {
                    self.error_at(idx_at, format!(
                        "type index {idx} out of range (table has {})", types.len()
                    ))
                })?;
                let count = self.u32()? as usize;
                let mut record = Record::new(type_ref);
                for _ in 0..count {
                    let name = self.string()?;
                    let v = self.value(types, depth + 1)?;
                    record.push_field(name, v);
                }
                Value::Record(Box::new(record))
            }
            Tag::DateTime => {
                self.need(12)?;
                let secs = self.buf.get_i64_le();
                let nanos = self.buf.get_u32_le();
                let dt = DateTime::from_timestamp(secs, nanos).ok_or_else(|| {
                    self.error_at(at, format!("timestamp {secs}s {nanos}ns out of range"))
                })?;
                Value::DateTime(dt)
            }
        })
    }

    // ========================================================================
    // Primitive reads
    // ========================================================================

    fn need(&self, n: usize) -> Result<()> {
        if self.buf.remaining() < n {
            return Err(self.error_at(self.offset(), format!(
                "unexpected end of stream: needed {n} bytes, {} left",
                self.buf.remaining()
            )));
        }
        Ok(())
    }

    fn take(&mut self, n: usize) -> Result<&'a [u8]> {
        self.need(n)?;
        let buf: &'a [u8] = self.buf;
        let (head, tail) = buf.split_at(n);
        self.buf = tail;
        Ok(head)
    }

    fn u8(&mut self) -> Result<u8> {
        self.need(1)?;
        Ok(self.buf.get_u8())
    }

    fn u32(&mut self) -> Result<u32> {
        self.need(4)?;
        Ok(self.buf.get_u32_le())
    }

    fn string(&mut self) -> Result<String> {
        let len = self.u32()? as usize;
        let at = self.offset();
        let raw = self.take(len)?;
        String::from_utf8(raw.to_vec())
            .map_err(|e| self.error_at(at, format!("invalid UTF-8: {e}")))
    }

    fn error_at(&self, offset: usize, message: String) -> Error {
        Error::DecodeError { offset, message }
    }
}

impl<B: TypeBinder + ?Sized> Iterator for FrameReader<'_, B> {
    type Item = Result<Value>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.is_empty() {
            return None;
        }
        let frame = self.read_frame();
        if frame.is_err() {
            // Stop after the first bad frame; later offsets are meaningless.
            self.buf = &[];
        }
        Some(frame)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::codec::{encode_frame, Verbatim};

    fn decode(bytes: &[u8]) -> Result<Value> {
        FrameReader::new(bytes, &Verbatim, DecodeLimits::default()).read_frame()
    }

    #[test]
    fn test_bad_magic() {
        let err = decode(b"NOPE\x01\x00\x00\x00\x00\x00").unwrap_err();
        assert!(matches!(err, Error::DecodeError { offset: 0, .. }), "got {err:?}");
    }

    #[test]
    fn test_version_mismatch() {
        let mut bytes = encode_frame(&Value::Null).unwrap();
        bytes[HEADER_LEN - 1] = 9;
        match decode(&bytes).unwrap_err() {
            Error::DecodeError { offset, message } => {
                assert_eq!(offset, HEADER_LEN - 1);
                assert!(message.contains("version 9"));
            }
            other => panic!("unexpected error {other:?}"),
        }
    }

    #[test]
    fn test_unknown_tag() {
        let mut bytes = encode_frame(&Value::Null).unwrap();
        let last = bytes.len() - 1;
        bytes[last] = 0x7F;
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, Error::DecodeError { offset, .. } if offset == last));
    }

    #[test]
    fn test_out_of_range_type_index() {
        let record = Record::new(TypeRef::new("A", "M"));
        let mut bytes = encode_frame(&record.into()).unwrap();
        // type table: count(4) + "A"(4+1) + "M"(4+1), then the record tag
        let idx_pos = HEADER_LEN + 4 + 5 + 5 + 1;
        bytes[idx_pos..idx_pos + 4].copy_from_slice(&3u32.to_le_bytes());
        let err = decode(&bytes).unwrap_err();
        assert!(matches!(err, Error::DecodeError { .. }), "got {err:?}");
    }

    #[test]
    fn test_depth_limit() {
        let mut v = Value::Null;
        for _ in 0..10 {
            v = Value::List(vec![v]);
        }
        let bytes = encode_frame(&v).unwrap();
        let shallow = DecodeLimits { max_depth: 4 };
        let err = FrameReader::new(&bytes, &Verbatim, shallow).read_frame().unwrap_err();
        assert!(matches!(err, Error::DecodeError { .. }));
        assert_eq!(decode(&bytes).unwrap(), v);
    }

    #[test]
    fn test_binder_failure_stops_before_fields() {
        struct Refuse;
        impl TypeBinder for Refuse {
            fn bind(&self, recorded: &TypeRef) -> Result<TypeRef> {
                Err(Error::TypeResolutionError {
                    type_name: recorded.type_name.clone(),
                    module: recorded.module.clone(),
                    attempted_module: recorded.module.clone(),
                })
            }
        }
        let record = Record::new(TypeRef::new("A", "M")).with_field("x", 1);
        let bytes = encode_frame(&record.into()).unwrap();
        let err = FrameReader::new(&bytes, &Refuse, DecodeLimits::default())
            .read_frame()
            .unwrap_err();
        assert!(matches!(err, Error::TypeResolutionError { .. }));
    }

    #[test]
    fn test_reader_iterates_concatenated_frames() {
        let mut bytes = encode_frame(&Value::Int(1)).unwrap();
        bytes.extend(encode_frame(&Value::from("two")).unwrap());
        let frames: Vec<Value> = FrameReader::new(&bytes, &Verbatim, DecodeLimits::default())
            .collect::<Result<_>>()
            .unwrap();
        assert_eq!(frames, vec![Value::Int(1), Value::from("two")]);
    }
}
