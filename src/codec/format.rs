//! Frame layout constants (format version 1).
//!
//! ```text
//! frame      := magic version type_table value
//! magic      := "PRST"
//! version    := u8 (= 1)
//! type_table := u32 count, count × (str type_name, str module)
//! str        := u32 byte length, UTF-8 bytes
//! value      := tag payload
//! ```
//!
//! All integers are little-endian. Payloads per tag are documented on
//! [`Tag`]. An appended file is a plain concatenation of frames.

pub const MAGIC: [u8; 4] = *b"PRST";
pub const VERSION: u8 = 1;

/// Bytes before the type table: magic + version.
pub const HEADER_LEN: usize = MAGIC.len() + 1;

/// Value tags.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum Tag {
    /// no payload
    Null = 0x00,
    /// u8, 0 or 1
    Bool = 0x01,
    /// i64
    Int = 0x02,
    /// u64
    UInt = 0x03,
    /// f64 bits
    Float = 0x04,
    /// str
    String = 0x05,
    /// u32 length, raw bytes
    Bytes = 0x06,
    /// u32 count, count × value
    List = 0x07,
    /// u32 count, count × (str key, value), keys strictly ascending
    Map = 0x08,
    /// u32 type index, u32 field count, count × (str name, value)
    Record = 0x09,
    /// i64 seconds since the Unix epoch, u32 subsecond nanoseconds
    DateTime = 0x0A,
}

impl Tag {
    pub fn from_byte(b: u8) -> Option<Self> {
        Some(match b {
            0x00 => Tag::Null,
            0x01 => Tag::Bool,
            0x02 => Tag::Int,
            0x03 => Tag::UInt,
            0x04 => Tag::Float,
            0x05 => Tag::String,
            0x06 => Tag::Bytes,
            0x07 => Tag::List,
            0x08 => Tag::Map,
            0x09 => Tag::Record,
            0x0A => Tag::DateTime,
            _ => return None,
        })
    }
}

/// Limits applied while decoding untrusted input.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DecodeLimits {
    /// Maximum nesting of lists, maps and records.
    pub max_depth: usize,
}

impl Default for DecodeLimits {
    fn default() -> Self {
        Self { max_depth: 128 }
    }
}
