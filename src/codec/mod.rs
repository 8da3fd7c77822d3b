//! Binary frame codec.
//!
//! `Value` tree ⇄ self-describing frame. See [`format`] for the byte layout.

pub mod format;
pub mod encoder;
pub mod decoder;

use crate::model::{TypeRef, Value};
use crate::Result;

pub use decoder::FrameReader;
pub use encoder::encode_frame;
pub use format::{DecodeLimits, Tag, HEADER_LEN, MAGIC, VERSION};

/// Binds a recorded type reference to the one the decoded value will carry.
///
/// `TypeResolver` is the binding used for loads; `Verbatim` keeps recorded
/// references untouched for inspection.
pub trait TypeBinder {
    fn bind(&self, recorded: &TypeRef) -> Result<TypeRef>;
}

/// Accept every type reference as recorded.
#[derive(Debug, Clone, Copy, Default)]
pub struct Verbatim;

impl TypeBinder for Verbatim {
    fn bind(&self, recorded: &TypeRef) -> Result<TypeRef> {
        Ok(recorded.clone())
    }
}

/// Decode the first frame of `input`.
pub fn decode_frame<B: TypeBinder + ?Sized>(
    input: &[u8],
    binder: &B,
    limits: DecodeLimits,
) -> Result<Value> {
    FrameReader::new(input, binder, limits).read_frame()
}

/// Decode every frame of `input`, in order.
pub fn decode_frames<B: TypeBinder + ?Sized>(
    input: &[u8],
    binder: &B,
    limits: DecodeLimits,
) -> Result<Vec<Value>> {
    FrameReader::new(input, binder, limits).collect()
}
