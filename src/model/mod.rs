//! # Persisted Value Model
//!
//! Dynamic DTOs for encodable object graphs. Typed values are lowered into
//! these before encoding and raised from them after decoding.
//!
//! Design rule: this module is pure data: no I/O, no registry, no codec.

pub mod value;
pub mod record;

pub use value::Value;
pub use record::{Fields, Record, TypeRef};
