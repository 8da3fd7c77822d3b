//! The `Persist` capability: what may be written by a `Persister`.
//!
//! Encodability is a compile-time property. A type is encodable exactly when
//! it implements `Persist`; named record types additionally implement
//! `PersistRecord`, which gives them the `TypeRef` recorded in the stream.
//!
//! `Persist` is not implemented for `Rc`/`Arc`: the encoder
//! writes trees, and shared or cyclic graphs are not representable.

use std::collections::{BTreeMap, HashMap};

use chrono::{DateTime, Utc};

use crate::model::{Record, TypeRef, Value};
use crate::registry::TypeRegistry;
use crate::{Error, Result};

/// A type whose values can be lowered to and raised from a `Value` tree.
pub trait Persist: Sized {
    /// Label used in `TypeMismatch` diagnostics.
    fn type_label() -> String;

    fn to_value(&self) -> Result<Value>;

    /// Raise a decoded value. Fails with `Error::TypeMismatch` when the value
    /// does not have this type's shape.
    fn from_value(value: Value) -> Result<Self>;

    /// Register every record type reachable from this type.
    ///
    /// Default: no record types (scalars).
    fn register_types(registry: &mut TypeRegistry) -> Result<()> {
        let _ = registry;
        Ok(())
    }
}

/// A named record type. Its `TypeRef` is written to the type table.
pub trait PersistRecord: Persist + 'static {
    const TYPE_NAME: &'static str;
    /// Identity of the module that owns this type.
    const MODULE: &'static str;

    fn type_ref() -> TypeRef {
        TypeRef::new(Self::TYPE_NAME, Self::MODULE)
    }
}

// ============================================================================
// Helpers used by `persist_record!`
// ============================================================================

pub fn mismatch<T: Persist>(got: &Value) -> Error {
    Error::TypeMismatch {
        expected: T::type_label(),
        got: got.describe(),
    }
}

/// Unwrap a value as a record of type `T`.
pub fn expect_record<T: PersistRecord>(value: Value) -> Result<Record> {
    match value {
        Value::Record(r) if r.type_ref == T::type_ref() => Ok(*r),
        other => Err(mismatch::<T>(&other)),
    }
}

/// Take field `name` out of `record` and raise it as `T`.
///
/// A missing field is a `TypeMismatch`: the stored record does not have
/// the shape the caller expects.
pub fn take_field<T: Persist>(record: &mut Record, name: &str) -> Result<T> {
    match record.take(name) {
        Some(v) => T::from_value(v),
        None => Err(Error::TypeMismatch {
            expected: format!("field `{name}` of {}", record.type_ref),
            got: "missing field".into(),
        }),
    }
}

/// Implement `Persist` and `PersistRecord` for a struct with named fields.
///
/// ```rust
/// use persist::persist_record;
///
/// #[derive(Debug, PartialEq)]
/// struct Layout { name: String, rows: Vec<u32> }
///
/// persist_record!(Layout in "Acat.Bci" { name: String, rows: Vec<u32> });
/// ```
///
/// The type name defaults to the struct name; use `Layout as "KeyboardLayout"
/// in "..."` to record a different one. Fields present in the stream but not
/// listed here are ignored on load.
#[macro_export]
macro_rules! persist_record {
    (@impl $ty:ident, $name:expr, $module:expr, { $($field:ident : $fty:ty),* }) => {
        impl $crate::PersistRecord for $ty {
            const TYPE_NAME: &'static str = $name;
            const MODULE: &'static str = $module;
        }

        impl $crate::Persist for $ty {
            fn type_label() -> String {
                <Self as $crate::PersistRecord>::type_ref().to_string()
            }

            fn to_value(&self) -> $crate::Result<$crate::Value> {
                #[allow(unused_mut)]
                let mut record = $crate::Record::new(<Self as $crate::PersistRecord>::type_ref());
                $( record.push_field(stringify!($field), $crate::Persist::to_value(&self.$field)?); )*
                Ok($crate::Value::from(record))
            }

            fn from_value(value: $crate::Value) -> $crate::Result<Self> {
                #[allow(unused_mut, unused_variables)]
                let mut record = $crate::persist::expect_record::<Self>(value)?;
                Ok(Self {
                    $( $field: $crate::persist::take_field::<$fty>(&mut record, stringify!($field))?, )*
                })
            }

            fn register_types(registry: &mut $crate::TypeRegistry) -> $crate::Result<()> {
                if registry.insert::<Self>()? {
                    $( <$fty as $crate::Persist>::register_types(registry)?; )*
                }
                Ok(())
            }
        }
    };
    ($ty:ident in $module:literal { $($field:ident : $fty:ty),* $(,)? }) => {
        $crate::persist_record!(@impl $ty, stringify!($ty), $module, { $($field : $fty),* });
    };
    ($ty:ident as $name:literal in $module:literal { $($field:ident : $fty:ty),* $(,)? }) => {
        $crate::persist_record!(@impl $ty, $name, $module, { $($field : $fty),* });
    };
}

// ============================================================================
// Scalars
// ============================================================================

impl Persist for bool {
    fn type_label() -> String { "bool".into() }
    fn to_value(&self) -> Result<Value> { Ok(Value::Bool(*self)) }
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bool(b) => Ok(b),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

macro_rules! persist_signed {
    ($($t:ty),*) => {$(
        impl Persist for $t {
            fn type_label() -> String { stringify!($t).into() }
            fn to_value(&self) -> Result<Value> { Ok(Value::Int(i64::from(*self))) }
            fn from_value(value: Value) -> Result<Self> {
                value
                    .as_int()
                    .and_then(|i| <$t>::try_from(i).ok())
                    .ok_or_else(|| mismatch::<Self>(&value))
            }
        }
    )*};
}

macro_rules! persist_unsigned {
    ($($t:ty),*) => {$(
        impl Persist for $t {
            fn type_label() -> String { stringify!($t).into() }
            fn to_value(&self) -> Result<Value> { Ok(Value::UInt(u64::from(*self))) }
            fn from_value(value: Value) -> Result<Self> {
                value
                    .as_uint()
                    .and_then(|u| <$t>::try_from(u).ok())
                    .ok_or_else(|| mismatch::<Self>(&value))
            }
        }
    )*};
}

persist_signed!(i8, i16, i32, i64);
persist_unsigned!(u8, u16, u32, u64);

impl Persist for usize {
    fn type_label() -> String { "usize".into() }
    fn to_value(&self) -> Result<Value> {
        u64::try_from(*self)
            .map(Value::UInt)
            .map_err(|_| Error::EncodeError(format!("usize {self} does not fit in 64 bits")))
    }
    fn from_value(value: Value) -> Result<Self> {
        value
            .as_uint()
            .and_then(|u| usize::try_from(u).ok())
            .ok_or_else(|| mismatch::<Self>(&value))
    }
}

impl Persist for f64 {
    fn type_label() -> String { "f64".into() }
    fn to_value(&self) -> Result<Value> { Ok(Value::Float(*self)) }
    fn from_value(value: Value) -> Result<Self> {
        value.as_float().ok_or_else(|| mismatch::<Self>(&value))
    }
}

impl Persist for f32 {
    fn type_label() -> String { "f32".into() }
    fn to_value(&self) -> Result<Value> { Ok(Value::Float(f64::from(*self))) }
    fn from_value(value: Value) -> Result<Self> {
        // Finite values beyond the f32 range would silently become infinite.
        value
            .as_float()
            .filter(|f| !f.is_finite() || (f64::from(f32::MIN)..=f64::from(f32::MAX)).contains(f))
            .map(|f| f as f32)
            .ok_or_else(|| mismatch::<Self>(&value))
    }
}

impl Persist for String {
    fn type_label() -> String { "String".into() }
    fn to_value(&self) -> Result<Value> { Ok(Value::String(self.clone())) }
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::String(s) => Ok(s),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

/// Raw byte payloads. `Vec<u8>` goes through the generic list encoding;
/// use `Bytes` for blobs.
impl Persist for bytes::Bytes {
    fn type_label() -> String { "Bytes".into() }
    fn to_value(&self) -> Result<Value> { Ok(Value::Bytes(self.to_vec())) }
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Bytes(b) => Ok(bytes::Bytes::from(b)),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

impl Persist for DateTime<Utc> {
    fn type_label() -> String { "DateTime<Utc>".into() }
    fn to_value(&self) -> Result<Value> { Ok(Value::DateTime(*self)) }
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::DateTime(dt) => Ok(dt),
            other => Err(mismatch::<Self>(&other)),
        }
    }
}

/// Identity: lets dynamic values sit inside typed records.
impl Persist for Value {
    fn type_label() -> String { "Value".into() }
    fn to_value(&self) -> Result<Value> { Ok(self.clone()) }
    fn from_value(value: Value) -> Result<Self> { Ok(value) }
}

// ============================================================================
// Containers
// ============================================================================

impl<T: Persist> Persist for Option<T> {
    fn type_label() -> String { format!("Option<{}>", T::type_label()) }
    fn to_value(&self) -> Result<Value> {
        match self {
            Some(v) => v.to_value(),
            None => Ok(Value::Null),
        }
    }
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Null => Ok(None),
            other => T::from_value(other).map(Some),
        }
    }
    fn register_types(registry: &mut TypeRegistry) -> Result<()> {
        T::register_types(registry)
    }
}

impl<T: Persist> Persist for Box<T> {
    fn type_label() -> String { T::type_label() }
    fn to_value(&self) -> Result<Value> { (**self).to_value() }
    fn from_value(value: Value) -> Result<Self> { T::from_value(value).map(Box::new) }
    fn register_types(registry: &mut TypeRegistry) -> Result<()> {
        T::register_types(registry)
    }
}

impl<T: Persist> Persist for Vec<T> {
    fn type_label() -> String { format!("Vec<{}>", T::type_label()) }
    fn to_value(&self) -> Result<Value> {
        self.iter().map(Persist::to_value).collect::<Result<Vec<_>>>().map(Value::List)
    }
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::List(items) => items.into_iter().map(T::from_value).collect(),
            other => Err(mismatch::<Self>(&other)),
        }
    }
    fn register_types(registry: &mut TypeRegistry) -> Result<()> {
        T::register_types(registry)
    }
}

impl<T: Persist> Persist for BTreeMap<String, T> {
    fn type_label() -> String { format!("BTreeMap<String, {}>", T::type_label()) }
    fn to_value(&self) -> Result<Value> {
        self.iter()
            .map(|(k, v)| v.to_value().map(|v| (k.clone(), v)))
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Value::Map)
    }
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(m) => m.into_iter().map(|(k, v)| T::from_value(v).map(|v| (k, v))).collect(),
            other => Err(mismatch::<Self>(&other)),
        }
    }
    fn register_types(registry: &mut TypeRegistry) -> Result<()> {
        T::register_types(registry)
    }
}

impl<T: Persist> Persist for HashMap<String, T> {
    fn type_label() -> String { format!("HashMap<String, {}>", T::type_label()) }
    fn to_value(&self) -> Result<Value> {
        self.iter()
            .map(|(k, v)| v.to_value().map(|v| (k.clone(), v)))
            .collect::<Result<BTreeMap<_, _>>>()
            .map(Value::Map)
    }
    fn from_value(value: Value) -> Result<Self> {
        match value {
            Value::Map(m) => m.into_iter().map(|(k, v)| T::from_value(v).map(|v| (k, v))).collect(),
            other => Err(mismatch::<Self>(&other)),
        }
    }
    fn register_types(registry: &mut TypeRegistry) -> Result<()> {
        T::register_types(registry)
    }
}
