//! # Type Registry
//!
//! The set of record types the running process can instantiate, keyed by
//! (module identity, type name). The resolver consults it once per type
//! table entry while loading.
//!
//! ## Registration
//!
//! Types are registered through `Persist::register_types`, which walks a
//! type's fields so that registering a root registers every nested record
//! type too. Re-registering the same Rust type is a no-op; registering a
//! *different* Rust type under an existing `TypeRef` is a `RegistryError`.

pub mod resolver;

use std::any::{type_name, TypeId};

use hashbrown::HashMap;

use crate::model::TypeRef;
use crate::persist::{Persist, PersistRecord};
use crate::{Error, Result};

pub use resolver::{CaseSensitivity, ModuleIdentity, TypeResolver};

// ============================================================================
// TypeDescriptor
// ============================================================================

/// A record type known to this process.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TypeDescriptor {
    pub type_ref: TypeRef,
    pub type_id: TypeId,
    /// Rust path of the implementing type, for diagnostics.
    pub rust_name: &'static str,
}

impl TypeDescriptor {
    pub fn of<T: PersistRecord>() -> Self {
        Self {
            type_ref: T::type_ref(),
            type_id: TypeId::of::<T>(),
            rust_name: type_name::<T>(),
        }
    }

    pub fn is<T: 'static>(&self) -> bool {
        self.type_id == TypeId::of::<T>()
    }
}

// ============================================================================
// TypeRegistry
// ============================================================================

/// Registered record types grouped by module identity.
#[derive(Debug, Clone, Default)]
pub struct TypeRegistry {
    /// module → type name → descriptor
    modules: HashMap<String, HashMap<String, TypeDescriptor>>,
}

impl TypeRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `T` and every record type reachable from it.
    pub fn register<T: Persist>(&mut self) -> Result<()> {
        T::register_types(self)
    }

    /// Insert a single record type. Returns `true` if it was not yet known,
    /// which tells `register_types` whether to descend into its fields.
    pub fn insert<T: PersistRecord>(&mut self) -> Result<bool> {
        let desc = TypeDescriptor::of::<T>();
        let types = self.modules.entry(desc.type_ref.module.clone()).or_default();

        if let Some(existing) = types.get(&desc.type_ref.type_name) {
            if existing.type_id == desc.type_id {
                return Ok(false);
            }
            return Err(Error::RegistryError(format!(
                "{} is already registered to {}, cannot register {}",
                desc.type_ref, existing.rust_name, desc.rust_name
            )));
        }

        tracing::trace!(type_ref = %desc.type_ref, rust = desc.rust_name, "registered type");
        types.insert(desc.type_ref.type_name.clone(), desc);
        Ok(true)
    }

    /// Exact lookup; no prefix substitution happens here.
    pub fn lookup(&self, module: &str, type_name: &str) -> Option<&TypeDescriptor> {
        self.modules.get(module)?.get(type_name)
    }

    pub fn contains<T: PersistRecord>(&self) -> bool {
        self.lookup(T::MODULE, T::TYPE_NAME).is_some_and(|d| d.is::<T>())
    }

    /// Module identities with at least one registered type.
    pub fn modules(&self) -> impl Iterator<Item = &str> {
        self.modules.keys().map(String::as_str)
    }

    pub fn iter(&self) -> impl Iterator<Item = &TypeDescriptor> {
        self.modules.values().flat_map(|types| types.values())
    }

    pub fn len(&self) -> usize {
        self.modules.values().map(|types| types.len()).sum()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persist_record;

    struct Settings {
        volume: f64,
    }
    persist_record!(Settings in "App.Core" { volume: f64 });

    // Same TypeRef, different Rust type.
    struct Impostor {
        volume: f64,
    }
    persist_record!(Impostor as "Settings" in "App.Core" { volume: f64 });

    #[test]
    fn test_insert_is_idempotent() {
        let mut registry = TypeRegistry::new();
        assert!(registry.insert::<Settings>().unwrap());
        assert!(!registry.insert::<Settings>().unwrap());
        assert_eq!(registry.len(), 1);
        assert!(registry.contains::<Settings>());
        assert_eq!(registry.modules().collect::<Vec<_>>(), vec!["App.Core"]);
    }

    #[test]
    fn test_conflicting_registration_rejected() {
        let mut registry = TypeRegistry::new();
        registry.register::<Settings>().unwrap();
        let err = registry.register::<Impostor>().unwrap_err();
        assert!(matches!(err, Error::RegistryError(_)), "got {err:?}");
        assert!(!registry.contains::<Impostor>());
    }

    #[test]
    fn test_lookup_is_exact() {
        let mut registry = TypeRegistry::new();
        registry.register::<Settings>().unwrap();
        assert!(registry.lookup("App.Core", "Settings").is_some());
        assert!(registry.lookup("App", "Settings").is_none());
        assert!(registry.lookup("app.core", "Settings").is_none());
    }
}
