//! Type resolution across module renames.
//!
//! A stream records the module that owned each type *at save time*. When
//! several legacy modules are merged into one, old files keep pointing at
//! the old names. The resolver applies the prefix-substitution rule:
//!
//! ```text
//! current identity   "Foo.Merged"      short name "Foo"
//! recorded module    "Foo.Legacy"      starts with "Foo" → "Foo.Merged"
//! recorded module    "Bar"             no prefix match → looked up as-is
//! ```
//!
//! A remapped lookup that misses falls back to the recorded module, then to
//! the current module family. The configured identity may carry a version
//! suffix (`"Foo.Merged, Version=2.0"`) while types declare the bare module.
//!
//! The comparison is an exact substring-at-start check, case-sensitive
//! unless `CaseSensitivity::Insensitive` is configured.

use serde::{Deserialize, Serialize};

use super::{TypeDescriptor, TypeRegistry};
use crate::codec::TypeBinder;
use crate::config::PersistConfig;
use crate::model::TypeRef;
use crate::{Error, Result};

/// Case policy for the module prefix comparison.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CaseSensitivity {
    #[default]
    Sensitive,
    Insensitive,
}

// ============================================================================
// ModuleIdentity
// ============================================================================

/// Canonical identity of the module providing the current types, e.g.
/// `"Acat.Bci, Version=2.1.0"`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ModuleIdentity {
    full: String,
    /// Byte length of the short name (text before the first separator).
    short_len: usize,
}

impl ModuleIdentity {
    pub fn new(full: impl Into<String>, separators: &[char]) -> Self {
        let full = full.into();
        let short_len = full.find(|c: char| separators.contains(&c)).unwrap_or(full.len());
        Self { full, short_len }
    }

    pub fn full(&self) -> &str {
        &self.full
    }

    /// Leading, stable component of the identity.
    pub fn short_name(&self) -> &str {
        &self.full[..self.short_len]
    }

    /// Does `recorded` start with this identity's short name?
    ///
    /// An empty short name never matches; otherwise every module would be
    /// remapped.
    pub fn is_prefix_of(&self, recorded: &str, case: CaseSensitivity) -> bool {
        let short = self.short_name();
        if short.is_empty() {
            return false;
        }
        match case {
            CaseSensitivity::Sensitive => recorded.starts_with(short),
            CaseSensitivity::Insensitive => {
                let mut rest = recorded.chars().flat_map(char::to_lowercase);
                short
                    .chars()
                    .flat_map(char::to_lowercase)
                    .all(|c| rest.next() == Some(c))
            }
        }
    }
}

impl std::fmt::Display for ModuleIdentity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(&self.full)
    }
}

// ============================================================================
// TypeResolver
// ============================================================================

/// Maps recorded (type name, module) pairs onto registered types.
///
/// Holds no state beyond its inputs; build one per load.
#[derive(Debug, Clone)]
pub struct TypeResolver<'r> {
    registry: &'r TypeRegistry,
    current: ModuleIdentity,
    case: CaseSensitivity,
}

impl<'r> TypeResolver<'r> {
    pub fn new(registry: &'r TypeRegistry, current: ModuleIdentity, case: CaseSensitivity) -> Self {
        Self { registry, current, case }
    }

    pub fn from_config(registry: &'r TypeRegistry, config: &PersistConfig) -> Self {
        Self::new(registry, config.module_identity(), config.case_sensitivity)
    }

    pub fn current_module(&self) -> &ModuleIdentity {
        &self.current
    }

    pub fn case_sensitivity(&self) -> CaseSensitivity {
        self.case
    }

    /// The module name actually looked up for `recorded`.
    pub fn effective_module<'a>(&'a self, recorded: &'a str) -> &'a str {
        if self.current.is_prefix_of(recorded, self.case) {
            self.current.full()
        } else {
            recorded
        }
    }

    /// Resolve a recorded type reference to a registered type.
    ///
    /// When the prefix rule applies, candidates are tried in order:
    ///
    /// 1. the full current identity
    /// 2. the recorded module as written
    /// 3. the single registered type of that name whose own module also
    ///    starts with the current short name
    ///
    /// Otherwise only the recorded module is looked up.
    pub fn resolve(&self, recorded: &TypeRef) -> Result<&'r TypeDescriptor> {
        let module = self.effective_module(&recorded.module);
        let found = if module == recorded.module {
            self.registry.lookup(module, &recorded.type_name)
        } else {
            self.registry
                .lookup(module, &recorded.type_name)
                .or_else(|| self.registry.lookup(&recorded.module, &recorded.type_name))
                .or_else(|| self.lookup_in_family(&recorded.type_name))
        };

        match found {
            Some(desc) => {
                if desc.type_ref.module != recorded.module {
                    tracing::debug!(
                        recorded = %recorded.module,
                        bound = %desc.type_ref.module,
                        type_name = %recorded.type_name,
                        "remapped module identity"
                    );
                }
                Ok(desc)
            }
            None => {
                tracing::warn!(
                    type_name = %recorded.type_name,
                    module = %recorded.module,
                    attempted = module,
                    "no registered type for type reference"
                );
                Err(Error::TypeResolutionError {
                    type_name: recorded.type_name.clone(),
                    module: recorded.module.clone(),
                    attempted_module: module.to_string(),
                })
            }
        }
    }

    /// Registered type named `type_name` in a module that shares the current
    /// short name. Two or more candidates are ambiguous and yield `None`.
    fn lookup_in_family(&self, type_name: &str) -> Option<&'r TypeDescriptor> {
        let registry: &'r TypeRegistry = self.registry;
        let mut candidates = registry.iter().filter(|desc| {
            desc.type_ref.type_name == type_name
                && self.current.is_prefix_of(&desc.type_ref.module, self.case)
        });
        let first = candidates.next()?;
        if let Some(other) = candidates.next() {
            tracing::warn!(
                type_name,
                first = %first.type_ref.module,
                second = %other.type_ref.module,
                "ambiguous type name in current module family"
            );
            return None;
        }
        Some(first)
    }
}

impl TypeBinder for TypeResolver<'_> {
    fn bind(&self, recorded: &TypeRef) -> Result<TypeRef> {
        self.resolve(recorded).map(|desc| desc.type_ref.clone())
    }
}
