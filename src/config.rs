//! Persistence configuration.

use std::path::Path;

use serde::{Deserialize, Serialize};
use smallvec::{smallvec, SmallVec};

use crate::codec::DecodeLimits;
use crate::registry::{CaseSensitivity, ModuleIdentity};
use crate::{Error, Result};

/// Identity of this crate, in the `Name, Version=x.y.z` shape.
pub const CRATE_MODULE: &str = concat!(env!("CARGO_PKG_NAME"), ", Version=", env!("CARGO_PKG_VERSION"));

/// Settings for a `Persister`.
///
/// Every field has a default, so a JSON document only needs the fields it
/// overrides:
///
/// ```json
/// { "current_module": "Acat.Bci, Version=2.0", "case_sensitivity": "insensitive" }
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PersistConfig {
    /// Identity of the module that provides the current types. Recorded
    /// modules starting with its short name are remapped onto it.
    pub current_module: String,
    /// Case policy of the module prefix comparison.
    pub case_sensitivity: CaseSensitivity,
    /// Characters that end the short name of `current_module`.
    pub module_separators: SmallVec<[char; 4]>,
    /// Maximum nesting depth accepted when decoding.
    pub max_depth: usize,
    /// `fsync` after each save (local filesystem only).
    pub sync_on_write: bool,
}

impl Default for PersistConfig {
    fn default() -> Self {
        Self {
            current_module: CRATE_MODULE.to_string(),
            case_sensitivity: CaseSensitivity::Sensitive,
            module_separators: smallvec![',', '.'],
            max_depth: DecodeLimits::default().max_depth,
            sync_on_write: false,
        }
    }
}

impl PersistConfig {
    /// Default settings with an explicit current module identity.
    pub fn new(current_module: impl Into<String>) -> Self {
        Self {
            current_module: current_module.into(),
            ..Self::default()
        }
    }

    pub fn with_case_sensitivity(mut self, case: CaseSensitivity) -> Self {
        self.case_sensitivity = case;
        self
    }

    pub fn with_max_depth(mut self, max_depth: usize) -> Self {
        self.max_depth = max_depth;
        self
    }

    pub fn with_sync_on_write(mut self, sync: bool) -> Self {
        self.sync_on_write = sync;
        self
    }

    pub fn module_identity(&self) -> ModuleIdentity {
        ModuleIdentity::new(self.current_module.clone(), &self.module_separators)
    }

    pub fn decode_limits(&self) -> DecodeLimits {
        DecodeLimits { max_depth: self.max_depth }
    }

    pub fn from_json(json: &str) -> Result<Self> {
        serde_json::from_str(json).map_err(|e| Error::ConfigError(e.to_string()))
    }

    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let raw = std::fs::read_to_string(path.as_ref())?;
        Self::from_json(&raw)
    }

    pub fn to_json(&self) -> Result<String> {
        serde_json::to_string_pretty(self).map_err(|e| Error::ConfigError(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_defaults() {
        let config = PersistConfig::default();
        assert!(config.current_module.starts_with("persist-rs, Version="));
        assert_eq!(config.module_identity().short_name(), "persist-rs");
        assert_eq!(config.case_sensitivity, CaseSensitivity::Sensitive);
        assert_eq!(config.max_depth, 128);
    }

    #[test]
    fn test_partial_json_overrides() {
        let config = PersistConfig::from_json(
            r#"{ "current_module": "Acat.Bci, Version=2.0", "case_sensitivity": "insensitive" }"#,
        )
        .unwrap();
        assert_eq!(config.module_identity().short_name(), "Acat");
        assert_eq!(config.case_sensitivity, CaseSensitivity::Insensitive);
        assert_eq!(config.max_depth, 128);
    }

    #[test]
    fn test_json_roundtrip() {
        let config = PersistConfig::new("Foo.Merged").with_max_depth(16).with_sync_on_write(true);
        let back = PersistConfig::from_json(&config.to_json().unwrap()).unwrap();
        assert_eq!(back, config);
    }

    #[test]
    fn test_invalid_json_is_config_error() {
        let err = PersistConfig::from_json("{ not json").unwrap_err();
        assert!(matches!(err, Error::ConfigError(_)));
    }
}
