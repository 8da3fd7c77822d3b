//! # persist-rs: Typed Binary Object Persistence
//!
//! Save one typed object graph to a file, load it back, and keep loading it
//! after the module that defines its types has been renamed or merged.
//!
//! ## Design Principles
//!
//! 1. **Capability-first**: a type is encodable iff it implements `Persist`
//! 2. **Self-describing frames**: every frame carries the type references it uses
//! 3. **Explicit resolution**: unknown types fail with `TypeResolutionError`, never a null
//! 4. **Filesystem-agnostic**: `FileSystem` is the only I/O contract
//!
//! ## Quick Start
//!
//! ```rust
//! use persist::{persist_record, PersistConfig, Persister};
//!
//! #[derive(Debug, PartialEq)]
//! struct Settings { scan_time_ms: u32, channels: Vec<String> }
//! persist_record!(Settings in "Acat.Bci" { scan_time_ms: u32, channels: Vec<String> });
//!
//! # fn main() -> persist::Result<()> {
//! // `Persister::open_local` for files on disk.
//! let persister = Persister::open_memory(PersistConfig::new("Acat.Bci, Version=2.0"));
//! let settings = Settings { scan_time_ms: 250, channels: vec!["Cz".into()] };
//! persister.save("settings.bin", &settings)?;
//!
//! let back: Settings = persister.load("settings.bin")?;
//! assert_eq!(back, settings);
//! # Ok(())
//! # }
//! ```
//!
//! ## Type Resolution
//!
//! | Recorded module | Current module | Result |
//! |-----------------|----------------|--------|
//! | `Foo` | `Foo.Merged` | remapped to `Foo.Merged` |
//! | `Foo.Legacy` | `Foo.Merged` | remapped to `Foo.Merged` |
//! | `Bar` | `Foo.Merged` | looked up as `Bar` |

// ============================================================================
// Modules
// ============================================================================

pub mod model;
pub mod persist;
pub mod registry;
pub mod codec;
pub mod storage;
pub mod config;
pub mod export;
pub mod seq;

// ============================================================================
// Re-exports
// ============================================================================

pub use model::{Record, TypeRef, Value};
pub use persist::{Persist, PersistRecord};
pub use registry::{CaseSensitivity, ModuleIdentity, TypeDescriptor, TypeRegistry, TypeResolver};
pub use codec::{DecodeLimits, TypeBinder, Verbatim};
pub use storage::{FileSystem, LocalFileSystem, MemoryFileSystem, WriteMode};
pub use config::PersistConfig;

use std::path::Path;

use parking_lot::RwLock;

// ============================================================================
// Persister
// ============================================================================

/// The persistence service. Wraps a filesystem, a configuration and the
/// registry of types it can reconstruct.
///
/// Every `save`/`load` is synchronous, self-contained and owns its file
/// handle for the duration of the call. Calls on distinct paths may run
/// from different threads; writes to one path are not coordinated.
pub struct Persister<F: FileSystem = LocalFileSystem> {
    fs: F,
    config: PersistConfig,
    registry: RwLock<TypeRegistry>,
}

impl<F: FileSystem> Persister<F> {
    pub fn with_filesystem(fs: F, config: PersistConfig) -> Self {
        Self {
            fs,
            config,
            registry: RwLock::new(TypeRegistry::new()),
        }
    }

    pub fn config(&self) -> &PersistConfig {
        &self.config
    }

    pub fn filesystem(&self) -> &F {
        &self.fs
    }

    /// Register `T` and every record type reachable from it.
    ///
    /// `load::<T>` does this on its own; register ahead of time when a file
    /// may hold types the caller does not name statically.
    pub fn register<T: Persist>(&self) -> Result<()> {
        self.registry.write().register::<T>()
    }

    /// Snapshot of the registered types.
    pub fn registry(&self) -> TypeRegistry {
        self.registry.read().clone()
    }

    /// Resolve a recorded type reference the way `load` would.
    pub fn resolve(&self, recorded: &TypeRef) -> Result<TypeDescriptor> {
        let registry = self.registry.read();
        TypeResolver::from_config(&registry, &self.config)
            .resolve(recorded)
            .cloned()
    }

    // ========================================================================
    // Save
    // ========================================================================

    /// Save `value` to `path`, replacing any existing contents.
    pub fn save<T: Persist>(&self, path: impl AsRef<Path>, value: &T) -> Result<()> {
        self.save_with_mode(path, value, WriteMode::Truncate)
    }

    /// Append `value` to `path` as a new frame.
    pub fn append<T: Persist>(&self, path: impl AsRef<Path>, value: &T) -> Result<()> {
        self.save_with_mode(path, value, WriteMode::Append)
    }

    /// Save `value` to `path` in the given mode.
    ///
    /// The frame is fully encoded before the file is opened, so an
    /// `EncodeError` leaves the file untouched.
    pub fn save_with_mode<T: Persist>(
        &self,
        path: impl AsRef<Path>,
        value: &T,
        mode: WriteMode,
    ) -> Result<()> {
        let value = value.to_value()?;
        self.save_value(path, &value, mode)
    }

    /// Save a dynamic value.
    pub fn save_value(&self, path: impl AsRef<Path>, value: &Value, mode: WriteMode) -> Result<()> {
        let path = path.as_ref();
        let bytes = codec::encode_frame(value)?;
        self.fs.write(path, &bytes, mode)?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), ?mode, "saved frame");
        Ok(())
    }

    // ========================================================================
    // Load
    // ========================================================================

    /// Load the first frame of `path` as a `T`.
    pub fn load<T: Persist>(&self, path: impl AsRef<Path>) -> Result<T> {
        self.register::<T>()?;
        let value = self.load_value(path)?;
        T::from_value(value)
    }

    /// Load every frame of an appended file, in write order.
    pub fn load_all<T: Persist>(&self, path: impl AsRef<Path>) -> Result<Vec<T>> {
        self.register::<T>()?;
        self.load_all_values(path)?
            .into_iter()
            .map(T::from_value)
            .collect()
    }

    /// Load the first frame of `path` as a dynamic value with resolved types.
    pub fn load_value(&self, path: impl AsRef<Path>) -> Result<Value> {
        let path = path.as_ref();
        let bytes = self.fs.read(path)?;
        let registry = self.registry.read();
        let resolver = TypeResolver::from_config(&registry, &self.config);
        let value = codec::decode_frame(&bytes, &resolver, self.config.decode_limits())?;
        tracing::debug!(path = %path.display(), bytes = bytes.len(), "loaded frame");
        Ok(value)
    }

    /// Load every frame of `path` as dynamic values with resolved types.
    pub fn load_all_values(&self, path: impl AsRef<Path>) -> Result<Vec<Value>> {
        let path = path.as_ref();
        let bytes = self.fs.read(path)?;
        let registry = self.registry.read();
        let resolver = TypeResolver::from_config(&registry, &self.config);
        let frames = codec::decode_frames(&bytes, &resolver, self.config.decode_limits())?;
        tracing::debug!(path = %path.display(), frames = frames.len(), "loaded frames");
        Ok(frames)
    }

    /// Render every frame of `path` as JSON, without resolving types.
    pub fn export_json(&self, path: impl AsRef<Path>) -> Result<Vec<serde_json::Value>> {
        let bytes = self.fs.read(path.as_ref())?;
        export::export_json(&bytes, self.config.decode_limits())
    }
}

impl Persister<LocalFileSystem> {
    /// Persister over the local disk.
    pub fn open_local(config: PersistConfig) -> Self {
        let fs = LocalFileSystem::new().with_sync(config.sync_on_write);
        Self::with_filesystem(fs, config)
    }
}

/// In-memory persister for testing and embedding.
impl Persister<MemoryFileSystem> {
    pub fn open_memory(config: PersistConfig) -> Self {
        Self::with_filesystem(MemoryFileSystem::new(), config)
    }
}

// ============================================================================
// Error Types
// ============================================================================

#[derive(Debug, thiserror::Error)]
pub enum Error {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Encode error: {0}")]
    EncodeError(String),

    #[error("Decode error at byte {offset}: {message}")]
    DecodeError { offset: usize, message: String },

    #[error("Type resolution error: no type `{type_name}` recorded in module `{module}` (looked up in `{attempted_module}`)")]
    TypeResolutionError {
        type_name: String,
        module: String,
        attempted_module: String,
    },

    #[error("Type mismatch: expected {expected}, got {got}")]
    TypeMismatch { expected: String, got: String },

    #[error("Registry error: {0}")]
    RegistryError(String),

    #[error("Config error: {0}")]
    ConfigError(String),
}

pub type Result<T> = std::result::Result<T, Error>;
