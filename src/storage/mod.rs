//! # Filesystem Abstraction
//!
//! The only I/O contract the persistence service depends on.
//!
//! ## Implementations
//!
//! | Filesystem | Module | Description |
//! |---------|--------|-------------|
//! | `LocalFileSystem` | `local` | `std::fs` files, one scoped handle per call |
//! | `MemoryFileSystem` | `memory` | In-memory map for testing/embedding |
//!
//! Each call opens, uses and releases its handle before returning, on every
//! exit path. Nothing coordinates concurrent writers to one path.

pub mod local;
pub mod memory;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::Result;

pub use local::LocalFileSystem;
pub use memory::MemoryFileSystem;

/// How `write` treats existing file contents.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum WriteMode {
    /// Create the file, or replace its contents.
    #[default]
    Truncate,
    /// Create the file, or add to the end of it.
    Append,
}

/// Filesystem contract.
///
/// Errors surface as `Error::Io`, carrying the underlying `io::ErrorKind`.
pub trait FileSystem: Send + Sync {
    /// Write all of `data` to `path` in one call.
    fn write(&self, path: &Path, data: &[u8], mode: WriteMode) -> Result<()>;

    /// Read the complete contents of `path`.
    fn read(&self, path: &Path) -> Result<Vec<u8>>;

    fn exists(&self, path: &Path) -> bool;

    /// Remove `path`. Returns true if it existed.
    fn remove(&self, path: &Path) -> Result<bool>;
}

impl<F: FileSystem + ?Sized> FileSystem for &F {
    fn write(&self, path: &Path, data: &[u8], mode: WriteMode) -> Result<()> {
        (**self).write(path, data, mode)
    }
    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        (**self).read(path)
    }
    fn exists(&self, path: &Path) -> bool {
        (**self).exists(path)
    }
    fn remove(&self, path: &Path) -> Result<bool> {
        (**self).remove(path)
    }
}
