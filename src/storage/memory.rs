//! In-memory filesystem.
//!
//! Files live in a `HashMap` behind a `RwLock`. Each call takes the lock
//! for its whole duration, so a single write or read is atomic.
//!
//! Use this for:
//! - Testing the persistence service without touching disk
//! - Embedding where settings live only for the process lifetime

use std::collections::HashMap;
use std::io;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use parking_lot::RwLock;

use super::{FileSystem, WriteMode};
use crate::Result;

/// In-memory filesystem. Clones share the same files.
#[derive(Debug, Clone, Default)]
pub struct MemoryFileSystem {
    files: Arc<RwLock<HashMap<PathBuf, Vec<u8>>>>,
}

impl MemoryFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace a file's bytes directly (test fixtures, corruption drills).
    pub fn put(&self, path: impl Into<PathBuf>, data: Vec<u8>) {
        self.files.write().insert(path.into(), data);
    }

    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }
}

impl FileSystem for MemoryFileSystem {
    fn write(&self, path: &Path, data: &[u8], mode: WriteMode) -> Result<()> {
        let mut files = self.files.write();
        match mode {
            WriteMode::Truncate => {
                files.insert(path.to_path_buf(), data.to_vec());
            }
            WriteMode::Append => {
                files.entry(path.to_path_buf()).or_default().extend_from_slice(data);
            }
        }
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        self.files.read().get(path).cloned().ok_or_else(|| {
            io::Error::new(io::ErrorKind::NotFound, format!("{} not found", path.display())).into()
        })
    }

    fn exists(&self, path: &Path) -> bool {
        self.files.read().contains_key(path)
    }

    fn remove(&self, path: &Path) -> Result<bool> {
        Ok(self.files.write().remove(path).is_some())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clones_share_files() {
        let fs = MemoryFileSystem::new();
        let other = fs.clone();
        fs.write(Path::new("a"), b"1", WriteMode::Truncate).unwrap();
        other.write(Path::new("a"), b"2", WriteMode::Append).unwrap();
        assert_eq!(fs.read(Path::new("a")).unwrap(), b"12");
        assert!(other.exists(Path::new("a")));
        assert!(fs.remove(Path::new("a")).unwrap());
        assert!(other.is_empty());
    }

    #[test]
    fn test_read_missing() {
        let fs = MemoryFileSystem::new();
        assert!(matches!(fs.read(Path::new("nope")), Err(crate::Error::Io(_))));
    }
}
