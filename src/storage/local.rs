//! Local disk filesystem.

use std::fs::{self, OpenOptions};
use std::io::{self, Write};
use std::path::Path;

use super::{FileSystem, WriteMode};
use crate::Result;

/// `std::fs` backed filesystem.
#[derive(Debug, Clone, Default)]
pub struct LocalFileSystem {
    sync_on_write: bool,
}

impl LocalFileSystem {
    pub fn new() -> Self {
        Self::default()
    }

    /// `fsync` file data before `write` returns.
    pub fn with_sync(mut self, sync_on_write: bool) -> Self {
        self.sync_on_write = sync_on_write;
        self
    }
}

impl FileSystem for LocalFileSystem {
    fn write(&self, path: &Path, data: &[u8], mode: WriteMode) -> Result<()> {
        let mut opts = OpenOptions::new();
        match mode {
            WriteMode::Truncate => opts.write(true).create(true).truncate(true),
            WriteMode::Append => opts.append(true).create(true),
        };
        // Dropped on every return path below.
        let mut file = opts.open(path)?;
        file.write_all(data)?;
        file.flush()?;
        if self.sync_on_write {
            file.sync_data()?;
        }
        Ok(())
    }

    fn read(&self, path: &Path) -> Result<Vec<u8>> {
        Ok(fs::read(path)?)
    }

    fn exists(&self, path: &Path) -> bool {
        path.is_file()
    }

    fn remove(&self, path: &Path) -> Result<bool> {
        match fs::remove_file(path) {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::Error;

    #[test]
    fn test_truncate_then_append() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("data.bin");
        let fs = LocalFileSystem::new().with_sync(true);

        fs.write(&path, b"abc", WriteMode::Truncate).unwrap();
        fs.write(&path, b"de", WriteMode::Append).unwrap();
        assert_eq!(fs.read(&path).unwrap(), b"abcde");

        fs.write(&path, b"x", WriteMode::Truncate).unwrap();
        assert_eq!(fs.read(&path).unwrap(), b"x");
    }

    #[test]
    fn test_missing_file_is_io_error() {
        let dir = tempfile::tempdir().unwrap();
        let fs = LocalFileSystem::new();
        let err = fs.read(&dir.path().join("absent.bin")).unwrap_err();
        assert!(matches!(err, Error::Io(ref e) if e.kind() == io::ErrorKind::NotFound));
        assert!(!fs.remove(&dir.path().join("absent.bin")).unwrap());
    }

    #[test]
    fn test_unwritable_location() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("no_such_dir").join("data.bin");
        let err = LocalFileSystem::new().write(&path, b"abc", WriteMode::Truncate).unwrap_err();
        assert!(matches!(err, Error::Io(_)));
    }
}
