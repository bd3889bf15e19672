//! In-memory file system.

use super::{FileSystem, WriteMode};
use crate::errors::FileSystemError;
use async_trait::async_trait;
use parking_lot::RwLock;
use std::collections::BTreeMap;

/// Keeps every write in a map, for tests and the debug endpoint.
#[derive(Debug, Default)]
pub struct InMemoryFileSystem {
    files: RwLock<BTreeMap<String, String>>,
}

impl InMemoryFileSystem {
    /// Creates an empty file system.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of files written.
    #[must_use]
    pub fn len(&self) -> usize {
        self.files.read().len()
    }

    /// Returns true if nothing was written.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.files.read().is_empty()
    }

    /// Discards every file.
    pub fn clear(&self) {
        self.files.write().clear();
    }
}

#[async_trait]
impl FileSystem for InMemoryFileSystem {
    async fn write(&self, path: &str, contents: &str, mode: WriteMode) -> Result<(), FileSystemError> {
        let mut files = self.files.write();
        match mode {
            WriteMode::Overwrite => {
                files.insert(path.to_string(), contents.to_string());
            }
            WriteMode::Append => files.entry(path.to_string()).or_default().push_str(contents),
        }
        Ok(())
    }

    async fn read(&self, path: &str) -> Result<String, FileSystemError> {
        self.files
            .read()
            .get(path)
            .cloned()
            .ok_or_else(|| FileSystemError::NotFound(path.to_string()))
    }

    fn captured(&self) -> BTreeMap<String, String> {
        self.files.read().clone()
    }
}
