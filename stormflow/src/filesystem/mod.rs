//! Injectable file-system capability.
//!
//! The pipeline never touches the disk directly; artifact writes go through
//! a [`FileSystem`] chosen by configuration.

mod memory;
mod real;

pub use memory::InMemoryFileSystem;
pub use real::RealFileSystem;

use crate::config::FileSystemConfig;
use crate::errors::FileSystemError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::fmt::Debug;
use std::sync::Arc;

/// How a write treats existing content.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum WriteMode {
    /// Replace the file.
    #[default]
    Overwrite,
    /// Append to the file, creating it if needed.
    Append,
}

/// Text file storage addressed by relative, `/`-separated paths.
#[async_trait]
pub trait FileSystem: Send + Sync + Debug {
    /// Writes `contents` to `path`, creating parent directories.
    async fn write(&self, path: &str, contents: &str, mode: WriteMode) -> Result<(), FileSystemError>;

    /// Reads the file at `path`.
    async fn read(&self, path: &str) -> Result<String, FileSystemError>;

    /// Writes captured in memory, keyed by path. Empty for disk-backed stores.
    fn captured(&self) -> BTreeMap<String, String>;
}

/// Builds the configured file system.
#[must_use]
pub fn build_file_system(config: &FileSystemConfig) -> Arc<dyn FileSystem> {
    match config {
        FileSystemConfig::InMemory => Arc::new(InMemoryFileSystem::new()),
        FileSystemConfig::Real { root } => Arc::new(RealFileSystem::new(root.clone())),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[tokio::test]
    async fn test_build_in_memory() {
        let fs = build_file_system(&FileSystemConfig::InMemory);
        fs.write("runs/a.md", "hello", WriteMode::Overwrite).await.unwrap();
        assert_eq!(fs.captured().get("runs/a.md").map(String::as_str), Some("hello"));
    }

    #[tokio::test]
    async fn test_build_real() {
        let dir = tempfile::tempdir().unwrap();
        let fs = build_file_system(&FileSystemConfig::Real {
            root: PathBuf::from(dir.path()),
        });
        fs.write("runs/a.md", "hello", WriteMode::Overwrite).await.unwrap();
        assert!(fs.captured().is_empty());
        assert_eq!(fs.read("runs/a.md").await.unwrap(), "hello");
    }
}
