//! Disk-backed file system rooted at a directory.

use super::{FileSystem, WriteMode};
use crate::errors::FileSystemError;
use async_trait::async_trait;
use std::collections::BTreeMap;
use std::path::{Component, Path, PathBuf};
use tokio::io::AsyncWriteExt;

/// Writes below `root`; paths that would escape it are rejected.
#[derive(Debug, Clone)]
pub struct RealFileSystem {
    root: PathBuf,
}

impl RealFileSystem {
    /// Creates a file system rooted at `root`.
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// The root directory.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    fn resolve(&self, path: &str) -> Result<PathBuf, FileSystemError> {
        let relative = Path::new(path);
        let mut resolved = self.root.clone();
        let mut depth = 0usize;
        for component in relative.components() {
            match component {
                Component::Normal(part) => {
                    resolved.push(part);
                    depth += 1;
                }
                Component::CurDir => {}
                Component::ParentDir | Component::RootDir | Component::Prefix(_) => {
                    return Err(FileSystemError::OutsideRoot(path.to_string()));
                }
            }
        }
        if depth == 0 {
            return Err(FileSystemError::OutsideRoot(path.to_string()));
        }
        Ok(resolved)
    }
}

fn io_error(path: &Path, source: std::io::Error) -> FileSystemError {
    FileSystemError::Io {
        path: path.display().to_string(),
        source,
    }
}

#[async_trait]
impl FileSystem for RealFileSystem {
    async fn write(&self, path: &str, contents: &str, mode: WriteMode) -> Result<(), FileSystemError> {
        let target = self.resolve(path)?;
        if let Some(parent) = target.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|e| io_error(parent, e))?;
        }

        match mode {
            WriteMode::Overwrite => tokio::fs::write(&target, contents)
                .await
                .map_err(|e| io_error(&target, e)),
            WriteMode::Append => {
                let mut file = tokio::fs::OpenOptions::new()
                    .create(true)
                    .append(true)
                    .open(&target)
                    .await
                    .map_err(|e| io_error(&target, e))?;
                file.write_all(contents.as_bytes())
                    .await
                    .map_err(|e| io_error(&target, e))?;
                file.flush().await.map_err(|e| io_error(&target, e))
            }
        }
    }

    async fn read(&self, path: &str) -> Result<String, FileSystemError> {
        let target = self.resolve(path)?;
        match tokio::fs::read_to_string(&target).await {
            Ok(contents) => Ok(contents),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                Err(FileSystemError::NotFound(path.to_string()))
            }
            Err(e) => Err(io_error(&target, e)),
        }
    }

    fn captured(&self) -> BTreeMap<String, String> {
        BTreeMap::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_write_creates_parents() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFileSystem::new(dir.path());

        fs.write("runs/abc/outline.md", "# A", WriteMode::Overwrite)
            .await
            .unwrap();
        let on_disk = std::fs::read_to_string(dir.path().join("runs/abc/outline.md")).unwrap();
        assert_eq!(on_disk, "# A");
    }

    #[tokio::test]
    async fn test_append() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFileSystem::new(dir.path());

        fs.write("log.txt", "one", WriteMode::Append).await.unwrap();
        fs.write("log.txt", " two", WriteMode::Append).await.unwrap();
        assert_eq!(fs.read("log.txt").await.unwrap(), "one two");
    }

    #[tokio::test]
    async fn test_rejects_escaping_paths() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFileSystem::new(dir.path());

        for path in ["../evil.txt", "runs/../../evil.txt", "/etc/passwd", "", "."] {
            assert!(
                matches!(
                    fs.write(path, "x", WriteMode::Overwrite).await,
                    Err(FileSystemError::OutsideRoot(_))
                ),
                "{path}"
            );
        }
    }

    #[tokio::test]
    async fn test_read_missing() {
        let dir = tempfile::tempdir().unwrap();
        let fs = RealFileSystem::new(dir.path());
        assert!(matches!(
            fs.read("missing.md").await,
            Err(FileSystemError::NotFound(_))
        ));
        assert_eq!(fs.root(), dir.path());
    }
}
