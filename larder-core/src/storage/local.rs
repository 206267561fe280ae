/*!
Local filesystem storage adapter implementation.
*/

use super::StorageAdapter;
use crate::{PersistError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use tempfile::NamedTempFile;

/// Local filesystem storage adapter
///
/// Writes go to a temporary file next to the target and are renamed over it,
/// so a crash mid-write leaves the previous store file intact. Missing parent
/// directories are created on first save.
///
/// # Example
/// ```rust
/// use larder_core::storage::{LocalFileStorage, StorageAdapter};
///
/// let dir = tempfile::tempdir()?;
/// let storage = LocalFileStorage::with_base_dir(dir.path());
/// storage.save(b"store image", "state/database.db")?;
/// assert!(storage.exists("state/database.db"));
/// # Ok::<(), Box<dyn std::error::Error>>(())
/// ```
#[derive(Debug, Clone, Default)]
pub struct LocalFileStorage {
    /// Optional base directory for relative store paths
    base_dir: Option<PathBuf>,
}

impl LocalFileStorage {
    /// Create an adapter that uses paths as given (relative to the working directory)
    pub fn new() -> Self {
        Self { base_dir: None }
    }

    /// Create an adapter that resolves paths against `base_dir`
    pub fn with_base_dir<P: AsRef<Path>>(base_dir: P) -> Self {
        Self {
            base_dir: Some(base_dir.as_ref().to_path_buf()),
        }
    }

    /// Resolve the full path for a given storage path
    fn resolve_path(&self, path: &str) -> PathBuf {
        match &self.base_dir {
            Some(base) => base.join(path),
            None => PathBuf::from(path),
        }
    }

    /// Directory that receives the temporary file, created if necessary
    fn ensure_parent_dir(&self, path: &Path) -> Result<PathBuf> {
        let parent = match path.parent() {
            Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
            _ => PathBuf::from("."),
        };
        if !parent.exists() {
            fs::create_dir_all(&parent).map_err(|e| {
                PersistError::storage(format!(
                    "Failed to create directory {}: {}",
                    parent.display(),
                    e
                ))
            })?;
        }
        Ok(parent)
    }
}

impl StorageAdapter for LocalFileStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        let full_path = self.resolve_path(path);
        let parent = self.ensure_parent_dir(&full_path)?;

        let mut staged = NamedTempFile::new_in(&parent).map_err(|e| {
            PersistError::storage(format!(
                "Failed to stage store file in {}: {}",
                parent.display(),
                e
            ))
        })?;
        staged.write_all(data)?;
        staged.as_file().sync_all()?;

        staged.persist(&full_path).map_err(|e| {
            PersistError::storage(format!(
                "Failed to replace store file {}: {}",
                full_path.display(),
                e.error
            ))
        })?;

        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        let full_path = self.resolve_path(path);

        fs::read(&full_path).map_err(|e| {
            PersistError::storage(format!(
                "Failed to read store file {}: {}",
                full_path.display(),
                e
            ))
        })
    }

    fn exists(&self, path: &str) -> bool {
        self.resolve_path(path).is_file()
    }
}
