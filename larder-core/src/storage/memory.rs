/*!
Memory-backed storage adapter.
*/

use super::StorageAdapter;
use crate::{PersistError, Result};
use std::collections::HashMap;
use std::sync::{Arc, Mutex};

/// Memory-based storage adapter
///
/// Stores images in a shared `HashMap`. Clones share the same map, so a test
/// can reopen a store from a second handle and observe what the first wrote.
#[derive(Debug, Clone, Default)]
pub struct MemoryStorage {
    data: Arc<Mutex<HashMap<String, Vec<u8>>>>,
}

impl MemoryStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Overwrite the bytes at `path` without going through a store
    ///
    /// Used to simulate files produced by other builds or damaged on disk.
    pub fn put_raw(&self, path: &str, data: Vec<u8>) -> Result<()> {
        self.entries()?.insert(path.to_string(), data);
        Ok(())
    }

    fn entries(&self) -> Result<std::sync::MutexGuard<'_, HashMap<String, Vec<u8>>>> {
        self.data
            .lock()
            .map_err(|_| PersistError::storage("memory storage lock poisoned"))
    }
}

impl StorageAdapter for MemoryStorage {
    fn save(&self, data: &[u8], path: &str) -> Result<()> {
        self.entries()?.insert(path.to_string(), data.to_vec());
        Ok(())
    }

    fn load(&self, path: &str) -> Result<Vec<u8>> {
        self.entries()?
            .get(path)
            .cloned()
            .ok_or_else(|| PersistError::storage(format!("Store file not found: {path}")))
    }

    fn exists(&self, path: &str) -> bool {
        self.entries()
            .map(|entries| entries.contains_key(path))
            .unwrap_or(false)
    }
}
