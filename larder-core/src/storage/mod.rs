/*!
Byte-level storage adapters for the store file.

The embedded store serializes its whole image into one byte buffer; these
adapters only decide where that buffer lives. They never interpret it.
*/

pub mod local;
pub mod memory;

use crate::Result;

/// Storage abstraction for saving and loading the store file
///
/// Implementations must replace the previous contents of `path` as a whole:
/// a reader never observes a partially written image.
pub trait StorageAdapter: Send + Sync {
    /// Replace the bytes stored at `path`
    ///
    /// # Arguments
    /// * `data` - The compressed store image
    /// * `path` - The storage location (interpretation depends on implementation)
    fn save(&self, data: &[u8], path: &str) -> Result<()>;

    /// Load the bytes stored at `path`
    ///
    /// Returns an error if nothing is stored there.
    fn load(&self, path: &str) -> Result<Vec<u8>>;

    /// Check if anything is stored at `path`
    fn exists(&self, path: &str) -> bool;
}

pub use local::LocalFileStorage;
pub use memory::MemoryStorage;
