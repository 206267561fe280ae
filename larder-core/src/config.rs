//! Configuration module for store backend selection and settings
//!
//! This module provides the configuration structure used to open a store:
//! which byte backend holds the store file, where it lives, and how it is
//! compressed. The store passphrase is deliberately absent.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Relative path of the store file when none is configured
pub const DEFAULT_STORE_PATH: &str = "database.db";

/// Gzip level used when compression is not configured explicitly
pub const DEFAULT_COMPRESSION_LEVEL: u32 = 6;

/// Enumeration of supported storage backends
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum StorageBackend {
    /// Local filesystem storage
    Local,
    /// Process-local memory, nothing touches the disk
    Memory,
}

/// Configuration structure for opening a store
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct StoreConfig {
    /// The storage backend to use
    pub backend: StorageBackend,
    /// Location of the store file (also the key for the memory backend)
    pub path: PathBuf,
    /// Gzip level (0-9), `None` stores the file uncompressed
    pub compression_level: Option<u32>,
}

impl StoreConfig {
    /// Create a default configuration for a local store file
    pub fn default_local() -> Self {
        StoreConfig {
            backend: StorageBackend::Local,
            path: PathBuf::from(DEFAULT_STORE_PATH),
            compression_level: Some(DEFAULT_COMPRESSION_LEVEL),
        }
    }

    /// Create a configuration backed by memory only
    pub fn in_memory() -> Self {
        StoreConfig {
            backend: StorageBackend::Memory,
            ..Self::default_local()
        }
    }

    /// Create a local configuration for the given store file
    pub fn at_path<P: Into<PathBuf>>(path: P) -> Self {
        StoreConfig {
            path: path.into(),
            ..Self::default_local()
        }
    }

    /// Set the gzip compression level
    pub fn with_compression_level(mut self, level: u32) -> Self {
        self.compression_level = Some(level);
        self
    }

    /// Store the file without compression
    pub fn without_compression(mut self) -> Self {
        self.compression_level = None;
        self
    }

    /// Parse a store URI and create the matching configuration
    ///
    /// Supports formats:
    /// - `mem://name` for a memory-backed store
    /// - `/local/path` or `./relative/path` for a store file
    pub fn from_uri(uri: &str) -> Result<StoreConfig, crate::PersistError> {
        if let Some(name) = uri.strip_prefix("mem://") {
            let name = if name.is_empty() { DEFAULT_STORE_PATH } else { name };
            let mut config = StoreConfig::in_memory();
            config.path = PathBuf::from(name);
            Ok(config)
        } else if uri.trim().is_empty() {
            Err(crate::PersistError::validation(
                "Invalid store URI: empty path",
            ))
        } else {
            Ok(StoreConfig::at_path(uri))
        }
    }

    /// Location string used for storage keys and diagnostics
    pub fn location(&self) -> String {
        self.path.to_string_lossy().to_string()
    }

    /// Validate the configuration
    pub fn validate(&self) -> crate::Result<()> {
        if self.path.as_os_str().is_empty() {
            return Err(crate::PersistError::validation(
                "Store path cannot be empty",
            ));
        }
        if let Some(level) = self.compression_level {
            if level > 9 {
                return Err(crate::PersistError::validation(format!(
                    "Compression level must be between 0 and 9, got {level}"
                )));
            }
        }
        Ok(())
    }
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self::default_local()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_local_config() {
        let config = StoreConfig::default_local();
        assert_eq!(config.backend, StorageBackend::Local);
        assert_eq!(config.path, PathBuf::from("database.db"));
        assert_eq!(config.compression_level, Some(DEFAULT_COMPRESSION_LEVEL));
    }

    #[test]
    fn test_in_memory_config() {
        let config = StoreConfig::in_memory();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_from_uri_memory() {
        let config = StoreConfig::from_uri("mem://scratch").unwrap();
        assert_eq!(config.backend, StorageBackend::Memory);
        assert_eq!(config.location(), "scratch");

        let config = StoreConfig::from_uri("mem://").unwrap();
        assert_eq!(config.location(), DEFAULT_STORE_PATH);
    }

    #[test]
    fn test_from_uri_local() {
        let config = StoreConfig::from_uri("/home/user/.larder/database.db").unwrap();
        assert_eq!(config.backend, StorageBackend::Local);
        assert_eq!(config.location(), "/home/user/.larder/database.db");
    }

    #[test]
    fn test_from_uri_empty() {
        let result = StoreConfig::from_uri("  ");
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("empty path"));
    }

    #[test]
    fn test_validate_compression_level() {
        let config = StoreConfig::default_local().with_compression_level(9);
        assert!(config.validate().is_ok());

        let config = StoreConfig::default_local().with_compression_level(12);
        assert!(config.validate().is_err());

        let config = StoreConfig::default_local().without_compression();
        assert!(config.validate().is_ok());
        assert!(config.compression_level.is_none());
    }

    #[test]
    fn test_validate_empty_path() {
        let config = StoreConfig::at_path("");
        assert!(config.validate().is_err());
    }
}
