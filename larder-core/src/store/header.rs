/*!
Store file header: format version, credentials check and integrity hash.
*/

use crate::{PersistError, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use uuid::Uuid;

/// Current store format version for compatibility tracking
pub const STORE_FORMAT_VERSION: u8 = 1;

/// User and passphrase a store file is opened with
///
/// Only a digest is written to the file. This keeps other tools from opening
/// the file by accident; it is not access control.
#[derive(Clone)]
pub struct Credentials {
    user: String,
    passphrase: String,
}

impl Credentials {
    pub fn new<U: Into<String>, P: Into<String>>(user: U, passphrase: P) -> Self {
        Self {
            user: user.into(),
            passphrase: passphrase.into(),
        }
    }

    /// SHA-256 of `user:passphrase`, hex encoded
    pub fn digest(&self) -> String {
        let mut hasher = Sha256::new();
        hasher.update(self.user.as_bytes());
        hasher.update(b":");
        hasher.update(self.passphrase.as_bytes());
        format!("{:x}", hasher.finalize())
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("user", &self.user)
            .finish_non_exhaustive()
    }
}

/// Metadata written in front of the collections of every store file
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct StoreHeader {
    /// Format version (current: 1)
    pub format_version: u8,

    /// Identifier fixed when the store file is created
    pub store_id: String,

    /// Digest of the credentials the file was created with
    pub credential_hash: String,

    /// SHA-256 of the serialized collections for integrity verification
    pub content_hash: String,

    /// Number of documents across all collections
    pub document_count: usize,

    /// Compression algorithm used for the file
    pub compression_algorithm: String,

    pub created_at: DateTime<Utc>,

    /// When the file was last rewritten
    pub saved_at: DateTime<Utc>,
}

impl StoreHeader {
    /// Create the header of a brand-new, empty store
    pub fn new<S: Into<String>>(credentials: &Credentials, compression_algorithm: S) -> Self {
        let now = Utc::now();
        Self {
            format_version: STORE_FORMAT_VERSION,
            store_id: Uuid::new_v4().to_string(),
            credential_hash: credentials.digest(),
            content_hash: String::new(),
            document_count: 0,
            compression_algorithm: compression_algorithm.into(),
            created_at: now,
            saved_at: now,
        }
    }

    /// Stamp the header for a rewrite with the given collections payload
    pub fn with_content(mut self, collections_json: &[u8], document_count: usize) -> Self {
        self.content_hash = Self::compute_hash(collections_json);
        self.document_count = document_count;
        self.saved_at = Utc::now();
        self
    }

    /// Set the compression algorithm
    pub fn with_compression_algorithm<S: Into<String>>(mut self, algorithm: S) -> Self {
        self.compression_algorithm = algorithm.into();
        self
    }

    /// Hexadecimal SHA-256 of the provided data
    pub fn compute_hash(data: &[u8]) -> String {
        let mut hasher = Sha256::new();
        hasher.update(data);
        format!("{:x}", hasher.finalize())
    }

    /// Verify the collections payload against the stored hash
    pub fn verify_integrity(&self, collections_json: &[u8]) -> Result<()> {
        let computed_hash = Self::compute_hash(collections_json);
        if computed_hash == self.content_hash {
            Ok(())
        } else {
            Err(PersistError::IntegrityCheckFailed {
                expected: self.content_hash.clone(),
                actual: computed_hash,
            })
        }
    }

    /// Check that the file was written under `credentials`
    pub fn verify_credentials(&self, credentials: &Credentials) -> Result<()> {
        if self.credential_hash == credentials.digest() {
            Ok(())
        } else {
            Err(PersistError::CredentialMismatch)
        }
    }

    /// Whether this build can read a file with this header
    pub fn is_compatible(&self) -> bool {
        self.format_version <= STORE_FORMAT_VERSION
    }

    /// Validate that all required fields are properly set
    pub fn validate(&self) -> Result<()> {
        if self.store_id.is_empty() {
            return Err(PersistError::validation("store_id cannot be empty"));
        }
        if self.credential_hash.is_empty() {
            return Err(PersistError::validation("credential_hash cannot be empty"));
        }
        if self.content_hash.is_empty() {
            return Err(PersistError::validation("content_hash cannot be empty"));
        }
        Ok(())
    }
}
