/*!
Error types for the Larder core.
*/

use thiserror::Error;

/// Result type used throughout the Larder core.
pub type Result<T> = std::result::Result<T, PersistError>;

/// Errors that can occur during store operations.
#[derive(Error, Debug)]
pub enum PersistError {
    /// I/O errors during file operations
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON serialization/deserialization errors
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// Compression/decompression errors
    #[error("Compression error: {0}")]
    Compression(String),

    /// Integrity check failures
    #[error("Integrity check failed: expected hash {expected}, got {actual}")]
    IntegrityCheckFailed { expected: String, actual: String },

    /// Invalid store file format
    #[error("Invalid store format: {0}")]
    InvalidFormat(String),

    /// Storage adapter errors
    #[error("Storage error: {0}")]
    Storage(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// The store file could not be opened or created
    #[error("Failed to open store at {location}: {source}")]
    StoreOpen {
        location: String,
        #[source]
        source: Box<PersistError>,
    },

    /// The store file was written under different credentials
    #[error("Store credentials do not match")]
    CredentialMismatch,

    /// A document does not match the schema of its collection
    #[error("Failed to decode document in '{collection}': {reason}")]
    Decode { collection: String, reason: String },

    /// An update targeted an identifier that is not stored
    #[error("No document with id {id} in '{collection}'")]
    DocumentNotFound { collection: String, id: i64 },

    /// An insert reused an identifier that is already stored
    #[error("Document with id {id} already exists in '{collection}'")]
    DuplicateId { collection: String, id: i64 },

    /// The identity source only produced identifiers that are taken
    #[error("Could not assign a free identifier after {attempts} attempts")]
    IdentityExhausted { attempts: usize },
}

impl PersistError {
    /// Create a new compression error
    pub fn compression<S: Into<String>>(msg: S) -> Self {
        Self::Compression(msg.into())
    }

    /// Create a new storage error
    pub fn storage<S: Into<String>>(msg: S) -> Self {
        Self::Storage(msg.into())
    }

    /// Create a new validation error
    pub fn validation<S: Into<String>>(msg: S) -> Self {
        Self::Validation(msg.into())
    }

    /// Create a new invalid format error
    pub fn invalid_format<S: Into<String>>(msg: S) -> Self {
        Self::InvalidFormat(msg.into())
    }

    /// Create a new decode error for the given collection
    pub fn decode<C: Into<String>, R: ToString>(collection: C, reason: R) -> Self {
        Self::Decode {
            collection: collection.into(),
            reason: reason.to_string(),
        }
    }

    /// Wrap an error raised while opening the store at `location`
    pub fn store_open<L: Into<String>>(location: L, source: PersistError) -> Self {
        Self::StoreOpen {
            location: location.into(),
            source: Box::new(source),
        }
    }
}
