/*!
Compression adapters for store files.

The whole store image is compressed before it reaches the storage adapter.
Gzip is the default; `NoCompression` keeps the file readable for debugging
and makes unit tests independent of the codec.
*/

use crate::{PersistError, Result};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use std::io::{Read, Write};

/// Compression abstraction for store images
pub trait CompressionAdapter: Send + Sync {
    /// Compress a serialized store image
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>>;

    /// Restore a serialized store image from its compressed form
    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>>;

    /// Name recorded in the store header
    fn algorithm_name(&self) -> &str;
}

/// Gzip compression adapter
///
/// # Example
/// ```rust
/// use larder_core::compression::{CompressionAdapter, GzipCompressor};
///
/// let compressor = GzipCompressor::new();
/// let image = br#"{"workspaces":[]}"#;
/// let compressed = compressor.compress(image)?;
/// assert_eq!(compressor.decompress(&compressed)?, image.to_vec());
/// # Ok::<(), larder_core::PersistError>(())
/// ```
#[derive(Debug, Clone)]
pub struct GzipCompressor {
    compression_level: Compression,
}

impl GzipCompressor {
    /// Create a new gzip compressor with default compression level (6)
    pub fn new() -> Self {
        Self {
            compression_level: Compression::default(),
        }
    }

    /// Create a new gzip compressor with the specified level (0-9)
    pub fn with_level(level: u32) -> Self {
        Self {
            compression_level: Compression::new(level),
        }
    }
}

impl Default for GzipCompressor {
    fn default() -> Self {
        Self::new()
    }
}

impl CompressionAdapter for GzipCompressor {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        let mut encoder = GzEncoder::new(Vec::new(), self.compression_level);

        encoder.write_all(data).map_err(|e| {
            PersistError::compression(format!("Failed to write store image for compression: {e}"))
        })?;

        encoder
            .finish()
            .map_err(|e| PersistError::compression(format!("Failed to finish compression: {e}")))
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        let mut decoder = GzDecoder::new(compressed_data);
        let mut decompressed = Vec::new();

        decoder.read_to_end(&mut decompressed).map_err(|e| {
            PersistError::compression(format!("Failed to decompress store image: {e}"))
        })?;

        Ok(decompressed)
    }

    fn algorithm_name(&self) -> &str {
        "gzip"
    }
}

/// Pass-through adapter for uncompressed store files
#[derive(Debug, Clone, Default)]
pub struct NoCompression;

impl NoCompression {
    pub fn new() -> Self {
        Self
    }
}

impl CompressionAdapter for NoCompression {
    fn compress(&self, data: &[u8]) -> Result<Vec<u8>> {
        Ok(data.to_vec())
    }

    fn decompress(&self, compressed_data: &[u8]) -> Result<Vec<u8>> {
        Ok(compressed_data.to_vec())
    }

    fn algorithm_name(&self) -> &str {
        "none"
    }
}

/// Build the adapter for a configured compression level
///
/// `None` selects [`NoCompression`], any level selects gzip at that level.
pub fn compressor_for_level(level: Option<u32>) -> Box<dyn CompressionAdapter> {
    match level {
        Some(level) => Box::new(GzipCompressor::with_level(level)),
        None => Box::new(NoCompression::new()),
    }
}

/// Leading bytes of every gzip stream
pub const GZIP_MAGIC: [u8; 2] = [0x1f, 0x8b];

/// Pick the adapter that can read `data`, judged by its leading bytes
///
/// Gzip streams are recognized by [`GZIP_MAGIC`]; anything else is taken as
/// uncompressed.
pub fn compressor_for_data(data: &[u8]) -> Box<dyn CompressionAdapter> {
    if data.starts_with(&GZIP_MAGIC) {
        Box::new(GzipCompressor::new())
    } else {
        Box::new(NoCompression::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_gzip_shrinks_repetitive_image() {
        let compressor = GzipCompressor::new();
        let image = br#"{"id":1,"name":"workspace","openRequests":[]}"#.repeat(40);

        let compressed = compressor.compress(&image).unwrap();
        assert!(compressed.len() < image.len());

        let decompressed = compressor.decompress(&compressed).unwrap();
        assert_eq!(image, decompressed);
    }

    #[test]
    fn test_gzip_empty_image() {
        let compressor = GzipCompressor::with_level(1);
        let compressed = compressor.compress(b"").unwrap();
        assert!(compressor.decompress(&compressed).unwrap().is_empty());
    }

    #[test]
    fn test_gzip_rejects_plain_bytes() {
        let compressor = GzipCompressor::new();
        let result = compressor.decompress(b"{\"not\":\"gzip\"}");
        assert!(matches!(result, Err(PersistError::Compression(_))));
    }

    #[test]
    fn test_compressor_for_level() {
        assert_eq!(compressor_for_level(Some(9)).algorithm_name(), "gzip");
        assert_eq!(compressor_for_level(None).algorithm_name(), "none");
    }

    #[test]
    fn test_no_compression_passthrough() {
        let compressor = NoCompression::new();
        let data = b"header\nbody";
        assert_eq!(compressor.compress(data).unwrap(), data.to_vec());
        assert_eq!(compressor.decompress(data).unwrap(), data.to_vec());
    }

    #[test]
    fn test_compressor_for_data() {
        let gzipped = GzipCompressor::with_level(1).compress(b"header\nbody").unwrap();
        assert_eq!(compressor_for_data(&gzipped).algorithm_name(), "gzip");
        assert_eq!(compressor_for_data(b"{\"format_version\":1}").algorithm_name(), "none");
        assert_eq!(compressor_for_data(b"").algorithm_name(), "none");
    }
}
