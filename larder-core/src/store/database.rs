/*!
The embedded document store.

A store is one file holding every collection. The file is read once when the
store is opened; afterwards all reads are served from memory and every
mutation rewrites the file through the storage adapter before it becomes
visible.
*/

use super::header::{Credentials, StoreHeader, STORE_FORMAT_VERSION};
use super::{document_id, Document, Filter};
use crate::compression::{compressor_for_data, CompressionAdapter};
use crate::storage::StorageAdapter;
use crate::{PersistError, Result};
use std::collections::{BTreeMap, HashSet};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, MutexGuard};
use tracing::{debug, info, warn};

type Collections = BTreeMap<String, Vec<Document>>;

struct StoreImage {
    header: StoreHeader,
    collections: Collections,
}

/// Handle to an open store file
///
/// Individual operations are serialized by an internal lock. Nothing spans
/// several operations: callers composing reads and writes get no isolation.
pub struct Database {
    storage: Box<dyn StorageAdapter>,
    compressor: Box<dyn CompressionAdapter>,
    location: String,
    image: Mutex<StoreImage>,
    closed: AtomicBool,
}

impl Database {
    /// Open the store at `location`, creating an empty one if none exists
    ///
    /// # Errors
    /// Every failure is reported as [`PersistError::StoreOpen`] wrapping the
    /// cause: unreadable or corrupt file, incompatible format version,
    /// credential mismatch, or a failed initial write.
    pub fn open_or_create<L: Into<String>>(
        storage: Box<dyn StorageAdapter>,
        compressor: Box<dyn CompressionAdapter>,
        location: L,
        credentials: &Credentials,
    ) -> Result<Self> {
        let location = location.into();

        let existing = storage.exists(&location);
        let image = if existing {
            read_image(storage.as_ref(), &location, credentials)
                .map_err(|e| PersistError::store_open(location.clone(), e))?
        } else {
            StoreImage {
                header: StoreHeader::new(credentials, compressor.algorithm_name()),
                collections: Collections::new(),
            }
        };

        let database = Self {
            storage,
            compressor,
            location,
            image: Mutex::new(image),
            closed: AtomicBool::new(false),
        };

        if existing {
            let header = database.header()?;
            info!(
                location = %database.location,
                store_id = %header.store_id,
                documents = header.document_count,
                "Opened store"
            );
        } else {
            database
                .write_current()
                .map_err(|e| PersistError::store_open(database.location.clone(), e))?;
            info!(location = %database.location, "Created new store");
        }

        Ok(database)
    }

    pub fn location(&self) -> &str {
        &self.location
    }

    /// Header as of the last successful write
    pub fn header(&self) -> Result<StoreHeader> {
        Ok(self.lock_image()?.header.clone())
    }

    /// Names of all collections that have ever been written
    pub fn collection_names(&self) -> Result<Vec<String>> {
        self.ensure_open()?;
        Ok(self.lock_image()?.collections.keys().cloned().collect())
    }

    /// Documents of `collection` matching `filter`, in store order
    pub fn find(&self, collection: &str, filter: &Filter) -> Result<Vec<Document>> {
        self.ensure_open()?;
        let image = self.lock_image()?;
        Ok(image
            .collections
            .get(collection)
            .map(|documents| {
                documents
                    .iter()
                    .filter(|document| filter.matches(document))
                    .cloned()
                    .collect()
            })
            .unwrap_or_default())
    }

    /// First document of `collection` matching `filter`
    pub fn find_first(&self, collection: &str, filter: &Filter) -> Result<Option<Document>> {
        self.ensure_open()?;
        let image = self.lock_image()?;
        Ok(image.collections.get(collection).and_then(|documents| {
            documents
                .iter()
                .find(|document| filter.matches(document))
                .cloned()
        }))
    }

    pub fn count(&self, collection: &str) -> Result<usize> {
        self.ensure_open()?;
        let image = self.lock_image()?;
        Ok(image.collections.get(collection).map_or(0, Vec::len))
    }

    pub fn contains_id(&self, collection: &str, id: i64) -> Result<bool> {
        self.ensure_open()?;
        let image = self.lock_image()?;
        Ok(image.collections.get(collection).map_or(false, |documents| {
            documents.iter().any(|document| document_id(document) == Some(id))
        }))
    }

    /// Append documents to `collection`
    ///
    /// Fails without writing anything if a document lacks an `id` or reuses
    /// one that is already stored.
    pub fn insert(&self, collection: &str, documents: Vec<Document>) -> Result<()> {
        self.ensure_open()?;
        if documents.is_empty() {
            return Ok(());
        }
        self.mutate(collection, |stored| {
            let mut taken: HashSet<i64> = stored.iter().filter_map(document_id).collect();
            for document in &documents {
                let id = require_id(collection, document)?;
                if !taken.insert(id) {
                    return Err(PersistError::DuplicateId {
                        collection: collection.to_string(),
                        id,
                    });
                }
            }
            stored.extend(documents);
            Ok(((), true))
        })
    }

    /// Replace the stored document carrying the same `id`
    pub fn update(&self, collection: &str, document: Document) -> Result<()> {
        let id = require_id(collection, &document)?;
        self.mutate(collection, |stored| {
            let slot = stored
                .iter_mut()
                .find(|existing| document_id(existing) == Some(id))
                .ok_or_else(|| PersistError::DocumentNotFound {
                    collection: collection.to_string(),
                    id,
                })?;
            *slot = document;
            Ok(((), true))
        })
    }

    /// Remove every document matching `filter`; returns how many were removed
    pub fn remove(&self, collection: &str, filter: &Filter) -> Result<usize> {
        self.mutate(collection, |stored| {
            let before = stored.len();
            stored.retain(|document| !filter.matches(document));
            let removed = before - stored.len();
            Ok((removed, removed > 0))
        })
    }

    /// Swap the whole content of `collection` in a single write
    ///
    /// Returns how many documents were replaced.
    pub fn replace(&self, collection: &str, documents: Vec<Document>) -> Result<usize> {
        let mut taken = HashSet::new();
        for document in &documents {
            let id = require_id(collection, document)?;
            if !taken.insert(id) {
                return Err(PersistError::DuplicateId {
                    collection: collection.to_string(),
                    id,
                });
            }
        }
        self.mutate(collection, |stored| {
            let replaced = std::mem::replace(stored, documents);
            Ok((replaced.len(), true))
        })
    }

    /// Close the store; later operations fail
    ///
    /// Writes are applied as they happen, so nothing is pending here.
    pub fn close(&self) -> Result<()> {
        if !self.closed.swap(true, Ordering::SeqCst) {
            info!(location = %self.location, "Closed store");
        }
        Ok(())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    fn ensure_open(&self) -> Result<()> {
        if self.is_closed() {
            return Err(PersistError::storage(format!(
                "Store {} is closed",
                self.location
            )));
        }
        Ok(())
    }

    fn lock_image(&self) -> Result<MutexGuard<'_, StoreImage>> {
        self.image
            .lock()
            .map_err(|_| PersistError::storage("store lock poisoned"))
    }

    /// Apply `change` to a copy of `collection` and persist the result
    ///
    /// `change` reports whether it modified anything; unmodified collections
    /// are not rewritten. If the write fails the in-memory image is left as
    /// it was.
    fn mutate<R, F>(&self, collection: &str, change: F) -> Result<R>
    where
        F: FnOnce(&mut Vec<Document>) -> Result<(R, bool)>,
    {
        self.ensure_open()?;
        let mut image = self.lock_image()?;

        let mut documents = image
            .collections
            .get(collection)
            .cloned()
            .unwrap_or_default();
        let (outcome, changed) = change(&mut documents)?;
        if !changed {
            return Ok(outcome);
        }

        let previous = image
            .collections
            .insert(collection.to_string(), documents);
        match self.write_image(&image) {
            Ok(header) => {
                image.header = header;
                Ok(outcome)
            }
            Err(e) => {
                warn!(location = %self.location, collection, error = %e, "Store write failed, change discarded");
                match previous {
                    Some(previous) => {
                        image.collections.insert(collection.to_string(), previous);
                    }
                    None => {
                        image.collections.remove(collection);
                    }
                }
                Err(e)
            }
        }
    }

    fn write_current(&self) -> Result<()> {
        let mut image = self.lock_image()?;
        let header = self.write_image(&image)?;
        image.header = header;
        Ok(())
    }

    /// Serialize, compress and save `image`; returns the header that was written
    fn write_image(&self, image: &StoreImage) -> Result<StoreHeader> {
        #[cfg(feature = "metrics")]
        let timer = crate::observability::MetricsTimer::start_commit();

        let result = self.encode_and_save(image);

        #[cfg(feature = "metrics")]
        timer.finish(result.as_ref().ok().map(|(_, size)| *size));

        result.map(|(header, _)| header)
    }

    fn encode_and_save(&self, image: &StoreImage) -> Result<(StoreHeader, usize)> {
        let body = serde_json::to_vec(&image.collections)?;
        let document_count = image.collections.values().map(Vec::len).sum();

        let header = image
            .header
            .clone()
            .with_compression_algorithm(self.compressor.algorithm_name())
            .with_content(&body, document_count);
        header.validate()?;

        let mut bytes = serde_json::to_vec(&header)?;
        bytes.push(b'\n');
        bytes.extend_from_slice(&body);

        let compressed = self.compressor.compress(&bytes)?;
        self.storage.save(&compressed, &self.location)?;

        debug!(
            location = %self.location,
            documents = document_count,
            bytes = compressed.len(),
            "Store written"
        );
        Ok((header, compressed.len()))
    }
}

impl std::fmt::Debug for Database {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Database")
            .field("location", &self.location)
            .field("compression", &self.compressor.algorithm_name())
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

fn require_id(collection: &str, document: &Document) -> Result<i64> {
    document_id(document).ok_or_else(|| {
        PersistError::validation(format!(
            "document for '{collection}' has no numeric id"
        ))
    })
}

// The file is read with whatever compression it was written with; the
// configured compressor only applies to later writes.
fn read_image(
    storage: &dyn StorageAdapter,
    location: &str,
    credentials: &Credentials,
) -> Result<StoreImage> {
    let compressed = storage.load(location)?;
    let bytes = compressor_for_data(&compressed).decompress(&compressed)?;

    let split = bytes
        .iter()
        .position(|byte| *byte == b'\n')
        .ok_or_else(|| PersistError::invalid_format("missing store header"))?;
    let (head, body) = (&bytes[..split], &bytes[split + 1..]);

    let header: StoreHeader = serde_json::from_slice(head)
        .map_err(|e| PersistError::invalid_format(format!("unreadable store header: {e}")))?;

    if !header.is_compatible() {
        return Err(PersistError::invalid_format(format!(
            "Incompatible store format version: {} (current: {})",
            header.format_version, STORE_FORMAT_VERSION
        )));
    }
    header.verify_credentials(credentials)?;
    header.verify_integrity(body)?;

    let collections: Collections = serde_json::from_slice(body)?;
    Ok(StoreImage {
        header,
        collections,
    })
}
