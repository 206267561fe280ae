/*!
Typed collection handles.
*/

use super::{Database, Document, Filter};
use crate::codec::Codec;
use crate::{PersistError, Result};
use std::marker::PhantomData;
use std::sync::Arc;

/// Typed view of one collection of a [`Database`]
///
/// Documents are decoded on the way out and encoded on the way in with the
/// collection's codec. Codec shape errors are reported as
/// [`PersistError::Decode`] naming this collection.
pub struct Collection<T, K> {
    db: Arc<Database>,
    name: String,
    codec: K,
    _entity: PhantomData<fn() -> T>,
}

impl<T, K> Collection<T, K>
where
    K: Codec<T>,
{
    pub fn new<N: Into<String>>(db: Arc<Database>, name: N, codec: K) -> Self {
        Self {
            db,
            name: name.into(),
            codec,
            _entity: PhantomData,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn codec(&self) -> &K {
        &self.codec
    }

    pub fn find_all(&self) -> Result<Vec<T>> {
        self.find_by(&Filter::All)
    }

    pub fn find_by(&self, filter: &Filter) -> Result<Vec<T>> {
        self.db
            .find(&self.name, filter)?
            .into_iter()
            .map(|document| self.decode(document))
            .collect()
    }

    /// First match in store order; only that document is decoded
    pub fn find_first(&self, filter: &Filter) -> Result<Option<T>> {
        self.db
            .find_first(&self.name, filter)?
            .map(|document| self.decode(document))
            .transpose()
    }

    pub fn contains_id(&self, id: i64) -> Result<bool> {
        self.db.contains_id(&self.name, id)
    }

    pub fn count(&self) -> Result<usize> {
        self.db.count(&self.name)
    }

    pub fn insert(&self, entity: &T) -> Result<()> {
        self.insert_all(std::slice::from_ref(entity))
    }

    pub fn insert_all(&self, entities: &[T]) -> Result<()> {
        let documents = self.encode_all(entities)?;
        self.db.insert(&self.name, documents)
    }

    /// Replace the stored entity with the same identifier
    ///
    /// Fails with [`PersistError::DocumentNotFound`] if it is not stored.
    pub fn update(&self, entity: &T) -> Result<()> {
        let document = self.codec.encode(entity)?;
        self.db.update(&self.name, document)
    }

    pub fn remove_by(&self, filter: &Filter) -> Result<usize> {
        self.db.remove(&self.name, filter)
    }

    pub fn remove_all(&self) -> Result<usize> {
        self.remove_by(&Filter::All)
    }

    /// Replace the whole collection with `entities` in one write
    pub fn replace_all(&self, entities: &[T]) -> Result<usize> {
        let documents = self.encode_all(entities)?;
        self.db.replace(&self.name, documents)
    }

    fn encode_all(&self, entities: &[T]) -> Result<Vec<Document>> {
        entities
            .iter()
            .map(|entity| self.codec.encode(entity))
            .collect()
    }

    fn decode(&self, document: Document) -> Result<T> {
        self.codec.decode(document).map_err(|e| match e {
            PersistError::Json(e) => {
                crate::observability::record_decode_failure();
                tracing::warn!(collection = %self.name, error = %e, "Failed to decode document");
                PersistError::decode(self.name.as_str(), e)
            }
            other => other,
        })
    }
}
