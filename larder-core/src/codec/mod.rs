/*!
Document codecs: conversion between domain values and stored documents.

Shape mismatches surface as [`PersistError::Json`]; the owning
[`Collection`](crate::store::Collection) turns them into decode errors that
name the collection. The aspect family is the one exception: unknown aspect
discriminators are recovered, not reported (see [`AspectRegistry`]).
*/

pub mod aspect;
pub mod workspace;

pub use aspect::{AspectDecoder, AspectRegistry, TYPE_KEY};
pub use workspace::WorkspaceCodec;

use crate::store::Document;
use crate::{PersistError, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

/// Conversion between a domain value and its stored document
pub trait Codec<T> {
    fn encode(&self, entity: &T) -> Result<Document>;
    fn decode(&self, document: Document) -> Result<T>;
}

/// Codec for plain serde records
#[derive(Debug, Clone, Copy, Default)]
pub struct JsonCodec;

impl<T> Codec<T> for JsonCodec
where
    T: Serialize + DeserializeOwned,
{
    fn encode(&self, entity: &T) -> Result<Document> {
        into_document(serde_json::to_value(entity)?)
    }

    fn decode(&self, document: Document) -> Result<T> {
        Ok(serde_json::from_value(Value::Object(document))?)
    }
}

pub(crate) fn into_document(value: Value) -> Result<Document> {
    match value {
        Value::Object(document) => Ok(document),
        other => Err(PersistError::invalid_format(format!(
            "expected a document object, got {other}"
        ))),
    }
}
