/*!
Embedded, file-backed document store.

[`Database`] owns the store file and its raw JSON documents. [`Collection`]
is the typed view the rest of the crate works with: one handle per aggregate
kind, converting between documents and domain values through a
[`Codec`](crate::codec::Codec).
*/

pub mod collection;
pub mod database;
pub mod header;

pub use collection::Collection;
pub use database::Database;
pub use header::{Credentials, StoreHeader, STORE_FORMAT_VERSION};

use serde_json::Value;

/// A stored document: a JSON object
pub type Document = serde_json::Map<String, Value>;

/// Field every stored document is keyed by
pub const ID_FIELD: &str = "id";

/// Identifier of a document, if it carries a numeric one
pub fn document_id(document: &Document) -> Option<i64> {
    document.get(ID_FIELD).and_then(Value::as_i64)
}

/// Document selector evaluated without decoding
#[derive(Debug, Clone, PartialEq)]
pub enum Filter {
    /// Every document
    All,
    /// Documents whose top-level `field` equals `value`
    Eq { field: String, value: Value },
}

impl Filter {
    pub fn eq<F: Into<String>, V: Into<Value>>(field: F, value: V) -> Self {
        Filter::Eq {
            field: field.into(),
            value: value.into(),
        }
    }

    pub fn matches(&self, document: &Document) -> bool {
        match self {
            Filter::All => true,
            Filter::Eq { field, value } => document.get(field) == Some(value),
        }
    }
}
