use std::sync::Arc;

use serde_json::{Map, Value};

use bloomstock_core::StoreResult;

/// A schemaless document: a flat JSON object.
pub type Document = Map<String, Value>;

/// A flat equality filter over top-level document fields.
///
/// Every `(field, value)` pair must match exactly for a document to be
/// selected. This is the only query shape the repositories need; anything
/// richer (sorting, max-id scans) happens repository-side over `find_all`.
pub type Filter = Map<String, Value>;

/// Synchronous CRUD access to named collections of documents.
///
/// Every method is a single bounded store round trip. Connectivity or IO
/// failure surfaces as `StoreError::StorageUnavailable`; implementations do
/// not retry. The handle is shared read/write across repositories and must be
/// safe for sequential reuse; no locking discipline beyond the atomicity of
/// [`DocumentStore::increment_and_fetch`] is assumed anywhere.
pub trait DocumentStore: Send + Sync {
    /// Insert one document into a collection.
    fn insert_one(&self, collection: &str, document: Document) -> StoreResult<()>;

    /// Find the first document matching the filter.
    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>>;

    /// All documents in a collection, in store order.
    fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>>;

    /// Overwrite the given fields on the first document matching the filter.
    ///
    /// Returns whether a document matched.
    fn update_one(&self, collection: &str, filter: &Filter, set: &Document) -> StoreResult<bool>;

    /// Remove the first document matching the filter.
    ///
    /// Returns whether a document matched.
    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool>;

    /// Atomically increment and return the `sequence` field of the singleton
    /// counter document identified by `counter_id`.
    ///
    /// The first call creates the counter with value 1 and returns 1. The
    /// increment-and-fetch must be indivisible; it is the only operation the
    /// ledger relies on for concurrency-safe identifier assignment.
    fn increment_and_fetch(&self, collection: &str, counter_id: &str) -> StoreResult<i64>;
}

impl<S> DocumentStore for Arc<S>
where
    S: DocumentStore + ?Sized,
{
    fn insert_one(&self, collection: &str, document: Document) -> StoreResult<()> {
        (**self).insert_one(collection, document)
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        (**self).find_one(collection, filter)
    }

    fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        (**self).find_all(collection)
    }

    fn update_one(&self, collection: &str, filter: &Filter, set: &Document) -> StoreResult<bool> {
        (**self).update_one(collection, filter, set)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        (**self).delete_one(collection, filter)
    }

    fn increment_and_fetch(&self, collection: &str, counter_id: &str) -> StoreResult<i64> {
        (**self).increment_and_fetch(collection, counter_id)
    }
}

/// Key field of a singleton counter document.
pub const COUNTER_ID_FIELD: &str = "_id";

/// Value field of a singleton counter document.
pub const COUNTER_SEQUENCE_FIELD: &str = "sequence";

/// Whether a document satisfies a flat equality filter.
pub(crate) fn matches(document: &Document, filter: &Filter) -> bool {
    filter
        .iter()
        .all(|(field, expected)| document.get(field) == Some(expected))
}
