//! Monotonic identifier allocation.
//!
//! Two policies, matching two consistency needs:
//!
//! - [`ScanMaxAllocator`] reads the current maximum stored identifier and
//!   returns `max + 1`. Not safe under concurrent writers — two simultaneous
//!   allocations can read the same max and collide. Accepted for the product
//!   catalog, which assumes a single logical writer; if that assumption ever
//!   breaks, switch the catalog to [`CounterAllocator`].
//! - [`CounterAllocator`] delegates to the store's atomic
//!   increment-and-fetch on a singleton counter document, which is safe
//!   across concurrent callers. Used for the ticket ledger.

use std::sync::Arc;

use serde_json::Value;

use bloomstock_core::StoreResult;

use crate::document::DocumentStore;

/// Produces monotonically increasing integer identifiers.
///
/// Sequences are gap-tolerant (a failed allocation may burn a value) but
/// never produce duplicates for a single-writer workload.
pub trait IdAllocator {
    /// The next identifier in the sequence.
    ///
    /// # Errors
    ///
    /// `StoreError::StorageUnavailable` when the store cannot be reached.
    fn allocate_next(&self) -> StoreResult<i64>;
}

/// Scan-max policy: `max stored id + 1`, or 1 for an empty collection.
pub struct ScanMaxAllocator {
    store: Arc<dyn DocumentStore>,
    collection: &'static str,
    id_field: &'static str,
}

impl ScanMaxAllocator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: &'static str,
        id_field: &'static str,
    ) -> Self {
        Self {
            store,
            collection,
            id_field,
        }
    }
}

impl IdAllocator for ScanMaxAllocator {
    fn allocate_next(&self) -> StoreResult<i64> {
        let documents = self.store.find_all(self.collection)?;
        let max = documents
            .iter()
            .filter_map(|d| d.get(self.id_field).and_then(Value::as_i64))
            .max();
        Ok(max.map_or(1, |m| m + 1))
    }
}

/// Atomic-counter policy: one singleton counter document per sequence.
pub struct CounterAllocator {
    store: Arc<dyn DocumentStore>,
    collection: &'static str,
    counter_id: &'static str,
}

impl CounterAllocator {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        collection: &'static str,
        counter_id: &'static str,
    ) -> Self {
        Self {
            store,
            collection,
            counter_id,
        }
    }
}

impl IdAllocator for CounterAllocator {
    fn allocate_next(&self) -> StoreResult<i64> {
        self.store.increment_and_fetch(self.collection, self.counter_id)
    }
}
