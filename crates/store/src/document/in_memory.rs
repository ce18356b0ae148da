use std::collections::HashMap;
use std::sync::RwLock;

use serde_json::Value;

use bloomstock_core::{StoreError, StoreResult};

use super::store::{
    COUNTER_ID_FIELD, COUNTER_SEQUENCE_FIELD, Document, DocumentStore, Filter, matches,
};

/// In-memory document store.
///
/// Intended for tests/dev. Insertion order is the store order.
#[derive(Debug, Default)]
pub struct InMemoryDocumentStore {
    collections: RwLock<HashMap<String, Vec<Document>>>,
}

impl InMemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl DocumentStore for InMemoryDocumentStore {
    fn insert_one(&self, collection: &str, document: Document) -> StoreResult<()> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::unavailable("lock poisoned"))?;
        collections.entry(collection.to_string()).or_default().push(document);
        Ok(())
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::unavailable("lock poisoned"))?;
        Ok(collections
            .get(collection)
            .and_then(|docs| docs.iter().find(|d| matches(d, filter)).cloned()))
    }

    fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let collections = self
            .collections
            .read()
            .map_err(|_| StoreError::unavailable("lock poisoned"))?;
        Ok(collections.get(collection).cloned().unwrap_or_default())
    }

    fn update_one(&self, collection: &str, filter: &Filter, set: &Document) -> StoreResult<bool> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::unavailable("lock poisoned"))?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(doc) = docs.iter_mut().find(|d| matches(d, filter)) else {
            return Ok(false);
        };
        for (field, value) in set {
            doc.insert(field.clone(), value.clone());
        }
        Ok(true)
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::unavailable("lock poisoned"))?;
        let Some(docs) = collections.get_mut(collection) else {
            return Ok(false);
        };
        let Some(position) = docs.iter().position(|d| matches(d, filter)) else {
            return Ok(false);
        };
        docs.remove(position);
        Ok(true)
    }

    fn increment_and_fetch(&self, collection: &str, counter_id: &str) -> StoreResult<i64> {
        // The write lock is held across read-modify-write, which is what makes
        // this increment indivisible for this backend.
        let mut collections = self
            .collections
            .write()
            .map_err(|_| StoreError::unavailable("lock poisoned"))?;
        let docs = collections.entry(collection.to_string()).or_default();

        let counter = docs
            .iter_mut()
            .find(|d| d.get(COUNTER_ID_FIELD).and_then(Value::as_str) == Some(counter_id));

        match counter {
            Some(doc) => {
                let current = doc
                    .get(COUNTER_SEQUENCE_FIELD)
                    .and_then(Value::as_i64)
                    .ok_or_else(|| {
                        StoreError::decode(format!("counter '{counter_id}' has no integer sequence"))
                    })?;
                let next = current + 1;
                doc.insert(COUNTER_SEQUENCE_FIELD.to_string(), Value::from(next));
                Ok(next)
            }
            None => {
                let mut doc = Document::new();
                doc.insert(COUNTER_ID_FIELD.to_string(), Value::from(counter_id));
                doc.insert(COUNTER_SEQUENCE_FIELD.to_string(), Value::from(1));
                docs.push(doc);
                Ok(1)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(pairs: &[(&str, Value)]) -> Document {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), v.clone()))
            .collect()
    }

    #[test]
    fn find_one_matches_on_every_filter_field() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_one("things", doc(&[("name", "a".into()), ("size", 1.into())]))
            .unwrap();
        store
            .insert_one("things", doc(&[("name", "a".into()), ("size", 2.into())]))
            .unwrap();

        let found = store
            .find_one("things", &doc(&[("name", "a".into()), ("size", 2.into())]))
            .unwrap()
            .unwrap();
        assert_eq!(found.get("size"), Some(&Value::from(2)));

        let missing = store
            .find_one("things", &doc(&[("name", "b".into())]))
            .unwrap();
        assert!(missing.is_none());
    }

    #[test]
    fn update_one_overwrites_only_the_set_fields() {
        let store = InMemoryDocumentStore::new();
        store
            .insert_one("things", doc(&[("name", "a".into()), ("size", 1.into())]))
            .unwrap();

        let matched = store
            .update_one(
                "things",
                &doc(&[("name", "a".into())]),
                &doc(&[("size", 9.into())]),
            )
            .unwrap();
        assert!(matched);

        let found = store
            .find_one("things", &doc(&[("name", "a".into())]))
            .unwrap()
            .unwrap();
        assert_eq!(found.get("size"), Some(&Value::from(9)));
        assert_eq!(found.get("name"), Some(&Value::from("a")));
    }

    #[test]
    fn update_and_delete_report_a_missing_match() {
        let store = InMemoryDocumentStore::new();
        assert!(!store
            .update_one("things", &doc(&[("name", "ghost".into())]), &Document::new())
            .unwrap());
        assert!(!store
            .delete_one("things", &doc(&[("name", "ghost".into())]))
            .unwrap());
    }

    #[test]
    fn delete_one_removes_a_single_document() {
        let store = InMemoryDocumentStore::new();
        store.insert_one("things", doc(&[("name", "a".into())])).unwrap();
        store.insert_one("things", doc(&[("name", "a".into())])).unwrap();

        assert!(store.delete_one("things", &doc(&[("name", "a".into())])).unwrap());
        assert_eq!(store.find_all("things").unwrap().len(), 1);
    }

    #[test]
    fn counter_starts_at_one_and_increments() {
        let store = InMemoryDocumentStore::new();
        for expected in 1..=5 {
            assert_eq!(store.increment_and_fetch("counters", "ticketID").unwrap(), expected);
        }
    }

    #[test]
    fn concurrent_first_allocations_never_duplicate() {
        use std::sync::Arc;

        // All callers race the counter's creation; exactly one may see 1 and
        // the overall sequence must come out dense.
        let store = Arc::new(InMemoryDocumentStore::new());
        let handles: Vec<_> = (0..8)
            .map(|_| {
                let store = store.clone();
                std::thread::spawn(move || store.increment_and_fetch("counters", "ticketID").unwrap())
            })
            .collect();

        let mut ids: Vec<i64> = handles.into_iter().map(|h| h.join().unwrap()).collect();
        ids.sort_unstable();
        assert_eq!(ids, (1..=8).collect::<Vec<i64>>());
    }

    #[test]
    fn counters_are_independent_per_id() {
        let store = InMemoryDocumentStore::new();
        assert_eq!(store.increment_and_fetch("counters", "a").unwrap(), 1);
        assert_eq!(store.increment_and_fetch("counters", "b").unwrap(), 1);
        assert_eq!(store.increment_and_fetch("counters", "a").unwrap(), 2);
    }

    #[test]
    fn find_all_preserves_insertion_order() {
        let store = InMemoryDocumentStore::new();
        for i in 0..4 {
            store.insert_one("things", doc(&[("i", i.into())])).unwrap();
        }
        let all = store.find_all("things").unwrap();
        let order: Vec<i64> = all.iter().filter_map(|d| d.get("i")?.as_i64()).collect();
        assert_eq!(order, vec![0, 1, 2, 3]);
    }
}
