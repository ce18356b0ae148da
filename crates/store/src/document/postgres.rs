//! Postgres-backed document store.
//!
//! Documents live in a single table: `documents(collection TEXT, body JSONB)`.
//! Flat equality filters map to the JSONB containment operator (`@>`), and
//! the counter increment is a single `UPDATE ... RETURNING` statement, which
//! is what makes [`DocumentStore::increment_and_fetch`] atomic on this
//! backend.
//!
//! The `DocumentStore` trait is synchronous, but sqlx operations are async.
//! As with the in-memory backend's callers, everything here is a single
//! bounded round trip, so the sync impl bridges with
//! `tokio::runtime::Handle::block_on` and fails with `StorageUnavailable`
//! when no runtime is reachable.

use std::sync::Arc;

use serde_json::Value;
use sqlx::{PgPool, Row};
use tracing::instrument;

use bloomstock_core::{StoreError, StoreResult};

use super::store::{
    COUNTER_ID_FIELD, COUNTER_SEQUENCE_FIELD, Document, DocumentStore, Filter,
};

/// Postgres JSONB document store.
#[derive(Debug, Clone)]
pub struct PostgresDocumentStore {
    pool: Arc<PgPool>,
}

impl PostgresDocumentStore {
    pub fn new(pool: PgPool) -> Self {
        Self {
            pool: Arc::new(pool),
        }
    }

    /// Create the backing table if it does not exist yet.
    ///
    /// The partial unique index over `_id`-keyed documents is what makes
    /// counter creation race-free: concurrent first allocations collide on
    /// the index instead of inserting two counter rows.
    pub async fn ensure_schema(&self) -> StoreResult<()> {
        sqlx::query(
            r#"
            CREATE TABLE IF NOT EXISTS documents (
                collection TEXT NOT NULL,
                body JSONB NOT NULL
            )
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(unavailable)?;

        sqlx::query(
            r#"
            CREATE UNIQUE INDEX IF NOT EXISTS documents_counter_key
            ON documents (collection, (body->>'_id'))
            WHERE jsonb_exists(body, '_id')
            "#,
        )
        .execute(&*self.pool)
        .await
        .map_err(unavailable)?;
        Ok(())
    }

    #[instrument(skip(self, document), err)]
    async fn insert_one_async(&self, collection: &str, document: Document) -> StoreResult<()> {
        sqlx::query("INSERT INTO documents (collection, body) VALUES ($1, $2)")
            .bind(collection)
            .bind(Value::Object(document))
            .execute(&*self.pool)
            .await
            .map_err(unavailable)?;
        Ok(())
    }

    #[instrument(skip(self, filter), err)]
    async fn find_one_async(
        &self,
        collection: &str,
        filter: &Filter,
    ) -> StoreResult<Option<Document>> {
        let row = sqlx::query(
            "SELECT body FROM documents WHERE collection = $1 AND body @> $2 LIMIT 1",
        )
        .bind(collection)
        .bind(Value::Object(filter.clone()))
        .fetch_optional(&*self.pool)
        .await
        .map_err(unavailable)?;

        row.map(|r| body_document(&r)).transpose()
    }

    #[instrument(skip(self), err)]
    async fn find_all_async(&self, collection: &str) -> StoreResult<Vec<Document>> {
        let rows = sqlx::query("SELECT body FROM documents WHERE collection = $1")
            .bind(collection)
            .fetch_all(&*self.pool)
            .await
            .map_err(unavailable)?;

        rows.iter().map(body_document).collect()
    }

    #[instrument(skip(self, filter, set), err)]
    async fn update_one_async(
        &self,
        collection: &str,
        filter: &Filter,
        set: &Document,
    ) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            WITH target AS (
                SELECT ctid FROM documents
                WHERE collection = $1 AND body @> $2
                LIMIT 1
            )
            UPDATE documents SET body = body || $3
            FROM target
            WHERE documents.ctid = target.ctid
            "#,
        )
        .bind(collection)
        .bind(Value::Object(filter.clone()))
        .bind(Value::Object(set.clone()))
        .execute(&*self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    #[instrument(skip(self, filter), err)]
    async fn delete_one_async(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        let result = sqlx::query(
            r#"
            WITH target AS (
                SELECT ctid FROM documents
                WHERE collection = $1 AND body @> $2
                LIMIT 1
            )
            DELETE FROM documents
            USING target
            WHERE documents.ctid = target.ctid
            "#,
        )
        .bind(collection)
        .bind(Value::Object(filter.clone()))
        .execute(&*self.pool)
        .await
        .map_err(unavailable)?;

        Ok(result.rows_affected() > 0)
    }

    async fn try_increment(&self, collection: &str, counter_id: &str) -> StoreResult<Option<i64>> {
        let row = sqlx::query(
            r#"
            UPDATE documents
            SET body = jsonb_set(
                body,
                ARRAY['sequence'],
                to_jsonb(((body->>'sequence')::bigint) + 1)
            )
            WHERE collection = $1 AND body->>'_id' = $2
            RETURNING (body->>'sequence')::bigint AS sequence
            "#,
        )
        .bind(collection)
        .bind(counter_id)
        .fetch_optional(&*self.pool)
        .await
        .map_err(unavailable)?;

        row.map(|r| r.try_get::<i64, _>("sequence").map_err(unavailable))
            .transpose()
    }

    #[instrument(skip(self), err)]
    async fn increment_and_fetch_async(
        &self,
        collection: &str,
        counter_id: &str,
    ) -> StoreResult<i64> {
        if let Some(sequence) = self.try_increment(collection, counter_id).await? {
            return Ok(sequence);
        }

        // First allocation: create the counter at 1. The unique counter
        // index turns a concurrent creation into a no-op insert here, so at
        // most one caller wins the row and returns 1.
        let mut counter = Document::new();
        counter.insert(COUNTER_ID_FIELD.to_string(), Value::from(counter_id));
        counter.insert(COUNTER_SEQUENCE_FIELD.to_string(), Value::from(1));
        let inserted = sqlx::query(
            "INSERT INTO documents (collection, body) VALUES ($1, $2) ON CONFLICT DO NOTHING",
        )
        .bind(collection)
        .bind(Value::Object(counter))
        .execute(&*self.pool)
        .await
        .map_err(unavailable)?;

        if inserted.rows_affected() > 0 {
            return Ok(1);
        }

        // Lost the creation race; the counter exists now, so increment it.
        self.try_increment(collection, counter_id)
            .await?
            .ok_or_else(|| StoreError::unavailable("counter disappeared after creation conflict"))
    }
}

fn unavailable(e: sqlx::Error) -> StoreError {
    StoreError::unavailable(e.to_string())
}

fn body_document(row: &sqlx::postgres::PgRow) -> StoreResult<Document> {
    let body: Value = row.try_get("body").map_err(unavailable)?;
    match body {
        Value::Object(map) => Ok(map),
        other => Err(StoreError::decode(format!(
            "document body is not an object: {other}"
        ))),
    }
}

fn runtime_handle() -> StoreResult<tokio::runtime::Handle> {
    tokio::runtime::Handle::try_current().map_err(|_| {
        StoreError::unavailable(
            "PostgresDocumentStore requires a tokio runtime context",
        )
    })
}

impl DocumentStore for PostgresDocumentStore {
    fn insert_one(&self, collection: &str, document: Document) -> StoreResult<()> {
        runtime_handle()?.block_on(self.insert_one_async(collection, document))
    }

    fn find_one(&self, collection: &str, filter: &Filter) -> StoreResult<Option<Document>> {
        runtime_handle()?.block_on(self.find_one_async(collection, filter))
    }

    fn find_all(&self, collection: &str) -> StoreResult<Vec<Document>> {
        runtime_handle()?.block_on(self.find_all_async(collection))
    }

    fn update_one(&self, collection: &str, filter: &Filter, set: &Document) -> StoreResult<bool> {
        runtime_handle()?.block_on(self.update_one_async(collection, filter, set))
    }

    fn delete_one(&self, collection: &str, filter: &Filter) -> StoreResult<bool> {
        runtime_handle()?.block_on(self.delete_one_async(collection, filter))
    }

    fn increment_and_fetch(&self, collection: &str, counter_id: &str) -> StoreResult<i64> {
        runtime_handle()?.block_on(self.increment_and_fetch_async(collection, counter_id))
    }
}
