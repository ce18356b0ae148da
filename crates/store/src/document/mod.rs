//! The opaque document-store CRUD surface and its backends.

pub mod in_memory;
pub mod postgres;
pub mod store;

pub use in_memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use store::{Document, DocumentStore, Filter};
