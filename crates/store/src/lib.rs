//! Infrastructure layer: the document store, identifier allocation, and the
//! catalog/ledger repositories.
//!
//! Domain crates stay IO-free; everything that touches the store lives here.

pub mod allocator;
pub mod codec;
pub mod document;
pub mod products;
pub mod seed;
pub mod tickets;


pub use allocator::{CounterAllocator, IdAllocator, ScanMaxAllocator};
pub use document::{Document, DocumentStore, Filter, InMemoryDocumentStore, PostgresDocumentStore};
pub use products::ProductRepository;
pub use seed::{PrimaryStock, StockSeeder};
pub use tickets::TicketRepository;
