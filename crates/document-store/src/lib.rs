pub mod document;
pub mod error;
pub mod memory;
pub mod postgres;
pub mod query;
pub mod store;

pub use document::DocumentId;
pub use error::{Result, StoreError};
pub use memory::InMemoryDocumentStore;
pub use postgres::PostgresDocumentStore;
pub use query::{AggregateRow, Aggregation, Filter, ListOptions};
pub use store::{DocumentStore, DocumentStoreExt};
