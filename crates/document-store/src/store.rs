use async_trait::async_trait;
use serde::{Serialize, de::DeserializeOwned};
use serde_json::{Map, Value};

use crate::{AggregateRow, Aggregation, DocumentId, Filter, ListOptions, Result};

/// Core trait for document store implementations.
///
/// Documents are JSON objects grouped by a `kind` (one collection per record
/// type). Every service owns its own store instance; nothing here is shared
/// between services. All implementations must be thread-safe (Send + Sync).
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Inserts a document and returns its store-assigned ID.
    async fn create(&self, kind: &str, body: Value) -> Result<DocumentId>;

    /// Returns the first document (in insertion order) matching the filter.
    async fn find(&self, kind: &str, filter: &Filter) -> Result<Option<Value>>;

    /// Returns every document matching the filter.
    async fn list(&self, kind: &str, filter: &Filter, options: ListOptions) -> Result<Vec<Value>>;

    /// Sets top-level fields on the first document matching the filter.
    ///
    /// Returns the number of documents updated (0 or 1). Fields not named in
    /// `fields` are left untouched.
    async fn update_fields(
        &self,
        kind: &str,
        filter: &Filter,
        fields: Map<String, Value>,
    ) -> Result<u64>;

    /// Runs a count/sum aggregation over the documents of a kind.
    async fn aggregate(&self, kind: &str, aggregation: &Aggregation) -> Result<Vec<AggregateRow>>;

    /// Removes every document of a kind.
    async fn clear(&self, kind: &str) -> Result<()>;
}

/// Extension trait providing typed convenience methods for document stores.
#[async_trait]
pub trait DocumentStoreExt: DocumentStore {
    /// Serializes and inserts a record.
    async fn insert<T>(&self, kind: &str, record: &T) -> Result<DocumentId>
    where
        T: Serialize + Sync,
    {
        let body = serde_json::to_value(record)?;
        self.create(kind, body).await
    }

    /// Finds and deserializes the first record matching the filter.
    async fn find_one<T>(&self, kind: &str, filter: &Filter) -> Result<Option<T>>
    where
        T: DeserializeOwned + Send,
    {
        match self.find(kind, filter).await? {
            Some(body) => Ok(Some(serde_json::from_value(body)?)),
            None => Ok(None),
        }
    }

    /// Lists and deserializes every record matching the filter.
    async fn find_all<T>(&self, kind: &str, filter: &Filter, options: ListOptions) -> Result<Vec<T>>
    where
        T: DeserializeOwned + Send,
    {
        self.list(kind, filter, options)
            .await?
            .into_iter()
            .map(|body| serde_json::from_value(body).map_err(Into::into))
            .collect()
    }

    /// Sets a single field on the first document matching the filter.
    async fn set_field(
        &self,
        kind: &str,
        filter: &Filter,
        field: &str,
        value: Value,
    ) -> Result<u64> {
        let mut fields = Map::new();
        fields.insert(field.to_string(), value);
        self.update_fields(kind, filter, fields).await
    }
}

// Blanket implementation for all DocumentStore implementations
impl<T: DocumentStore + ?Sized> DocumentStoreExt for T {}
