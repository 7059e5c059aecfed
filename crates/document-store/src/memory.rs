use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::{Map, Value};
use tokio::sync::RwLock;

use crate::document::require_object;
use crate::{
    AggregateRow, Aggregation, DocumentId, DocumentStore, Filter, ListOptions, Result,
};

#[derive(Debug, Clone)]
struct StoredDocument {
    id: DocumentId,
    body: Map<String, Value>,
}

/// In-memory document store.
///
/// Provides the same interface as the PostgreSQL implementation. Cloning
/// shares the underlying collections, so give each service its own instance.
#[derive(Clone, Default)]
pub struct InMemoryDocumentStore {
    collections: Arc<RwLock<HashMap<String, Vec<StoredDocument>>>>,
}

impl InMemoryDocumentStore {
    /// Creates a new empty in-memory store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents stored under a kind.
    pub async fn count(&self, kind: &str) -> usize {
        self.collections
            .read()
            .await
            .get(kind)
            .map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for InMemoryDocumentStore {
    async fn create(&self, kind: &str, body: Value) -> Result<DocumentId> {
        let body = require_object(kind, body)?;
        let id = DocumentId::new();

        self.collections
            .write()
            .await
            .entry(kind.to_string())
            .or_default()
            .push(StoredDocument { id, body });

        Ok(id)
    }

    async fn find(&self, kind: &str, filter: &Filter) -> Result<Option<Value>> {
        let collections = self.collections.read().await;
        Ok(collections.get(kind).and_then(|documents| {
            documents
                .iter()
                .find(|d| filter.matches(&d.body))
                .map(|d| Value::Object(d.body.clone()))
        }))
    }

    async fn list(&self, kind: &str, filter: &Filter, options: ListOptions) -> Result<Vec<Value>> {
        let collections = self.collections.read().await;
        let Some(documents) = collections.get(kind) else {
            return Ok(Vec::new());
        };

        let matching = documents.iter().filter(|d| filter.matches(&d.body));
        let limit = options.limit.unwrap_or(usize::MAX);

        let bodies: Vec<Value> = if options.newest_first {
            matching
                .rev()
                .take(limit)
                .map(|d| Value::Object(d.body.clone()))
                .collect()
        } else {
            matching
                .take(limit)
                .map(|d| Value::Object(d.body.clone()))
                .collect()
        };

        Ok(bodies)
    }

    async fn update_fields(
        &self,
        kind: &str,
        filter: &Filter,
        fields: Map<String, Value>,
    ) -> Result<u64> {
        let mut collections = self.collections.write().await;
        let Some(document) = collections
            .get_mut(kind)
            .and_then(|documents| documents.iter_mut().find(|d| filter.matches(&d.body)))
        else {
            return Ok(0);
        };

        tracing::trace!(kind, id = %document.id, "updating document fields");
        document.body.extend(fields);
        Ok(1)
    }

    async fn aggregate(&self, kind: &str, aggregation: &Aggregation) -> Result<Vec<AggregateRow>> {
        let collections = self.collections.read().await;
        let documents = collections
            .get(kind)
            .map(Vec::as_slice)
            .unwrap_or_default()
            .iter()
            .filter(|d| aggregation.filter.matches(&d.body));

        let Some(group_field) = &aggregation.group_by else {
            let mut row = AggregateRow::default();
            for document in documents {
                aggregation.accumulate(&mut row, &document.body);
            }
            return Ok(vec![row]);
        };

        // Groups keep the order in which their key was first seen.
        let mut rows: Vec<AggregateRow> = Vec::new();
        for document in documents {
            let key = document.body.get(group_field).cloned();
            let index = match rows.iter().position(|r| r.key == key) {
                Some(index) => index,
                None => {
                    rows.push(AggregateRow {
                        key,
                        ..Default::default()
                    });
                    rows.len() - 1
                }
            };
            aggregation.accumulate(&mut rows[index], &document.body);
        }

        Ok(rows)
    }

    async fn clear(&self, kind: &str) -> Result<()> {
        self.collections.write().await.remove(kind);
        Ok(())
    }
}
