use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use serde_json::Value;
use tokio::sync::RwLock;

use genoport_storage::{DocumentStore, PageRequest, RefreshPolicy, SearchPage, StorageError};

/// One index: documents in insertion order, upserted by ID.
type IndexEntries = Vec<(String, Value)>;

/// In-memory document-store backend.
///
/// Used by tests and local development. Pagination walks documents in
/// insertion order, so strictly-increasing offsets observe a stable
/// sequence. Every write is immediately visible; the refresh policy is
/// accepted and ignored.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    data: Arc<RwLock<HashMap<String, IndexEntries>>>,
}

impl InMemoryStore {
    /// Creates a new empty in-memory store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of documents in an index (0 if the index is missing).
    pub async fn document_count(&self, index: &str) -> usize {
        let guard = self.data.read().await;
        guard.get(index).map_or(0, Vec::len)
    }
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn create_index(&self, index: &str) -> Result<(), StorageError> {
        let mut guard = self.data.write().await;
        guard.entry(index.to_string()).or_default();
        Ok(())
    }

    async fn index_exists(&self, index: &str) -> Result<bool, StorageError> {
        let guard = self.data.read().await;
        Ok(guard.contains_key(index))
    }

    async fn index_document(
        &self,
        index: &str,
        id: &str,
        content: &Value,
        _refresh: RefreshPolicy,
    ) -> Result<(), StorageError> {
        let mut guard = self.data.write().await;
        let entries = guard.entry(index.to_string()).or_default();
        match entries.iter_mut().find(|(doc_id, _)| doc_id == id) {
            Some((_, existing)) => *existing = content.clone(),
            None => entries.push((id.to_string(), content.clone())),
        }
        Ok(())
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>, StorageError> {
        let guard = self.data.read().await;
        Ok(guard
            .get(index)
            .and_then(|entries| entries.iter().find(|(doc_id, _)| doc_id == id))
            .map(|(_, content)| content.clone()))
    }

    async fn search(&self, index: &str, page: &PageRequest) -> Result<SearchPage, StorageError> {
        let guard = self.data.read().await;
        let Some(entries) = guard.get(index) else {
            // A missing index behaves like an empty one here; backends
            // talking to a real store may reject the query instead.
            return Ok(SearchPage::empty());
        };

        let hits: Vec<Value> = entries
            .iter()
            .skip(page.from)
            .take(page.size)
            .map(|(_, content)| content.clone())
            .collect();

        Ok(SearchPage::with_hits(hits).with_total(entries.len() as u64))
    }

    fn backend_name(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn create_index_is_idempotent() {
        let store = InMemoryStore::new();
        store.create_index("portal-projects").await.unwrap();
        store.create_index("portal-projects").await.unwrap();
        assert!(store.index_exists("portal-projects").await.unwrap());
        assert!(!store.index_exists("other").await.unwrap());
    }

    #[tokio::test]
    async fn index_document_upserts_by_id() {
        let store = InMemoryStore::new();
        store
            .index_document("idx", "a", &json!({"v": 1}), RefreshPolicy::WaitFor)
            .await
            .unwrap();
        store
            .index_document("idx", "a", &json!({"v": 2}), RefreshPolicy::WaitFor)
            .await
            .unwrap();

        assert_eq!(store.document_count("idx").await, 1);
        assert_eq!(
            store.get_document("idx", "a").await.unwrap(),
            Some(json!({"v": 2}))
        );
    }

    #[tokio::test]
    async fn get_document_missing_is_none() {
        let store = InMemoryStore::new();
        store.create_index("idx").await.unwrap();
        assert_eq!(store.get_document("idx", "nope").await.unwrap(), None);
        assert_eq!(store.get_document("no-index", "nope").await.unwrap(), None);
    }

    #[tokio::test]
    async fn search_pages_in_insertion_order() {
        let store = InMemoryStore::new();
        for i in 0..5 {
            store
                .index_document(
                    "files",
                    &format!("doc-{i}"),
                    &json!({"n": i}),
                    RefreshPolicy::None,
                )
                .await
                .unwrap();
        }

        let first = store.search("files", &PageRequest::page(0, 2)).await.unwrap();
        assert_eq!(first.len(), 2);
        assert_eq!(first.hits[0], json!({"n": 0}));
        assert_eq!(first.total, Some(5));

        let last = store.search("files", &PageRequest::page(2, 2)).await.unwrap();
        assert_eq!(last.len(), 1);
        assert_eq!(last.hits[0], json!({"n": 4}));

        let past_end = store.search("files", &PageRequest::page(3, 2)).await.unwrap();
        assert!(past_end.is_empty());
    }

    #[tokio::test]
    async fn search_missing_index_is_empty() {
        let store = InMemoryStore::new();
        let page = store.search("ghost", &PageRequest::page(0, 10)).await.unwrap();
        assert!(page.is_empty());
    }
}
