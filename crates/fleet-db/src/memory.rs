//! In-process document store

use async_trait::async_trait;
use dashmap::DashMap;
use std::collections::BTreeMap;
use tracing::debug;

use crate::query::{self, QueryConstraint};
use crate::{DbResult, Document, DocumentStore};

/// Collections held in memory, documents ordered by id
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    collections: DashMap<String, BTreeMap<String, Document>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn collection_count(&self) -> usize {
        self.collections.len()
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn get_document(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        Ok(self
            .collections
            .get(collection)
            .and_then(|docs| docs.get(id).cloned()))
    }

    async fn get_collection(&self, collection: &str) -> DbResult<Vec<Document>> {
        Ok(self
            .collections
            .get(collection)
            .map(|docs| docs.values().cloned().collect())
            .unwrap_or_default())
    }

    async fn get_collection_with_query(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> DbResult<Vec<Document>> {
        query::validate(constraints)?;
        let documents = self.get_collection(collection).await?;
        Ok(query::apply(documents, constraints))
    }

    async fn put_document(&self, collection: &str, document: Document) -> DbResult<()> {
        debug!("Storing {}/{}", collection, document.id);
        self.collections
            .entry(collection.to_string())
            .or_default()
            .insert(document.id.clone(), document);
        Ok(())
    }

    async fn health_check(&self) -> DbResult<bool> {
        Ok(true)
    }

    fn backend(&self) -> &'static str {
        "memory"
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::FilterOp;
    use serde_json::json;

    async fn seeded() -> MemoryDocumentStore {
        let store = MemoryDocumentStore::new();
        for (id, age) in [("b", 40), ("a", 20), ("c", 30)] {
            let doc = Document::from_value(id, json!({ "age": age })).unwrap();
            store.put_document("users", doc).await.unwrap();
        }
        store
    }

    #[tokio::test]
    async fn test_get_document() {
        let store = seeded().await;

        let doc = store.get_document("users", "a").await.unwrap().unwrap();
        assert_eq!(doc.data["age"], 20);
        assert!(store.get_document("users", "zz").await.unwrap().is_none());
        assert!(store.get_document("nothing", "a").await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_get_collection_sorted_by_id() {
        let store = seeded().await;

        let docs = store.get_collection("users").await.unwrap();
        let ids: Vec<_> = docs.iter().map(|d| d.id.as_str()).collect();
        assert_eq!(ids, vec!["a", "b", "c"]);
        assert!(store.get_collection("empty").await.unwrap().is_empty());
    }

    #[tokio::test]
    async fn test_query_and_replace() {
        let store = seeded().await;
        store
            .put_document("users", Document::from_value("a", json!({"age": 50})).unwrap())
            .await
            .unwrap();

        let docs = store
            .get_collection_with_query("users", &[QueryConstraint::filter("age", FilterOp::Gte, 40)])
            .await
            .unwrap();
        assert_eq!(docs.len(), 2);
        assert_eq!(store.collection_count(), 1);
    }

    #[tokio::test]
    async fn test_invalid_query_propagates() {
        let store = seeded().await;
        let result = store
            .get_collection_with_query("users", &[QueryConstraint::filter("age", FilterOp::In, 3)])
            .await;
        assert!(result.is_err());
    }
}
