//! # Fleet DB - Document Store Accessors
//!
//! Read access to named collections of JSON documents, with optional query
//! constraints. Two backends share one [`DocumentStore`] trait: an in-memory
//! store for local runs and tests, and a ScyllaDB-backed store.

pub mod cluster;
pub mod error;
pub mod memory;
pub mod migrations;
pub mod query;

pub use cluster::ScyllaDocumentStore;
pub use error::{DbError, DbResult};
pub use memory::MemoryDocumentStore;
pub use query::{Direction, FilterOp, QueryConstraint};

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use std::time::Duration;

/// Database configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DbConfig {
    pub hosts: Vec<String>,
    pub keyspace: String,
    #[serde(default = "default_replication_factor")]
    pub replication_factor: u32,
    #[serde(skip, default = "default_connection_timeout")]
    pub connection_timeout: Duration,
}

fn default_replication_factor() -> u32 {
    1
}

fn default_connection_timeout() -> Duration {
    Duration::from_secs(10)
}

impl Default for DbConfig {
    fn default() -> Self {
        Self {
            hosts: vec!["127.0.0.1:9042".to_string()],
            keyspace: "rescue_fleet".to_string(),
            replication_factor: default_replication_factor(),
            connection_timeout: default_connection_timeout(),
        }
    }
}

impl DbConfig {
    /// Build from a comma separated host list
    pub fn new(hosts: &str, keyspace: impl Into<String>) -> Self {
        Self {
            hosts: hosts
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
            keyspace: keyspace.into(),
            ..Default::default()
        }
    }
}

/// A stored document: its id plus a JSON object body.
///
/// On the wire the body fields sit next to `id`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Document {
    pub id: String,
    #[serde(flatten)]
    pub data: Map<String, Value>,
}

impl Document {
    pub fn new(id: impl Into<String>, data: Map<String, Value>) -> Self {
        Self {
            id: id.into(),
            data,
        }
    }

    /// Document from any JSON object value
    pub fn from_value(id: impl Into<String>, value: Value) -> DbResult<Self> {
        match value {
            Value::Object(data) => Ok(Self::new(id, data)),
            other => Err(DbError::Serialization(format!(
                "document body must be a JSON object, got {}",
                other
            ))),
        }
    }

    /// Field lookup. Dotted paths descend into nested objects.
    pub fn field(&self, path: &str) -> Option<&Value> {
        let mut parts = path.split('.');
        let first = parts.next()?;
        let mut current = self.data.get(first)?;
        for part in parts {
            current = current.as_object()?.get(part)?;
        }
        Some(current)
    }
}

/// Read access to named document collections
#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Single document, or `None` if absent
    async fn get_document(&self, collection: &str, id: &str) -> DbResult<Option<Document>>;

    /// Every document in a collection, ordered by id
    async fn get_collection(&self, collection: &str) -> DbResult<Vec<Document>>;

    /// Documents matching every constraint
    async fn get_collection_with_query(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> DbResult<Vec<Document>>;

    /// Insert or replace a document
    async fn put_document(&self, collection: &str, document: Document) -> DbResult<()>;

    async fn health_check(&self) -> DbResult<bool>;

    /// Short backend name for status reporting
    fn backend(&self) -> &'static str;
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_db_config() {
        let config = DbConfig::default();
        assert_eq!(config.hosts.len(), 1);
        assert_eq!(config.keyspace, "rescue_fleet");

        let config = DbConfig::new("node1:9042, node2:9042,", "fleet");
        assert_eq!(config.hosts, vec!["node1:9042", "node2:9042"]);
    }

    #[test]
    fn test_document_wire_shape() {
        let doc = Document::from_value("user-1", json!({"age": 30, "city": "London"})).unwrap();
        let json = serde_json::to_value(&doc).unwrap();

        assert_eq!(json, json!({"id": "user-1", "age": 30, "city": "London"}));
        assert!(Document::from_value("x", json!([1, 2])).is_err());
    }

    #[test]
    fn test_nested_field_lookup() {
        let doc = Document::from_value("d", json!({"location": {"sector": "A4"}})).unwrap();
        assert_eq!(doc.field("location.sector"), Some(&json!("A4")));
        assert_eq!(doc.field("location.missing"), None);
    }
}
