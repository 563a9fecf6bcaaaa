//! ScyllaDB-backed document store
//!
//! Documents live in one table keyed by `(collection, id)` with the body
//! stored as JSON text. Query constraints are evaluated client-side over the
//! collection's partition.

use async_trait::async_trait;
use scylla::{Session, SessionBuilder};
use std::sync::Arc;
use tracing::{info, warn};

use crate::query::{self, QueryConstraint};
use crate::{migrations, DbConfig, DbError, DbResult, Document, DocumentStore};

const SELECT_ONE: &str = "SELECT id, body FROM documents WHERE collection = ? AND id = ?";
const SELECT_COLLECTION: &str = "SELECT id, body FROM documents WHERE collection = ?";
const UPSERT: &str = "INSERT INTO documents (collection, id, body) VALUES (?, ?, ?)";

#[derive(Clone)]
pub struct ScyllaDocumentStore {
    session: Arc<Session>,
    config: DbConfig,
}

impl ScyllaDocumentStore {
    /// Connect, run migrations and switch to the configured keyspace
    pub async fn connect(config: DbConfig) -> DbResult<Self> {
        info!("Connecting to ScyllaDB cluster: {:?}", config.hosts);

        let session = SessionBuilder::new()
            .known_nodes(&config.hosts)
            .connection_timeout(config.connection_timeout)
            .build()
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        migrations::run_all(&session, &config).await?;

        session
            .use_keyspace(&config.keyspace, false)
            .await
            .map_err(|e| DbError::Connection(e.to_string()))?;

        info!("Connected to ScyllaDB keyspace {}", config.keyspace);

        Ok(Self {
            session: Arc::new(session),
            config,
        })
    }

    pub fn config(&self) -> &DbConfig {
        &self.config
    }

    async fn fetch(&self, collection: &str) -> DbResult<Vec<Document>> {
        let result = self
            .session
            .query_unpaged(SELECT_COLLECTION, (collection,))
            .await
            .map_err(|e| DbError::query(e.to_string()))?;

        let rows = result
            .into_rows_result()
            .map_err(|e| DbError::query(e.to_string()))?;

        let mut documents = Vec::new();
        for row in rows
            .rows::<(String, String)>()
            .map_err(|e| DbError::query(e.to_string()))?
        {
            let (id, body) = row.map_err(|e| DbError::query(e.to_string()))?;
            documents.push(decode(id, &body)?);
        }

        documents.sort_by(|a, b| a.id.cmp(&b.id));
        Ok(documents)
    }
}

fn decode(id: String, body: &str) -> DbResult<Document> {
    let value: serde_json::Value = serde_json::from_str(body)?;
    Document::from_value(id, value)
}

#[async_trait]
impl DocumentStore for ScyllaDocumentStore {
    async fn get_document(&self, collection: &str, id: &str) -> DbResult<Option<Document>> {
        let result = self
            .session
            .query_unpaged(SELECT_ONE, (collection, id))
            .await
            .map_err(|e| DbError::query(e.to_string()))?;

        let rows = result
            .into_rows_result()
            .map_err(|e| DbError::query(e.to_string()))?;

        match rows
            .maybe_first_row::<(String, String)>()
            .map_err(|e| DbError::query(e.to_string()))?
        {
            Some((id, body)) => Ok(Some(decode(id, &body)?)),
            None => Ok(None),
        }
    }

    async fn get_collection(&self, collection: &str) -> DbResult<Vec<Document>> {
        self.fetch(collection).await
    }

    async fn get_collection_with_query(
        &self,
        collection: &str,
        constraints: &[QueryConstraint],
    ) -> DbResult<Vec<Document>> {
        query::validate(constraints)?;
        let documents = self.fetch(collection).await?;
        Ok(query::apply(documents, constraints))
    }

    async fn put_document(&self, collection: &str, document: Document) -> DbResult<()> {
        let body = serde_json::to_string(&document.data)?;

        self.session
            .query_unpaged(UPSERT, (collection, document.id.as_str(), body.as_str()))
            .await
            .map_err(|e| DbError::query(e.to_string()))?;

        Ok(())
    }

    async fn health_check(&self) -> DbResult<bool> {
        let result = self
            .session
            .query_unpaged("SELECT now() FROM system.local", &[])
            .await;

        match result {
            Ok(_) => Ok(true),
            Err(e) => {
                warn!("Database health check failed: {}", e);
                Ok(false)
            }
        }
    }

    fn backend(&self) -> &'static str {
        "scylla"
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_body() {
        let doc = decode("r1".into(), r#"{"reporter":"Medical Team"}"#).unwrap();
        assert_eq!(doc.id, "r1");
        assert_eq!(doc.data["reporter"], "Medical Team");

        assert!(matches!(
            decode("bad".into(), "not json"),
            Err(DbError::Serialization(_))
        ));
        assert!(decode("arr".into(), "[1]").is_err());
    }
}
