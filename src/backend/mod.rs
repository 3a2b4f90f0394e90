//! Document backend: namespaced collections of JSON documents

use std::path::Path;
use std::sync::Arc;

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use serde_json::{json, Map, Value as JsonValue};
use thiserror::Error;

pub mod filter;
pub mod database_manager;
pub mod memory;
pub mod redb_store;

pub use filter::{Filter, Pattern};
pub use memory::MemoryStore;
pub use redb_store::RedbStore;

/// A stored document; `_id` holds its identifier
pub type Document = Map<String, JsonValue>;

/// Error type for backend operations
#[derive(Debug, Error)]
pub enum BackendError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    #[error("Invalid filter: {0}")]
    InvalidFilter(String),

    #[error("Path error: {0}")]
    Path(String),

    #[error("Configuration error: {0}")]
    Config(String),
}

pub type BackendResult<T> = Result<T, BackendError>;

/// Namespaced document collections
///
/// Namespaces are `<database>.<collection>` strings; a namespace exists as
/// soon as a document is inserted into it.
#[async_trait]
pub trait DocumentStore: Send + Sync + std::fmt::Debug {
    /// Insert a document, assigning `_id` when missing; returns the id
    async fn insert(&self, namespace: &str, document: Document) -> BackendResult<String>;

    /// Documents matching `filter` in insertion order, optionally projected
    async fn find(
        &self,
        namespace: &str,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> BackendResult<Vec<Document>>;

    /// Set top-level fields on every matching document; returns the match count
    async fn update_fields(
        &self,
        namespace: &str,
        filter: &Filter,
        fields: Document,
    ) -> BackendResult<u64>;

    /// Remove every matching document; returns the removed count
    async fn remove(&self, namespace: &str, filter: &Filter) -> BackendResult<u64>;

    /// Check that the backend is reachable
    async fn ping(&self) -> BackendResult<()>;

    async fn find_one(&self, namespace: &str, filter: &Filter) -> BackendResult<Option<Document>> {
        Ok(self.find(namespace, filter, None).await?.into_iter().next())
    }

    async fn count(&self, namespace: &str, filter: &Filter) -> BackendResult<u64> {
        Ok(self.find(namespace, filter, None).await?.len() as u64)
    }
}

/// Build the configured document store: `redb` when a path is given, memory otherwise
pub fn create_document_store(path: Option<&Path>) -> BackendResult<Arc<dyn DocumentStore>> {
    match path {
        Some(path) => Ok(Arc::new(RedbStore::open(path)?)),
        None => {
            tracing::warn!("No database path configured, documents are kept in memory");
            Ok(Arc::new(MemoryStore::new()))
        }
    }
}

/// Document id, or a fresh one when the document has none
pub(crate) fn ensure_id(document: &mut Document) -> String {
    match document.get("_id").and_then(JsonValue::as_str) {
        Some(id) => id.to_string(),
        None => {
            let id = uuid::Uuid::new_v4().to_string();
            document.insert("_id".to_string(), JsonValue::String(id.clone()));
            id
        }
    }
}

/// Binary field representation: `{"$binary": "<base64>"}`
pub fn binary_value(bytes: &[u8]) -> JsonValue {
    json!({ "$binary": STANDARD.encode(bytes) })
}

/// Decode a binary field; `None` if the value is not one
pub fn as_binary(value: &JsonValue) -> Option<Vec<u8>> {
    let encoded = value.as_object()?.get("$binary")?.as_str()?;
    STANDARD.decode(encoded).ok()
}
