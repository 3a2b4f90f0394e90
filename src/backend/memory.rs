use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use super::filter::{project, Filter};
use super::{ensure_id, BackendResult, Document, DocumentStore};

/// Document store kept in process memory
#[derive(Debug, Default)]
pub struct MemoryStore {
    namespaces: RwLock<HashMap<String, Vec<Document>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl DocumentStore for MemoryStore {
    async fn insert(&self, namespace: &str, mut document: Document) -> BackendResult<String> {
        let id = ensure_id(&mut document);
        self.namespaces
            .write()
            .await
            .entry(namespace.to_string())
            .or_default()
            .push(document);
        Ok(id)
    }

    async fn find(
        &self,
        namespace: &str,
        filter: &Filter,
        projection: Option<&[String]>,
    ) -> BackendResult<Vec<Document>> {
        let namespaces = self.namespaces.read().await;
        let Some(documents) = namespaces.get(namespace) else {
            return Ok(Vec::new());
        };
        Ok(documents
            .iter()
            .filter(|d| filter.matches(d))
            .map(|d| match projection {
                Some(fields) => project(d, fields),
                None => d.clone(),
            })
            .collect())
    }

    async fn update_fields(
        &self,
        namespace: &str,
        filter: &Filter,
        fields: Document,
    ) -> BackendResult<u64> {
        let mut namespaces = self.namespaces.write().await;
        let Some(documents) = namespaces.get_mut(namespace) else {
            return Ok(0);
        };
        let mut updated = 0;
        for document in documents.iter_mut().filter(|d| filter.matches(d)) {
            for (key, value) in &fields {
                document.insert(key.clone(), value.clone());
            }
            updated += 1;
        }
        Ok(updated)
    }

    async fn remove(&self, namespace: &str, filter: &Filter) -> BackendResult<u64> {
        let mut namespaces = self.namespaces.write().await;
        let Some(documents) = namespaces.get_mut(namespace) else {
            return Ok(0);
        };
        let before = documents.len();
        documents.retain(|d| !filter.matches(d));
        Ok((before - documents.len()) as u64)
    }

    async fn ping(&self) -> BackendResult<()> {
        Ok(())
    }
}
