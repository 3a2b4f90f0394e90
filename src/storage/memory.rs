use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::backend::BackendResult;
use crate::storage::BlobStore;

/// Blob tier kept in process memory
#[derive(Debug, Default)]
pub struct MemoryBlobStore {
    objects: RwLock<HashMap<(String, String), Vec<u8>>>,
}

impl MemoryBlobStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Number of objects in `bucket`
    pub async fn len(&self, bucket: &str) -> usize {
        self.objects
            .read()
            .await
            .keys()
            .filter(|(b, _)| b == bucket)
            .count()
    }
}

#[async_trait]
impl BlobStore for MemoryBlobStore {
    async fn put(&self, bucket: &str, _filename: &str, content: &[u8]) -> BackendResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        self.objects
            .write()
            .await
            .insert((bucket.to_string(), id.clone()), content.to_vec());
        Ok(id)
    }

    async fn get(&self, bucket: &str, id: &str) -> BackendResult<Option<Vec<u8>>> {
        Ok(self
            .objects
            .read()
            .await
            .get(&(bucket.to_string(), id.to_string()))
            .cloned())
    }

    async fn remove(&self, bucket: &str, id: &str) -> BackendResult<bool> {
        Ok(self
            .objects
            .write()
            .await
            .remove(&(bucket.to_string(), id.to_string()))
            .is_some())
    }
}
