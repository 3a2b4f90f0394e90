use crate::backend::{BackendError, BackendResult};
use crate::storage::{check_component, BlobStore};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// Blob tier backed by the local filesystem
///
/// Objects live at `<root>/<bucket>/<id>`.
#[derive(Debug, Clone)]
pub struct FilesystemBlobStore {
    root_path: PathBuf,
}

impl FilesystemBlobStore {
    /// Create the store, creating the root directory if needed
    pub fn new<P: AsRef<Path>>(root_path: P) -> BackendResult<Self> {
        let root_path = root_path.as_ref().to_path_buf();

        if !root_path.exists() {
            std::fs::create_dir_all(&root_path).map_err(|e| {
                BackendError::Config(format!(
                    "Failed to create blob root directory '{}': {}",
                    root_path.display(),
                    e
                ))
            })?;
        }

        // Not canonicalized: callers compare against the path they supplied
        Ok(Self { root_path })
    }

    pub fn base_path(&self) -> &Path {
        &self.root_path
    }

    fn object_path(&self, bucket: &str, id: &str) -> BackendResult<PathBuf> {
        check_component("bucket", bucket)?;
        check_component("id", id)?;
        Ok(self.root_path.join(bucket).join(id))
    }
}

#[async_trait]
impl BlobStore for FilesystemBlobStore {
    async fn put(&self, bucket: &str, filename: &str, content: &[u8]) -> BackendResult<String> {
        let id = uuid::Uuid::new_v4().to_string();
        let path = self.object_path(bucket, &id)?;

        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent).await?;
        }
        tokio::fs::write(&path, content).await?;

        tracing::debug!(
            "💾 Stored blob {} ({} bytes) for {} in bucket {}",
            id,
            content.len(),
            filename,
            bucket
        );
        Ok(id)
    }

    async fn get(&self, bucket: &str, id: &str) -> BackendResult<Option<Vec<u8>>> {
        let path = self.object_path(bucket, id)?;
        match tokio::fs::read(&path).await {
            Ok(content) => Ok(Some(content)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e.into()),
        }
    }

    async fn remove(&self, bucket: &str, id: &str) -> BackendResult<bool> {
        let path = self.object_path(bucket, id)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(true),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(false),
            Err(e) => Err(e.into()),
        }
    }
}
