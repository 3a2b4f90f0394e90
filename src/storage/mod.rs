//! Blob tier: large opaque objects grouped in named buckets

use async_trait::async_trait;
use std::path::Path;
use std::sync::Arc;

use crate::backend::{BackendError, BackendResult};

pub mod filesystem;
pub mod memory;

pub use filesystem::FilesystemBlobStore;
pub use memory::MemoryBlobStore;

/// Storage for content too large for a document
///
/// `put` returns the object id under which `get` finds the bytes again. The
/// file name is informative only; several objects may share one.
#[async_trait]
pub trait BlobStore: Send + Sync + std::fmt::Debug {
    /// Store `content` in `bucket`, returning its object id
    async fn put(&self, bucket: &str, filename: &str, content: &[u8]) -> BackendResult<String>;

    /// Read an object; `None` if the bucket has no such id
    async fn get(&self, bucket: &str, id: &str) -> BackendResult<Option<Vec<u8>>>;

    /// Delete an object; returns whether it existed
    async fn remove(&self, bucket: &str, id: &str) -> BackendResult<bool>;
}

/// Create the blob tier: a directory tree when `root` is given, memory otherwise
pub fn create_blob_store(root: Option<&Path>) -> BackendResult<Arc<dyn BlobStore>> {
    match root {
        Some(root) => Ok(Arc::new(FilesystemBlobStore::new(root)?)),
        None => Ok(Arc::new(MemoryBlobStore::new())),
    }
}

/// Bucket names and ids become path components, so they must be plain names
pub(crate) fn check_component(kind: &str, value: &str) -> BackendResult<()> {
    let valid = !value.is_empty()
        && value != "."
        && value != ".."
        && !value.contains(['/', '\\'])
        && !value.contains('\0');
    if valid {
        Ok(())
    } else {
        Err(BackendError::Path(format!("invalid {} '{}'", kind, value)))
    }
}
