//! Tiered data set storage
//!
//! Every stored instance gets a metadata record in `<db>.datasets`: its DICOM
//! JSON form without private, group length and binary elements. The full
//! content goes to one of three places:
//!
//! - inline, as a binary `Content` field of the record, when no bulk
//!   database is configured and the content fits under the limit;
//! - the blob tier, when the content is larger than the limit; the record
//!   holds the object id;
//! - a `{SOPInstanceUID, Content}` document in `<bulk>.datasets`, otherwise;
//!   the record holds that document's id.

use std::sync::Arc;

use dimse::dataset::is_binary;
use dimse::dataset::tag_key;
use dimse::{tags, DataSet};
use serde_json::Value as JsonValue;

use crate::backend::{as_binary, binary_value, Document, DocumentStore, Filter};
use crate::config::DEFAULT_GRIDFS_LIMIT;
use crate::error::{ArchiveError, Result};
use crate::storage::BlobStore;

const CONTENT: &str = "Content";
const BULK_UID: &str = "SOPInstanceUID";

#[derive(Debug, Clone)]
pub struct Storage {
    store: Arc<dyn DocumentStore>,
    blobs: Arc<dyn BlobStore>,
    database: String,
    bulk_database: Option<String>,
    gridfs_limit: u64,
}

impl Storage {
    pub fn new(
        store: Arc<dyn DocumentStore>,
        blobs: Arc<dyn BlobStore>,
        database: impl Into<String>,
        bulk_database: Option<&str>,
    ) -> Self {
        Self {
            store,
            blobs,
            database: database.into(),
            bulk_database: bulk_database
                .filter(|name| !name.is_empty())
                .map(str::to_string),
            gridfs_limit: DEFAULT_GRIDFS_LIMIT,
        }
    }

    /// Content size above which instances go to the blob tier
    pub fn with_gridfs_limit(mut self, limit: u64) -> Self {
        self.gridfs_limit = limit;
        self
    }

    pub fn gridfs_limit(&self) -> u64 {
        self.gridfs_limit
    }

    pub fn database(&self) -> &str {
        &self.database
    }

    pub fn bulk_database(&self) -> Option<&str> {
        self.bulk_database.as_deref()
    }

    /// Namespace of the metadata records
    pub fn namespace(&self) -> String {
        format!("{}.datasets", self.database)
    }

    fn bulk_namespace(&self) -> Option<String> {
        self.bulk_database
            .as_ref()
            .map(|bulk| format!("{}.datasets", bulk))
    }

    pub fn document_store(&self) -> &Arc<dyn DocumentStore> {
        &self.store
    }

    /// Whether a record exists for this SOP Instance UID
    pub async fn exists(&self, sop_instance_uid: &str) -> Result<bool> {
        let found = self
            .store
            .find_one(&self.namespace(), &record_filter(sop_instance_uid))
            .await?;
        Ok(found.is_some())
    }

    /// Store a data set; it must carry a SOPInstanceUID
    pub async fn store(&self, data_set: &DataSet) -> Result<()> {
        let sop_instance_uid = data_set
            .as_string(tags::SOP_INSTANCE_UID, 0)
            .filter(|uid| !uid.is_empty())
            .ok_or_else(|| ArchiveError::MissingAttribute("SOP Instance UID".into()))?
            .to_string();

        let content = data_set.to_bytes()?;
        let namespace = self.namespace();

        self.store.insert(&namespace, metadata(data_set)).await?;

        if let Err(e) = self.store_content(&sop_instance_uid, &content).await {
            tracing::error!("Could not store content of {}: {}", sop_instance_uid, e);
            if let Err(rollback) = self
                .store
                .remove(&namespace, &record_filter(&sop_instance_uid))
                .await
            {
                tracing::warn!("Could not roll back record of {}: {}", sop_instance_uid, rollback);
            }
            return Err(ArchiveError::processing_failure(format!(
                "Could not store: {}",
                e
            )));
        }

        tracing::debug!(
            "💾 Stored {} ({} bytes) in {}",
            sop_instance_uid,
            content.len(),
            namespace
        );
        Ok(())
    }

    async fn store_content(&self, sop_instance_uid: &str, content: &[u8]) -> Result<()> {
        let reference = if content.len() as u64 > self.gridfs_limit {
            let bucket = self.bulk_database.as_deref().unwrap_or(&self.database);
            let id = self.blobs.put(bucket, sop_instance_uid, content).await?;
            JsonValue::String(id)
        } else if let Some(bulk_namespace) = self.bulk_namespace() {
            let mut bulk = Document::new();
            bulk.insert(BULK_UID.into(), sop_instance_uid.into());
            bulk.insert(CONTENT.into(), binary_value(content));
            let id = self.store.insert(&bulk_namespace, bulk).await?;
            JsonValue::String(id)
        } else {
            binary_value(content)
        };

        let mut fields = Document::new();
        fields.insert(CONTENT.into(), reference);
        self.store
            .update_fields(&self.namespace(), &record_filter(sop_instance_uid), fields)
            .await?;
        Ok(())
    }

    /// Full data set stored under `sop_instance_uid`
    pub async fn retrieve(&self, sop_instance_uid: &str) -> Result<DataSet> {
        let projection = [CONTENT.to_string()];
        let record = self
            .store
            .find(
                &self.namespace(),
                &record_filter(sop_instance_uid),
                Some(&projection[..]),
            )
            .await?
            .into_iter()
            .next()
            .ok_or_else(|| {
                ArchiveError::not_found(format!("No such data set: {}", sop_instance_uid))
            })?;

        let content = match record.get(CONTENT) {
            Some(JsonValue::String(id)) => self.referenced_content(sop_instance_uid, id).await?,
            Some(value) => as_binary(value).ok_or_else(|| {
                ArchiveError::processing_failure(format!(
                    "Unknown Content type for {}",
                    sop_instance_uid
                ))
            })?,
            None => {
                return Err(ArchiveError::processing_failure(format!(
                    "No content stored for {}",
                    sop_instance_uid
                )))
            }
        };

        Ok(DataSet::from_bytes(&content)?)
    }

    async fn referenced_content(&self, sop_instance_uid: &str, id: &str) -> Result<Vec<u8>> {
        if let Some(content) = self.blobs.get(&self.database, id).await? {
            return Ok(content);
        }
        if let Some(bulk) = &self.bulk_database {
            if let Some(content) = self.blobs.get(bulk, id).await? {
                return Ok(content);
            }
        }

        let missing = || {
            ArchiveError::not_found(format!(
                "No such data set in bulk data: {}",
                sop_instance_uid
            ))
        };
        let bulk_namespace = self.bulk_namespace().ok_or_else(missing)?;
        let document = self
            .store
            .find_one(&bulk_namespace, &Filter::eq(BULK_UID, sop_instance_uid))
            .await?
            .ok_or_else(missing)?;
        document.get(CONTENT).and_then(as_binary).ok_or_else(missing)
    }
}

/// Filter selecting the record of one instance
pub fn record_filter(sop_instance_uid: &str) -> Filter {
    Filter::eq(
        format!("{}.Value", tag_key(tags::SOP_INSTANCE_UID)),
        sop_instance_uid,
    )
}

/// Queryable part of a data set: no private, group length or binary elements
pub fn metadata(data_set: &DataSet) -> Document {
    let kept: DataSet = data_set
        .iter()
        .filter(|(tag, element)| {
            tag.group() % 2 == 0 && tag.element() != 0 && !is_binary(element.vr)
        })
        .map(|(tag, element)| (*tag, element.clone()))
        .collect();
    match kept.to_json() {
        JsonValue::Object(document) => document,
        _ => Document::new(),
    }
}
