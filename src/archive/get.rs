//! C-GET results: the full instances matching an identifier

use async_trait::async_trait;
use dimse::dataset::tag_key;
use dimse::{tags, DataSet, Request};

use crate::acl::services;
use crate::archive::helper::{self, Cursor};
use crate::archive::{Archive, DataSetGenerator};
use crate::error::{ArchiveError, Result};
use crate::query::{self, HIERARCHY};

pub struct GetGenerator {
    archive: Archive,
    principal: String,
    cursor: Cursor,
}

impl GetGenerator {
    pub fn new(archive: Archive, principal: impl Into<String>) -> Self {
        Self {
            archive,
            principal: principal.into(),
            cursor: Cursor::default(),
        }
    }

    pub fn archive(&self) -> &Archive {
        &self.archive
    }

    /// Distinct SOP classes of the matched instances, in result order
    pub fn sop_classes(&self) -> Vec<String> {
        let key = tag_key(tags::SOP_CLASS_UID);
        let mut classes: Vec<String> = Vec::new();
        for record in self.cursor.records() {
            if let Some(class) = helper::first_string(record, &key) {
                if !classes.iter().any(|c| c == class) {
                    classes.push(class.to_string());
                }
            }
        }
        classes
    }
}

#[async_trait]
impl DataSetGenerator for GetGenerator {
    async fn initialize(&mut self, request: &Request) -> Result<()> {
        let constraint =
            helper::authorize(&self.archive, &self.principal, services::RETRIEVE).await?;
        let plan = query::translate(helper::identifier(request)?, constraint.as_ref())?;

        // Content is fetched per instance; only identity fields are needed here
        let projection: Vec<String> = HIERARCHY
            .iter()
            .copied()
            .chain([tags::SOP_CLASS_UID])
            .map(tag_key)
            .collect();

        let mut records = self
            .archive
            .document_store()
            .find(
                &self.archive.storage().namespace(),
                &plan.filter,
                Some(&projection[..]),
            )
            .await?;
        helper::sort_by_hierarchy(&mut records);

        tracing::debug!("📦 {} retrieve matched {} instances", plan.level, records.len());

        self.cursor = Cursor::new(records);
        Ok(())
    }

    fn done(&self) -> bool {
        self.cursor.done()
    }

    fn next(&mut self) {
        self.cursor.next();
    }

    async fn get(&mut self) -> Result<DataSet> {
        if let Some(data_set) = self.cursor.cached() {
            return Ok(data_set.clone());
        }
        let record = self.cursor.record()?;
        let uid = helper::first_string(record, &tag_key(tags::SOP_INSTANCE_UID))
            .ok_or_else(|| ArchiveError::processing_failure("Record has no SOP Instance UID"))?
            .to_string();
        let data_set = self.archive.storage().retrieve(&uid).await?;
        Ok(self.cursor.cache(data_set))
    }

    fn count(&self) -> usize {
        self.cursor.count()
    }
}
