//! C-FIND results

use async_trait::async_trait;
use dicom_core::VR;
use dimse::{tags, DataSet, Element, Request};

use crate::acl::services;
use crate::archive::helper::{self, Cursor};
use crate::archive::{Archive, DataSetGenerator};
use crate::backend::Filter;
use crate::error::Result;
use crate::query::{self, derived, QueryPlan};

/// Matches of a C-FIND identifier, one data set per distinct projection
pub struct FindGenerator {
    archive: Archive,
    principal: String,
    constraint: Option<Filter>,
    plan: Option<QueryPlan>,
    cursor: Cursor,
}

impl FindGenerator {
    pub fn new(archive: Archive, principal: impl Into<String>) -> Self {
        Self {
            archive,
            principal: principal.into(),
            constraint: None,
            plan: None,
            cursor: Cursor::default(),
        }
    }

    async fn build(&self, plan: &QueryPlan) -> Result<DataSet> {
        let record = self.cursor.record()?;
        let mut data_set = helper::record_to_data_set(record)?;

        let namespace = self.archive.storage().namespace();
        for tag in &plan.derived {
            if let Some(attribute) = derived::lookup(*tag) {
                let element = attribute
                    .compute(
                        self.archive.document_store(),
                        &namespace,
                        &data_set,
                        self.constraint.as_ref(),
                    )
                    .await?;
                data_set.add(*tag, element);
            }
        }

        data_set.add(
            tags::SPECIFIC_CHARACTER_SET,
            Element::strings(VR::CS, ["ISO_IR 192"]),
        );
        data_set.add(
            tags::QUERY_RETRIEVE_LEVEL,
            Element::strings(VR::CS, [plan.level.to_string()]),
        );
        data_set.add(
            tags::INSTANCE_AVAILABILITY,
            Element::strings(VR::CS, ["ONLINE"]),
        );
        Ok(data_set)
    }
}

#[async_trait]
impl DataSetGenerator for FindGenerator {
    async fn initialize(&mut self, request: &Request) -> Result<()> {
        let constraint =
            helper::authorize(&self.archive, &self.principal, services::QUERY).await?;
        let plan = query::translate(helper::identifier(request)?, constraint.as_ref())?;

        let records = self
            .archive
            .document_store()
            .find(
                &self.archive.storage().namespace(),
                &plan.filter,
                Some(&plan.projection[..]),
            )
            .await?;
        let mut records = helper::distinct(records);
        helper::sort_by_hierarchy(&mut records);

        tracing::debug!("🔎 {} query matched {} records", plan.level, records.len());

        self.cursor = Cursor::new(records);
        self.constraint = constraint;
        self.plan = Some(plan);
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
        let plan = self
            .plan
            .as_ref()
            .ok_or_else(|| crate::error::ArchiveError::processing_failure("Not initialized"))?;
        let data_set = self.build(plan).await?;
        Ok(self.cursor.cache(data_set))
    }

    fn count(&self) -> usize {
        self.cursor.count()
    }
}
