use std::cmp::Ordering;
use std::collections::HashSet;

use dimse::dataset::tag_key;
use dimse::{DataSet, Request};
use serde_json::Value as JsonValue;

use crate::archive::Archive;
use crate::backend::filter::value_at;
use crate::backend::{Document, Filter};
use crate::error::{ArchiveError, Result};
use crate::query::HIERARCHY;

/// Check the ACL, then return the caller's constraint for `service`
pub(crate) async fn authorize(
    archive: &Archive,
    principal: &str,
    service: &str,
) -> Result<Option<Filter>> {
    if !archive.acl().is_allowed(principal, service).await? {
        return Err(ArchiveError::not_authorized(format!(
            "User \"{}\" is not allowed to {}",
            principal, service
        )));
    }
    archive.acl().get_constraints(principal, service).await
}

/// The identifier of a C-FIND, C-GET or C-MOVE request
pub(crate) fn identifier(request: &Request) -> Result<&DataSet> {
    request
        .data_set
        .as_ref()
        .ok_or_else(|| ArchiveError::CannotUnderstand("Request has no identifier".into()))
}

/// Materialized results and the iteration position over them
#[derive(Debug, Default)]
pub(crate) struct Cursor {
    records: Vec<Document>,
    position: usize,
    current: Option<DataSet>,
}

impl Cursor {
    pub fn new(records: Vec<Document>) -> Self {
        Self {
            records,
            position: 0,
            current: None,
        }
    }

    pub fn done(&self) -> bool {
        self.position >= self.records.len()
    }

    pub fn next(&mut self) {
        if !self.done() {
            self.position += 1;
        }
        self.current = None;
    }

    pub fn count(&self) -> usize {
        self.records.len()
    }

    pub fn records(&self) -> &[Document] {
        &self.records
    }

    pub fn record(&self) -> Result<&Document> {
        self.records
            .get(self.position)
            .ok_or_else(|| ArchiveError::processing_failure("No more results"))
    }

    pub fn cached(&self) -> Option<&DataSet> {
        self.current.as_ref()
    }

    pub fn cache(&mut self, data_set: DataSet) -> DataSet {
        self.current = Some(data_set.clone());
        data_set
    }
}

/// First value of a string element of a record
pub(crate) fn first_string<'a>(record: &'a Document, key: &str) -> Option<&'a str> {
    value_at(record, &format!("{}.Value", key))
        .and_then(JsonValue::as_array)
        .and_then(|values| values.first())
        .and_then(JsonValue::as_str)
}

/// Order records from patient down to instance; missing keys sort first
pub(crate) fn sort_by_hierarchy(records: &mut [Document]) {
    let keys: Vec<String> = HIERARCHY.iter().map(|tag| tag_key(*tag)).collect();
    records.sort_by(|a, b| {
        keys.iter()
            .map(|key| first_string(a, key).cmp(&first_string(b, key)))
            .find(|ordering| *ordering != Ordering::Equal)
            .unwrap_or(Ordering::Equal)
    });
}

/// Drop records whose projected fields repeat an earlier record
pub(crate) fn distinct(records: Vec<Document>) -> Vec<Document> {
    let mut seen = HashSet::new();
    records
        .into_iter()
        .filter(|record| {
            let mut key = record.clone();
            key.remove("_id");
            seen.insert(JsonValue::Object(key).to_string())
        })
        .collect()
}

/// Metadata record back to a data set
pub(crate) fn record_to_data_set(record: &Document) -> Result<DataSet> {
    let mut object = record.clone();
    object.remove("_id");
    object.remove("Content");
    Ok(DataSet::from_json(&JsonValue::Object(object))?)
}
