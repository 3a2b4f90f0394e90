//! Query translation: from a data-set-shaped query to a backend filter and
//! projection

use dicom_core::Tag;
use dimse::dataset::tag_key;
use dimse::{tags, DataSet, QueryLevel};

use crate::backend::Filter;
use crate::error::{ArchiveError, Result};

pub mod derived;
pub mod match_type;

pub use match_type::{match_type, MatchType};

/// Keys ordering results, from patient down to instance
pub const HIERARCHY: [Tag; 4] = [
    tags::PATIENT_ID,
    tags::STUDY_INSTANCE_UID,
    tags::SERIES_INSTANCE_UID,
    tags::SOP_INSTANCE_UID,
];

/// Elements of a query that never become filter terms
const NOT_MATCHED: [Tag; 3] = [
    tags::SPECIFIC_CHARACTER_SET,
    tags::QUERY_RETRIEVE_LEVEL,
    tags::INSTANCE_AVAILABILITY,
];

/// Compiled form of one query
#[derive(Debug, Clone, PartialEq)]
pub struct QueryPlan {
    pub filter: Filter,
    /// Top-level fields returned for each record
    pub projection: Vec<String>,
    /// Derived attributes requested by the query, computed per result
    pub derived: Vec<Tag>,
    pub level: QueryLevel,
}

/// The Query/Retrieve Level of a query
pub fn query_level(query: &DataSet) -> Result<QueryLevel> {
    let level = query
        .as_string(tags::QUERY_RETRIEVE_LEVEL, 0)
        .filter(|level| !level.trim().is_empty())
        .ok_or_else(|| ArchiveError::MissingAttribute("Missing Query/Retrieve Level".into()))?;
    level
        .parse()
        .map_err(|_| ArchiveError::CannotUnderstand(format!("Invalid Query/Retrieve Level: {}", level)))
}

/// Build the filter and projection for `query`, restricted by `constraint`
pub fn translate(query: &DataSet, constraint: Option<&Filter>) -> Result<QueryPlan> {
    let level = query_level(query)?;

    let mut terms = Vec::new();
    let mut projection = Vec::new();
    let mut derived = Vec::new();

    for (tag, element) in query.iter() {
        if NOT_MATCHED.contains(tag) {
            continue;
        }
        if derived::is_derived(*tag) {
            derived.push(*tag);
            continue;
        }
        if let Some(term) = match_type::term(*tag, element)? {
            terms.push(term);
        }
        projection.push(tag_key(*tag));
    }

    for tag in mandatory_fields(level) {
        let key = tag_key(*tag);
        if !projection.contains(&key) {
            projection.push(key);
        }
    }

    let mut condition = Vec::new();
    if !terms.is_empty() {
        condition.push(Filter::And(terms));
    }
    if let Some(constraint) = constraint {
        condition.push(constraint.clone());
    }
    let filter = Filter::and(condition);

    tracing::debug!(
        "🔎 {} query: filter {:?}, projection {:?}",
        level,
        filter,
        projection
    );

    Ok(QueryPlan {
        filter,
        projection,
        derived,
        level,
    })
}

/// Hierarchy keys always returned at `level`
pub fn mandatory_fields(level: QueryLevel) -> &'static [Tag] {
    match level {
        QueryLevel::Patient => &HIERARCHY[..1],
        QueryLevel::Study => &HIERARCHY[..2],
        QueryLevel::Series => &HIERARCHY[..3],
        QueryLevel::Image => &HIERARCHY[..],
    }
}
