//! Derived attributes (PS3.4 C.3.4): counts and value lists computed from
//! the records below a result in the hierarchy

use std::collections::BTreeSet;

use dicom_core::{Tag, VR};
use dimse::dataset::tag_key;
use dimse::{tags, DataSet, Element};
use serde_json::Value as JsonValue;

use crate::backend::{filter::value_at, DocumentStore, Filter};
use crate::error::Result;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregate {
    /// Number of distinct secondary values
    Count,
    /// The distinct secondary values themselves
    Values,
}

#[derive(Debug, Clone, Copy)]
pub struct DerivedAttribute {
    pub tag: Tag,
    pub vr: VR,
    primary: Tag,
    secondary: Tag,
    aggregate: Aggregate,
}

const fn attribute(tag: Tag, vr: VR, primary: Tag, secondary: Tag, aggregate: Aggregate) -> DerivedAttribute {
    DerivedAttribute {
        tag,
        vr,
        primary,
        secondary,
        aggregate,
    }
}

pub const DERIVED_ATTRIBUTES: [DerivedAttribute; 8] = [
    attribute(tags::NUMBER_OF_PATIENT_RELATED_STUDIES, VR::IS, tags::PATIENT_ID, tags::STUDY_INSTANCE_UID, Aggregate::Count),
    attribute(tags::NUMBER_OF_PATIENT_RELATED_SERIES, VR::IS, tags::PATIENT_ID, tags::SERIES_INSTANCE_UID, Aggregate::Count),
    attribute(tags::NUMBER_OF_PATIENT_RELATED_INSTANCES, VR::IS, tags::PATIENT_ID, tags::SOP_INSTANCE_UID, Aggregate::Count),
    attribute(tags::NUMBER_OF_STUDY_RELATED_SERIES, VR::IS, tags::STUDY_INSTANCE_UID, tags::SERIES_INSTANCE_UID, Aggregate::Count),
    attribute(tags::NUMBER_OF_STUDY_RELATED_INSTANCES, VR::IS, tags::STUDY_INSTANCE_UID, tags::SOP_INSTANCE_UID, Aggregate::Count),
    attribute(tags::NUMBER_OF_SERIES_RELATED_INSTANCES, VR::IS, tags::SERIES_INSTANCE_UID, tags::SOP_INSTANCE_UID, Aggregate::Count),
    attribute(tags::MODALITIES_IN_STUDY, VR::CS, tags::STUDY_INSTANCE_UID, tags::MODALITY, Aggregate::Values),
    attribute(tags::SOP_CLASSES_IN_STUDY, VR::UI, tags::STUDY_INSTANCE_UID, tags::SOP_CLASS_UID, Aggregate::Values),
];

pub fn lookup(tag: Tag) -> Option<&'static DerivedAttribute> {
    DERIVED_ATTRIBUTES.iter().find(|a| a.tag == tag)
}

pub fn is_derived(tag: Tag) -> bool {
    lookup(tag).is_some()
}

impl DerivedAttribute {
    /// Compute the attribute for `record` over the records visible through `constraint`
    pub async fn compute(
        &self,
        store: &dyn DocumentStore,
        namespace: &str,
        record: &DataSet,
        constraint: Option<&Filter>,
    ) -> Result<Element> {
        let Some(primary_value) = record.as_string(self.primary, 0) else {
            return Ok(self.empty_result());
        };

        let primary_key = tag_key(self.primary);
        let secondary_key = tag_key(self.secondary);
        let mut condition = vec![Filter::eq(
            format!("{}.Value", primary_key),
            primary_value.to_string(),
        )];
        condition.extend(constraint.cloned());
        let filter = Filter::and(condition);

        let projection = [primary_key, secondary_key.clone()];
        let documents = store.find(namespace, &filter, Some(&projection[..])).await?;

        let secondary_values = documents
            .iter()
            .filter_map(|d| value_at(d, &format!("{}.Value", secondary_key)));

        let element = match self.aggregate {
            Aggregate::Count => {
                let distinct: BTreeSet<String> =
                    secondary_values.map(JsonValue::to_string).collect();
                Element::integers(self.vr, [distinct.len() as i64])
            }
            Aggregate::Values => {
                let distinct: BTreeSet<String> = secondary_values
                    .filter_map(JsonValue::as_array)
                    .flatten()
                    .filter_map(JsonValue::as_str)
                    .map(str::to_string)
                    .collect();
                Element::strings(self.vr, distinct)
            }
        };
        Ok(element)
    }

    fn empty_result(&self) -> Element {
        match self.aggregate {
            Aggregate::Count => Element::integers(self.vr, [0]),
            Aggregate::Values => Element::empty(self.vr),
        }
    }
}
