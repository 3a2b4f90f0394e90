#[path = "../common/mod.rs"]
mod common;

use dicom_core::VR;
use dimse::dataset::tag_key;
use dimse::{tags, DataSet, Element, QueryLevel};
use pacs_archive::backend::filter::value_at;
use pacs_archive::backend::{Document, DocumentStore, Filter};
use pacs_archive::error::ArchiveError;
use pacs_archive::query::{match_type, translate, MatchType};

async fn run(fixture: &common::Fixture, query: &DataSet, constraint: Option<&Filter>) -> Vec<Document> {
    let plan = translate(query, constraint).unwrap();
    fixture
        .store
        .find("pacs.datasets", &plan.filter, Some(&plan.projection[..]))
        .await
        .unwrap()
}

fn uids(records: &[Document], tag: dicom_core::Tag) -> Vec<String> {
    let path = format!("{}.Value", tag_key(tag));
    let mut uids: Vec<String> = records
        .iter()
        .filter_map(|r| value_at(r, &path))
        .filter_map(|v| v.as_array()?.first()?.as_str().map(str::to_string))
        .collect();
    uids.sort();
    uids
}

#[test]
fn test_classification_examples() {
    assert_eq!(match_type(&Element::strings(VR::LO, ["A?B"])), MatchType::WildCard);
    assert_eq!(
        match_type(&Element::strings(VR::UI, ["1.2", "1.3"])),
        MatchType::ListOfUid
    );
    assert_eq!(
        match_type(&Element::strings(VR::DA, ["20160101-20161231"])),
        MatchType::Range
    );
    assert_eq!(match_type(&Element::empty(VR::LO)), MatchType::Universal);
    assert_eq!(match_type(&Element::strings(VR::LO, ["A"])), MatchType::SingleValue);
}

#[test]
fn test_missing_level() {
    let query = DataSet::new().with_strings(tags::PATIENT_ID, VR::LO, ["1"]);
    assert!(matches!(
        translate(&query, None),
        Err(ArchiveError::MissingAttribute(_))
    ));

    let query = common::query("", vec![]);
    assert!(matches!(
        translate(&query, None),
        Err(ArchiveError::MissingAttribute(_))
    ));

    let query = common::query("FRAME", vec![]);
    assert!(matches!(
        translate(&query, None),
        Err(ArchiveError::CannotUnderstand(_))
    ));
}

#[test]
fn test_projection_adds_hierarchy_keys() {
    let query = common::query(
        "SERIES",
        vec![(tags::MODALITY, Element::empty(VR::CS))],
    );
    let plan = translate(&query, None).unwrap();
    assert_eq!(plan.level, QueryLevel::Series);
    assert_eq!(plan.filter, Filter::All);
    for tag in [
        tags::MODALITY,
        tags::PATIENT_ID,
        tags::STUDY_INSTANCE_UID,
        tags::SERIES_INSTANCE_UID,
    ] {
        assert!(plan.projection.contains(&tag_key(tag)));
    }
    assert!(!plan.projection.contains(&tag_key(tags::SOP_INSTANCE_UID)));
}

#[tokio::test]
async fn test_image_query_on_series() {
    let fixture = common::sample_archive().await;
    let query = common::query(
        "IMAGE",
        vec![(
            tags::SERIES_INSTANCE_UID,
            Element::strings(VR::UI, ["2.2.2"]),
        )],
    );
    let records = run(&fixture, &query, None).await;
    assert_eq!(uids(&records, tags::SOP_INSTANCE_UID), ["2.2.2.1", "2.2.2.2"]);
}

#[tokio::test]
async fn test_wildcard_person_name_ignores_case() {
    let fixture = common::sample_archive().await;
    let query = common::query(
        "PATIENT",
        vec![(tags::PATIENT_NAME, Element::strings(VR::PN, ["patient*"]))],
    );
    let records = run(&fixture, &query, None).await;
    assert_eq!(records.len(), 5);
}

#[tokio::test]
async fn test_uid_list_and_date_range() {
    let fixture = common::sample_archive().await;
    let query = common::query(
        "IMAGE",
        vec![(
            tags::SOP_INSTANCE_UID,
            Element::strings(VR::UI, ["1.1.1.1", "2.2.1.1", "9.9.9.9"]),
        )],
    );
    let records = run(&fixture, &query, None).await;
    assert_eq!(uids(&records, tags::SOP_INSTANCE_UID), ["1.1.1.1", "2.2.1.1"]);

    let query = common::query(
        "STUDY",
        vec![(tags::STUDY_DATE, Element::strings(VR::DA, ["20160115-"]))],
    );
    let records = run(&fixture, &query, None).await;
    assert_eq!(
        uids(&records, tags::STUDY_INSTANCE_UID),
        ["2.2", "2.2", "2.2"]
    );
}

#[tokio::test]
async fn test_constraint_restricts_results() {
    let fixture = common::sample_archive().await;
    let constraint = fixture
        .archive
        .acl()
        .get_constraints("restricted_query", "Query")
        .await
        .unwrap();
    let query = common::query("PATIENT", vec![]);
    let records = run(&fixture, &query, constraint.as_ref()).await;
    assert_eq!(uids(&records, tags::PATIENT_ID), ["1"]);
}

#[test]
fn test_sequence_matching_not_supported() {
    let item = DataSet::new().with_strings(tags::SOP_INSTANCE_UID, VR::UI, ["1.2"]);
    let query = common::query(
        "IMAGE",
        vec![(tags::REFERENCED_SOP_SEQUENCE, Element::data_sets([item]))],
    );
    assert!(matches!(
        translate(&query, None),
        Err(ArchiveError::NotSupported(_))
    ));
}

#[tokio::test]
async fn test_non_finite_real_does_not_match_missing_attribute() {
    let slice_thickness = dicom_core::Tag(0x0018, 0x0050);
    let fixture = common::sample_archive().await;
    let query = common::query(
        "IMAGE",
        vec![(slice_thickness, Element::strings(VR::DS, ["inf"]))],
    );
    assert!(run(&fixture, &query, None).await.is_empty());

    let thick = common::instance(3, 1, 1, 1)
        .with(slice_thickness, Element::reals(VR::DS, [f64::INFINITY]));
    let thin = common::instance(3, 1, 1, 2).with(slice_thickness, Element::reals(VR::DS, [2.5]));
    fixture.archive.storage().store(&thick).await.unwrap();
    fixture.archive.storage().store(&thin).await.unwrap();

    let records = run(&fixture, &query, None).await;
    assert_eq!(uids(&records, tags::SOP_INSTANCE_UID), ["3.1.1.1"]);

    let finite = common::query(
        "IMAGE",
        vec![(slice_thickness, Element::strings(VR::DS, ["2.5"]))],
    );
    let records = run(&fixture, &finite, None).await;
    assert_eq!(uids(&records, tags::SOP_INSTANCE_UID), ["3.1.1.2"]);
}
