#[path = "../common/mod.rs"]
mod common;

use dicom_core::VR;
use dimse::{tags, uids, DataSet, Element, Request};
use pacs_archive::archive::{
    echo, store, DataSetGenerator, FindGenerator, GetGenerator, MoveGenerator,
};
use pacs_archive::error::ArchiveError;
use pacs_archive::peers::ApplicationEntity;

fn find_request(query: DataSet) -> Request {
    Request::find(1, uids::PATIENT_ROOT_QUERY_RETRIEVE_FIND, query)
}

async fn collect<G: DataSetGenerator>(generator: &mut G) -> Vec<DataSet> {
    let mut results = Vec::new();
    while !generator.done() {
        results.push(generator.get().await.unwrap());
        generator.next();
    }
    results
}

#[tokio::test]
async fn test_echo_requires_permission() {
    let fixture = common::sample_archive().await;
    assert!(echo(&fixture.archive, "echo").await.is_ok());
    assert!(echo(&fixture.archive, "all").await.is_ok());

    let error = echo(&fixture.archive, "store").await.unwrap_err();
    assert_eq!(error.status(), dimse::status::PROCESSING_FAILURE);
}

#[tokio::test]
async fn test_store_checks() {
    let fixture = common::empty_archive(Default::default());
    fixture
        .archive
        .acl()
        .set_entries(&common::acl_entries())
        .await
        .unwrap();
    let instance = common::instance(1, 1, 1, 1);

    let refused = store(&fixture.archive, "query", Some(&instance)).await.unwrap_err();
    assert!(matches!(refused, ArchiveError::NotAuthorized(_)));
    assert_eq!(refused.status(), dimse::status::REFUSED_NOT_AUTHORIZED);

    let empty = store(&fixture.archive, "store", Some(&DataSet::new())).await.unwrap_err();
    assert!(matches!(empty, ArchiveError::InvalidObjectInstance(_)));

    let mut no_uid = instance.clone();
    no_uid.remove(tags::SOP_INSTANCE_UID);
    let missing = store(&fixture.archive, "store", Some(&no_uid)).await.unwrap_err();
    assert!(matches!(missing, ArchiveError::InvalidObjectInstance(_)));

    store(&fixture.archive, "store", Some(&instance)).await.unwrap();
    assert!(fixture.archive.storage().exists("1.1.1.1").await.unwrap());
}

#[tokio::test]
async fn test_find_refused_without_permission() {
    let fixture = common::sample_archive().await;
    let mut generator = FindGenerator::new(fixture.archive.clone(), "store");
    let error = generator
        .initialize(&find_request(common::query("PATIENT", vec![])))
        .await
        .unwrap_err();
    assert!(matches!(error, ArchiveError::NotAuthorized(_)));
    assert_eq!(error.to_string(), "User \"store\" is not allowed to Query");
}

#[tokio::test]
async fn test_find_patients_distinct_and_ordered() {
    let fixture = common::sample_archive().await;
    let mut generator = FindGenerator::new(fixture.archive.clone(), "query");
    generator
        .initialize(&find_request(common::query(
            "PATIENT",
            vec![(tags::PATIENT_NAME, Element::empty(VR::PN))],
        )))
        .await
        .unwrap();
    assert_eq!(generator.count(), 2);

    let results = collect(&mut generator).await;
    let ids: Vec<_> = results
        .iter()
        .map(|d| d.as_string(tags::PATIENT_ID, 0).unwrap().to_string())
        .collect();
    assert_eq!(ids, ["1", "2"]);

    let first = &results[0];
    assert_eq!(first.as_string(tags::SPECIFIC_CHARACTER_SET, 0), Some("ISO_IR 192"));
    assert_eq!(first.as_string(tags::QUERY_RETRIEVE_LEVEL, 0), Some("PATIENT"));
    assert_eq!(first.as_string(tags::INSTANCE_AVAILABILITY, 0), Some("ONLINE"));
    assert!(first.has(tags::PATIENT_NAME));
    assert!(!first.has(tags::PIXEL_DATA));
}

#[tokio::test]
async fn test_find_restricted_principal() {
    let fixture = common::sample_archive().await;
    let mut generator = FindGenerator::new(fixture.archive.clone(), "restricted_query");
    generator
        .initialize(&find_request(common::query("IMAGE", vec![])))
        .await
        .unwrap();
    let results = collect(&mut generator).await;
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].as_string(tags::SOP_INSTANCE_UID, 0), Some("1.1.1.1"));
}

#[tokio::test]
async fn test_find_derived_attributes() {
    let fixture = common::sample_archive().await;
    let mut generator = FindGenerator::new(fixture.archive.clone(), "query");
    generator
        .initialize(&find_request(common::query(
            "STUDY",
            vec![
                (
                    tags::STUDY_INSTANCE_UID,
                    Element::strings(VR::UI, ["2.2"]),
                ),
                (
                    tags::NUMBER_OF_STUDY_RELATED_INSTANCES,
                    Element::empty(VR::IS),
                ),
                (
                    tags::NUMBER_OF_STUDY_RELATED_SERIES,
                    Element::empty(VR::IS),
                ),
                (tags::MODALITIES_IN_STUDY, Element::empty(VR::CS)),
            ],
        )))
        .await
        .unwrap();
    assert_eq!(generator.count(), 1);

    let study = generator.get().await.unwrap();
    assert_eq!(study.as_integer(tags::NUMBER_OF_STUDY_RELATED_INSTANCES, 0), Some(3));
    assert_eq!(study.as_integer(tags::NUMBER_OF_STUDY_RELATED_SERIES, 0), Some(2));
    assert_eq!(
        study.as_strings(tags::MODALITIES_IN_STUDY),
        Some(&["CT".to_string(), "MR".to_string()][..])
    );

    // Cached until next()
    assert_eq!(generator.get().await.unwrap(), study);
    generator.next();
    assert!(generator.done());
}

#[tokio::test]
async fn test_get_returns_full_instances() {
    let fixture = common::sample_archive().await;
    let mut generator = GetGenerator::new(fixture.archive.clone(), "retrieve");
    generator
        .initialize(&Request::get(
            1,
            uids::PATIENT_ROOT_QUERY_RETRIEVE_GET,
            common::query(
                "SERIES",
                vec![(
                    tags::SERIES_INSTANCE_UID,
                    Element::strings(VR::UI, ["2.2.2"]),
                )],
            ),
        ))
        .await
        .unwrap();

    let results = collect(&mut generator).await;
    assert_eq!(
        results,
        vec![common::instance(2, 2, 2, 1), common::instance(2, 2, 2, 2)]
    );
}

#[tokio::test]
async fn test_get_refused_for_query_principal() {
    let fixture = common::sample_archive().await;
    let mut generator = GetGenerator::new(fixture.archive.clone(), "query");
    let error = generator
        .initialize(&Request::get(
            1,
            uids::PATIENT_ROOT_QUERY_RETRIEVE_GET,
            common::query("PATIENT", vec![]),
        ))
        .await
        .unwrap_err();
    assert!(matches!(error, ArchiveError::NotAuthorized(_)));
}

#[tokio::test]
async fn test_move_resolves_destination() {
    let fixture = common::sample_archive().await;
    fixture
        .archive
        .peers()
        .add(&ApplicationEntity::new("VIEWER", "viewer.local", 11113))
        .await
        .unwrap();

    let query = common::query(
        "STUDY",
        vec![(tags::STUDY_INSTANCE_UID, Element::strings(VR::UI, ["2.2"]))],
    );
    let request = Request::move_to(1, uids::PATIENT_ROOT_QUERY_RETRIEVE_MOVE, "VIEWER", query.clone());
    let mut generator = MoveGenerator::new(fixture.archive.clone(), "retrieve");
    generator.initialize(&request).await.unwrap();
    assert_eq!(generator.count(), 3);

    let sub = generator.get_association(&request).await.unwrap();
    assert_eq!(sub.host, "viewer.local");
    assert_eq!(sub.port, 11113);
    assert_eq!(sub.parameters.calling_ae_title, common::AE_TITLE);
    assert_eq!(sub.parameters.called_ae_title, "VIEWER");
    let classes: Vec<_> = sub
        .parameters
        .presentation_contexts
        .iter()
        .map(|pc| pc.abstract_syntax.as_str())
        .collect();
    assert_eq!(classes, [uids::MR_IMAGE_STORAGE, uids::CT_IMAGE_STORAGE]);
    assert_eq!(
        sub.parameters.presentation_contexts[0].transfer_syntaxes,
        [uids::EXPLICIT_VR_LITTLE_ENDIAN, uids::IMPLICIT_VR_LITTLE_ENDIAN]
    );

    let unknown = Request::move_to(1, uids::PATIENT_ROOT_QUERY_RETRIEVE_MOVE, "NOWHERE", query);
    let error = generator.get_association(&unknown).await.unwrap_err();
    assert!(matches!(error, ArchiveError::MoveDestinationUnknown(_)));
    assert_eq!(error.status(), dimse::status::MOVE_DESTINATION_UNKNOWN);
}
